use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use variants_model::{FieldDescriptor, FilterScope};

use crate::error::{Result, VariantError};
use crate::transformers::fields::{FieldTransformer, field_step};

const NAME: &str = "FilterFields";

/// Predicate over `(name, field)`; `true` means exclude.
#[derive(Clone)]
pub struct FieldPredicate(Arc<dyn Fn(&str, &FieldDescriptor) -> bool + Send + Sync>);

impl FieldPredicate {
    pub fn new(predicate: impl Fn(&str, &FieldDescriptor) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    fn matches(&self, field: &FieldDescriptor) -> bool {
        (self.0)(&field.name, field)
    }
}

impl fmt::Debug for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldPredicate(..)")
    }
}

/// Filter configuration. Exactly one mode must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterOptions {
    /// Drop these names.
    pub exclude: Option<Vec<String>>,
    /// Keep only these names.
    pub include_only: Option<Vec<String>>,
    /// Drop fields carrying an exclusion marker for any of these scopes.
    pub exclude_marked: Option<Vec<FilterScope>>,
    #[serde(skip)]
    pub predicate: Option<FieldPredicate>,
}

#[derive(Debug, Clone)]
enum FilterMode {
    Exclude(BTreeSet<String>),
    IncludeOnly(BTreeSet<String>),
    Marked(Vec<FilterScope>),
    Predicate(FieldPredicate),
}

/// Removes fields by name, by marker, or by predicate.
#[derive(Debug, Clone)]
pub struct FilterFields {
    mode: FilterMode,
}

impl FilterFields {
    pub fn exclude<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: FilterMode::Exclude(names.into_iter().map(Into::into).collect()),
        }
    }

    pub fn include_only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: FilterMode::IncludeOnly(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Drop fields marked as excluded for any of `scopes`.
    pub fn exclude_marked(scopes: impl IntoIterator<Item = FilterScope>) -> Self {
        Self {
            mode: FilterMode::Marked(scopes.into_iter().collect()),
        }
    }

    /// Drop fields for which `predicate(name, field)` is true.
    pub fn predicate(predicate: impl Fn(&str, &FieldDescriptor) -> bool + Send + Sync + 'static) -> Self {
        Self {
            mode: FilterMode::Predicate(FieldPredicate::new(predicate)),
        }
    }

    /// Build from options, failing unless exactly one mode is configured.
    pub fn from_options(options: FilterOptions) -> Result<Self> {
        let modes: Vec<FilterMode> = [
            options
                .exclude
                .map(|names| FilterMode::Exclude(names.into_iter().collect())),
            options
                .include_only
                .map(|names| FilterMode::IncludeOnly(names.into_iter().collect())),
            options.exclude_marked.map(FilterMode::Marked),
            options.predicate.map(FilterMode::Predicate),
        ]
        .into_iter()
        .flatten()
        .collect();

        let configured = modes.len();
        let mut modes = modes.into_iter();
        match (modes.next(), modes.next()) {
            (Some(mode), None) => Ok(Self { mode }),
            _ => Err(VariantError::configuration(
                NAME,
                format!(
                    "expected exactly one of exclude, include_only, exclude_marked or predicate; got {configured}"
                ),
            )),
        }
    }

    /// True if the field should be removed.
    pub fn excludes(&self, field: &FieldDescriptor) -> bool {
        match &self.mode {
            FilterMode::Exclude(names) => names.contains(&field.name),
            FilterMode::IncludeOnly(names) => !names.contains(&field.name),
            FilterMode::Marked(scopes) => field.excluded_for(scopes),
            FilterMode::Predicate(predicate) => predicate.matches(field),
        }
    }
}

impl FieldTransformer for FilterFields {
    fn name(&self) -> &'static str {
        NAME
    }

    fn transform(&self, field: FieldDescriptor) -> Option<FieldDescriptor> {
        (!self.excludes(&field)).then_some(field)
    }
}

field_step!(FilterFields);
