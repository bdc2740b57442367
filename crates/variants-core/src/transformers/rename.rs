use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use variants_model::FieldDescriptor;

use crate::error::{Result, VariantError};
use crate::transformers::fields::{FieldTransformer, field_step};

const NAME: &str = "RenameFields";

/// Function from old field name to new field name.
#[derive(Clone)]
pub struct RenameFn(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl RenameFn {
    pub fn new(rename: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(rename))
    }
}

impl fmt::Debug for RenameFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RenameFn(..)")
    }
}

/// Rename configuration. Exactly one of `mapping`/`function`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameOptions {
    pub mapping: Option<BTreeMap<String, String>>,
    #[serde(skip)]
    pub function: Option<RenameFn>,
}

#[derive(Debug, Clone)]
enum RenameMode {
    Mapping(BTreeMap<String, String>),
    Function(RenameFn),
}

/// Changes the key a field is stored under. Type, markers, defaults and
/// position are kept. Names missing from a mapping are left alone.
///
/// Two fields renamed onto the same name make the step fail.
#[derive(Debug, Clone)]
pub struct RenameFields {
    mode: RenameMode,
}

impl RenameFields {
    pub fn mapping<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            mode: RenameMode::Mapping(
                pairs
                    .into_iter()
                    .map(|(from, to)| (from.into(), to.into()))
                    .collect(),
            ),
        }
    }

    pub fn with(rename: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            mode: RenameMode::Function(RenameFn::new(rename)),
        }
    }

    pub fn from_options(options: RenameOptions) -> Result<Self> {
        match (options.mapping, options.function) {
            (Some(mapping), None) => Ok(Self {
                mode: RenameMode::Mapping(mapping),
            }),
            (None, Some(function)) => Ok(Self {
                mode: RenameMode::Function(function),
            }),
            (Some(_), Some(_)) => Err(VariantError::configuration(
                NAME,
                "mapping and function are mutually exclusive",
            )),
            (None, None) => Err(VariantError::configuration(
                NAME,
                "expected one of mapping or function",
            )),
        }
    }

    /// The new name for `name`.
    pub fn target(&self, name: &str) -> String {
        match &self.mode {
            RenameMode::Mapping(mapping) => mapping
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string()),
            RenameMode::Function(rename) => (rename.0)(name),
        }
    }
}

impl FieldTransformer for RenameFields {
    fn name(&self) -> &'static str {
        NAME
    }

    fn transform(&self, field: FieldDescriptor) -> Option<FieldDescriptor> {
        let target = self.target(&field.name);
        Some(field.renamed(target))
    }
}

field_step!(RenameFields);
