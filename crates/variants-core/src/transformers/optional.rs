use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use variants_model::{FieldDescriptor, Value};

use crate::error::{Result, VariantError};
use crate::transformers::fields::{FieldTransformer, field_step};

const NAME: &str = "MakeOptional";

/// MakeOptional configuration: `all` or a `fields` list, plus exclusions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionalOptions {
    #[serde(default)]
    pub all: bool,
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Turns required fields into "type or absent" fields defaulting to null.
///
/// Fields that are already non-required pass through unchanged, so applying
/// it twice is the same as applying it once. Excluded names (typically
/// discriminators) always stay as they are.
#[derive(Debug, Clone)]
pub struct MakeOptional {
    only: Option<BTreeSet<String>>,
    exclude: BTreeSet<String>,
}

impl MakeOptional {
    pub fn all() -> Self {
        Self {
            only: None,
            exclude: BTreeSet::new(),
        }
    }

    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            only: Some(names.into_iter().map(Into::into).collect()),
            exclude: BTreeSet::new(),
        }
    }

    pub fn excluding<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn from_options(options: OptionalOptions) -> Result<Self> {
        let base = match (options.all, options.fields) {
            (true, None) => Self::all(),
            (false, Some(fields)) => Self::only(fields),
            (true, Some(_)) => {
                return Err(VariantError::configuration(
                    NAME,
                    "all and fields are mutually exclusive",
                ));
            }
            (false, None) => {
                return Err(VariantError::configuration(
                    NAME,
                    "expected all = true or a fields list",
                ));
            }
        };
        Ok(base.excluding(options.exclude))
    }

    fn applies_to(&self, name: &str) -> bool {
        !self.exclude.contains(name)
            && self.only.as_ref().is_none_or(|only| only.contains(name))
    }
}

impl FieldTransformer for MakeOptional {
    fn name(&self) -> &'static str {
        NAME
    }

    fn transform(&self, mut field: FieldDescriptor) -> Option<FieldDescriptor> {
        if !self.applies_to(&field.name) || !field.is_required() {
            return Some(field);
        }
        field.ty = field.ty.optional();
        field.default = Some(Value::Null);
        field.default_factory = None;
        field.required = false;
        Some(field)
    }
}

field_step!(MakeOptional);
