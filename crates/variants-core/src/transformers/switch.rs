use tracing::trace;
use variants_model::RecordType;

use crate::context::VariantContext;
use crate::error::{Result, VariantError};
use crate::pipeline::Transformer;

/// Re-points nested record-typed fields at a variant of the nested type.
///
/// Record references are found anywhere inside optional, list, map and union
/// types. Each is replaced by the nested type's variant named like the
/// current context (or an explicit name). Nested types with no such variant
/// are left as they are, unless [`SwitchNested::strict`] is set.
#[derive(Debug, Clone, Default)]
pub struct SwitchNested {
    variant: Option<String>,
    strict: bool,
}

impl SwitchNested {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this variant name instead of the context's.
    pub fn variant(mut self, name: impl Into<String>) -> Self {
        self.variant = Some(name.into());
        self
    }

    /// Fail on nested types without the variant.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

impl Transformer for SwitchNested {
    fn name(&self) -> &'static str {
        "SwitchNested"
    }

    fn apply(&self, mut context: VariantContext) -> Result<VariantContext> {
        let variant = self
            .variant
            .clone()
            .unwrap_or_else(|| context.name().to_string());
        let directory = context.directory().clone();
        let mut missing: Option<RecordType> = None;

        let descriptor = context.descriptor_mut(self.name())?;
        for field in descriptor.fields_mut() {
            let switched = field.ty.map_records(&mut |nested: &RecordType| {
                let replacement = directory.variant(nested, &variant);
                match &replacement {
                    Some(target) => {
                        trace!(field = %field.name, from = %nested.name(), to = %target.name(), "nested type switched");
                    }
                    None => {
                        trace!(field = %field.name, nested = %nested.name(), "nested type kept");
                        missing.get_or_insert_with(|| nested.clone());
                    }
                }
                replacement
            });
            if let Some(nested) = missing.take().filter(|_| self.strict) {
                return Err(VariantError::MissingVariant {
                    origin: nested.name().to_string(),
                    variant,
                });
            }
            field.ty = switched;
        }
        Ok(context)
    }
}
