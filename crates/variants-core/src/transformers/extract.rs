use tracing::debug;

use crate::context::VariantContext;
use crate::error::{Result, VariantError};
use crate::pipeline::Transformer;

/// Restarts decomposition from an already connected variant of the origin,
/// so a new variant can be derived from another one (e.g. `Update` from
/// `Input`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractVariant {
    variant: String,
}

impl ExtractVariant {
    pub fn new(variant: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
        }
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }
}

impl Transformer for ExtractVariant {
    fn name(&self) -> &'static str {
        "ExtractVariant"
    }

    fn apply(&self, mut context: VariantContext) -> Result<VariantContext> {
        let source = context
            .directory()
            .variant(context.origin(), &self.variant)
            .ok_or_else(|| VariantError::MissingVariant {
                origin: context.origin().name().to_string(),
                variant: self.variant.clone(),
            })?;
        context.restart_from(self.name(), &source)?;
        debug!(from = %source.name(), variant = %context.name(), "decomposition restarted");
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::VariantDirectory;
    use crate::error::ErrorKind;
    use crate::pipeline;
    use crate::transformers::{BuildVariant, ConnectVariant, FilterFields};
    use std::sync::Arc;
    use variants_model::{FieldDescriptor, RecordType, TypeExpr};

    fn user() -> RecordType {
        RecordType::builder("User")
            .field(FieldDescriptor::new("id", TypeExpr::scalar("int")))
            .field(FieldDescriptor::new("name", TypeExpr::scalar("str")))
            .build()
            .unwrap()
    }

    #[test]
    fn starts_from_registered_variant() {
        let directory = Arc::new(VariantDirectory::new());
        let origin = user();
        pipeline![FilterFields::exclude(["id"]), BuildVariant::new(), ConnectVariant::new()]
            .run(VariantContext::named("Input").bind_in(&origin, &directory))
            .unwrap();

        let context = ExtractVariant::new("Input")
            .apply(VariantContext::named("Update").bind_in(&origin, &directory))
            .unwrap();
        assert_eq!(context.descriptor("t").unwrap().names(), vec!["name"]);
        assert_eq!(context.origin(), &origin);
    }

    #[test]
    fn missing_variant_is_a_state_error() {
        let directory = Arc::new(VariantDirectory::new());
        let context = VariantContext::named("Update").bind_in(&user(), &directory);
        let err = ExtractVariant::new("Input").apply(context).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateContract);
        assert!(matches!(err, VariantError::MissingVariant { ref variant, .. } if variant == "Input"));
    }
}
