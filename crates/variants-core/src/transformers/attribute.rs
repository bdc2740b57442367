use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::context::VariantContext;
use crate::directory::Attribute;
use crate::error::{Result, VariantError};
use crate::pipeline::Transformer;

type ComputeFn = Arc<dyn Fn(&VariantContext) -> Result<Attribute> + Send + Sync>;

#[derive(Clone)]
enum Source {
    Value(Attribute),
    /// Copy the named attribute from the origin.
    Origin(String),
    Computed(ComputeFn),
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Source::Origin(name) => f.debug_tuple("Origin").field(name).finish(),
            Source::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Attaches an attribute to the built type, or to the origin with
/// [`SetAttribute::on_origin`].
#[derive(Debug, Clone)]
pub struct SetAttribute {
    name: String,
    source: Source,
    on_origin: bool,
}

impl SetAttribute {
    pub fn value(name: impl Into<String>, attribute: Attribute) -> Self {
        Self {
            name: name.into(),
            source: Source::Value(attribute),
            on_origin: false,
        }
    }

    /// Copy the origin's attribute of the same name.
    pub fn copy_from_origin(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: Source::Origin(name.clone()),
            name,
            on_origin: false,
        }
    }

    pub fn computed(
        name: impl Into<String>,
        compute: impl Fn(&VariantContext) -> Result<Attribute> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            source: Source::Computed(Arc::new(compute)),
            on_origin: false,
        }
    }

    /// Target the origin instead of the built type.
    pub fn on_origin(mut self) -> Self {
        self.on_origin = true;
        self
    }

    fn resolve(&self, context: &VariantContext) -> Result<Attribute> {
        match &self.source {
            Source::Value(attribute) => Ok(attribute.clone()),
            Source::Origin(name) => context
                .directory()
                .attribute(context.origin(), name)
                .ok_or_else(|| VariantError::MissingAttribute {
                    type_name: context.origin().name().to_string(),
                    attribute: name.clone(),
                }),
            Source::Computed(compute) => compute(context),
        }
    }
}

impl Transformer for SetAttribute {
    fn name(&self) -> &'static str {
        "SetAttribute"
    }

    fn apply(&self, context: VariantContext) -> Result<VariantContext> {
        let built = context.built(self.name())?;
        let target = if self.on_origin {
            context.origin()
        } else {
            built
        };
        let attribute = self.resolve(&context)?;
        trace!(ty = %target.name(), attribute = %self.name, "attribute set");
        context
            .directory()
            .set_attribute(target, self.name.clone(), attribute);
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::VariantDirectory;
    use crate::error::ErrorKind;
    use crate::transformers::BuildVariant;
    use variants_model::{FieldDescriptor, RecordType, TypeExpr, Value};

    fn setup() -> (Arc<VariantDirectory>, RecordType, VariantContext) {
        let directory = Arc::new(VariantDirectory::new());
        let origin = RecordType::builder("Order")
            .field(FieldDescriptor::new("total", TypeExpr::scalar("decimal")))
            .build()
            .unwrap();
        let context = BuildVariant::new()
            .apply(VariantContext::named("View").bind_in(&origin, &directory))
            .unwrap();
        (directory, origin, context)
    }

    #[test]
    fn sets_value_on_built_type() {
        let (directory, _, context) = setup();
        let step = SetAttribute::value("table", Attribute::Value(Value::from("orders")));
        let context = step.apply(context).unwrap();
        let built = context.built_type().unwrap();
        assert_eq!(
            directory.attribute(built, "table"),
            Some(Attribute::Value(Value::from("orders")))
        );
    }

    #[test]
    fn copies_from_origin() {
        let (directory, origin, context) = setup();
        directory.set_attribute(&origin, "table", Attribute::Value(Value::from("orders")));
        let context = SetAttribute::copy_from_origin("table").apply(context).unwrap();
        let built = context.built_type().unwrap();
        assert_eq!(directory.attribute(built, "table"), directory.attribute(&origin, "table"));
    }

    #[test]
    fn missing_origin_attribute_fails() {
        let (_, _, context) = setup();
        let err = SetAttribute::copy_from_origin("table").apply(context).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateContract);
    }

    #[test]
    fn computed_onto_origin() {
        let (directory, origin, context) = setup();
        let step = SetAttribute::computed("view", |context| {
            Ok(Attribute::Type(context.built("view")?.clone()))
        })
        .on_origin();
        let context = step.apply(context).unwrap();
        assert_eq!(
            directory.attribute(&origin, "view"),
            Some(Attribute::Type(context.built_type().unwrap().clone()))
        );
    }

    #[test]
    fn needs_built_context() {
        let directory = Arc::new(VariantDirectory::new());
        let origin = RecordType::builder("Order").build().unwrap();
        let context = VariantContext::named("View").bind_in(&origin, &directory);
        let step = SetAttribute::value("x", Attribute::Value(Value::Null));
        assert!(step.apply(context).is_err());
    }
}
