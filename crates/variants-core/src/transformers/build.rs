use std::fmt;
use std::sync::Arc;

use tracing::debug;
use variants_model::{RecordType, RecordTypeFactory, TypeFactory};

use crate::context::VariantContext;
use crate::error::Result;
use crate::pipeline::Transformer;

/// Realizes the descriptor into a new record type and moves the context to
/// the built state.
///
/// The type is named `<origin><variant>` (e.g. `UserInput`) unless a name is
/// given. Construction goes through a [`TypeFactory`], [`RecordTypeFactory`]
/// by default.
#[derive(Clone)]
pub struct BuildVariant {
    name: Option<String>,
    base: Option<RecordType>,
    factory: Arc<dyn TypeFactory>,
}

impl Default for BuildVariant {
    fn default() -> Self {
        Self {
            name: None,
            base: None,
            factory: Arc::new(RecordTypeFactory::default()),
        }
    }
}

impl BuildVariant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_base(mut self, base: RecordType) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn TypeFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Name of the type built for `context`.
    pub fn type_name(&self, context: &VariantContext) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}{}", context.origin().name(), context.name()),
        }
    }
}

impl fmt::Debug for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildVariant")
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(RecordType::name))
            .finish_non_exhaustive()
    }
}

impl Transformer for BuildVariant {
    fn name(&self) -> &'static str {
        "BuildVariant"
    }

    fn apply(&self, context: VariantContext) -> Result<VariantContext> {
        let type_name = self.type_name(&context);
        let context = context.realize(self.name(), |descriptor| {
            let request = descriptor.into_request(type_name, self.base.clone());
            Ok(self.factory.build(request)?)
        })?;
        if let Some(built) = context.built_type() {
            debug!(
                variant = %context.name(),
                built = %built.name(),
                fields = built.fields().len(),
                "variant built"
            );
        }
        Ok(context)
    }
}
