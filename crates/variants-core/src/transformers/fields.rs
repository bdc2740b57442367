//! Field-level transformers and the combinator that lifts them into a
//! pipeline step.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;
use variants_model::FieldDescriptor;

use crate::context::VariantContext;
use crate::error::{Result, VariantError};
use crate::pipeline::Transformer;

/// Maps one field to zero or one field. `None` drops the field.
pub trait FieldTransformer: Send + Sync {
    fn name(&self) -> &'static str;

    fn transform(&self, field: FieldDescriptor) -> Option<FieldDescriptor>;
}

/// Run `map` over every field of a decomposed context, in order.
///
/// Dropped fields disappear; surviving names must stay unique or the step
/// fails with a field-identity error and the context is discarded.
pub(crate) fn map_fields<F>(
    mut context: VariantContext,
    transformer: &'static str,
    mut map: F,
) -> Result<VariantContext>
where
    F: FnMut(FieldDescriptor) -> Option<FieldDescriptor>,
{
    let variant = context.name().to_string();
    let descriptor = context.descriptor_mut(transformer)?;
    let mut kept = Vec::with_capacity(descriptor.len());
    let mut seen = HashSet::with_capacity(descriptor.len());

    for field in descriptor.take_fields() {
        let source = field.name.clone();
        let Some(field) = map(field) else {
            trace!(transformer, field = %source, "field dropped");
            continue;
        };
        if !seen.insert(field.name.clone()) {
            return Err(VariantError::DuplicateField {
                transformer,
                variant,
                field: field.name,
            });
        }
        kept.push(field);
    }

    descriptor.set_fields(transformer, &variant, kept)?;
    Ok(context)
}

/// Runs a chain of field transformers per field.
///
/// For each field the chain stops at the first transformer that drops it;
/// other fields are unaffected.
#[derive(Clone, Default)]
pub struct MapFields {
    chain: Vec<Arc<dyn FieldTransformer>>,
}

impl MapFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of<T: FieldTransformer + 'static>(transformer: T) -> Self {
        Self::new().and(transformer)
    }

    pub fn and<T: FieldTransformer + 'static>(mut self, transformer: T) -> Self {
        self.chain.push(Arc::new(transformer));
        self
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Apply the chain to a single field.
    pub fn transform_field(&self, field: FieldDescriptor) -> Option<FieldDescriptor> {
        self.chain
            .iter()
            .try_fold(field, |field, transformer| transformer.transform(field))
    }
}

impl std::fmt::Debug for MapFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.chain.iter().map(|t| t.name()).collect();
        f.debug_struct("MapFields").field("chain", &names).finish()
    }
}

impl Transformer for MapFields {
    fn name(&self) -> &'static str {
        "MapFields"
    }

    fn apply(&self, context: VariantContext) -> Result<VariantContext> {
        map_fields(context, self.name(), |field| self.transform_field(field))
    }
}

/// Let a field transformer stand directly in a pipeline as a one-element
/// [`MapFields`].
macro_rules! field_step {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::pipeline::Transformer for $ty {
                fn name(&self) -> &'static str {
                    $crate::transformers::fields::FieldTransformer::name(self)
                }

                fn apply(
                    &self,
                    context: $crate::context::VariantContext,
                ) -> $crate::error::Result<$crate::context::VariantContext> {
                    $crate::transformers::fields::map_fields(
                        context,
                        $crate::transformers::fields::FieldTransformer::name(self),
                        |field| $crate::transformers::fields::FieldTransformer::transform(self, field),
                    )
                }
            }
        )+
    };
}

pub(crate) use field_step;
