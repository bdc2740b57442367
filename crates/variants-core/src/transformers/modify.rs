use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::trace;
use variants_model::{FieldDescriptor, Marker};

use crate::context::VariantContext;
use crate::error::Result;
use crate::pipeline::Transformer;
use crate::transformers::fields::{FieldTransformer, field_step};

type FieldFn = Arc<dyn Fn(FieldDescriptor) -> FieldDescriptor + Send + Sync>;
type MarkerFn = Arc<dyn Fn(&Marker) -> bool + Send + Sync>;

/// Applies an arbitrary edit to every field, or to named fields only.
#[derive(Clone)]
pub struct ModifyFields {
    only: Option<BTreeSet<String>>,
    modify: FieldFn,
}

impl ModifyFields {
    pub fn all(modify: impl Fn(FieldDescriptor) -> FieldDescriptor + Send + Sync + 'static) -> Self {
        Self {
            only: None,
            modify: Arc::new(modify),
        }
    }

    pub fn only<I, S>(
        names: I,
        modify: impl Fn(FieldDescriptor) -> FieldDescriptor + Send + Sync + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            only: Some(names.into_iter().map(Into::into).collect()),
            modify: Arc::new(modify),
        }
    }
}

impl fmt::Debug for ModifyFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifyFields")
            .field("only", &self.only)
            .finish_non_exhaustive()
    }
}

impl FieldTransformer for ModifyFields {
    fn name(&self) -> &'static str {
        "ModifyFields"
    }

    fn transform(&self, field: FieldDescriptor) -> Option<FieldDescriptor> {
        match &self.only {
            Some(only) if !only.contains(&field.name) => Some(field),
            _ => Some((self.modify)(field)),
        }
    }
}

/// Removes markers from field metadata.
///
/// Typically runs after marker-driven filtering so the derived type does not
/// carry exclusion markers that only meant something to the pipeline.
#[derive(Clone)]
pub struct StripMarkers {
    matches: MarkerFn,
}

impl StripMarkers {
    /// Strip every exclusion marker.
    pub fn exclusions() -> Self {
        Self::matching(|marker| marker.exclusion_scope().is_some())
    }

    pub fn matching(predicate: impl Fn(&Marker) -> bool + Send + Sync + 'static) -> Self {
        Self {
            matches: Arc::new(predicate),
        }
    }
}

impl fmt::Debug for StripMarkers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StripMarkers(..)")
    }
}

impl FieldTransformer for StripMarkers {
    fn name(&self) -> &'static str {
        "StripMarkers"
    }

    fn transform(&self, mut field: FieldDescriptor) -> Option<FieldDescriptor> {
        field.metadata.retain(|marker| !(self.matches)(marker));
        Some(field)
    }
}

field_step!(ModifyFields, StripMarkers);

/// Adds fields to a decomposed context.
///
/// By default every field is appended and a name that is already taken
/// fails the step. [`SetFields::replace`] instead swaps same-named fields in
/// place and appends the rest.
#[derive(Debug, Clone, Default)]
pub struct SetFields {
    fields: Vec<FieldDescriptor>,
    replace: bool,
}

impl SetFields {
    pub fn new(fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            replace: false,
        }
    }

    /// Replace same-named fields in place, append the others.
    pub fn replace(fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            replace: true,
        }
    }

    pub fn and(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

impl Transformer for SetFields {
    fn name(&self) -> &'static str {
        "SetFields"
    }

    fn apply(&self, mut context: VariantContext) -> Result<VariantContext> {
        let variant = context.name().to_string();
        let descriptor = context.descriptor_mut(self.name())?;
        for field in &self.fields {
            if !self.replace {
                descriptor.add_field(self.name(), &variant, field.clone())?;
            } else if descriptor.upsert_field(field.clone()).is_some() {
                trace!(field = %field.name, "field replaced");
            }
        }
        Ok(context)
    }
}
