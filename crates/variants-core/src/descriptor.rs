//! Decomposed (mutable) form of a record type.

use std::collections::{BTreeMap, HashSet};

use variants_model::{BuildRequest, FieldDescriptor, RecordType, Value};

use crate::error::{Result, VariantError};

/// Ordered field set plus schema-level config, copied out of a record type.
///
/// Field names are unique at all times; every mutating method that could
/// break that either replaces in place or fails.
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    fields: Vec<FieldDescriptor>,
    pub config: BTreeMap<String, Value>,
    pub doc: Option<String>,
    origin: RecordType,
}

/// Copy `origin`'s fields, config and doc into a fresh descriptor.
///
/// The result shares nothing mutable with `origin`.
pub fn decompose(origin: &RecordType) -> SchemaDescriptor {
    SchemaDescriptor {
        fields: origin.fields().to_vec(),
        config: origin.config().clone(),
        doc: origin.doc().map(str::to_string),
        origin: origin.clone(),
    }
}

impl SchemaDescriptor {
    /// The type this descriptor was decomposed from.
    pub fn origin(&self) -> &RecordType {
        &self.origin
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// In-place access for steps that keep every field and its name.
    pub(crate) fn fields_mut(&mut self) -> &mut [FieldDescriptor] {
        &mut self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldDescriptor> {
        self.fields.iter_mut().find(|field| field.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append a new field to `variant`'s descriptor. Fails if the name is taken.
    pub fn add_field(
        &mut self,
        transformer: &'static str,
        variant: &str,
        field: FieldDescriptor,
    ) -> Result<()> {
        if self.contains(&field.name) {
            return Err(VariantError::DuplicateField {
                transformer,
                variant: variant.to_string(),
                field: field.name,
            });
        }
        self.fields.push(field);
        Ok(())
    }

    /// Replace the field of the same name in place, or append it.
    /// Returns the replaced field, if any.
    pub fn upsert_field(&mut self, field: FieldDescriptor) -> Option<FieldDescriptor> {
        match self.field_mut(&field.name) {
            Some(existing) => Some(std::mem::replace(existing, field)),
            None => {
                self.fields.push(field);
                None
            }
        }
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldDescriptor> {
        let idx = self.fields.iter().position(|field| field.name == name)?;
        Some(self.fields.remove(idx))
    }

    /// Replace the whole field list, checking name uniqueness first.
    /// On failure the descriptor is left unchanged.
    pub fn set_fields(
        &mut self,
        transformer: &'static str,
        variant: &str,
        fields: Vec<FieldDescriptor>,
    ) -> Result<()> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(VariantError::DuplicateField {
                    transformer,
                    variant: variant.to_string(),
                    field: field.name.clone(),
                });
            }
        }
        self.fields = fields;
        Ok(())
    }

    /// Move the fields out, leaving the descriptor empty.
    pub(crate) fn take_fields(&mut self) -> Vec<FieldDescriptor> {
        std::mem::take(&mut self.fields)
    }

    /// Turn the descriptor into a factory request for a type called `name`.
    pub fn into_request(self, name: impl Into<String>, base: Option<RecordType>) -> BuildRequest {
        BuildRequest {
            name: name.into(),
            fields: self.fields,
            config: self.config,
            doc: self.doc,
            base,
        }
    }
}
