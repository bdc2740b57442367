//! Type construction primitive.
//!
//! The derivation pipeline never assembles types itself; it hands a
//! [`BuildRequest`] to a [`TypeFactory`]. Record-type systems with their own
//! rules (naming, empty types, extra config validation) plug in here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{ModelError, Result};
use crate::field::FieldDescriptor;
use crate::record::RecordType;

/// Everything needed to realize a new record type.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub config: BTreeMap<String, Value>,
    pub doc: Option<String>,
    pub base: Option<RecordType>,
}

impl BuildRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            config: BTreeMap::new(),
            doc: None,
            base: None,
        }
    }
}

/// Builds concrete record types from field-descriptor sets.
pub trait TypeFactory: Send + Sync {
    fn build(&self, request: BuildRequest) -> Result<RecordType>;
}

/// Options for [`RecordTypeFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryOptions {
    /// Allow types with no fields at all (after inheritance).
    pub allow_empty: bool,
}

impl Default for FactoryOptions {
    fn default() -> Self {
        Self { allow_empty: true }
    }
}

/// The default factory, backed by [`RecordType::builder`].
#[derive(Debug, Clone, Default)]
pub struct RecordTypeFactory {
    options: FactoryOptions,
}

impl RecordTypeFactory {
    pub fn new(options: FactoryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> FactoryOptions {
        self.options
    }
}

impl TypeFactory for RecordTypeFactory {
    fn build(&self, request: BuildRequest) -> Result<RecordType> {
        let record = RecordType::builder(request.name)
            .fields(request.fields)
            .config_map(request.config)
            .doc(request.doc)
            .base(request.base)
            .build()?;
        if !self.options.allow_empty && record.fields().is_empty() {
            return Err(ModelError::EmptyType(record.name().to_string()));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeExpr;

    #[test]
    fn default_factory_allows_empty_types() {
        let factory = RecordTypeFactory::default();
        let empty = factory.build(BuildRequest::new("Nothing")).expect("empty type");
        assert!(empty.fields().is_empty());
    }

    #[test]
    fn strict_factory_rejects_empty_types() {
        let factory = RecordTypeFactory::new(FactoryOptions { allow_empty: false });
        let err = factory.build(BuildRequest::new("Nothing")).unwrap_err();
        assert!(matches!(err, ModelError::EmptyType(name) if name == "Nothing"));
    }

    #[test]
    fn inherited_fields_satisfy_non_empty() {
        let base = RecordType::builder("Base")
            .field(FieldDescriptor::new("id", TypeExpr::scalar("int")))
            .build()
            .unwrap();
        let factory = RecordTypeFactory::new(FactoryOptions { allow_empty: false });
        let mut request = BuildRequest::new("Child");
        request.base = Some(base);
        let child = factory.build(request).expect("child inherits id");
        assert_eq!(child.field_names(), vec!["id"]);
    }
}
