use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ModelError, Result};
use crate::field::FieldDescriptor;

static NEXT_TYPE_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeKey(u64);

impl TypeKey {
    fn next() -> Self {
        TypeKey(NEXT_TYPE_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct RecordTypeInner {
    key: TypeKey,
    name: String,
    fields: Vec<FieldDescriptor>,
    config: BTreeMap<String, Value>,
    doc: Option<String>,
    base: Option<RecordType>,
}

/// An immutable record type.
///
/// Handles are cheap to clone and compare by identity: two types built from
/// identical field sets are still distinct types.
#[derive(Clone)]
pub struct RecordType {
    inner: Arc<RecordTypeInner>,
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder::new(name)
    }

    pub fn key(&self) -> TypeKey {
        self.inner.key
    }

    /// A handle that does not keep the type alive.
    pub fn downgrade(&self) -> WeakRecordType {
        WeakRecordType {
            key: self.inner.key,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// All fields in declaration order, inherited ones first.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.inner.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.inner.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.inner.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn config(&self) -> &BTreeMap<String, Value> {
        &self.inner.config
    }

    pub fn doc(&self) -> Option<&str> {
        self.inner.doc.as_deref()
    }

    pub fn base(&self) -> Option<&RecordType> {
        self.inner.base.as_ref()
    }

    /// True if `self` is `other` or inherits from it.
    pub fn is_subtype_of(&self, other: &RecordType) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty == other {
                return true;
            }
            current = ty.base();
        }
        false
    }
}

/// Non-owning handle to a [`RecordType`].
#[derive(Clone)]
pub struct WeakRecordType {
    key: TypeKey,
    inner: Weak<RecordTypeInner>,
}

impl WeakRecordType {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// The type, if any strong handle to it is still alive.
    pub fn upgrade(&self) -> Option<RecordType> {
        self.inner.upgrade().map(|inner| RecordType { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for WeakRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRecordType")
            .field("key", &self.key)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.inner.key == other.inner.key
    }
}

impl Eq for RecordType {}

impl std::hash::Hash for RecordType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.key.hash(state);
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("key", &self.inner.key)
            .field("name", &self.inner.name)
            .field("fields", &self.field_names())
            .finish()
    }
}

impl fmt::Display for RecordType {
    /// Multi-line rendering: header line, optional doc, one line per field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base() {
            Some(base) => writeln!(f, "{}({})", self.name(), base.name())?,
            None => writeln!(f, "{}", self.name())?,
        }
        if let Some(doc) = self.doc() {
            writeln!(f, "  \"{doc}\"")?;
        }
        for field in self.fields() {
            writeln!(f, "  {field}")?;
        }
        Ok(())
    }
}

/// Builder for [`RecordType`].
#[derive(Debug)]
pub struct RecordTypeBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
    config: BTreeMap<String, Value>,
    doc: Option<String>,
    base: Option<RecordType>,
}

impl RecordTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            config: BTreeMap::new(),
            doc: None,
            base: None,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn config_map(mut self, config: BTreeMap<String, Value>) -> Self {
        self.config.extend(config);
        self
    }

    pub fn doc(mut self, doc: Option<String>) -> Self {
        self.doc = doc;
        self
    }

    pub fn base(mut self, base: Option<RecordType>) -> Self {
        self.base = base;
        self
    }

    /// Build the type.
    ///
    /// Inherited fields come first; a declared field with the same name as an
    /// inherited one replaces it in place. Declared names must be unique.
    pub fn build(self) -> Result<RecordType> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ModelError::InvalidTypeName(self.name));
        }

        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(ModelError::InvalidFieldName(field.name.clone()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ModelError::DuplicateField {
                    type_name: name,
                    field: field.name.clone(),
                });
            }
        }

        let mut fields: Vec<FieldDescriptor> = self
            .base
            .as_ref()
            .map(|base| base.fields().to_vec())
            .unwrap_or_default();
        let mut config = self
            .base
            .as_ref()
            .map(|base| base.config().clone())
            .unwrap_or_default();
        config.extend(self.config);

        for field in self.fields {
            match fields.iter_mut().find(|existing| existing.name == field.name) {
                Some(existing) => *existing = field,
                None => fields.push(field),
            }
        }

        Ok(RecordType {
            inner: Arc::new(RecordTypeInner {
                key: TypeKey::next(),
                name,
                fields,
                config,
                doc: self.doc,
                base: self.base,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeExpr;

    fn field(name: &str, ty: &str) -> FieldDescriptor {
        FieldDescriptor::new(name, TypeExpr::scalar(ty))
    }

    #[test]
    fn identical_shapes_are_distinct_types() {
        let a = RecordType::builder("A").field(field("x", "int")).build().unwrap();
        let b = RecordType::builder("A").field(field("x", "int")).build().unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn weak_handles_do_not_keep_types_alive() {
        let a = RecordType::builder("A").field(field("x", "int")).build().unwrap();
        let weak = a.downgrade();
        assert_eq!(weak.key(), a.key());
        assert_eq!(weak.upgrade(), Some(a.clone()));
        drop(a);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let err = RecordType::builder("User")
            .field(field("id", "int"))
            .field(field("id", "str"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateField { ref field, .. } if field == "id"));
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(matches!(
            RecordType::builder("  ").build(),
            Err(ModelError::InvalidTypeName(_))
        ));
        assert!(matches!(
            RecordType::builder("User").field(field("", "int")).build(),
            Err(ModelError::InvalidFieldName(_))
        ));
    }

    #[test]
    fn base_fields_come_first_and_can_be_overridden() {
        let service = RecordType::builder("Service")
            .field(field("name", "str"))
            .field(field("kind", "str"))
            .config("frozen", true)
            .build()
            .unwrap();
        let fixed = RecordType::builder("FixedService")
            .field(field("kind", "literal"))
            .field(field("location", "point"))
            .base(Some(service.clone()))
            .build()
            .unwrap();

        assert_eq!(fixed.field_names(), vec!["name", "kind", "location"]);
        assert_eq!(fixed.field("kind").unwrap().ty, TypeExpr::scalar("literal"));
        assert_eq!(fixed.config().get("frozen"), Some(&Value::Bool(true)));
        assert!(fixed.is_subtype_of(&service));
        assert!(!service.is_subtype_of(&fixed));
    }
}
