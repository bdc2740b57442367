use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::marker::{FilterScope, Marker};
use crate::types::TypeExpr;

/// Named producer of default values (e.g. "now", "empty list").
#[derive(Clone)]
pub struct DefaultFactory {
    name: String,
    produce: Arc<dyn Fn() -> Value + Send + Sync>,
}

impl DefaultFactory {
    pub fn new(name: impl Into<String>, produce: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            produce: Arc::new(produce),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produce a fresh default value.
    pub fn produce(&self) -> Value {
        (self.produce)()
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DefaultFactory").field(&self.name).finish()
    }
}

impl PartialEq for DefaultFactory {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.produce, &other.produce)
    }
}

/// Metadata for one record field.
///
/// Descriptors are plain values: cloning one and mutating the clone never
/// affects the original.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeExpr,
    pub metadata: Vec<Marker>,
    pub required: bool,
    pub default: Option<Value>,
    pub default_factory: Option<DefaultFactory>,
}

impl FieldDescriptor {
    /// A required field with no default.
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            metadata: Vec::new(),
            required: true,
            default: None,
            default_factory: None,
        }
    }

    /// Give the field a default, which makes it non-required.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.default_factory = None;
        self.required = false;
        self
    }

    /// Give the field a default factory, which makes it non-required.
    pub fn with_default_factory(mut self, factory: DefaultFactory) -> Self {
        self.default_factory = Some(factory);
        self.default = None;
        self.required = false;
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.metadata.push(marker);
        self
    }

    /// Rename, keeping everything else.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some() || self.default_factory.is_some()
    }

    /// Resolve the default, calling the factory if one is set.
    pub fn default_value(&self) -> Option<Value> {
        match (&self.default, &self.default_factory) {
            (Some(value), _) => Some(value.clone()),
            (None, Some(factory)) => Some(factory.produce()),
            (None, None) => None,
        }
    }

    pub fn has_marker(&self, marker: &Marker) -> bool {
        self.metadata.iter().any(|m| m == marker)
    }

    /// True if any exclusion marker on the field names one of `scopes`.
    pub fn excluded_for(&self, scopes: &[FilterScope]) -> bool {
        self.metadata
            .iter()
            .filter_map(Marker::exclusion_scope)
            .any(|scope| scopes.contains(&scope))
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)?;
        if let Some(value) = &self.default {
            write!(f, " = {value}")?;
        } else if let Some(factory) = &self.default_factory {
            write!(f, " = {}()", factory.name())?;
        }
        for marker in &self.metadata {
            write!(f, " [{marker}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_clear_required() {
        let field = FieldDescriptor::new("active", TypeExpr::scalar("bool")).with_default(true);
        assert!(!field.is_required());
        assert_eq!(field.default_value(), Some(json!(true)));
    }

    #[test]
    fn default_factory_is_called_per_resolve() {
        let factory = DefaultFactory::new("empty_list", || json!([]));
        let field = FieldDescriptor::new("tags", TypeExpr::list(TypeExpr::scalar("str")))
            .with_default_factory(factory);
        assert!(field.has_default());
        assert_eq!(field.default_value(), Some(json!([])));
        assert_eq!(field.to_string(), "tags: list<str> = empty_list()");
    }

    #[test]
    fn clones_are_independent() {
        let original = FieldDescriptor::new("name", TypeExpr::scalar("str"))
            .with_marker(Marker::tag("public"));
        let mut copy = original.clone();
        copy.metadata.clear();
        copy.name.push_str("_copy");
        assert_eq!(original.name, "name");
        assert_eq!(original.metadata.len(), 1);
    }

    #[test]
    fn excluded_for_matches_scopes() {
        let field = FieldDescriptor::new("secret", TypeExpr::scalar("str"))
            .with_marker(Marker::exclude(FilterScope::Input));
        assert!(field.excluded_for(&[FilterScope::Input, FilterScope::Any]));
        assert!(!field.excluded_for(&[FilterScope::Output, FilterScope::Any]));
    }
}
