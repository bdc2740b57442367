use serde_json::Value;
use std::fmt;

use crate::record::RecordType;

/// A field's type expression.
///
/// Record references compare by type identity, everything else structurally.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// A named scalar such as `int`, `str` or `datetime`.
    Scalar(String),
    /// `inner` or absent.
    Optional(Box<TypeExpr>),
    List(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    /// A single permitted value, used for discriminators.
    Literal(Value),
    /// A nested record type.
    Record(RecordType),
}

impl TypeExpr {
    pub fn scalar(name: impl Into<String>) -> Self {
        TypeExpr::Scalar(name.into())
    }

    pub fn list(inner: TypeExpr) -> Self {
        TypeExpr::List(Box::new(inner))
    }

    pub fn map(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::Map(Box::new(key), Box::new(value))
    }

    pub fn record(record: &RecordType) -> Self {
        TypeExpr::Record(record.clone())
    }

    /// Widen to "type or absent". Already-optional types are returned as-is.
    pub fn optional(self) -> Self {
        if self.is_optional() {
            self
        } else {
            TypeExpr::Optional(Box::new(self))
        }
    }

    /// True for `Optional<_>` and for unions with a `none` member.
    pub fn is_optional(&self) -> bool {
        match self {
            TypeExpr::Optional(_) => true,
            TypeExpr::Union(members) => members.iter().any(TypeExpr::is_none),
            _ => false,
        }
    }

    fn is_none(&self) -> bool {
        matches!(self, TypeExpr::Scalar(name) if name == "none")
    }

    /// Rebuild the expression, replacing every nested record for which
    /// `switch` returns a replacement. Containers are walked recursively.
    pub fn map_records<F>(&self, switch: &mut F) -> TypeExpr
    where
        F: FnMut(&RecordType) -> Option<RecordType>,
    {
        match self {
            TypeExpr::Record(record) => match switch(record) {
                Some(replacement) => TypeExpr::Record(replacement),
                None => self.clone(),
            },
            TypeExpr::Optional(inner) => TypeExpr::Optional(Box::new(inner.map_records(switch))),
            TypeExpr::List(inner) => TypeExpr::List(Box::new(inner.map_records(switch))),
            TypeExpr::Map(key, value) => TypeExpr::Map(
                Box::new(key.map_records(switch)),
                Box::new(value.map_records(switch)),
            ),
            TypeExpr::Union(members) => {
                TypeExpr::Union(members.iter().map(|m| m.map_records(switch)).collect())
            }
            TypeExpr::Scalar(_) | TypeExpr::Literal(_) => self.clone(),
        }
    }

    /// All record types referenced anywhere in the expression, outermost first.
    pub fn records(&self) -> Vec<&RecordType> {
        let mut found = Vec::new();
        self.collect_records(&mut found);
        found
    }

    fn collect_records<'a>(&'a self, found: &mut Vec<&'a RecordType>) {
        match self {
            TypeExpr::Record(record) => found.push(record),
            TypeExpr::Optional(inner) | TypeExpr::List(inner) => inner.collect_records(found),
            TypeExpr::Map(key, value) => {
                key.collect_records(found);
                value.collect_records(found);
            }
            TypeExpr::Union(members) => {
                for member in members {
                    member.collect_records(found);
                }
            }
            TypeExpr::Scalar(_) | TypeExpr::Literal(_) => {}
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Scalar(name) => f.write_str(name),
            TypeExpr::Optional(inner) => write!(f, "{inner}?"),
            TypeExpr::List(inner) => write!(f, "list<{inner}>"),
            TypeExpr::Map(key, value) => write!(f, "map<{key}, {value}>"),
            TypeExpr::Union(members) => {
                for (idx, member) in members.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            TypeExpr::Literal(value) => write!(f, "literal({value})"),
            TypeExpr::Record(record) => f.write_str(record.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDescriptor;

    #[test]
    fn optional_is_idempotent() {
        let once = TypeExpr::scalar("int").optional();
        let twice = once.clone().optional();
        assert_eq!(once, twice);
        assert_eq!(twice.to_string(), "int?");
    }

    #[test]
    fn union_with_none_counts_as_optional() {
        let expr = TypeExpr::Union(vec![TypeExpr::scalar("str"), TypeExpr::scalar("none")]);
        assert!(expr.is_optional());
        assert_eq!(expr.clone().optional(), expr);
    }

    #[test]
    fn map_records_walks_containers() {
        let address = RecordType::builder("Address")
            .field(FieldDescriptor::new("city", TypeExpr::scalar("str")))
            .build()
            .expect("build Address");
        let address_out = RecordType::builder("AddressOutput")
            .build()
            .expect("build AddressOutput");

        let expr = TypeExpr::list(TypeExpr::record(&address).optional());
        let switched = expr.map_records(&mut |record| {
            (record == &address).then(|| address_out.clone())
        });

        assert_eq!(switched.to_string(), "list<AddressOutput?>");
        assert_eq!(switched.records(), vec![&address_out]);
        // source expression untouched
        assert_eq!(expr.records(), vec![&address]);
    }
}
