//! Serializable views of record types and derived variants.

use std::collections::BTreeMap;

use serde::Serialize;
use variants_core::Attribute;
use variants_model::{FieldDescriptor, RecordType, Value};

use crate::plan::DerivedVariant;

#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_factory: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<String>,
}

impl From<&FieldDescriptor> for FieldReport {
    fn from(field: &FieldDescriptor) -> Self {
        Self {
            name: field.name.clone(),
            ty: field.ty.to_string(),
            required: field.is_required(),
            default: field.default.clone(),
            default_factory: field
                .default_factory
                .as_ref()
                .map(|factory| factory.name().to_string()),
            markers: field.metadata.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Value>,
    pub fields: Vec<FieldReport>,
}

impl From<&RecordType> for TypeReport {
    fn from(ty: &RecordType) -> Self {
        Self {
            name: ty.name().to_string(),
            base: ty.base().map(|base| base.name().to_string()),
            doc: ty.doc().map(str::to_string),
            config: ty.config().clone(),
            fields: ty.fields().iter().map(FieldReport::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantReport {
    pub origin: String,
    pub variant: String,
    #[serde(rename = "type")]
    pub ty: TypeReport,
    /// Attribute values; type attributes are shown by type name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl From<&DerivedVariant> for VariantReport {
    fn from(derived: &DerivedVariant) -> Self {
        Self {
            origin: derived.origin.name().to_string(),
            variant: derived.variant.clone(),
            ty: TypeReport::from(&derived.ty),
            attributes: derived
                .attributes
                .iter()
                .map(|(name, attribute)| (name.clone(), attribute_value(attribute)))
                .collect(),
        }
    }
}

pub fn attribute_value(attribute: &Attribute) -> Value {
    match attribute {
        Attribute::Value(value) => value.clone(),
        Attribute::Type(ty) => Value::String(ty.name().to_string()),
    }
}

pub fn type_reports(types: &[RecordType]) -> Vec<TypeReport> {
    types.iter().map(TypeReport::from).collect()
}

pub fn variant_reports(variants: &[DerivedVariant]) -> Vec<VariantReport> {
    variants.iter().map(VariantReport::from).collect()
}
