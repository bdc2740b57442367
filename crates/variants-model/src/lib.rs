//! Record-type model for variant derivation.
//!
//! This crate is the record-type system the derivation pipeline runs against:
//!
//! - **types**: type expressions (`int`, `Optional<str>`, nested records)
//! - **marker**: opaque per-field metadata markers
//! - **field**: field descriptors (name, type, markers, required/default state)
//! - **record**: immutable record types with process-unique identity
//! - **factory**: the construction primitive used to realize new types

pub mod error;
pub mod factory;
pub mod field;
pub mod marker;
pub mod record;
pub mod types;

pub use error::{ModelError, Result};
pub use factory::{BuildRequest, FactoryOptions, RecordTypeFactory, TypeFactory};
pub use field::{DefaultFactory, FieldDescriptor};
pub use marker::{FilterScope, Marker};
pub use record::{RecordType, RecordTypeBuilder, TypeKey, WeakRecordType};
pub use types::TypeExpr;

/// Opaque value used for defaults, schema config and side-channel signals.
pub use serde_json::Value;
