//! Variant derivation pipeline.
//!
//! A record type is decomposed into a mutable [`SchemaDescriptor`], pushed
//! through an ordered [`Pipeline`] of [`Transformer`]s, realized into a new
//! type by a type factory and finally connected back to its origin through a
//! [`VariantDirectory`]:
//!
//! - **descriptor**: decomposition of a type into field descriptors
//! - **context**: the value threaded through a pipeline run
//! - **pipeline**: the immutable step sequence and its executor
//! - **transformers**: built-in steps
//! - **directory**: per-origin variant registries, aliases and attributes

pub mod context;
pub mod descriptor;
pub mod directory;
pub mod error;
pub mod pipeline;
pub mod transformers;

pub use context::{ContextTemplate, VariantContext, VariantState};
pub use descriptor::{SchemaDescriptor, decompose};
pub use directory::{Attribute, ConnectPlan, VariantDirectory};
pub use error::{ErrorKind, Result, StateKind, VariantError};
pub use pipeline::{Pipeline, Transformer};
