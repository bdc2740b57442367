use std::fmt;

use thiserror::Error;
use variants_model::ModelError;

/// Which side of the one-way Decomposed → Built transition a context is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Decomposed,
    Built,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKind::Decomposed => f.write_str("decomposed"),
            StateKind::Built => f.write_str("built"),
        }
    }
}

/// Broad error classes. None of them is transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A transformer was constructed with an invalid mode combination.
    Configuration,
    /// A transformer ran against a context in the wrong state, or referenced
    /// something (variant, registry, attribute) that does not exist.
    StateContract,
    /// A step would produce two fields with the same name.
    FieldIdentity,
    /// The type factory rejected the realized field set.
    Model,
}

#[derive(Debug, Error)]
pub enum VariantError {
    #[error("{transformer}: invalid configuration: {message}")]
    Configuration {
        transformer: &'static str,
        message: String,
    },
    #[error("{transformer} requires a {expected} context, found {found}")]
    WrongState {
        transformer: &'static str,
        expected: StateKind,
        found: StateKind,
    },
    #[error("{origin} has no variant named {variant:?}")]
    MissingVariant { origin: String, variant: String },
    #[error("{origin} has no variant registry")]
    MissingRegistry { origin: String },
    #[error("{type_name} has no attribute named {attribute:?}")]
    MissingAttribute { type_name: String, attribute: String },
    #[error("{transformer}: field {field:?} already exists in variant {variant}")]
    DuplicateField {
        transformer: &'static str,
        variant: String,
        field: String,
    },
    #[error("pipeline index {index} out of range for {len} steps")]
    StepIndex { index: usize, len: usize },
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl VariantError {
    pub fn configuration(transformer: &'static str, message: impl Into<String>) -> Self {
        VariantError::Configuration {
            transformer,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            VariantError::Configuration { .. } | VariantError::StepIndex { .. } => {
                ErrorKind::Configuration
            }
            VariantError::WrongState { .. }
            | VariantError::MissingVariant { .. }
            | VariantError::MissingRegistry { .. }
            | VariantError::MissingAttribute { .. } => ErrorKind::StateContract,
            VariantError::DuplicateField { .. } => ErrorKind::FieldIdentity,
            VariantError::Model(_) => ErrorKind::Model,
        }
    }
}

pub type Result<T> = std::result::Result<T, VariantError>;
