use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid type name: {0:?}")]
    InvalidTypeName(String),
    #[error("invalid field name: {0:?}")]
    InvalidFieldName(String),
    #[error("type {type_name} declares field {field} more than once")]
    DuplicateField { type_name: String, field: String },
    #[error("type {0} has no fields and the factory does not allow empty types")]
    EmptyType(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
