//! Error types for yang-bind

use thiserror::Error;

/// Main error type for conversion operations
#[derive(Debug, Error)]
pub enum BindError {
    /// A data node or identifier step cannot be mapped to any schema node
    /// (unregistered namespace, unknown child, invalid augmentation reference)
    #[error("schema resolution failed: {0}")]
    SchemaResolution(String),

    /// No model class binding registered for a schema node
    #[error("class resolution failed: {0}")]
    ClassResolution(String),

    /// The object tree's runtime shape disagrees with schema expectations
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A model object identifier step cannot be resolved against the schema
    #[error("invalid model object id: {0}")]
    InvalidModelId(String),

    /// Leaf value cannot be coerced to/from its declared YANG type
    #[error("type conversion error: {0}")]
    TypeConversion(String),

    /// Builder acquire/release misuse (unbalanced enter/exit)
    #[error("builder state error: {0}")]
    BuilderState(String),
}

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, BindError>;
