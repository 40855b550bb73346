//! Error types for the object-graph mapping layer

use thiserror::Error;

/// Errors that can occur when mapping or persisting graph elements
#[derive(Error, Debug)]
pub enum OgmError {
    /// A scalar or vertex property value failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Schema construction or property lookup failed
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Operation attempted on a structurally invalid element
    #[error("Element error: {0}")]
    Element(String),

    /// Update attempted on an element whose type is immutable
    #[error("Immutable element: {0}")]
    Immutable(String),

    /// Failure reported by the submission interface
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OgmError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        OgmError::Validation(msg.into())
    }

    pub(crate) fn mapping(msg: impl Into<String>) -> Self {
        OgmError::Mapping(msg.into())
    }

    pub(crate) fn element(msg: impl Into<String>) -> Self {
        OgmError::Element(msg.into())
    }

    pub(crate) fn backend(msg: impl Into<String>) -> Self {
        OgmError::Backend(msg.into())
    }
}

pub type OgmResult<T> = Result<T, OgmError>;
