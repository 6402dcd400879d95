//! Error types for document generation.

use thiserror::Error;

/// Errors that can occur while generating a document.
#[derive(Debug, Error)]
pub enum DocsError {
    /// The document could not be serialized.
    #[error("Failed to serialize OpenAPI document: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A route uses a method OpenAPI path items cannot hold.
    #[error("Invalid operation '{operation_id}': {reason}")]
    InvalidOperation {
        /// The procedure id of the route.
        operation_id: String,
        /// Why the route cannot be documented.
        reason: String,
    },

    /// Two enabled routes share a method and OpenAPI path.
    #[error("Duplicate operation {method} {path}")]
    DuplicateOperation {
        /// HTTP method.
        method: String,
        /// OpenAPI path.
        path: String,
    },
}

/// Result type for documentation operations.
pub type DocsResult<T> = Result<T, DocsError>;
