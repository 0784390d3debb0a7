//! Error types for the paragon-core library.

use thiserror::Error;

/// Main error type for the paragon library.
#[derive(Error, Debug)]
pub enum ParagonError {
    /// Receipt text source error.
    #[error("text source error: {0}")]
    TextSource(#[from] TextSourceError),

    /// Generative model service error.
    #[error("generative service error: {0}")]
    Generation(#[from] GenerationError),

    /// Product resolution error.
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Pantry state error.
    #[error("pantry error: {0}")]
    Pantry(#[from] PantryError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors produced while turning a receipt file into text.
#[derive(Error, Debug)]
pub enum TextSourceError {
    /// File type the core cannot read without an OCR engine.
    #[error("unsupported receipt format: {0}")]
    UnsupportedFormat(String),

    /// PDF text layer could not be read.
    #[error("failed to read PDF text: {0}")]
    Pdf(String),

    /// The file yielded no usable text.
    #[error("no usable text in {0}")]
    NoText(String),
}

/// Errors raised by the external generative model service.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The service could not be reached or answered with a transport error.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success status.
    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The call exceeded its time budget.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// The service answered but the envelope was not usable.
    #[error("malformed service response: {0}")]
    Malformed(String),

    /// No model is configured for this pipeline.
    #[error("generative extraction disabled")]
    Disabled,
}

/// Errors raised by a [`ProductStore`](crate::store::ProductStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{entity} '{key}' already exists")]
    Conflict { entity: &'static str, key: String },

    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Errors raised while resolving a raw name to a product.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Nothing left to resolve after trimming.
    #[error("empty product name")]
    EmptyName,

    /// Concurrent writers kept winning the race for this name.
    #[error("gave up resolving '{name}' after {attempts} attempts")]
    RetriesExhausted { name: String, attempts: u32 },

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by pantry status transitions.
#[derive(Error, Debug, PartialEq)]
pub enum PantryError {
    /// Status only moves forward out of `in_stock`.
    #[error("cannot move pantry item from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    /// Consumption amount must be positive.
    #[error("invalid consumption amount: {0}")]
    InvalidAmount(String),

    /// A stored status that names no known state.
    #[error("unknown pantry status '{0}'")]
    UnknownStatus(String),
}

/// Result type for the paragon library.
pub type Result<T> = std::result::Result<T, ParagonError>;
