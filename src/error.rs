//! Error types for the codec, store, and sync layers.

use thiserror::Error;

/// Non-fatal parse diagnostics, collected alongside a [`crate::codec::ParseResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseDiagnostic {
    /// A property or parameter could not be decoded and was skipped.
    PropertyMalformed { line: usize, name: String },
    /// A URL-valued property used a scheme outside the allow-list.
    UnsafeScheme { line: usize, scheme: String },
    /// A `TZID` reference could not be resolved; the instance became floating.
    FloatingFallback { line: usize, tzid: String },
}

/// Fatal parse errors that short-circuit the whole document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("input exceeds configured size ceiling of {limit} bytes")]
    InputTooLarge { limit: usize },
    #[error("structural error: {0}")]
    StructuralError(String),
}

/// Errors from the RRULE expander.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error("RRULE expansion exceeded the {limit} instance ceiling")]
    RRuleExplosion { limit: usize },
    #[error("invalid recurrence rule: {0}")]
    InvalidRule(String),
}

/// Errors surfaced by the generator. Indicates a bug: a valid value model
/// should never fail to serialize.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("could not serialize property {0}: value invariant violated")]
    Serialize(String),
}

/// Errors from a [`crate::sync::RemoteAdapter`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned a transient error (5xx/429): {0}")]
    ServerTransient(String),
    #[error("server rejected the request (4xx): {0}")]
    ServerRejection(String),
    #[error("authentication failed")]
    AuthFailure,
    #[error("precondition failed (412/etag conflict)")]
    Conflict,
}

impl AdapterError {
    /// Whether the reconciler should retry this operation with backoff.
    pub fn is_retriable(&self) -> bool {
        matches!(self, AdapterError::Network(_) | AdapterError::ServerTransient(_))
    }
}

/// Errors from an [`crate::store::OperationStore`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),
    #[error("no operation with id {0}")]
    NotFound(String),
}

/// The crate-wide error type, unifying every layer so call sites can use `?`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalSyncError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Expand(#[from] ExpandError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
