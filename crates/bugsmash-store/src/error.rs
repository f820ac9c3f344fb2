use thiserror::Error;

/// Errors produced by the store layer.
///
/// A failed mutation is always local to the failing call: it never corrupts
/// the observer registry or the state other subscribers already hold.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A mutation targeted an id that does not exist.
    #[error("Record not found")]
    NotFound,

    /// The persistence service rejected or could not complete the call.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The persistence service refused the operation.
    #[error("Permission denied")]
    PermissionDenied,

    /// Document (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A live subscription ended and its retry budget is exhausted.
    #[error("Subscription closed")]
    SubscriptionClosed,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
