//! Error types for the Fieldbook client.
//!
//! # Design
//! Only failures that prevent a round trip from happening are errors: a bad
//! configuration, a missing identifier for the requested operation, a payload
//! that cannot be encoded, or a transport failure. A non-2xx status or a body
//! that does not decode is a normal `Response` the caller inspects.

/// Errors returned by `FieldbookClient` operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configuration is structurally invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The operation needs a configuration field that is not set.
    #[error("missing required field `{0}` for this operation")]
    MissingField(&'static str),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transport could not complete the round trip (DNS, connect, TLS).
    #[error("transport failed: {0}")]
    Transport(String),
}
