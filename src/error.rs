//! Error types

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while constructing a client or delivering a submission.
///
/// Only construction errors are returned to the caller directly. Delivery
/// errors are rendered with `Display` and handed to [Callback::failure](crate::Callback::failure).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The customer token was empty
    #[error("token cannot be empty")]
    EmptyToken,

    /// The background worker pool could not be started
    #[error("failed to start worker pool: {0}")]
    Runtime(#[source] std::io::Error),

    /// The endpoint could not be used as a base URL
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// Configured endpoint
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },

    /// Connection, TLS, timeout or client construction failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Logging Error: status:{status} {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if any could be read
        body: String,
    },

    /// Response body was not the expected json object
    #[error("invalid response '{body}': {source}")]
    Decode {
        /// Underlying json error
        #[source]
        source: serde_json::Error,
        /// Raw response body
        body: String,
    },

    /// Response was well formed but did not report success
    #[error("endpoint rejected submission: {0}")]
    Rejected(String),

    /// Rendered tag string cannot be carried in a request header
    #[error("invalid tags '{0}'")]
    InvalidTags(String),

    /// The submission task panicked or was cancelled before completing
    #[error("submission worker failed: {0}")]
    Worker(String),
}
