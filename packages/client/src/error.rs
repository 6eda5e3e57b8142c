//! Error types for the live chat client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The viewer page URL could not be parsed
    #[error("Invalid page URL '{url}': {reason}")]
    InvalidPageUrl { url: String, reason: String },

    /// The page is served over a scheme with no websocket mapping
    #[error("Unsupported page scheme '{0}'")]
    UnsupportedScheme(String),

    /// The page URL has no host to connect to
    #[error("Page URL '{0}' has no host")]
    MissingHost(String),

    /// The room query parameter is absent
    #[error("Missing room parameter '{0}'")]
    MissingRoom(String),

    /// No websocket URL could be resolved from the configuration
    #[error("Missing websocket URL: pass --page-url or --url")]
    MissingUrl,

    /// No live transport is attached
    #[error("Not connected")]
    NotConnected,

    /// The transport was closed before the frame could be queued
    #[error("Transport is closed")]
    TransportClosed,

    /// An outbound command could not be serialized
    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reasons an inbound frame is dropped
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not JSON, or a known variant with invalid fields
    #[error("Malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Valid JSON without any recognized top-level key
    #[error("Unrecognized frame with keys [{}]", .0.join(", "))]
    Unrecognized(Vec<String>),
}
