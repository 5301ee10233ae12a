use thiserror::Error;

/// Errors returned by the pinning-gateway client.
#[derive(Debug, Error)]
pub enum PinError {
    /// Network or TLS failure from the underlying HTTP client, or a
    /// non-2xx response status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured base URL could not be parsed.
    #[error("invalid pinner base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The gateway answered 2xx but without a content identifier.
    #[error("pin response for {url} is missing a content identifier")]
    MissingCid { url: String },
}
