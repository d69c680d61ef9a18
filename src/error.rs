//! Error type shared by the AI provider adapters.

use thiserror::Error;
use tracing::warn;

/// Errors raised by completion, transcription, speech and media providers.
///
/// None of these reach the end user directly: call sites map them to a fixed
/// fallback through [`FallbackExt`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Audio or image conversion through an external tool failed.
    #[error("transcode failed: {0}")]
    Transcode(String),

    /// The provider answered but produced nothing usable.
    #[error("empty response")]
    EmptyResponse,
}

/// Explicit fallback-on-error for provider results that end up in front of a user.
pub trait FallbackExt {
    /// Returns the value, or logs the error and returns `fallback`.
    fn or_fallback(self, label: &str, fallback: &str) -> String;
}

impl FallbackExt for Result<String, ProviderError> {
    fn or_fallback(self, label: &str, fallback: &str) -> String {
        match self {
            Ok(value) => value,
            Err(e) => {
                warn!("{} failed, using fallback: {}", label, e);
                fallback.to_string()
            }
        }
    }
}
