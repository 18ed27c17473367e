//! Error type for provider lookups.
//!
//! Every failure a provider adapter can hit is one [`ProviderError`] variant.
//! The variants split into transient conditions worth retrying (see
//! [`ProviderError::is_retryable`]) and everything else, which fails fast.
//! None of them is fatal: the fallback layer turns them into an absent result.

/// Failure while talking to, or decoding the answer of, one provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider is disabled or missing a required credential.
    #[error("Provider {provider} is not available")]
    Unavailable {
        /// Provider identifier.
        provider: String,
    },

    /// The request never produced an HTTP response.
    #[error("Network error [{provider}]: {source}")]
    Network {
        /// Provider identifier.
        provider: String,
        /// The underlying transport error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The request did not finish within the configured timeout.
    #[error("Request to {provider} timed out")]
    Timeout {
        /// Provider identifier.
        provider: String,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("Provider {provider} returned HTTP {status}")]
    Status {
        /// Provider identifier.
        provider: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body was not the JSON shape the adapter expects.
    #[error("Malformed response from {provider}: {message}")]
    Decode {
        /// Provider identifier.
        provider: String,
        /// Human-readable decode failure.
        message: String,
    },

    /// The adapter could not build a request (bad base URL, bad id, ...).
    #[error("Invalid request to {provider}: {message}")]
    InvalidRequest {
        /// Provider identifier.
        provider: String,
        /// Human-readable description.
        message: String,
    },

    /// Every retry attempt failed with a transient error.
    #[error("Provider {provider} failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Provider identifier.
        provider: String,
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Convenience constructor for [`ProviderError::Unavailable`].
    pub fn unavailable(provider: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.into(),
        }
    }

    /// Convenience constructor for [`ProviderError::Network`].
    pub fn network(
        provider: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Network {
            provider: provider.into(),
            source: source.into(),
        }
    }

    /// Convenience constructor for [`ProviderError::Decode`].
    pub fn decode(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`ProviderError::InvalidRequest`].
    pub fn invalid_request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures, timeouts, HTTP 429, and HTTP 5xx are transient.
    /// Other 4xx statuses, decode failures, and configuration problems are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Whether the provider reported that the requested item does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// Whether the provider's payload could not be decoded.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Identifier of the provider this error came from.
    pub fn provider(&self) -> &str {
        match self {
            Self::Unavailable { provider }
            | Self::Network { provider, .. }
            | Self::Timeout { provider }
            | Self::Status { provider, .. }
            | Self::Decode { provider, .. }
            | Self::InvalidRequest { provider, .. }
            | Self::Exhausted { provider, .. } => provider,
        }
    }
}

/// Result type alias using [`ProviderError`].
pub type Result<T> = std::result::Result<T, ProviderError>;
