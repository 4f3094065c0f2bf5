//! Error types for aiagent.
//!
//! Configuration and dependency errors are fatal and surface immediately.
//! Provider errors come from the remote endpoint and are passed through to
//! the caller unchanged.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for aiagent.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (unknown provider, missing secret, invalid value)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The client backing a provider was not compiled into this build
    #[error("Provider '{provider}' is unavailable: build with the '{feature}' feature to enable it")]
    DependencyMissing { provider: String, feature: String },

    /// Provider error with structured details
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

impl Error {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Config(_) => Some("Check your .env file or aiagent.toml"),
            Error::DependencyMissing { .. } => {
                Some("Rebuild with the provider's cargo feature enabled")
            }
            Error::Provider(e) => e.recovery_suggestion(),
        }
    }

    /// Create an unknown-provider error listing the valid alternatives.
    pub fn unknown_provider(name: &str, valid: &[&str]) -> Self {
        Error::Config(format!(
            "Invalid LLM provider: {}. Valid providers: {:?}",
            name, valid
        ))
    }

    /// Create a dependency-missing error.
    pub fn dependency_missing(provider: impl Into<String>, feature: impl Into<String>) -> Self {
        Error::DependencyMissing {
            provider: provider.into(),
            feature: feature.into(),
        }
    }

    /// Whether retrying the same request might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Provider(e) if e.is_transient())
    }
}

/// Provider-specific errors with detailed context.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Authentication failed
    #[error("Authentication failed for {provider}: {message}")]
    AuthenticationFailed { provider: String, message: String },

    /// API request failed
    #[error("API request to {provider} failed: {status} - {message}")]
    ApiError {
        provider: String,
        status: u16,
        message: String,
    },

    /// Streaming error
    #[error("Streaming error from {provider}: {message}")]
    StreamError { provider: String, message: String },

    /// Timeout
    #[error("Request to {provider} timed out")]
    Timeout { provider: String },

    /// Network error
    #[error("Network error connecting to {provider}: {message}")]
    NetworkError { provider: String, message: String },

    /// Response body could not be understood
    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse { provider: String, message: String },
}

impl ProviderError {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            ProviderError::AuthenticationFailed { .. } => {
                Some("Check that your API key is valid and not expired")
            }
            ProviderError::ApiError { status: 429, .. } => {
                Some("You've hit rate limits. Wait a moment and try again")
            }
            ProviderError::ApiError {
                status: 500..=599, ..
            } => Some("The API service is having issues. Try again later"),
            ProviderError::Timeout { .. } => {
                Some("Try a simpler request or check your network connection")
            }
            ProviderError::NetworkError { .. } => {
                Some("Check that the endpoint URL is reachable")
            }
            _ => None,
        }
    }

    /// Create an API error from status code and message.
    pub fn api_error(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        let provider = provider.into();
        let message = message.into();
        if status == 401 || status == 403 {
            return ProviderError::AuthenticationFailed { provider, message };
        }
        ProviderError::ApiError {
            provider,
            status,
            message,
        }
    }

    /// Rate limits, server errors and connection problems are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::ApiError { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Timeout { .. } | ProviderError::NetworkError { .. } => true,
            _ => false,
        }
    }
}

/// Format an error with its recovery suggestion.
pub fn format_error_with_suggestion(error: &Error) -> String {
    let mut output = error.to_string();
    if let Some(suggestion) = error.recovery_suggestion() {
        output.push_str(&format!("\n  Suggestion: {}", suggestion));
    }
    output
}
