/*!
 * Error types for the subtrans application.
 *
 * Every variant's display text is short enough to be attached to a single
 * file task and shown to the user as-is.
 */

use thiserror::Error;

/// User-facing message for a throttled provider
pub const RATE_LIMIT_MESSAGE: &str = "Requests too frequent, please wait a moment and try again";

/// Errors that can occur when a provider adapter translates one batch
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Missing or rejected credentials
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request could not be sent or no response was received
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Non-success status returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The response body did not match the expected schema
    #[error("Response did not match expected schema: {0}")]
    ParseError(String),

    /// The provider signalled throttling
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
}

impl ProviderError {
    /// Whether this error belongs to the transport family (network or HTTP failure)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::ApiError { .. }
        )
    }

    /// Rate limit error carrying the standard user-facing message
    pub fn rate_limited() -> Self {
        Self::RateLimitExceeded(RATE_LIMIT_MESSAGE.to_string())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur while decoding or parsing a subtitle file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtitleError {
    /// The text contains no recognizable subtitle entries
    #[error("Invalid subtitle format: {0}")]
    FormatError(String),

    /// The file bytes could not be decoded as text
    #[error("Failed to decode file: {0}")]
    Decode(String),
}

/// Errors that can occur during a translation run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// Error with subtitle processing
    #[error("{0}")]
    Subtitle(#[from] SubtitleError),

    /// The active provider has no registered adapter
    #[error("No adapter registered for provider: {0}")]
    MissingProvider(String),
}

/// Errors returned by task queue operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// No task has the given id
    #[error("No task with id {0}")]
    NotFound(String),

    /// The task is being translated and cannot be changed
    #[error("Task {0} is being processed")]
    TaskProcessing(String),
}
