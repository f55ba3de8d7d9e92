//! Error types for the cloud management API.
//!
//! Authentication failures are kept apart from transport and API failures so
//! callers never retry a rejected credential.

use std::fmt;

/// Result type alias for cloud operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of cloud errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport failure before a response arrived (transient, retryable).
    Network,
    /// Credentials rejected by the identity provider.
    Auth,
    /// The API answered with a non-success status.
    Api,
    /// Response body did not have the expected shape.
    Format,
    /// Region or resource does not exist.
    NotFound,
    /// Local configuration is unusable.
    Config,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Auth => "Authentication failed",
            Self::Api => "Cloud API error",
            Self::Format => "Unexpected response format",
            Self::NotFound => "Region not found",
            Self::Config => "Invalid cloud configuration",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::Auth => "Create a new app password and update your configuration",
            Self::Api => "Check the response body for details",
            Self::Format => "The cloud endpoint may be misconfigured",
            Self::NotFound => "Run `mzform region list` to see available regions",
            Self::Config => "Check the cloud section of your configuration file",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the cloud.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The identity provider rejected the credentials.
    #[error("authentication failed: {message}")]
    Auth {
        /// Response body or reason.
        message: String,
    },

    /// Non-success response; the body is kept verbatim.
    #[error("API request failed with status {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// App password is not `mzp_` followed by two hex UUIDs.
    #[error("invalid app password: {0}")]
    InvalidAppPassword(String),

    /// Region id is not known to the fleet API.
    #[error("region not found: {0}")]
    RegionNotFound(String),

    /// Region exists but has not been enabled yet.
    #[error("region {0} is not enabled")]
    RegionNotEnabled(String),

    /// Generic configuration error.
    #[error("{0}")]
    Config(String),
}

impl Error {
    /// Create an API error from a status and body.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Auth { .. } => ErrorCategory::Auth,
            Error::Api { status, .. } if *status >= 500 => ErrorCategory::Network,
            Error::Api { .. } => ErrorCategory::Api,
            Error::Http(_) => ErrorCategory::Network,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::InvalidAppPassword(_) | Error::Config(_) => ErrorCategory::Config,
            Error::RegionNotFound(_) | Error::RegionNotEnabled(_) => ErrorCategory::NotFound,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::api(code, String::new()),
            other => Self::Http(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
