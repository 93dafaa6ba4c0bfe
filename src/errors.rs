/*!
 * Error types for the blogflow console.
 *
 * Transport failures talking to the generation backend are `BackendError`.
 * Workflow-level outcomes the caller has to present to a user are
 * `ConsoleError`. `AppError` is the top-level wrapper used by the binary.
 */

use thiserror::Error;

/// Errors raised while talking to the generation backend over HTTP
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// The request could not be built or sent
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// The backend could not be reached at all
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend answered with a non-success status
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The response body was not the JSON we expected
    #[error("Failed to parse API response: {0}")]
    ParseError(String),
}

impl BackendError {
    /// Whether this error means the backend is unreachable
    pub fn is_connection(&self) -> bool {
        matches!(self, BackendError::ConnectionError(_))
    }

    /// Whether the request timed out on the client side
    pub fn is_timeout(&self) -> bool {
        match self {
            BackendError::RequestFailed(message) | BackendError::ConnectionError(message) => {
                message.to_lowercase().contains("timed out") || message.to_lowercase().contains("timeout")
            }
            _ => false,
        }
    }

    /// Server-supplied `error` field of a JSON error body, if any
    pub fn server_message(&self) -> Option<String> {
        match self {
            BackendError::ApiError { message, .. } => serde_json::from_str::<serde_json::Value>(message)
                .ok()
                .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string)),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            BackendError::RequestFailed(format!("request timed out: {}", error))
        } else if error.is_connect() {
            BackendError::ConnectionError(error.to_string())
        } else if error.is_decode() {
            BackendError::ParseError(error.to_string())
        } else if let Some(status) = error.status() {
            BackendError::ApiError {
                status_code: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            BackendError::RequestFailed(error.to_string())
        }
    }
}

/// Workflow errors surfaced to the user of the console
#[derive(Error, Debug, Clone)]
pub enum ConsoleError {
    /// No connectivity; retries are skipped
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// A job never reached a terminal state within its attempt budget
    #[error("Job '{key}' did not finish after {attempts} status checks")]
    Timeout {
        /// Job key that was being polled
        key: String,
        /// Number of status observations made
        attempts: u32,
    },

    /// The poll was cancelled before reaching a terminal state
    #[error("Polling for '{0}' was cancelled")]
    Cancelled(String),

    /// The backend reported `status: failed`
    #[error("Remote job failed: {0}")]
    RemoteFailure(String),

    /// The backend answered with an unexpected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The request was rejected before reaching the backend
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Transport error that was not retried
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl ConsoleError {
    /// Human-readable message for display
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::NetworkUnavailable(_) => {
                "Network connection lost. Reconnect and try again.".to_string()
            }
            ConsoleError::Timeout { .. } => {
                "The job is taking too long. It may still be running on the server; check again later.".to_string()
            }
            ConsoleError::Cancelled(_) => "The operation was cancelled.".to_string(),
            ConsoleError::RemoteFailure(detail) => format!("The backend reported a failure: {}", detail),
            ConsoleError::MalformedResponse(detail) => {
                format!("The backend returned an unexpected response: {}", detail)
            }
            ConsoleError::Validation(detail) => detail.clone(),
            ConsoleError::Backend(BackendError::ApiError { status_code, .. }) if *status_code >= 500 => {
                "The backend is having trouble. Try again shortly.".to_string()
            }
            ConsoleError::Backend(error) => match error.server_message() {
                Some(message) => message,
                None => format!("Request failed: {}", error),
            },
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the backend transport
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Error from a workflow step
    #[error("Console error: {0}")]
    Console(#[from] ConsoleError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
