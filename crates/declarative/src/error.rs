//! Error types for reconciliation.
//!
//! Every failure carries enough context (parameter, value, backend detail,
//! task identifier) for a caller to report it without re-querying anything.
//! Errors are grouped into categories for user feedback.

use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A user-supplied reference could not be turned into exactly one object.
    Resolution,
    /// The driver configuration or the supplied parameters are unusable.
    Configuration,
    /// The backend rejected a request.
    Backend,
    /// An asynchronous task failed or did not finish in time.
    Task,
    /// The request never reached the backend.
    Network,
    /// The backend answered with something we could not interpret.
    Format,
}

impl ErrorCategory {
    /// Whether this error category is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Resolution => "Reference resolution failed",
            Self::Configuration => "Invalid configuration",
            Self::Backend => "Backend rejected the request",
            Self::Task => "Asynchronous task did not complete",
            Self::Network => "Network connectivity issue",
            Self::Format => "Unexpected backend response",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Resolution => "Check the referenced name, or use the UUID to refer to it",
            Self::Configuration => "Check the driver configuration and the supplied parameters",
            Self::Backend => "Inspect the backend error detail and fix the request",
            Self::Task => "Inspect the resource in the backend, then re-run to converge",
            Self::Network => "Check the API URL and your connection, then try again",
            Self::Format => "Verify the API URL points at a compatible backend",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while resolving, planning or executing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A reference matched no object.
    #[error("{message}")]
    NotFound {
        /// Parameter being resolved.
        param: String,
        /// Value supplied by the user.
        value: String,
        /// Rendered message (may come from a per-parameter template).
        message: String,
    },

    /// A reference (or an existence check) matched more than one object.
    #[error(
        "Multiple resources found for '{value}' (parameter '{param}'). Found {count} matches. \
         This resource name is not unique. Please use a UUID to refer to it unambiguously."
    )]
    AmbiguousReference {
        /// Parameter being resolved.
        param: String,
        /// Value supplied by the user.
        value: String,
        /// Number of matches returned.
        count: usize,
    },

    /// Invalid or insufficient driver configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Required parameters were not supplied.
    #[error("missing required parameter(s): {}", .params.join(", "))]
    MissingParameters {
        /// Names of the missing parameters.
        params: Vec<String>,
        /// What the parameters were needed for.
        context: String,
    },

    /// The backend answered with an error status.
    #[error("{method} {url} failed with status {status}: {message}")]
    Backend {
        /// HTTP method.
        method: String,
        /// Full request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short message.
        message: String,
        /// Parsed error body (JSON when possible, otherwise the raw text).
        detail: Value,
    },

    /// An asynchronous task entered an erred state.
    #[error("task on resource {id} failed with state '{state}'")]
    TaskFailed {
        /// Identifier of the polled object.
        id: String,
        /// Terminal state reported.
        state: String,
        /// Full polled object.
        detail: Value,
    },

    /// Polling exhausted its time budget.
    #[error("Timeout waiting for task on resource {id} to complete.")]
    Timeout {
        /// Identifier of the polled object.
        id: String,
        /// Time spent waiting.
        waited: Duration,
    },

    /// The request could not be delivered.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend returned a body that could not be interpreted.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Create a not-found error with the default message.
    pub fn not_found(param: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::NotFound {
            param: param.into(),
            message: format!("Resource '{value}' not found."),
            value,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a missing-parameters error.
    pub fn missing(params: Vec<String>, context: impl Into<String>) -> Self {
        Self::MissingParameters {
            params,
            context: context.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } | Error::AmbiguousReference { .. } => ErrorCategory::Resolution,
            Error::Configuration(_) | Error::MissingParameters { .. } => {
                ErrorCategory::Configuration
            }
            Error::Backend { .. } => ErrorCategory::Backend,
            Error::TaskFailed { .. } | Error::Timeout { .. } => ErrorCategory::Task,
            Error::Transport(_) => ErrorCategory::Network,
            Error::InvalidResponse(_) => ErrorCategory::Format,
        }
    }

    /// Whether this error is typically transient. Server-side failures count.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Backend { status, .. } => *status >= 500,
            other => other.category().is_retryable(),
        }
    }

    /// HTTP status of a backend error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::Resolution.is_retryable());
        assert!(!ErrorCategory::Configuration.is_retryable());
        assert!(!ErrorCategory::Task.is_retryable());
    }

    #[test]
    fn test_error_category_advice() {
        assert!(!ErrorCategory::Resolution.advice().is_empty());
        assert!(!ErrorCategory::Backend.advice().is_empty());
        assert!(format!("{}", ErrorCategory::Network).contains("Network"));
    }

    #[test]
    fn test_not_found_default_message() {
        let err = Error::not_found("project", "alpha");
        assert_eq!(err.to_string(), "Resource 'alpha' not found.");
        assert_eq!(err.category(), ErrorCategory::Resolution);
    }

    #[test]
    fn test_ambiguous_message_names_param_and_count() {
        let err = Error::AmbiguousReference {
            param: "image".to_string(),
            value: "ubuntu".to_string(),
            count: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("'ubuntu'"));
        assert!(msg.contains("parameter 'image'"));
        assert!(msg.contains("Found 3 matches"));
    }

    #[test]
    fn test_backend_retryable_only_for_server_errors() {
        let backend = |status| Error::Backend {
            method: "GET".to_string(),
            url: "https://api.example.com/api/projects/".to_string(),
            status,
            message: "boom".to_string(),
            detail: json!({"detail": "boom"}),
        };
        assert!(backend(503).is_retryable());
        assert!(!backend(400).is_retryable());
        assert_eq!(backend(404).status(), Some(404));
    }

    #[test]
    fn test_missing_parameters_display() {
        let err = Error::missing(vec!["project".into(), "offering".into()], "creation");
        assert_eq!(
            err.to_string(),
            "missing required parameter(s): project, offering"
        );
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::Timeout {
            id: "abc".to_string(),
            waited: Duration::from_secs(3),
        };
        assert_eq!(
            err.to_string(),
            "Timeout waiting for task on resource abc to complete."
        );
        assert_eq!(err.category(), ErrorCategory::Task);
    }
}
