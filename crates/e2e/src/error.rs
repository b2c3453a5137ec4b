//! Error types for storefront and user-API verification

use thiserror::Error;

use crate::validation::FieldError;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out after {timeout_ms} ms waiting for: {action}")]
    NavigationTimeout { action: String, timeout_ms: u64 },

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Validation failed: {}", format_field_errors(.0))]
    ValidationFailure(Vec<FieldError>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(UnauthorizedReason),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Step '{step}' needs '{key}' but no earlier step produced it")]
    MissingContext { step: String, key: String },

    #[error("Browser driver error: {0}")]
    Driver(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Why the user resource answered 401, told apart by the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnauthorizedReason {
    /// A token was sent but rejected.
    InvalidToken,
    /// No token was sent at all.
    AuthenticationFailed,
    Other(String),
}

impl UnauthorizedReason {
    pub const INVALID_TOKEN: &'static str = "Invalid token";
    pub const AUTHENTICATION_FAILED: &'static str = "Authentication failed";

    pub fn from_message(message: &str) -> Self {
        match message {
            Self::INVALID_TOKEN => Self::InvalidToken,
            Self::AUTHENTICATION_FAILED => Self::AuthenticationFailed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidToken => Self::INVALID_TOKEN,
            Self::AuthenticationFailed => Self::AUTHENTICATION_FAILED,
            Self::Other(message) => message,
        }
    }
}

impl std::fmt::Display for UnauthorizedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl E2eError {
    pub fn timeout(action: impl Into<String>, timeout: std::time::Duration) -> Self {
        E2eError::NavigationTimeout {
            action: action.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        E2eError::AssertionFailed(message.into())
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
