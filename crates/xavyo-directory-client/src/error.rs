//! Error types for the directory client.
//!
//! Errors carry a transient/permanent classification used by the retry layer
//! and a mapping from the service's error codes to typed kinds.

use thiserror::Error;

/// Result type alias using `DirectoryError`.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// A single element of a `users` sequence that could not be mapped.
#[derive(Debug)]
pub struct ElementFailure {
    /// Position of the element in the response's `users` sequence.
    pub index: usize,
    /// The element's `localId`, when it could be read.
    pub uid: Option<String>,
    /// Why mapping failed.
    pub error: Box<DirectoryError>,
}

impl std::fmt::Display for ElementFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.uid {
            Some(uid) => write!(f, "users[{}] ({uid}): {}", self.index, self.error),
            None => write!(f, "users[{}]: {}", self.index, self.error),
        }
    }
}

/// Errors that can occur when talking to the identity directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    // Transport errors (retried for reads)
    /// Connection could not be established or was reset.
    #[error("transport error: {0}")]
    Transport(String),

    /// The round trip did not complete in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The service answered with a gateway/unavailable status (502, 503, 504).
    #[error("service unavailable (HTTP {status}): {detail}")]
    Unavailable { status: u16, detail: String },

    // Decode errors (never retried)
    /// The response envelope is not valid JSON or has the wrong shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// One field of a user object has a representation we do not accept.
    #[error("field `{field}` has unrecognized representation: {representation}")]
    FieldDecode {
        field: &'static str,
        representation: String,
    },

    /// One or more elements of a `users` sequence failed to map.
    #[error("{} of {total} user record(s) failed to map; first: {}", .failures.len(), first_failure(.failures))]
    PartialMapping {
        failures: Vec<ElementFailure>,
        total: usize,
    },

    // Service errors
    /// No user matches the identifier.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// The email address is already in use by another account.
    #[error("email already exists: {0}")]
    EmailAlreadyExists(String),

    /// The phone number is already in use by another account.
    #[error("phone number already exists: {0}")]
    PhoneNumberAlreadyExists(String),

    /// The uid is already in use by another account.
    #[error("uid already exists: {0}")]
    UidAlreadyExists(String),

    /// The uid was rejected by the service.
    #[error("invalid uid: {0}")]
    InvalidUid(String),

    /// The password does not satisfy the service's strength policy.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// The service returned an error code this client does not recognize.
    #[error("upstream error {code} (HTTP {status}): {message}")]
    Upstream {
        status: u16,
        code: String,
        message: String,
    },

    // Client-side errors
    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// A point lookup matched more than one record.
    #[error("lookup matched {count} records, expected exactly one")]
    AmbiguousResult { count: usize },

    /// An argument was rejected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Client configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Credentials could not be obtained or were rejected.
    #[error("authentication error: {0}")]
    Auth(String),

    /// All retry attempts of a read failed. `source` is the last attempt's error.
    #[error("{operation}: maximum retries exceeded after {attempts} attempt(s): {source}")]
    MaxRetriesExceeded {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<DirectoryError>,
    },
}

fn first_failure(failures: &[ElementFailure]) -> String {
    failures
        .first()
        .map_or_else(|| "none".to_string(), ToString::to_string)
}

impl DirectoryError {
    /// Whether the error is a transport-level failure that a read may retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout(_) | Self::Unavailable { .. }
        )
    }

    /// Whether the error was reported by the service as a structured error code.
    #[must_use]
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::EmailAlreadyExists(_)
                | Self::PhoneNumberAlreadyExists(_)
                | Self::UidAlreadyExists(_)
                | Self::InvalidUid(_)
                | Self::WeakPassword(_)
                | Self::Upstream { .. }
        )
    }

    /// Build a typed error from a service error code and its detail message.
    ///
    /// `code` is the leading token of the service message (for example
    /// `USER_NOT_FOUND`); unknown codes become [`DirectoryError::Upstream`].
    #[must_use]
    pub fn from_service_code(status: u16, code: &str, detail: &str) -> Self {
        let detail = if detail.is_empty() {
            code.to_string()
        } else {
            detail.to_string()
        };
        match code {
            "USER_NOT_FOUND" => Self::UserNotFound(detail),
            "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => Self::EmailAlreadyExists(detail),
            "PHONE_NUMBER_EXISTS" | "DUPLICATE_PHONE_NUMBER" => {
                Self::PhoneNumberAlreadyExists(detail)
            }
            "DUPLICATE_LOCAL_ID" | "UID_ALREADY_EXISTS" => Self::UidAlreadyExists(detail),
            "INVALID_LOCAL_ID" | "INVALID_UID" => Self::InvalidUid(detail),
            "WEAK_PASSWORD" => Self::WeakPassword(detail),
            _ => Self::Upstream {
                status,
                code: code.to_string(),
                message: detail,
            },
        }
    }
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::InvalidConfig(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DirectoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
