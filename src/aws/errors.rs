/// Errors from the AWS API layer.
use aws_smithy_types::error::display::DisplayErrorContext;
use thiserror::Error;

/// A classified AWS API failure.
///
/// Classification is a substring match on the rendered error text, which
/// includes the service error code (e.g. `ValidationError`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloudError {
    /// Credentials were rejected or could not be resolved for the profile.
    #[error("Authorization Failure: {message}")]
    AuthFailure {
        /// Rendered SDK error text.
        message: String,
    },

    /// The caller is not allowed to perform the operation.
    #[error("Access Denied Failure: {message}")]
    AccessDenied {
        /// Rendered SDK error text.
        message: String,
    },

    /// The request was rejected as invalid, typically a stack that no longer exists.
    #[error("Validation Failure: {message}")]
    Validation {
        /// Rendered SDK error text.
        message: String,
    },

    /// Anything else.
    #[error("Other kind of failure: {message}")]
    Other {
        /// Rendered SDK error text.
        message: String,
    },
}

const AUTH_MARKERS: &[&str] = &[
    "AuthFailure",
    "UnrecognizedClientException",
    "InvalidClientTokenId",
    "ExpiredToken",
    "credentials",
];
const ACCESS_DENIED_MARKERS: &[&str] = &["AccessDenied", "UnauthorizedOperation"];
const VALIDATION_MARKERS: &[&str] = &["ValidationError", "does not exist"];

impl CloudError {
    /// Classify an error message.
    #[must_use]
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let has = |markers: &[&str]| markers.iter().any(|m| message.contains(m));

        if has(AUTH_MARKERS) {
            Self::AuthFailure { message }
        } else if has(ACCESS_DENIED_MARKERS) {
            Self::AccessDenied { message }
        } else if has(VALIDATION_MARKERS) {
            Self::Validation { message }
        } else {
            Self::Other { message }
        }
    }

    /// Classify any SDK error by its full rendered context chain.
    #[must_use]
    pub fn from_sdk<E: std::error::Error>(err: E) -> Self {
        Self::classify(DisplayErrorContext(err).to_string())
    }

    /// Machine-readable code (snake_case).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthFailure { .. } => "auth_failure",
            Self::AccessDenied { .. } => "access_denied",
            Self::Validation { .. } => "validation_error",
            Self::Other { .. } => "other",
        }
    }

    /// The underlying error text.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::AuthFailure { message }
            | Self::AccessDenied { message }
            | Self::Validation { message }
            | Self::Other { message } => message,
        }
    }
}
