/// Errors from the audit layer.
use thiserror::Error;

use crate::aws::CloudError;

/// Errors that end an audit run with a non-zero exit code.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Listing provisioned products failed, so there is nothing to correlate.
    #[error("{profile}: {source}")]
    Discovery {
        /// Profile the discovery ran under.
        profile: String,
        /// The classified AWS failure.
        source: CloudError,
    },

    /// One or more terminate calls failed during `--delete`.
    #[error("{failed} of {attempted} terminations failed")]
    TerminationFailed {
        /// Terminate calls that returned an error.
        failed: usize,
        /// Terminate calls issued.
        attempted: usize,
    },
}

/// Exit code mapping for `AuditError` variants.
impl AuditError {
    /// Return the CLI exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Discovery { source, .. } => match source {
                CloudError::AuthFailure { .. } | CloudError::AccessDenied { .. } => 3,
                CloudError::Validation { .. } | CloudError::Other { .. } => 1,
            },
            Self::TerminationFailed { .. } => 4,
        }
    }

    /// Machine-readable code (snake_case).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Discovery { source, .. } => source.code(),
            Self::TerminationFailed { .. } => "termination_failed",
        }
    }
}
