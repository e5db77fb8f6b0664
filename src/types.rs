/// Shared serializable output types.
///
/// These types are what gets written to stdout, either as JSON or rendered
/// as a table. They are decoupled from the internal `CorrelatedRow` /
/// `CleanupAction` types.
use serde::{Deserialize, Serialize};

use crate::audit::{
    AuditError, AuditReport, CleanupAction, CleanupOptions, CleanupOutcome, CorrelatedRow,
    LookupFailure,
};

/// One product row of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowOutput {
    /// Account id from the stack's `AccountID` output, or null.
    pub account_id: Option<String>,
    /// Provisioned product name.
    pub product_name: String,
    /// Provisioned product id (e.g. `pp-abc123`).
    pub product_id: String,
    /// Backing stack name, or null when none was found.
    pub stack_name: Option<String>,
    /// Provisioned product status (e.g. `AVAILABLE`, `ERROR`).
    pub product_status: String,
    /// Backing stack status, or null.
    pub stack_status: Option<String>,
    /// Account email from the stack's `AccountEmail` parameter, or null.
    pub account_email: Option<String>,
    /// Whether the product is ERROR or TAINTED.
    pub highlighted: bool,
    /// The stack lookup failed; stack fields are unknown rather than absent.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub lookup_failed: bool,
}

impl From<&CorrelatedRow> for RowOutput {
    fn from(row: &CorrelatedRow) -> Self {
        Self {
            account_id: row.account_id.clone(),
            product_name: row.product_name.clone(),
            product_id: row.product_id.clone(),
            stack_name: row.stack_name.clone(),
            product_status: row.product_status.as_str().to_owned(),
            stack_status: row.stack_status.clone(),
            account_email: row.account_email.clone(),
            highlighted: row.is_highlighted(),
            lookup_failed: row.lookup_failed,
        }
    }
}

/// A per-product lookup failure that did not stop the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureOutput {
    pub product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_status: Option<String>,
    /// Machine-readable error class (snake_case).
    pub code: String,
    pub message: String,
}

impl From<&LookupFailure> for FailureOutput {
    fn from(f: &LookupFailure) -> Self {
        Self {
            product_id: f.product_id.clone(),
            stack_name: f.stack_name.clone(),
            stack_status: f.stack_status.clone(),
            code: f.error.code().to_owned(),
            message: f.error.message().to_owned(),
        }
    }
}

/// One error entry from a termination record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordErrorOutput {
    pub code: String,
    pub description: String,
}

/// What was done (or recommended) for one cleanup candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupOutput {
    pub product_id: String,
    pub product_name: String,
    /// `recommended`, `terminated`, or `failed`.
    pub action: String,
    /// The manual command, for `recommended`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Record status returned by Service Catalog, for `terminated`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub record_errors: Vec<RecordErrorOutput>,
    /// API error text, for `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&CleanupAction> for CleanupOutput {
    fn from(a: &CleanupAction) -> Self {
        let mut out = Self {
            product_id: a.product_id.clone(),
            product_name: a.product_name.clone(),
            action: String::new(),
            command: None,
            record_status: None,
            record_errors: Vec::new(),
            error: None,
        };
        match &a.outcome {
            CleanupOutcome::Recommended { command } => {
                out.action = "recommended".to_owned();
                out.command = Some(command.clone());
            }
            CleanupOutcome::Terminated(record) => {
                out.action = "terminated".to_owned();
                out.record_status = Some(record.status.clone());
                out.record_errors = record
                    .errors
                    .iter()
                    .map(|e| RecordErrorOutput {
                        code: e.code.clone(),
                        description: e.description.clone(),
                    })
                    .collect();
            }
            CleanupOutcome::Failed(err) => {
                out.action = "failed".to_owned();
                out.error = Some(err.to_string());
            }
        }
        out
    }
}

/// The complete report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutput {
    pub profile: String,
    pub region: String,
    /// Whether `--delete` was in effect.
    pub delete: bool,
    pub products: Vec<RowOutput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureOutput>,
    pub cleanup: Vec<CleanupOutput>,
}

impl ReportOutput {
    /// Assemble the output document for one run.
    #[must_use]
    pub fn new(report: &AuditReport, opts: &CleanupOptions) -> Self {
        Self {
            profile: opts.profile.clone(),
            region: opts.region.clone(),
            delete: opts.delete,
            products: report.rows.iter().map(RowOutput::from).collect(),
            failures: report.failures.iter().map(FailureOutput::from).collect(),
            cleanup: report.actions.iter().map(CleanupOutput::from).collect(),
        }
    }
}

/// A structured error envelope for JSON error output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorOutput {
    /// Always `false`.
    pub ok: bool,
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail in the JSON error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (snake_case).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorOutput {
    /// Construct from an `AuditError`.
    #[must_use]
    pub fn from_audit_error(err: &AuditError) -> Self {
        Self {
            ok: false,
            error: ErrorDetail {
                code: err.code().to_owned(),
                message: err.to_string(),
            },
        }
    }
}
