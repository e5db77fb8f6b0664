/// The cloud inventory seam: the calls the audit makes, over plain domain types.
use std::fmt;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::errors::CloudError;

/// Provisioned product status as reported by Service Catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductStatus {
    Available,
    UnderChange,
    Tainted,
    Error,
    PlanInProgress,
    /// A status this tool does not know about, kept verbatim.
    Other(String),
}

impl ProductStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "AVAILABLE",
            Self::UnderChange => "UNDER_CHANGE",
            Self::Tainted => "TAINTED",
            Self::Error => "ERROR",
            Self::PlanInProgress => "PLAN_IN_PROGRESS",
            Self::Other(s) => s,
        }
    }

    /// ERROR and TAINTED products are broken and warrant attention.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Error | Self::Tainted)
    }
}

impl From<&str> for ProductStatus {
    fn from(s: &str) -> Self {
        match s {
            "AVAILABLE" => Self::Available,
            "UNDER_CHANGE" => Self::UnderChange,
            "TAINTED" => Self::Tainted,
            "ERROR" => Self::Error,
            "PLAN_IN_PROGRESS" => Self::PlanInProgress,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Service Catalog provisioned product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: String,
    pub id: String,
    pub status: ProductStatus,
}

/// A stack as returned by the lookup (name and status only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSummary {
    pub name: String,
    pub status: String,
}

/// A fully described stack.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackDetail {
    pub name: String,
    pub status: String,
    /// Parameter key/value pairs, in stack order.
    pub parameters: Vec<(String, String)>,
    /// Output key/value pairs. `None` when the stack reports no outputs at all.
    pub outputs: Option<Vec<(String, String)>>,
}

/// One error entry on a termination record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    pub code: String,
    pub description: String,
}

/// The record Service Catalog returns for a terminate request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationRecord {
    pub status: String,
    pub errors: Vec<RecordError>,
}

/// Everything the audit needs from AWS.
///
/// Implemented over the real SDK clients by [`super::AwsInventory`] and mocked in tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Inventory: Send + Sync {
    /// All provisioned products in the account.
    async fn provisioned_products(&self) -> Result<Vec<Product>, CloudError>;

    /// Non-deleted stacks whose name contains `fragment`.
    async fn find_stacks(&self, fragment: &str) -> Result<Vec<StackSummary>, CloudError>;

    /// Describe one stack by name.
    async fn describe_stack(&self, stack_name: &str) -> Result<StackDetail, CloudError>;

    /// Terminate a provisioned product, ignoring resource-level errors.
    async fn terminate_product(&self, product_id: &str) -> Result<TerminationRecord, CloudError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_known_values() {
        for s in ["AVAILABLE", "UNDER_CHANGE", "TAINTED", "ERROR", "PLAN_IN_PROGRESS"] {
            assert_eq!(ProductStatus::from(s).as_str(), s);
        }
    }

    #[test]
    fn test_unknown_status_kept_verbatim() {
        let status = ProductStatus::from("SOMETHING_NEW");
        assert_eq!(status, ProductStatus::Other("SOMETHING_NEW".to_owned()));
        assert!(!status.is_broken());
    }

    #[test]
    fn test_broken_statuses() {
        assert!(ProductStatus::Error.is_broken());
        assert!(ProductStatus::Tainted.is_broken());
        assert!(!ProductStatus::Available.is_broken());
        assert!(!ProductStatus::UnderChange.is_broken());
    }
}
