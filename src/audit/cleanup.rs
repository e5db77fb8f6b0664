/// Cleanup of errored and orphaned provisioned products.
///
/// Without `--delete` every candidate only gets the equivalent `aws` CLI
/// command. With it, the terminate call is issued right away and its record
/// is logged. Failed terminations are never retried.
use tracing::{error, info, warn};

use super::correlate::CorrelatedRow;
use crate::aws::{CloudError, Inventory, TerminationRecord};

/// Where the cleanup runs and whether it may delete anything.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    pub profile: String,
    pub region: String,
    /// Terminate candidates instead of printing commands.
    pub delete: bool,
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Dry mode: the manual command to run.
    Recommended { command: String },
    /// The terminate request was accepted.
    Terminated(TerminationRecord),
    /// The terminate request itself failed.
    Failed(CloudError),
}

/// One cleanup candidate and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupAction {
    pub product_id: String,
    pub product_name: String,
    pub outcome: CleanupOutcome,
}

/// Cleanup is only considered when at least one product is ERROR or TAINTED.
#[must_use]
pub fn cleanup_warranted(rows: &[CorrelatedRow]) -> bool {
    rows.iter().any(CorrelatedRow::is_highlighted)
}

/// The `aws` CLI command that terminates `product_id`.
#[must_use]
pub fn terminate_command(product_id: &str, profile: &str, region: &str) -> String {
    format!(
        "aws servicecatalog terminate-provisioned-product --provisioned-product-id {product_id} --profile {profile} --region {region} --ignore-errors"
    )
}

/// Recommend or perform termination for every candidate row.
///
/// Returns an empty list when [`cleanup_warranted`] is false.
pub async fn cleanup<I>(
    inventory: &I,
    rows: &[CorrelatedRow],
    opts: &CleanupOptions,
) -> Vec<CleanupAction>
where
    I: Inventory + ?Sized,
{
    if !cleanup_warranted(rows) {
        return Vec::new();
    }

    let mut actions = Vec::new();
    for row in rows.iter().filter(|r| r.is_cleanup_candidate()) {
        let outcome = if opts.delete {
            terminate(inventory, row, &opts.profile).await
        } else {
            CleanupOutcome::Recommended {
                command: terminate_command(&row.product_id, &opts.profile, &opts.region),
            }
        };
        actions.push(CleanupAction {
            product_id: row.product_id.clone(),
            product_name: row.product_name.clone(),
            outcome,
        });
    }
    actions
}

async fn terminate<I>(inventory: &I, row: &CorrelatedRow, profile: &str) -> CleanupOutcome
where
    I: Inventory + ?Sized,
{
    info!(product = %row.product_name, profile, "terminating provisioned product");
    match inventory.terminate_product(&row.product_id).await {
        Ok(record) => {
            error!(product = %row.product_id, status = %record.status, "result of deletion");
            if let Some(first) = record.errors.first() {
                error!(code = %first.code, description = %first.description, "deletion error");
            }
            CleanupOutcome::Terminated(record)
        }
        Err(err) => {
            warn!(product = %row.product_id, error = %err, "terminate call failed");
            CleanupOutcome::Failed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate;

    use super::*;
    use crate::aws::inventory::RecordError;
    use crate::aws::{MockInventory, ProductStatus};

    fn row(id: &str, status: ProductStatus, stack: Option<&str>) -> CorrelatedRow {
        CorrelatedRow {
            product_name: format!("name-{id}"),
            product_id: id.to_owned(),
            product_status: status,
            stack_name: stack.map(str::to_owned),
            stack_status: stack.map(|_| "CREATE_COMPLETE".to_owned()),
            account_email: None,
            account_id: None,
            lookup_failed: false,
        }
    }

    fn opts(delete: bool) -> CleanupOptions {
        CleanupOptions {
            profile: "lz".to_owned(),
            region: "us-east-1".to_owned(),
            delete,
        }
    }

    #[test]
    fn test_terminate_command_text() {
        assert_eq!(
            terminate_command("pp-123", "lz", "eu-west-1"),
            "aws servicecatalog terminate-provisioned-product --provisioned-product-id pp-123 --profile lz --region eu-west-1 --ignore-errors"
        );
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_terminate() {
        let mut inv = MockInventory::new();
        inv.expect_terminate_product().never();

        let rows = [
            row("pp-err", ProductStatus::Error, None),
            row("pp-ok", ProductStatus::Available, Some("S1")),
        ];
        let actions = cleanup(&inv, &rows, &opts(false)).await;

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].product_id, "pp-err");
        assert_eq!(
            actions[0].outcome,
            CleanupOutcome::Recommended {
                command: terminate_command("pp-err", "lz", "us-east-1")
            }
        );
    }

    #[tokio::test]
    async fn test_delete_terminates_every_candidate() {
        let mut inv = MockInventory::new();
        inv.expect_terminate_product()
            .with(predicate::eq("pp-err"))
            .times(1)
            .returning(|_| {
                Ok(TerminationRecord {
                    status: "IN_PROGRESS".to_owned(),
                    errors: Vec::new(),
                })
            });
        inv.expect_terminate_product()
            .with(predicate::eq("pp-orphan"))
            .times(1)
            .returning(|_| {
                Ok(TerminationRecord {
                    status: "FAILED".to_owned(),
                    errors: vec![RecordError {
                        code: "E1".to_owned(),
                        description: "boom".to_owned(),
                    }],
                })
            });

        let rows = [
            row("pp-err", ProductStatus::Error, Some("S1")),
            row("pp-orphan", ProductStatus::Available, None),
            row("pp-tainted", ProductStatus::Tainted, Some("S2")),
        ];
        let actions = cleanup(&inv, &rows, &opts(true)).await;

        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0].outcome, CleanupOutcome::Terminated(ref r) if r.status == "IN_PROGRESS"));
        assert!(matches!(actions[1].outcome, CleanupOutcome::Terminated(ref r) if r.errors[0].code == "E1"));
    }

    #[tokio::test]
    async fn test_terminate_failure_is_recorded_not_retried() {
        let mut inv = MockInventory::new();
        inv.expect_terminate_product()
            .times(1)
            .returning(|_| Err(CloudError::classify("AccessDeniedException")));

        let rows = [row("pp-err", ProductStatus::Error, None)];
        let actions = cleanup(&inv, &rows, &opts(true)).await;

        assert!(matches!(
            actions[0].outcome,
            CleanupOutcome::Failed(CloudError::AccessDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_orphans_ignored_without_broken_products() {
        let mut inv = MockInventory::new();
        inv.expect_terminate_product().never();

        let rows = [row("pp-orphan", ProductStatus::Available, None)];
        assert!(cleanup(&inv, &rows, &opts(true)).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_stack_state_is_not_a_candidate() {
        let inv = MockInventory::new();
        let mut unknown = row("pp-unknown", ProductStatus::Tainted, None);
        unknown.lookup_failed = true;

        let actions = cleanup(&inv, &[unknown], &opts(false)).await;
        assert!(actions.is_empty());
    }
}
