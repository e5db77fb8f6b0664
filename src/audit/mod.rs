/// Audit domain layer: discovery, correlation, cleanup.
pub mod cleanup;
pub mod correlate;
pub mod errors;

pub use cleanup::{CleanupAction, CleanupOptions, CleanupOutcome, cleanup};
pub use correlate::{CorrelatedRow, Correlation, LookupFailure, correlate};
pub use errors::AuditError;

use tracing::warn;

use crate::aws::Inventory;

/// Everything one run produced.
#[derive(Debug)]
pub struct AuditReport {
    /// One row per provisioned product, in discovery order.
    pub rows: Vec<CorrelatedRow>,
    /// Per-product failures that did not stop the run.
    pub failures: Vec<LookupFailure>,
    /// Cleanup candidates and what was done about them.
    pub actions: Vec<CleanupAction>,
}

impl AuditReport {
    /// `Err` when any terminate call failed.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::TerminationFailed` with the failure count.
    pub fn termination_result(&self) -> Result<(), AuditError> {
        let attempted = self
            .actions
            .iter()
            .filter(|a| !matches!(a.outcome, CleanupOutcome::Recommended { .. }))
            .count();
        let failed = self
            .actions
            .iter()
            .filter(|a| matches!(a.outcome, CleanupOutcome::Failed(_)))
            .count();
        if failed == 0 {
            Ok(())
        } else {
            Err(AuditError::TerminationFailed { failed, attempted })
        }
    }
}

/// Discover products, correlate them with stacks, then recommend or perform cleanup.
///
/// `progress` receives `(index, total)` during correlation.
///
/// # Errors
///
/// Returns `AuditError::Discovery` when the products cannot be listed. Failures
/// after that point are collected in the report instead.
pub async fn audit<I, F>(
    inventory: &I,
    opts: &CleanupOptions,
    progress: F,
) -> Result<AuditReport, AuditError>
where
    I: Inventory + ?Sized,
    F: FnMut(usize, usize),
{
    let products = inventory
        .provisioned_products()
        .await
        .map_err(|source| AuditError::Discovery {
            profile: opts.profile.clone(),
            source,
        })?;

    warn!(count = products.len(), "provisioned products found");
    for p in &products {
        warn!(name = %p.name, status = %p.status, "provisioned product");
    }

    let Correlation { rows, failures } = correlate(inventory, &products, progress).await;
    let actions = cleanup(inventory, &rows, opts).await;

    Ok(AuditReport {
        rows,
        failures,
        actions,
    })
}
