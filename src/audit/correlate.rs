/// Join each provisioned product to at most one CloudFormation stack.
use tracing::{debug, info, warn};

use crate::aws::{CloudError, Inventory, Product, ProductStatus, StackDetail};

/// Parameter holding the vended account's root email.
pub const ACCOUNT_EMAIL_PARAMETER: &str = "AccountEmail";
/// Output holding the vended account's id.
pub const ACCOUNT_ID_OUTPUT: &str = "AccountID";
/// Rendered in place of any field that has no value.
pub const NONE_SENTINEL: &str = "None";

/// One product joined to its stack, if any.
///
/// Every row starts from [`CorrelatedRow::unmatched`], so nothing carries over
/// from the previous product when a lookup fails halfway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatedRow {
    pub product_name: String,
    pub product_id: String,
    pub product_status: ProductStatus,
    pub stack_name: Option<String>,
    pub stack_status: Option<String>,
    pub account_email: Option<String>,
    pub account_id: Option<String>,
    /// The stack lookup or describe call failed, so stack state is unknown rather than absent.
    pub lookup_failed: bool,
}

impl CorrelatedRow {
    /// A row with only the product fields filled in.
    #[must_use]
    pub fn unmatched(product: &Product) -> Self {
        Self {
            product_name: product.name.clone(),
            product_id: product.id.clone(),
            product_status: product.status.clone(),
            stack_name: None,
            stack_status: None,
            account_email: None,
            account_id: None,
            lookup_failed: false,
        }
    }

    /// ERROR and TAINTED rows are emphasized in the report.
    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.product_status.is_broken()
    }

    /// Errored products, and products whose stack is known to be gone.
    #[must_use]
    pub fn is_cleanup_candidate(&self) -> bool {
        self.product_status == ProductStatus::Error
            || (self.stack_name.is_none() && !self.lookup_failed)
    }
}

/// Render an optional field, substituting [`NONE_SENTINEL`].
#[must_use]
pub fn or_sentinel(value: Option<&String>) -> &str {
    value.map_or(NONE_SENTINEL, String::as_str)
}

/// A per-product failure that did not stop the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupFailure {
    pub product_id: String,
    /// The stack being described, when the failure came from describe.
    pub stack_name: Option<String>,
    pub stack_status: Option<String>,
    pub error: CloudError,
}

/// Result of the correlation loop.
#[derive(Debug, Default)]
pub struct Correlation {
    /// One row per product, in discovery order.
    pub rows: Vec<CorrelatedRow>,
    pub failures: Vec<LookupFailure>,
}

/// Pull `(account email, account id)` out of a described stack.
///
/// A stack without any outputs yields neither value, even if the email parameter is set.
#[must_use]
pub fn extract_account(stack: &StackDetail) -> (Option<String>, Option<String>) {
    let Some(outputs) = &stack.outputs else {
        debug!(stack = %stack.name, "no outputs present");
        return (None, None);
    };

    let email = stack
        .parameters
        .iter()
        .find(|(k, _)| k == ACCOUNT_EMAIL_PARAMETER)
        .map(|(_, v)| v.clone());

    let id = outputs.iter().find_map(|(k, v)| {
        debug!(stack = %stack.name, key = %k, value = %v, "stack output");
        (k == ACCOUNT_ID_OUTPUT).then(|| v.clone())
    });
    if id.is_none() {
        info!(stack = %stack.name, "outputs present, but no account id");
    }

    (email, id)
}

/// Correlate every product with its stack.
///
/// `progress` is called with `(index, total)` (1-based) before each product.
pub async fn correlate<I, F>(inventory: &I, products: &[Product], mut progress: F) -> Correlation
where
    I: Inventory + ?Sized,
    F: FnMut(usize, usize),
{
    let mut out = Correlation::default();
    let total = products.len();

    for (i, product) in products.iter().enumerate() {
        progress(i + 1, total);
        let mut row = CorrelatedRow::unmatched(product);

        let stacks = match inventory.find_stacks(&product.id).await {
            Ok(stacks) => stacks,
            Err(error) => {
                warn!(product = %product.id, %error, "stack lookup failed");
                row.lookup_failed = true;
                out.failures.push(LookupFailure {
                    product_id: product.id.clone(),
                    stack_name: None,
                    stack_status: None,
                    error,
                });
                out.rows.push(row);
                continue;
            }
        };
        info!(product = %product.name, matches = stacks.len(), "matching stacks");

        let Some(stack) = stacks.into_iter().next() else {
            out.rows.push(row);
            continue;
        };

        match inventory.describe_stack(&stack.name).await {
            Ok(detail) => {
                let (email, id) = extract_account(&detail);
                row.account_email = email;
                row.account_id = id;
            }
            Err(error) => {
                warn!(stack = %stack.name, %error, "describe failed");
                row.lookup_failed = true;
                out.failures.push(LookupFailure {
                    product_id: product.id.clone(),
                    stack_name: Some(stack.name.clone()),
                    stack_status: Some(stack.status.clone()),
                    error,
                });
            }
        }
        row.stack_name = Some(stack.name);
        row.stack_status = Some(stack.status);
        out.rows.push(row);
    }

    out
}

#[cfg(test)]
mod tests {
    use mockall::predicate;

    use super::*;
    use crate::aws::MockInventory;
    use crate::aws::inventory::StackSummary;

    fn product(name: &str, id: &str, status: ProductStatus) -> Product {
        Product {
            name: name.to_owned(),
            id: id.to_owned(),
            status,
        }
    }

    fn kv(k: &str, v: &str) -> (String, String) {
        (k.to_owned(), v.to_owned())
    }

    fn summary(name: &str, status: &str) -> StackSummary {
        StackSummary {
            name: name.to_owned(),
            status: status.to_owned(),
        }
    }

    #[test]
    fn test_extract_account_from_outputs_and_parameters() {
        let stack = StackDetail {
            name: "S1".to_owned(),
            status: "CREATE_COMPLETE".to_owned(),
            parameters: vec![kv("AccountName", "dev"), kv("AccountEmail", "dev@example.com")],
            outputs: Some(vec![kv("Other", "x"), kv("AccountID", "111111111111")]),
        };
        assert_eq!(
            extract_account(&stack),
            (
                Some("dev@example.com".to_owned()),
                Some("111111111111".to_owned())
            )
        );
    }

    #[test]
    fn test_extract_account_first_output_match_wins() {
        let stack = StackDetail {
            outputs: Some(vec![kv("AccountID", "first"), kv("AccountID", "second")]),
            ..StackDetail::default()
        };
        assert_eq!(extract_account(&stack).1.as_deref(), Some("first"));
    }

    #[test]
    fn test_extract_account_absent_outputs_clears_email() {
        let stack = StackDetail {
            parameters: vec![kv("AccountEmail", "dev@example.com")],
            outputs: None,
            ..StackDetail::default()
        };
        assert_eq!(extract_account(&stack), (None, None));
    }

    #[test]
    fn test_extract_account_empty_outputs_keeps_email() {
        let stack = StackDetail {
            parameters: vec![kv("AccountEmail", "dev@example.com")],
            outputs: Some(Vec::new()),
            ..StackDetail::default()
        };
        assert_eq!(
            extract_account(&stack),
            (Some("dev@example.com".to_owned()), None)
        );
    }

    #[tokio::test]
    async fn test_matched_product_gets_account_id() {
        let mut inv = MockInventory::new();
        inv.expect_find_stacks()
            .with(predicate::eq("pp-1"))
            .times(1)
            .returning(|_| Ok(vec![summary("S1", "CREATE_COMPLETE")]));
        inv.expect_describe_stack()
            .with(predicate::eq("S1"))
            .times(1)
            .returning(|_| {
                Ok(StackDetail {
                    name: "S1".to_owned(),
                    status: "CREATE_COMPLETE".to_owned(),
                    parameters: Vec::new(),
                    outputs: Some(vec![kv("AccountID", "111111111111")]),
                })
            });

        let products = [product("P1", "pp-1", ProductStatus::Available)];
        let out = correlate(&inv, &products, |_, _| {}).await;

        assert!(out.failures.is_empty());
        let row = &out.rows[0];
        assert_eq!(row.account_id.as_deref(), Some("111111111111"));
        assert_eq!(row.product_name, "P1");
        assert_eq!(row.stack_name.as_deref(), Some("S1"));
        assert_eq!(row.product_status, ProductStatus::Available);
        assert_eq!(row.stack_status.as_deref(), Some("CREATE_COMPLETE"));
        assert_eq!(or_sentinel(row.account_email.as_ref()), "None");
        assert!(!row.is_highlighted());
        assert!(!row.is_cleanup_candidate());
    }

    #[tokio::test]
    async fn test_unmatched_product_gets_sentinels() {
        let mut inv = MockInventory::new();
        inv.expect_find_stacks().returning(|_| Ok(Vec::new()));
        inv.expect_describe_stack().never();

        let products = [product("P2", "pp-2", ProductStatus::Error)];
        let out = correlate(&inv, &products, |_, _| {}).await;

        let row = &out.rows[0];
        for field in [
            &row.stack_name,
            &row.stack_status,
            &row.account_email,
            &row.account_id,
        ] {
            assert_eq!(or_sentinel(field.as_ref()), NONE_SENTINEL);
        }
        assert!(row.is_highlighted());
        assert!(row.is_cleanup_candidate());
    }

    #[tokio::test]
    async fn test_only_first_stack_is_described() {
        let mut inv = MockInventory::new();
        inv.expect_find_stacks().returning(|_| {
            Ok(vec![
                summary("first", "UPDATE_COMPLETE"),
                summary("second", "CREATE_COMPLETE"),
            ])
        });
        inv.expect_describe_stack()
            .with(predicate::eq("first"))
            .times(1)
            .returning(|_| Ok(StackDetail::default()));

        let products = [product("P", "pp-1", ProductStatus::Available)];
        let out = correlate(&inv, &products, |_, _| {}).await;
        assert_eq!(out.rows[0].stack_name.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_vanished_stack_does_not_leak_previous_row() {
        let mut inv = MockInventory::new();
        inv.expect_find_stacks()
            .with(predicate::eq("pp-1"))
            .returning(|_| Ok(vec![summary("S1", "CREATE_COMPLETE")]));
        inv.expect_find_stacks()
            .with(predicate::eq("pp-2"))
            .returning(|_| Ok(vec![summary("S2", "DELETE_IN_PROGRESS")]));
        inv.expect_describe_stack()
            .with(predicate::eq("S1"))
            .returning(|_| {
                Ok(StackDetail {
                    name: "S1".to_owned(),
                    status: "CREATE_COMPLETE".to_owned(),
                    parameters: vec![kv("AccountEmail", "one@example.com")],
                    outputs: Some(vec![kv("AccountID", "111111111111")]),
                })
            });
        inv.expect_describe_stack()
            .with(predicate::eq("S2"))
            .returning(|_| {
                Err(CloudError::classify(
                    "ValidationError: Stack with id S2 does not exist",
                ))
            });

        let products = [
            product("P1", "pp-1", ProductStatus::Available),
            product("P2", "pp-2", ProductStatus::Available),
        ];
        let out = correlate(&inv, &products, |_, _| {}).await;

        assert_eq!(out.rows.len(), 2);
        let second = &out.rows[1];
        assert_eq!(second.product_name, "P2");
        assert_eq!(second.stack_name.as_deref(), Some("S2"));
        assert_eq!(second.account_id, None);
        assert_eq!(second.account_email, None);
        assert!(second.lookup_failed);
        assert!(!second.is_cleanup_candidate());

        assert_eq!(out.failures.len(), 1);
        assert!(matches!(out.failures[0].error, CloudError::Validation { .. }));
        assert_eq!(out.failures[0].stack_name.as_deref(), Some("S2"));
    }

    #[tokio::test]
    async fn test_failed_lookup_keeps_row_but_not_as_candidate() {
        let mut inv = MockInventory::new();
        inv.expect_find_stacks()
            .returning(|_| Err(CloudError::classify("AccessDenied")));

        let products = [product("P", "pp-1", ProductStatus::Tainted)];
        let out = correlate(&inv, &products, |_, _| {}).await;

        assert_eq!(out.rows.len(), 1);
        assert!(out.rows[0].lookup_failed);
        assert!(out.rows[0].is_highlighted());
        assert!(!out.rows[0].is_cleanup_candidate());
        assert!(matches!(out.failures[0].error, CloudError::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn test_progress_reports_each_product() {
        let mut inv = MockInventory::new();
        inv.expect_find_stacks().returning(|_| Ok(Vec::new()));

        let products = [
            product("A", "pp-a", ProductStatus::Available),
            product("B", "pp-b", ProductStatus::Available),
        ];
        let mut seen = Vec::new();
        correlate(&inv, &products, |i, n| seen.push((i, n))).await;
        assert_eq!(seen, vec![(1, 2), (2, 2)]);
    }
}
