/// [`Inventory`] over the real Service Catalog and CloudFormation clients.
use async_trait::async_trait;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_runtime::env_config::file::EnvConfigFiles;
use aws_sdk_cloudformation::operation::describe_stacks::DescribeStacksOutput;
use aws_sdk_cloudformation::operation::list_stacks::ListStacksOutput;
use aws_sdk_cloudformation::types::StackStatus;
use aws_sdk_servicecatalog::operation::terminate_provisioned_product::TerminateProvisionedProductOutput;
use aws_sdk_servicecatalog::types::{
    AccessLevelFilter, AccessLevelFilterKey, ProvisionedProductAttribute,
};
use tracing::{debug, info};

use super::errors::CloudError;
use super::inventory::{
    Inventory, Product, RecordError, StackDetail, StackSummary, TerminationRecord,
};

/// Largest page `SearchProvisionedProducts` accepts.
const SEARCH_PAGE_SIZE: i32 = 100;

/// SDK clients for one profile/region pair.
#[derive(Debug, Clone)]
pub struct AwsInventory {
    catalog: aws_sdk_servicecatalog::Client,
    cloudformation: aws_sdk_cloudformation::Client,
}

impl AwsInventory {
    /// Load shared config for `profile` in `region` and build both clients.
    pub async fn connect(profile: &str, region: &str) -> Self {
        let config = load_config(profile, region, EnvConfigFiles::default()).await;
        info!(profile, region, "loaded AWS config");
        Self {
            catalog: aws_sdk_servicecatalog::Client::new(&config),
            cloudformation: aws_sdk_cloudformation::Client::new(&config),
        }
    }
}

/// Shared config whose credentials come only from `profile`.
///
/// The default chain would prefer `AWS_ACCESS_KEY_ID` and friends over the
/// named profile, so the profile provider is installed explicitly.
async fn load_config(profile: &str, region: &str, files: EnvConfigFiles) -> SdkConfig {
    let credentials = ProfileFileCredentialsProvider::builder()
        .profile_name(profile)
        .profile_files(files.clone())
        .build();
    aws_config::defaults(BehaviorVersion::latest())
        .profile_files(files)
        .profile_name(profile)
        .region(Region::new(region.to_owned()))
        .credentials_provider(credentials)
        .load()
        .await
}

/// Every stack status except `DELETE_COMPLETE`.
fn live_stack_statuses() -> Vec<StackStatus> {
    StackStatus::values()
        .iter()
        .map(|s| StackStatus::from(*s))
        .filter(|s| *s != StackStatus::DeleteComplete)
        .collect()
}

fn to_product(p: &ProvisionedProductAttribute) -> Product {
    Product {
        name: p.name().unwrap_or_default().to_owned(),
        id: p.id().unwrap_or_default().to_owned(),
        status: p.status().map_or("", |s| s.as_str()).into(),
    }
}

/// Stacks on one `ListStacks` page whose name contains `fragment`.
///
/// Only the first page is read. When nothing matched and more pages exist the
/// stack may still be out there, so that is an error rather than "no stack".
fn matching_stacks(
    resp: &ListStacksOutput,
    fragment: &str,
) -> Result<Vec<StackSummary>, CloudError> {
    let stacks: Vec<StackSummary> = resp
        .stack_summaries()
        .iter()
        .filter(|s| s.stack_status() != Some(&StackStatus::DeleteComplete))
        .filter_map(|s| {
            let name = s.stack_name()?;
            name.contains(fragment).then(|| StackSummary {
                name: name.to_owned(),
                status: s.stack_status().map_or("", |st| st.as_str()).to_owned(),
            })
        })
        .collect();

    if stacks.is_empty() && resp.next_token().is_some() {
        return Err(CloudError::Other {
            message: format!(
                "no stack matching {fragment} on the first ListStacks page, and more pages exist"
            ),
        });
    }
    Ok(stacks)
}

fn to_stack_detail(
    resp: &DescribeStacksOutput,
    stack_name: &str,
) -> Result<StackDetail, CloudError> {
    let Some(stack) = resp.stacks().first() else {
        return Err(CloudError::Validation {
            message: format!("Stack {stack_name} does not exist"),
        });
    };

    let parameters = stack
        .parameters()
        .iter()
        .map(|p| {
            (
                p.parameter_key().unwrap_or_default().to_owned(),
                p.parameter_value().unwrap_or_default().to_owned(),
            )
        })
        .collect();
    // `outputs()` flattens "absent" into "empty"; the field keeps them apart.
    let outputs = stack.outputs.as_ref().map(|outputs| {
        outputs
            .iter()
            .map(|o| {
                (
                    o.output_key().unwrap_or_default().to_owned(),
                    o.output_value().unwrap_or_default().to_owned(),
                )
            })
            .collect()
    });

    Ok(StackDetail {
        name: stack.stack_name().unwrap_or(stack_name).to_owned(),
        status: stack.stack_status().map_or("", |s| s.as_str()).to_owned(),
        parameters,
        outputs,
    })
}

fn to_termination_record(resp: &TerminateProvisionedProductOutput) -> TerminationRecord {
    let detail = resp.record_detail();
    TerminationRecord {
        status: detail
            .and_then(|d| d.status())
            .map_or("UNKNOWN", |s| s.as_str())
            .to_owned(),
        errors: detail
            .map(|d| d.record_errors())
            .unwrap_or_default()
            .iter()
            .map(|e| RecordError {
                code: e.code().unwrap_or_default().to_owned(),
                description: e.description().unwrap_or_default().to_owned(),
            })
            .collect(),
    }
}

#[async_trait]
impl Inventory for AwsInventory {
    async fn provisioned_products(&self) -> Result<Vec<Product>, CloudError> {
        // Account-level access so products launched by other principals show up too.
        let access = AccessLevelFilter::builder()
            .key(AccessLevelFilterKey::Account)
            .value("self")
            .build();
        let resp = self
            .catalog
            .search_provisioned_products()
            .access_level_filter(access)
            .page_size(SEARCH_PAGE_SIZE)
            .send()
            .await
            .map_err(CloudError::from_sdk)?;

        Ok(resp.provisioned_products().iter().map(to_product).collect())
    }

    async fn find_stacks(&self, fragment: &str) -> Result<Vec<StackSummary>, CloudError> {
        let resp = self
            .cloudformation
            .list_stacks()
            .set_stack_status_filter(Some(live_stack_statuses()))
            .send()
            .await
            .map_err(CloudError::from_sdk)?;

        let stacks = matching_stacks(&resp, fragment)?;
        debug!(fragment, matches = stacks.len(), "stack lookup");
        Ok(stacks)
    }

    async fn describe_stack(&self, stack_name: &str) -> Result<StackDetail, CloudError> {
        let resp = self
            .cloudformation
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(CloudError::from_sdk)?;

        to_stack_detail(&resp, stack_name)
    }

    async fn terminate_product(&self, product_id: &str) -> Result<TerminationRecord, CloudError> {
        let resp = self
            .catalog
            .terminate_provisioned_product()
            .provisioned_product_id(product_id)
            .ignore_errors(true)
            .send()
            .await
            .map_err(CloudError::from_sdk)?;

        Ok(to_termination_record(&resp))
    }
}
