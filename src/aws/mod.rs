/// AWS layer: SDK clients, the inventory seam, error classification.
pub mod client;
pub mod errors;
pub mod inventory;

pub use client::AwsInventory;
pub use errors::CloudError;
pub use inventory::{Inventory, Product, ProductStatus, StackDetail, TerminationRecord};

#[cfg(test)]
pub use inventory::MockInventory;
