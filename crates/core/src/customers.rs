//! Customer data source, the read-only collection segment rules query.

use std::path::Path;

use tracing::info;

use crate::error::{StudioError, StudioResult};
use crate::types::Customer;

/// Anything that can hand out the current customer collection in a stable order.
pub trait CustomerSource {
    fn customers(&self) -> &[Customer];
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomers {
    customers: Vec<Customer>,
}

impl InMemoryCustomers {
    pub fn new(customers: Vec<Customer>) -> Self {
        Self { customers }
    }

    /// Load a JSON array of customers from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> StudioResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let customers: Vec<Customer> = serde_json::from_str(&raw)?;

        if let Some(dup) = first_duplicate_id(&customers) {
            return Err(StudioError::CustomerSource(format!(
                "duplicate customer id {} in {}",
                dup,
                path.display()
            )));
        }

        info!(path = %path.display(), count = customers.len(), "Loaded customers");
        Ok(Self::new(customers))
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

impl CustomerSource for InMemoryCustomers {
    fn customers(&self) -> &[Customer] {
        &self.customers
    }
}

fn first_duplicate_id(customers: &[Customer]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    customers
        .iter()
        .map(|c| c.id.as_str())
        .find(|id| !seen.insert(*id))
}
