pub mod config;
pub mod customers;
pub mod error;
pub mod types;

pub use crate::config::AppConfig;
pub use customers::{CustomerSource, InMemoryCustomers};
pub use error::{StudioError, StudioResult};
pub use types::Customer;
