use serde::{Deserialize, Serialize};

/// A customer record as supplied by the dashboard's data source.
///
/// Dates are kept as the ISO strings the source produced; segment rules
/// compare some of them literally, so they are not normalised on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub total_spend: f64,
    pub visits: u32,
    pub last_purchase_date: String,
    pub join_date: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
