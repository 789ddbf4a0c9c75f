use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    /// Fila original del cliente (JSON libre)
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// POST /api/customers
#[derive(Debug, Clone, Deserialize)]
pub struct AddCustomersRequest {
    pub user_id: String,
    pub customers: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// POST /api/customers/summarize
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeRequest {
    pub customer_data: String,
}
