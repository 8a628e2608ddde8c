use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use chrono::Utc;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_RESOLVED: &str = "resolved";

/// Support ticket raised by a customer.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub description: String,
    pub images: Json<Vec<String>>,
    pub status: String,
    pub problem_report: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}
