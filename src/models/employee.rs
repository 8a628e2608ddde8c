use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::Utc;

/// One employee's record for one fiscal year. Identity is
/// (employee_code, company_id, year).
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub employee_code: String,
    pub company_id: Uuid,
    pub year: i32,
    pub name: String,
    pub department: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}
