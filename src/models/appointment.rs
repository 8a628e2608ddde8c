use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{NaiveDate, Utc};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_COMPLETED: &str = "completed";

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub name: String,
    pub company: String,
    pub email: String,
    pub telephone: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub note: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<Utc>,
}

impl Appointment {
    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }
}
