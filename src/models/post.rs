use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::Utc;

pub const STATUS_PUBLISHED: &str = "Published";
pub const STATUS_PRIVATE: &str = "Private";

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub status: String,
    pub author_id: Uuid,
    pub picture: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == STATUS_PUBLISHED
    }
}
