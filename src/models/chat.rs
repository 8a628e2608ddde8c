use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::Utc;

/// One room per customer; admins share the other side.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub content: String,
    pub is_read: bool,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Admin inbox entry.
#[derive(sqlx::FromRow, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub company: String,
    pub last_message: Option<String>,
    pub last_timestamp: Option<chrono::DateTime<Utc>>,
    pub unread_count: i64,
}

/// Who a message is addressed to. Customer messages go to the shared admin
/// pool and are stored with no `receiver_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    AdminPool,
    User(Uuid),
}

impl Recipient {
    /// Admins write to the room's customer, the customer writes to the pool.
    pub fn sent_in(sender_id: Uuid, room_customer_id: Uuid) -> Self {
        if sender_id == room_customer_id {
            Recipient::AdminPool
        } else {
            Recipient::User(room_customer_id)
        }
    }

    pub fn receiver_id(&self) -> Option<Uuid> {
        match self {
            Recipient::AdminPool => None,
            Recipient::User(id) => Some(*id),
        }
    }

    /// Messages a reader is entitled to acknowledge.
    pub fn reader(is_admin: bool, user_id: Uuid) -> Self {
        if is_admin {
            Recipient::AdminPool
        } else {
            Recipient::User(user_id)
        }
    }

    /// Appends the matching `receiver_id` condition to a query.
    pub fn push_filter(&self, builder: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>) {
        match self {
            Recipient::AdminPool => {
                builder.push(" AND receiver_id IS NULL");
            }
            Recipient::User(id) => {
                builder.push(" AND receiver_id = ");
                builder.push_bind(*id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_reply_is_not_addressed_to_other_admins() {
        let (customer, admin_a, admin_b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let reply = Recipient::sent_in(admin_a, customer);

        assert_eq!(reply.receiver_id(), Some(customer));
        assert_ne!(reply, Recipient::reader(true, admin_b));
        assert_eq!(reply, Recipient::reader(false, customer));
    }

    #[test]
    fn customer_message_reaches_every_admin() {
        let customer = Uuid::new_v4();
        let question = Recipient::sent_in(customer, customer);

        assert_eq!(question.receiver_id(), None);
        assert_eq!(question, Recipient::reader(true, Uuid::new_v4()));
        assert_ne!(question, Recipient::reader(false, customer));
    }

    #[test]
    fn filters_match_receiver_column() {
        let mut builder: sqlx::QueryBuilder<'_, sqlx::Postgres> =
            sqlx::QueryBuilder::new("UPDATE messages SET is_read = TRUE WHERE TRUE");
        Recipient::AdminPool.push_filter(&mut builder);
        assert!(builder.sql().ends_with("AND receiver_id IS NULL"));

        let mut builder: sqlx::QueryBuilder<'_, sqlx::Postgres> =
            sqlx::QueryBuilder::new("UPDATE messages SET is_read = TRUE WHERE TRUE");
        Recipient::User(Uuid::new_v4()).push_filter(&mut builder);
        assert!(builder.sql().ends_with("AND receiver_id = $1"));
    }
}
