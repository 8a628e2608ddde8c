use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct PasswordResetToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl PasswordResetToken {
    /// Fresh single-use token: 32 random bytes, hex encoded.
    pub fn issue(user_id: Uuid, now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            token: hex::encode(bytes),
            user_id,
            expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
            used: false,
        }
    }

    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}
