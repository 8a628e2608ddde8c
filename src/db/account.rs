//! Multi-statement account writes. Each runs in a single transaction.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::password_reset::PasswordResetToken;
use crate::models::user::{Role, User};

pub struct NewCustomer<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub company: &'a str,
    pub address: Option<&'a str>,
    pub telephone: Option<&'a str>,
}

/// Which unique column an existing account already holds.
#[derive(Debug, PartialEq, Eq)]
pub enum Duplicate {
    Email,
    Company,
}

impl Duplicate {
    /// Unique indexes on `users`, see migrations/0001_initial.sql.
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            "users_email_key" => Some(Duplicate::Email),
            "users_company_key" => Some(Duplicate::Company),
            _ => None,
        }
    }

    /// The duplicate behind a unique violation raised by a write to `users`.
    /// Covers writes that race past `find_duplicate`.
    pub fn from_error(err: &sqlx::Error) -> Option<Self> {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                db.constraint().and_then(Self::from_constraint)
            }
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Duplicate::Email => "Email already exists",
            Duplicate::Company => "Company already exists",
        }
    }
}

impl From<Duplicate> for AppError {
    fn from(duplicate: Duplicate) -> Self {
        AppError::BadRequest(duplicate.message().to_string())
    }
}

/// Error of an insert or update on `users`.
pub fn write_error(err: sqlx::Error) -> AppError {
    match Duplicate::from_error(&err) {
        Some(duplicate) => duplicate.into(),
        None => err.into(),
    }
}

pub async fn find_duplicate(
    pool: &PgPool,
    email: &str,
    company: &str,
    exclude: Option<Uuid>,
) -> Result<Option<Duplicate>, sqlx::Error> {
    let (email_taken, company_taken): (bool, bool) = sqlx::query_as(
        "SELECT
            EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($3::uuid IS NULL OR id <> $3)),
            EXISTS(SELECT 1 FROM users WHERE LOWER(company) = LOWER($2) AND ($3::uuid IS NULL OR id <> $3))",
    )
    .bind(email)
    .bind(company)
    .bind(exclude)
    .fetch_one(pool)
    .await?;

    Ok(match (email_taken, company_taken) {
        (true, _) => Some(Duplicate::Email),
        (false, true) => Some(Duplicate::Company),
        (false, false) => None,
    })
}

async fn insert_token(
    conn: &mut sqlx::PgConnection,
    token: &PasswordResetToken,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO password_reset_tokens (token, user_id, expires_at, used) VALUES ($1, $2, $3, FALSE)",
    )
    .bind(&token.token)
    .bind(token.user_id)
    .bind(token.expires_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Creates a customer without a password together with its set-password token.
pub async fn register_customer(
    pool: &PgPool,
    customer: NewCustomer<'_>,
    now: DateTime<Utc>,
) -> Result<(User, PasswordResetToken), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, email, password, role, company, address, telephone, created_at, updated_at)
         VALUES ($1, $2, $3, NULL, $4, $5, $6, $7, $8, $8)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(customer.name)
    .bind(customer.email)
    .bind(Role::Customer.as_str())
    .bind(customer.company)
    .bind(customer.address)
    .bind(customer.telephone)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let token = PasswordResetToken::issue(user.id, now);
    insert_token(&mut tx, &token).await?;

    tx.commit().await?;
    Ok((user, token))
}

pub async fn issue_reset_token(
    pool: &PgPool,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PasswordResetToken, sqlx::Error> {
    let token = PasswordResetToken::issue(user_id, now);
    let mut conn = pool.acquire().await?;
    insert_token(&mut conn, &token).await?;
    Ok(token)
}

/// Sets the password and burns the token. Returns `false` when the token is
/// unknown, used or expired, in which case nothing is written.
pub async fn redeem_reset_token(
    pool: &PgPool,
    token: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, PasswordResetToken>(
        "SELECT token, user_id, expires_at, used FROM password_reset_tokens WHERE token = $1 FOR UPDATE",
    )
    .bind(token)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row.filter(|t| t.is_redeemable(now)) else {
        tx.rollback().await?;
        return Ok(false);
    };

    sqlx::query("UPDATE users SET password = $1, updated_at = $2 WHERE id = $3")
        .bind(password_hash)
        .bind(now)
        .bind(row.user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE token = $1")
        .bind(token)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

/// Deletes an account and everything that belongs to it: payroll data, chat
/// rooms and every message it sent or received, reset tokens, reports.
/// Appointments are matched by name/email only and stay behind.
pub async fn delete_account(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM messages
         WHERE sender_id = $1 OR receiver_id = $1
            OR room_id IN (SELECT id FROM rooms WHERE customer_id = $1)",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM rooms WHERE customer_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    for table in ["taxes", "expenses", "incomes", "employees"] {
        sqlx::query(&format!("DELETE FROM {} WHERE company_id = $1", table))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    for table in ["password_reset_tokens", "reports"] {
        sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", table))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_indexes_map_to_duplicates() {
        assert_eq!(Duplicate::from_constraint("users_email_key"), Some(Duplicate::Email));
        assert_eq!(Duplicate::from_constraint("users_company_key"), Some(Duplicate::Company));
        assert_eq!(Duplicate::from_constraint("appointments_date_start_time_key"), None);
    }

    #[test]
    fn duplicates_are_client_errors() {
        match AppError::from(Duplicate::Company) {
            AppError::BadRequest(msg) => assert_eq!(msg, "Company already exists"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(write_error(sqlx::Error::RowNotFound), AppError::NotFound(_)));
        assert!(matches!(write_error(sqlx::Error::PoolTimedOut), AppError::DatabaseError(_)));
    }
}
