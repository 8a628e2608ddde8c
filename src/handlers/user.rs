use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::db::account;
use crate::errors::AppError;
use crate::models::user::{Role, User};
use crate::utils::jwt;
use crate::utils::storage::Storage;
use crate::utils::{response, validation};

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserProfileUpdate {
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
    #[validate(email)]
    email: Option<String>,
    #[validate(length(min = 1, max = 150))]
    company: Option<String>,
    #[validate(length(max = 500))]
    address: Option<String>,
    #[validate(length(max = 30))]
    telephone: Option<String>,
}

#[derive(Deserialize)]
pub struct UserQueryParams {
    search: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn load_user(pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Customer accounts, newest first. Admin only.
pub async fn get_users(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<UserQueryParams>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    claims.require_admin()?;

    let mut builder: sqlx::QueryBuilder<'_, sqlx::Postgres> =
        sqlx::QueryBuilder::new("SELECT * FROM users WHERE role = ");
    builder.push_bind(Role::Customer.as_str());

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        builder.push(" AND (name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR company ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    builder.push(" ORDER BY created_at DESC LIMIT ");
    builder.push_bind(query.limit.unwrap_or(100).clamp(1, 500));
    builder.push(" OFFSET ");
    builder.push_bind(query.offset.unwrap_or(0).max(0));

    let users = builder.build_query_as::<User>().fetch_all(&**pool).await?;
    Ok(response::ok("Users retrieved", users))
}

pub async fn get_user(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let user_id = user_id.into_inner();
    claims.require_self_or_admin(user_id)?;

    Ok(response::ok("User retrieved", load_user(&pool, user_id).await?))
}

pub async fn update_user(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    user_id: web::Path<Uuid>,
    updates: web::Json<UserProfileUpdate>,
) -> Result<HttpResponse, AppError> {
    validation::validate_payload(&updates.0)?;
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let user_id = user_id.into_inner();
    claims.require_self_or_admin(user_id)?;

    let current = load_user(&pool, user_id).await?;
    let email = updates
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_else(|| current.email.clone());
    let company = match updates.company.as_deref() {
        Some(company) => validation::required("company", company)?,
        None => current.company.clone(),
    };

    match account::find_duplicate(&pool, &email, &company, Some(user_id)).await? {
        Some(duplicate) => return Err(duplicate.into()),
        None => {}
    }

    let mut query: sqlx::QueryBuilder<'_, sqlx::Postgres> = sqlx::QueryBuilder::new("UPDATE users SET ");
    let mut separated = query.separated(", ");

    separated.push("email = ");
    separated.push_bind_unseparated(&email);
    separated.push("company = ");
    separated.push_bind_unseparated(&company);
    if let Some(name) = &updates.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name.trim());
    }
    if let Some(address) = &updates.address {
        separated.push("address = ");
        separated.push_bind_unseparated(address);
    }
    if let Some(telephone) = &updates.telephone {
        separated.push("telephone = ");
        separated.push_bind_unseparated(telephone);
    }
    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());
    query.push(" WHERE id = ");
    query.push_bind(user_id);
    query.push(" RETURNING *");

    let user = query
        .build_query_as::<User>()
        .fetch_one(&**pool)
        .await
        .map_err(account::write_error)?;
    Ok(response::ok("Profile updated", user))
}

/// Deletes an account with all of its payroll and chat data.
pub async fn delete_user(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    storage: web::Data<Storage>,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let user_id = user_id.into_inner();
    claims.require_self_or_admin(user_id)?;

    if !account::delete_account(&pool, user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    log::info!("Account {} deleted by {}", user_id, claims.sub);

    // Stored exports are not covered by the transaction.
    if let Err(err) = storage.delete_prefix(&format!("{}/", user_id)).await {
        log::warn!("Exports of deleted account {} were not removed: {}", user_id, err);
    }

    Ok(response::message("User deleted successfully"))
}
