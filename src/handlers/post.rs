use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::post::{Post, STATUS_PRIVATE, STATUS_PUBLISHED};
use crate::utils::{jwt, response, validation};

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    if status != STATUS_PUBLISHED && status != STATUS_PRIVATE {
        return Err(validator::ValidationError::new("Status must be either 'Published' or 'Private'"));
    }
    Ok(())
}

#[derive(Deserialize, Validate)]
pub struct NewPost {
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(min = 1))]
    content: String,
    #[validate(length(min = 1, max = 100))]
    category: String,
    #[validate(custom = "validate_status")]
    status: String,
    #[validate(url)]
    picture: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct PostUpdate {
    #[validate(length(min = 1, max = 200))]
    title: Option<String>,
    #[validate(length(min = 1))]
    content: Option<String>,
    #[validate(length(min = 1, max = 100))]
    category: Option<String>,
    #[validate(custom = "validate_status")]
    status: Option<String>,
    #[validate(url)]
    picture: Option<String>,
}

#[derive(Deserialize)]
pub struct PostQueryParams {
    category: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

/// Admins see every post; everyone else only published ones. The session is
/// optional on public routes.
fn viewer_is_admin(req: &HttpRequest, config: &Config) -> bool {
    jwt::authorize(req, &config.jwt_secret)
        .map(|claims| claims.is_admin())
        .unwrap_or(false)
}

pub async fn get_posts(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<PostQueryParams>,
) -> Result<HttpResponse, AppError> {
    let mut builder: sqlx::QueryBuilder<'_, sqlx::Postgres> =
        sqlx::QueryBuilder::new("SELECT * FROM posts WHERE TRUE");
    if !viewer_is_admin(&req, &config) {
        builder.push(" AND status = ");
        builder.push_bind(STATUS_PUBLISHED);
    }
    if let Some(category) = &query.category {
        builder.push(" AND category = ");
        builder.push_bind(category);
    }
    builder.push(" ORDER BY created_at DESC LIMIT ");
    builder.push_bind(query.limit.unwrap_or(20).clamp(1, 100));
    builder.push(" OFFSET ");
    builder.push_bind(query.offset.unwrap_or(0).max(0));

    let posts = builder.build_query_as::<Post>().fetch_all(&**pool).await?;
    Ok(response::ok("Posts retrieved", posts))
}

pub async fn get_post(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
        .bind(id.into_inner())
        .fetch_optional(&**pool)
        .await?
        .filter(|p| p.is_published() || viewer_is_admin(&req, &config))
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    Ok(response::ok("Post retrieved", post))
}

pub async fn create_post(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    new_post: web::Json<NewPost>,
) -> Result<HttpResponse, AppError> {
    validation::validate_payload(&new_post.0)?;
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    claims.require_admin()?;

    let now = Utc::now();
    let post = sqlx::query_as::<_, Post>(
        "INSERT INTO posts (id, title, content, category, status, author_id, picture, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(new_post.title.trim())
    .bind(&new_post.content)
    .bind(new_post.category.trim())
    .bind(&new_post.status)
    .bind(claims.user_id()?)
    .bind(&new_post.picture)
    .bind(now)
    .fetch_one(&**pool)
    .await?;

    Ok(response::created("Post created", post))
}

pub async fn update_post(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    id: web::Path<Uuid>,
    updates: web::Json<PostUpdate>,
) -> Result<HttpResponse, AppError> {
    validation::validate_payload(&updates.0)?;
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    claims.require_admin()?;

    let mut query: sqlx::QueryBuilder<'_, sqlx::Postgres> = sqlx::QueryBuilder::new("UPDATE posts SET ");
    let mut separated = query.separated(", ");
    if let Some(title) = &updates.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title.trim());
    }
    if let Some(content) = &updates.content {
        separated.push("content = ");
        separated.push_bind_unseparated(content);
    }
    if let Some(category) = &updates.category {
        separated.push("category = ");
        separated.push_bind_unseparated(category.trim());
    }
    if let Some(status) = &updates.status {
        separated.push("status = ");
        separated.push_bind_unseparated(status);
    }
    if let Some(picture) = &updates.picture {
        separated.push("picture = ");
        separated.push_bind_unseparated(picture);
    }
    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());
    query.push(" WHERE id = ");
    query.push_bind(id.into_inner());
    query.push(" RETURNING *");

    let post = query
        .build_query_as::<Post>()
        .fetch_optional(&**pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    Ok(response::ok("Post updated", post))
}

pub async fn delete_post(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    claims.require_admin()?;

    let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id.into_inner())
        .execute(&**pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::NotFound("Post not found".to_string()));
    }
    Ok(response::message("Post deleted successfully"))
}
