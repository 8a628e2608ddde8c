use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::report::{Report, STATUS_PENDING, STATUS_RESOLVED};
use crate::models::user::User;
use crate::utils::email_templates;
use crate::utils::mailer::Mailer;
use crate::utils::{jwt, response, validation};

#[derive(Deserialize, Validate)]
pub struct NewReport {
    #[validate(length(min = 1, max = 100))]
    category: String,
    #[validate(length(min = 1, max = 5000))]
    description: String,
    #[serde(default)]
    #[validate(length(max = 10))]
    images: Vec<String>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportResolution {
    #[validate(length(min = 1, max = 5000))]
    problem_report: String,
}

#[derive(Deserialize)]
pub struct ReportQueryParams {
    status: Option<String>,
}

async fn load_report(pool: &PgPool, id: Uuid) -> Result<Report, AppError> {
    sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))
}

pub async fn create_report(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    new_report: web::Json<NewReport>,
) -> Result<HttpResponse, AppError> {
    validation::validate_payload(&new_report.0)?;
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    if new_report.images.iter().any(|i| url::Url::parse(i).is_err()) {
        return Err(AppError::BadRequest("images must be URLs".to_string()));
    }

    let now = Utc::now();
    let report = sqlx::query_as::<_, Report>(
        "INSERT INTO reports (id, user_id, category, description, images, status, problem_report, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, $7)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(claims.user_id()?)
    .bind(new_report.category.trim())
    .bind(new_report.description.trim())
    .bind(Json(&new_report.images))
    .bind(STATUS_PENDING)
    .bind(now)
    .fetch_one(&**pool)
    .await?;

    Ok(response::created("Report submitted", report))
}

/// Admins list every report, customers their own.
pub async fn get_reports(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<ReportQueryParams>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;

    let mut builder: sqlx::QueryBuilder<'_, sqlx::Postgres> =
        sqlx::QueryBuilder::new("SELECT * FROM reports WHERE TRUE");
    if !claims.is_admin() {
        builder.push(" AND user_id = ");
        builder.push_bind(claims.user_id()?);
    }
    if let Some(status) = &query.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    builder.push(" ORDER BY created_at DESC");

    let reports = builder.build_query_as::<Report>().fetch_all(&**pool).await?;
    Ok(response::ok("Reports retrieved", reports))
}

pub async fn get_report(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let report = load_report(&pool, id.into_inner()).await?;
    claims.require_self_or_admin(report.user_id)?;
    Ok(response::ok("Report retrieved", report))
}

/// Resolves a pending report with the admin's answer and emails the reporter.
pub async fn resolve_report(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    mailer: web::Data<Mailer>,
    id: web::Path<Uuid>,
    resolution: web::Json<ReportResolution>,
) -> Result<HttpResponse, AppError> {
    validation::validate_payload(&resolution.0)?;
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    claims.require_admin()?;

    let report = load_report(&pool, id.into_inner()).await?;
    if report.status != STATUS_PENDING {
        return Err(AppError::BadRequest("Report is already resolved".to_string()));
    }

    let resolved = sqlx::query_as::<_, Report>(
        "UPDATE reports SET status = $1, problem_report = $2, updated_at = $3
         WHERE id = $4 AND status = $5
         RETURNING *",
    )
    .bind(STATUS_RESOLVED)
    .bind(resolution.problem_report.trim())
    .bind(Utc::now())
    .bind(report.id)
    .bind(STATUS_PENDING)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::BadRequest("Report is already resolved".to_string()))?;

    let reporter = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(resolved.user_id)
        .fetch_optional(&**pool)
        .await?;
    match reporter {
        Some(reporter) => {
            mailer
                .send(
                    &reporter.email,
                    email_templates::report_resolution(
                        &reporter.name,
                        &resolved.category,
                        resolved.problem_report.as_deref().unwrap_or_default(),
                    ),
                )
                .await?
        }
        None => log::warn!("Reporter of {} no longer exists, no email sent", resolved.id),
    }

    Ok(response::ok("Report resolved", resolved))
}
