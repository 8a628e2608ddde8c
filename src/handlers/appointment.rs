use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::appointment::{Appointment, STATUS_COMPLETED, STATUS_PENDING};
use crate::scheduling::{self, Availability};
use crate::utils::captcha::CaptchaVerifier;
use crate::utils::email_templates;
use crate::utils::mailer::Mailer;
use crate::utils::{jwt, response, validation};

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(length(min = 1, max = 150))]
    company: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 9, max = 30))]
    telephone: String,
    date: NaiveDate,
    start_time: String,
    end_time: String,
    #[validate(length(max = 1000))]
    note: Option<String>,
    #[serde(default)]
    captcha_token: String,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    date: NaiveDate,
}

#[derive(Deserialize)]
pub struct AppointmentQueryParams {
    status: Option<String>,
    date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct AppointmentUpdate {
    status: String,
}

async fn booked_start_times(pool: &PgPool, date: NaiveDate) -> Result<Vec<String>, AppError> {
    Ok(sqlx::query_scalar::<_, String>("SELECT start_time FROM appointments WHERE date = $1")
        .bind(date)
        .fetch_all(pool)
        .await?)
}

async fn load_appointment(pool: &PgPool, id: Uuid) -> Result<Appointment, AppError> {
    sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))
}

pub async fn get_availability(
    pool: web::Data<PgPool>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, AppError> {
    let booked = booked_start_times(&pool, query.date).await?;
    Ok(response::ok("Availability retrieved", Availability::for_date(query.date, &booked)))
}

/// Public booking form.
pub async fn create_appointment(
    pool: web::Data<PgPool>,
    captcha: web::Data<CaptchaVerifier>,
    mailer: web::Data<Mailer>,
    new_appointment: web::Json<NewAppointment>,
) -> Result<HttpResponse, AppError> {
    validation::validate_payload(&new_appointment.0)?;
    let slot = scheduling::find_slot(&new_appointment.start_time, &new_appointment.end_time)
        .ok_or_else(|| AppError::BadRequest("Invalid time slot".to_string()))?;
    if new_appointment.date < Utc::now().date_naive() {
        return Err(AppError::BadRequest("Date is in the past".to_string()));
    }

    captcha.verify(&new_appointment.captcha_token).await?;

    let booked = booked_start_times(&pool, new_appointment.date).await?;
    if scheduling::is_fully_booked(&booked) {
        return Err(AppError::BadRequest("Date is fully booked".to_string()));
    }
    if booked.iter().any(|b| b == slot.start_time) {
        return Err(AppError::BadRequest("Time slot is already booked".to_string()));
    }

    let appointment = sqlx::query_as::<_, Appointment>(
        "INSERT INTO appointments (id, name, company, email, telephone, date, start_time, end_time, note, status, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(new_appointment.name.trim())
    .bind(new_appointment.company.trim())
    .bind(new_appointment.email.trim())
    .bind(new_appointment.telephone.trim())
    .bind(new_appointment.date)
    .bind(slot.start_time)
    .bind(slot.end_time)
    .bind(&new_appointment.note)
    .bind(STATUS_PENDING)
    .bind(Utc::now())
    .fetch_one(&**pool)
    .await
    .map_err(|err| match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::BadRequest("Time slot is already booked".to_string())
        }
        _ => AppError::from(err),
    })?;

    mailer
        .send(
            &appointment.email,
            email_templates::appointment_confirmation(
                &appointment.name,
                appointment.date,
                &appointment.start_time,
                &appointment.end_time,
            ),
        )
        .await?;

    Ok(response::created("Appointment booked", appointment))
}

pub async fn get_appointments(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<AppointmentQueryParams>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    claims.require_admin()?;

    let mut builder: sqlx::QueryBuilder<'_, sqlx::Postgres> =
        sqlx::QueryBuilder::new("SELECT * FROM appointments WHERE TRUE");
    if let Some(status) = &query.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if let Some(date) = query.date {
        builder.push(" AND date = ");
        builder.push_bind(date);
    }
    builder.push(" ORDER BY date DESC, start_time");

    let appointments = builder.build_query_as::<Appointment>().fetch_all(&**pool).await?;
    Ok(response::ok("Appointments retrieved", appointments))
}

/// Marks a pending appointment completed.
pub async fn update_appointment(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    id: web::Path<Uuid>,
    update: web::Json<AppointmentUpdate>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    claims.require_admin()?;
    if update.status != STATUS_COMPLETED {
        return Err(AppError::BadRequest("Status can only be set to completed".to_string()));
    }

    let appointment = load_appointment(&pool, id.into_inner()).await?;
    if !appointment.is_pending() {
        return Err(AppError::BadRequest("Appointment is already completed".to_string()));
    }

    let updated = sqlx::query_as::<_, Appointment>(
        "UPDATE appointments SET status = $1 WHERE id = $2 RETURNING *",
    )
    .bind(STATUS_COMPLETED)
    .bind(appointment.id)
    .fetch_one(&**pool)
    .await?;
    Ok(response::ok("Appointment updated", updated))
}

/// Deletes an appointment. Pending ones get a cancellation email.
pub async fn delete_appointment(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    mailer: web::Data<Mailer>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    claims.require_admin()?;

    let appointment = load_appointment(&pool, id.into_inner()).await?;
    sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(appointment.id)
        .execute(&**pool)
        .await?;

    if appointment.is_pending() {
        mailer
            .send(
                &appointment.email,
                email_templates::appointment_cancellation(
                    &appointment.name,
                    appointment.date,
                    &appointment.start_time,
                    &appointment.end_time,
                ),
            )
            .await?;
    }

    Ok(response::message("Appointment deleted successfully"))
}
