use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use url::Url;
use validator::Validate;

use crate::config::Config;
use crate::db::account::{self, NewCustomer};
use crate::errors::AppError;
use crate::models::user::User;
use crate::utils::email_templates;
use crate::utils::jwt::{self, Claims, SessionEvent};
use crate::utils::mailer::Mailer;
use crate::utils::{password, response, validation};

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1, max = 128))]
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    token: String,
    expires_at: usize,
    user: Claims,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 1, max = 150))]
    company: String,
    #[validate(length(max = 500))]
    address: Option<String>,
    #[validate(length(max = 30))]
    telephone: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    email: String,
}

#[derive(Deserialize, Validate)]
pub struct SetPasswordRequest {
    #[validate(length(equal = 64))]
    token: String,
    #[validate(length(min = 8, max = 64))]
    password: String,
}

fn session_response(claims: Claims, secret: &str) -> Result<SessionResponse, AppError> {
    let token = jwt::generate_token(&claims, secret)
        .map_err(|_| AppError::InternalServerError("Token generation error".to_string()))?;
    Ok(SessionResponse { token, expires_at: claims.exp, user: claims })
}

/// Builds `<base>/setpassword?token=<token>`. A path on the base is kept.
pub fn set_password_link(base_url: &str, token: &str) -> Result<String, AppError> {
    let base = format!("{}/", base_url.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .and_then(|base| base.join("setpassword"))
        .map_err(|e| AppError::InternalServerError(format!("Invalid PUBLIC_BASE_URL: {}", e)))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.to_string())
}

async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await?)
}

pub async fn login(
    req: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    validation::validate_payload(&req.0)?;

    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());
    let user = find_user_by_email(&pool, &req.email).await?.ok_or_else(invalid)?;
    let stored = user.password.clone().ok_or_else(invalid)?;

    let candidate = req.password.clone();
    let verified = web::block(move || password::verify_password(&candidate, &stored))
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))??;
    if !verified {
        return Err(invalid());
    }

    let claims = jwt::derive_session(None, SessionEvent::InitialLogin(&user), Utc::now());
    log::info!("User {} signed in", user.id);
    Ok(response::ok("Login successful", session_response(claims, &config.jwt_secret)?))
}

/// Re-reads the caller's account so profile and role changes show up without
/// signing in again. The expiry of the current session is kept.
pub async fn refresh(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(claims.user_id()?)
        .fetch_optional(&**pool)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let refreshed = jwt::derive_session(Some(&claims), SessionEvent::ExplicitRefresh(&user), Utc::now());
    Ok(response::ok("Session refreshed", session_response(refreshed, &config.jwt_secret)?))
}

pub async fn session(req: HttpRequest, config: web::Data<Config>) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    Ok(response::ok("Session", claims))
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    mailer: web::Data<Mailer>,
) -> Result<HttpResponse, AppError> {
    validation::validate_payload(&req.0)?;
    let name = validation::required("name", &req.name)?;
    let company = validation::required("company", &req.company)?;
    let email = req.email.trim().to_lowercase();

    match account::find_duplicate(&pool, &email, &company, None).await? {
        Some(duplicate) => return Err(duplicate.into()),
        None => {}
    }

    let (user, token) = account::register_customer(
        &pool,
        NewCustomer {
            name: &name,
            email: &email,
            company: &company,
            address: req.address.as_deref(),
            telephone: req.telephone.as_deref(),
        },
        Utc::now(),
    )
    .await
    .map_err(account::write_error)?;
    log::info!("Registered company {} ({})", user.company, user.id);

    let link = set_password_link(&config.public_base_url, &token.token)?;
    mailer.send(&user.email, email_templates::registration(&user.name, &link)).await?;

    Ok(response::created("Registration successful", user))
}

pub async fn forgot_password(
    req: web::Json<ForgotPasswordRequest>,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    mailer: web::Data<Mailer>,
) -> Result<HttpResponse, AppError> {
    validation::validate_payload(&req.0)?;

    let user = find_user_by_email(&pool, &req.email)
        .await?
        .ok_or_else(|| AppError::NotFound("Email not found".to_string()))?;

    let token = account::issue_reset_token(&pool, user.id, Utc::now()).await?;
    let link = set_password_link(&config.public_base_url, &token.token)?;
    mailer.send(&user.email, email_templates::password_reset(&user.name, &link)).await?;

    Ok(response::message("Password reset email sent"))
}

pub async fn set_password(
    req: web::Json<SetPasswordRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    validation::validate_payload(&req.0)?;

    let plain = req.password.clone();
    let hash = web::block(move || password::hash_password(&plain))
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))??;

    if !account::redeem_reset_token(&pool, &req.token, &hash, Utc::now()).await? {
        return Err(AppError::BadRequest("Token expired or invalid".to_string()));
    }
    Ok(response::message("Password has been set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_password_link_carries_token() {
        let link = set_password_link("https://payroll.example.com/", "ab12").unwrap();
        assert_eq!(link, "https://payroll.example.com/setpassword?token=ab12");
    }

    #[test]
    fn set_password_link_keeps_base_path() {
        for base in ["https://payroll.example.com/app", "https://payroll.example.com/app/"] {
            let link = set_password_link(base, "ab12").unwrap();
            assert_eq!(link, "https://payroll.example.com/app/setpassword?token=ab12");
        }
        let link = set_password_link("https://payroll.example.com", "ab12").unwrap();
        assert_eq!(link, "https://payroll.example.com/setpassword?token=ab12");
    }

    #[test]
    fn bad_base_url_is_reported() {
        assert!(set_password_link("not a url", "ab12").is_err());
    }
}
