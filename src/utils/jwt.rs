use actix_web::HttpRequest;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{Role, User};

pub const SESSION_TTL_HOURS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User id
    pub email: String,
    pub name: String,
    pub company: String,
    pub role: Role,
    pub exp: usize, // Expiration timestamp
}

/// What caused the session to be (re)derived.
pub enum SessionEvent<'a> {
    /// Credentials were just verified.
    InitialLogin(&'a User),
    /// The client asked for a reload after a profile change.
    ExplicitRefresh(&'a User),
}

/// Computes the next session claims. A refresh copies the user's current
/// identity fields but keeps the original expiry, so it never extends a
/// session. A refresh without a previous session is treated as a login.
pub fn derive_session(previous: Option<&Claims>, event: SessionEvent<'_>, now: DateTime<Utc>) -> Claims {
    let (user, exp) = match (event, previous) {
        (SessionEvent::ExplicitRefresh(user), Some(prev)) => (user, prev.exp),
        (SessionEvent::InitialLogin(user), _) | (SessionEvent::ExplicitRefresh(user), None) => {
            (user, (now + Duration::hours(SESSION_TTL_HOURS)).timestamp() as usize)
        }
    };

    Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        company: user.company.clone(),
        role: user.role(),
        exp,
    }
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    /// Company a request acts on. Customers are pinned to their own company;
    /// admins must name one.
    pub fn company_scope(&self, requested: Option<Uuid>) -> Result<Uuid, AppError> {
        let own = self.user_id()?;
        match (self.is_admin(), requested) {
            (true, Some(company)) => Ok(company),
            (true, None) => Err(AppError::BadRequest("companyId is required".to_string())),
            (false, Some(company)) if company != own => {
                Err(AppError::Forbidden("Access to another company is not allowed".to_string()))
            }
            (false, _) => Ok(own),
        }
    }

    /// Self or admin.
    pub fn require_self_or_admin(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.is_admin() || self.user_id()? == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied".to_string()))
        }
    }
}

pub fn generate_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(jsonwebtoken::Algorithm::HS256),
    )
    .map(|data| data.claims)
}

/// Reads and validates the bearer token of a request.
pub fn authorize(req: &HttpRequest, secret: &str) -> Result<Claims, AppError> {
    let token = req.headers().get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

    validate_token(token, secret)
        .map_err(|err| AppError::Unauthorized(format!("Invalid token: {}", err)))
}
