use serde::Deserialize;

use crate::errors::AppError;

const VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// reCAPTCHA verification for public forms.
#[derive(Clone)]
pub struct CaptchaVerifier {
    http: reqwest::Client,
    secret: Option<String>,
}

impl CaptchaVerifier {
    pub fn new(http: reqwest::Client, secret: Option<String>) -> Self {
        if secret.is_none() {
            log::warn!("RECAPTCHA_SECRET not set, captcha verification is disabled");
        }
        Self { http, secret }
    }

    pub async fn verify(&self, token: &str) -> Result<(), AppError> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };
        if token.trim().is_empty() {
            return Err(AppError::BadRequest("Captcha token is required".to_string()));
        }

        let resp: VerifyResponse = self.http
            .post(VERIFY_URL)
            .form(&[("secret", secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(|e| AppError::InternalServerError(format!("captcha verification failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::InternalServerError(format!("captcha response unreadable: {}", e)))?;

        if resp.success {
            Ok(())
        } else {
            log::warn!("Captcha rejected: {:?}", resp.error_codes);
            Err(AppError::BadRequest("Captcha verification failed".to_string()))
        }
    }
}
