//! Process configuration, read once from the environment at start-up.

use std::env;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub jwt_secret: String,
    /// Base URL of the web client, used for set-password links.
    pub public_base_url: String,
    pub email_from: String,
    /// Private bucket holding raw payroll exports.
    pub payroll_bucket: String,
    /// Public bucket holding blog pictures and uploaded images.
    pub media_bucket: String,
    /// reCAPTCHA secret. Verification is skipped when unset.
    pub recaptcha_secret: Option<String>,
    pub realtime: Option<RealtimeConfig>,
    pub ingest_batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub url: String,
    pub key: String,
    pub secret: String,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, BoxError> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set")?;
        if jwt_secret.is_empty() {
            return Err("JWT_SECRET cannot be empty".into());
        }

        let realtime = match (
            optional("REALTIME_URL"),
            optional("REALTIME_KEY"),
            optional("REALTIME_SECRET"),
        ) {
            (Some(url), Some(key), Some(secret)) => Some(RealtimeConfig { url, key, secret }),
            _ => None,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            jwt_secret,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            email_from: env::var("EMAIL_FROM").unwrap_or_else(|_| "noreply@localhost".into()),
            payroll_bucket: env::var("PAYROLL_BUCKET").unwrap_or_else(|_| "payroll-exports".into()),
            media_bucket: env::var("MEDIA_BUCKET").unwrap_or_else(|_| "payroll-media".into()),
            recaptcha_secret: optional("RECAPTCHA_SECRET"),
            realtime,
            ingest_batch_size: env::var("INGEST_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(50),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
