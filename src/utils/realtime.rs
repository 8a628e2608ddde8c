//! Publishing to the real-time relay that pushes chat events to browsers.
//!
//! Delivery is best effort: there is no acknowledgement and no offline queue.

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::config::RealtimeConfig;
use crate::errors::AppError;

pub const EVENT_NEW_MESSAGE: &str = "new-message";

pub fn room_channel(room_id: uuid::Uuid) -> String {
    format!("room-{}", room_id)
}

#[derive(Serialize)]
struct PublishRequest<'a, T: Serialize> {
    channel: &'a str,
    event: &'a str,
    data: &'a T,
}

/// Hex HMAC-SHA256 of the request body.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, AppError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::RealtimeError("HMAC key error".to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Clone)]
pub struct Broadcaster {
    http: reqwest::Client,
    config: Option<RealtimeConfig>,
}

impl Broadcaster {
    pub fn new(http: reqwest::Client, config: Option<RealtimeConfig>) -> Self {
        if config.is_none() {
            log::warn!("REALTIME_* not set, chat broadcast is disabled");
        }
        Self { http, config }
    }

    pub async fn publish<T: Serialize>(&self, channel: &str, event: &str, data: &T) -> Result<(), AppError> {
        let Some(config) = &self.config else {
            log::debug!("Skipping broadcast of {} on {}", event, channel);
            return Ok(());
        };

        let body = serde_json::to_vec(&PublishRequest { channel, event, data })
            .map_err(|e| AppError::RealtimeError(e.to_string()))?;
        let signature = sign(&config.secret, &body)?;

        let resp = self.http
            .post(format!("{}/events", config.url.trim_end_matches('/')))
            .header("Content-Type", "application/json")
            .header("X-Relay-Key", &config.key)
            .header("X-Relay-Signature", signature)
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::RealtimeError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AppError::RealtimeError(format!("relay answered {}", resp.status())));
        }
        Ok(())
    }
}
