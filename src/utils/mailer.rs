use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;

use crate::errors::AppError;
use crate::utils::email_templates::EmailMessage;

/// Transactional email over SES.
#[derive(Clone)]
pub struct Mailer {
    client: SesClient,
    from: String,
}

impl Mailer {
    pub fn new(client: SesClient, from: impl Into<String>) -> Self {
        Self { client, from: from.into() }
    }

    pub async fn send(&self, to: &str, message: EmailMessage) -> Result<(), AppError> {
        let subject = Content::builder()
            .data(message.subject)
            .charset("UTF-8")
            .build()
            .map_err(|e| AppError::EmailError(e.to_string()))?;
        let html = Content::builder()
            .data(message.html)
            .charset("UTF-8")
            .build()
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        let body = Body::builder().html(html).build();
        let email = Message::builder().subject(subject).body(body).build();

        self.client
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(email).build())
            .send()
            .await
            .map_err(|e| AppError::EmailError(format!("send to {} failed: {}", to, e)))?;

        log::info!("Email sent to {}", to);
        Ok(())
    }
}
