//! Resend HTTP API dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::EmailError;
use crate::notify::{Mailer, OutgoingEmail};

pub const DEFAULT_RESEND_BASE_URL: &str = "https://api.resend.com";

/// Longest provider error body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Request body for `POST /emails`.
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

impl<'a> From<&'a OutgoingEmail> for SendEmailRequest<'a> {
    fn from(email: &'a OutgoingEmail) -> Self {
        Self {
            from: &email.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
            text: email.text.as_deref(),
        }
    }
}

/// Sends email through the Resend REST API.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl ResendMailer {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmailError::Client {
                provider: "resend".into(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    fn name(&self) -> &str {
        "resend"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let url = format!("{}/emails", self.base_url);
        debug!(to = %email.to, "Sending email via Resend");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&SendEmailRequest::from(email))
            .send()
            .await
            .map_err(|e| EmailError::SendFailed {
                provider: "resend".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                provider: "resend".into(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}
