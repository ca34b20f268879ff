//! SMTP dispatcher via lettre.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use crate::error::EmailError;
use crate::notify::{Mailer, OutgoingEmail};

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Sends email through an authenticated SMTP relay.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address.parse().map_err(|e| EmailError::InvalidAddress {
        address: address.to_string(),
        reason: format!("{e}"),
    })
}

/// Build the MIME message: HTML alone, or HTML with a plain-text alternative.
pub fn build_message(email: &OutgoingEmail) -> Result<Message, EmailError> {
    let builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject.clone());

    let built = match &email.text {
        Some(text) => builder.multipart(MultiPart::alternative_plain_html(
            text.clone(),
            email.html.clone(),
        )),
        None => builder.singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(email.html.clone()),
        ),
    };

    built.map_err(|e| EmailError::Build(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = build_message(email)?;
        let config = self.config.clone();
        let to = email.to.clone();

        // lettre's SmtpTransport is blocking.
        tokio::task::spawn_blocking(move || {
            let creds = Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            );

            let transport = SmtpTransport::relay(&config.host)
                .map_err(|e| EmailError::SendFailed {
                    provider: "smtp".into(),
                    reason: format!("SMTP relay error: {e}"),
                })?
                .port(config.port)
                .credentials(creds)
                .build();

            transport
                .send(&message)
                .map_err(|e| EmailError::SendFailed {
                    provider: "smtp".into(),
                    reason: format!("SMTP send failed: {e}"),
                })?;

            tracing::info!("Email sent to {to}");
            Ok(())
        })
        .await
        .map_err(|e| EmailError::SendFailed {
            provider: "smtp".into(),
            reason: format!("SMTP task panicked: {e}"),
        })?
    }
}
