//! Outbound email: composition plus interchangeable dispatchers.
//!
//! - `ResendMailer`: Resend HTTP API (production default)
//! - `SmtpMailer`: any SMTP relay via lettre
//! - `LogMailer`: writes to the log, sends nothing (local development)

pub mod compose;
pub mod resend;
pub mod smtp;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::MailerConfig;
use crate::error::EmailError;

pub use compose::{acknowledgement_email, escape_html, operations_email};
pub use resend::ResendMailer;
pub use smtp::SmtpMailer;

/// A fully composed email ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// `Name <address>` or bare address.
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    /// Plain-text alternative, when one was composed.
    pub text: Option<String>,
}

/// Sends composed emails through some provider.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Deliver one email.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

/// Logs each email instead of sending it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            html_len = email.html.len(),
            "Email dispatch disabled; not sent"
        );
        Ok(())
    }
}

/// Build the configured dispatcher. No provider means log-only.
pub fn build_mailer(config: &MailerConfig, timeout: Duration) -> Result<Arc<dyn Mailer>, EmailError> {
    Ok(match config {
        MailerConfig::Resend { api_key, base_url } => {
            Arc::new(ResendMailer::new(api_key.clone(), base_url.clone(), timeout)?)
        }
        MailerConfig::Smtp(smtp) => Arc::new(SmtpMailer::new(smtp.clone())),
        MailerConfig::Disabled => {
            warn!("No email provider configured; notifications will only be logged");
            Arc::new(LogMailer)
        }
    })
}
