//! Submission processor: the single path every lead takes.
//!
//! Flow, each stage able to end the request:
//! 1. Method gate
//! 2. Parse the JSON body
//! 3. Honeypot check (silent success)
//! 4. Per-client rate limit
//! 5. Field validation
//! 6. Persistence
//! 7. Notification emails (concurrent, soft-fail)

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use chrono::Utc;
use futures::future::join;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{IntakeConfig, NotifyConfig};
use crate::context::ClientContext;
use crate::error::{DatabaseError, EmailError, IntakeError};
use crate::notify::{Mailer, OutgoingEmail, acknowledgement_email, operations_email};
use crate::pipeline::rules::{self, ValidatedLead};
use crate::pipeline::types::{
    Accepted, DeliveryStatus, LeadStatus, LeadSubmission, NotificationReport, StoredLead,
};
use crate::ratelimit::RateLimiter;
use crate::store::{self, LeadStore};

/// Collaborators the pipeline runs against.
#[derive(Clone)]
pub struct IntakeDeps {
    pub store: Arc<dyn LeadStore>,
    pub mailer: Arc<dyn Mailer>,
    pub limiter: Arc<dyn RateLimiter>,
    pub notify: NotifyConfig,
    /// Bound on the store insert and on each email send.
    pub stage_timeout: Duration,
}

impl IntakeDeps {
    /// Open the configured store and mailer around an existing limiter.
    pub async fn from_config(
        config: &IntakeConfig,
        limiter: Arc<dyn RateLimiter>,
    ) -> crate::error::Result<Self> {
        let store = store::open_store(&config.store, config.stage_timeout).await?;
        let mailer = crate::notify::build_mailer(&config.mailer, config.stage_timeout)?;
        Ok(Self {
            store,
            mailer,
            limiter,
            notify: config.notify.clone(),
            stage_timeout: config.stage_timeout,
        })
    }
}

/// Run a raw request body through the pipeline.
///
/// An empty body reads as `{}`. Anything that is not a JSON object is an
/// internal error, matching how the form endpoint has always answered it.
pub async fn process_lead_submission(
    body: &[u8],
    ctx: &ClientContext,
    deps: &IntakeDeps,
) -> Result<Accepted, IntakeError> {
    ensure_post(ctx)?;
    let submission = parse_body(body)?;
    process_submission(submission, ctx, deps).await
}

/// Run an already-parsed submission through the pipeline.
pub async fn process_submission(
    submission: LeadSubmission,
    ctx: &ClientContext,
    deps: &IntakeDeps,
) -> Result<Accepted, IntakeError> {
    ensure_post(ctx)?;

    if submission.is_honeypot_hit() {
        info!(client = %ctx.client_id, "Honeypot field filled; discarding submission");
        return Ok(Accepted::Discarded);
    }

    if !deps.limiter.check(&ctx.client_id) {
        warn!(client = %ctx.client_id, "Submission rate limited");
        return Err(IntakeError::RateLimited {
            client: ctx.client_id.clone(),
        });
    }

    let validated = rules::validate(&submission).map_err(|errors| {
        debug!(
            client = %ctx.client_id,
            fields = ?errors.keys().collect::<Vec<_>>(),
            "Submission failed validation"
        );
        IntakeError::ValidationFailed(errors)
    })?;

    let lead = build_record(validated, ctx);
    persist(&lead, deps).await?;

    info!(
        lead_id = %lead.id,
        company = %lead.company_name,
        stage = %lead.current_stage,
        "Lead stored"
    );

    let notifications = notify(&lead, deps).await;
    Ok(Accepted::Stored {
        lead_id: lead.id,
        notifications,
    })
}

fn ensure_post(ctx: &ClientContext) -> Result<(), IntakeError> {
    if ctx.method == Method::POST {
        Ok(())
    } else {
        Err(IntakeError::MethodNotAllowed(ctx.method.to_string()))
    }
}

/// Decode the body into a submission. Whitespace-only bodies count as empty.
pub fn parse_body(body: &[u8]) -> Result<LeadSubmission, IntakeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(LeadSubmission::default());
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Malformed JSON body");
        IntakeError::Internal(format!("malformed JSON body: {e}"))
    })?;

    if !value.is_object() {
        warn!("JSON body is not an object");
        return Err(IntakeError::Internal("JSON body is not an object".into()));
    }

    serde_json::from_value(value)
        .map_err(|e| IntakeError::Internal(format!("unreadable submission: {e}")))
}

/// Attach identity and transport metadata to a validated lead.
fn build_record(lead: ValidatedLead, ctx: &ClientContext) -> StoredLead {
    StoredLead {
        id: Uuid::new_v4(),
        full_name: lead.full_name,
        work_email: lead.work_email,
        phone_whatsapp: lead.phone_whatsapp,
        company_name: lead.company_name,
        current_stage: lead.current_stage,
        primary_goal: lead.primary_goal,
        deck_or_website: lead.deck_or_website,
        request_type: lead.request_type,
        source_page: lead.source_page,
        utm: lead.utm,
        ip_address: ctx.client_id.clone(),
        user_agent: ctx.user_agent.clone(),
        status: LeadStatus::New,
        created_at: Utc::now(),
    }
}

async fn persist(lead: &StoredLead, deps: &IntakeDeps) -> Result<(), IntakeError> {
    let result = match timeout(deps.stage_timeout, deps.store.insert_lead(lead)).await {
        Ok(result) => result,
        Err(_) => Err(DatabaseError::Timeout(deps.stage_timeout)),
    };

    result.map_err(|e| {
        error!(
            lead_id = %lead.id,
            store = deps.store.name(),
            error = %e,
            "Failed to store lead"
        );
        IntakeError::Storage(e)
    })
}

/// Send both emails concurrently. Failures are logged and reported, never raised.
async fn notify(lead: &StoredLead, deps: &IntakeDeps) -> NotificationReport {
    let ops = operations_email(lead, &deps.notify);
    let ack = acknowledgement_email(lead, &deps.notify);

    let (operations, acknowledgement) = join(
        deliver(&ops, "operations", lead.id, deps),
        deliver(&ack, "acknowledgement", lead.id, deps),
    )
    .await;

    NotificationReport {
        operations,
        acknowledgement,
    }
}

async fn deliver(
    email: &OutgoingEmail,
    kind: &'static str,
    lead_id: Uuid,
    deps: &IntakeDeps,
) -> DeliveryStatus {
    let result = match timeout(deps.stage_timeout, deps.mailer.send(email)).await {
        Ok(result) => result,
        Err(_) => Err(EmailError::Timeout(deps.stage_timeout)),
    };

    match result {
        Ok(()) => {
            debug!(%lead_id, kind, mailer = deps.mailer.name(), "Notification sent");
            DeliveryStatus::Sent
        }
        Err(e) => {
            warn!(
                %lead_id,
                kind,
                mailer = deps.mailer.name(),
                error = %e,
                "Notification failed; lead already stored"
            );
            DeliveryStatus::Failed(e.to_string())
        }
    }
}
