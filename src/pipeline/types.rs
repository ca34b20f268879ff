//! Shared types for the lead intake pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Field name → human-readable message, one entry per failing field.
pub type FieldErrors = BTreeMap<String, String>;

/// Default `request_type` when the form does not send one.
pub const DEFAULT_REQUEST_TYPE: &str = "Diagnostic";

// ── Inbound submission ──────────────────────────────────────────────

/// An untrusted contact-form submission, exactly as the browser sent it.
///
/// Every key is optional at the transport level. A missing required field is
/// a validation failure, not a parse failure, so string fields that carry a
/// non-string JSON value deserialize as `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadSubmission {
    #[serde(default, deserialize_with = "lenient_string")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub work_email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_whatsapp: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub current_stage: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub primary_goal: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub deck_or_website: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub request_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source_page: Option<String>,
    /// UTM tags sent as top-level keys.
    #[serde(flatten)]
    pub utm: UtmParams,
    /// UTM tags sent nested, the way the site's form script posts them.
    #[serde(default, deserialize_with = "lenient_utm")]
    pub utm_params: Option<UtmParams>,
    /// Honeypot. Hidden from humans; bots fill it in.
    #[serde(default, rename = "_gotcha")]
    pub gotcha: Option<Value>,
}

impl LeadSubmission {
    /// Whether the hidden honeypot field carries anything.
    ///
    /// Follows JavaScript truthiness, which is what the form's own
    /// client-side checks use: `""`, `0`, `false` and `null` are empty.
    pub fn is_honeypot_hit(&self) -> bool {
        match &self.gotcha {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }

    /// Attribution tags, top-level keys first, nested `utm_params` second.
    pub fn attribution(&self) -> UtmParams {
        let nested = self.utm_params.clone().unwrap_or_default();
        UtmParams {
            utm_source: present(&self.utm.utm_source).or(present(&nested.utm_source)),
            utm_medium: present(&self.utm.utm_medium).or(present(&nested.utm_medium)),
            utm_campaign: present(&self.utm.utm_campaign).or(present(&nested.utm_campaign)),
            utm_term: present(&self.utm.utm_term).or(present(&nested.utm_term)),
            utm_content: present(&self.utm.utm_content).or(present(&nested.utm_content)),
        }
    }
}

/// Marketing attribution tags, passed through uninterpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
    #[serde(default, deserialize_with = "lenient_string")]
    pub utm_source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub utm_medium: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub utm_campaign: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub utm_term: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub utm_content: Option<String>,
}

/// Clone an optional string, treating `""` as absent.
pub(crate) fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_utm<'de, D>(deserializer: D) -> Result<Option<UtmParams>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(obj @ Value::Object(_)) => serde_json::from_value(obj).ok(),
        _ => None,
    })
}

// ── Business stage ──────────────────────────────────────────────────

/// The stage a prospect selects on the form. Labels must match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusinessStage {
    #[serde(rename = "Pre-Seed")]
    PreSeed,
    #[serde(rename = "Seed")]
    Seed,
    #[serde(rename = "Series A+")]
    SeriesAPlus,
    #[serde(rename = "SME ($10k–$50k MRR)")]
    SmeEarly,
    #[serde(rename = "SME ($50k–$250k MRR)")]
    SmeGrowth,
    #[serde(rename = "Enterprise")]
    Enterprise,
    #[serde(rename = "Not sure")]
    NotSure,
}

impl BusinessStage {
    pub const ALL: [BusinessStage; 7] = [
        BusinessStage::PreSeed,
        BusinessStage::Seed,
        BusinessStage::SeriesAPlus,
        BusinessStage::SmeEarly,
        BusinessStage::SmeGrowth,
        BusinessStage::Enterprise,
        BusinessStage::NotSure,
    ];

    /// The label shown on the form and stored in the database.
    pub fn label(&self) -> &'static str {
        match self {
            BusinessStage::PreSeed => "Pre-Seed",
            BusinessStage::Seed => "Seed",
            BusinessStage::SeriesAPlus => "Series A+",
            BusinessStage::SmeEarly => "SME ($10k–$50k MRR)",
            BusinessStage::SmeGrowth => "SME ($50k–$250k MRR)",
            BusinessStage::Enterprise => "Enterprise",
            BusinessStage::NotSure => "Not sure",
        }
    }
}

impl fmt::Display for BusinessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BusinessStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.label() == s)
            .ok_or_else(|| format!("unknown business stage: {s}"))
    }
}

// ── Stored lead ─────────────────────────────────────────────────────

/// Lifecycle status of a stored lead. The intake pipeline only creates `New`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            other => Err(format!("unknown lead status: {other}")),
        }
    }
}

/// A validated lead plus the server-derived attributes, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLead {
    pub id: Uuid,
    pub full_name: String,
    pub work_email: String,
    pub phone_whatsapp: Option<String>,
    pub company_name: String,
    pub current_stage: BusinessStage,
    pub primary_goal: String,
    pub deck_or_website: Option<String>,
    pub request_type: String,
    pub source_page: Option<String>,
    #[serde(flatten)]
    pub utm: UtmParams,
    pub ip_address: String,
    pub user_agent: String,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

// ── Outcomes ────────────────────────────────────────────────────────

/// How one notification email fared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed(String),
}

impl DeliveryStatus {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryStatus::Sent)
    }
}

/// Result of the notification stage. Never fails the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationReport {
    /// Summary sent to the operations inbox.
    pub operations: DeliveryStatus,
    /// Acknowledgement sent to the submitter.
    pub acknowledgement: DeliveryStatus,
}

/// A submission the pipeline answered with `{ ok: true }`.
#[derive(Debug, Clone, PartialEq)]
pub enum Accepted {
    /// Honeypot hit: reported as success, nothing stored or sent.
    Discarded,
    /// Lead stored; notifications attempted.
    Stored {
        lead_id: Uuid,
        notifications: NotificationReport,
    },
}
