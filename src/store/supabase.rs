//! Supabase backend: the hosted `leads` table, reached over PostgREST.
//!
//! Writes use the service-role key, which bypasses row-level security.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::pipeline::types::StoredLead;
use crate::store::traits::LeadStore;

/// Longest PostgREST error body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// PostgREST client for the `leads` table.
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    service_key: SecretString,
}

impl SupabaseStore {
    pub fn new(
        base_url: impl Into<String>,
        service_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, DatabaseError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DatabaseError::Pool(format!("Failed to build Supabase HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/leads", self.base_url)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_key.expose_secret();
        req.header("apikey", key).bearer_auth(key)
    }

    async fn select(&self, query: &[(&str, String)]) -> Result<Vec<StoredLead>, DatabaseError> {
        let resp = self
            .authorized(self.client.get(self.table_url()))
            .query(query)
            .send()
            .await
            .map_err(|e| DatabaseError::Query(format!("supabase select: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DatabaseError::Query(format!(
                "supabase select returned HTTP {status}: {}",
                truncate(&body)
            )));
        }

        resp.json::<Vec<StoredLead>>()
            .await
            .map_err(|e| DatabaseError::Serialization(format!("supabase rows: {e}")))
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

/// Insert payload: PostgREST takes an array of rows.
pub fn insert_body(lead: &StoredLead) -> serde_json::Value {
    serde_json::json!([lead])
}

#[async_trait]
impl LeadStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn insert_lead(&self, lead: &StoredLead) -> Result<(), DatabaseError> {
        let resp = self
            .authorized(self.client.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(&insert_body(lead))
            .send()
            .await
            .map_err(|e| DatabaseError::Pool(format!("supabase insert: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DatabaseError::Rejected(format!(
                "supabase insert returned HTTP {status}: {}",
                truncate(&body)
            )));
        }

        debug!(id = %lead.id, "Lead inserted into Supabase");
        Ok(())
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<StoredLead>, DatabaseError> {
        let rows = self
            .select(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{id}")),
            ])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredLead>, DatabaseError> {
        self.select(&[
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ])
        .await
    }
}
