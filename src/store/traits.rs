//! `LeadStore` trait: the single persistence interface the pipeline needs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::pipeline::types::StoredLead;

/// Backend-agnostic lead storage. Append-only from the pipeline's side.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Persist a new lead.
    async fn insert_lead(&self, lead: &StoredLead) -> Result<(), DatabaseError>;

    /// Fetch a lead by id.
    async fn get_lead(&self, id: Uuid) -> Result<Option<StoredLead>, DatabaseError>;

    /// Most recent leads first, up to `limit`.
    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredLead>, DatabaseError>;
}
