//! libSQL backend: async `LeadStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::pipeline::types::{StoredLead, UtmParams};
use crate::store::migrations;
use crate::store::traits::LeadStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const LEAD_COLUMNS: &str = "id, full_name, work_email, phone_whatsapp, company_name, \
    current_stage, primary_goal, deck_or_website, request_type, source_page, \
    utm_source, utm_medium, utm_campaign, utm_term, utm_content, \
    ip_address, user_agent, status, created_at";

/// Map a libsql Row (in `LEAD_COLUMNS` order) to a StoredLead.
fn row_to_lead(row: &libsql::Row) -> Result<StoredLead, DatabaseError> {
    let field = |e: libsql::Error| DatabaseError::Query(format!("row parse: {e}"));

    let id_str: String = row.get(0).map_err(field)?;
    let stage_str: String = row.get(5).map_err(field)?;
    let status_str: String = row.get(17).map_err(field)?;
    let created_str: String = row.get(18).map_err(field)?;

    Ok(StoredLead {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| DatabaseError::Serialization(format!("lead id {id_str}: {e}")))?,
        full_name: row.get(1).map_err(field)?,
        work_email: row.get(2).map_err(field)?,
        phone_whatsapp: row.get(3).ok(),
        company_name: row.get(4).map_err(field)?,
        current_stage: stage_str.parse().map_err(DatabaseError::Serialization)?,
        primary_goal: row.get(6).map_err(field)?,
        deck_or_website: row.get(7).ok(),
        request_type: row.get(8).map_err(field)?,
        source_page: row.get(9).ok(),
        utm: UtmParams {
            utm_source: row.get(10).ok(),
            utm_medium: row.get(11).ok(),
            utm_campaign: row.get(12).ok(),
            utm_term: row.get(13).ok(),
            utm_content: row.get(14).ok(),
        },
        ip_address: row.get(15).map_err(field)?,
        user_agent: row.get(16).map_err(field)?,
        status: status_str.parse().map_err(DatabaseError::Serialization)?,
        created_at: parse_datetime(&created_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl LeadStore for LibSqlBackend {
    fn name(&self) -> &str {
        "libsql"
    }

    async fn insert_lead(&self, lead: &StoredLead) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO leads ({LEAD_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                             ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
                ),
                params![
                    lead.id.to_string(),
                    lead.full_name.as_str(),
                    lead.work_email.as_str(),
                    opt_text(lead.phone_whatsapp.as_deref()),
                    lead.company_name.as_str(),
                    lead.current_stage.label(),
                    lead.primary_goal.as_str(),
                    opt_text(lead.deck_or_website.as_deref()),
                    lead.request_type.as_str(),
                    opt_text(lead.source_page.as_deref()),
                    opt_text(lead.utm.utm_source.as_deref()),
                    opt_text(lead.utm.utm_medium.as_deref()),
                    opt_text(lead.utm.utm_campaign.as_deref()),
                    opt_text(lead.utm.utm_term.as_deref()),
                    opt_text(lead.utm.utm_content.as_deref()),
                    lead.ip_address.as_str(),
                    lead.user_agent.as_str(),
                    lead.status.as_str(),
                    lead.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Rejected(format!("insert_lead: {e}")))?;

        debug!(id = %lead.id, "Lead inserted into DB");
        Ok(())
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<StoredLead>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_lead: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_lead(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_lead: {e}"))),
        }
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredLead>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at DESC LIMIT ?1"),
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_recent: {e}")))?;

        let mut leads = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_recent: {e}")))?
        {
            leads.push(row_to_lead(&row)?);
        }
        Ok(leads)
    }
}
