//! Persistence layer: lead storage behind the `LeadStore` trait.

pub mod libsql_backend;
pub mod migrations;
pub mod supabase;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::error::DatabaseError;

pub use libsql_backend::LibSqlBackend;
pub use supabase::SupabaseStore;
pub use traits::LeadStore;

/// Open the configured backend. Local databases are migrated on open.
pub async fn open_store(
    config: &StoreConfig,
    timeout: Duration,
) -> Result<Arc<dyn LeadStore>, DatabaseError> {
    Ok(match config {
        StoreConfig::Local { path } => Arc::new(LibSqlBackend::new_local(path).await?),
        StoreConfig::Supabase { url, service_key } => {
            Arc::new(SupabaseStore::new(url.clone(), service_key.clone(), timeout)?)
        }
    })
}
