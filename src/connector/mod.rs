// =====================================================
// EXTERNAL DATA SOURCE CONNECTIVITY
// =====================================================

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::ChartError;
use crate::types::{DataSourceConfig, Engine};

mod mssql;
mod postgres;

pub use mssql::MssqlConnector;
pub use postgres::PostgresConnector;

pub const CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const MAX_QUERY_TIMEOUT_SECS: u64 = 3600;

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const REDACTED: &str = "[REDACTED]";

// --- Bound Query Parameter ---
// Values only; identifiers go through the query builder's allow-list.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    DateTime(NaiveDateTime),
}

// --- Query Result ---
#[derive(Serialize, Debug, Default, Clone)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Capability interface over a configured relational source. Each engine
/// variant owns its dialect differences (connection establishment,
/// placeholder syntax, catalog queries); callers never branch on the
/// engine themselves.
#[async_trait]
pub trait DataSourceConnector: Send + Sync {
    fn engine(&self) -> Engine;

    /// Placeholder text for the 1-based bound-parameter position.
    fn placeholder(&self, index: usize) -> String;

    /// Probes the source with a bounded timeout. Never fails: problems
    /// come back as `(false, cause)` with the secret scrubbed.
    async fn test_connection(&self, source: &DataSourceConfig) -> (bool, String);

    /// Opens a scoped connection, binds `params`, executes and collects
    /// the rows. The connection is released on every exit path.
    async fn execute_query(
        &self,
        source: &DataSourceConfig,
        query: &str,
        params: &[SqlValue],
        timeout_secs: Option<u64>,
    ) -> Result<QueryRows, ChartError>;

    /// Lists `schema.table` names visible in the source. Auxiliary; not
    /// part of the analytics path.
    async fn list_tables(&self, source: &DataSourceConfig) -> Result<Vec<String>, ChartError>;
}

pub fn for_engine(engine: Engine) -> &'static dyn DataSourceConnector {
    match engine {
        Engine::Mssql => &MssqlConnector,
        Engine::Postgres => &PostgresConnector,
    }
}

pub(crate) fn normalize_query_timeout_seconds(query_timeout_seconds: Option<u64>) -> Option<u64> {
    match query_timeout_seconds {
        Some(0) => None,
        Some(value) => Some(value.min(MAX_QUERY_TIMEOUT_SECS)),
        None => Some(DEFAULT_QUERY_TIMEOUT_SECS),
    }
}

// Driver errors occasionally echo the connection string back; the secret
// must not survive into any surfaced message.
pub(crate) fn redact_secret(message: &str, secret: &str) -> String {
    if secret.is_empty() {
        return message.to_string();
    }
    message.replace(secret, REDACTED)
}
