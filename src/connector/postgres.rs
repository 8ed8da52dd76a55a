// =====================================================
// POSTGRESQL CONNECTOR (via sqlx)
// =====================================================

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Value};
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{Column, ConnectOptions, PgConnection, Row};
use tokio::time::{timeout, Duration};

use crate::connector::{
    normalize_query_timeout_seconds, redact_secret, DataSourceConnector, QueryRows, SqlValue,
    CONNECT_TIMEOUT_SECS, TIMESTAMP_FORMAT,
};
use crate::error::ChartError;
use crate::types::{DataSourceConfig, Engine};

pub struct PostgresConnector;

fn connect_options(source: &DataSourceConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&source.host)
        .port(source.port)
        .username(&source.username)
        .password(&source.password);

    if !source.database_name.is_empty() {
        options = options.database(&source.database_name);
    }

    options
}

async fn connect(source: &DataSourceConfig) -> Result<PgConnection, ChartError> {
    let options = connect_options(source);

    timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS), options.connect())
        .await
        .map_err(|_| {
            ChartError::Connection(format!(
                "connection to {}:{} timed out after {} seconds",
                source.host, source.port, CONNECT_TIMEOUT_SECS
            ))
        })?
        .map_err(|e| {
            let message = redact_secret(&e.to_string(), &source.password);
            if message.to_lowercase().contains("connection refused") {
                return ChartError::Connection(format!(
                    "connection refused: is PostgreSQL running on {}:{}?",
                    source.host, source.port
                ));
            }
            ChartError::Connection(message)
        })
}

fn cell_value(row: &PgRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<i32, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<i16, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<f64, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<f32, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<bool, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
        json!(v.format(TIMESTAMP_FORMAT).to_string())
    } else if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
        json!(v.naive_utc().format(TIMESTAMP_FORMAT).to_string())
    } else if let Ok(v) = row.try_get::<String, _>(idx) {
        json!(v)
    } else {
        Value::Null
    }
}

#[async_trait]
impl DataSourceConnector for PostgresConnector {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    async fn test_connection(&self, source: &DataSourceConfig) -> (bool, String) {
        let mut conn = match connect(source).await {
            Ok(conn) => conn,
            Err(e) => return (false, e.to_string()),
        };

        match sqlx::query("SELECT 1").fetch_one(&mut conn).await {
            Ok(_) => (true, "Connection Successful".to_string()),
            Err(e) => (false, redact_secret(&e.to_string(), &source.password)),
        }
    }

    async fn execute_query(
        &self,
        source: &DataSourceConfig,
        query: &str,
        params: &[SqlValue],
        timeout_secs: Option<u64>,
    ) -> Result<QueryRows, ChartError> {
        let mut conn = connect(source).await?;

        let mut prepared = sqlx::query(query);
        for param in params {
            prepared = match param {
                SqlValue::Text(s) => prepared.bind(s),
                SqlValue::DateTime(dt) => prepared.bind(dt),
            };
        }

        let fetch = prepared.fetch_all(&mut conn);
        // The connection is dropped when this call returns, on every
        // path, including a timeout cancelling the fetch mid-flight.
        let rows = match normalize_query_timeout_seconds(timeout_secs) {
            Some(secs) => timeout(Duration::from_secs(secs), fetch)
                .await
                .map_err(|_| ChartError::Query(format!("query timed out after {} seconds", secs)))?,
            None => fetch.await,
        }
        .map_err(|e| ChartError::Query(redact_secret(&e.to_string(), &source.password)))?;

        let mut out = QueryRows::default();
        if let Some(first) = rows.first() {
            out.columns = first.columns().iter().map(|c| c.name().to_string()).collect();
        }
        for row in &rows {
            let mut cells = Vec::with_capacity(row.columns().len());
            for i in 0..row.columns().len() {
                cells.push(cell_value(row, i));
            }
            out.rows.push(cells);
        }

        Ok(out)
    }

    async fn list_tables(&self, source: &DataSourceConfig) -> Result<Vec<String>, ChartError> {
        let result = self
            .execute_query(
                source,
                "SELECT table_schema, table_name FROM information_schema.tables \
                 WHERE table_schema = 'public' ORDER BY table_name",
                &[],
                None,
            )
            .await?;

        Ok(result
            .rows
            .iter()
            .map(|row| {
                format!(
                    "{}.{}",
                    row.first().and_then(|v| v.as_str()).unwrap_or(""),
                    row.get(1).and_then(|v| v.as_str()).unwrap_or("")
                )
            })
            .collect())
    }
}
