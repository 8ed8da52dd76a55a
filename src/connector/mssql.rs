// =====================================================
// MSSQL CONNECTOR (via Tiberius)
// =====================================================

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::TryStreamExt;
use serde_json::{json, Value};
use tiberius::{AuthMethod, Client, Config, QueryItem, ToSql};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::connector::{
    normalize_query_timeout_seconds, redact_secret, DataSourceConnector, QueryRows, SqlValue,
    CONNECT_TIMEOUT_SECS, TIMESTAMP_FORMAT,
};
use crate::error::ChartError;
use crate::types::{DataSourceConfig, Engine};

pub struct MssqlConnector;

fn tiberius_config(source: &DataSourceConfig) -> Config {
    let mut config = Config::new();
    config.host(&source.host);
    config.port(source.port);
    config.authentication(AuthMethod::sql_server(&source.username, &source.password));
    config.trust_cert();

    if !source.database_name.is_empty() {
        config.database(&source.database_name);
    }

    config
}

async fn connect(source: &DataSourceConfig) -> Result<Client<Compat<TcpStream>>, ChartError> {
    let config = tiberius_config(source);

    let attempt = async move {
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| ChartError::Connection(redact_secret(&e.to_string(), &source.password)))?;
        tcp.set_nodelay(true)
            .map_err(|e| ChartError::Connection(e.to_string()))?;

        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| ChartError::Connection(redact_secret(&e.to_string(), &source.password)))
    };

    timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS), attempt)
        .await
        .map_err(|_| {
            ChartError::Connection(format!(
                "connection to {}:{} timed out after {} seconds",
                source.host, source.port, CONNECT_TIMEOUT_SECS
            ))
        })?
}

fn cell_value(row: &tiberius::Row, idx: usize) -> Value {
    if let Ok(Some(v)) = row.try_get::<i64, _>(idx) {
        json!(v)
    } else if let Ok(Some(v)) = row.try_get::<i32, _>(idx) {
        json!(v)
    } else if let Ok(Some(v)) = row.try_get::<i16, _>(idx) {
        json!(v)
    } else if let Ok(Some(v)) = row.try_get::<f64, _>(idx) {
        json!(v)
    } else if let Ok(Some(v)) = row.try_get::<f32, _>(idx) {
        json!(v)
    } else if let Ok(Some(v)) = row.try_get::<bool, _>(idx) {
        json!(v)
    } else if let Ok(Some(v)) = row.try_get::<NaiveDateTime, _>(idx) {
        json!(v.format(TIMESTAMP_FORMAT).to_string())
    } else if let Ok(Some(v)) = row.try_get::<&str, _>(idx) {
        json!(v)
    } else {
        Value::Null
    }
}

#[async_trait]
impl DataSourceConnector for MssqlConnector {
    fn engine(&self) -> Engine {
        Engine::Mssql
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@P{}", index)
    }

    async fn test_connection(&self, source: &DataSourceConfig) -> (bool, String) {
        let mut client = match connect(source).await {
            Ok(client) => client,
            Err(e) => return (false, e.to_string()),
        };

        let result = match client.query("SELECT 1", &[]).await {
            Ok(_) => (true, "Connection Successful".to_string()),
            Err(e) => (
                false,
                redact_secret(&e.to_string(), &source.password),
            ),
        };
        result
    }

    async fn execute_query(
        &self,
        source: &DataSourceConfig,
        query: &str,
        params: &[SqlValue],
        timeout_secs: Option<u64>,
    ) -> Result<QueryRows, ChartError> {
        let mut client = connect(source).await?;

        let sql_params: Vec<&dyn ToSql> = params
            .iter()
            .map(|p| match p {
                SqlValue::Text(s) => s as &dyn ToSql,
                SqlValue::DateTime(dt) => dt as &dyn ToSql,
            })
            .collect();

        let fetch = async {
            let mut stream = client
                .query(query, &sql_params)
                .await
                .map_err(|e| ChartError::Query(redact_secret(&e.to_string(), &source.password)))?;

            let mut out = QueryRows::default();
            while let Some(item) = stream
                .try_next()
                .await
                .map_err(|e| ChartError::Query(redact_secret(&e.to_string(), &source.password)))?
            {
                match item {
                    QueryItem::Metadata(meta) => {
                        if out.columns.is_empty() {
                            out.columns =
                                meta.columns().iter().map(|c| c.name().to_string()).collect();
                        }
                    }
                    QueryItem::Row(row) => {
                        if out.columns.is_empty() {
                            out.columns =
                                row.columns().iter().map(|c| c.name().to_string()).collect();
                        }
                        let mut cells = Vec::with_capacity(row.len());
                        for i in 0..row.len() {
                            cells.push(cell_value(&row, i));
                        }
                        out.rows.push(cells);
                    }
                }
            }

            Ok(out)
        };

        // Client is dropped at the end of this call on every path,
        // including a timeout cancelling the stream mid-flight.
        match normalize_query_timeout_seconds(timeout_secs) {
            Some(secs) => timeout(Duration::from_secs(secs), fetch)
                .await
                .map_err(|_| ChartError::Query(format!("query timed out after {} seconds", secs)))?,
            None => fetch.await,
        }
    }

    async fn list_tables(&self, source: &DataSourceConfig) -> Result<Vec<String>, ChartError> {
        let result = self
            .execute_query(
                source,
                "SELECT TABLE_SCHEMA, TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_SCHEMA, TABLE_NAME",
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
