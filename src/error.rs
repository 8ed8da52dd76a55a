use thiserror::Error;

/// Failure kinds surfaced to the boundary layer. Empty result sets and
/// zero-variance statistics are success states and never appear here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    #[error("chart configuration {0} not found")]
    ConfigNotFound(i64),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("invalid chart configuration: {0}")]
    InvalidConfig(String),
}

impl ChartError {
    pub fn kind(&self) -> &'static str {
        match self {
            ChartError::ConfigNotFound(_) => "config_not_found",
            ChartError::Connection(_) => "connection_error",
            ChartError::Query(_) => "query_error",
            ChartError::InvalidConfig(_) => "invalid_config",
        }
    }
}
