// =====================================================
// INJECTION-SAFE CHART QUERY CONSTRUCTION
// =====================================================

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

use crate::connector::{DataSourceConnector, SqlValue};
use crate::error::ChartError;
use crate::types::ChartConfig;

// Identifiers cannot be parameter-bound, so they must pass this
// allow-list before they are embedded in query text.
static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

pub fn validate_identifier(name: &str) -> Result<(), ChartError> {
    if IDENTIFIER_REGEX.is_match(name) {
        return Ok(());
    }
    Err(ChartError::Query(format!(
        "identifier '{}' is not a valid column or table name",
        name
    )))
}

// Table names may arrive schema-qualified (`dbo.measurements`); each
// segment passes the same allow-list on its own.
pub fn validate_table_name(name: &str) -> Result<(), ChartError> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() > 2 {
        return Err(ChartError::Query(format!(
            "identifier '{}' is not a valid column or table name",
            name
        )));
    }
    for segment in segments {
        validate_identifier(segment)?;
    }
    Ok(())
}

/// Builds the filtered sample SELECT for one chart. Identifiers come from
/// the allow-listed chart mapping; product/operation identifiers and the
/// optional `[start, end)` bounds are bound parameters rendered through
/// the connector's placeholder strategy.
pub fn build_chart_query(
    chart: &ChartConfig,
    dialect: &dyn DataSourceConnector,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Result<BuiltQuery, ChartError> {
    validate_table_name(&chart.table_name)?;
    validate_identifier(&chart.value_column)?;
    validate_identifier(&chart.datetime_column)?;
    validate_identifier(&chart.product_column)?;
    validate_identifier(&chart.operation_column)?;

    let mut params = vec![
        SqlValue::Text(chart.product_identifier.clone()),
        SqlValue::Text(chart.operation_identifier.clone()),
    ];

    let mut sql = format!(
        "SELECT {dt} AS ts, {value} AS value FROM {table} WHERE {product} = {p1} AND {operation} = {p2}",
        dt = chart.datetime_column,
        value = chart.value_column,
        table = chart.table_name,
        product = chart.product_column,
        operation = chart.operation_column,
        p1 = dialect.placeholder(1),
        p2 = dialect.placeholder(2),
    );

    if let Some(start) = start {
        params.push(SqlValue::DateTime(start));
        sql.push_str(&format!(
            " AND {} >= {}",
            chart.datetime_column,
            dialect.placeholder(params.len())
        ));
    }
    if let Some(end) = end {
        params.push(SqlValue::DateTime(end));
        sql.push_str(&format!(
            " AND {} < {}",
            chart.datetime_column,
            dialect.placeholder(params.len())
        ));
    }

    Ok(BuiltQuery { sql, params })
}
