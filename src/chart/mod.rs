// =====================================================
// CHART PIPELINE ORCHESTRATION
// =====================================================

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;

use crate::aggregate;
use crate::capability;
use crate::connector::{self, DataSourceConnector};
use crate::error::ChartError;
use crate::query;
use crate::rules;
use crate::types::{ChartConfig, ChartResult, DataSourceConfig, SpecLimits};

/// Read-only view of the external configuration store. The production
/// implementation lives outside this crate; `MemoryConfigStore` covers
/// embedding and tests.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn chart_config(&self, id: i64) -> Option<ChartConfig>;
    async fn data_source(&self, id: i64) -> Option<DataSourceConfig>;
}

#[derive(Default)]
pub struct MemoryConfigStore {
    charts: HashMap<i64, ChartConfig>,
    sources: HashMap<i64, DataSourceConfig>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_chart(&mut self, chart: ChartConfig) {
        self.charts.insert(chart.id, chart);
    }

    pub fn insert_data_source(&mut self, source: DataSourceConfig) {
        self.sources.insert(source.id, source);
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn chart_config(&self, id: i64) -> Option<ChartConfig> {
        self.charts.get(&id).cloned()
    }

    async fn data_source(&self, id: i64) -> Option<DataSourceConfig> {
        self.sources.get(&id).cloned()
    }
}

/// One stateless service per configuration store. Every request resolves
/// its own configs and opens its own connection, so concurrent requests
/// never interfere.
pub struct ChartService<S: ConfigStore> {
    store: S,
}

impl<S: ConfigStore> ChartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_chart_data(
        &self,
        chart_id: i64,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<ChartResult, ChartError> {
        let chart = self
            .store
            .chart_config(chart_id)
            .await
            .ok_or(ChartError::ConfigNotFound(chart_id))?;
        let source = self
            .store
            .data_source(chart.data_source_id)
            .await
            .ok_or(ChartError::ConfigNotFound(chart.data_source_id))?;

        let connector = connector::for_engine(source.engine);
        run_chart(connector, &source, &chart, start, end).await
    }

    pub async fn test_connection(&self, data_source_id: i64) -> Result<(bool, String), ChartError> {
        let source = self
            .store
            .data_source(data_source_id)
            .await
            .ok_or(ChartError::ConfigNotFound(data_source_id))?;

        Ok(connector::for_engine(source.engine).test_connection(&source).await)
    }

    pub async fn list_tables(&self, data_source_id: i64) -> Result<Vec<String>, ChartError> {
        let source = self
            .store
            .data_source(data_source_id)
            .await
            .ok_or(ChartError::ConfigNotFound(data_source_id))?;

        connector::for_engine(source.engine).list_tables(&source).await
    }
}

/// Runs the analytics pipeline for one resolved chart: build the query,
/// execute it, bucket the samples, compute capability statistics, and
/// evaluate the enabled control rules against the bucket means. An empty
/// result set is a success: empty buckets, no statistics, no violations.
pub async fn run_chart(
    connector: &dyn DataSourceConnector,
    source: &DataSourceConfig,
    chart: &ChartConfig,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Result<ChartResult, ChartError> {
    chart.validate()?;

    let built = query::build_chart_query(chart, connector, start, end)?;
    log::debug!("chart {}: executing {}", chart.id, built.sql);

    let raw = connector
        .execute_query(source, &built.sql, &built.params, None)
        .await?;

    let series = aggregate::coerce_samples(&raw);
    let buckets =
        aggregate::bucketize(&series.samples, chart.aggregation_type, chart.aggregation_size)?;

    let stat_series =
        capability::series_for_mode(chart.aggregation_type, &buckets, &series.samples);
    let statistics =
        capability::analyze(&stat_series, chart.upper_spec_limit, chart.lower_spec_limit);

    let means: Vec<f64> = buckets.iter().map(|b| b.mean).collect();
    let rule_violations = match &statistics {
        Some(stats) => rules::evaluate(&means, stats.mean, stats.std_dev, &chart.weco_rules),
        None => Vec::new(),
    };

    log::debug!(
        "chart {}: {} buckets from {} retained samples ({} dropped), {} violations",
        chart.id,
        buckets.len(),
        series.samples.len(),
        series.dropped,
        rule_violations.len()
    );

    Ok(ChartResult {
        config: SpecLimits {
            usl: chart.upper_spec_limit,
            lsl: chart.lower_spec_limit,
            target: chart.target,
        },
        data: buckets,
        statistics,
        rule_violations,
    })
}
