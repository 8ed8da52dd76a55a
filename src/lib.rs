// SPC chart analytics over externally configured relational sources:
// injection-safe query construction, bucketed aggregation, process
// capability statistics, and control-rule evaluation.

pub mod aggregate;
pub mod capability;
pub mod chart;
pub mod connector;
pub mod error;
pub mod query;
pub mod rules;
pub mod types;

pub use chart::{ChartService, ConfigStore, MemoryConfigStore};
pub use connector::DataSourceConnector;
pub use error::ChartError;
pub use types::{
    AggregationType, Bucket, CapabilityStats, ChartConfig, ChartResult, DataSourceConfig, Engine,
    RuleId, RuleViolation, Sample, Side,
};
