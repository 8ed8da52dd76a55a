// =====================================================
// COMMON CONFIGURATION AND RESULT TYPES
// =====================================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ChartError;

// --- Source Engine ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Engine {
    #[default]
    Mssql,
    Postgres,
}

// --- Data Source Configuration ---
// Owned by the external configuration store; read-only here.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DataSourceConfig {
    pub id: i64,
    pub name: String,
    pub engine: Engine,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// --- Aggregation Mode ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationType {
    #[default]
    TimeHour,
    TimeDay,
    Count,
    Raw,
}

// --- Control Rule Identifiers ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleId {
    #[serde(rename = "beyond-3-sigma")]
    Beyond3Sigma,
    #[serde(rename = "2-of-3-beyond-2-sigma")]
    TwoOfThreeBeyond2Sigma,
    #[serde(rename = "4-of-5-beyond-1-sigma")]
    FourOfFiveBeyond1Sigma,
    #[serde(rename = "8-consecutive-same-side")]
    EightConsecutiveSameSide,
}

// --- Chart Configuration ---
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChartConfig {
    pub id: i64,
    pub owner_id: i64,
    pub data_source_id: i64,

    // Data mapping into the external table
    pub table_name: String,
    pub value_column: String,
    pub datetime_column: String,

    // Identifiers to filter data in the external DB
    pub product_column: String,
    pub product_identifier: String,
    pub operation_column: String,
    pub operation_identifier: String,

    pub title: Option<String>,

    // Specifications
    pub upper_spec_limit: Option<f64>,
    pub lower_spec_limit: Option<f64>,
    pub target: Option<f64>,

    #[serde(default)]
    pub aggregation_type: AggregationType,
    #[serde(default = "default_aggregation_size")]
    pub aggregation_size: u32,

    #[serde(default)]
    pub weco_rules: Vec<RuleId>,
}

fn default_aggregation_size() -> u32 {
    1
}

impl ChartConfig {
    // Invariants owned by the chart record itself, checked before any
    // query text exists.
    pub fn validate(&self) -> Result<(), ChartError> {
        if let (Some(usl), Some(lsl)) = (self.upper_spec_limit, self.lower_spec_limit) {
            if usl <= lsl {
                return Err(ChartError::InvalidConfig(format!(
                    "upper spec limit {} must be greater than lower spec limit {}",
                    usl, lsl
                )));
            }
        }
        if self.aggregation_type == AggregationType::Count && self.aggregation_size == 0 {
            return Err(ChartError::InvalidConfig(
                "aggregation_size must be positive for COUNT aggregation".to_string(),
            ));
        }
        Ok(())
    }
}

// --- Retained Sample ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

// --- Bucket Start Marker ---
// Timestamp for time-based and raw aggregation, sequence index for COUNT.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(untagged)]
pub enum BucketStart {
    Timestamp(NaiveDateTime),
    Index(u64),
}

// --- Aggregated Bucket ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Bucket {
    pub start: BucketStart,
    pub mean: f64,
    #[serde(rename = "std")]
    pub std_dev: f64,
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

// --- Capability Statistics ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct CapabilityStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub count: u64,
    #[serde(rename = "Cp", skip_serializing_if = "Option::is_none")]
    pub cp: Option<f64>,
    #[serde(rename = "Cpk", skip_serializing_if = "Option::is_none")]
    pub cpk: Option<f64>,
    #[serde(rename = "Cpu", skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(rename = "Cpl", skip_serializing_if = "Option::is_none")]
    pub cpl: Option<f64>,
}

// --- Rule Violation ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Above,
    Below,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleViolation {
    pub bucket_index: usize,
    pub rule_id: RuleId,
    pub side: Side,
}

// --- Spec Limit Echo ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct SpecLimits {
    pub usl: Option<f64>,
    pub lsl: Option<f64>,
    pub target: Option<f64>,
}

// --- Chart Result ---
// Recomputed per request, never persisted.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChartResult {
    pub config: SpecLimits,
    pub data: Vec<Bucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<CapabilityStats>,
    pub rule_violations: Vec<RuleViolation>,
}
