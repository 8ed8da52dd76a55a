// =====================================================
// SAMPLE COERCION AND BUCKETED AGGREGATION
// =====================================================

use chrono::{DurationRound, NaiveDateTime, TimeDelta};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::connector::QueryRows;
use crate::error::ChartError;
use crate::types::{AggregationType, Bucket, BucketStart, Sample};

/// Retained samples in ascending timestamp order, plus how many raw rows
/// were dropped as non-numeric or unparseable.
#[derive(Debug, Clone, Default)]
pub struct SampleSeries {
    pub samples: Vec<Sample>,
    pub dropped: usize,
}

/// Coerces the connector's raw rows (`ts`, `value`) into samples. Rows
/// whose value is not numeric (or numeric text) or whose timestamp does
/// not parse are dropped, with the drop count retained. The survivors
/// are stable-sorted ascending by timestamp so bucket membership is
/// deterministic.
pub fn coerce_samples(rows: &QueryRows) -> SampleSeries {
    let mut samples = Vec::with_capacity(rows.rows.len());
    let mut dropped = 0usize;

    for row in &rows.rows {
        let timestamp = row.first().and_then(parse_timestamp);
        let value = row.get(1).and_then(numeric_value);
        match (timestamp, value) {
            (Some(timestamp), Some(value)) => samples.push(Sample { timestamp, value }),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        log::warn!("dropped {} rows with non-numeric value or unparseable timestamp", dropped);
    }

    samples.sort_by_key(|s| s.timestamp);
    SampleSeries { samples, dropped }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?;
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// Partitions time-ordered samples into buckets per the configured mode.
/// Time windows are aligned to the wall-clock hour/day boundary, and
/// windows with no retained samples are omitted from the output rather
/// than zero-filled.
pub fn bucketize(
    samples: &[Sample],
    mode: AggregationType,
    aggregation_size: u32,
) -> Result<Vec<Bucket>, ChartError> {
    match mode {
        AggregationType::TimeHour => Ok(time_buckets(samples, TimeDelta::hours(1))),
        AggregationType::TimeDay => Ok(time_buckets(samples, TimeDelta::days(1))),
        AggregationType::Count => {
            if aggregation_size == 0 {
                return Err(ChartError::InvalidConfig(
                    "aggregation_size must be positive for COUNT aggregation".to_string(),
                ));
            }
            Ok(count_buckets(samples, aggregation_size as usize))
        }
        AggregationType::Raw => Ok(samples
            .iter()
            .map(|s| bucket_from(BucketStart::Timestamp(s.timestamp), &[s.value]))
            .collect()),
    }
}

fn time_buckets(samples: &[Sample], window: TimeDelta) -> Vec<Bucket> {
    let mut windows: BTreeMap<NaiveDateTime, Vec<f64>> = BTreeMap::new();
    for sample in samples {
        let start = sample.timestamp.duration_trunc(window).unwrap_or(sample.timestamp);
        windows.entry(start).or_default().push(sample.value);
    }

    windows
        .into_iter()
        .map(|(start, values)| bucket_from(BucketStart::Timestamp(start), &values))
        .collect()
}

fn count_buckets(samples: &[Sample], size: usize) -> Vec<Bucket> {
    samples
        .chunks(size)
        .enumerate()
        .map(|(group, chunk)| {
            let values: Vec<f64> = chunk.iter().map(|s| s.value).collect();
            bucket_from(BucketStart::Index(group as u64), &values)
        })
        .collect()
}

fn bucket_from(start: BucketStart, values: &[f64]) -> Bucket {
    let (mean, std_dev, min, max) = describe(values);
    Bucket {
        start,
        mean,
        std_dev,
        count: values.len() as u64,
        min,
        max,
        range: max - min,
    }
}

/// Mean, sample standard deviation ((n−1) denominator, 0 when n < 2),
/// min and max of a non-empty series.
pub(crate) fn describe(values: &[f64]) -> (f64, f64, f64, f64) {
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;

    let std_dev = if n < 2 {
        0.0
    } else {
        let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (sum_sq / (n - 1) as f64).sqrt()
    };

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    (mean, std_dev, min, max)
}

#[cfg(test)]
mod tests;
