use super::*;
use chrono::NaiveDate;
use serde_json::json;

fn ts(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap().and_hms_opt(h, m, 0).unwrap()
}

fn sample(day: u32, h: u32, m: u32, value: f64) -> Sample {
    Sample { timestamp: ts(day, h, m), value }
}

fn rows(cells: Vec<(&str, serde_json::Value)>) -> QueryRows {
    QueryRows {
        columns: vec!["ts".to_string(), "value".to_string()],
        rows: cells.into_iter().map(|(t, v)| vec![json!(t), v]).collect(),
    }
}

#[test]
fn test_coerce_drops_non_numeric_and_counts() {
    let raw = rows(vec![
        ("2024-03-05T10:00:00", json!(1.5)),
        ("2024-03-05T10:01:00", json!("2.25")),
        ("2024-03-05T10:02:00", json!("scrap")),
        ("2024-03-05T10:03:00", serde_json::Value::Null),
        ("2024-03-05T10:04:00", json!(4)),
    ]);

    let series = coerce_samples(&raw);
    assert_eq!(series.samples.len(), 3);
    assert_eq!(series.dropped, 2);
    assert_eq!(series.samples[1].value, 2.25);
}

#[test]
fn test_coerce_drops_unparseable_timestamps() {
    let raw = rows(vec![
        ("2024-03-05T10:00:00", json!(1.0)),
        ("not a timestamp", json!(2.0)),
    ]);

    let series = coerce_samples(&raw);
    assert_eq!(series.samples.len(), 1);
    assert_eq!(series.dropped, 1);
}

#[test]
fn test_coerce_sorts_ascending_by_timestamp() {
    let raw = rows(vec![
        ("2024-03-05T12:00:00", json!(3.0)),
        ("2024-03-05T08:00:00", json!(1.0)),
        ("2024-03-05T10:00:00", json!(2.0)),
    ]);

    let series = coerce_samples(&raw);
    let values: Vec<f64> = series.samples.iter().map(|s| s.value).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_coerce_accepts_space_separated_and_fractional_timestamps() {
    let raw = rows(vec![
        ("2024-03-05 10:00:00", json!(1.0)),
        ("2024-03-05T10:01:00.250", json!(2.0)),
    ]);
    assert_eq!(coerce_samples(&raw).samples.len(), 2);
}

#[test]
fn test_hour_buckets_align_to_wall_clock() {
    let samples = vec![
        sample(5, 10, 5, 2.0),
        sample(5, 10, 55, 4.0),
        sample(5, 11, 10, 9.0),
    ];

    let buckets = bucketize(&samples, AggregationType::TimeHour, 1).unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].start, BucketStart::Timestamp(ts(5, 10, 0)));
    assert_eq!(buckets[0].mean, 3.0);
    assert_eq!(buckets[0].count, 2);
    assert_eq!(buckets[1].start, BucketStart::Timestamp(ts(5, 11, 0)));
    assert_eq!(buckets[1].count, 1);
}

#[test]
fn test_empty_windows_are_omitted_not_zero_filled() {
    // Samples at 10:00 and 12:00; the 11:00 window has nothing.
    let samples = vec![sample(5, 10, 30, 1.0), sample(5, 12, 30, 2.0)];

    let buckets = bucketize(&samples, AggregationType::TimeHour, 1).unwrap();
    assert_eq!(buckets.len(), 2);
    assert!(buckets
        .iter()
        .all(|b| b.start != BucketStart::Timestamp(ts(5, 11, 0))));
}

#[test]
fn test_day_buckets_align_to_midnight() {
    let samples = vec![
        sample(5, 23, 59, 1.0),
        sample(6, 0, 1, 3.0),
        sample(6, 18, 0, 5.0),
    ];

    let buckets = bucketize(&samples, AggregationType::TimeDay, 1).unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].start, BucketStart::Timestamp(ts(5, 0, 0)));
    assert_eq!(buckets[1].start, BucketStart::Timestamp(ts(6, 0, 0)));
    assert_eq!(buckets[1].mean, 4.0);
}

#[test]
fn test_count_buckets_chunk_exactly_with_short_tail() {
    let samples: Vec<Sample> = (0..10).map(|i| sample(5, 8, i, i as f64)).collect();

    let buckets = bucketize(&samples, AggregationType::Count, 4).unwrap();
    assert_eq!(buckets.len(), 3);
    assert_eq!(buckets[0].count, 4);
    assert_eq!(buckets[1].count, 4);
    assert_eq!(buckets[2].count, 2);
    assert_eq!(buckets[0].start, BucketStart::Index(0));
    assert_eq!(buckets[2].start, BucketStart::Index(2));
}

#[test]
fn test_count_zero_size_is_rejected() {
    let samples = vec![sample(5, 8, 0, 1.0)];
    assert!(bucketize(&samples, AggregationType::Count, 0).is_err());
}

#[test]
fn test_bucket_counts_sum_to_retained_samples() {
    let samples: Vec<Sample> = (0..23).map(|i| sample(5, 8 + i / 10, i % 10, i as f64)).collect();

    for mode in [
        AggregationType::TimeHour,
        AggregationType::TimeDay,
        AggregationType::Count,
        AggregationType::Raw,
    ] {
        let buckets = bucketize(&samples, mode, 5).unwrap();
        let total: u64 = buckets.iter().map(|b| b.count).sum();
        assert_eq!(total, samples.len() as u64, "mode {:?}", mode);
    }
}

#[test]
fn test_raw_mode_one_bucket_per_sample() {
    let samples = vec![sample(5, 8, 0, 1.5), sample(5, 8, 1, 2.5)];

    let buckets = bucketize(&samples, AggregationType::Raw, 1).unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].start, BucketStart::Timestamp(ts(5, 8, 0)));
    assert_eq!(buckets[0].mean, 1.5);
    assert_eq!(buckets[0].count, 1);
    assert_eq!(buckets[0].std_dev, 0.0);
    assert_eq!(buckets[0].range, 0.0);
}

#[test]
fn test_singleton_bucket_std_is_zero() {
    let samples = vec![sample(5, 10, 0, 42.0)];
    let buckets = bucketize(&samples, AggregationType::TimeHour, 1).unwrap();
    assert_eq!(buckets[0].std_dev, 0.0);
}

#[test]
fn test_bucket_statistics() {
    let samples = vec![
        sample(5, 10, 0, 1.0),
        sample(5, 10, 15, 2.0),
        sample(5, 10, 30, 3.0),
        sample(5, 10, 45, 4.0),
    ];

    let buckets = bucketize(&samples, AggregationType::TimeHour, 1).unwrap();
    let bucket = &buckets[0];
    assert_eq!(bucket.mean, 2.5);
    assert_eq!(bucket.min, 1.0);
    assert_eq!(bucket.max, 4.0);
    assert_eq!(bucket.range, 3.0);
    // Sample variance of 1..=4 is 5/3.
    assert!((bucket.std_dev - (5.0f64 / 3.0).sqrt()).abs() < 1e-9);
}

#[test]
fn test_empty_input_yields_no_buckets() {
    for mode in [
        AggregationType::TimeHour,
        AggregationType::TimeDay,
        AggregationType::Count,
        AggregationType::Raw,
    ] {
        assert!(bucketize(&[], mode, 3).unwrap().is_empty(), "mode {:?}", mode);
    }
}
