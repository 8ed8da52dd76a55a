// =====================================================
// PROCESS CAPABILITY STATISTICS
// =====================================================

use crate::aggregate::describe;
use crate::types::{AggregationType, Bucket, CapabilityStats, Sample};

/// Selects the series capability statistics are computed over. Time-based
/// aggregation reports on the bucket means; COUNT and RAW report on the
/// raw retained samples. The asymmetry is long-standing upstream behavior
/// kept for compatibility (see DESIGN.md).
pub fn series_for_mode(
    mode: AggregationType,
    buckets: &[Bucket],
    samples: &[Sample],
) -> Vec<f64> {
    match mode {
        AggregationType::TimeHour | AggregationType::TimeDay => {
            buckets.iter().map(|b| b.mean).collect()
        }
        AggregationType::Count | AggregationType::Raw => {
            samples.iter().map(|s| s.value).collect()
        }
    }
}

/// Global mean/std-dev/min/max/count over the selected series, plus
/// Cp/Cpk/Cpu/Cpl when both spec limits are present. Zero variance maps
/// every index to 0 instead of dividing. An empty series has no
/// statistics at all.
pub fn analyze(series: &[f64], usl: Option<f64>, lsl: Option<f64>) -> Option<CapabilityStats> {
    if series.is_empty() {
        return None;
    }

    let (mean, std_dev, min, max) = describe(series);
    let mut stats = CapabilityStats {
        mean,
        std_dev,
        min,
        max,
        count: series.len() as u64,
        ..CapabilityStats::default()
    };

    if let (Some(usl), Some(lsl)) = (usl, lsl) {
        let (cp, cpu, cpl) = if std_dev > 0.0 {
            (
                (usl - lsl) / (6.0 * std_dev),
                (usl - mean) / (3.0 * std_dev),
                (mean - lsl) / (3.0 * std_dev),
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        stats.cp = Some(cp);
        stats.cpu = Some(cpu);
        stats.cpl = Some(cpl);
        stats.cpk = Some(cpu.min(cpl));
    }

    Some(stats)
}
