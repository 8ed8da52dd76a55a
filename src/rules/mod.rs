// =====================================================
// CONTROL-CHART RULE EVALUATION (WECO-STYLE)
// =====================================================

use crate::types::{RuleId, RuleViolation, Side};

const CANONICAL_ORDER: [RuleId; 4] = [
    RuleId::Beyond3Sigma,
    RuleId::TwoOfThreeBeyond2Sigma,
    RuleId::FourOfFiveBeyond1Sigma,
    RuleId::EightConsecutiveSameSide,
];

const RUN_LENGTH: usize = 8;

/// Evaluates the enabled rules over the ordered bucket means, expressed
/// as sigma zones around the global mean. Pure: identical inputs yield
/// identical violation lists. Rules run in canonical order; within a
/// rule, violations come out in ascending bucket index. With zero sigma
/// the z-score is undefined and the sigma-zone rules stay silent.
pub fn evaluate(
    means: &[f64],
    mean: f64,
    std_dev: f64,
    enabled: &[RuleId],
) -> Vec<RuleViolation> {
    let mut violations = Vec::new();
    if means.is_empty() || enabled.is_empty() {
        return violations;
    }

    let z_scores: Option<Vec<f64>> = if std_dev > 0.0 {
        Some(means.iter().map(|m| (m - mean) / std_dev).collect())
    } else {
        None
    };

    for rule in CANONICAL_ORDER {
        if !enabled.contains(&rule) {
            continue;
        }
        match rule {
            RuleId::Beyond3Sigma => {
                if let Some(z) = &z_scores {
                    beyond_sigma(z, &mut violations);
                }
            }
            RuleId::TwoOfThreeBeyond2Sigma => {
                if let Some(z) = &z_scores {
                    zone_rule(z, 3, 2, 2.0, rule, &mut violations);
                }
            }
            RuleId::FourOfFiveBeyond1Sigma => {
                if let Some(z) = &z_scores {
                    zone_rule(z, 5, 4, 1.0, rule, &mut violations);
                }
            }
            RuleId::EightConsecutiveSameSide => {
                same_side_rule(means, mean, &mut violations);
            }
        }
    }

    violations
}

fn beyond_sigma(z_scores: &[f64], out: &mut Vec<RuleViolation>) {
    for (i, &z) in z_scores.iter().enumerate() {
        if z > 3.0 {
            out.push(RuleViolation {
                bucket_index: i,
                rule_id: RuleId::Beyond3Sigma,
                side: Side::Above,
            });
        } else if z < -3.0 {
            out.push(RuleViolation {
                bucket_index: i,
                rule_id: RuleId::Beyond3Sigma,
                side: Side::Below,
            });
        }
    }
}

// Sliding full windows; a match is attributed to the last beyond-zone
// bucket of the window, and overlapping windows that land on the same
// bucket are reported once.
fn zone_rule(
    z_scores: &[f64],
    window: usize,
    need: usize,
    zone: f64,
    rule: RuleId,
    out: &mut Vec<RuleViolation>,
) {
    if z_scores.len() < window {
        return;
    }

    for end in (window - 1)..z_scores.len() {
        let start = end + 1 - window;
        for side in [Side::Above, Side::Below] {
            let beyond = |z: f64| match side {
                Side::Above => z > zone,
                Side::Below => z < -zone,
            };
            if z_scores[start..=end].iter().filter(|&&z| beyond(z)).count() < need {
                continue;
            }
            if let Some(index) = (start..=end).rev().find(|&i| beyond(z_scores[i])) {
                let violation = RuleViolation { bucket_index: index, rule_id: rule, side };
                if !out.contains(&violation) {
                    out.push(violation);
                }
            }
        }
    }
}

fn same_side_rule(means: &[f64], center: f64, out: &mut Vec<RuleViolation>) {
    let mut side: Option<Side> = None;
    let mut run = 0usize;

    for (i, &value) in means.iter().enumerate() {
        let current = if value > center {
            Some(Side::Above)
        } else if value < center {
            Some(Side::Below)
        } else {
            // A value exactly on the center line breaks the run.
            None
        };

        if current.is_some() && current == side {
            run += 1;
        } else {
            side = current;
            run = usize::from(current.is_some());
        }

        if run >= RUN_LENGTH {
            if let Some(side) = side {
                out.push(RuleViolation {
                    bucket_index: i,
                    rule_id: RuleId::EightConsecutiveSameSide,
                    side,
                });
            }
        }
    }
}
