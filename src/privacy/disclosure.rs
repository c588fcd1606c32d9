//! Low-number protection for the statistics block.
//!
//! Summary statistics are computed on the raw column and are not covered by
//! frequency-table redaction, so they pass through here before display.

use serde::Serialize;

use crate::config::RedactionConfig;
use crate::stats::SummaryStatistics;
use crate::types::SafeValue;

const EXTREME_VALUE: &str = "Extreme values describe single subjects";

/// Statistics ready for display, in describe order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProtectedSummary {
    Shown { statistics: Vec<(String, SafeValue)> },
    Suppressed { reason: String },
}

impl ProtectedSummary {
    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&SafeValue> {
        match self {
            ProtectedSummary::Shown { statistics } => statistics
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value),
            ProtectedSummary::Suppressed { .. } => None,
        }
    }
}

fn float(value: Option<f64>) -> SafeValue {
    value.map_or_else(|| SafeValue::suppressed("Not defined"), SafeValue::Float)
}

/// Apply low-number protection to a summary
pub fn protect_summary(summary: &SummaryStatistics, config: &RedactionConfig) -> ProtectedSummary {
    let count = summary.count();
    if count < config.unit_threshold {
        return ProtectedSummary::Suppressed {
            reason: format!(
                "Fewer than {} non-missing values (low number suppression)",
                config.unit_threshold
            ),
        };
    }

    let statistics = match summary {
        SummaryStatistics::Numeric {
            mean,
            std,
            q25,
            q50,
            q75,
            ..
        } => vec![
            ("count", SafeValue::Integer(count as i64)),
            ("mean", float(*mean)),
            ("std", float(*std)),
            ("min", SafeValue::suppressed(EXTREME_VALUE)),
            ("25%", float(*q25)),
            ("50%", float(*q50)),
            ("75%", float(*q75)),
            ("max", SafeValue::suppressed(EXTREME_VALUE)),
        ],
        SummaryStatistics::Categorical {
            unique, top, freq, ..
        } => {
            let share = *freq as f64 / count as f64;
            let (top, freq) = if *freq < config.unit_threshold {
                let reason = "Most frequent value has a small count";
                (SafeValue::suppressed(reason), SafeValue::suppressed(reason))
            } else if share > config.dominance_threshold {
                let reason = "Most frequent value dominates the column";
                (SafeValue::suppressed(reason), SafeValue::suppressed(reason))
            } else if count - *freq < config.unit_threshold {
                // count - freq is the size of the remaining groups
                let reason = "Remaining values have a small count";
                (SafeValue::suppressed(reason), SafeValue::suppressed(reason))
            } else {
                let top = top
                    .clone()
                    .map_or_else(|| SafeValue::suppressed("Not defined"), SafeValue::Label);
                (top, SafeValue::Integer(*freq as i64))
            };
            vec![
                ("count", SafeValue::Integer(count as i64)),
                ("unique", SafeValue::Integer(*unique as i64)),
                ("top", top),
                ("freq", freq),
            ]
        }
    };

    ProtectedSummary::Shown {
        statistics: statistics
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    }
}
