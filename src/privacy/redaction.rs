use serde::Serialize;

use crate::config::RedactionConfig;
use crate::grouping::{FrequencyTable, GroupLabel};

/// Frequency table after redaction; `None` marks a masked count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedactedFrequencyTable {
    pub entries: Vec<(GroupLabel, Option<u64>)>,
}

impl RedactedFrequencyTable {
    pub fn labels(&self) -> impl Iterator<Item = &GroupLabel> {
        self.entries.iter().map(|(label, _)| label)
    }

    pub fn redacted_count(&self) -> usize {
        self.entries.iter().filter(|(_, n)| n.is_none()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every group holds numeric intervals
    pub fn is_interval_table(&self) -> bool {
        !self.entries.is_empty() && self.labels().all(GroupLabel::is_interval)
    }

    #[cfg(test)]
    pub fn value_of(&self, label: &str) -> Option<Option<u64>> {
        self.entries
            .iter()
            .find(|(l, _)| l.to_string() == label)
            .map(|(_, n)| *n)
    }
}

/// Cells whose count is strictly below `threshold`
pub fn unit_mask(table: &FrequencyTable, threshold: u64) -> Vec<bool> {
    table.entries.iter().map(|(_, n)| *n < threshold).collect()
}

/// Cells holding more than `threshold` of the table total
pub fn distribution_mask(table: &FrequencyTable, threshold: f64) -> Vec<bool> {
    let total = table.total();
    table
        .entries
        .iter()
        .map(|(_, n)| total > 0 && (*n as f64 / total as f64) > threshold)
        .collect()
}

/// Mask every cell that fails either the unit or the distribution rule
pub fn redact(table: &FrequencyTable, config: &RedactionConfig) -> RedactedFrequencyTable {
    let unit = unit_mask(table, config.unit_threshold);
    let distribution = distribution_mask(table, config.dominance_threshold);

    let entries = table
        .entries
        .iter()
        .zip(unit.iter().zip(distribution.iter()))
        .map(|((label, n), (small, dominant))| {
            let value = if *small || *dominant { None } else { Some(*n) };
            (label.clone(), value)
        })
        .collect();

    RedactedFrequencyTable { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cells: &[(&str, u64)]) -> FrequencyTable {
        FrequencyTable::new(
            cells
                .iter()
                .map(|(label, n)| {
                    (
                        GroupLabel::Value {
                            value: label.to_string(),
                        },
                        *n,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_unit_and_dominance_example() {
        let t = table(&[("0", 10), ("16-29", 9), ("30-39", 172)]);
        let redacted = redact(&t, &RedactionConfig::default());

        assert_eq!(redacted.value_of("0"), Some(Some(10)));
        assert_eq!(redacted.value_of("16-29"), Some(None));
        assert_eq!(redacted.value_of("30-39"), Some(None));
    }

    #[test]
    fn test_boolean_scenario_masks() {
        let t = table(&[("False", 1), ("True", 19)]);

        assert_eq!(unit_mask(&t, 10), vec![true, false]);
        assert_eq!(distribution_mask(&t, 0.9), vec![false, true]);

        let redacted = redact(&t, &RedactionConfig::default());
        assert_eq!(redacted.redacted_count(), 2);
    }

    #[test]
    fn test_threshold_boundaries() {
        // Exactly at the unit threshold and exactly at the dominance share both survive
        let t = table(&[("a", 10), ("b", 90)]);
        let config = RedactionConfig {
            unit_threshold: 10,
            dominance_threshold: 0.9,
        };
        let redacted = redact(&t, &config);
        assert_eq!(redacted.value_of("a"), Some(Some(10)));
        assert_eq!(redacted.value_of("b"), Some(Some(90)));
    }

    #[test]
    fn test_overridden_thresholds() {
        let t = table(&[("a", 7), ("b", 12), ("c", 81)]);
        let config = RedactionConfig {
            unit_threshold: 6,
            dominance_threshold: 0.8,
        };
        let redacted = redact(&t, &config);
        assert_eq!(redacted.value_of("a"), Some(Some(7)));
        assert_eq!(redacted.value_of("b"), Some(Some(12)));
        assert_eq!(redacted.value_of("c"), Some(None));
    }

    #[test]
    fn test_redaction_soundness() {
        let t = table(&[("a", 0), ("b", 3), ("c", 40), ("d", 55), ("e", 9), ("f", 11)]);
        let config = RedactionConfig::default();
        let total = t.total() as f64;
        let redacted = redact(&t, &config);

        for ((label, before), (after_label, after)) in t.entries.iter().zip(&redacted.entries) {
            assert_eq!(label, after_label);
            let must_mask = *before < 10 || (*before as f64 / total) > 0.9;
            if must_mask {
                assert_eq!(*after, None, "{} should be redacted", label);
            } else {
                assert_eq!(*after, Some(*before), "{} should be kept", label);
            }
        }
    }

    #[test]
    fn test_shape_preserved() {
        let t = table(&[("x", 1), ("y", 50), ("z", 50)]);
        let redacted = redact(&t, &RedactionConfig::default());
        let before: Vec<_> = t.labels().cloned().collect();
        let after: Vec<_> = redacted.labels().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_empty_table() {
        let redacted = redact(&FrequencyTable::default(), &RedactionConfig::default());
        assert!(redacted.is_empty());
        assert!(!redacted.is_interval_table());
    }

    #[test]
    fn test_all_zero_counts_do_not_divide_by_zero() {
        let t = table(&[("a", 0)]);
        assert_eq!(distribution_mask(&t, 0.9), vec![false]);
        assert_eq!(unit_mask(&t, 10), vec![true]);
    }
}
