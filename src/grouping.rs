//! Reduction of a column to a frequency table.
//!
//! Discrete columns are counted per distinct value, with missing cells kept as
//! their own group. Continuous columns are binned over their non-missing values
//! into a contiguous partition `[e0, e1), [e1, e2), ..., [e(n-1), en]`.

use std::fmt;

use log::debug;
use serde::Serialize;

use crate::classify::{classify, ColumnKind};
use crate::config::{BinningConfig, BinningStrategy};
use crate::error::Error;
use crate::stats::{quantile, sorted, ValueCounter};
use crate::types::{Column, Result};

/// Label of one frequency-table group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupLabel {
    Value { value: String },
    Missing,
    /// `[lower, upper)`, or `[lower, upper]` when `closed_right`
    Interval {
        lower: f64,
        upper: f64,
        closed_right: bool,
    },
}

impl GroupLabel {
    pub fn is_interval(&self) -> bool {
        matches!(self, GroupLabel::Interval { .. })
    }
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupLabel::Value { value } => f.write_str(value),
            GroupLabel::Missing => f.write_str("missing"),
            GroupLabel::Interval {
                lower,
                upper,
                closed_right,
            } => {
                let close = if *closed_right { ']' } else { ')' };
                write!(f, "[{}, {}{}", format_edge(*lower), format_edge(*upper), close)
            }
        }
    }
}

fn format_edge(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("{}", x)
    } else {
        let s = format!("{:.3}", x);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Ordered mapping from group label to count
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrequencyTable {
    pub entries: Vec<(GroupLabel, u64)>,
}

impl FrequencyTable {
    pub fn new(entries: Vec<(GroupLabel, u64)>) -> Self {
        Self { entries }
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn labels(&self) -> impl Iterator<Item = &GroupLabel> {
        self.entries.iter().map(|(label, _)| label)
    }

    #[cfg(test)]
    pub fn count_of(&self, label: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(l, _)| l.to_string() == label)
            .map(|(_, n)| *n)
    }
}

fn kind_name(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Discrete => "discrete",
        ColumnKind::Continuous => "continuous",
        ColumnKind::Unsupported => "unsupported",
    }
}

fn require_kind(column: &Column, expected: ColumnKind) -> Result<()> {
    let found = classify(column);
    if found == expected {
        Ok(())
    } else {
        Err(Error::GroupingTypeMismatch {
            column: column.name.clone(),
            expected: kind_name(expected).to_string(),
            found: kind_name(found).to_string(),
        })
    }
}

/// Group a column according to its classification
pub fn group(column: &Column, kind: ColumnKind, binning: &BinningConfig) -> Result<FrequencyTable> {
    match kind {
        ColumnKind::Discrete => group_discrete(column),
        ColumnKind::Continuous => group_continuous(column, binning),
        ColumnKind::Unsupported => Err(Error::UnsupportedColumnType {
            column: column.name.clone(),
            storage: column.storage_type().to_string(),
        }),
    }
}

/// Count occurrences of each distinct value, missing included
pub fn group_discrete(column: &Column) -> Result<FrequencyTable> {
    require_kind(column, ColumnKind::Discrete)?;

    let counter: ValueCounter = column.data.labels().into_iter().collect();
    let entries = counter
        .most_common()
        .into_iter()
        .map(|(value, n)| {
            let label = match value {
                Some(value) => GroupLabel::Value { value },
                None => GroupLabel::Missing,
            };
            (label, n)
        })
        .collect();

    Ok(FrequencyTable::new(entries))
}

/// Histogram of the non-missing values
pub fn group_continuous(column: &Column, binning: &BinningConfig) -> Result<FrequencyTable> {
    require_kind(column, ColumnKind::Continuous)?;

    let values = sorted(&column.data.numeric_values().unwrap_or_default());
    if values.is_empty() {
        return Ok(FrequencyTable::default());
    }

    let edges = bin_edges(&values, binning.strategy);
    let counts = bin_counts(&values, &edges);
    debug!("column '{}' binned into {} bins", column.name, counts.len());

    let last = counts.len() - 1;
    let entries = counts
        .into_iter()
        .enumerate()
        .map(|(i, n)| {
            let label = GroupLabel::Interval {
                lower: edges[i],
                upper: edges[i + 1],
                closed_right: i == last,
            };
            (label, n)
        })
        .collect();

    Ok(FrequencyTable::new(entries))
}

/// Upper limit on the number of histogram bins
pub const MAX_BINS: usize = 1000;

/// Bin edges for sorted, non-empty, finite data. Edges are strictly increasing
/// and there are never more bins than values (or `MAX_BINS`).
pub fn bin_edges(sorted: &[f64], strategy: BinningStrategy) -> Vec<f64> {
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    if min == max {
        return vec![min - 0.5, max + 0.5];
    }

    let range = max - min;
    let n = sorted.len() as f64;
    let sturges = range / (n.log2() + 1.0);
    let iqr = quantile(sorted, 0.75).unwrap_or(max) - quantile(sorted, 0.25).unwrap_or(min);
    let fd = 2.0 * iqr * n.powf(-1.0 / 3.0);

    let width = match strategy {
        BinningStrategy::Sturges => sturges,
        BinningStrategy::Fd => fd,
        BinningStrategy::Auto if fd > 0.0 => fd.min(sturges),
        BinningStrategy::Auto => sturges,
    };

    let cap = sorted.len().min(MAX_BINS) as f64;
    let bin_count = |width: f64| if width > 0.0 { (range / width).ceil() } else { 1.0 };
    let mut bins = bin_count(width);
    if bins > cap {
        debug!("{} bins requested for {} values, using Sturges", bins, sorted.len());
        bins = bin_count(sturges);
    }
    let bins = if bins.is_finite() { bins.clamp(1.0, cap) as usize } else { 1 };

    // Interior edges that round onto their neighbour are dropped
    let mut edges: Vec<f64> = Vec::with_capacity(bins + 1);
    edges.push(min);
    for i in 1..bins {
        let edge = min + range * (i as f64) / (bins as f64);
        if edge < max && edges.last().map_or(true, |&prev| edge > prev) {
            edges.push(edge);
        }
    }
    edges.push(max);
    edges
}

/// Count values per bin; the last bin includes its upper edge
pub fn bin_counts(values: &[f64], edges: &[f64]) -> Vec<u64> {
    let bins = edges.len() - 1;
    let first = edges[0];
    let last = edges[bins];
    let mut counts = vec![0u64; bins];

    for &v in values {
        if v < first || v > last {
            continue;
        }
        let idx = edges.partition_point(|&edge| edge <= v).saturating_sub(1).min(bins - 1);
        counts[idx] += 1;
    }

    counts
}
