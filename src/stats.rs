use std::collections::HashMap;

use serde::Serialize;

use crate::types::{Column, ColumnData};

/// Welford's online algorithm for computing mean and variance
#[derive(Debug, Clone)]
pub struct WelfordStats {
    count: u64,
    mean: f64,
    m2: f64, // Sum of squares of differences from current mean
}

impl WelfordStats {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Add a new value to the running statistics
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.mean)
        } else {
            None
        }
    }

    /// Sample variance (n - 1 denominator)
    pub fn variance(&self) -> Option<f64> {
        if self.count > 1 {
            Some(self.m2 / (self.count - 1) as f64)
        } else {
            None
        }
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(|v| v.sqrt())
    }
}

impl Default for WelfordStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Quantile of sorted data by linear interpolation between closest ranks
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Sort values ascending; NaN must already be filtered out
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Occurrence counts keyed by label, remembering first-appearance order
#[derive(Debug, Clone, Default)]
pub struct ValueCounter {
    order: Vec<Option<String>>,
    counts: HashMap<Option<String>, u64>,
}

impl ValueCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one cell; `None` is the missing group
    pub fn add(&mut self, value: Option<String>) {
        match self.counts.get_mut(&value) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(value.clone(), 1);
                self.order.push(value);
            }
        }
    }

    pub fn unique_count(&self) -> usize {
        self.order.len()
    }

    /// Groups by descending count; ties keep first-appearance order
    pub fn most_common(&self) -> Vec<(Option<String>, u64)> {
        let mut groups: Vec<(Option<String>, u64)> = self
            .order
            .iter()
            .map(|v| (v.clone(), self.counts[v]))
            .collect();
        groups.sort_by(|a, b| b.1.cmp(&a.1));
        groups
    }

    #[cfg(test)]
    pub fn get_count(&self, value: Option<&str>) -> u64 {
        self.counts
            .get(&value.map(str::to_string))
            .copied()
            .unwrap_or(0)
    }
}

impl FromIterator<Option<String>> for ValueCounter {
    fn from_iter<I: IntoIterator<Item = Option<String>>>(iter: I) -> Self {
        let mut counter = ValueCounter::new();
        for value in iter {
            counter.add(value);
        }
        counter
    }
}

/// Describe-style statistics for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SummaryStatistics {
    Numeric {
        count: u64,
        mean: Option<f64>,
        std: Option<f64>,
        min: Option<f64>,
        q25: Option<f64>,
        q50: Option<f64>,
        q75: Option<f64>,
        max: Option<f64>,
    },
    Categorical {
        count: u64,
        unique: u64,
        top: Option<String>,
        freq: u64,
    },
}

impl SummaryStatistics {
    /// Number of non-missing values described
    pub fn count(&self) -> u64 {
        match self {
            SummaryStatistics::Numeric { count, .. } | SummaryStatistics::Categorical { count, .. } => {
                *count
            }
        }
    }
}

/// Summarize a column. Missing values are excluded from every statistic.
pub fn summarize(column: &Column) -> SummaryStatistics {
    match &column.data {
        ColumnData::Integer(_) | ColumnData::Float(_) => {
            let values = column.data.numeric_values().unwrap_or_default();
            describe_numeric(&values)
        }
        data => describe_categorical(data.labels()),
    }
}

fn describe_numeric(values: &[f64]) -> SummaryStatistics {
    let mut welford = WelfordStats::new();
    for &v in values {
        welford.update(v);
    }
    let sorted = sorted(values);

    SummaryStatistics::Numeric {
        count: welford.count(),
        mean: welford.mean(),
        std: welford.std_dev(),
        min: sorted.first().copied(),
        q25: quantile(&sorted, 0.25),
        q50: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

fn describe_categorical(labels: Vec<Option<String>>) -> SummaryStatistics {
    let counter: ValueCounter = labels.into_iter().filter(Option::is_some).collect();
    let groups = counter.most_common();
    let top = groups.first().cloned();

    SummaryStatistics::Categorical {
        count: groups.iter().map(|(_, n)| n).sum(),
        unique: counter.unique_count() as u64,
        freq: top.as_ref().map_or(0, |(_, n)| *n),
        top: top.and_then(|(label, _)| label),
    }
}
