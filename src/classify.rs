use serde::Serialize;

use crate::types::{Column, StorageType};

/// How a column's values are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Countable categories, one group per distinct value
    Discrete,
    /// Measured quantities, binned into intervals
    Continuous,
    /// Neither; cannot be grouped
    Unsupported,
}

impl ColumnKind {
    pub fn of(storage: StorageType) -> Self {
        if is_discrete(storage) {
            ColumnKind::Discrete
        } else if is_continuous(storage) {
            ColumnKind::Continuous
        } else {
            ColumnKind::Unsupported
        }
    }
}

/// Booleans, categories and timestamps are counted per value
pub fn is_discrete(storage: StorageType) -> bool {
    matches!(
        storage,
        StorageType::Boolean | StorageType::Category | StorageType::Datetime
    )
}

/// Numeric storage other than boolean
pub fn is_continuous(storage: StorageType) -> bool {
    matches!(storage, StorageType::Integer | StorageType::Float)
}

/// Classify a column once; the result is threaded through grouping and plotting
pub fn classify(column: &Column) -> ColumnKind {
    ColumnKind::of(column.storage_type())
}
