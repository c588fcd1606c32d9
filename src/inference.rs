use crate::types::StorageType;

/// Boolean tokens accepted for binary variables (case-insensitive)
const TRUE_TOKENS: &[&str] = &["true", "yes", "y", "t"];
const FALSE_TOKENS: &[&str] = &["false", "no", "n", "f"];

/// Missing value tokens (the default NA set of common dataframe loaders)
pub const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Check if a raw cell represents a missing value
pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    MISSING_TOKENS.contains(&trimmed)
}

/// Parse an integer, accepting integral floats such as "3.0"
pub fn parse_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(i);
    }
    let x = trimmed.parse::<f64>().ok()?;
    if x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
        Some(x as i64)
    } else {
        None
    }
}

/// Parse a finite floating point value
pub fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Parse a binary value into 0 or 1
pub fn parse_binary(value: &str) -> Option<i64> {
    let lower = value.trim().to_lowercase();
    if TRUE_TOKENS.contains(&lower.as_str()) {
        return Some(1);
    }
    if FALSE_TOKENS.contains(&lower.as_str()) {
        return Some(0);
    }
    match parse_integer(&lower) {
        Some(i @ (0 | 1)) => Some(i),
        _ => None,
    }
}

/// Native kind of a spreadsheet cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Bool,
    Int,
    /// Float cell; the flag records whether it holds an integral value
    Float(bool),
    DateTime,
    Text,
}

/// Storage inference for natively typed columns
#[derive(Debug, Clone, Default)]
pub struct StorageInferencer {
    seen: u64,
    bools: u64,
    ints: u64,
    floats: u64,
    datetimes: u64,
}

impl StorageInferencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the kind of one cell
    pub fn observe(&mut self, kind: CellKind) {
        match kind {
            CellKind::Empty => return,
            CellKind::Bool => self.bools += 1,
            CellKind::Int | CellKind::Float(true) => self.ints += 1,
            CellKind::Float(false) => self.floats += 1,
            CellKind::DateTime => self.datetimes += 1,
            CellKind::Text => {}
        }
        self.seen += 1;
    }

    /// Most specific storage type that holds every observed cell
    pub fn inferred_type(&self) -> StorageType {
        if self.seen == 0 {
            // An all-empty column loads as missing floats
            StorageType::Float
        } else if self.bools == self.seen {
            StorageType::Boolean
        } else if self.ints == self.seen {
            StorageType::Integer
        } else if self.ints + self.floats == self.seen {
            StorageType::Float
        } else if self.datetimes == self.seen {
            StorageType::Datetime
        } else {
            StorageType::Text
        }
    }
}
