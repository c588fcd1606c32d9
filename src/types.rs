use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Cells with a count below this are redacted
pub const DEFAULT_UNIT_THRESHOLD: u64 = 10;

/// Cells holding more than this share of the column total are redacted
pub const DEFAULT_DOMINANCE_THRESHOLD: f64 = 0.9;

/// Name of the subject-identifier column, never reported on
pub const DEFAULT_ID_COLUMN: &str = "patient_id";

/// Directory that receives generated reports when none is configured
pub const DEFAULT_OUTPUT_PATH: &str = "cohort_reports_outputs/";

/// A value that is safe to display (privacy-preserving)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum SafeValue {
    Integer(i64),
    Float(f64),
    Label(String),
    Suppressed { reason: String },
}

impl SafeValue {
    pub fn suppressed(reason: &str) -> Self {
        SafeValue::Suppressed {
            reason: reason.to_string(),
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, SafeValue::Suppressed { .. })
    }
}

impl fmt::Display for SafeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafeValue::Integer(i) => write!(f, "{}", i),
            SafeValue::Float(x) => write!(f, "{:.4}", x),
            SafeValue::Label(s) => write!(f, "{}", s),
            SafeValue::Suppressed { .. } => write!(f, "[redacted]"),
        }
    }
}

/// Semantic type a user declares for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Binary,
    Categorical,
    Date,
    Int,
    Float,
}

impl VariableType {
    /// Internal storage used for each declared type
    pub fn storage_type(self) -> StorageType {
        match self {
            VariableType::Binary => StorageType::Integer,
            VariableType::Categorical => StorageType::Category,
            VariableType::Date => StorageType::Category,
            VariableType::Int => StorageType::Integer,
            VariableType::Float => StorageType::Float,
        }
    }
}

impl FromStr for VariableType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "binary" => Ok(VariableType::Binary),
            "categorical" => Ok(VariableType::Categorical),
            "date" => Ok(VariableType::Date),
            "int" => Ok(VariableType::Int),
            "float" => Ok(VariableType::Float),
            other => Err(format!("unknown variable type '{}'", other)),
        }
    }
}

/// Physical representation of a column's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Boolean,
    Integer,
    Float,
    Category,
    Datetime,
    Text,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageType::Boolean => "boolean",
            StorageType::Integer => "integer",
            StorageType::Float => "float",
            StorageType::Category => "category",
            StorageType::Datetime => "datetime",
            StorageType::Text => "text",
        };
        f.write_str(name)
    }
}

/// Column values; `None` marks a missing cell
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Boolean(Vec<Option<bool>>),
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Category(Vec<Option<String>>),
    Datetime(Vec<Option<NaiveDateTime>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn storage_type(&self) -> StorageType {
        match self {
            ColumnData::Boolean(_) => StorageType::Boolean,
            ColumnData::Integer(_) => StorageType::Integer,
            ColumnData::Float(_) => StorageType::Float,
            ColumnData::Category(_) => StorageType::Category,
            ColumnData::Datetime(_) => StorageType::Datetime,
            ColumnData::Text(_) => StorageType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Category(v) | ColumnData::Text(v) => v.len(),
            ColumnData::Datetime(v) => v.len(),
        }
    }

    /// Per-row display labels, `None` for missing cells
    pub fn labels(&self) -> Vec<Option<String>> {
        match self {
            ColumnData::Boolean(v) => v
                .iter()
                .map(|b| b.map(|b| if b { "True" } else { "False" }.to_string()))
                .collect(),
            ColumnData::Integer(v) => v.iter().map(|i| i.map(|i| i.to_string())).collect(),
            ColumnData::Float(v) => v.iter().map(|x| x.map(|x| x.to_string())).collect(),
            ColumnData::Category(v) | ColumnData::Text(v) => v.clone(),
            ColumnData::Datetime(v) => v
                .iter()
                .map(|d| d.map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()))
                .collect(),
        }
    }

    /// Non-missing values as floats, for numeric storage only
    pub fn numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            ColumnData::Integer(v) => Some(v.iter().flatten().map(|&i| i as f64).collect()),
            ColumnData::Float(v) => Some(v.iter().flatten().copied().filter(|x| !x.is_nan()).collect()),
            _ => None,
        }
    }
}

/// A named column of uniformly stored values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: &str, data: ColumnData) -> Self {
        Self {
            name: name.to_string(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn storage_type(&self) -> StorageType {
        self.data.storage_type()
    }
}

/// A cohort table: one row per subject
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }
}

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Csv,
    CsvGz,
    Tsv,
    Excel,
    Feather,
}

impl FileFormat {
    /// Detect the format from the full suffix chain of a file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".csv.gz") {
            return Some(FileFormat::CsvGz);
        }
        let ext = lower.rsplit_once('.').map(|(_, ext)| ext)?;
        match ext {
            "csv" => Some(FileFormat::Csv),
            "tsv" | "tab" => Some(FileFormat::Tsv),
            "xlsx" | "xls" | "xlsm" | "xlsb" => Some(FileFormat::Excel),
            "feather" => Some(FileFormat::Feather),
            _ => None,
        }
    }

    /// Whether the format carries per-column type information
    pub fn is_typed(self) -> bool {
        matches!(self, FileFormat::Excel | FileFormat::Feather)
    }
}

/// Result type for the application
pub type Result<T> = std::result::Result<T, crate::error::Error>;
