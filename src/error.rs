use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Config and file mismatch: {0}")]
    ConfigAndFileMismatch(String),

    #[error("Columns do not match variable types (missing from table: {missing:?}, not declared: {unexpected:?})")]
    ColumnMismatch {
        /// Declared in the variable types but absent from the table
        missing: Vec<String>,
        /// Present in the table but not declared
        unexpected: Vec<String>,
    },

    #[error("Identifier column '{0}' not found in table")]
    MissingIdentifier(String),

    #[error("Cannot coerce column '{column}': {reason}")]
    TypeCoercion { column: String, reason: String },

    #[error("Column '{column}' has unsupported storage type {storage}; it is neither discrete nor continuous")]
    UnsupportedColumnType { column: String, storage: String },

    #[error("Column '{column}' is {found}, but {expected} grouping was requested")]
    GroupingTypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
