use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{
    Result, DEFAULT_DOMINANCE_THRESHOLD, DEFAULT_ID_COLUMN, DEFAULT_OUTPUT_PATH,
    DEFAULT_UNIT_THRESHOLD,
};

/// Small-number and dominance thresholds applied to frequency tables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Counts strictly below this are redacted
    pub unit_threshold: u64,

    /// Counts whose share of the total exceeds this are redacted
    pub dominance_threshold: f64,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            unit_threshold: DEFAULT_UNIT_THRESHOLD,
            dominance_threshold: DEFAULT_DOMINANCE_THRESHOLD,
        }
    }
}

/// Rule used to pick the histogram bin width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinningStrategy {
    /// The narrower of Sturges and Freedman-Diaconis
    #[default]
    Auto,
    Sturges,
    /// Freedman-Diaconis
    Fd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningConfig {
    pub strategy: BinningStrategy,
}

/// Report configuration, as supplied on the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory for generated reports
    pub output_path: PathBuf,

    /// Declared semantic type per column; required for untyped formats
    pub variable_types: Option<BTreeMap<String, String>>,

    /// Subject identifier column, excluded from reporting
    pub id_column: String,

    pub redaction: RedactionConfig,

    pub binning: BinningConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            variable_types: None,
            id_column: DEFAULT_ID_COLUMN.to_string(),
            redaction: RedactionConfig::default(),
            binning: BinningConfig::default(),
        }
    }
}

impl ReportConfig {
    /// Parse a configuration from a JSON string; absent keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ReportConfig = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(format!("could not parse {}: {}", json, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file path, or treat the argument as inline JSON
    pub fn load(file_or_string: &str) -> Result<Self> {
        let path = Path::new(file_or_string);
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_json(&contents)
        } else {
            Self::from_json(file_or_string)
        }
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.redaction.dominance_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidConfig(format!(
                "dominance_threshold must be between 0 and 1, got {}",
                threshold
            )));
        }
        Ok(())
    }
}
