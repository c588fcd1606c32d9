use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::classify::{classify, ColumnKind};
use crate::coercion::{coerce_table, promote_binary};
use crate::config::ReportConfig;
use crate::error::Error;
use crate::grouping::group;
use crate::output;
use crate::plot::{ChartKind, ChartRenderer, ChartSpec, SvgRenderer};
use crate::privacy::{protect_summary, redact, ProtectedSummary, RedactedFrequencyTable};
use crate::readers::{create_reader, detect_format};
use crate::stats::summarize;
use crate::types::{FileFormat, Result, StorageType, Table};

/// Report for one column
#[derive(Debug, Clone, Serialize)]
pub struct ColumnReport {
    pub name: String,
    pub storage: StorageType,
    pub kind: ColumnKind,
    pub summary: ProtectedSummary,
    pub frequencies: RedactedFrequencyTable,
    pub chart_kind: ChartKind,
    /// Rendered chart markup
    #[serde(skip)]
    pub chart: String,
}

/// Report for one input file
#[derive(Debug, Clone, Serialize)]
pub struct CohortReport {
    pub version: String,
    pub file_name: String,
    /// Input file hash (SHA-256)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FileFormat>,
    pub row_count: usize,
    pub columns: Vec<ColumnReport>,
}

/// Files written for one input
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub html_path: PathBuf,
    pub json_path: Option<PathBuf>,
}

/// Load, coerce and report on a single cohort file
pub fn make_report(path: &Path, config: &ReportConfig, write_json: bool) -> Result<ReportOutcome> {
    let format = detect_format(path)?;
    if !format.is_typed() && config.variable_types.is_none() {
        return Err(Error::ConfigAndFileMismatch(format!(
            "{} has no type information; `variable_types` must be configured",
            path.display()
        )));
    }

    let table = create_reader(path)?.read()?;
    let table = match &config.variable_types {
        Some(variable_types) => coerce_table(&table, variable_types, &config.id_column)?,
        None => table,
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let mut report = build_report(&table, &file_name, config, &SvgRenderer::default())?;
    report.format = Some(format);
    report.file_hash = Some(compute_file_hash(path)?);

    let stem = report_stem(path);
    std::fs::create_dir_all(&config.output_path)?;

    let html_path = config.output_path.join(format!("descriptives_{}.html", stem));
    output::write_html_report(&report, &html_path)?;
    info!("wrote {}", html_path.display());

    let json_path = if write_json {
        let json_path = config.output_path.join(format!("descriptives_{}.json", stem));
        output::write_json_report(&report, &json_path)?;
        Some(json_path)
    } else {
        None
    };

    Ok(ReportOutcome {
        html_path,
        json_path,
    })
}

/// Run every non-identifier column through the grouping, redaction and summary pipeline.
/// Any failing column aborts the whole report.
pub fn build_report(
    table: &Table,
    file_name: &str,
    config: &ReportConfig,
    renderer: &dyn ChartRenderer,
) -> Result<CohortReport> {
    if table.column(&config.id_column).is_none() {
        return Err(Error::MissingIdentifier(config.id_column.clone()));
    }

    let mut columns = Vec::with_capacity(table.columns.len());
    for column in table.columns.iter().filter(|c| c.name != config.id_column) {
        let grouped_column = promote_binary(column.clone());
        let summary = summarize(&grouped_column);
        let kind = classify(&grouped_column);
        debug!("column '{}' classified as {:?}", column.name, kind);

        let frequencies = group(&grouped_column, kind, &config.binning)?;
        let redacted = redact(&frequencies, &config.redaction);
        debug!(
            "column '{}': {} of {} groups redacted",
            column.name,
            redacted.redacted_count(),
            redacted.entries.len()
        );
        let spec = ChartSpec::for_column(&column.name, &redacted);
        let chart = renderer.render(&spec)?;
        let chart_kind = spec.kind;

        columns.push(ColumnReport {
            name: column.name.clone(),
            storage: grouped_column.storage_type(),
            kind,
            summary: protect_summary(&summary, &config.redaction),
            frequencies: redacted,
            chart_kind,
            chart,
        });
    }

    Ok(CohortReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        file_name: file_name.to_string(),
        file_hash: None,
        format: None,
        row_count: table.row_count(),
        columns,
    })
}

/// File name without its format suffix (including a trailing `.gz`)
fn report_stem(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown");
    let name = name.strip_suffix(".gz").unwrap_or(name);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

/// Compute SHA-256 hash of a file (streaming to handle large files)
fn compute_file_hash(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let result = hasher.finalize();
    Ok(format!("{:x}", result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, ColumnData, SafeValue};
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn cohort_csv(rows: usize) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "patient_id,sex,age_band,has_copd,bmi").unwrap();
        for i in 0..rows {
            let sex = if i % 2 == 0 { "M" } else { "F" };
            let band = if i % 3 == 0 { "16-29" } else { "30-39" };
            let copd = if i % 4 == 0 { 1 } else { 0 };
            let bmi = 18.0 + (i % 17) as f64 * 0.75;
            writeln!(file, "{},{},{},{},{}", i, sex, band, copd, bmi).unwrap();
        }
        file
    }

    fn variable_types() -> BTreeMap<String, String> {
        [
            ("sex", "categorical"),
            ("age_band", "categorical"),
            ("has_copd", "binary"),
            ("bmi", "float"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_make_report() {
        let input = cohort_csv(120);
        let out_dir = tempdir().unwrap();
        let config = ReportConfig {
            output_path: out_dir.path().to_path_buf(),
            variable_types: Some(variable_types()),
            ..ReportConfig::default()
        };

        let outcome = make_report(input.path(), &config, true).unwrap();

        assert!(outcome.html_path.exists());
        let stem = report_stem(input.path());
        assert_eq!(
            outcome.html_path.file_name().unwrap().to_str().unwrap(),
            format!("descriptives_{}.html", stem)
        );
        let json = std::fs::read_to_string(outcome.json_path.unwrap()).unwrap();
        assert!(json.contains("\"file_hash\""));
        assert!(json.contains("\"has_copd\""));
    }

    #[test]
    fn test_feather_needs_no_variable_types() {
        use arrow::array::{ArrayRef, DictionaryArray, Float64Array, Int64Array};
        use arrow::datatypes::{DataType, Field, Int8Type, Schema};
        use arrow::ipc::writer::FileWriter;
        use arrow::record_batch::RecordBatch;
        use std::sync::Arc;

        let schema = Arc::new(Schema::new(vec![
            Field::new("patient_id", DataType::Int64, false),
            Field::new(
                "sex",
                DataType::Dictionary(Box::new(DataType::Int8), Box::new(DataType::Utf8)),
                true,
            ),
            Field::new("bmi", DataType::Float64, true),
        ]));
        let sex: DictionaryArray<Int8Type> =
            (0..60).map(|i| Some(if i % 2 == 0 { "F" } else { "M" })).collect();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from_iter_values(0..60)) as ArrayRef,
                Arc::new(sex),
                Arc::new(Float64Array::from_iter_values((0..60).map(|i| 18.0 + i as f64 * 0.5))),
            ],
        )
        .unwrap();

        let input = NamedTempFile::with_suffix(".feather").unwrap();
        let mut writer = FileWriter::try_new(File::create(input.path()).unwrap(), &schema).unwrap();
        writer.write(&batch).unwrap();
        writer.finish().unwrap();

        let out_dir = tempdir().unwrap();
        let config = ReportConfig {
            output_path: out_dir.path().to_path_buf(),
            ..ReportConfig::default()
        };
        let outcome = make_report(input.path(), &config, false).unwrap();
        let html = std::fs::read_to_string(outcome.html_path).unwrap();
        assert!(html.contains("Bar chart showing counts of sex"));
        assert!(html.contains("Histogram showing distribution of bmi"));
    }

    #[test]
    fn test_csv_requires_variable_types() {
        let input = cohort_csv(5);
        let result = make_report(input.path(), &ReportConfig::default(), false);
        assert!(matches!(result, Err(Error::ConfigAndFileMismatch(_))));
    }

    #[test]
    fn test_mismatched_config_aborts_before_output() {
        let input = cohort_csv(20);
        let out_dir = tempdir().unwrap();
        let mut declared = variable_types();
        declared.remove("bmi");
        let config = ReportConfig {
            output_path: out_dir.path().join("reports"),
            variable_types: Some(declared),
            ..ReportConfig::default()
        };

        let result = make_report(input.path(), &config, false);
        assert!(matches!(result, Err(Error::ColumnMismatch { .. })));
        assert!(!config.output_path.exists());
    }

    #[test]
    fn test_build_report_column_kinds() {
        let input = cohort_csv(120);
        let table = create_reader(input.path()).unwrap().read().unwrap();
        let table = coerce_table(&table, &variable_types(), "patient_id").unwrap();

        let report = build_report(&table, "input.csv", &ReportConfig::default(), &SvgRenderer::default())
            .unwrap();

        assert_eq!(report.row_count, 120);
        assert_eq!(report.columns.len(), 4);
        let by_name = |name: &str| report.columns.iter().find(|c| c.name == name).unwrap();

        assert_eq!(by_name("sex").chart_kind, ChartKind::HorizontalBar);
        assert_eq!(by_name("bmi").chart_kind, ChartKind::Histogram);
        assert_eq!(by_name("bmi").kind, ColumnKind::Continuous);
        // Binary columns are grouped as categories, not binned
        assert_eq!(by_name("has_copd").kind, ColumnKind::Discrete);
        assert_eq!(by_name("has_copd").storage, StorageType::Category);
        assert_eq!(by_name("has_copd").summary.get("count"), Some(&SafeValue::Integer(120)));
    }

    #[test]
    fn test_dominant_boolean_fully_redacted() {
        let mut flags = vec![Some(false)];
        flags.extend(std::iter::repeat(Some(true)).take(19));
        let table = Table::new(vec![
            Column::new("patient_id", ColumnData::Integer((0..20).map(Some).collect())),
            Column::new("has_condition", ColumnData::Boolean(flags)),
        ]);

        let report = build_report(&table, "t.xlsx", &ReportConfig::default(), &SvgRenderer::default())
            .unwrap();
        let column = &report.columns[0];
        assert_eq!(column.frequencies.redacted_count(), 2);
        assert!(column.chart.contains("redacted"));
    }

    #[test]
    fn test_binary_summary_does_not_reveal_redacted_counts() {
        let mut flags = vec![Some(0)];
        flags.extend(std::iter::repeat(Some(1)).take(19));
        let table = Table::new(vec![
            Column::new("patient_id", ColumnData::Integer((0..20).map(Some).collect())),
            Column::new("has_condition", ColumnData::Integer(flags)),
        ]);

        let report = build_report(&table, "t.csv", &ReportConfig::default(), &SvgRenderer::default())
            .unwrap();
        let column = &report.columns[0];
        assert_eq!(column.frequencies.redacted_count(), 2);

        // Only the column size and the number of groups may be shown
        let ProtectedSummary::Shown { statistics } = &column.summary else {
            panic!("expected a statistics block, got {:?}", column.summary);
        };
        let visible: Vec<&str> = statistics
            .iter()
            .filter(|(_, value)| !value.is_suppressed())
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(visible, vec!["count", "unique"]);
        assert!(column.summary.get("mean").is_none());
        assert!(column.summary.get("freq").unwrap().is_suppressed());
    }

    #[test]
    fn test_unsupported_column_aborts_report() {
        let table = Table::new(vec![
            Column::new("patient_id", ColumnData::Integer(vec![Some(1)])),
            Column::new("notes", ColumnData::Text(vec![Some("free text".to_string())])),
        ]);

        let result = build_report(&table, "t.xlsx", &ReportConfig::default(), &SvgRenderer::default());
        assert!(matches!(result, Err(Error::UnsupportedColumnType { .. })));
    }

    #[test]
    fn test_report_stem_strips_all_suffixes() {
        assert_eq!(report_stem(Path::new("out/input.csv.gz")), "input");
        assert_eq!(report_stem(Path::new("cohort.xlsx")), "cohort");
    }

    #[test]
    fn test_compute_file_hash() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "test content").unwrap();

        let hash = compute_file_hash(file.path()).unwrap();
        assert_eq!(hash.len(), 64); // SHA-256 produces 64 hex chars
    }
}
