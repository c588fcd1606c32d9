use clap::Parser;
use std::path::PathBuf;

use log::info;

use crate::config::ReportConfig;
use crate::report::{self, ReportOutcome};
use crate::types::Result;

/// Disclosure-controlled descriptive reports for cohort extracts
#[derive(Parser, Debug)]
#[command(name = "cohort-report")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Report configuration, as a JSON file path or an inline JSON string
    #[arg(short, long)]
    pub config: Option<String>,

    /// Also write a machine-readable JSON report next to the HTML
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Cohort files to report on
    #[arg(required = true)]
    pub input_files: Vec<PathBuf>,
}

impl Cli {
    /// Resolve the report configuration, falling back to defaults
    pub fn report_config(&self) -> Result<ReportConfig> {
        match &self.config {
            Some(config) => ReportConfig::load(config),
            None => Ok(ReportConfig::default()),
        }
    }
}

/// Generate one report per input file, stopping at the first failure.
/// `on_report` is called as soon as each report has been written.
pub fn run(
    cli: &Cli,
    mut on_report: impl FnMut(&ReportOutcome),
) -> Result<Vec<ReportOutcome>> {
    let config = cli.report_config()?;
    info!("writing reports to {}", config.output_path.display());

    let mut outcomes = Vec::with_capacity(cli.input_files.len());
    for input in &cli.input_files {
        let outcome = report::make_report(input, &config, cli.json)?;
        on_report(&outcome);
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Progress lines for a written report
pub fn announce(outcome: &ReportOutcome) {
    eprintln!("Created cohort report at {}", outcome.html_path.display());
    if let Some(json_path) = &outcome.json_path {
        eprintln!("JSON report written to: {}", json_path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "cohort-report",
            "--config",
            r#"{"output_path": "out"}"#,
            "--json",
            "a.csv",
            "b.xlsx",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.input_files.len(), 2);
        let config = cli.report_config().unwrap();
        assert_eq!(config.output_path, PathBuf::from("out"));
    }

    #[test]
    fn test_input_files_required() {
        assert!(Cli::try_parse_from(["cohort-report"]).is_err());
    }

    #[test]
    fn test_default_config() {
        let cli = Cli::try_parse_from(["cohort-report", "a.csv"]).unwrap();
        assert_eq!(cli.report_config().unwrap(), ReportConfig::default());
    }

    fn ages_csv() -> NamedTempFile {
        let mut input = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(input, "patient_id,age").unwrap();
        for i in 0..30 {
            writeln!(input, "{},{}", i, 20 + i % 7).unwrap();
        }
        input
    }

    fn ages_config(out_dir: &std::path::Path) -> String {
        format!(
            r#"{{"output_path": {:?}, "variable_types": {{"age": "int"}}}}"#,
            out_dir.display().to_string()
        )
    }

    #[test]
    fn test_run_reports_each_file() {
        let out_dir = tempdir().unwrap();
        let input = ages_csv();
        let cli = Cli {
            config: Some(ages_config(out_dir.path())),
            json: false,
            input_files: vec![input.path().to_path_buf()],
        };

        let outcomes = run(&cli, |_| {}).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].html_path.exists());
        assert!(outcomes[0].json_path.is_none());
    }

    #[test]
    fn test_written_reports_announced_before_failure() {
        let out_dir = tempdir().unwrap();
        let input = ages_csv();
        let cli = Cli {
            config: Some(ages_config(out_dir.path())),
            json: false,
            input_files: vec![input.path().to_path_buf(), PathBuf::from("cohort.dta")],
        };

        let mut announced = Vec::new();
        let result = run(&cli, |outcome| announced.push(outcome.html_path.clone()));

        assert!(matches!(result, Err(Error::Import(_))));
        assert_eq!(announced.len(), 1);
        assert!(announced[0].exists());
    }

    #[test]
    fn test_run_stops_at_unsupported_file() {
        let out_dir = tempdir().unwrap();
        let config = format!(r#"{{"output_path": {:?}}}"#, out_dir.path().display().to_string());
        let cli = Cli {
            config: Some(config),
            json: false,
            input_files: vec![PathBuf::from("cohort.dta")],
        };

        assert!(matches!(run(&cli, |_| {}), Err(Error::Import(_))));
    }
}
