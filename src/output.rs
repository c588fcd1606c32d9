use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use crate::privacy::ProtectedSummary;
use crate::report::{CohortReport, ColumnReport};
use crate::types::Result;

const STYLE: &str = r#"<style>
  table { text-align: left; position: relative; border-collapse: collapse; }
  td, th { padding: 8px; margin: 2px; }
  td { border-left: solid 1px black; }
  tr:nth-child(even) { background: #EEE; }
  tr:nth-child(odd) { background: #FFF; }
  .suppressed { color: #777; font-style: italic; }
</style>"#;

/// Escape text for inclusion in HTML or SVG markup
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn summary_html(summary: &ProtectedSummary) -> String {
    match summary {
        ProtectedSummary::Suppressed { reason } => format!(
            r#"<p class="suppressed">Outputs suppressed: {}</p>"#,
            escape_html(reason)
        ),
        ProtectedSummary::Shown { statistics } => {
            let mut html = String::from("<table>");
            for (name, value) in statistics {
                let cell = if value.is_suppressed() {
                    r#"<td class="suppressed">redacted</td>"#.to_string()
                } else {
                    format!("<td>{}</td>", escape_html(&value.to_string()))
                };
                let _ = write!(html, "<tr><th>{}</th>{}</tr>", escape_html(name), cell);
            }
            html.push_str("</table>");
            html
        }
    }
}

fn column_html(column: &ColumnReport) -> String {
    format!(
        "<section><h2>{}</h2>{}<div>{}</div></section>\n",
        escape_html(&column.name),
        summary_html(&column.summary),
        column.chart
    )
}

/// Render the full HTML document for a report
pub fn to_html_string(report: &CohortReport) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Cohort report: {name}</title>\n{style}\n</head>\n<body>\n<h1>Cohort report: {name}</h1>\n",
        name = escape_html(&report.file_name),
        style = STYLE
    );
    for column in &report.columns {
        html.push_str(&column_html(column));
    }
    html.push_str("</body>\n</html>\n");
    html
}

/// Write the HTML report to a file
pub fn write_html_report(report: &CohortReport, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    writer.write_all(to_html_string(report).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Write the report to a JSON file
pub fn write_json_report(report: &CohortReport, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}
