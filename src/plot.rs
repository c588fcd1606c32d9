use std::fmt::Write as _;

use serde::Serialize;

use crate::output::escape_html;
use crate::privacy::RedactedFrequencyTable;
use crate::types::Result;

/// Chart family for a redacted frequency table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Histogram,
    HorizontalBar,
}

/// Histogram for interval-labelled tables, horizontal bars otherwise
pub fn select_chart(table: &RedactedFrequencyTable) -> ChartKind {
    if table.is_interval_table() {
        ChartKind::Histogram
    } else {
        ChartKind::HorizontalBar
    }
}

/// Everything a renderer needs to draw one column
#[derive(Debug, Clone)]
pub struct ChartSpec<'a> {
    pub title: String,
    pub kind: ChartKind,
    pub table: &'a RedactedFrequencyTable,
}

impl<'a> ChartSpec<'a> {
    pub fn for_column(column_name: &str, table: &'a RedactedFrequencyTable) -> Self {
        let kind = select_chart(table);
        let title = match kind {
            ChartKind::Histogram => format!("Histogram showing distribution of {}", column_name),
            ChartKind::HorizontalBar => format!("Bar chart showing counts of {}", column_name),
        };
        Self { title, kind, table }
    }
}

/// Produces a displayable chart from a chart spec
pub trait ChartRenderer {
    fn render(&self, spec: &ChartSpec<'_>) -> Result<String>;
}

/// Inline SVG markup renderer
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
        }
    }
}

const MARGIN: f64 = 40.0;
const LABEL_WIDTH: f64 = 140.0;
const BAR_FILL: &str = "#4c72b0";

impl SvgRenderer {
    fn max_count(table: &RedactedFrequencyTable) -> f64 {
        table
            .entries
            .iter()
            .filter_map(|(_, n)| *n)
            .max()
            .unwrap_or(1)
            .max(1) as f64
    }

    fn histogram(&self, spec: &ChartSpec<'_>, out: &mut String) {
        let entries = &spec.table.entries;
        let plot_w = self.width as f64 - 2.0 * MARGIN;
        let plot_h = self.height as f64 - 3.0 * MARGIN;
        let bar_w = plot_w / entries.len().max(1) as f64;
        let max = Self::max_count(spec.table);
        let base = MARGIN + plot_h + MARGIN / 2.0;

        for (i, (label, count)) in entries.iter().enumerate() {
            let x = MARGIN + bar_w * i as f64;
            let label = escape_html(&label.to_string());
            match count {
                Some(n) => {
                    let h = plot_h * (*n as f64) / max;
                    let _ = write!(
                        out,
                        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {}</title></rect>"#,
                        x, base - h, bar_w, h, BAR_FILL, label, n
                    );
                }
                None => {
                    let _ = write!(
                        out,
                        r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#999" stroke-dasharray="4"><title>{}: redacted</title></rect>"##,
                        x, base - plot_h, bar_w, plot_h, label
                    );
                }
            }
            let _ = write!(
                out,
                r#"<text x="{:.1}" y="{:.1}" font-size="9" text-anchor="middle">{}</text>"#,
                x + bar_w / 2.0,
                base + 12.0,
                label
            );
        }
    }

    fn horizontal_bar(&self, spec: &ChartSpec<'_>, out: &mut String) {
        let entries = &spec.table.entries;
        let plot_w = self.width as f64 - LABEL_WIDTH - 2.0 * MARGIN;
        let plot_h = self.height as f64 - 2.0 * MARGIN;
        let row_h = plot_h / entries.len().max(1) as f64;
        let max = Self::max_count(spec.table);

        for (i, (label, count)) in entries.iter().enumerate() {
            let y = MARGIN + row_h * i as f64;
            let x = MARGIN + LABEL_WIDTH;
            let label = escape_html(&label.to_string());
            let _ = write!(
                out,
                r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{}</text>"#,
                x - 6.0,
                y + row_h / 2.0 + 4.0,
                label
            );
            match count {
                Some(n) => {
                    let w = plot_w * (*n as f64) / max;
                    let _ = write!(
                        out,
                        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/><text x="{:.1}" y="{:.1}" font-size="11">{}</text>"#,
                        x, y + row_h * 0.1, w, row_h * 0.8, BAR_FILL,
                        x + w + 4.0, y + row_h / 2.0 + 4.0, n
                    );
                }
                None => {
                    let _ = write!(
                        out,
                        r##"<text x="{:.1}" y="{:.1}" font-size="11" fill="#999">redacted</text>"##,
                        x + 4.0,
                        y + row_h / 2.0 + 4.0
                    );
                }
            }
        }
    }
}

impl ChartRenderer for SvgRenderer {
    fn render(&self, spec: &ChartSpec<'_>) -> Result<String> {
        let mut out = String::new();
        let _ = write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" role="img">"#,
            w = self.width,
            h = self.height
        );
        let _ = write!(
            out,
            r#"<text x="{:.1}" y="20" font-size="14" text-anchor="middle">{}</text>"#,
            self.width as f64 / 2.0,
            escape_html(&spec.title)
        );

        if spec.table.is_empty() {
            let _ = write!(
                out,
                r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="middle">No values to display</text>"#,
                self.width as f64 / 2.0,
                self.height as f64 / 2.0
            );
        } else {
            match spec.kind {
                ChartKind::Histogram => self.histogram(spec, &mut out),
                ChartKind::HorizontalBar => self.horizontal_bar(spec, &mut out),
            }
        }

        out.push_str("</svg>");
        Ok(out)
    }
}
