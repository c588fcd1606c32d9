use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;

use crate::error::Error;
use crate::inference::{is_missing, CellKind, StorageInferencer};
use crate::types::{Column, ColumnData, Result, StorageType, Table};

use super::DataReader;

/// Excel file reader (supports .xlsx, .xls, .xlsm, .xlsb); reads the first sheet
pub struct ExcelReader {
    path: PathBuf,
}

impl ExcelReader {
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Convert Excel Data to its text representation
    fn data_to_string(dt: &Data) -> Option<String> {
        match dt {
            Data::Empty | Data::Error(_) => None,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                if is_missing(s) {
                    None
                } else {
                    Some(s.clone())
                }
            }
            Data::Float(f) => Some(f.to_string()),
            Data::Int(i) => Some(i.to_string()),
            Data::Bool(b) => Some(b.to_string()),
            Data::DateTime(d) => {
                Self::excel_serial_to_datetime(d.as_f64()).map(|d| d.to_string())
            }
        }
    }

    /// Convert an Excel serial date to a timestamp
    fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
        // Excel epoch is 1899-12-30 (with the 1900 leap year bug)
        let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
        let seconds = (serial * 86_400.0).round() as i64;
        base.checked_add_signed(chrono::Duration::seconds(seconds))
    }

    fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    fn cell_kind(dt: &Data) -> CellKind {
        match dt {
            Data::Empty | Data::Error(_) => CellKind::Empty,
            Data::String(s) if is_missing(s) => CellKind::Empty,
            Data::String(_) | Data::DurationIso(_) => CellKind::Text,
            Data::Float(f) => CellKind::Float(f.fract() == 0.0),
            Data::Int(_) => CellKind::Int,
            Data::Bool(_) => CellKind::Bool,
            Data::DateTime(_) => CellKind::DateTime,
            Data::DateTimeIso(s) if Self::parse_iso_datetime(s).is_some() => CellKind::DateTime,
            Data::DateTimeIso(_) => CellKind::Text,
        }
    }

    fn to_datetime(dt: &Data) -> Option<NaiveDateTime> {
        match dt {
            Data::DateTime(d) => Self::excel_serial_to_datetime(d.as_f64()),
            Data::DateTimeIso(s) => Self::parse_iso_datetime(s),
            _ => None,
        }
    }

    fn to_float(dt: &Data) -> Option<f64> {
        match dt {
            Data::Float(f) => Some(*f),
            Data::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Build a column with the storage inferred from its cells
    fn build_column(name: &str, cells: &[&Data]) -> Column {
        let mut inferencer = StorageInferencer::new();
        for cell in cells {
            inferencer.observe(Self::cell_kind(cell));
        }

        let data = match inferencer.inferred_type() {
            StorageType::Boolean => ColumnData::Boolean(
                cells
                    .iter()
                    .map(|c| match c {
                        Data::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect(),
            ),
            StorageType::Integer => ColumnData::Integer(
                cells
                    .iter()
                    .map(|c| Self::to_float(c).map(|f| f as i64))
                    .collect(),
            ),
            StorageType::Float => {
                ColumnData::Float(cells.iter().map(|c| Self::to_float(c)).collect())
            }
            StorageType::Datetime => {
                ColumnData::Datetime(cells.iter().map(|c| Self::to_datetime(c)).collect())
            }
            StorageType::Category | StorageType::Text => {
                ColumnData::Text(cells.iter().map(|c| Self::data_to_string(c)).collect())
            }
        };

        Column::new(name, data)
    }
}

impl DataReader for ExcelReader {
    fn read(&mut self) -> Result<Table> {
        let mut workbook: Sheets<std::io::BufReader<std::fs::File>> =
            open_workbook_auto(&self.path)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| Error::Import(format!("{} has no sheets", self.path.display())))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        let mut rows = range.rows();

        let headers: Vec<String> = match rows.next() {
            Some(row) => row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    Self::data_to_string(cell).unwrap_or_else(|| format!("Column{}", i + 1))
                })
                .collect(),
            None => return Ok(Table::default()),
        };

        let data_rows: Vec<&[Data]> = rows.collect();
        debug!(
            "read {} rows from sheet '{}' of {}",
            data_rows.len(),
            sheet_name,
            self.path.display()
        );

        let empty = Data::Empty;
        let columns = headers
            .iter()
            .enumerate()
            .map(|(col_idx, name)| {
                let cells: Vec<&Data> = data_rows
                    .iter()
                    .map(|row| row.get(col_idx).unwrap_or(&empty))
                    .collect();
                Self::build_column(name, &cells)
            })
            .collect();

        Ok(Table::new(columns))
    }
}
