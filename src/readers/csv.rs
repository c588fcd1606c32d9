use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use log::debug;

use crate::inference::is_missing;
use crate::types::{Column, ColumnData, Result, Table};

use super::DataReader;

/// CSV/TSV file reader, optionally gzip-compressed
pub struct CsvReader {
    path: PathBuf,
    delimiter: u8,
    gzip: bool,
}

impl CsvReader {
    /// Create a new CSV reader
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            delimiter: b',',
            gzip: false,
        })
    }

    /// Create a new reader for gzip-compressed CSV
    pub fn new_gzip(path: &Path) -> Result<Self> {
        Ok(Self {
            gzip: true,
            ..Self::new(path)?
        })
    }

    /// Create a new TSV reader
    pub fn new_tsv(path: &Path) -> Result<Self> {
        Ok(Self {
            delimiter: b'\t',
            ..Self::new(path)?
        })
    }

    fn open(&self) -> Result<Box<dyn Read>> {
        let file = BufReader::new(File::open(&self.path)?);
        if self.gzip {
            Ok(Box::new(GzDecoder::new(file)))
        } else {
            Ok(Box::new(file))
        }
    }
}

impl DataReader for CsvReader {
    fn read(&mut self) -> Result<Table> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(self.open()?);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

        for result in reader.records() {
            let record = result?;
            for (col_idx, values) in cells.iter_mut().enumerate() {
                // Short rows are padded with missing cells
                let value = record
                    .get(col_idx)
                    .filter(|field| !is_missing(field))
                    .map(str::to_string);
                values.push(value);
            }
        }

        debug!(
            "read {} rows x {} columns from {}",
            cells.first().map_or(0, Vec::len),
            headers.len(),
            self.path.display()
        );

        let columns = headers
            .iter()
            .zip(cells)
            .map(|(name, values)| Column::new(name, ColumnData::Text(values)))
            .collect();

        Ok(Table::new(columns))
    }
}
