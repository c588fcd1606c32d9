pub mod csv;
pub mod excel;
pub mod feather;

use std::path::Path;

use crate::error::Error;
use crate::types::{FileFormat, Result, Table};

/// Common trait for cohort file readers
pub trait DataReader {
    /// Load the whole file into a table
    fn read(&mut self) -> Result<Table>;
}

/// Detect the format of the file at `path`
pub fn detect_format(path: &Path) -> Result<FileFormat> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    FileFormat::from_file_name(name).ok_or_else(|| {
        Error::Import(format!(
            "Unsupported filetype attempted to be imported: {}",
            path.display()
        ))
    })
}

/// Create a reader for the given file path
pub fn create_reader(path: &Path) -> Result<Box<dyn DataReader>> {
    let format = detect_format(path)?;

    match format {
        FileFormat::Csv => Ok(Box::new(csv::CsvReader::new(path)?)),
        FileFormat::CsvGz => Ok(Box::new(csv::CsvReader::new_gzip(path)?)),
        FileFormat::Tsv => Ok(Box::new(csv::CsvReader::new_tsv(path)?)),
        FileFormat::Excel => Ok(Box::new(excel::ExcelReader::new(path)?)),
        FileFormat::Feather => Ok(Box::new(feather::FeatherReader::new(path)?)),
    }
}
