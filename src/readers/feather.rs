use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{
    new_empty_array, Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray,
    TimestampMicrosecondArray,
};
use arrow::compute::{cast, concat};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::ipc::reader::FileReader;
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::Error;
use crate::types::{Column, ColumnData, Result, Table};

use super::DataReader;

/// Feather (Arrow IPC file) reader; storage follows the Arrow schema
pub struct FeatherReader {
    path: PathBuf,
}

impl FeatherReader {
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn downcast<'a, T: 'static>(name: &str, array: &'a dyn Array) -> Result<&'a T> {
        array.as_any().downcast_ref::<T>().ok_or_else(|| {
            Error::Import(format!(
                "column '{}' could not be read as {}",
                name,
                std::any::type_name::<T>()
            ))
        })
    }

    /// Map one Arrow array onto column storage
    fn build_column(name: &str, array: &dyn Array) -> Result<Column> {
        let data = match array.data_type() {
            DataType::Boolean => {
                ColumnData::Boolean(Self::downcast::<BooleanArray>(name, array)?.iter().collect())
            }
            dt if dt.is_integer() => {
                let values = cast(array, &DataType::Int64)?;
                ColumnData::Integer(Self::downcast::<Int64Array>(name, values.as_ref())?.iter().collect())
            }
            dt if dt.is_floating() => {
                let values = cast(array, &DataType::Float64)?;
                ColumnData::Float(Self::downcast::<Float64Array>(name, values.as_ref())?.iter().collect())
            }
            DataType::Dictionary(_, _) => ColumnData::Category(Self::strings(name, array)?),
            DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => {
                let values = cast(array, &DataType::Timestamp(TimeUnit::Microsecond, None))?;
                let values = Self::downcast::<TimestampMicrosecondArray>(name, values.as_ref())?;
                ColumnData::Datetime(
                    (0..values.len())
                        .map(|i| {
                            if values.is_null(i) {
                                None
                            } else {
                                values.value_as_datetime(i)
                            }
                        })
                        .collect(),
                )
            }
            _ => ColumnData::Text(Self::strings(name, array)?),
        };

        Ok(Column::new(name, data))
    }

    fn strings(name: &str, array: &dyn Array) -> Result<Vec<Option<String>>> {
        let values = cast(array, &DataType::Utf8)?;
        Ok(Self::downcast::<StringArray>(name, values.as_ref())?
            .iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }
}

impl DataReader for FeatherReader {
    fn read(&mut self) -> Result<Table> {
        let reader = FileReader::try_new(File::open(&self.path)?, None)?;
        let schema = reader.schema();
        let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, _>>()?;

        debug!(
            "read {} record batches x {} columns from {}",
            batches.len(),
            schema.fields().len(),
            self.path.display()
        );

        let columns = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(col_idx, field)| {
                let array: ArrayRef = if batches.is_empty() {
                    new_empty_array(field.data_type())
                } else {
                    let parts: Vec<&dyn Array> =
                        batches.iter().map(|b| b.column(col_idx).as_ref()).collect();
                    concat(&parts)?
                };
                Self::build_column(field.name(), array.as_ref())
            })
            .collect::<Result<Vec<Column>>>()?;

        Ok(Table::new(columns))
    }
}
