//! Coercion of raw columns to their declared semantic types.
//!
//! Coercion is all-or-nothing: a new table is built from the input and
//! returned only when every column converted cleanly.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::error::Error;
use crate::inference::{parse_binary, parse_float, parse_integer};
use crate::types::{Column, ColumnData, Result, StorageType, Table, VariableType};

/// Verify that the declared variables are exactly the table's non-identifier columns
pub fn check_columns_match(
    table: &Table,
    variable_types: &BTreeMap<String, String>,
    id_column: &str,
) -> Result<()> {
    if table.column(id_column).is_none() {
        return Err(Error::MissingIdentifier(id_column.to_string()));
    }

    let columns: BTreeSet<&str> = table.column_names().filter(|n| *n != id_column).collect();
    let declared: BTreeSet<&str> = variable_types.keys().map(String::as_str).collect();

    if columns == declared {
        return Ok(());
    }

    Err(Error::ColumnMismatch {
        missing: declared.difference(&columns).map(|s| s.to_string()).collect(),
        unexpected: columns.difference(&declared).map(|s| s.to_string()).collect(),
    })
}

/// Parse every declared type string
pub fn parse_variable_types(
    variable_types: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, VariableType>> {
    variable_types
        .iter()
        .map(|(column, declared)| {
            declared
                .parse::<VariableType>()
                .map(|vt| (column.clone(), vt))
                .map_err(|reason| Error::TypeCoercion {
                    column: column.clone(),
                    reason,
                })
        })
        .collect()
}

/// Storage type of every declared column, as a freshly built mapping
pub fn storage_types(
    variable_types: &BTreeMap<String, VariableType>,
) -> BTreeMap<String, StorageType> {
    variable_types
        .iter()
        .map(|(column, vt)| (column.clone(), vt.storage_type()))
        .collect()
}

/// Coerce every non-identifier column of `table` to its declared type
pub fn coerce_table(
    table: &Table,
    variable_types: &BTreeMap<String, String>,
    id_column: &str,
) -> Result<Table> {
    check_columns_match(table, variable_types, id_column)?;
    let parsed = parse_variable_types(variable_types)?;
    debug!("coercing to storage types {:?}", storage_types(&parsed));

    let columns = table
        .columns
        .iter()
        .map(|column| match parsed.get(&column.name) {
            Some(vt) => coerce_column(column, *vt),
            None => Ok(column.clone()),
        })
        .collect::<Result<Vec<Column>>>()?;

    Ok(Table::new(columns))
}

/// Coerce a single column to the storage of `variable_type`
pub fn coerce_column(column: &Column, variable_type: VariableType) -> Result<Column> {
    let data = match variable_type {
        VariableType::Int => to_integer(column)?,
        VariableType::Binary => to_binary(column)?,
        VariableType::Float => to_float(column)?,
        VariableType::Categorical | VariableType::Date => to_category(column),
    };
    Ok(Column::new(&column.name, data))
}

fn coercion_error(column: &Column, row: usize, value: impl std::fmt::Display, target: &str) -> Error {
    Error::TypeCoercion {
        column: column.name.clone(),
        reason: format!("value '{}' at row {} is not a valid {}", value, row + 1, target),
    }
}

fn unconvertible(column: &Column, target: &str) -> Error {
    Error::TypeCoercion {
        column: column.name.clone(),
        reason: format!("{} values cannot be stored as {}", column.storage_type(), target),
    }
}

/// Parse each present string cell with `parse`, failing on the first rejected value
fn parse_strings<T>(
    column: &Column,
    values: &[Option<String>],
    target: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    values
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => Ok(None),
            Some(s) => parse(s)
                .map(Some)
                .ok_or_else(|| coercion_error(column, row, s, target)),
        })
        .collect()
}

fn integral(x: f64) -> Option<i64> {
    if x.is_finite() && x.fract() == 0.0 {
        Some(x as i64)
    } else {
        None
    }
}

fn to_integer(column: &Column) -> Result<ColumnData> {
    Ok(ColumnData::Integer(integer_values(column, "integer")?))
}

fn integer_values(column: &Column, target: &str) -> Result<Vec<Option<i64>>> {
    let values = match &column.data {
        ColumnData::Integer(v) => v.clone(),
        ColumnData::Boolean(v) => v.iter().map(|b| b.map(i64::from)).collect(),
        ColumnData::Float(v) => v
            .iter()
            .enumerate()
            .map(|(row, x)| match x {
                None => Ok(None),
                Some(x) => integral(*x)
                    .map(Some)
                    .ok_or_else(|| coercion_error(column, row, x, target)),
            })
            .collect::<Result<_>>()?,
        ColumnData::Category(v) | ColumnData::Text(v) => {
            parse_strings(column, v, target, parse_integer)?
        }
        ColumnData::Datetime(_) => return Err(unconvertible(column, target)),
    };
    Ok(values)
}

fn to_binary(column: &Column) -> Result<ColumnData> {
    let target = "binary value (0 or 1)";
    let values = match &column.data {
        ColumnData::Boolean(v) => v.iter().map(|b| b.map(i64::from)).collect(),
        ColumnData::Category(v) | ColumnData::Text(v) => {
            parse_strings(column, v, target, parse_binary)?
        }
        ColumnData::Integer(_) | ColumnData::Float(_) => integer_values(column, target)?,
        ColumnData::Datetime(_) => return Err(unconvertible(column, target)),
    };

    if let Some((row, value)) = values
        .iter()
        .enumerate()
        .find_map(|(row, v)| v.filter(|i| *i != 0 && *i != 1).map(|i| (row, i)))
    {
        return Err(coercion_error(column, row, value, target));
    }

    Ok(ColumnData::Integer(values))
}

fn to_float(column: &Column) -> Result<ColumnData> {
    let target = "float";
    let values = match &column.data {
        ColumnData::Float(v) => v.clone(),
        ColumnData::Integer(v) => v.iter().map(|i| i.map(|i| i as f64)).collect(),
        ColumnData::Boolean(v) => v.iter().map(|b| b.map(|b| if b { 1.0 } else { 0.0 })).collect(),
        ColumnData::Category(v) | ColumnData::Text(v) => {
            parse_strings(column, v, target, parse_float)?
        }
        ColumnData::Datetime(_) => return Err(unconvertible(column, target)),
    };
    Ok(ColumnData::Float(values))
}

fn to_category(column: &Column) -> ColumnData {
    match &column.data {
        ColumnData::Category(v) => ColumnData::Category(v.clone()),
        other => ColumnData::Category(other.labels()),
    }
}

/// Store a numeric column holding only 0s and 1s as categories
pub fn promote_binary(column: Column) -> Column {
    let labels = match &column.data {
        ColumnData::Integer(v) if v.iter().all(|i| matches!(i, Some(0 | 1))) => column.data.labels(),
        ColumnData::Float(v) if v.iter().all(|x| matches!(x, Some(x) if *x == 0.0 || *x == 1.0)) => v
            .iter()
            .map(|x| x.map(|x| format!("{}", x as i64)))
            .collect(),
        _ => return column,
    };
    debug!("treating binary column '{}' as categorical", column.name);
    Column::new(&column.name, ColumnData::Category(labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(values: &[&str]) -> ColumnData {
        ColumnData::Text(
            values
                .iter()
                .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
                .collect(),
        )
    }

    fn types(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn cohort() -> Table {
        Table::new(vec![
            Column::new("patient_id", text(&["1", "2", "3"])),
            Column::new("age", text(&["34", "51", ""])),
            Column::new("sex", text(&["M", "F", "F"])),
        ])
    }

    #[test]
    fn test_mismatch_names_undeclared_column() {
        let err = coerce_table(&cohort(), &types(&[("age", "int")]), "patient_id").unwrap_err();
        match err {
            Error::ColumnMismatch { missing, unexpected } => {
                assert!(missing.is_empty());
                assert_eq!(unexpected, vec!["sex".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_mismatch_names_absent_column() {
        let declared = types(&[("age", "int"), ("sex", "categorical"), ("bmi", "float")]);
        let err = check_columns_match(&cohort(), &declared, "patient_id").unwrap_err();
        assert!(matches!(
            err,
            Error::ColumnMismatch { ref missing, ref unexpected }
                if missing == &vec!["bmi".to_string()] && unexpected.is_empty()
        ));
    }

    #[test]
    fn test_missing_identifier() {
        let declared = types(&[("age", "int"), ("sex", "categorical")]);
        let err = check_columns_match(&cohort(), &declared, "subject").unwrap_err();
        assert!(matches!(err, Error::MissingIdentifier(_)));
    }

    #[test]
    fn test_coerce_table() {
        let declared = types(&[("age", "int"), ("sex", "categorical")]);
        let table = coerce_table(&cohort(), &declared, "patient_id").unwrap();

        assert_eq!(
            table.column("age").unwrap().data,
            ColumnData::Integer(vec![Some(34), Some(51), None])
        );
        assert_eq!(table.column("sex").unwrap().storage_type(), StorageType::Category);
        // Identifier column is left untouched
        assert_eq!(table.column("patient_id").unwrap().storage_type(), StorageType::Text);
    }

    #[test]
    fn test_coercion_is_idempotent() {
        let declared = types(&[("age", "float"), ("sex", "date")]);
        let once = coerce_table(&cohort(), &declared, "patient_id").unwrap();
        let twice = coerce_table(&once, &declared, "patient_id").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_invalid_declared_type() {
        let declared = types(&[("age", "integer"), ("sex", "categorical")]);
        let err = coerce_table(&cohort(), &declared, "patient_id").unwrap_err();
        assert!(matches!(err, Error::TypeCoercion { ref column, .. } if column == "age"));
    }

    #[test]
    fn test_non_binary_value_rejected() {
        let table = Table::new(vec![
            Column::new("patient_id", text(&["1", "2"])),
            Column::new("has_copd", text(&["1", "2"])),
        ]);
        let err = coerce_table(&table, &types(&[("has_copd", "binary")]), "patient_id").unwrap_err();
        assert!(matches!(err, Error::TypeCoercion { ref column, .. } if column == "has_copd"));
    }

    #[test]
    fn test_failed_coercion_names_row() {
        let column = Column::new("age", text(&["1", "x"]));
        let err = coerce_column(&column, VariableType::Int).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_binary_from_booleans() {
        let column = Column::new("flag", ColumnData::Boolean(vec![Some(true), Some(false), None]));
        let coerced = coerce_column(&column, VariableType::Binary).unwrap();
        assert_eq!(coerced.data, ColumnData::Integer(vec![Some(1), Some(0), None]));
    }

    #[test]
    fn test_datetime_cannot_become_integer() {
        let column = Column::new("visit", ColumnData::Datetime(vec![None]));
        assert!(coerce_column(&column, VariableType::Int).is_err());
        assert!(coerce_column(&column, VariableType::Date).is_ok());
    }

    #[test]
    fn test_storage_types_is_fresh_mapping() {
        let declared = types(&[("age", "int"), ("sex", "categorical")]);
        let parsed = parse_variable_types(&declared).unwrap();
        let storage = storage_types(&parsed);

        assert_eq!(storage["age"], StorageType::Integer);
        assert_eq!(storage["sex"], StorageType::Category);
        // Input mapping is not rewritten
        assert_eq!(declared["age"], "int");
    }

    #[test]
    fn test_promote_binary() {
        let column = Column::new("has_copd", ColumnData::Integer(vec![Some(0), Some(1), Some(1)]));
        let promoted = promote_binary(column);
        assert_eq!(
            promoted.data,
            ColumnData::Category(vec![
                Some("0".to_string()),
                Some("1".to_string()),
                Some("1".to_string())
            ])
        );
    }

    #[test]
    fn test_promote_binary_leaves_other_columns() {
        let ages = Column::new("age", ColumnData::Integer(vec![Some(0), Some(1), Some(2)]));
        assert_eq!(promote_binary(ages.clone()), ages);

        let with_missing = Column::new("flag", ColumnData::Integer(vec![Some(0), None]));
        assert_eq!(promote_binary(with_missing.clone()), with_missing);
    }
}
