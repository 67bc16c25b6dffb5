//! Workbook sheet loader.

use crate::clean::clean_rows;
use crate::table::{Table, Value};
use calamine::{open_workbook_auto, Data, Reader};
use opsgraph_common::{excel_serial_to_date, parse_report_date, LoadError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads named sheets from one workbook into cleaned [`Table`]s.
///
/// The workbook is reopened per call, so a sheet that fails to load leaves
/// nothing behind for the next one.
#[derive(Debug, Clone)]
pub struct SheetLoader {
    path: PathBuf,
}

impl SheetLoader {
    /// Creates a loader for the workbook at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Workbook path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads a sheet, keeping only the first `first_columns` columns when given.
    ///
    /// The first row is the header. Null tokens become 0 and column kinds
    /// are inferred before the table is returned.
    pub fn load(&self, sheet: &str, first_columns: Option<usize>) -> Result<Table, LoadError> {
        info!(sheet, "Loading sheet");

        if !self.path.exists() {
            return Err(LoadError::FileMissing {
                path: self.path.clone(),
            });
        }

        let mut workbook = open_workbook_auto(&self.path)
            .map_err(|e| LoadError::unexpected_with_source(sheet, "failed to open workbook", e))?;

        if !workbook.sheet_names().iter().any(|name| name == sheet) {
            return Err(LoadError::SheetMissing {
                sheet: sheet.to_string(),
            });
        }

        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| LoadError::unexpected_with_source(sheet, "failed to read sheet range", e))?;

        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| LoadError::unexpected(sheet, "sheet has no header row"))?;

        let mut headers = header_names(header_row);
        if let Some(limit) = first_columns {
            headers.truncate(limit);
        }
        check_headers(sheet, &headers)?;

        let width = headers.len();
        let data: Vec<Vec<Value>> = rows
            .map(|row| row.iter().take(width).map(cell_value).collect())
            .filter(|row: &Vec<Value>| row.iter().any(|v| !v.is_null()))
            .collect();
        debug!(sheet, rows = data.len(), columns = width, "Read sheet range");

        let table = clean_rows(sheet, headers, data);
        info!(sheet, rows = table.len(), "Loaded and cleaned sheet");
        Ok(table)
    }
}

fn header_names(row: &[Data]) -> Vec<String> {
    let mut headers: Vec<String> = row
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell_value(cell) {
            Value::Null => format!("unnamed_{i}"),
            other => other.to_string().trim().to_string(),
        })
        .collect();
    while headers.last().is_some_and(|h| h.starts_with("unnamed_")) {
        headers.pop();
    }
    headers
}

fn check_headers(sheet: &str, headers: &[String]) -> Result<(), LoadError> {
    if headers.is_empty() {
        return Err(LoadError::unexpected(sheet, "header row is empty"));
    }
    let mut seen = HashSet::new();
    for header in headers {
        if !seen.insert(header.as_str()) {
            return Err(LoadError::unexpected(
                sheet,
                format!("duplicate column header '{header}'"),
            ));
        }
    }
    Ok(())
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        #[allow(clippy::cast_precision_loss)]
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::Text(trimmed.to_string())
            }
        }
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map_or(Value::Null, Value::Date),
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(parse_report_date)
            .map_or_else(|| Value::Text(s.clone()), Value::Date),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_workbook() {
        let loader = SheetLoader::new("/definitely/not/here.xlsx");
        let err = loader.load("KPI_WKLY", None).unwrap_err();
        assert_eq!(err.kind(), "file_missing");
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Data::Int(3)), Value::Number(3.0));
        assert_eq!(cell_value(&Data::String("  ".into())), Value::Null);
        assert_eq!(cell_value(&Data::String(" \\N ".into())), Value::from("\\N"));
        assert_eq!(cell_value(&Data::Bool(true)), Value::Number(1.0));
        assert!(matches!(
            cell_value(&Data::DateTimeIso("2024-01-05T00:00:00".into())),
            Value::Date(_)
        ));
    }

    #[test]
    fn test_header_names() {
        let row = vec![
            Data::String("day".into()),
            Data::Empty,
            Data::Int(7),
            Data::Empty,
        ];
        assert_eq!(header_names(&row), vec!["day", "unnamed_1", "7"]);
        assert!(check_headers("s", &["a".into(), "a".into()]).is_err());
        assert!(check_headers("s", &[]).is_err());
    }
}
