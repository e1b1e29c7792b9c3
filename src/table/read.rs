use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use super::{unnamed, Cell, Sheet};
use crate::error::{MeasError, Result};

/// Reads the first sheet of a workbook, or a CSV export of it.
///
/// The first row is taken as the header row.
pub fn read_sheet(path: impl AsRef<Path>) -> Result<Sheet> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let sheet = match ext.as_deref() {
        Some("csv") => read_csv(path)?,
        _ => read_workbook(path)?,
    };

    log::debug!(
        "Read {} rows x {} columns of sheet `{}` from {:?}",
        sheet.num_rows(),
        sheet.num_cols(),
        sheet.name(),
        path
    );
    Ok(sheet)
}

fn read_csv(path: &Path) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::parse).collect());
    }

    Sheet::try_new(sheet_name(path), headers, rows)
}

/// Reads the first worksheet. The header is the first row of the used range:
/// blank rows above it are skipped, while blank columns left of it are kept
/// so that `Unnamed: <index>` names match the sheet's column positions.
fn read_workbook(path: &Path) -> Result<Sheet> {
    let mut workbook = open_workbook_auto(path)?;
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| MeasError::EmptySheet(path.display().to_string()))?;
    let range = workbook.worksheet_range(&name)?;

    // The used range may not start at the first column; blank leading columns
    // still count towards `Unnamed: <index>` numbering.
    let col_offset = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| MeasError::EmptySheet(name.clone()))?;

    let headers = (0..col_offset)
        .map(unnamed)
        .chain(header_row.iter().enumerate().map(|(i, data)| match data {
            Data::Empty => unnamed(col_offset + i),
            other => other.to_string(),
        }))
        .collect::<Vec<_>>();

    let rows = rows
        .map(|row| {
            std::iter::repeat(Cell::Empty)
                .take(col_offset)
                .chain(row.iter().map(to_cell))
                .collect()
        })
        .collect();

    Sheet::try_new(name, headers, rows)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Float(x) => Cell::Number(*x),
        Data::Int(x) => Cell::Number(*x as f64),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

fn sheet_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
