//! In-memory model of a raw foundry measurement sheet.
//!
//! A [`Sheet`] keeps its header row separate from the data cells, which are
//! stored row-major in a [`Grid`]. Header names follow the conventions of the
//! spreadsheet exports the foundry data was produced with: blank headers become
//! `Unnamed: <index>`, and repeated headers can be addressed through their
//! de-duplicated form (`name`, `name.1`, `name.2`, ...).

use std::collections::HashMap;

use grid::Grid;

use crate::error::{MeasError, Result};

pub mod read;

pub use read::read_sheet;

static EMPTY: Cell = Cell::Empty;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Interprets raw text the way a spreadsheet import would: blank text is
    /// empty, anything that parses as a float is numeric.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else if let Ok(x) = trimmed.parse::<f64>() {
            Cell::Number(x)
        } else {
            Cell::Text(s.to_string())
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(x) => x.is_nan(),
            Cell::Text(_) => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(x) if x.is_nan() => None,
            Cell::Number(x) => Some(*x),
            Cell::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(x) if x.is_nan() => None,
            Cell::Number(x) => Some(format!("{x}")),
            Cell::Text(s) => Some(s.clone()),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::parse(value)
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    headers: Vec<String>,
    cells: Grid<Cell>,
}

pub(crate) fn unnamed(index: usize) -> String {
    format!("Unnamed: {index}")
}

impl Sheet {
    /// Builds a sheet from a header row and data rows.
    ///
    /// Short rows are padded with empty cells; blank headers are replaced by
    /// `Unnamed: <index>`. Cells past the last header are dropped, use
    /// [`Sheet::try_new`] for rows that may be too long.
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let ncols = headers.len();
        let headers = headers
            .into_iter()
            .enumerate()
            .map(|(i, h)| if h.trim().is_empty() { unnamed(i) } else { h })
            .collect::<Vec<_>>();

        let nrows = rows.len();
        let cells = if ncols == 0 || nrows == 0 {
            Grid::new(0, 0)
        } else {
            let mut flat = Vec::with_capacity(nrows * ncols);
            for mut row in rows {
                row.resize(ncols, Cell::Empty);
                flat.extend(row);
            }
            Grid::from_vec(flat, ncols)
        };

        Self {
            name: name.into(),
            headers,
            cells,
        }
    }

    /// Like [`Sheet::new`], but rejects rows holding data past the last
    /// header.
    pub fn try_new(
        name: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self> {
        let ncols = headers.len();
        for (row, cells) in rows.iter().enumerate() {
            if let Some(extra) = cells.iter().skip(ncols).position(|c| !c.is_empty()) {
                return Err(MeasError::InvalidCell {
                    column: unnamed(ncols + extra),
                    row,
                    reason: format!("row has {} cells but the header has {ncols}", cells.len()),
                });
            }
        }
        Ok(Self::new(name, headers, rows))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[inline]
    pub fn header(&self, col: usize) -> &str {
        &self.headers[col]
    }

    #[inline]
    pub fn num_cols(&self) -> usize {
        self.headers.len()
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.cells.rows()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.cells.get(row, col).unwrap_or(&EMPTY)
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = &Cell> + '_ {
        (0..self.num_rows()).map(move |row| self.cell(row, col))
    }

    pub fn count_non_empty(&self, col: usize) -> usize {
        self.column(col).filter(|c| !c.is_empty()).count()
    }

    /// Index of the first column whose header is exactly `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| MeasError::MissingColumn(name.to_string()))
    }

    /// Header names with repeated names disambiguated as `name.1`, `name.2`, ...
    pub fn mangled_headers(&self) -> Vec<String> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        self.headers
            .iter()
            .map(|h| {
                let count = seen.entry(h.as_str()).or_insert(0);
                let mangled = if *count == 0 {
                    h.clone()
                } else {
                    format!("{h}.{count}")
                };
                *count += 1;
                mangled
            })
            .collect()
    }

    /// Looks a column up by its de-duplicated header name.
    pub fn require_mangled(&self, name: &str) -> Result<usize> {
        self.mangled_headers()
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| MeasError::MissingColumn(name.to_string()))
    }

    /// Returns a new sheet made of the given columns, in the given order.
    pub fn select(&self, cols: &[usize]) -> Sheet {
        let headers = cols.iter().map(|&c| self.headers[c].clone()).collect();
        let rows = (0..self.num_rows())
            .map(|row| cols.iter().map(|&c| self.cell(row, c).clone()).collect())
            .collect();
        Sheet::new(self.name.clone(), headers, rows)
    }

    pub fn retain_columns(&self, mut keep: impl FnMut(usize, &str) -> bool) -> Sheet {
        let cols = (0..self.num_cols())
            .filter(|&c| keep(c, &self.headers[c]))
            .collect::<Vec<_>>();
        self.select(&cols)
    }

    /// Drops every column that holds no data at all.
    pub fn drop_empty_columns(&self) -> Sheet {
        self.retain_columns(|c, _| self.count_non_empty(c) > 0)
    }

    /// Drops columns named exactly as one of `exact`, or containing any of
    /// `containing`. Names that are not present are ignored.
    pub fn drop_unwanted(&self, exact: &[String], containing: &[String]) -> Sheet {
        self.retain_columns(|_, h| {
            !exact.iter().any(|e| e == h) && !containing.iter().any(|s| h.contains(s.as_str()))
        })
    }

    /// Replaces the header row. `headers` must have one entry per column.
    pub fn with_headers(mut self, headers: &[String]) -> Sheet {
        assert_eq!(headers.len(), self.num_cols());
        self.headers = headers.to_vec();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sheet {
        Sheet::new(
            "sample",
            vec!["a".into(), "".into(), "b".into(), "a".into(), "a".into()],
            vec![
                vec![1.0.into(), Cell::Empty, "x".into(), 2.0.into()],
                vec![3.0.into(), Cell::Empty, Cell::Empty, 4.0.into(), 5.0.into()],
            ],
        )
    }

    #[test]
    fn test_blank_headers_are_unnamed() {
        let sheet = sample();
        assert_eq!(sheet.header(1), "Unnamed: 1");
        assert_eq!(sheet.num_cols(), 5);
        assert_eq!(sheet.num_rows(), 2);
        assert_eq!(sheet.cell(0, 4), &Cell::Empty);
    }

    #[test]
    fn test_mangled_headers() {
        let sheet = sample();
        assert_eq!(
            sheet.mangled_headers(),
            vec!["a", "Unnamed: 1", "b", "a.1", "a.2"]
        );
        assert_eq!(sheet.require_mangled("a.2").unwrap(), 4);
        assert!(sheet.require_mangled("a.3").is_err());
    }

    #[test]
    fn test_drop_columns() {
        let sheet = sample().drop_empty_columns();
        assert_eq!(sheet.headers(), &["a", "b", "a", "a"]);

        let sheet = sheet.drop_unwanted(&["b".to_string()], &[]);
        assert_eq!(sheet.headers(), &["a", "a", "a"]);
        assert_eq!(sheet.cell(1, 2).as_f64(), Some(5.0));
    }

    #[test]
    fn test_long_rows_are_rejected() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let err = Sheet::try_new(
            "s",
            headers.clone(),
            vec![vec![1.0.into(), 2.0.into()], vec![1.0.into(), 2.0.into(), 3.0.into()]],
        )
        .unwrap_err();
        assert!(matches!(err, MeasError::InvalidCell { row: 1, .. }));

        // Trailing empty cells carry no data.
        let sheet = Sheet::try_new("s", headers, vec![vec![1.0.into(), 2.0.into(), Cell::Empty]]);
        assert_eq!(sheet.unwrap().num_cols(), 2);
    }

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse("  "), Cell::Empty);
        assert_eq!(Cell::parse(" 1.5"), Cell::Number(1.5));
        assert_eq!(Cell::parse("ff"), Cell::Text("ff".to_string()));
        assert!(Cell::Number(f64::NAN).is_empty());
        assert_eq!(Cell::Text(" 2 ".into()).as_f64(), Some(2.0));
    }
}
