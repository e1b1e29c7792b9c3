//! Column-block reshaping.
//!
//! A raw sheet holds one fixed-width block of columns per variation. The
//! helpers here cut a sheet into those blocks and unpivot the bias-swept
//! sub-tables inside a block into long-format samples.

use std::fmt;

use crate::config::family::{BiasVar, OutputKind, Polarity, SubTableLayout};
use crate::error::{MeasError, Result};
use crate::extract::header::{parse_step_label, BiasHeader};
use crate::table::{Cell, Sheet};

pub fn columns_per_variation(num_cols: usize, variations: usize) -> Result<usize> {
    if variations == 0 || num_cols % variations != 0 {
        return Err(MeasError::LayoutMismatch {
            columns: num_cols,
            variations,
        });
    }
    Ok(num_cols / variations)
}

/// One variation's column block.
#[derive(Debug, Clone)]
pub struct Block {
    /// The block's own header row. Fixed-bias headers are read from here.
    pub headers: Vec<String>,
    /// The block's cells under the first block's column names.
    pub sheet: Sheet,
}

impl From<Sheet> for Block {
    fn from(sheet: Sheet) -> Self {
        Self {
            headers: sheet.headers().to_vec(),
            sheet,
        }
    }
}

/// Cuts `sheet` into `variations` blocks of equal width.
///
/// Every block is given the first block's header row, so later blocks can be
/// addressed with the same column names. The original headers are kept on
/// the block.
pub fn split_blocks(sheet: &Sheet, variations: usize) -> Result<Vec<Block>> {
    let width = columns_per_variation(sheet.num_cols(), variations)?;
    let template = sheet.headers()[..width].to_vec();

    log::info!("No of data columns per variation: {width}");
    log::debug!("Original columns per variation: {template:?}");

    Ok((0..variations)
        .map(|i| {
            let cols = (i * width..(i + 1) * width).collect::<Vec<_>>();
            let sheet = sheet.select(&cols);
            Block {
                headers: sheet.headers().to_vec(),
                sheet: sheet.with_headers(&template),
            }
        })
        .collect())
}

/// One value pulled out of a stacked column.
#[derive(Debug, Clone, PartialEq)]
pub struct Stacked<'a> {
    pub row: usize,
    pub col: usize,
    pub key: f64,
    /// Header of the column the value came from.
    pub label: &'a str,
    pub value: f64,
}

/// Stacks `value_cols` into long format, keyed by `key_col`.
///
/// Output is row-major: all values of the first row, then the second, and so
/// on. Empty value cells are skipped, as are rows without a key.
pub fn stack_columns<'a>(
    sheet: &'a Sheet,
    key_col: usize,
    value_cols: &[usize],
) -> Result<Vec<Stacked<'a>>> {
    let mut out = Vec::new();
    for row in 0..sheet.num_rows() {
        let key = match numeric(sheet, row, key_col)? {
            Some(key) => key,
            None => continue,
        };
        for &col in value_cols {
            if let Some(value) = numeric(sheet, row, col)? {
                out.push(Stacked {
                    row,
                    col,
                    key,
                    label: sheet.header(col),
                    value,
                });
            }
        }
    }
    Ok(out)
}

fn numeric(sheet: &Sheet, row: usize, col: usize) -> Result<Option<f64>> {
    let cell = sheet.cell(row, col);
    if cell.is_empty() {
        return Ok(None);
    }
    match cell.as_f64() {
        Some(x) => Ok(Some(x)),
        None => Err(MeasError::InvalidCell {
            column: sheet.header(col).to_string(),
            row,
            reason: match cell {
                Cell::Text(s) => format!("expected a number, found `{s}`"),
                _ => "expected a number".to_string(),
            },
        }),
    }
}

/// Minimum, maximum and step of one swept variable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SweepRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SweepRange {
    /// `step` is the distance between the first two raw samples; the sweep
    /// is assumed to be uniformly spaced.
    pub fn new(
        values: impl IntoIterator<Item = f64>,
        first_two: (Option<f64>, Option<f64>),
    ) -> Self {
        let (min, max) = values
            .into_iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(x), hi.max(x))
            });
        let step = match first_two {
            (Some(a), Some(b)) => (b - a).abs(),
            _ => 0.0,
        };
        if min > max {
            Self {
                min: 0.0,
                max: 0.0,
                step,
            }
        } else {
            Self { min, max, step }
        }
    }
}

impl fmt::Display for SweepRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?} {:?}", self.min, self.max, self.step)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sample {
    /// Swept value in the NMOS sign convention.
    pub sweep: f64,
    pub step: f64,
    pub value: f64,
}

/// A bias-swept sub-table in long format.
#[derive(Debug, Clone, PartialEq)]
pub struct SubTable {
    pub sweep_var: BiasVar,
    pub step_var: BiasVar,
    pub const_var: BiasVar,
    pub output: OutputKind,
    /// The parsed first header; it may name biases the step labels omit.
    pub header: BiasHeader,
    pub samples: Vec<Sample>,
    pub sweep_range: SweepRange,
    pub step_range: SweepRange,
}

impl SubTable {
    /// Constant bias of this sub-table, read from its own block's header.
    pub fn constant(&self) -> f64 {
        self.header.value_of(self.const_var)
    }

    /// The sweep directive used to regenerate this measurement in simulation.
    pub fn sweeps(&self) -> String {
        format!(
            "{} {} {} {}",
            self.sweep_var, self.sweep_range, self.step_var, self.step_range
        )
    }
}

/// Unpivots one sub-table of a variation block.
///
/// The first column's header holds the constant bias and is dropped; the
/// second column is the sweep; every further column is one step of the
/// stepped variable, labelled `"<var> =<value>"`.
pub fn unpivot(block: &Block, layout: &SubTableLayout, polarity: Polarity) -> Result<SubTable> {
    let span = layout.span.resolve(block.headers.len())?;
    let header = BiasHeader::parse(&block.headers[span.start])?;
    let block = &block.sheet;

    let sweep_col = span.start + 1;
    let expected = format!("{}{}", polarity.prefix(), layout.sweep_header);
    if block.header(sweep_col).trim() != expected.trim() {
        return Err(MeasError::MissingColumn(expected));
    }

    let step_cols = (sweep_col + 1..span.end).collect::<Vec<_>>();
    let step_values = step_cols
        .iter()
        .map(|&col| step_value(block.header(col), &header, layout.step))
        .collect::<Result<Vec<_>>>()?;

    let stacked = stack_columns(block, sweep_col, &step_cols)?;
    let samples = stacked
        .iter()
        .map(|s| Sample {
            sweep: s.key * polarity.sign(),
            step: step_values[s.col - sweep_col - 1],
            value: s.value,
        })
        .collect::<Vec<_>>();

    let raw_sweep = |row| block.cell(row, sweep_col).as_f64();
    let sweep_range = SweepRange::new(
        samples.iter().map(|s| s.sweep),
        (raw_sweep(0), raw_sweep(1)),
    );
    let step_range = SweepRange::new(
        samples.iter().map(|s| s.step),
        (step_values.first().copied(), step_values.get(1).copied()),
    );

    Ok(SubTable {
        sweep_var: layout.sweep,
        step_var: layout.step,
        const_var: layout.constant,
        output: layout.output,
        header,
        samples,
        sweep_range,
        step_range,
    })
}

/// Value of a stacked column, read from its `"<var> =<value>"` label, or
/// from the sub-table header when the label carries none.
fn step_value(label: &str, header: &BiasHeader, var: BiasVar) -> Result<f64> {
    parse_step_label(label)
        .map(|(_, value)| value)
        .or_else(|| header.find(var))
        .ok_or_else(|| MeasError::Format {
            header: label.to_string(),
        })
}
