use arcstr::ArcStr;

use crate::config::family::{BiasVar, FetLayout, OutputKind, Polarity};
use crate::error::{MeasError, Result};
use crate::extract::reshape::{split_blocks, unpivot};
use crate::table::Sheet;

/// One measured device instance: a column block of the raw sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Variation {
    pub width: f64,
    pub length: f64,
    pub corner: ArcStr,
    pub temp: i32,
}

/// A single tidy FET measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct FetPoint {
    pub variation: Variation,
    pub vds: f64,
    pub vgs: f64,
    pub vbs: f64,
    pub output: OutputKind,
    pub value: f64,
    pub const_var: BiasVar,
    pub const_var_val: f64,
    pub sweeps: ArcStr,
}

#[derive(Debug, Default, Copy, Clone)]
struct Bias {
    vds: f64,
    vgs: f64,
    vbs: f64,
}

impl Bias {
    fn set(&mut self, var: BiasVar, value: f64) {
        match var {
            BiasVar::Vds => self.vds = value,
            BiasVar::Vgs => self.vgs = value,
            BiasVar::Vbs => self.vbs = value,
        }
    }
}

/// Reads the variation attributes from the first rows of the metadata
/// columns, one row per block, and assigns temperatures by block position.
pub fn variations(sheet: &Sheet, layout: &FetLayout) -> Result<Vec<Variation>> {
    let key = sheet.require(&layout.key_column)?;
    let count = sheet.count_non_empty(key);
    log::info!("No of variations are {count}");
    log::info!("Length of data points is {}", sheet.num_cols());

    let temps = layout.tiers.assign(count)?;

    let width = sheet.require(&layout.metadata.width)?;
    let length = sheet.require(&layout.metadata.length)?;
    let corner = sheet.require(&layout.metadata.corner)?;

    temps
        .into_iter()
        .enumerate()
        .map(|(row, temp)| {
            Ok(Variation {
                width: number(sheet, row, width)?,
                length: number(sheet, row, length)?,
                corner: sheet
                    .cell(row, corner)
                    .as_text()
                    .map(ArcStr::from)
                    .ok_or_else(|| invalid(sheet, row, corner))?,
                temp,
            })
        })
        .collect()
}

fn number(sheet: &Sheet, row: usize, col: usize) -> Result<f64> {
    sheet
        .cell(row, col)
        .as_f64()
        .ok_or_else(|| invalid(sheet, row, col))
}

fn invalid(sheet: &Sheet, row: usize, col: usize) -> MeasError {
    MeasError::InvalidCell {
        column: sheet.header(col).to_string(),
        row,
        reason: "missing variation attribute".to_string(),
    }
}

/// Reshapes a raw FET sheet into tidy points, one per measured sample.
pub fn extract_fets(sheet: &Sheet, device: &str, layout: &FetLayout) -> Result<Vec<FetPoint>> {
    let sheet = sheet
        .drop_empty_columns()
        .drop_unwanted(&layout.unwanted.exact, &layout.unwanted.containing);

    let variations = variations(&sheet, layout)?;

    let meta = &layout.metadata;
    let data = sheet.retain_columns(|_, h| h != meta.width && h != meta.length && h != meta.corner);
    let blocks = split_blocks(&data, variations.len())?;

    let polarity = Polarity::from_device(device);
    let mut points = Vec::new();
    for (block, variation) in blocks.iter().zip(variations) {
        for sub_layout in layout.sub_tables.iter() {
            let sub = unpivot(block, sub_layout, polarity)?;
            let sweeps = ArcStr::from(sub.sweeps());
            let constant = sub.constant();
            points.extend(sub.samples.iter().map(|s| {
                let mut bias = Bias::default();
                bias.set(sub.const_var, constant);
                bias.set(sub.step_var, s.step);
                bias.set(sub.sweep_var, s.sweep);
                FetPoint {
                    variation: variation.clone(),
                    vds: bias.vds,
                    vgs: bias.vgs,
                    vbs: bias.vbs,
                    output: sub.output,
                    value: s.value,
                    const_var: sub.const_var,
                    const_var_val: constant,
                    sweeps: sweeps.clone(),
                }
            }));
        }
    }

    log::info!("Length of all data points {}", points.len());
    Ok(points)
}
