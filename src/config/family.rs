//! Fixed spreadsheet layouts of the foundry measurement data, one record per
//! device family.
//!
//! Nothing in a raw sheet labels which block of columns belongs to which
//! temperature, nor where one sweep ends and the next starts inside a block.
//! Those facts live here as data so a change in the vendor layout is an edit
//! to one of these records (or a TOML override), not to the reshaping code.

use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MeasError, Result};

/// Blocks per temperature tier for 3.3 V FETs.
pub const FET_03V3_BLOCKS_PER_TEMP: usize = 25;
/// Blocks per temperature tier for 6 V native FETs.
pub const FET_06V0_NVT_BLOCKS_PER_TEMP: usize = 12;
/// Blocks per temperature tier for the remaining 6 V FETs.
pub const FET_06V0_BLOCKS_PER_TEMP: usize = 20;
/// Blocks per temperature tier for MOS capacitors.
pub const CAP_BLOCKS_PER_TEMP: usize = 16;

/// Columns of the Id-Vgs sub-table: header, sweep and five Vbs steps.
pub const NUM_COLS_MEAS_VBS: usize = 7;
/// Columns of the Id/Rds-Vds sub-tables: header, sweep and six Vgs steps.
pub const NUM_COLS_MEAS_VGS: usize = 8;

pub const FET_TEMPS: [i32; 3] = [25, -40, 125];
pub const CAP_TEMPS: [i32; 3] = [25, -40, 175];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    N,
    P,
}

impl Polarity {
    /// PMOS measurements report swept voltages with inverted sign.
    pub fn from_device(device: &str) -> Self {
        if device.contains("pfet") {
            Polarity::P
        } else {
            Polarity::N
        }
    }

    /// Factor that maps a raw swept value onto the NMOS sign convention.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Polarity::N => 1.0,
            Polarity::P => -1.0,
        }
    }

    /// Prefix carried by sweep column headers.
    #[inline]
    pub fn prefix(self) -> &'static str {
        match self {
            Polarity::N => "",
            Polarity::P => "-",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::N => "nfet",
            Polarity::P => "pfet",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasVar {
    Vgs,
    Vds,
    Vbs,
}

impl BiasVar {
    pub fn as_str(self) -> &'static str {
        match self {
            BiasVar::Vgs => "vgs",
            BiasVar::Vds => "vds",
            BiasVar::Vbs => "vbs",
        }
    }
}

impl std::fmt::Display for BiasVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Id,
    Rds,
    Cgg,
}

impl OutputKind {
    /// Column name of the measured quantity.
    pub fn column(self) -> &'static str {
        match self {
            OutputKind::Id => "id",
            OutputKind::Rds => "rds",
            OutputKind::Cgg => "cgg",
        }
    }

    /// Tag used in output file names.
    pub fn file_tag(self) -> &'static str {
        match self {
            OutputKind::Id => "id",
            OutputKind::Rds => "rds",
            OutputKind::Cgg => "cv",
        }
    }
}

/// Which columns of a variation block belong to a sub-table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum ColumnSpan {
    Start { offset: usize, width: usize },
    End { width: usize },
    All,
}

impl ColumnSpan {
    pub fn resolve(&self, block_width: usize) -> Result<Range<usize>> {
        let range = match *self {
            ColumnSpan::Start { offset, width } => offset..offset + width,
            ColumnSpan::End { width } => block_width.saturating_sub(width)..block_width,
            ColumnSpan::All => 0..block_width,
        };
        if range.end > block_width || range.len() < 2 {
            return Err(MeasError::MissingColumn(format!(
                "columns {}..{} of a {}-column block",
                range.start, range.end, block_width
            )));
        }
        Ok(range)
    }
}

/// One bias-swept measurement inside a variation block.
///
/// The first column's header carries the constant bias (`"<var>=<value>/..."`),
/// the second column is the swept voltage and the remaining columns are the
/// measured output, one column per step of `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTableLayout {
    pub sweep: BiasVar,
    /// Header of the sweep column without the polarity prefix.
    pub sweep_header: String,
    pub step: BiasVar,
    pub constant: BiasVar,
    pub output: OutputKind,
    pub span: ColumnSpan,
}

/// Temperature assignment by block position.
///
/// The sheets do not record temperature. Blocks are assumed to come in
/// consecutive tiers, in order, each holding a fixed number of blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempTiers {
    pub tiers: Vec<TempTier>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempTier {
    pub temp: i32,
    pub blocks: usize,
}

impl TempTiers {
    pub fn uniform(temps: &[i32], blocks: usize) -> Self {
        Self {
            tiers: temps.iter().map(|&temp| TempTier { temp, blocks }).collect(),
        }
    }

    /// Splits `variations` evenly across `temps`.
    pub fn split_evenly(temps: &[i32], variations: usize) -> Result<Self> {
        if temps.is_empty() || variations % temps.len() != 0 {
            return Err(MeasError::TierMismatch {
                expected: variations - variations % temps.len().max(1),
                found: variations,
            });
        }
        Ok(Self::uniform(temps, variations / temps.len()))
    }

    pub fn total(&self) -> usize {
        self.tiers.iter().map(|t| t.blocks).sum()
    }

    /// Temperature of every block, in block order.
    pub fn assign(&self, variations: usize) -> Result<Vec<i32>> {
        let expected = self.total();
        if expected != variations {
            return Err(MeasError::TierMismatch {
                expected,
                found: variations,
            });
        }
        Ok(self
            .tiers
            .iter()
            .flat_map(|t| std::iter::repeat(t.temp).take(t.blocks))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFilter {
    #[serde(default)]
    pub exact: Vec<String>,
    #[serde(default)]
    pub containing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataColumns {
    pub width: String,
    pub length: String,
    pub corner: String,
}

impl Default for MetadataColumns {
    fn default() -> Self {
        Self {
            width: "W (um)".to_string(),
            length: "L (um)".to_string(),
            corner: "corners".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetLayout {
    /// Column whose non-empty entries count the variations.
    pub key_column: String,
    pub metadata: MetadataColumns,
    pub unwanted: ColumnFilter,
    pub tiers: TempTiers,
    pub sub_tables: Vec<SubTableLayout>,
}

fn fet_blocks_per_temp(device: &str) -> usize {
    if device.contains("03v3") {
        FET_03V3_BLOCKS_PER_TEMP
    } else if device.contains("06v0_nvt") {
        FET_06V0_NVT_BLOCKS_PER_TEMP
    } else {
        FET_06V0_BLOCKS_PER_TEMP
    }
}

impl FetLayout {
    pub fn iv(device: &str) -> Self {
        Self {
            key_column: "L (um)".to_string(),
            metadata: MetadataColumns::default(),
            unwanted: ColumnFilter {
                exact: vec!["Unnamed: 2".to_string(), "Ids".to_string()],
                containing: vec!["Id (A)".to_string(), "Rds".to_string()],
            },
            tiers: TempTiers::uniform(&FET_TEMPS, fet_blocks_per_temp(device)),
            sub_tables: vec![
                SubTableLayout {
                    span: ColumnSpan::Start {
                        offset: 0,
                        width: NUM_COLS_MEAS_VBS,
                    },
                    sweep: BiasVar::Vgs,
                    sweep_header: "vgs".to_string(),
                    step: BiasVar::Vbs,
                    constant: BiasVar::Vds,
                    output: OutputKind::Id,
                },
                SubTableLayout {
                    span: ColumnSpan::Start {
                        offset: NUM_COLS_MEAS_VBS,
                        width: NUM_COLS_MEAS_VGS,
                    },
                    sweep: BiasVar::Vds,
                    sweep_header: "vds (V)".to_string(),
                    step: BiasVar::Vgs,
                    constant: BiasVar::Vbs,
                    output: OutputKind::Id,
                },
                SubTableLayout {
                    span: ColumnSpan::End {
                        width: NUM_COLS_MEAS_VGS,
                    },
                    sweep: BiasVar::Vds,
                    sweep_header: "vds (V)".to_string(),
                    step: BiasVar::Vgs,
                    constant: BiasVar::Vbs,
                    output: OutputKind::Rds,
                },
            ],
        }
    }

    pub fn cv(device: &str) -> Self {
        Self {
            key_column: "L (um)".to_string(),
            metadata: MetadataColumns::default(),
            unwanted: ColumnFilter {
                exact: vec!["Unnamed: 2".to_string()],
                containing: vec!["Cgg (fF)".to_string()],
            },
            tiers: TempTiers::uniform(&FET_TEMPS, fet_blocks_per_temp(device)),
            sub_tables: vec![SubTableLayout {
                span: ColumnSpan::All,
                sweep: BiasVar::Vgs,
                sweep_header: "vgs (V)".to_string(),
                step: BiasVar::Vds,
                constant: BiasVar::Vbs,
                output: OutputKind::Cgg,
            }],
        }
    }

    pub fn outputs(&self) -> Vec<OutputKind> {
        let mut outputs = self.sub_tables.iter().map(|s| s.output).collect::<Vec<_>>();
        outputs.sort();
        outputs.dedup();
        outputs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapLayout {
    /// Column holding `"<device>\n(<W>u x<L>u )"` labels, one per block.
    pub label_column: String,
    /// Dropped together with the label column once labels are parsed.
    pub corner_column: String,
    pub sweep_column: String,
    pub output_column: String,
    pub unwanted: ColumnFilter,
    pub tiers: TempTiers,
}

impl Default for CapLayout {
    fn default() -> Self {
        Self {
            label_column: "Unnamed: 2".to_string(),
            corner_column: "corners".to_string(),
            sweep_column: "Vj".to_string(),
            output_column: "Cj".to_string(),
            unwanted: ColumnFilter {
                exact: vec!["w".to_string(), "l".to_string(), "CV (fF)".to_string()],
                containing: vec!["dummy_".to_string(), "Cj (fF)".to_string()],
            },
            tiers: TempTiers::uniform(&CAP_TEMPS, CAP_BLOCKS_PER_TEMP),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FamilyLayout {
    FetIv(FetLayout),
    FetCv(FetLayout),
    Cap(CapLayout),
}

impl FamilyLayout {
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FamilyLayout::FetIv(_) => "FET I-V",
            FamilyLayout::FetCv(_) => "FET C-V",
            FamilyLayout::Cap(_) => "capacitor C-V",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_follow_device_voltage() {
        assert_eq!(FetLayout::iv("nfet_03v3").tiers.total(), 75);
        assert_eq!(FetLayout::iv("nfet_06v0_nvt").tiers.total(), 36);
        assert_eq!(FetLayout::iv("pfet_06v0").tiers.total(), 60);
        assert_eq!(CapLayout::default().tiers.total(), 48);
    }

    #[test]
    fn test_tier_assignment_is_ordered() {
        let tiers = TempTiers::uniform(&FET_TEMPS, 2);
        assert_eq!(tiers.assign(6).unwrap(), vec![25, 25, -40, -40, 125, 125]);
        assert!(matches!(
            tiers.assign(5),
            Err(MeasError::TierMismatch {
                expected: 6,
                found: 5
            })
        ));
        assert!(TempTiers::split_evenly(&FET_TEMPS, 7).is_err());
        assert_eq!(TempTiers::split_evenly(&FET_TEMPS, 9).unwrap().total(), 9);
    }

    #[test]
    fn test_column_spans() {
        assert_eq!(
            ColumnSpan::Start {
                offset: 7,
                width: 8
            }
            .resolve(23)
            .unwrap(),
            7..15
        );
        assert_eq!(ColumnSpan::End { width: 8 }.resolve(23).unwrap(), 15..23);
        assert!(ColumnSpan::Start {
            offset: 20,
            width: 8
        }
        .resolve(23)
        .is_err());
    }

    #[test]
    fn test_layout_from_toml() {
        let layout = FamilyLayout::FetIv(FetLayout::iv("nfet_03v3"));
        let text = toml::to_string(&toml::Value::try_from(&layout).unwrap()).unwrap();
        let parsed: FamilyLayout = toml::from_str(&text).unwrap();
        assert_eq!(parsed, layout);
    }
}
