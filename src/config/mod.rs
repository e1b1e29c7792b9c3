use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::family::{Polarity, FET_TEMPS};
use crate::Result;

pub mod family;

pub const DEFAULT_PASS_THRESHOLD: f64 = 2.0;

pub const NMOS_03V3_VBS: [f64; 5] = [0.0, -0.825, -1.65, -2.48, -3.3];
pub const PMOS_03V3_VBS: [f64; 5] = [0.0, 0.825, 1.65, 2.48, 3.3];
pub const NMOS_06V0_VBS: [f64; 5] = [0.0, -0.75, -1.5, -2.25, -3.0];
pub const PMOS_06V0_VBS: [f64; 5] = [0.0, 0.75, 1.5, 2.25, 3.0];

/// Settings of a model regression run.
///
/// Every field has a default, so an empty TOML file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Root of all generated files; one sub-directory per device.
    pub work_dir: PathBuf,
    /// Directory holding the measured data workbooks.
    pub data_dir: PathBuf,
    /// Workbook file name; `{device}` is replaced by the device name.
    pub data_file: String,
    /// A device passes when its maximum row error is below this percentage.
    pub pass_threshold: f64,
    /// Temperature tiers, in block order.
    pub temps: Vec<i32>,
    pub simulator: String,
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    /// Body-bias steps of the Id-Vgs measurement, in column order.
    pub vbs: Vec<f64>,
}

impl DeviceConfig {
    pub fn new(name: impl Into<String>, vbs: &[f64]) -> Self {
        Self {
            name: name.into(),
            vbs: vbs.to_vec(),
        }
    }

    #[inline]
    pub fn polarity(&self) -> Polarity {
        Polarity::from_device(&self.name)
    }
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("mos_iv_regr"),
            data_dir: PathBuf::from("../../180MCU_SPICE_DATA/MOS"),
            data_file: "{device}.nl_out.xlsx".to_string(),
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            temps: FET_TEMPS.to_vec(),
            simulator: "ngspice".to_string(),
            devices: default_devices(),
        }
    }
}

impl RegressionConfig {
    pub fn data_path(&self, device: &str) -> PathBuf {
        self.data_dir
            .join(self.data_file.replace("{device}", device))
    }
}

pub fn default_devices() -> Vec<DeviceConfig> {
    vec![
        DeviceConfig::new("nfet_03v3_iv", &NMOS_03V3_VBS),
        DeviceConfig::new("pfet_03v3_iv", &PMOS_03V3_VBS),
        DeviceConfig::new("nfet_06v0_iv", &NMOS_06V0_VBS),
        DeviceConfig::new("pfet_06v0_iv", &PMOS_06V0_VBS),
        DeviceConfig::new("nfet_06v0_nvt_iv", &NMOS_06V0_VBS),
        DeviceConfig::new("nfet_03v3_dss_iv", &NMOS_03V3_VBS),
        DeviceConfig::new("pfet_03v3_dss_iv", &PMOS_03V3_VBS),
        DeviceConfig::new("nfet_06v0_dss_iv", &NMOS_06V0_VBS),
        DeviceConfig::new("pfet_06v0_dss_iv", &PMOS_06V0_VBS),
    ]
}

pub fn parse_config(path: impl AsRef<Path>) -> Result<RegressionConfig> {
    let contents = fs::read_to_string(path)?;
    let data = toml::from_str(&contents)?;
    Ok(data)
}
