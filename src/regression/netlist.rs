use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tera::Context;

use crate::config::family::Polarity;
use crate::{Result, TEMPLATES};

/// Source/drain diffusion extension, in microns.
pub const DIFF_EXT: f64 = 0.24;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Debug))]
pub struct NetlistParams {
    pub device: String,
    /// Model name; the device name without its `_iv` suffix.
    #[builder(setter(into))]
    pub model: String,
    /// Width in microns.
    pub width: f64,
    /// Length in microns.
    pub length: f64,
    pub temp: i32,
    pub vbs: Vec<f64>,
    pub vgs_start: f64,
    pub vgs_stop: f64,
    pub vgs_step: f64,
    /// File the simulator writes its sweep results to.
    pub result_path: PathBuf,
}

impl NetlistParams {
    #[inline]
    pub fn builder() -> NetlistParamsBuilder {
        NetlistParamsBuilder::default()
    }
}

pub fn model_name(device: &str) -> &str {
    device.strip_suffix("_iv").unwrap_or(device)
}

#[derive(Serialize)]
struct NetlistContext<'a> {
    #[serde(flatten)]
    params: &'a NetlistParams,
    #[serde(rename = "AD")]
    ad: f64,
    #[serde(rename = "PD")]
    pd: f64,
    #[serde(rename = "AS")]
    r#as: f64,
    #[serde(rename = "PS")]
    ps: f64,
}

impl<'a> NetlistContext<'a> {
    fn new(params: &'a NetlistParams) -> Self {
        let area = params.width * DIFF_EXT;
        let perimeter = 2.0 * (params.width + DIFF_EXT);
        Self {
            params,
            ad: area,
            pd: perimeter,
            r#as: area,
            ps: perimeter,
        }
    }
}

/// Template for `device`: `<device>.spice` if one exists, otherwise the
/// generic template of its polarity.
pub fn template_name(device: &str) -> String {
    let specific = format!("{device}.spice");
    if TEMPLATES.get_template_names().any(|name| name == specific) {
        specific
    } else {
        format!("{}_iv.spice", Polarity::from_device(device).as_str())
    }
}

pub fn generate_netlist(params: &NetlistParams) -> Result<String> {
    let template = template_name(&params.device);
    let ctx = Context::from_serialize(NetlistContext::new(params))?;
    Ok(TEMPLATES.render(&template, &ctx)?)
}

pub fn save_netlist(path: impl AsRef<Path>, params: &NetlistParams) -> Result<()> {
    let netlist = generate_netlist(params)?;

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, netlist)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(device: &str) -> NetlistParams {
        NetlistParams::builder()
            .device(device.to_string())
            .model(model_name(device))
            .width(10.0)
            .length(0.28)
            .temp(-40)
            .vbs(vec![0.0, -0.825])
            .vgs_start(0.0)
            .vgs_stop(3.3)
            .vgs_step(0.05)
            .result_path(PathBuf::from("out/T-40_simulated_L0.28_W10.0.csv"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_template_fallback() {
        assert_eq!(template_name("nfet_03v3_iv"), "nfet_iv.spice");
        assert_eq!(template_name("pfet_06v0_dss_iv"), "pfet_iv.spice");
        assert_eq!(model_name("nfet_06v0_nvt_iv"), "nfet_06v0_nvt");
    }

    #[test]
    fn test_generate_netlist() {
        let netlist = generate_netlist(&params("nfet_03v3_iv")).unwrap();
        assert!(netlist.contains("nfet_03v3"));
        assert!(netlist.contains(".temp -40"));
        assert!(netlist.contains("out/T-40_simulated_L0.28_W10.0.csv"));
        assert!(netlist.contains("ad=2.4"));
        assert!(netlist.contains("pd=20.4"));
        assert!(netlist.contains("-0.825"));
    }

    #[test]
    fn test_builder_requires_fields() {
        assert!(NetlistParams::builder()
            .device("nfet_03v3_iv".to_string())
            .build()
            .is_err());
    }
}
