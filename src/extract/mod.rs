//! Conversion of foundry measurement sheets into tidy CSV tables.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::cli::progress::{StepContext, TaskKey};
use crate::config::family::{CapLayout, FamilyLayout, FetLayout};
use crate::error::MeasError;
use crate::table::read_sheet;
use crate::Result;

pub mod cap;
pub mod fet;
pub mod header;
pub mod reshape;
pub mod writer;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeviceFamily {
    FetIv,
    FetCv,
    Cap,
}

impl DeviceFamily {
    /// Picks the sheet layout from the device type. FET sheets are told apart
    /// by their file name: I-V sheets have `iv` in it.
    ///
    /// Only the file name is inspected, so a directory such as `drivers/`
    /// does not turn a C-V sheet into an I-V one.
    pub fn route(device: &str, input: &Path) -> std::result::Result<Self, MeasError> {
        if device.contains("fet") {
            let is_iv = input
                .file_name()
                .map(|name| name.to_string_lossy().contains("iv"))
                .unwrap_or(false);
            if is_iv {
                Ok(DeviceFamily::FetIv)
            } else {
                Ok(DeviceFamily::FetCv)
            }
        } else if device.contains("cap_mos") || device.contains("cap_mim") {
            Ok(DeviceFamily::Cap)
        } else {
            Err(MeasError::UnknownDevice(device.to_string()))
        }
    }

    pub fn default_layout(self, device: &str) -> FamilyLayout {
        match self {
            DeviceFamily::FetIv => FamilyLayout::FetIv(FetLayout::iv(device)),
            DeviceFamily::FetCv => FamilyLayout::FetCv(FetLayout::cv(device)),
            DeviceFamily::Cap => FamilyLayout::Cap(CapLayout::default()),
        }
    }
}

pub struct ExtractParams<'a> {
    pub input: &'a Path,
    pub device: &'a str,
    pub out_dir: &'a Path,
    /// Replaces the built-in layout of the device's family.
    pub layout: Option<FamilyLayout>,
    pub ctx: Option<&'a mut StepContext>,
}

/// Reads one foundry sheet and writes its measurement and sweep tables.
///
/// Returns the paths of the files written.
pub fn extract_device(params: ExtractParams) -> Result<Vec<PathBuf>> {
    let ExtractParams {
        input,
        device,
        out_dir,
        layout,
        mut ctx,
    } = params;

    let family = DeviceFamily::route(device, input)?;
    let layout = layout.unwrap_or_else(|| family.default_layout(device));
    log::info!(
        "Starting data extraction from {:?} sheet for {device} device ({} layout)",
        input,
        layout.name()
    );

    let sheet = read_sheet(input).with_context(|| format!("failed to read {input:?}"))?;
    try_finish_task!(ctx, TaskKey::ReadSheet);

    let written = match &layout {
        FamilyLayout::FetIv(fet) | FamilyLayout::FetCv(fet) => {
            let points = fet::extract_fets(&sheet, device, fet)
                .with_context(|| format!("failed to reshape {input:?}"))?;
            try_finish_task!(ctx, TaskKey::Reshape);
            writer::write_fet_outputs(&points, device, &fet.outputs(), out_dir)?
        }
        FamilyLayout::Cap(cap) => {
            let points = cap::extract_caps(&sheet, cap)
                .with_context(|| format!("failed to reshape {input:?}"))?;
            try_finish_task!(ctx, TaskKey::Reshape);
            writer::write_cap_outputs(&points, device, cap, out_dir)?
        }
    };
    try_finish_task!(ctx, TaskKey::WriteOutputs);

    Ok(written)
}
