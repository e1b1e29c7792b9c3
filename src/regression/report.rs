use std::fmt::Write;
use std::path::Path;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::regression::compare::ErrorRow;
use crate::Result;

/// Errors above this percentage are reported as this percentage.
pub const ERROR_CLAMP: f64 = 100.0;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl ErrorSummary {
    /// Rolls up the defined row errors. `None` if no row has a defined error.
    pub fn from_rows(rows: &[ErrorRow]) -> Option<Self> {
        let errors = rows.iter().filter_map(|r| r.error).collect::<Vec<_>>();
        if errors.is_empty() {
            return None;
        }
        let min = errors.iter().copied().fold(f64::INFINITY, f64::min);
        let max = errors.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = errors.iter().sum::<f64>() / errors.len() as f64;
        Some(Self {
            min: min.min(ERROR_CLAMP),
            max: max.min(ERROR_CLAMP),
            mean: mean.min(ERROR_CLAMP),
        })
    }

    #[inline]
    pub fn passes(&self, threshold: f64) -> bool {
        self.max < threshold
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Passed,
    Failed,
    /// No measured data was found for the device.
    Skipped,
    /// The device could not be regressed at all.
    Error,
}

impl DeviceStatus {
    fn colored(self) -> colored::ColoredString {
        match self {
            DeviceStatus::Passed => "Passed".green().bold(),
            DeviceStatus::Failed => "Failed".bright_white().on_red().bold(),
            DeviceStatus::Skipped => "Skipped".yellow().bold(),
            DeviceStatus::Error => "Error".red().bold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    pub device: String,
    pub status: DeviceStatus,
    pub errors: Option<ErrorSummary>,
    /// Compared rows with a defined error.
    pub rows: usize,
    /// Compared rows whose error is undefined (zero measured current).
    pub undefined_rows: usize,
    pub simulations: usize,
    pub failed_simulations: usize,
    pub message: Option<String>,
}

impl DeviceReport {
    pub fn new(
        device: impl Into<String>,
        rows: &[ErrorRow],
        simulations: usize,
        failed_simulations: usize,
        threshold: f64,
    ) -> Self {
        let errors = ErrorSummary::from_rows(rows);
        let defined = rows.iter().filter(|r| r.error.is_some()).count();
        let status = match errors {
            Some(errors) if errors.passes(threshold) => DeviceStatus::Passed,
            _ => DeviceStatus::Failed,
        };
        let message = errors
            .is_none()
            .then(|| "no comparable rows".to_string());
        Self {
            device: device.into(),
            status,
            errors,
            rows: defined,
            undefined_rows: rows.len() - defined,
            simulations,
            failed_simulations,
            message,
        }
    }

    pub fn skipped(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::without_rows(device, DeviceStatus::Skipped, message)
    }

    pub fn error(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::without_rows(device, DeviceStatus::Error, message)
    }

    fn without_rows(
        device: impl Into<String>,
        status: DeviceStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            status,
            errors: None,
            rows: 0,
            undefined_rows: 0,
            simulations: 0,
            failed_simulations: 0,
            message: Some(message.into()),
        }
    }

    #[inline]
    pub fn passed(&self) -> bool {
        self.status == DeviceStatus::Passed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub pass_threshold: f64,
    pub devices: Vec<DeviceReport>,
}

impl RegressionReport {
    pub fn new(pass_threshold: f64) -> Self {
        Self {
            pass_threshold,
            devices: Vec::new(),
        }
    }

    pub fn push(&mut self, report: DeviceReport) {
        self.devices.push(report);
    }

    pub fn all_passed(&self) -> bool {
        self.devices
            .iter()
            .all(|d| d.passed() || d.status == DeviceStatus::Skipped)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<20} {:>10} {:>10} {:>10} {:>6} {:>6}  status",
            "device", "min (%)", "max (%)", "mean (%)", "rows", "sims"
        );
        for d in self.devices.iter() {
            let fmt = |f: fn(&ErrorSummary) -> f64| {
                d.errors
                    .as_ref()
                    .map(|e| format!("{:.4}", f(e)))
                    .unwrap_or_else(|| "-".to_string())
            };
            let _ = write!(
                out,
                "{:<20} {:>10} {:>10} {:>10} {:>6} {:>6}  {}",
                d.device,
                fmt(|e| e.min),
                fmt(|e| e.max),
                fmt(|e| e.mean),
                d.rows,
                format!("{}/{}", d.simulations - d.failed_simulations, d.simulations),
                d.status.colored(),
            );
            if let Some(msg) = &d.message {
                let _ = write!(out, " ({msg})");
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::regression::compare::StepError;

    fn row(error: Option<f64>) -> ErrorRow {
        ErrorRow {
            width: 10.0,
            length: 0.28,
            temp: 25,
            vgs: 1.0,
            simulated: vec![1.0],
            measured: vec![1.0],
            steps: vec![error.map(StepError::Value).unwrap_or(StepError::Undefined)],
            error,
        }
    }

    #[test]
    fn test_summary_uses_true_minimum() {
        let rows = [row(Some(0.5)), row(Some(1.5)), row(None), row(Some(1.0))];
        let summary = ErrorSummary::from_rows(&rows).unwrap();
        assert_relative_eq!(summary.min, 0.5);
        assert_relative_eq!(summary.max, 1.5);
        assert_relative_eq!(summary.mean, 1.0);
        assert!(summary.passes(2.0));
        assert!(!summary.passes(1.5));
    }

    #[test]
    fn test_summary_clamps() {
        let rows = [row(Some(250.0)), row(Some(350.0))];
        let summary = ErrorSummary::from_rows(&rows).unwrap();
        assert_eq!(summary.min, 100.0);
        assert_eq!(summary.max, 100.0);
        assert_eq!(summary.mean, 100.0);
    }

    #[test]
    fn test_device_report() {
        let rows = [row(Some(0.5)), row(None)];
        let report = DeviceReport::new("nfet_03v3_iv", &rows, 3, 1, 2.0);
        assert!(report.passed());
        assert_eq!(report.rows, 1);
        assert_eq!(report.undefined_rows, 1);

        let report = DeviceReport::new("nfet_03v3_iv", &[row(None)], 3, 0, 2.0);
        assert_eq!(report.status, DeviceStatus::Failed);
        assert!(report.message.is_some());
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let mut report = RegressionReport::new(2.0);
        report.push(DeviceReport::skipped("pfet_03v3_iv", "missing data file"));
        report.write_json(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"status\": \"skipped\""));
        let parsed: RegressionReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, report);
        assert!(report.to_text().contains("pfet_03v3_iv"));
    }
}
