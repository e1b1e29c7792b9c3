use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context};

use crate::paths::out_sim_log;
use crate::Result;

/// An external circuit simulator run in batch mode.
pub trait Simulator: Send + Sync {
    /// Version banner of the simulator; fails if it cannot be run.
    fn version(&self) -> Result<String>;

    /// Simulates `netlist`. The netlist itself decides where results go.
    fn simulate(&self, netlist: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Ngspice {
    executable: String,
}

impl Ngspice {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl Default for Ngspice {
    fn default() -> Self {
        Self::new("ngspice")
    }
}

impl Simulator for Ngspice {
    fn version(&self) -> Result<String> {
        let output = Command::new(&self.executable)
            .arg("-v")
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("{} is not found", self.executable))?;

        let version = String::from_utf8_lossy(&output.stdout);
        let version = version.trim();
        if version.is_empty() {
            bail!("{} did not report a version", self.executable);
        }
        Ok(version
            .lines()
            .find(|line| line.to_lowercase().contains("ngspice"))
            .unwrap_or(version)
            .trim_matches(|c: char| c == '*' || c.is_whitespace())
            .to_string())
    }

    fn simulate(&self, netlist: &Path) -> Result<()> {
        let log = out_sim_log(netlist);
        let status = Command::new(&self.executable)
            .arg("-b")
            .arg("-a")
            .arg(netlist)
            .arg("-o")
            .arg(&log)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("failed to run {}", self.executable))?;

        if !status.success() {
            return Err(anyhow!(
                "{} exited with {status} on {:?}; see {:?}",
                self.executable,
                netlist,
                log
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable() {
        let sim = Ngspice::new("definitely-not-a-simulator");
        assert!(sim.version().is_err());
        assert!(sim.simulate(Path::new("netlist.spice")).is_err());
    }

    #[test]
    #[ignore = "requires ngspice"]
    fn test_ngspice_version() {
        let version = Ngspice::default().version().unwrap();
        assert!(version.to_lowercase().contains("ngspice"));
    }
}
