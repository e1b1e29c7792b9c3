//! Fan-out of independent simulations over a bounded worker pool.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::extract::writer::fmt_f64;
use crate::regression::netlist::{save_netlist, NetlistParams};
use crate::regression::simulated::{reshape_result, SimulatedRow};
use crate::regression::simulator::Simulator;
use crate::Result;

/// Twice the number of logical CPUs.
pub fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimTask {
    pub netlist: PathBuf,
    pub params: NetlistParams,
}

/// Outcome of one task. `rows` is `None` when the simulation failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SimRun {
    pub params: NetlistParams,
    pub rows: Option<Vec<SimulatedRow>>,
}

impl SimRun {
    #[inline]
    pub fn failed(&self) -> bool {
        self.rows.is_none()
    }
}

fn run_task(sim: &dyn Simulator, task: &SimTask) -> Result<Vec<SimulatedRow>> {
    let params = &task.params;
    save_netlist(&task.netlist, params)
        .with_context(|| format!("failed to write netlist {:?}", task.netlist))?;
    if let Some(dir) = params.result_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    sim.simulate(&task.netlist)?;

    if !params.result_path.exists() {
        bail!("simulation produced no result file {:?}", params.result_path);
    }
    reshape_result(&params.result_path, params.vbs.len())
}

/// Runs every task on a pool of `num_workers` threads.
///
/// A failing task never aborts the batch: it is logged and recorded as a run
/// without rows. Runs are returned in task order.
pub fn run_tasks(
    sim: &dyn Simulator,
    tasks: &[SimTask],
    num_workers: usize,
    bar: Option<&ProgressBar>,
) -> Result<Vec<SimRun>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers.max(1))
        .build()
        .context("failed to start simulation workers")?;

    let runs = pool.install(|| {
        tasks
            .par_iter()
            .map(|task| {
                let rows = match run_task(sim, task) {
                    Ok(rows) => Some(rows),
                    Err(e) => {
                        log::warn!("Test case generated an exception: {e:#}");
                        None
                    }
                };
                if let Some(bar) = bar {
                    bar.inc(1);
                }
                SimRun {
                    params: task.params.clone(),
                    rows,
                }
            })
            .collect::<Vec<_>>()
    });

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok(runs)
}

/// Writes the run manifest: one line per task with its result file, or
/// `None` for failed runs.
pub fn write_runs(path: impl AsRef<Path>, runs: &[SimRun]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["device", "temp", "length", "width", "mos_iv_simulated"])?;
    for run in runs {
        let p = &run.params;
        let result = if run.failed() {
            "None".to_string()
        } else {
            p.result_path.display().to_string()
        };
        writer.write_record([
            p.device.clone(),
            p.temp.to_string(),
            fmt_f64(p.length),
            fmt_f64(p.width),
            result,
        ])?;
    }
    writer.flush()?;
    Ok(())
}
