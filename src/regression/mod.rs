//! Regression of simulated Id-Vgs curves against foundry measurements.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context};
use arcstr::ArcStr;
use indicatif::ProgressBar;

use crate::cli::progress::{Step, StepContext, TaskKey};
use crate::config::family::TempTiers;
use crate::config::{DeviceConfig, RegressionConfig};
use crate::paths::{
    out_device_dir, out_error_analysis, out_netlist, out_runs, out_simulated, out_summary,
};
use crate::table::read_sheet;
use crate::Result;

use self::compare::{compare_curve, write_error_analysis};
use self::measured::{extract_measured, MeasuredCurve};
use self::netlist::{model_name, NetlistParams};
use self::pool::{run_tasks, write_runs, SimTask};
use self::report::{DeviceReport, RegressionReport};
use self::simulator::Simulator;

pub mod compare;
pub mod measured;
pub mod netlist;
pub mod pool;
pub mod report;
pub mod simulated;
pub mod simulator;

pub struct RegressionParams<'a> {
    pub config: &'a RegressionConfig,
    pub simulator: &'a dyn Simulator,
    pub num_workers: usize,
    pub ctx: Option<&'a mut StepContext>,
}

/// Progress steps of a regression run. Devices without a data file are
/// shown but disabled.
pub fn regression_steps(config: &RegressionConfig) -> Vec<Step> {
    let mut steps = vec![Step::new(
        TaskKey::CheckSimulator,
        format!("Check {}", config.simulator),
    )];
    steps.extend(config.devices.iter().map(|device| {
        Step::new(
            TaskKey::Regress(ArcStr::from(device.name.as_str())),
            format!("Regress {}", device.name),
        )
        .disabled(!config.data_path(&device.name).exists())
    }));
    steps.push(Step::new(TaskKey::WriteSummary, "Write summary"));
    steps
}

/// Runs the regression of every configured device and writes the summary.
///
/// A device that cannot be regressed is reported as such; only a missing
/// simulator or an unwritable work directory abort the run.
pub fn run_regression(params: RegressionParams) -> Result<RegressionReport> {
    let RegressionParams {
        config,
        simulator,
        num_workers,
        mut ctx,
    } = params;

    let version = simulator
        .version()
        .with_context(|| format!("{} is not available", config.simulator))?;
    log::info!("Found simulator: {version}");
    try_finish_task!(ctx, TaskKey::CheckSimulator);

    fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("failed to create {:?}", config.work_dir))?;

    let mut report = RegressionReport::new(config.pass_threshold);
    for device in config.devices.iter() {
        let data_path = config.data_path(&device.name);
        if !data_path.exists() {
            log::info!(
                "No measured data for {} at {:?}, skipping",
                device.name,
                data_path
            );
            report.push(DeviceReport::skipped(
                &device.name,
                format!("no data file {data_path:?}"),
            ));
            continue;
        }

        log::info!("######");
        log::info!("Running regression for {}", device.name);

        let bar = ctx.as_ref().map(|ctx| ctx.add_bar(0));
        let device_report = match regress_device(
            config,
            device,
            &data_path,
            simulator,
            num_workers,
            bar.as_ref(),
        ) {
            Ok(device_report) => device_report,
            Err(e) => {
                if let Some(bar) = bar {
                    bar.finish_and_clear();
                }
                log::error!("Regression of {} failed: {e:#}", device.name);
                DeviceReport::error(&device.name, format!("{e:#}"))
            }
        };

        if device_report.passed() {
            log::info!("{} regression test passed", device.name);
        } else {
            log::error!("{} regression test failed", device.name);
        }
        report.push(device_report);
        try_finish_task!(ctx, TaskKey::Regress(ArcStr::from(device.name.as_str())));
    }

    report.write_json(out_summary(&config.work_dir))?;
    try_finish_task!(ctx, TaskKey::WriteSummary);

    Ok(report)
}

fn sim_task(device_dir: &Path, device: &DeviceConfig, curve: &MeasuredCurve) -> Result<SimTask> {
    let (vgs_start, vgs_stop, vgs_step) = curve.vgs_sweep().ok_or_else(|| {
        anyhow!(
            "no measured sweep for W={:?} L={:?} T={}",
            curve.width,
            curve.length,
            curve.temp
        )
    })?;

    let params = NetlistParams::builder()
        .device(device.name.clone())
        .model(model_name(&device.name))
        .width(curve.width)
        .length(curve.length)
        .temp(curve.temp)
        .vbs(device.vbs.clone())
        .vgs_start(vgs_start)
        .vgs_stop(vgs_stop)
        .vgs_step(vgs_step)
        .result_path(out_simulated(
            device_dir,
            curve.width,
            curve.length,
            curve.temp,
        ))
        .build()?;

    Ok(SimTask {
        netlist: out_netlist(
            device_dir,
            &device.name,
            curve.width,
            curve.length,
            curve.temp,
        ),
        params,
    })
}

fn regress_device(
    config: &RegressionConfig,
    device: &DeviceConfig,
    data_path: &Path,
    simulator: &dyn Simulator,
    num_workers: usize,
    bar: Option<&ProgressBar>,
) -> Result<DeviceReport> {
    let device_dir = out_device_dir(&config.work_dir, &device.name);
    if device_dir.exists() {
        fs::remove_dir_all(&device_dir)
            .with_context(|| format!("failed to clear {device_dir:?}"))?;
    }
    fs::create_dir_all(&device_dir)?;

    let sheet = read_sheet(data_path).with_context(|| format!("failed to read {data_path:?}"))?;
    let count = sheet.count_non_empty(sheet.require("L (um)")?);
    let temps = TempTiers::split_evenly(&config.temps, count)?.assign(count)?;
    let curves = extract_measured(&sheet, device, &temps)?;
    log::info!(
        "# of data points for {}: {}",
        device.name,
        curves.iter().map(|c| c.rows.len()).sum::<usize>()
    );

    let mut measured = Vec::with_capacity(curves.len());
    let mut tasks = Vec::with_capacity(curves.len());
    for curve in curves.iter() {
        match sim_task(&device_dir, device, curve) {
            Ok(task) => {
                measured.push(curve);
                tasks.push(task);
            }
            Err(e) => log::warn!("Test case generated an exception: {e:#}"),
        }
    }

    if let Some(bar) = bar {
        bar.set_length(tasks.len() as u64);
        bar.set_message(device.name.clone());
    }
    let runs = run_tasks(simulator, &tasks, num_workers, bar)?;
    write_runs(out_runs(&device_dir), &runs)?;

    let failed = curves.len() - runs.iter().filter(|r| !r.failed()).count();
    if failed > 0 {
        log::warn!(
            "{failed} of {} simulations failed for {}",
            curves.len(),
            device.name
        );
    }

    let rows = measured
        .into_iter()
        .zip(runs.iter())
        .filter_map(|(curve, run)| Some(compare_curve(curve, run.rows.as_ref()?)))
        .flatten()
        .collect::<Vec<_>>();
    write_error_analysis(out_error_analysis(&device_dir), &rows, device.vbs.len())?;

    let device_report = DeviceReport::new(
        &device.name,
        &rows,
        curves.len(),
        failed,
        config.pass_threshold,
    );
    match &device_report.errors {
        Some(errors) => {
            log::info!("Min error for {}: {:.4} %", device.name, errors.min);
            log::info!("Max error for {}: {:.4} %", device.name, errors.max);
            log::info!("Mean error for {}: {:.4} %", device.name, errors.mean);
        }
        None => log::warn!("No comparable rows for {}", device.name),
    }
    if device_report.undefined_rows > 0 {
        log::warn!(
            "{} rows of {} have zero measured current and no defined error",
            device_report.undefined_rows,
            device.name
        );
    }

    Ok(device_report)
}
