use std::io::Write;

use anyhow::{bail, Context};
use clap::Parser;

use crate::cli::args::{ExtractArgs, RegressionArgs};
use crate::cli::progress::{Step, StepContext, TaskKey};
use crate::config::family::FamilyLayout;
use crate::config::{parse_config, RegressionConfig};
use crate::extract::{extract_device, ExtractParams};
use crate::paths::out_summary;
use crate::regression::pool::default_num_workers;
use crate::regression::simulator::Ngspice;
use crate::regression::{regression_steps, RegressionParams};
use crate::Result;

pub mod args;
pub mod progress;

pub const BANNER: &str = r"
               _ _
 _ __   __| | | ___ __ ___   ___  __ _ ___
| '_ \ / _` | |/ / '_ ` _ \ / _ \/ _` / __|
| |_) | (_| |   <| | | | | |  __/ (_| \__ \
| .__/ \__,_|_|\_\_| |_| |_|\___|\__,_|___/
|_|

PDKMEAS v0.1
";

/// Initializes `env_logger` with a `debug` default filter.
///
/// `RUST_LOG` overrides the filter. Calling this more than once is a no-op.
pub fn setup_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} | {:<7} | {}",
                buf.timestamp(),
                record.level(),
                record.args()
            )
        })
        .try_init();
}

pub fn run_extract() -> Result<()> {
    let args = ExtractArgs::parse();
    setup_logging();

    println!("{BANNER}");

    if !args.excel_path.exists() {
        bail!("The input file {:?} does not exist", args.excel_path);
    }
    let layout = args
        .layout
        .as_ref()
        .map(|path| {
            FamilyLayout::load(path).with_context(|| format!("failed to load layout {path:?}"))
        })
        .transpose()?;

    println!("Input file: {:?}", &args.excel_path);
    println!("Device type: {}", &args.device_type);
    if let Some(layout) = &layout {
        println!("Layout override: {}", layout.name());
    }

    let mut ctx = StepContext::new(vec![
        Step::new(TaskKey::ReadSheet, "Read measurement sheet"),
        Step::new(TaskKey::Reshape, "Reshape measurements"),
        Step::new(TaskKey::WriteOutputs, "Write output tables"),
    ]);

    let res = extract_device(ExtractParams {
        input: &args.excel_path,
        device: &args.device_type,
        out_dir: &args.output_dir,
        layout,
        ctx: Some(&mut ctx),
    });

    let written = ctx.check(res)?;
    println!("Artifacts saved to:");
    for path in written {
        println!("\t{path:?}");
    }

    Ok(())
}

pub fn run_regression() -> Result<()> {
    let args = RegressionArgs::parse();
    setup_logging();

    println!("{BANNER}");

    let config = match &args.config {
        Some(path) => {
            println!("Reading configuration file...\n");
            parse_config(path).with_context(|| format!("failed to read {path:?}"))?
        }
        None => RegressionConfig::default(),
    };
    let num_workers = args.num_cores.unwrap_or_else(default_num_workers);

    println!("Regression parameters:");
    println!("\tWork directory: {:?}", config.work_dir);
    println!("\tData directory: {:?}", config.data_dir);
    println!("\tDevices: {}", config.devices.len());
    println!("\tPass threshold: {} %", config.pass_threshold);
    println!("\tWorkers: {num_workers}");

    let simulator = Ngspice::new(config.simulator.clone());
    let mut ctx = StepContext::new(regression_steps(&config));

    let res = crate::regression::run_regression(RegressionParams {
        config: &config,
        simulator: &simulator,
        num_workers,
        ctx: Some(&mut ctx),
    });

    let report = ctx.check(res)?;
    println!("{}", report.to_text());
    println!("Summary saved to: {:?}\n", out_summary(&config.work_dir));

    Ok(())
}
