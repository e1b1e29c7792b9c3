use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Converts foundry measurement sheets into tidy measurement and sweep tables",
    long_about = None,
    help_template(
        "{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
    )
)]
pub struct ExtractArgs {
    /// Input measurement sheet (.xlsx, .xls, .ods or .csv).
    #[arg(long = "excel_path")]
    pub excel_path: PathBuf,

    /// Device type, e.g. `nfet_03v3` or `cap_mim`.
    #[arg(long = "device_type")]
    pub device_type: String,

    /// Directory to which output files should be saved.
    #[arg(long = "output_dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// TOML file replacing the built-in sheet layout of the device family.
    #[arg(long)]
    pub layout: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Regresses simulated Id-Vgs curves against measured data",
    long_about = None,
    help_template(
        "{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
    )
)]
pub struct RegressionArgs {
    /// Number of simulations to run in parallel. Defaults to twice the number
    /// of logical CPUs.
    #[arg(long = "num_cores")]
    pub num_cores: Option<usize>,

    /// Path to TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_args() {
        let args = ExtractArgs::parse_from([
            "convert_foundry_csv",
            "--excel_path=data/nfet_03v3_iv.nl_out.xlsx",
            "--device_type=nfet_03v3",
        ]);
        assert_eq!(args.device_type, "nfet_03v3");
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(args.layout.is_none());
    }

    #[test]
    fn test_regression_args() {
        let args = RegressionArgs::parse_from(["models_regression", "--num_cores=4"]);
        assert_eq!(args.num_cores, Some(4));
        assert!(args.config.is_none());
    }
}
