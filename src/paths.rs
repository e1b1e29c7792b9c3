use std::path::{Path, PathBuf};

pub fn out_meas(work_dir: impl AsRef<Path>, device: &str, tag: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{device}_meas_{tag}.csv"))
}

pub fn out_sweeps(work_dir: impl AsRef<Path>, device: &str, tag: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{device}_sweeps_{tag}.csv"))
}

pub fn out_device_dir(work_dir: impl AsRef<Path>, device: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(device)
}

pub fn out_netlist(
    device_dir: impl AsRef<Path>,
    device: &str,
    width: f64,
    length: f64,
    temp: i32,
) -> PathBuf {
    PathBuf::from(device_dir.as_ref())
        .join(format!("{device}_netlists"))
        .join(format!("netlist_w{width:?}_l{length:?}_t{temp}.spice"))
}

pub fn out_simulated(device_dir: impl AsRef<Path>, width: f64, length: f64, temp: i32) -> PathBuf {
    PathBuf::from(device_dir.as_ref())
        .join("simulated_Id")
        .join(format!("T{temp}_simulated_L{length:?}_W{width:?}.csv"))
}

pub fn out_sim_log(netlist: impl AsRef<Path>) -> PathBuf {
    let mut log = netlist.as_ref().as_os_str().to_owned();
    log.push(".log");
    PathBuf::from(log)
}

pub fn out_runs(device_dir: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(device_dir.as_ref()).join("simulated_runs.csv")
}

pub fn out_error_analysis(device_dir: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(device_dir.as_ref()).join("error_analysis.csv")
}

pub fn out_summary(work_dir: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join("regression_summary.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regression_paths() {
        let dir = out_device_dir("mos_iv_regr", "nfet_03v3_iv");
        assert_eq!(dir, PathBuf::from("mos_iv_regr/nfet_03v3_iv"));
        assert_eq!(
            out_netlist(&dir, "nfet_03v3_iv", 10.0, 0.28, -40),
            dir.join("nfet_03v3_iv_netlists/netlist_w10.0_l0.28_t-40.spice")
        );
        assert_eq!(
            out_simulated(&dir, 10.0, 0.28, 25),
            dir.join("simulated_Id/T25_simulated_L0.28_W10.0.csv")
        );
        assert_eq!(
            out_sim_log("a/netlist.spice"),
            PathBuf::from("a/netlist.spice.log")
        );
    }
}
