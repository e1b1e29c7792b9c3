fn main() {
    if let Err(e) = pdkmeas::cli::run_regression() {
        log::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
