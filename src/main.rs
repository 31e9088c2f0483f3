use clap::Parser;
use console::style;
use hls_packager::cli::CliArgs;
use hls_packager::component::HlsPackager;
use hls_packager::config::PackagingConfig;
use hls_packager::init::init_logger;
use hls_packager::signal::setup_shutdown_signal;
use log::{info, warn};
use std::process::ExitCode;

/// 任一檔案處理失敗時的結束代碼
const FAILURE_EXIT_CODE: u8 = 126;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logger(args.verbose, args.silent);
    let shutdown_signal = setup_shutdown_signal();

    let config = match PackagingConfig::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e}", style("設定錯誤:").red().bold());
            return ExitCode::from(FAILURE_EXIT_CODE);
        }
    };

    let packager = HlsPackager::new(config, shutdown_signal, args.silent);
    match packager.run(&args.inputs) {
        Ok(report) if report.failed == 0 => {
            info!("程式正常結束");
            ExitCode::SUCCESS
        }
        Ok(report) => {
            warn!("有 {} 個檔案處理失敗", report.failed);
            ExitCode::from(FAILURE_EXIT_CODE)
        }
        Err(e) => {
            eprintln!("{} {e:#}", style("錯誤:").red().bold());
            ExitCode::from(FAILURE_EXIT_CODE)
        }
    }
}
