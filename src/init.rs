use env_logger::Builder;
use log::LevelFilter;

/// 依照命令列旗標初始化日誌系統
///
/// 預設 Info；`-v` 提升為 Debug，`-s` 降為 Error。
/// `RUST_LOG` 環境變數仍可覆寫
pub fn init_logger(verbose: bool, silent: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if silent {
        LevelFilter::Error
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    builder.filter_level(level);
    builder.parse_default_env();
    let _ = builder.try_init();
}
