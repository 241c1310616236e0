//! ログ初期化
//!
//! RUST_LOG が設定されていればそれを優先し、なければ `--verbose` の有無で
//! info / debug を切り替える。出力先は標準エラー。

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("density_ai_rust={0},density_ai={0},warn", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
