//! E-cheque リネーマー - メインエントリポイント

use anyhow::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // 環境変数の読み込み
    dotenvy::dotenv().ok();

    // ロギング初期化（RUST_LOG で調整）
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = echeque_renamer::AppConfig::from_env()?;
    tracing::info!(
        "起動: model={} mapping_file={:?} api_key_set={}",
        config.model,
        config.mapping_file,
        config.api_key.is_some()
    );

    // GUIアプリケーション起動
    echeque_renamer::gui::run(config)
}
