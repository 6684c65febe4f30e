//! 設定 - 環境変数（.env）からの読み込み

use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MAPPING_FILE: &str = "payee_mappings.csv";
pub const DEFAULT_PDFTOPPM: &str = "pdftoppm";
pub const DEFAULT_RENDER_ZOOM: f32 = 4.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("RENDER_ZOOM が不正です: {0}")]
    InvalidZoom(String),
}

/// アプリケーション設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini APIキー（画面から上書き可能）
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    /// 受取人マッピングCSV
    pub mapping_file: PathBuf,
    /// pdftoppm 実行ファイル
    pub pdftoppm: PathBuf,
    /// 描画倍率 (1.0 = 72dpi)
    pub render_zoom: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            mapping_file: PathBuf::from(DEFAULT_MAPPING_FILE),
            pdftoppm: PathBuf::from(DEFAULT_PDFTOPPM),
            render_zoom: DEFAULT_RENDER_ZOOM,
        }
    }
}

impl AppConfig {
    /// プロセス環境変数から読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から読み込む（空文字は未設定扱い）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let render_zoom = match get("RENDER_ZOOM") {
            Some(raw) => {
                let zoom: f32 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidZoom(raw.clone()))?;
                if !zoom.is_finite() || zoom <= 0.0 {
                    return Err(ConfigError::InvalidZoom(raw));
                }
                zoom
            }
            None => defaults.render_zoom,
        };

        Ok(Self {
            api_key: get("GEMINI_API_KEY"),
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            api_base: get("GEMINI_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            mapping_file: get("PAYEE_MAPPING_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.mapping_file),
            pdftoppm: get("PDFTOPPM_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.pdftoppm),
            render_zoom,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.mapping_file, PathBuf::from("payee_mappings.csv"));
        assert_eq!(config.render_zoom, 4.0);
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config =
            AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  "), ("GEMINI_MODEL", "")]))
                .unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "abc"),
            ("GEMINI_API_BASE", "http://localhost:9999/v1/"),
            ("RENDER_ZOOM", "2.5"),
            ("PDFTOPPM_PATH", "/opt/poppler/bin/pdftoppm"),
        ]))
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.api_base, "http://localhost:9999/v1");
        assert_eq!(config.render_zoom, 2.5);
        assert_eq!(config.pdftoppm, PathBuf::from("/opt/poppler/bin/pdftoppm"));
    }

    #[test]
    fn rejects_bad_zoom() {
        assert!(AppConfig::from_lookup(lookup(&[("RENDER_ZOOM", "abc")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("RENDER_ZOOM", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("RENDER_ZOOM", "-1")])).is_err());
    }
}
