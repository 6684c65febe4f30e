//! APIキーの解決

use crate::config::AppConfig;

/// 画面入力のキーを優先し、無ければ環境変数のキーを使う
pub fn resolve_api_key(ui_value: &str, config: &AppConfig) -> Option<String> {
    let ui_value = ui_value.trim();
    if !ui_value.is_empty() {
        return Some(ui_value.to_string());
    }
    config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

/// キーの出どころ（ログにはこれだけを出す）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Ui,
    Env,
    Missing,
}

pub fn key_source(ui_value: &str, config: &AppConfig) -> KeySource {
    if !ui_value.trim().is_empty() {
        KeySource::Ui
    } else if resolve_api_key("", config).is_some() {
        KeySource::Env
    } else {
        KeySource::Missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_value_wins() {
        let config = AppConfig {
            api_key: Some("from-env".into()),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(" typed ", &config).as_deref(), Some("typed"));
        assert_eq!(resolve_api_key("  ", &config).as_deref(), Some("from-env"));
        assert_eq!(resolve_api_key("", &AppConfig::default()), None);
    }

    #[test]
    fn key_source_never_reveals_key() {
        let config = AppConfig {
            api_key: Some("AIzaSyENV-SECRET-9876".into()),
            ..Default::default()
        };
        assert_eq!(key_source("AIzaSyUI-SECRET-1234", &config), KeySource::Ui);
        assert_eq!(key_source(" ", &config), KeySource::Env);
        assert_eq!(key_source("", &AppConfig::default()), KeySource::Missing);

        let logged = format!("{:?}", key_source("AIzaSyUI-SECRET-1234", &config));
        assert!(!logged.contains("1234"));
        let logged = format!("{:?}", key_source("", &config));
        assert!(!logged.contains("9876"));
    }
}
