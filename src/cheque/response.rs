//! Gemini 応答の解析

use super::ChequeInfo;
use serde_json::Value;
use thiserror::Error;

/// ファイル名生成に必要なフィールド
pub const REQUIRED_FIELDS: &[&str] = &[
    "date",
    "payee",
    "key_identifier",
    "payer",
    "currency",
    "is_trailer_fee",
    "is_management_fee",
];

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("JSONの解析に失敗: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
    #[error("JSONオブジェクトではありません")]
    NotAnObject { raw: String },
    #[error("必須フィールドが不足しているためファイル名を生成できません: {}", missing.join(", "))]
    MissingFields { missing: Vec<String>, pretty: String },
    #[error("フィールドの型が不正です: {source}")]
    InvalidField {
        #[source]
        source: serde_json::Error,
        pretty: String,
    },
}

impl ResponseError {
    /// 画面表示用のテキスト（整形JSONまたは生の応答）
    pub fn display_text(&self) -> &str {
        match self {
            Self::InvalidJson { raw, .. } | Self::NotAnObject { raw } => raw,
            Self::MissingFields { pretty, .. } | Self::InvalidField { pretty, .. } => pretty,
        }
    }
}

/// 解析済みの応答
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub json: Value,
    pub pretty: String,
    pub info: ChequeInfo,
}

/// Markdown のコードフェンスを取り除く
fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// 応答テキストを解析
pub fn parse_response(raw: &str) -> Result<ParsedResponse, ResponseError> {
    let body = strip_code_fence(raw);

    let json: Value = serde_json::from_str(body).map_err(|source| ResponseError::InvalidJson {
        source,
        raw: raw.to_string(),
    })?;

    let Some(object) = json.as_object() else {
        return Err(ResponseError::NotAnObject {
            raw: raw.to_string(),
        });
    };

    let pretty = serde_json::to_string_pretty(&json).unwrap_or_else(|_| body.to_string());

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|key| !object.contains_key(**key))
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ResponseError::MissingFields { missing, pretty });
    }

    let info: ChequeInfo = serde_json::from_value(json.clone()).map_err(|source| {
        ResponseError::InvalidField {
            source,
            pretty: pretty.clone(),
        }
    })?;

    Ok(ParsedResponse { json, pretty, info })
}
