//! 小切手解析モジュール - Gemini の抽出結果とファイル名規則

mod currency;
mod filename;
mod response;

pub use currency::normalize_currency;
pub use filename::{FeeKind, generate_filename, get_unique_filename, sanitize_filename};
pub use response::{ParsedResponse, REQUIRED_FIELDS, ResponseError, parse_response};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// e-cheque から抽出された情報
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChequeInfo {
    /// 発行銀行
    #[serde(default, deserialize_with = "lenient_string")]
    pub bank_name: Option<String>,
    /// 発行日 (YYYY-MM-DD)
    pub date: String,
    /// 受取人
    pub payee: String,
    /// 支払口座名義
    pub payer: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount_numerical: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount_words: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cheque_number: Option<String>,
    /// 小切手番号の先頭6桁
    pub key_identifier: String,
    pub currency: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub remarks: String,
    pub is_trailer_fee: bool,
    pub is_management_fee: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub next_step: Option<String>,
}

/// 補助項目は null を許し、数値などは文字列にする
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer).map(Option::unwrap_or_default)
}

impl ChequeInfo {
    /// 発行日を日付として解釈
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()
    }

    /// 発行日が解釈できない場合の警告文
    pub fn date_warning(&self) -> Option<String> {
        match self.parsed_date() {
            Some(_) => None,
            None => Some(format!("日付を解釈できません: {:?}", self.date)),
        }
    }
}

/// 次の処理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    FlagForManualReview,
    ProcessPayment,
}

impl NextStep {
    /// 備考に "URGENT" があるか、HKD 以外なら要確認
    pub fn determine(remarks: &str, currency: &str) -> Self {
        if remarks.to_uppercase().contains("URGENT") {
            return Self::FlagForManualReview;
        }
        if normalize_currency(currency) != "HKD" {
            return Self::FlagForManualReview;
        }
        Self::ProcessPayment
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlagForManualReview => "Flag for Manual Review",
            Self::ProcessPayment => "Process Payment",
        }
    }
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgent_remarks_need_review() {
        assert_eq!(
            NextStep::determine("urgent: pay today", "HKD"),
            NextStep::FlagForManualReview
        );
    }

    #[test]
    fn foreign_currency_needs_review() {
        assert_eq!(NextStep::determine("", "USD"), NextStep::FlagForManualReview);
        assert_eq!(NextStep::determine("", "¥"), NextStep::FlagForManualReview);
    }

    #[test]
    fn plain_hkd_is_processed() {
        assert_eq!(NextStep::determine("Trailer fee Q3", "HK$"), NextStep::ProcessPayment);
        assert_eq!(NextStep::ProcessPayment.to_string(), "Process Payment");
    }

    #[test]
    fn date_parsing() {
        let mut info = ChequeInfo {
            date: "2024-03-15".to_string(),
            ..Default::default()
        };
        assert_eq!(info.parsed_date(), NaiveDate::from_ymd_opt(2024, 3, 15));
        assert!(info.date_warning().is_none());

        info.date = "15/03/2024".to_string();
        assert!(info.parsed_date().is_none());
        assert!(info.date_warning().is_some());
    }
}
