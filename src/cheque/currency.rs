//! 通貨コード正規化

/// 通貨記号・表記を ISO コードへ正規化
pub fn normalize_currency(raw: &str) -> String {
    let value = raw.trim();
    let upper = value.to_uppercase();

    let code = match upper.as_str() {
        "¥" | "￥" | "RMB" | "CNY" => "CNY",
        "$" | "USD" | "US$" => "USD",
        "HK$" | "HKD" => "HKD",
        "€" | "EUR" => "EUR",
        "£" | "GBP" => "GBP",
        _ => return upper,
    };

    code.to_string()
}
