//! ファイル名生成モジュール

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const WMC_PAYER: &str = "WEALTH MANAGEMENT CUBE LIMITED";
const WMC_NOMINEE_PAYER: &str = "WMC NOMINEE LIMITED-CLIENT TRUST ACCOUNT";

/// 管理手数料の対象となる受取人
const MANAGEMENT_FEE_PAYEES: &[&str] = &["OFS", "OREANA FINANCIAL SERVICES LIMITED"];

/// 手数料区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeKind {
    Trailer,
    Management,
    None,
}

impl FeeKind {
    /// トレーラー手数料が優先。管理手数料は OFS 宛のみ
    pub fn classify(payee: &str, is_trailer_fee: bool, is_management_fee: bool) -> Self {
        if is_trailer_fee {
            return Self::Trailer;
        }
        let payee_upper = payee.to_uppercase();
        if is_management_fee && MANAGEMENT_FEE_PAYEES.contains(&payee_upper.as_str()) {
            return Self::Management;
        }
        Self::None
    }

    fn suffix(&self) -> &'static str {
        match self {
            Self::Trailer => "_T",
            Self::Management => " MF",
            Self::None => "",
        }
    }
}

/// 新しいファイル名を生成
/// 支払人ごとにフォーマットが異なる:
/// - WMC: `[番号] WMC-[受取人].pdf`
/// - WMC Nominee: `[通貨] [番号] [受取人].pdf`
/// - その他: `[受取人]_[番号]_[通貨].pdf`
pub fn generate_filename(
    key_identifier: &str,
    payer: &str,
    payee: &str,
    currency: &str,
    is_trailer_fee: bool,
    is_management_fee: bool,
) -> String {
    let suffix = FeeKind::classify(payee, is_trailer_fee, is_management_fee).suffix();

    let payee = sanitize_filename(payee);
    let key = sanitize_filename(key_identifier);
    let currency = sanitize_filename(currency);

    match payer {
        WMC_PAYER => format!("{} WMC-{}{}.pdf", key, payee, suffix),
        WMC_NOMINEE_PAYER => format!("{} {} {}{}.pdf", currency, key, payee, suffix),
        _ => format!("{}_{}_{}{}.pdf", payee, key, currency, suffix),
    }
}

/// ファイル名に使用できない文字を置換
pub fn sanitize_filename(text: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let re = INVALID.get_or_init(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("valid regex"));
    re.replace_all(text, "_").into_owned()
}

/// ユニークなファイル名を取得（同名ファイルがある場合は連番を付与）
pub fn get_unique_filename(directory: &Path, filename: &str) -> String {
    let path = Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("pdf");

    let mut final_name = filename.to_string();
    let mut counter = 1;

    while directory.join(&final_name).exists() {
        final_name = format!("{}_{}.{}", stem, counter, ext);
        counter += 1;
    }

    final_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wmc_payer_layouts() {
        let name = generate_filename("123456", WMC_PAYER, "ABC Fund", "HKD", false, false);
        assert_eq!(name, "123456 WMC-ABC Fund.pdf");

        let name = generate_filename("123456", WMC_PAYER, "ABC Fund", "HKD", true, false);
        assert_eq!(name, "123456 WMC-ABC Fund_T.pdf");

        let name = generate_filename("123456", WMC_PAYER, "OFS", "HKD", false, true);
        assert_eq!(name, "123456 WMC-OFS MF.pdf");
    }

    #[test]
    fn nominee_payer_layouts() {
        let name = generate_filename("654321", WMC_NOMINEE_PAYER, "XYZ", "USD", false, false);
        assert_eq!(name, "USD 654321 XYZ.pdf");

        let name = generate_filename("654321", WMC_NOMINEE_PAYER, "XYZ", "USD", true, false);
        assert_eq!(name, "USD 654321 XYZ_T.pdf");

        let name = generate_filename(
            "654321",
            WMC_NOMINEE_PAYER,
            "Oreana Financial Services Limited",
            "HKD",
            false,
            true,
        );
        assert_eq!(name, "HKD 654321 Oreana Financial Services Limited MF.pdf");
    }

    #[test]
    fn other_payer_layouts() {
        let name = generate_filename("111222", "SOMEONE ELSE", "Acme", "EUR", false, false);
        assert_eq!(name, "Acme_111222_EUR.pdf");

        let name = generate_filename("111222", "SOMEONE ELSE", "OFS", "HKD", false, true);
        assert_eq!(name, "OFS_111222_HKD MF.pdf");
    }

    #[test]
    fn management_fee_only_for_ofs() {
        let name = generate_filename("111222", WMC_PAYER, "Acme", "HKD", false, true);
        assert_eq!(name, "111222 WMC-Acme.pdf");
    }

    #[test]
    fn trailer_wins_over_management() {
        assert_eq!(FeeKind::classify("OFS", true, true), FeeKind::Trailer);
        assert_eq!(FeeKind::classify("ofs", false, true), FeeKind::Management);
        assert_eq!(FeeKind::classify("ofs", false, false), FeeKind::None);
    }

    #[test]
    fn payer_match_is_exact() {
        let name = generate_filename("1", "Wealth Management Cube Limited", "A", "HKD", false, false);
        assert_eq!(name, "A_1_HKD.pdf");
    }

    #[test]
    fn sanitize_replaces_invalid_chars() {
        assert_eq!(sanitize_filename(r#"A/B\C*D?E:F"G<H>I|J"#), "A_B_C_D_E_F_G_H_I_J");
        assert_eq!(sanitize_filename("Plain Name Ltd."), "Plain Name Ltd.");
    }

    #[test]
    fn sanitized_payee_in_filename() {
        let name = generate_filename("1", "X", "A/S Holdings", "HKD", false, false);
        assert_eq!(name, "A_S Holdings_1_HKD.pdf");
    }

    #[test]
    fn unique_filename_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(get_unique_filename(dir.path(), "a.pdf"), "a.pdf");

        std::fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        assert_eq!(get_unique_filename(dir.path(), "a.pdf"), "a_1.pdf");

        std::fs::write(dir.path().join("a_1.pdf"), b"x").unwrap();
        assert_eq!(get_unique_filename(dir.path(), "a.pdf"), "a_2.pdf");
    }
}
