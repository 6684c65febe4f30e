//! E-cheque リネーマー - Gemini Vision API を使用したPDF自動リネームツール
//!
//! # 機能
//! - e-cheque PDFの1ページ目を画像化し、Gemini で項目を抽出
//! - 受取人名を略称へ変換（マッピング表をCSVで管理）
//! - トレーラー手数料・管理手数料の判定に応じたファイル名生成
//! - ドラッグ＆ドロップ対応GUI、リネームまたはコピー出力、ZIP保存

pub mod cheque;
pub mod config;
pub mod gemini;
pub mod gui;
pub mod mapping;
pub mod pdf;
pub mod pipeline;
pub mod prompt;

pub use cheque::ChequeInfo;
pub use config::AppConfig;
pub use pipeline::{OutputMode, ProcessResult, Processor};
