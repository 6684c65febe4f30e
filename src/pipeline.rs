//! 処理パイプライン - PDF描画 → Gemini解析 → 受取人変換 → ファイル名生成 → 出力

use crate::cheque::{
    ChequeInfo, FeeKind, NextStep, ResponseError, generate_filename, get_unique_filename,
    normalize_currency, parse_response,
};
use crate::gemini::{GeminiClient, GeminiError};
use crate::mapping::PayeeMappings;
use crate::pdf::{PageRenderer, PreviewImage, RenderedPage};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::Write;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// プレビュー画像の長辺
const PREVIEW_MAX: u32 = 900;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Gemini(#[from] GeminiError),
    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl AnalysisError {
    /// 画面に出す補足テキスト（生の応答など）
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Gemini(_) => None,
            Self::Response(e) => Some(e.display_text().to_string()),
        }
    }
}

/// 1枚分の解析結果
#[derive(Debug, Clone)]
pub struct ChequeAnalysis {
    pub raw_response: String,
    pub pretty_json: String,
    pub info: ChequeInfo,
    pub original_payee: String,
    pub mapped_payee: String,
    pub remarks: String,
    /// 正規化済み通貨
    pub currency: String,
    pub is_trailer_fee: bool,
    pub is_management_fee: bool,
    pub fee_kind: FeeKind,
    pub filename: String,
    /// 表示する次の処理（モデルの値が無ければ規則で決定）
    pub next_step: String,
    pub date_warning: Option<String>,
}

/// 出力方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// 元のファイルをその場でリネーム
    RenameInPlace,
    /// 指定フォルダへリネームしてコピー（元ファイルはそのまま）
    CopyTo(PathBuf),
}

/// 処理結果
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub success: bool,
    pub source: PathBuf,
    pub original: String,
    pub new_name: Option<String>,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
    /// エラー時の生の応答など
    pub details: Option<String>,
    pub analysis: Option<ChequeAnalysis>,
    pub preview: Option<PreviewImage>,
}

impl ProcessResult {
    fn failed(source: &Path, original: String, error: String) -> Self {
        Self {
            success: false,
            source: source.to_path_buf(),
            original,
            new_name: None,
            output_path: None,
            error: Some(error),
            details: None,
            analysis: None,
            preview: None,
        }
    }
}

/// 1バッチ分の処理設定
pub struct Processor {
    client: GeminiClient,
    mappings: PayeeMappings,
    prompt: String,
    renderer: Arc<dyn PageRenderer>,
}

impl Processor {
    pub fn new(
        client: GeminiClient,
        mappings: PayeeMappings,
        prompt: String,
        renderer: impl PageRenderer + 'static,
    ) -> Self {
        Self {
            client,
            mappings,
            prompt,
            renderer: Arc::new(renderer),
        }
    }

    /// 複数ファイルを順に処理。失敗したファイルがあっても続行し、
    /// `on_result` が `Break` を返した時点で打ち切る。処理件数を返す
    pub async fn process_batch<F>(
        &self,
        files: &[PathBuf],
        mode: &OutputMode,
        mut on_result: F,
    ) -> usize
    where
        F: FnMut(ProcessResult) -> ControlFlow<()>,
    {
        let mut processed = 0;
        for pdf_path in files {
            let result = self.process_pdf(pdf_path, mode).await;
            processed += 1;
            if on_result(result).is_break() {
                tracing::info!("バッチ中断: {}/{} 件", processed, files.len());
                break;
            }
        }
        processed
    }

    /// 画像をGeminiで解析し、ファイル名まで決定
    pub async fn analyze_image(&self, png: &[u8]) -> Result<ChequeAnalysis, AnalysisError> {
        let raw_response = self.client.generate(&self.prompt, png).await?;
        tracing::debug!("Gemini 応答: {} 文字", raw_response.len());

        let parsed = parse_response(&raw_response)?;
        let info = parsed.info;

        let currency = normalize_currency(&info.currency);
        let mapped_payee = self.mappings.shortform(&info.payee);
        let fee_kind =
            FeeKind::classify(&mapped_payee, info.is_trailer_fee, info.is_management_fee);

        let filename = generate_filename(
            &info.key_identifier,
            &info.payer,
            &mapped_payee,
            &currency,
            info.is_trailer_fee,
            info.is_management_fee,
        );

        let next_step = info
            .next_step
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| NextStep::determine(&info.remarks, &currency).to_string());

        Ok(ChequeAnalysis {
            raw_response,
            pretty_json: parsed.pretty,
            original_payee: info.payee.clone(),
            mapped_payee,
            remarks: info.remarks.clone(),
            currency,
            is_trailer_fee: info.is_trailer_fee,
            is_management_fee: info.is_management_fee,
            fee_kind,
            filename,
            next_step,
            date_warning: info.date_warning(),
            info,
        })
    }

    /// 単一のPDFファイルを処理
    pub async fn process_pdf(&self, pdf_path: &Path, mode: &OutputMode) -> ProcessResult {
        let original = pdf_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.pdf")
            .to_string();
        let started = std::time::Instant::now();
        tracing::info!("処理開始: {}", original);

        // PDFを画像に変換
        let renderer = Arc::clone(&self.renderer);
        let path = pdf_path.to_path_buf();
        let page = match tokio::task::spawn_blocking(move || renderer.render_first_page(&path)).await
        {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                tracing::warn!("PDF変換エラー: {}: {:#}", original, e);
                return ProcessResult::failed(pdf_path, original, format!("PDF変換エラー: {:#}", e));
            }
            Err(e) => {
                return ProcessResult::failed(pdf_path, original, format!("PDF変換エラー: {}", e));
            }
        };

        let mut result = self.process_page(pdf_path, original, &page, mode).await;
        tracing::info!(
            "処理完了: {} success={} elapsed={:?}",
            result.original,
            result.success,
            started.elapsed()
        );
        if result.preview.is_none() {
            result.preview = page.preview(PREVIEW_MAX).ok();
        }
        result
    }

    /// 描画済みページを解析して出力
    pub async fn process_page(
        &self,
        pdf_path: &Path,
        original: String,
        page: &RenderedPage,
        mode: &OutputMode,
    ) -> ProcessResult {
        let analysis = match self.analyze_image(&page.png).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!("解析エラー: {}: {}", original, e);
                let mut result = ProcessResult::failed(pdf_path, original, e.to_string());
                result.details = e.details();
                return result;
            }
        };

        match write_output(pdf_path, &analysis.filename, mode) {
            Ok(output_path) => ProcessResult {
                success: true,
                source: pdf_path.to_path_buf(),
                original,
                new_name: output_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string),
                output_path: Some(output_path),
                error: None,
                details: None,
                analysis: Some(analysis),
                preview: None,
            },
            Err(e) => {
                tracing::warn!("出力エラー: {}: {:#}", original, e);
                let mut result = ProcessResult::failed(pdf_path, original, format!("出力エラー: {:#}", e));
                result.analysis = Some(analysis);
                result
            }
        }
    }
}

/// 出力方法に従ってファイルを書き出し、出力先のパスを返す
pub fn write_output(pdf_path: &Path, filename: &str, mode: &OutputMode) -> Result<PathBuf> {
    match mode {
        OutputMode::RenameInPlace => {
            let dir = pdf_path.parent().unwrap_or(Path::new("."));
            // 既に同じ名前ならそのまま
            if pdf_path.file_name().and_then(|n| n.to_str()) == Some(filename) {
                return Ok(pdf_path.to_path_buf());
            }
            let unique = get_unique_filename(dir, filename);
            let new_path = dir.join(&unique);
            std::fs::rename(pdf_path, &new_path)
                .with_context(|| format!("リネームに失敗: {:?} -> {:?}", pdf_path, new_path))?;
            Ok(new_path)
        }
        OutputMode::CopyTo(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("出力フォルダの作成に失敗: {:?}", dir))?;
            let unique = get_unique_filename(dir, filename);
            let new_path = dir.join(&unique);
            std::fs::copy(pdf_path, &new_path)
                .with_context(|| format!("コピーに失敗: {:?} -> {:?}", pdf_path, new_path))?;
            Ok(new_path)
        }
    }
}

/// 成功したファイルをZIPにまとめる。書き込んだ件数を返す
pub fn export_zip(results: &[ProcessResult], dest: &Path) -> Result<usize> {
    let file = std::fs::File::create(dest)
        .with_context(|| format!("ZIPファイルの作成に失敗: {:?}", dest))?;
    let mut archive = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    let mut used: HashSet<String> = HashSet::new();
    let mut count = 0;

    for result in results.iter().filter(|r| r.success) {
        let (Some(path), Some(name)) = (&result.output_path, &result.new_name) else {
            continue;
        };

        let data = std::fs::read(path).with_context(|| format!("ファイルの読み込みに失敗: {:?}", path))?;
        let entry_name = unique_entry_name(&mut used, name);

        archive
            .start_file(entry_name.as_str(), options)
            .with_context(|| format!("ZIPへの追加に失敗: {}", entry_name))?;
        archive.write_all(&data)?;
        count += 1;
    }

    archive.finish().context("ZIPファイルの書き込みに失敗")?;
    tracing::info!("ZIP出力: {} 件 ({:?})", count, dest);
    Ok(count)
}

/// ZIP内で重複しない名前
fn unique_entry_name(used: &mut HashSet<String>, name: &str) -> String {
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("pdf");

    let mut candidate = name.to_string();
    let mut counter = 1;
    while used.contains(&candidate) {
        candidate = format!("{}_{}.{}", stem, counter, ext);
        counter += 1;
    }
    used.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_in_place_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("scan.pdf");
        std::fs::write(&src, b"%PDF-1.4 a").unwrap();
        std::fs::write(dir.path().join("A_1_HKD.pdf"), b"existing").unwrap();

        let out = write_output(&src, "A_1_HKD.pdf", &OutputMode::RenameInPlace).unwrap();
        assert_eq!(out, dir.path().join("A_1_HKD_1.pdf"));
        assert!(!src.exists());
        assert_eq!(std::fs::read(&out).unwrap(), b"%PDF-1.4 a");
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("A_1_HKD.pdf");
        std::fs::write(&src, b"x").unwrap();

        let out = write_output(&src, "A_1_HKD.pdf", &OutputMode::RenameInPlace).unwrap();
        assert_eq!(out, src);
        assert!(src.exists());
    }

    #[test]
    fn copy_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("scan.pdf");
        std::fs::write(&src, b"data").unwrap();
        let out_dir = dir.path().join("out");

        let out = write_output(&src, "B_2_USD.pdf", &OutputMode::CopyTo(out_dir.clone())).unwrap();
        assert_eq!(out, out_dir.join("B_2_USD.pdf"));
        assert!(src.exists());
        assert_eq!(std::fs::read(out).unwrap(), b"data");
    }

    #[test]
    fn zip_entry_names_are_unique() {
        let mut used = HashSet::new();
        assert_eq!(unique_entry_name(&mut used, "a.pdf"), "a.pdf");
        assert_eq!(unique_entry_name(&mut used, "a.pdf"), "a_1.pdf");
        assert_eq!(unique_entry_name(&mut used, "a.pdf"), "a_2.pdf");
    }

    #[test]
    fn export_zip_includes_only_successes() {
        let dir = tempfile::tempdir().unwrap();
        let ok_path = dir.path().join("X_1_HKD.pdf");
        std::fs::write(&ok_path, b"pdf-bytes").unwrap();

        let ok = ProcessResult {
            success: true,
            source: dir.path().join("scan1.pdf"),
            original: "scan1.pdf".into(),
            new_name: Some("X_1_HKD.pdf".into()),
            output_path: Some(ok_path),
            error: None,
            details: None,
            analysis: None,
            preview: None,
        };
        let failed = ProcessResult::failed(&dir.path().join("scan2.pdf"), "scan2.pdf".into(), "err".into());

        let dest = dir.path().join("out.zip");
        let count = export_zip(&[ok, failed], &dest).unwrap();
        assert_eq!(count, 1);

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.by_index(0).unwrap().name(), "X_1_HKD.pdf");
    }
}
