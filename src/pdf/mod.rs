//! PDF処理モジュール - PDFから画像への変換

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 描画設定
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// pdftoppm 実行ファイル
    pub pdftoppm: PathBuf,
    /// 倍率 (1.0 = 72dpi)
    pub zoom: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pdftoppm: PathBuf::from(crate::config::DEFAULT_PDFTOPPM),
            zoom: crate::config::DEFAULT_RENDER_ZOOM,
        }
    }
}

impl RenderOptions {
    pub fn dpi(&self) -> u32 {
        (72.0 * self.zoom).round().max(1.0) as u32
    }
}

/// 描画済みの1ページ目
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// PNGデータ
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// 画面表示用の縮小画像 (RGBA)
#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub size: [usize; 2],
    pub rgba: Vec<u8>,
}

impl RenderedPage {
    /// PNGデータから作成（画像として読めることを確認）
    pub fn from_png(png: Vec<u8>) -> Result<Self> {
        let image = image::load_from_memory(&png).context("変換された画像を読み込めません")?;
        Ok(Self {
            width: image.width(),
            height: image.height(),
            png,
        })
    }

    /// 長辺が `max` 以下になるよう縮小したプレビュー
    pub fn preview(&self, max: u32) -> Result<PreviewImage> {
        let image = image::load_from_memory(&self.png).context("プレビュー画像の作成に失敗")?;
        let rgba = image.thumbnail(max, max).to_rgba8();
        Ok(PreviewImage {
            size: [rgba.width() as usize, rgba.height() as usize],
            rgba: rgba.into_raw(),
        })
    }
}

/// 1ページ目の描画処理
pub trait PageRenderer: Send + Sync {
    fn render_first_page(&self, pdf_path: &Path) -> Result<RenderedPage>;
}

/// pdftoppm による描画
impl PageRenderer for RenderOptions {
    fn render_first_page(&self, pdf_path: &Path) -> Result<RenderedPage> {
        render_first_page(pdf_path, self)
    }
}

/// 作業用の一時ディレクトリを作成
fn create_work_dir() -> Result<PathBuf> {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let temp_dir = std::env::temp_dir().join(format!(
        "echeque_{}_{}",
        std::process::id(),
        stamp
    ));
    std::fs::create_dir_all(&temp_dir)
        .with_context(|| format!("一時フォルダの作成に失敗: {:?}", temp_dir))?;
    Ok(temp_dir)
}

/// PDFの1ページ目を画像に変換
pub fn render_first_page(pdf_path: impl AsRef<Path>, options: &RenderOptions) -> Result<RenderedPage> {
    let pdf_path = pdf_path.as_ref();

    let metadata = std::fs::metadata(pdf_path)
        .with_context(|| format!("PDFファイルを開けません: {:?}", pdf_path))?;
    if metadata.len() == 0 {
        anyhow::bail!("アップロードされたPDFが空です");
    }

    let temp_dir = create_work_dir()?;
    let result = run_pdftoppm(pdf_path, &temp_dir, options);
    cleanup_temp_dir(&temp_dir);
    result
}

/// 出力ファイル名の基底（-singlefile で `page.png` 固定）
const OUTPUT_BASE: &str = "page";

/// pdftoppm に渡す引数
fn pdftoppm_args(pdf_path: &Path, output_base: &Path, options: &RenderOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-png", "-singlefile", "-f", "1", "-l", "1", "-r"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(options.dpi().to_string().into());
    args.push(pdf_path.as_os_str().to_owned());
    args.push(output_base.as_os_str().to_owned());
    args
}

/// 変換された画像のパス
fn rendered_image_path(temp_dir: &Path) -> PathBuf {
    temp_dir.join(format!("{}.png", OUTPUT_BASE))
}

fn run_pdftoppm(pdf_path: &Path, temp_dir: &Path, options: &RenderOptions) -> Result<RenderedPage> {
    let output_base = temp_dir.join(OUTPUT_BASE);

    let mut command = Command::new(&options.pdftoppm);
    command.args(pdftoppm_args(pdf_path, &output_base, options));

    #[cfg(windows)]
    command.creation_flags(0x08000000); // CREATE_NO_WINDOW

    let output = command
        .output()
        .with_context(|| format!("pdftoppmの実行に失敗: {:?}", options.pdftoppm))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("PDF変換に失敗: {}", stderr.trim());
    }

    let image_path = rendered_image_path(temp_dir);
    if !image_path.exists() {
        anyhow::bail!("アップロードされたPDFが空です（変換された画像がありません）");
    }

    let png = std::fs::read(&image_path)
        .with_context(|| format!("画像ファイルの読み込みに失敗: {:?}", image_path))?;
    RenderedPage::from_png(png)
}

/// 一時フォルダを削除
fn cleanup_temp_dir(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        tracing::debug!("一時フォルダの削除に失敗: {:?}: {}", dir, e);
    }
}

/// pdftoppm が利用可能かチェック
pub fn is_renderer_available(pdftoppm: impl AsRef<Path>) -> bool {
    let mut command = Command::new(pdftoppm.as_ref());
    command.arg("-v");

    #[cfg(windows)]
    command.creation_flags(0x08000000);

    command.output().is_ok()
}

#[cfg(windows)]
trait CommandExt {
    fn creation_flags(&mut self, flags: u32) -> &mut Self;
}

#[cfg(windows)]
impl CommandExt for Command {
    fn creation_flags(&mut self, flags: u32) -> &mut Self {
        use std::os::windows::process::CommandExt as WinCommandExt;
        WinCommandExt::creation_flags(self, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn dpi_follows_zoom() {
        assert_eq!(RenderOptions::default().dpi(), 288);
        let options = RenderOptions {
            zoom: 1.5,
            ..Default::default()
        };
        assert_eq!(options.dpi(), 108);
    }

    #[test]
    fn pdftoppm_writes_single_unnumbered_file() {
        let options = RenderOptions::default();
        let args = pdftoppm_args(Path::new("in.pdf"), Path::new("/tmp/work/page"), &options);
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert!(args.contains(&"-singlefile".to_string()));
        assert_eq!(
            &args[args.len() - 3..],
            &["288".to_string(), "in.pdf".to_string(), "/tmp/work/page".to_string()]
        );
        assert_eq!(
            rendered_image_path(Path::new("/tmp/work")),
            Path::new("/tmp/work").join("page.png")
        );
    }

    #[test]
    fn rendered_page_reads_dimensions() {
        let page = RenderedPage::from_png(sample_png(40, 20)).unwrap();
        assert_eq!((page.width, page.height), (40, 20));
    }

    #[test]
    fn rejects_non_image_bytes() {
        assert!(RenderedPage::from_png(b"not a png".to_vec()).is_err());
    }

    #[test]
    fn preview_is_downscaled() {
        let page = RenderedPage::from_png(sample_png(400, 200)).unwrap();
        let preview = page.preview(100).unwrap();
        assert_eq!(preview.size, [100, 50]);
        assert_eq!(preview.rgba.len(), 100 * 50 * 4);
    }

    #[test]
    fn empty_pdf_is_rejected_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        std::fs::write(&path, b"").unwrap();

        let err = render_first_page(&path, &RenderOptions::default()).unwrap_err();
        assert!(err.to_string().contains("空"));
    }

    #[test]
    fn missing_renderer_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let options = RenderOptions {
            pdftoppm: dir.path().join("no-such-pdftoppm"),
            ..Default::default()
        };
        assert!(render_first_page(&path, &options).is_err());
        assert!(!is_renderer_available(&options.pdftoppm));
    }
}
