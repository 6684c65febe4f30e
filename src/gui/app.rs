//! メインアプリケーションウィンドウ

use crate::config::AppConfig;
use crate::gemini::GeminiClient;
use crate::gemini::auth::{key_source, resolve_api_key};
use crate::mapping::PayeeMappings;
use crate::pdf::{RenderOptions, is_renderer_available};
use crate::pipeline::{OutputMode, ProcessResult, Processor, export_zip};
use crate::prompt::{PromptChoice, default_prompt};
use anyhow::{Context, Result};
use eframe::egui;
use egui::{CentralPanel, RichText, Vec2};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use tokio::runtime::Runtime;

use super::mapping_panel::MappingPanel;
use super::theme::{Colors, dark_theme};

/// バックグラウンド処理からの通知
enum WorkerMessage {
    Result(Box<ProcessResult>),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptMode {
    Default,
    Custom,
}

/// アプリケーション状態
pub struct EchequeRenamerApp {
    config: AppConfig,
    /// Tokioランタイム
    runtime: Runtime,
    /// 画面で入力されたAPIキー
    api_key: String,
    prompt_mode: PromptMode,
    custom_prompt: String,
    /// コピー先フォルダ（None ならその場でリネーム）
    copy_dir: Option<PathBuf>,
    copy_mode: bool,
    mappings: PayeeMappings,
    mapping_panel: MappingPanel,
    /// 処理結果
    results: Vec<ProcessResult>,
    selected: Option<usize>,
    /// 選択中の結果のプレビュー
    preview_texture: Option<(usize, egui::TextureHandle)>,
    is_processing: bool,
    total: usize,
    /// ステータスメッセージ
    status: String,
    /// エラーメッセージ
    error: Option<String>,
    /// 最後に処理したフォルダ
    last_folder: Option<PathBuf>,
    renderer_available: bool,
    result_rx: Receiver<WorkerMessage>,
    result_tx: Sender<WorkerMessage>,
}

impl EchequeRenamerApp {
    pub fn new(config: AppConfig) -> Result<Self> {
        let (result_tx, result_rx) = channel();

        let mut mapping_panel = MappingPanel::new(config.mapping_file.clone());
        let mappings = mapping_panel.load();
        let renderer_available = is_renderer_available(&config.pdftoppm);
        if !renderer_available {
            tracing::warn!("pdftoppm が見つかりません: {:?}", config.pdftoppm);
        }

        Ok(Self {
            runtime: Runtime::new().context("Tokioランタイムの作成に失敗")?,
            api_key: config.api_key.clone().unwrap_or_default(),
            prompt_mode: PromptMode::Default,
            custom_prompt: String::new(),
            copy_dir: None,
            copy_mode: false,
            mappings,
            mapping_panel,
            results: Vec::new(),
            selected: None,
            preview_texture: None,
            is_processing: false,
            total: 0,
            status: "e-cheque のPDFをドロップして開始".to_string(),
            error: None,
            last_folder: None,
            renderer_available,
            result_rx,
            result_tx,
            config,
        })
    }

    fn prompt_choice(&self) -> PromptChoice {
        match self.prompt_mode {
            PromptMode::Default => PromptChoice::Default,
            PromptMode::Custom => PromptChoice::Custom(self.custom_prompt.clone()),
        }
    }

    fn output_mode(&self) -> Result<OutputMode, String> {
        if !self.copy_mode {
            return Ok(OutputMode::RenameInPlace);
        }
        self.copy_dir
            .clone()
            .map(OutputMode::CopyTo)
            .ok_or_else(|| "コピー先フォルダを選択してください".to_string())
    }

    /// 処理の準備（APIキー・プロンプト・出力先の確認）
    fn build_processor(&self) -> Result<(Processor, OutputMode), String> {
        let prompt = self.prompt_choice().resolve().map_err(|e| e.to_string())?;
        let mode = self.output_mode()?;

        tracing::debug!("APIキー: source={:?}", key_source(&self.api_key, &self.config));
        let api_key = resolve_api_key(&self.api_key, &self.config).unwrap_or_default();
        let client = GeminiClient::new(api_key, &self.config.model, &self.config.api_base)
            .map_err(|e| e.to_string())?;

        let render = RenderOptions {
            pdftoppm: self.config.pdftoppm.clone(),
            zoom: self.config.render_zoom,
        };

        Ok((
            Processor::new(client, self.mappings.clone(), prompt, render),
            mode,
        ))
    }

    /// ファイルを処理
    fn process_files(&mut self, files: Vec<PathBuf>) {
        let pdf_files: Vec<PathBuf> = files
            .into_iter()
            .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("pdf")))
            .collect();

        if pdf_files.is_empty() {
            self.status = "PDFファイルが見つかりません".to_string();
            return;
        }

        let (processor, mode) = match self.build_processor() {
            Ok(ready) => ready,
            Err(message) => {
                self.error = Some(message);
                return;
            }
        };
        self.error = None;

        self.last_folder = match &mode {
            OutputMode::CopyTo(dir) => Some(dir.clone()),
            OutputMode::RenameInPlace => pdf_files.first().and_then(|p| p.parent()).map(|p| p.to_path_buf()),
        };

        self.results.clear();
        self.selected = None;
        self.preview_texture = None;
        self.is_processing = true;
        self.total = pdf_files.len();
        self.status = format!("{} 個のファイルを処理中...", pdf_files.len());
        tracing::info!("バッチ開始: {} 件 mode={:?}", pdf_files.len(), mode);

        let processor = Arc::new(processor);
        let result_tx = self.result_tx.clone();

        // バックグラウンドで処理
        self.runtime.spawn(async move {
            processor
                .process_batch(&pdf_files, &mode, |result| {
                    match result_tx.send(WorkerMessage::Result(Box::new(result))) {
                        Ok(()) => ControlFlow::Continue(()),
                        Err(_) => ControlFlow::Break(()),
                    }
                })
                .await;
            let _ = result_tx.send(WorkerMessage::Finished);
        });
    }

    /// 結果を受信
    fn receive_results(&mut self) {
        while let Ok(message) = self.result_rx.try_recv() {
            match message {
                WorkerMessage::Result(result) => {
                    self.results.push(*result);
                    if self.selected.is_none() {
                        self.selected = Some(0);
                    }
                    self.status = format!(
                        "{} 個のファイルを処理中... ({}/{})",
                        self.total,
                        self.results.len(),
                        self.total
                    );
                }
                WorkerMessage::Finished => {
                    self.is_processing = false;
                    let success_count = self.results.iter().filter(|r| r.success).count();
                    let fail_count = self.results.len() - success_count;
                    self.status = format!("完了: {} 件成功, {} 件失敗", success_count, fail_count);
                }
            }
        }
    }

    fn progress(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.results.len() as f32 / self.total as f32
    }

    /// 成功分をZIPに保存
    fn export_results(&mut self) {
        let Some(dest) = rfd::FileDialog::new()
            .add_filter("ZIP", &["zip"])
            .set_file_name("renamed_echeques.zip")
            .save_file()
        else {
            return;
        };

        match export_zip(&self.results, &dest) {
            Ok(count) => self.status = format!("ZIPに {} 件保存しました", count),
            Err(e) => self.error = Some(format!("ZIP保存エラー: {:#}", e)),
        }
    }

    fn show_settings(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Gemini APIキー:");
            ui.add(
                egui::TextEdit::singleline(&mut self.api_key)
                    .password(true)
                    .desired_width(320.0)
                    .hint_text("GEMINI_API_KEY"),
            );
        });

        ui.horizontal(|ui| {
            ui.label("プロンプト:");
            ui.radio_value(&mut self.prompt_mode, PromptMode::Default, "既定のプロンプト");
            ui.radio_value(&mut self.prompt_mode, PromptMode::Custom, "カスタムプロンプト");
        });

        match self.prompt_mode {
            PromptMode::Custom => {
                ui.add(
                    egui::TextEdit::multiline(&mut self.custom_prompt)
                        .desired_rows(12)
                        .desired_width(f32::INFINITY)
                        .hint_text("プロンプトを入力"),
                );
            }
            PromptMode::Default => {
                ui.collapsing("既定のプロンプトを表示", |ui| {
                    ui.label(RichText::new(default_prompt()).monospace().size(11.0));
                });
            }
        }

        ui.horizontal(|ui| {
            ui.label("出力:");
            ui.radio_value(&mut self.copy_mode, false, "元のファイルをリネーム");
            ui.radio_value(&mut self.copy_mode, true, "フォルダへコピー");
            if self.copy_mode {
                if ui.button("📁 選択").clicked() {
                    if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                        self.copy_dir = Some(dir);
                    }
                }
                let label = self
                    .copy_dir
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "未選択".to_string());
                ui.label(RichText::new(label).color(Colors::TEXT_SECONDARY));
            }
        });
    }

    fn show_drop_zone(&mut self, ui: &mut egui::Ui) {
        let is_hovering = !ui.ctx().input(|i| i.raw.hovered_files.is_empty());

        let (frame_color, bg_color) = if is_hovering {
            (Colors::ACCENT, Colors::BG_HOVER)
        } else {
            (Colors::BORDER, Colors::BG_CARD)
        };

        let drop_zone_response = egui::Frame::new()
            .fill(bg_color)
            .stroke(egui::Stroke::new(2.0, frame_color))
            .corner_radius(12.0)
            .inner_margin(28.0)
            .show(ui, |ui| {
                ui.set_min_size(Vec2::new(ui.available_width(), 120.0));
                ui.vertical_centered(|ui| {
                    let icon = if is_hovering { "📥" } else { "🧾" };
                    ui.label(RichText::new(icon).size(48.0));
                    ui.label(
                        RichText::new("e-cheque のPDFをここにドロップ")
                            .size(18.0)
                            .color(Colors::TEXT_PRIMARY),
                    );
                    ui.label(
                        RichText::new("または、クリックしてファイルを選択")
                            .size(13.0)
                            .color(Colors::TEXT_SECONDARY),
                    );
                });
            })
            .response
            .interact(egui::Sense::click());

        // クリックでファイル選択
        if drop_zone_response.clicked() && !self.is_processing {
            if let Some(files) = rfd::FileDialog::new()
                .add_filter("PDF files", &["pdf"])
                .pick_files()
            {
                self.process_files(files);
            }
        }
    }

    fn show_results(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("処理結果").size(16.0).color(Colors::TEXT_PRIMARY));

            if !self.results.is_empty() {
                let success_count = self.results.iter().filter(|r| r.success).count();
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let can_export = success_count > 0 && !self.is_processing;
                    if ui
                        .add_enabled(can_export, egui::Button::new("🗜 ZIPで保存"))
                        .clicked()
                    {
                        self.export_results();
                    }
                    ui.label(
                        RichText::new(format!("{}/{} 件成功", success_count, self.results.len()))
                            .size(13.0)
                            .color(Colors::TEXT_SECONDARY),
                    );
                });
            }
        });

        let mut clicked = None;
        for (index, result) in self.results.iter().enumerate() {
            let (icon, color) = if result.success {
                ("✓", Colors::SUCCESS)
            } else {
                ("✗", Colors::ERROR)
            };
            let text = match (&result.new_name, &result.error) {
                (Some(new_name), _) => format!("{} {} → {}", icon, result.original, new_name),
                (None, Some(error)) => format!("{} {} : {}", icon, result.original, error),
                (None, None) => format!("{} {}", icon, result.original),
            };
            let selected = self.selected == Some(index);
            if ui
                .selectable_label(selected, RichText::new(text).color(color))
                .clicked()
            {
                clicked = Some(index);
            }
        }
        if clicked.is_some() {
            self.selected = clicked;
        }
    }

    fn show_detail(&mut self, ui: &mut egui::Ui) {
        let Some(index) = self.selected else {
            return;
        };
        let Some(result) = self.results.get(index) else {
            return;
        };

        // プレビューのテクスチャを必要時に作成
        let needs_texture = !matches!(&self.preview_texture, Some((i, _)) if *i == index);
        if needs_texture {
            self.preview_texture = result.preview.as_ref().map(|preview| {
                let image = egui::ColorImage::from_rgba_unmultiplied(preview.size, &preview.rgba);
                let texture =
                    ui.ctx()
                        .load_texture(format!("preview-{}", index), image, egui::TextureOptions::LINEAR);
                (index, texture)
            });
        }

        egui::Frame::new()
            .fill(Colors::BG_CARD)
            .corner_radius(12.0)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.label(RichText::new(&result.original).size(15.0).color(Colors::TEXT_PRIMARY));

                if let Some((_, texture)) = &self.preview_texture {
                    ui.add(
                        egui::Image::from_texture(egui::load::SizedTexture::from_handle(texture))
                            .max_width(ui.available_width().min(640.0)),
                    );
                    ui.label(RichText::new("e-cheque（1ページ目）").size(11.0).color(Colors::TEXT_SECONDARY));
                }

                if let Some(error) = &result.error {
                    ui.label(RichText::new(format!("エラー: {}", error)).color(Colors::ERROR));
                }

                if let Some(analysis) = &result.analysis {
                    egui::Grid::new("analysis_grid").num_columns(2).spacing([16.0, 6.0]).show(ui, |ui| {
                        let rows = [
                            ("元の受取人", analysis.original_payee.clone()),
                            ("変換後の受取人", analysis.mapped_payee.clone()),
                            ("備考", analysis.remarks.clone()),
                            ("通貨", analysis.currency.clone()),
                            ("トレーラー手数料", analysis.is_trailer_fee.to_string()),
                            ("管理手数料", analysis.is_management_fee.to_string()),
                            ("生成ファイル名", analysis.filename.clone()),
                            ("次の処理", analysis.next_step.clone()),
                        ];
                        for (label, value) in rows {
                            ui.label(RichText::new(label).color(Colors::TEXT_SECONDARY));
                            ui.label(RichText::new(value).color(Colors::TEXT_PRIMARY));
                            ui.end_row();
                        }
                    });

                    if let Some(warning) = &analysis.date_warning {
                        ui.label(RichText::new(warning).color(Colors::WARNING));
                    }

                    ui.collapsing("Gemini の応答 (JSON)", |ui| {
                        ui.label(RichText::new(&analysis.pretty_json).monospace());
                    });
                } else if let Some(details) = &result.details {
                    ui.collapsing("Gemini の応答", |ui| {
                        ui.label(RichText::new(details).monospace());
                    });
                }
            });
    }
}

impl eframe::App for EchequeRenamerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 結果を受信
        self.receive_results();

        // ドロップされたファイルを処理
        if !ctx.input(|i| i.raw.dropped_files.is_empty()) {
            let files: Vec<PathBuf> = ctx.input(|i| {
                i.raw
                    .dropped_files
                    .iter()
                    .filter_map(|f| f.path.clone())
                    .collect()
            });

            if !files.is_empty() && !self.is_processing {
                self.process_files(files);
            }
        }

        // 処理中は再描画を要求
        if self.is_processing {
            ctx.request_repaint();
        }

        egui::SidePanel::left("mapping_panel")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.mapping_panel.show(ui, &mut self.mappings);
                });
            });

        // ステータスバー
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(RichText::new(&self.status).size(13.0).color(Colors::TEXT_SECONDARY));
        });

        CentralPanel::default().show(ctx, |ui| {
            ui.spacing_mut().item_spacing = Vec2::new(8.0, 10.0);

            // ヘッダー
            ui.horizontal(|ui| {
                ui.heading(
                    RichText::new("E-cheque リネーマー")
                        .size(26.0)
                        .color(Colors::TEXT_PRIMARY),
                );

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add_enabled(self.last_folder.is_some(), egui::Button::new("📁 フォルダを開く"))
                        .clicked()
                    {
                        if let Some(ref folder) = self.last_folder {
                            if let Err(e) = open::that(folder) {
                                self.error = Some(format!("フォルダを開けません: {}", e));
                            }
                        }
                    }
                });
            });

            ui.label(
                RichText::new("PDFをドロップ → Gemini で解析 → 受取人を変換してリネーム")
                    .size(13.0)
                    .color(Colors::TEXT_SECONDARY),
            );

            if !self.renderer_available {
                ui.label(
                    RichText::new(format!(
                        "⚠ pdftoppm が見つかりません ({})",
                        self.config.pdftoppm.display()
                    ))
                    .color(Colors::WARNING),
                );
            }

            if let Some(error) = &self.error {
                ui.label(RichText::new(format!("⚠ {}", error)).color(Colors::ERROR));
            }

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    self.show_settings(ui);
                    ui.add_space(6.0);
                    self.show_drop_zone(ui);

                    // 処理中表示
                    if self.is_processing {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label(RichText::new(&self.status).color(Colors::ACCENT));
                        });
                        ui.add(egui::ProgressBar::new(self.progress()).fill(Colors::ACCENT));
                    }

                    ui.add_space(6.0);
                    self.show_results(ui);
                    ui.add_space(6.0);
                    self.show_detail(ui);
                });
        });
    }
}

/// アプリケーションを起動
pub fn run(config: AppConfig) -> Result<()> {
    let app = EchequeRenamerApp::new(config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1080.0, 760.0])
            .with_min_inner_size([820.0, 560.0])
            .with_title("E-cheque リネーマー")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "E-cheque リネーマー",
        options,
        Box::new(|cc| {
            // ダークテーマを設定
            cc.egui_ctx.set_style(dark_theme());

            // 日本語フォントを設定
            let mut fonts = egui::FontDefinitions::default();

            #[cfg(windows)]
            {
                if let Ok(font_data) = std::fs::read("C:\\Windows\\Fonts\\YuGothM.ttc") {
                    fonts.font_data.insert(
                        "yu_gothic".to_owned(),
                        egui::FontData::from_owned(font_data).into(),
                    );

                    fonts
                        .families
                        .entry(egui::FontFamily::Proportional)
                        .or_default()
                        .insert(0, "yu_gothic".to_owned());

                    fonts
                        .families
                        .entry(egui::FontFamily::Monospace)
                        .or_default()
                        .push("yu_gothic".to_owned());
                }
            }

            cc.egui_ctx.set_fonts(fonts);

            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("アプリケーションエラー: {}", e))
}
