//! 受取人マッピング管理パネル

use crate::mapping::{PayeeMappings, SortColumn, SortOrder};
use egui::RichText;
use egui_extras::{Column, TableBuilder};
use std::path::PathBuf;

use super::theme::Colors;

/// パネルの入力状態
pub struct MappingPanel {
    path: PathBuf,
    new_full_name: String,
    new_short_form: String,
    filter: String,
    sort_by: SortColumn,
    order: SortOrder,
    /// (成功かどうか, メッセージ)
    message: Option<(bool, String)>,
}

impl MappingPanel {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            new_full_name: String::new(),
            new_short_form: String::new(),
            filter: String::new(),
            sort_by: SortColumn::default(),
            order: SortOrder::default(),
            message: None,
        }
    }

    /// 起動時の読み込み（失敗時は空の表で続行）
    pub fn load(&mut self) -> PayeeMappings {
        match PayeeMappings::load(&self.path) {
            Ok(mappings) => mappings,
            Err(e) => {
                tracing::warn!("マッピング読み込みエラー: {}", e);
                self.message = Some((false, format!("マッピングの読み込みに失敗: {}", e)));
                PayeeMappings::default()
            }
        }
    }

    fn save(&mut self, mappings: &PayeeMappings) -> bool {
        match mappings.save(&self.path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("マッピング保存エラー: {}", e);
                self.message = Some((false, format!("マッピングの保存に失敗: {}", e)));
                false
            }
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, mappings: &mut PayeeMappings) {
        ui.heading(RichText::new("受取人マッピング").color(Colors::TEXT_PRIMARY));
        ui.add_space(6.0);

        ui.collapsing("新規マッピング追加", |ui| {
            ui.label("正式名称");
            ui.text_edit_singleline(&mut self.new_full_name);
            ui.label("略称");
            ui.text_edit_singleline(&mut self.new_short_form);

            if ui.button("追加").clicked() {
                match mappings.add(&self.new_full_name, &self.new_short_form) {
                    Ok(()) => {
                        if self.save(mappings) {
                            self.message = Some((true, "マッピングを追加しました".to_string()));
                        }
                        self.new_full_name.clear();
                        self.new_short_form.clear();
                    }
                    Err(e) => self.message = Some((false, e.to_string())),
                }
            }
        });

        if let Some((ok, message)) = &self.message {
            let color = if *ok { Colors::SUCCESS } else { Colors::ERROR };
            ui.label(RichText::new(message).color(color));
        }

        ui.separator();

        ui.horizontal(|ui| {
            ui.label("🔍");
            ui.add(egui::TextEdit::singleline(&mut self.filter).hint_text("絞り込み"));
        });
        ui.horizontal(|ui| {
            ui.label("並び替え:");
            ui.radio_value(&mut self.sort_by, SortColumn::FullName, "正式名称");
            ui.radio_value(&mut self.sort_by, SortColumn::ShortForm, "略称");
        });
        ui.horizontal(|ui| {
            ui.label("順序:");
            ui.radio_value(&mut self.order, SortOrder::Ascending, "昇順");
            ui.radio_value(&mut self.order, SortOrder::Descending, "降順");
        });

        ui.separator();

        if mappings.is_empty() {
            ui.label(RichText::new("マッピングがありません").color(Colors::TEXT_SECONDARY));
            return;
        }

        let total = mappings.len();
        let mut to_delete: Option<usize> = None;
        let filtered_count;
        {
            let rows = mappings.view(&self.filter, self.sort_by, self.order);
            filtered_count = rows.len();

            if rows.is_empty() {
                ui.label(
                    RichText::new("条件に一致するマッピングがありません").color(Colors::TEXT_SECONDARY),
                );
            } else {
                TableBuilder::new(ui)
                    .striped(true)
                    .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                    .column(Column::remainder().clip(true))
                    .column(Column::auto().at_least(60.0))
                    .column(Column::exact(28.0))
                    .vscroll(false)
                    .header(20.0, |mut header| {
                        header.col(|ui| {
                            ui.strong("正式名称");
                        });
                        header.col(|ui| {
                            ui.strong("略称");
                        });
                        header.col(|_| {});
                    })
                    .body(|mut body| {
                        for (index, mapping) in &rows {
                            body.row(22.0, |mut row| {
                                row.col(|ui| {
                                    ui.label(&mapping.full_name);
                                });
                                row.col(|ui| {
                                    ui.label(&mapping.short_form);
                                });
                                row.col(|ui| {
                                    if ui.small_button("🗑").on_hover_text("削除").clicked() {
                                        to_delete = Some(*index);
                                    }
                                });
                            });
                        }
                    });
            }
        }

        let caption = if self.filter.trim().is_empty() {
            format!("登録数: {}", total)
        } else {
            format!("{} 件中 {} 件を表示", total, filtered_count)
        };
        ui.label(RichText::new(caption).size(12.0).color(Colors::TEXT_SECONDARY));

        if let Some(index) = to_delete {
            match mappings.remove(index) {
                Ok(removed) => {
                    tracing::info!("マッピング削除: {}", removed.full_name);
                    if self.save(mappings) {
                        self.message = Some((true, format!("削除しました: {}", removed.full_name)));
                    }
                }
                Err(e) => self.message = Some((false, e.to_string())),
            }
        }
    }
}
