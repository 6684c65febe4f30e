//! テーマ設定 - ダークテーマ

use egui::{Color32, CornerRadius, FontFamily, FontId, Stroke, Style, TextStyle, Visuals};

/// カラーパレット
pub struct Colors;

impl Colors {
    pub const BG_DARK: Color32 = Color32::from_rgb(12, 17, 24);
    pub const BG_PANEL: Color32 = Color32::from_rgb(16, 23, 33);
    pub const BG_CARD: Color32 = Color32::from_rgb(22, 31, 45);
    pub const BG_HOVER: Color32 = Color32::from_rgb(30, 44, 64);
    pub const ACCENT: Color32 = Color32::from_rgb(56, 178, 172);
    pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(240, 244, 248);
    pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(140, 158, 184);
    pub const SUCCESS: Color32 = Color32::from_rgb(74, 222, 128);
    pub const WARNING: Color32 = Color32::from_rgb(251, 191, 36);
    pub const ERROR: Color32 = Color32::from_rgb(248, 113, 113);
    pub const BORDER: Color32 = Color32::from_rgb(44, 60, 84);
}

/// ダークテーマのスタイルを作成
pub fn dark_theme() -> Style {
    let mut style = Style::default();

    let mut visuals = Visuals::dark();
    visuals.panel_fill = Colors::BG_DARK;
    visuals.window_fill = Colors::BG_PANEL;
    visuals.extreme_bg_color = Colors::BG_PANEL;
    visuals.faint_bg_color = Colors::BG_CARD;

    let radius = CornerRadius::same(6);
    let widgets = [
        (&mut visuals.widgets.noninteractive, Colors::BG_CARD, Colors::TEXT_SECONDARY),
        (&mut visuals.widgets.inactive, Colors::BG_CARD, Colors::TEXT_PRIMARY),
        (&mut visuals.widgets.hovered, Colors::BG_HOVER, Colors::TEXT_PRIMARY),
        (&mut visuals.widgets.active, Colors::ACCENT, Colors::TEXT_PRIMARY),
    ];
    for (widget, fill, text) in widgets {
        widget.bg_fill = fill;
        widget.weak_bg_fill = fill;
        widget.fg_stroke = Stroke::new(1.0, text);
        widget.corner_radius = radius;
    }

    visuals.selection.bg_fill = Colors::ACCENT.gamma_multiply(0.4);
    visuals.selection.stroke = Stroke::new(1.0, Colors::ACCENT);
    style.visuals = visuals;

    // JSON表示用に等幅を少し小さく
    style
        .text_styles
        .insert(TextStyle::Monospace, FontId::new(12.0, FontFamily::Monospace));

    style
}
