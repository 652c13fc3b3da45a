use eframe::egui;

use egui::{style, Color32, Stroke};

const BG: Color32 = Color32::from_rgb(48, 48, 48);
const FONT: Color32 = Color32::from_rgb(185, 185, 185);
const ACCENT: Color32 = Color32::from_rgb(220, 220, 220);
const WIDGET_BG: Color32 = Color32::from_rgb(70, 70, 70);
const HOVER_BG: Color32 = Color32::from_rgb(90, 90, 90);
const SELECTION_BG: Color32 = Color32::from_rgb(105, 105, 105);

/// Grey theme plus the configured text scaling.
pub fn apply_theme(ctx: &egui::Context, text_scaling: f32) {
    let previous_theme = ctx.style().visuals.clone();

    ctx.set_visuals(egui::Visuals {
        override_text_color: Some(FONT),
        window_fill: BG,
        panel_fill: BG,
        faint_bg_color: Color32::from_rgb(54, 54, 54),
        extreme_bg_color: Color32::from_rgb(36, 36, 36),
        selection: style::Selection {
            bg_fill: SELECTION_BG,
            stroke: Stroke::new(1., ACCENT),
        },
        widgets: style::Widgets {
            noninteractive: create_widget_visuals(previous_theme.widgets.noninteractive, BG, FONT),
            inactive: create_widget_visuals(previous_theme.widgets.inactive, WIDGET_BG, FONT),
            hovered: create_widget_visuals(previous_theme.widgets.hovered, HOVER_BG, ACCENT),
            active: create_widget_visuals(previous_theme.widgets.active, SELECTION_BG, ACCENT),
            open: create_widget_visuals(previous_theme.widgets.open, WIDGET_BG, ACCENT),
        },
        ..previous_theme
    });

    let mut style = (*ctx.style()).clone();
    for (_, font_id) in style.text_styles.iter_mut() {
        font_id.size *= text_scaling;
    }
    ctx.set_style(style);
}

fn create_widget_visuals(
    previous: style::WidgetVisuals,
    bg_fill: Color32,
    stroke: Color32,
) -> style::WidgetVisuals {
    style::WidgetVisuals {
        bg_fill,
        weak_bg_fill: bg_fill,
        bg_stroke: Stroke {
            color: stroke,
            ..previous.bg_stroke
        },
        ..previous
    }
}
