//! Folio reading themes
//!
//! Three palettes: light, sepia and dark. The reader view and all chrome
//! draw from the active [`Palette`] so switching themes is a single
//! `apply` call.

use egui::{Color32, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};
use serde::{Deserialize, Serialize};

/// The user-selectable color scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    Light,
    Sepia,
    #[default]
    Dark,
}

impl ThemeName {
    pub const ALL: [ThemeName; 3] = [ThemeName::Light, ThemeName::Sepia, ThemeName::Dark];

    pub fn label(self) -> &'static str {
        match self {
            ThemeName::Light => "light",
            ThemeName::Sepia => "sepia",
            ThemeName::Dark => "dark",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            ThemeName::Light => Palette {
                background: Color32::from_rgb(255, 255, 255),
                surface: Color32::from_rgb(245, 245, 244),
                text: Color32::from_rgb(28, 25, 23),
                muted: Color32::from_rgb(120, 113, 108),
                accent: Color32::from_rgb(37, 99, 235),
                border: Color32::from_rgb(214, 211, 209),
                dark: false,
            },
            ThemeName::Sepia => Palette {
                background: Color32::from_rgb(244, 236, 216),
                surface: Color32::from_rgb(234, 224, 200),
                text: Color32::from_rgb(91, 70, 54),
                muted: Color32::from_rgb(140, 117, 96),
                accent: Color32::from_rgb(166, 97, 38),
                border: Color32::from_rgb(214, 198, 166),
                dark: false,
            },
            ThemeName::Dark => Palette {
                background: Color32::from_rgb(18, 18, 18),
                surface: Color32::from_rgb(30, 30, 30),
                text: Color32::from_rgb(212, 212, 212),
                muted: Color32::from_rgb(136, 136, 136),
                accent: Color32::from_rgb(96, 165, 250),
                border: Color32::from_rgb(54, 54, 54),
                dark: true,
            },
        }
    }
}

/// Colors for one theme.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub background: Color32,
    pub surface: Color32,
    pub text: Color32,
    pub muted: Color32,
    pub accent: Color32,
    pub border: Color32,
    pub dark: bool,
}

/// Chrome sizing for folio windows. Reading text size is a user preference
/// and is not part of this.
pub struct FolioTheme {
    pub font_size_body: f32,
    pub font_size_heading: f32,
    pub font_size_small: f32,
    pub window_padding: f32,
    pub item_spacing: f32,
}

impl Default for FolioTheme {
    fn default() -> Self {
        Self {
            font_size_body: 15.0,
            font_size_heading: 20.0,
            font_size_small: 12.0,
            window_padding: 10.0,
            item_spacing: 6.0,
        }
    }
}

impl FolioTheme {
    /// Apply the palette for `theme` to an egui context
    pub fn apply(&self, ctx: &egui::Context, theme: ThemeName) {
        let palette = theme.palette();
        let mut style = Style::default();

        style.text_styles = [
            (TextStyle::Small, FontId::new(self.font_size_small, FontFamily::Proportional)),
            (TextStyle::Body, FontId::new(self.font_size_body, FontFamily::Proportional)),
            (TextStyle::Button, FontId::new(self.font_size_body, FontFamily::Proportional)),
            (TextStyle::Heading, FontId::new(self.font_size_heading, FontFamily::Proportional)),
            (TextStyle::Monospace, FontId::new(self.font_size_body, FontFamily::Monospace)),
        ]
        .into();

        let mut visuals = if palette.dark { Visuals::dark() } else { Visuals::light() };

        visuals.override_text_color = Some(palette.text);
        visuals.window_fill = palette.surface;
        visuals.panel_fill = palette.background;
        visuals.faint_bg_color = palette.surface;
        visuals.extreme_bg_color = palette.background;
        visuals.window_stroke = Stroke::new(1.0, palette.border);
        visuals.window_rounding = Rounding::same(4.0);
        visuals.menu_rounding = Rounding::same(4.0);
        visuals.window_shadow = egui::epaint::Shadow::NONE;
        visuals.popup_shadow = egui::epaint::Shadow::NONE;

        let flat = |ws: &mut egui::style::WidgetVisuals, fill: Color32| {
            ws.bg_fill = fill;
            ws.weak_bg_fill = fill;
            ws.bg_stroke = Stroke::new(1.0, palette.border);
            ws.fg_stroke = Stroke::new(1.0, palette.text);
            ws.rounding = Rounding::same(4.0);
        };
        flat(&mut visuals.widgets.noninteractive, palette.background);
        flat(&mut visuals.widgets.inactive, palette.surface);
        flat(&mut visuals.widgets.hovered, palette.border);
        flat(&mut visuals.widgets.active, palette.border);
        flat(&mut visuals.widgets.open, palette.surface);

        visuals.selection.bg_fill = palette.accent.linear_multiply(0.35);
        visuals.selection.stroke = Stroke::new(1.0, palette.accent);
        visuals.hyperlink_color = palette.accent;

        style.visuals = visuals;
        style.spacing.window_margin = egui::Margin::same(self.window_padding);
        style.spacing.item_spacing = egui::vec2(self.item_spacing, self.item_spacing);
        style.spacing.button_padding = egui::vec2(10.0, 5.0);

        ctx.set_style(style);
    }
}

/// Strip Cmd/Ctrl +/- so egui's zoom doesn't fight the reader's own font
/// size keys. Call at the start of `update()`.
pub fn consume_zoom_keys(ctx: &egui::Context) {
    ctx.input_mut(|i| {
        i.events.retain(|event| {
            !matches!(event,
                egui::Event::Key { key, modifiers, .. }
                    if modifiers.command
                        && matches!(key, egui::Key::Plus | egui::Key::Minus | egui::Key::Equals))
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_names_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&ThemeName::Sepia).unwrap(), "\"sepia\"");
        let parsed: ThemeName = serde_json::from_str("\"light\"").unwrap();
        assert_eq!(parsed, ThemeName::Light);
        assert!(serde_json::from_str::<ThemeName>("\"purple\"").is_err());
    }

    #[test]
    fn test_default_theme_is_dark() {
        assert_eq!(ThemeName::default(), ThemeName::Dark);
        assert!(ThemeName::Dark.palette().dark);
    }

    #[test]
    fn test_palettes_keep_text_readable() {
        for theme in ThemeName::ALL {
            let p = theme.palette();
            assert_ne!(p.text, p.background, "{}", theme.label());
        }
    }
}
