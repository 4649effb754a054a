//! Custom widgets drawn from the active palette

use crate::theme::Palette;
use egui::{Response, Ui, Widget};

/// A flat button: surface fill, 1px border, accent outline when selected.
pub struct BarButton<'a> {
    text: &'a str,
    selected: bool,
    palette: Palette,
}

impl<'a> BarButton<'a> {
    pub fn new(text: &'a str, palette: Palette) -> Self {
        Self { text, selected: false, palette }
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

impl<'a> Widget for BarButton<'a> {
    fn ui(self, ui: &mut Ui) -> Response {
        let font = egui::FontId::proportional(14.0);
        let galley = ui.painter().layout_no_wrap(self.text.to_string(), font, self.palette.text);
        let padding = egui::vec2(12.0, 5.0);
        let desired_size = egui::vec2(
            galley.size().x + padding.x * 2.0,
            (galley.size().y + padding.y * 2.0).max(ui.spacing().interact_size.y),
        );
        let (rect, response) = ui.allocate_exact_size(desired_size, egui::Sense::click());

        if ui.is_rect_visible(rect) {
            let painter = ui.painter();
            let fill = if response.hovered() || response.is_pointer_button_down_on() {
                self.palette.border
            } else {
                self.palette.surface
            };
            let stroke_color = if self.selected { self.palette.accent } else { self.palette.border };
            let stroke_width = if self.selected { 2.0 } else { 1.0 };

            painter.rect_filled(rect, 4.0, fill);
            painter.rect_stroke(rect, 4.0, egui::Stroke::new(stroke_width, stroke_color));
            painter.galley(rect.center() - galley.size() / 2.0, galley, self.palette.text);
        }

        response
    }
}

/// Thin horizontal bar filled to `fraction` of the available width.
pub fn progress_line(ui: &mut Ui, fraction: f32, palette: Palette) -> Response {
    let height = 3.0;
    let (rect, response) = ui.allocate_exact_size(
        egui::vec2(ui.available_width(), height),
        egui::Sense::hover(),
    );
    if ui.is_rect_visible(rect) {
        let painter = ui.painter();
        painter.rect_filled(rect, 1.5, palette.border);
        let filled = rect.width() * fraction.clamp(0.0, 1.0);
        if filled > 0.0 {
            let bar = egui::Rect::from_min_size(rect.min, egui::vec2(filled, height));
            painter.rect_filled(bar, 1.5, palette.accent);
        }
    }
    response
}

/// Status bar: surface fill, 1px top border
pub fn status_bar(ui: &mut Ui, text: &str, palette: Palette) {
    egui::Frame::none()
        .fill(palette.surface)
        .stroke(egui::Stroke::new(1.0, palette.border))
        .inner_margin(egui::Margin::symmetric(10.0, 4.0))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(text).small().color(palette.muted));
        });
}

/// Frame for side panels and the top/bottom reading bars.
pub fn panel_frame(palette: Palette) -> egui::Frame {
    egui::Frame::none()
        .fill(palette.surface)
        .stroke(egui::Stroke::new(1.0, palette.border))
        .inner_margin(egui::Margin::symmetric(12.0, 8.0))
}
