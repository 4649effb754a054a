//! Chapter rendering: content blocks laid out as one scrolling column

use crate::book::{Chapter, ContentBlock};
use egui::{FontId, Rect, RichText, Ui};
use foliocore::widgets::BarButton;
use foliocore::Palette;

/// Widest the text column gets, in points.
pub const MAX_COLUMN_WIDTH: f32 = 680.0;

fn heading_scale(level: u8) -> f32 {
    match level {
        1 => 1.8,
        2 => 1.5,
        3 => 1.3,
        _ => 1.1,
    }
}

/// Which of the end-of-chapter buttons to offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChapterNav {
    pub has_prev: bool,
    pub has_next: bool,
}

impl ChapterNav {
    pub fn new(ordinal: usize, total: usize) -> Self {
        Self {
            has_prev: ordinal > 0,
            has_next: ordinal + 1 < total,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChapterStep {
    Prev,
    Next,
}

/// What the reader did with the chapter view this frame.
#[derive(Clone, Copy, Debug)]
pub struct ChapterView {
    pub step: Option<ChapterStep>,
    /// Screen area of the previous/next row, so presses there are not taps.
    pub nav_rect: Rect,
}

/// Lay out `chapter` at `font_size`: its title, every block, then the
/// previous/next buttons. Call inside a vertical scroll area; the column is
/// centered and capped at [`MAX_COLUMN_WIDTH`].
pub fn show_chapter(ui: &mut Ui, chapter: &Chapter, nav: ChapterNav, font_size: f32, palette: Palette) -> ChapterView {
    let available = ui.available_width();
    let column = available.min(MAX_COLUMN_WIDTH);
    let margin = ((available - column) / 2.0).max(0.0);
    let mut step = None;
    let mut nav_rect = Rect::NOTHING;

    ui.horizontal_top(|ui| {
        ui.add_space(margin);
        ui.vertical(|ui| {
            ui.set_width(column);
            ui.add_space(font_size * 2.0);
            ui.label(
                RichText::new(&chapter.title)
                    .font(FontId::proportional(font_size * heading_scale(2)))
                    .color(palette.text)
                    .strong(),
            );
            ui.add_space(font_size);
            for block in body_blocks(chapter) {
                show_block(ui, block, font_size, palette);
            }

            ui.add_space(font_size * 2.0);
            let row = ui.horizontal(|ui| {
                if nav.has_prev && ui.add(BarButton::new("← previous", palette)).clicked() {
                    step = Some(ChapterStep::Prev);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if nav.has_next && ui.add(BarButton::new("next →", palette)).clicked() {
                        step = Some(ChapterStep::Next);
                    }
                });
            });
            nav_rect = row.response.rect;
            ui.add_space(font_size * 4.0);
        });
    });
    ChapterView { step, nav_rect }
}

/// The chapter's blocks minus a leading heading that repeats the title.
fn body_blocks(chapter: &Chapter) -> &[ContentBlock] {
    match chapter.blocks.first() {
        Some(ContentBlock::Heading { text, .. }) if *text == chapter.title => &chapter.blocks[1..],
        _ => &chapter.blocks,
    }
}

fn show_block(ui: &mut Ui, block: &ContentBlock, font_size: f32, palette: Palette) {
    let paragraph_gap = font_size * 0.8;
    match block {
        ContentBlock::Heading { level, text } => {
            ui.add_space(font_size * 0.6);
            ui.label(
                RichText::new(text)
                    .font(FontId::proportional(font_size * heading_scale(*level)))
                    .color(palette.text)
                    .strong(),
            );
            ui.add_space(paragraph_gap);
        }
        ContentBlock::Paragraph(text) => {
            ui.label(RichText::new(text).size(font_size).color(palette.text));
            ui.add_space(paragraph_gap);
        }
        ContentBlock::Quote(text) => {
            egui::Frame::none()
                .inner_margin(egui::Margin { left: font_size, ..Default::default() })
                .show(ui, |ui| {
                    let rect = ui.max_rect();
                    ui.label(RichText::new(text).size(font_size).color(palette.muted).italics());
                    let left = rect.left() - font_size * 0.5;
                    ui.painter().vline(
                        left,
                        rect.top()..=ui.min_rect().bottom(),
                        egui::Stroke::new(2.0, palette.border),
                    );
                });
            ui.add_space(paragraph_gap);
        }
        ContentBlock::Code(text) => {
            egui::Frame::none()
                .fill(palette.surface)
                .stroke(egui::Stroke::new(1.0, palette.border))
                .inner_margin(egui::Margin::same(8.0))
                .show(ui, |ui| {
                    ui.label(
                        RichText::new(text)
                            .font(FontId::monospace(font_size * 0.85))
                            .color(palette.text),
                    );
                });
            ui.add_space(paragraph_gap);
        }
        ContentBlock::ListItem(text) => {
            ui.horizontal_top(|ui| {
                ui.label(RichText::new("•").size(font_size).color(palette.muted));
                ui.label(RichText::new(text).size(font_size).color(palette.text));
            });
            ui.add_space(font_size * 0.3);
        }
        ContentBlock::HorizontalRule => {
            ui.add_space(paragraph_gap);
            let width = ui.available_width();
            let (rect, _) = ui.allocate_exact_size(egui::vec2(width, 1.0), egui::Sense::hover());
            let third = rect.width() / 3.0;
            ui.painter().hline(
                (rect.left() + third)..=(rect.right() - third),
                rect.center().y,
                egui::Stroke::new(1.0, palette.border),
            );
            ui.add_space(paragraph_gap);
        }
        ContentBlock::Image { alt } => {
            let label = if alt.is_empty() { "[image]".to_string() } else { format!("[image: {alt}]") };
            ui.label(RichText::new(label).size(font_size * 0.85).color(palette.muted).italics());
            ui.add_space(paragraph_gap);
        }
    }
}
