//! folio application: loading screen, reading view and side panels

use crate::book::SpineIndex;
use crate::bookmarks::Toggle;
use crate::config::ReaderConfig;
use crate::gestures::{GestureEnd, Swipe, SwipeTracker, TapFilter, TapTarget};
use crate::loader::BookLoader;
use crate::preferences::PreferenceManager;
use crate::reader::{show_chapter, ChapterNav, ChapterStep};
use crate::session::{FontChange, ReadingSession};
use egui::{Context, Key, Rect, RichText};
use foliocore::storage::{FileStore, MemoryStore, SharedStore};
use foliocore::theme::consume_zoom_keys;
use foliocore::widgets::{panel_frame, progress_line, status_bar, BarButton};
use foliocore::{FolioTheme, Palette, RepaintController, ThemeName};
use std::rc::Rc;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Panel {
    Contents,
    Bookmarks,
    Settings,
}

/// Something the user asked for this frame. Collected while drawing and
/// applied afterwards, when the session can be borrowed mutably.
#[derive(Clone, Debug, PartialEq)]
enum Action {
    Next,
    Prev,
    Chapter(usize),
    Spine(SpineIndex),
    OpenBookmark(String),
    RemoveBookmark(String),
    ToggleBookmark,
    Theme(ThemeName),
    Font(FontChange),
    TogglePanel(Panel),
    Escape,
}

enum Screen {
    Loading(BookLoader),
    Failed(String),
    Reading(Box<ReadingState>),
}

struct ReadingState {
    session: ReadingSession,
    chrome_visible: bool,
    panel: Option<Panel>,
    taps: TapFilter,
    swipe: SwipeTracker,
    press_on_chrome: bool,
    press_is_touch: bool,
    selection_active: bool,
    /// Offset to force on the scroll area next frame.
    pending_offset: Option<f32>,
    status: Option<String>,
    /// The window was hidden or unfocused last frame.
    hidden: bool,
}

pub struct FolioApp {
    config: ReaderConfig,
    store: SharedStore,
    screen: Screen,
    repaint: RepaintController,
    theme: FolioTheme,
    theme_name: ThemeName,
    applied_theme: Option<ThemeName>,
}

impl FolioApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: ReaderConfig) -> Self {
        let store: SharedStore = match FileStore::open(&config.data_dir) {
            Ok(store) => {
                log::info!("saving reading state in {}", store.dir().display());
                Rc::new(store)
            }
            Err(e) => {
                log::warn!(
                    "cannot use {} for reading state ({e}); progress will not survive a restart",
                    config.data_dir.display()
                );
                Rc::new(MemoryStore::new())
            }
        };

        let theme_name = PreferenceManager::new(store.clone()).get().theme;
        let ctx = cc.egui_ctx.clone();
        let loader = BookLoader::spawn(config.book.clone(), move || ctx.request_repaint());

        Self {
            config,
            store,
            screen: Screen::Loading(loader),
            repaint: RepaintController::new(),
            theme: FolioTheme::default(),
            theme_name,
            applied_theme: None,
        }
    }

    fn poll_loader(&mut self, ctx: &Context) {
        let Screen::Loading(loader) = &self.screen else {
            return;
        };
        let Some(result) = loader.poll() else {
            return;
        };
        self.screen = match result {
            Ok(book) => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!("{} - folio", book.title)));
                let session = ReadingSession::open(book, self.store.clone(), &self.config);
                self.theme_name = session.preferences().theme;
                Screen::Reading(Box::new(ReadingState::new(session)))
            }
            Err(e) => {
                log::error!("failed to load {}: {e}", self.config.book);
                Screen::Failed(e.to_string())
            }
        };
        self.repaint.mark_needs_repaint();
    }

    /// Save progress the moment the window is hidden or loses focus.
    fn watch_visibility(&mut self, ctx: &Context) {
        let hidden = ctx.input(|i| {
            let viewport = i.viewport();
            viewport.focused == Some(false) || viewport.minimized == Some(true)
        });
        if let Screen::Reading(state) = &mut self.screen {
            state.set_hidden(hidden);
        }
    }

    fn render_loading(ctx: &Context, loader: &BookLoader, palette: Palette) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            status_bar(ui, &format!("opening {}", loader.source()), palette);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("loading book...").color(palette.muted));
            });
        });
    }

    fn render_failed(ctx: &Context, message: &str, palette: Palette) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            status_bar(ui, "the book could not be opened", palette);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() / 3.0);
                ui.heading("could not open this book");
                ui.add_space(8.0);
                ui.label(RichText::new(message).color(palette.muted));
            });
        });
    }
}

impl ReadingState {
    fn new(session: ReadingSession) -> Self {
        Self {
            session,
            chrome_visible: true,
            panel: None,
            taps: TapFilter::default(),
            swipe: SwipeTracker::default(),
            press_on_chrome: false,
            press_is_touch: false,
            selection_active: false,
            pending_offset: None,
            status: None,
            hidden: false,
        }
    }

    fn chapter_nav(&self) -> ChapterNav {
        ChapterNav::new(self.session.current_ordinal(), self.session.progress().total_chapters())
    }

    /// Track window visibility; progress is flushed as the window goes away.
    /// Returns true when this call flushed.
    fn set_hidden(&mut self, hidden: bool) -> bool {
        let flushed = hidden && !self.hidden;
        if flushed {
            log::debug!("window hidden, flushing progress");
            self.session.flush();
        }
        self.hidden = hidden;
        flushed
    }

    fn close(&mut self) {
        log::debug!("closing, flushing progress");
        self.session.flush();
    }

    fn read_keys(ctx: &Context) -> Vec<Action> {
        ctx.input(|i| {
            let mut actions = Vec::new();
            if i.modifiers.command || i.modifiers.alt {
                return actions;
            }
            if i.key_pressed(Key::ArrowRight) || i.key_pressed(Key::N) {
                actions.push(Action::Next);
            }
            if i.key_pressed(Key::ArrowLeft) || i.key_pressed(Key::P) {
                actions.push(Action::Prev);
            }
            if i.key_pressed(Key::Plus) || i.key_pressed(Key::Equals) {
                actions.push(Action::Font(FontChange::Larger));
            }
            if i.key_pressed(Key::Minus) {
                actions.push(Action::Font(FontChange::Smaller));
            }
            if i.key_pressed(Key::T) {
                actions.push(Action::TogglePanel(Panel::Contents));
            }
            if i.key_pressed(Key::B) {
                actions.push(Action::TogglePanel(Panel::Bookmarks));
            }
            if i.key_pressed(Key::Escape) {
                actions.push(Action::Escape);
            }
            actions
        })
    }

    fn apply(&mut self, action: Action) {
        let moved = match action {
            Action::Next => self.session.go_next(),
            Action::Prev => self.session.go_prev(),
            Action::Chapter(ordinal) => {
                self.panel = None;
                self.session.go_to_chapter(ordinal)
            }
            Action::Spine(spine) => {
                self.panel = None;
                self.session.go_to_spine(spine)
            }
            Action::OpenBookmark(id) => {
                self.panel = None;
                self.session.open_bookmark(&id)
            }
            Action::RemoveBookmark(id) => {
                self.session.remove_bookmark(&id);
                false
            }
            Action::ToggleBookmark => {
                self.status = match self.session.toggle_bookmark() {
                    Some(Toggle::Added) => Some("bookmark added".to_string()),
                    Some(Toggle::Removed) => Some("bookmark removed".to_string()),
                    None => None,
                };
                false
            }
            Action::Theme(theme) => {
                self.session.set_theme(theme);
                false
            }
            Action::Font(change) => {
                self.session.change_font_size(change);
                false
            }
            Action::TogglePanel(panel) => {
                self.panel = if self.panel == Some(panel) { None } else { Some(panel) };
                // A panel opening mid-stroke takes the pointer
                self.swipe.cancel();
                false
            }
            Action::Escape => {
                if self.panel.take().is_none() {
                    self.chrome_visible = false;
                }
                false
            }
        };
        if moved {
            self.pending_offset = None;
            self.selection_active = false;
            self.status = None;
        }
    }

    /// Turn this frame's pointer events into taps and swipes.
    fn handle_pointer(&mut self, ctx: &Context, chrome: &[Rect], now: Instant) -> Option<Action> {
        let (pressed_at, pos, released, touching, width) = ctx.input(|i| {
            let pressed_at = if i.pointer.primary_pressed() { i.pointer.press_origin() } else { None };
            (
                pressed_at,
                i.pointer.interact_pos(),
                i.pointer.primary_released(),
                i.any_touches(),
                i.screen_rect().width(),
            )
        });

        if let Some(origin) = pressed_at {
            self.press_on_chrome = chrome.iter().any(|rect| rect.contains(origin));
            self.press_is_touch = touching;
            self.swipe.begin(origin.x, origin.y, width);
        }
        if let Some(pos) = pos {
            self.swipe.update(pos.x, pos.y);
        }
        if !released {
            return None;
        }

        match self.swipe.finish()? {
            GestureEnd::Tap => {
                let target = TapTarget {
                    selection_active: self.selection_active,
                    interactive: self.press_on_chrome,
                };
                if self.taps.on_tap(now, target) {
                    self.chrome_visible = !self.chrome_visible;
                } else if !self.press_on_chrome {
                    // A tap on the page clears any selection
                    self.selection_active = false;
                }
                None
            }
            GestureEnd::Swipe(swipe) if self.press_is_touch && !self.press_on_chrome => Some(match swipe {
                Swipe::Next => Action::Next,
                Swipe::Prev => Action::Prev,
            }),
            GestureEnd::Swipe(_) | GestureEnd::Drag => {
                // A mouse drag across the page selects text
                if !self.press_is_touch && !self.press_on_chrome {
                    self.selection_active = true;
                }
                None
            }
        }
    }

    fn show(&mut self, ctx: &Context, repaint: &mut RepaintController, palette: Palette) {
        let now = Instant::now();
        let mut actions = Self::read_keys(ctx);
        let mut chrome: Vec<Rect> = Vec::new();
        let prefs = self.session.preferences();
        let ordinal = self.session.current_ordinal();
        let total = self.session.progress().total_chapters();
        let nav = self.chapter_nav();
        let chapter_title = self
            .session
            .current_chapter()
            .map(|c| c.title.clone())
            .unwrap_or_default();

        if self.chrome_visible {
            let top = egui::TopBottomPanel::top("chapter_bar")
                .frame(panel_frame(palette))
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if ui
                            .add(BarButton::new("contents", palette).selected(self.panel == Some(Panel::Contents)))
                            .clicked()
                        {
                            actions.push(Action::TogglePanel(Panel::Contents));
                        }
                        ui.label(RichText::new(&chapter_title).strong());
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui
                                .add(BarButton::new("bookmarks", palette).selected(self.panel == Some(Panel::Bookmarks)))
                                .clicked()
                            {
                                actions.push(Action::TogglePanel(Panel::Bookmarks));
                            }
                            let marked = self.session.is_bookmarked();
                            let label = if marked { "bookmarked" } else { "bookmark" };
                            if ui.add(BarButton::new(label, palette).selected(marked)).clicked() {
                                actions.push(Action::ToggleBookmark);
                            }
                        });
                    });
                });
            chrome.push(top.response.rect);

            let bottom = egui::TopBottomPanel::bottom("progress_bar")
                .frame(panel_frame(palette))
                .show(ctx, |ui| {
                    progress_line(ui, self.session.book_progress(), palette);
                    ui.add_space(4.0);
                    ui.horizontal(|ui| {
                        let percent = (self.session.book_progress() * 100.0).round();
                        let mut text = format!("chapter {} of {}  |  {percent}%", ordinal + 1, total);
                        if let Some(status) = &self.status {
                            text.push_str("  |  ");
                            text.push_str(status);
                        }
                        ui.label(RichText::new(text).small().color(palette.muted));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui
                                .add(BarButton::new("settings", palette).selected(self.panel == Some(Panel::Settings)))
                                .clicked()
                            {
                                actions.push(Action::TogglePanel(Panel::Settings));
                            }
                        });
                    });
                });
            chrome.push(bottom.response.rect);
        }

        if let Some(panel) = self.panel {
            let side = match panel {
                Panel::Contents => egui::SidePanel::left("contents_panel"),
                Panel::Bookmarks => egui::SidePanel::right("bookmarks_panel"),
                Panel::Settings => egui::SidePanel::right("settings_panel"),
            };
            let response = side
                .frame(panel_frame(palette))
                .default_width(280.0)
                .show(ctx, |ui| match panel {
                    Panel::Contents => self.render_contents(ui, &mut actions),
                    Panel::Bookmarks => self.render_bookmarks(ui, palette, &mut actions),
                    Panel::Settings => Self::render_settings(ui, prefs.theme, prefs.font_size, palette, &mut actions),
                });
            chrome.push(response.response.rect);
        }

        let output = egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(palette.background))
            .show(ctx, |ui| {
                let mut area = egui::ScrollArea::vertical()
                    .id_source(("chapter", ordinal))
                    .auto_shrink([false, false]);
                if let Some(offset) = self.pending_offset.take() {
                    area = area.vertical_scroll_offset(offset);
                }
                area.show(ui, |ui| {
                    self.session
                        .current_chapter()
                        .map(|chapter| show_chapter(ui, chapter, nav, prefs.font_size as f32, palette))
                })
            })
            .inner;

        if let Some(view) = output.inner {
            chrome.push(view.nav_rect);
            actions.extend(view.step.map(|step| match step {
                ChapterStep::Prev => Action::Prev,
                ChapterStep::Next => Action::Next,
            }));
        }

        if let Some(target) = self.session.observe_frame(
            output.state.offset.y,
            output.inner_rect.height(),
            output.content_size.y,
            now,
        ) {
            self.pending_offset = Some(target);
        }

        actions.extend(self.handle_pointer(ctx, &chrome, now));
        let had_actions = !actions.is_empty();
        for action in actions {
            self.apply(action);
        }

        if let Some(remaining) = self.session.poll(now) {
            repaint.wake_after(remaining);
        }
        if had_actions || self.pending_offset.is_some() || self.session.progress().restore_pending() {
            repaint.mark_needs_repaint();
        }
    }

    fn render_contents(&self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let book = self.session.book();
        let current = self.session.current_ordinal();
        ui.heading("contents");
        ui.separator();
        egui::ScrollArea::vertical().id_source("contents_scroll").show(ui, |ui| {
            if book.toc.is_empty() {
                for (ordinal, chapter) in book.chapters.iter().enumerate() {
                    if ui.selectable_label(ordinal == current, &chapter.title).clicked() {
                        actions.push(Action::Chapter(ordinal));
                    }
                }
                return;
            }
            for entry in &book.toc {
                let target = book.ordinal_for_spine(entry.spine_index);
                ui.horizontal(|ui| {
                    ui.add_space(entry.depth as f32 * 14.0);
                    let label = egui::SelectableLabel::new(target == Some(current), &entry.label);
                    if ui.add_enabled(target.is_some(), label).clicked() {
                        actions.push(Action::Spine(entry.spine_index));
                    }
                });
            }
        });
    }

    fn render_bookmarks(&self, ui: &mut egui::Ui, palette: Palette, actions: &mut Vec<Action>) {
        ui.heading("bookmarks");
        ui.separator();
        let bookmarks = self.session.bookmarks();
        if bookmarks.is_empty() {
            ui.label(RichText::new("no bookmarks yet").color(palette.muted));
            return;
        }
        egui::ScrollArea::vertical().id_source("bookmarks_scroll").show(ui, |ui| {
            for bookmark in bookmarks {
                let when = bookmark
                    .created_local()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                ui.label(RichText::new(&bookmark.chapter_title).strong());
                ui.label(
                    RichText::new(format!("{:.0}%  {when}", bookmark.scroll_fraction * 100.0))
                        .small()
                        .color(palette.muted),
                );
                ui.label(RichText::new(&bookmark.excerpt).italics());
                ui.horizontal(|ui| {
                    if ui.add(BarButton::new("open", palette)).clicked() {
                        actions.push(Action::OpenBookmark(bookmark.id.clone()));
                    }
                    if ui.add(BarButton::new("remove", palette)).clicked() {
                        actions.push(Action::RemoveBookmark(bookmark.id.clone()));
                    }
                });
                ui.separator();
            }
        });
    }

    fn render_settings(ui: &mut egui::Ui, theme: ThemeName, font_size: u32, palette: Palette, actions: &mut Vec<Action>) {
        ui.heading("settings");
        ui.separator();
        ui.label("theme");
        ui.horizontal(|ui| {
            for option in ThemeName::ALL {
                if ui.add(BarButton::new(option.label(), palette).selected(option == theme)).clicked() {
                    actions.push(Action::Theme(option));
                }
            }
        });
        ui.add_space(12.0);
        ui.label("text size");
        ui.horizontal(|ui| {
            if ui.add(BarButton::new("A-", palette)).clicked() {
                actions.push(Action::Font(FontChange::Smaller));
            }
            ui.label(format!("{font_size}"));
            if ui.add(BarButton::new("A+", palette)).clicked() {
                actions.push(Action::Font(FontChange::Larger));
            }
        });
    }
}

impl eframe::App for FolioApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.repaint.begin_frame(ctx);
        consume_zoom_keys(ctx);
        self.poll_loader(ctx);
        self.watch_visibility(ctx);

        if let Screen::Reading(state) = &self.screen {
            self.theme_name = state.session.preferences().theme;
        }
        if self.applied_theme != Some(self.theme_name) {
            self.theme.apply(ctx, self.theme_name);
            self.applied_theme = Some(self.theme_name);
        }
        let palette = self.theme_name.palette();

        match &mut self.screen {
            Screen::Loading(loader) => Self::render_loading(ctx, loader, palette),
            Screen::Failed(message) => Self::render_failed(ctx, message, palette),
            Screen::Reading(state) => state.show(ctx, &mut self.repaint, palette),
        }

        self.repaint.end_frame(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Screen::Reading(state) = &mut self.screen {
            state.close();
        }
    }
}
