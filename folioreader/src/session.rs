//! A reading session: one book plus everything remembered about reading it
//!
//! The session owns the loaded [`Book`] and the progress, bookmark and
//! preference managers, all over the same store. Every user action the app
//! exposes goes through here, so it can be driven end to end in tests.

use crate::book::{Book, Chapter, SpineIndex};
use crate::bookmarks::{Bookmark, BookmarkManager, Toggle};
use crate::config::ReaderConfig;
use crate::preferences::{PreferenceManager, Preferences, PreferencesUpdate};
use crate::progress::ProgressTracker;
use foliocore::storage::SharedStore;
use foliocore::ThemeName;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontChange {
    Larger,
    Smaller,
}

pub struct ReadingSession {
    book: Book,
    progress: ProgressTracker,
    bookmarks: BookmarkManager,
    preferences: PreferenceManager,
    current_prefs: Preferences,
}

impl ReadingSession {
    pub fn open(book: Book, store: SharedStore, config: &ReaderConfig) -> Self {
        Self::with_debounce(book, store, config.scroll_debounce)
    }

    pub fn with_debounce(book: Book, store: SharedStore, debounce: Duration) -> Self {
        let mut progress = ProgressTracker::new(store.clone(), debounce);
        let ordinal = progress.initialize(book.chapter_count());
        let preferences = PreferenceManager::new(store.clone());
        let current_prefs = preferences.get();
        log::info!(
            "opened {:?} at chapter {} of {}",
            book.title,
            ordinal + 1,
            book.chapter_count()
        );
        Self {
            book,
            progress,
            bookmarks: BookmarkManager::new(store),
            preferences,
            current_prefs,
        }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn current_ordinal(&self) -> usize {
        self.progress.current_chapter()
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.book.chapter(self.progress.current_chapter())
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn book_progress(&self) -> f32 {
        self.progress.book_progress()
    }

    pub fn go_next(&mut self) -> bool {
        let moved = self.progress.go_next();
        self.entered(moved)
    }

    pub fn go_prev(&mut self) -> bool {
        let moved = self.progress.go_prev();
        self.entered(moved)
    }

    pub fn go_to_chapter(&mut self, ordinal: usize) -> bool {
        let moved = self.progress.set_chapter(ordinal);
        self.entered(moved)
    }

    /// Contents jump. Entries pointing at a dropped spine item go nowhere.
    pub fn go_to_spine(&mut self, spine: SpineIndex) -> bool {
        match self.book.ordinal_for_spine(spine) {
            Some(ordinal) => {
                let moved = self.progress.set_chapter(ordinal);
                self.entered(moved)
            }
            None => {
                log::debug!("contents entry for spine item {} has no chapter", spine.0);
                false
            }
        }
    }

    pub fn open_bookmark(&mut self, id: &str) -> bool {
        let Some(bookmark) = self.bookmarks.get(id) else {
            return false;
        };
        let (ordinal, fraction) = (bookmark.chapter_ordinal, bookmark.scroll_fraction);
        let moved = self.progress.jump_to(ordinal, fraction);
        self.entered(moved)
    }

    /// Bookmark the current position, or clear the chapter's bookmarks.
    pub fn toggle_bookmark(&mut self) -> Option<Toggle> {
        let ordinal = self.progress.current_chapter();
        let fraction = self.progress.chapter_fraction();
        let chapter = self.book.chapter(ordinal)?;
        Some(self.bookmarks.toggle_chapter(ordinal, &chapter.title, fraction, &chapter.text))
    }

    pub fn is_bookmarked(&self) -> bool {
        self.bookmarks.for_chapter(self.progress.current_chapter()).is_some()
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        self.bookmarks.list_all()
    }

    pub fn remove_bookmark(&mut self, id: &str) {
        self.bookmarks.remove(id);
    }

    pub fn preferences(&self) -> Preferences {
        self.current_prefs
    }

    pub fn set_theme(&mut self, theme: ThemeName) -> Preferences {
        self.current_prefs = self.preferences.set(PreferencesUpdate::theme(theme));
        self.current_prefs
    }

    /// Step the font size. A change reflows the chapter, so the current
    /// fraction is restored once the new layout settles.
    pub fn change_font_size(&mut self, change: FontChange) -> Preferences {
        let before = self.current_prefs.font_size;
        self.current_prefs = match change {
            FontChange::Larger => self.preferences.larger_font(),
            FontChange::Smaller => self.preferences.smaller_font(),
        };
        if self.current_prefs.font_size != before {
            self.progress.relayout();
        }
        self.current_prefs
    }

    /// Feed one frame of the reading view; returns an offset to scroll to.
    pub fn observe_frame(&mut self, offset: f32, viewport_height: f32, content_height: f32, now: Instant) -> Option<f32> {
        self.progress.observe_frame(offset, viewport_height, content_height, now)
    }

    /// Persist a due scroll position; returns the time until the next one.
    pub fn poll(&mut self, now: Instant) -> Option<Duration> {
        self.progress.poll(now)
    }

    pub fn flush(&mut self) {
        self.progress.flush_now();
    }

    fn entered(&self, moved: bool) -> bool {
        if let Some(chapter) = self.current_chapter().filter(|_| moved) {
            log::debug!(
                "entered chapter {} ({}, {} bytes of markup)",
                self.current_ordinal() + 1,
                chapter.href,
                chapter.html.len()
            );
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::tests::build_epub;
    use crate::config::keys;
    use foliocore::storage::{self, MemoryStore};
    use std::collections::BTreeMap;
    use std::rc::Rc;

    const WINDOW: Duration = Duration::from_millis(500);

    fn book() -> Book {
        let bytes = build_epub(
            "Session Book",
            &[
                ("a.xhtml", "<h1>Start</h1><p>The opening lines of the book.</p>"),
                ("empty.xhtml", ""),
                ("b.xhtml", "<h1>Middle</h1><p>Somewhere in the middle.</p>"),
                ("c.xhtml", "<h1>End</h1><p>The last words.</p>"),
            ],
            &[("Start", "a.xhtml"), ("Nothing", "empty.xhtml"), ("Middle", "b.xhtml")],
        );
        Book::from_bytes(bytes).unwrap()
    }

    fn session(store: &Rc<MemoryStore>) -> ReadingSession {
        ReadingSession::with_debounce(book(), store.clone(), WINDOW)
    }

    /// Let the pending restore land on a 1000pt viewport over 3000pt content.
    fn settle(session: &mut ReadingSession) -> Option<f32> {
        let now = Instant::now();
        session.observe_frame(0.0, 1000.0, 3000.0, now);
        session.observe_frame(0.0, 1000.0, 3000.0, now)
    }

    #[test]
    fn test_navigation_and_restart() {
        let store = Rc::new(MemoryStore::new());
        let mut reading = session(&store);
        assert_eq!(reading.current_ordinal(), 0);
        assert!(reading.go_next());
        assert!(reading.go_next());
        assert!(!reading.go_next());
        assert_eq!(reading.current_chapter().unwrap().title, "End");

        let reopened = session(&store);
        assert_eq!(reopened.current_ordinal(), 2);
    }

    #[test]
    fn test_contents_jump_uses_ordinal_lookup() {
        let store = Rc::new(MemoryStore::new());
        let mut reading = session(&store);
        // Spine item 2 is the second surviving chapter
        assert!(reading.go_to_spine(SpineIndex(2)));
        assert_eq!(reading.current_ordinal(), 1);
        assert_eq!(reading.current_chapter().unwrap().title, "Middle");

        assert!(!reading.go_to_spine(SpineIndex(1)));
        assert_eq!(reading.current_ordinal(), 1);
    }

    #[test]
    fn test_bookmark_round_trip() {
        let store = Rc::new(MemoryStore::new());
        let mut reading = session(&store);
        reading.go_to_chapter(1);
        settle(&mut reading);
        reading.observe_frame(1000.0, 1000.0, 3000.0, Instant::now());
        assert_eq!(reading.progress().chapter_fraction(), 0.5);

        assert_eq!(reading.toggle_bookmark(), Some(Toggle::Added));
        assert!(reading.is_bookmarked());
        let id = reading.bookmarks()[0].id.clone();
        assert_eq!(reading.bookmarks()[0].chapter_title, "Middle");
        assert!(!reading.bookmarks()[0].excerpt.is_empty());

        reading.go_to_chapter(0);
        assert!(!reading.is_bookmarked());
        assert!(reading.open_bookmark(&id));
        assert_eq!(reading.current_ordinal(), 1);
        assert_eq!(settle(&mut reading), Some(1000.0));

        assert_eq!(reading.toggle_bookmark(), Some(Toggle::Removed));
        assert!(reading.bookmarks().is_empty());
        assert!(!reading.open_bookmark(&id));
    }

    #[test]
    fn test_bookmark_past_end_of_book_is_ignored() {
        let store = Rc::new(MemoryStore::new());
        storage::save(
            &*store,
            keys::BOOKMARKS,
            &vec![Bookmark {
                id: "1-abcde".into(),
                chapter_ordinal: 9,
                chapter_title: "Gone".into(),
                scroll_fraction: 0.3,
                excerpt: "Gone".into(),
                created_at: 1,
            }],
        )
        .unwrap();
        let mut reading = session(&store);
        assert!(!reading.open_bookmark("1-abcde"));
        assert_eq!(reading.current_ordinal(), 0);
    }

    #[test]
    fn test_font_change_reflows_at_same_fraction() {
        let store = Rc::new(MemoryStore::new());
        let mut reading = session(&store);
        settle(&mut reading);
        reading.observe_frame(500.0, 1000.0, 3000.0, Instant::now());

        let prefs = reading.change_font_size(FontChange::Larger);
        assert_eq!(prefs.font_size, 20);
        assert!(reading.progress().restore_pending());

        // Larger text, taller chapter: same fraction, new offset
        let now = Instant::now();
        reading.observe_frame(500.0, 1000.0, 5000.0, now);
        assert_eq!(reading.observe_frame(500.0, 1000.0, 5000.0, now), Some(1000.0));
    }

    #[test]
    fn test_theme_persists() {
        let store = Rc::new(MemoryStore::new());
        let mut reading = session(&store);
        assert_eq!(reading.preferences().theme, ThemeName::Dark);
        reading.set_theme(ThemeName::Sepia);
        assert_eq!(session(&store).preferences().theme, ThemeName::Sepia);
    }

    #[test]
    fn test_flush_on_hide() {
        let store = Rc::new(MemoryStore::new());
        let mut reading = session(&store);
        settle(&mut reading);
        reading.observe_frame(2000.0, 1000.0, 3000.0, Instant::now());
        reading.flush();

        let positions: BTreeMap<usize, f32> = storage::load_or_default(&*store, keys::SCROLL_POSITIONS);
        assert_eq!(positions.get(&0), Some(&1.0));
        assert_eq!(reading.poll(Instant::now() + WINDOW), None);
    }
}
