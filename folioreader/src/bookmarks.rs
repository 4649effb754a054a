//! Bookmarks, stored newest-first under one key

use crate::config::keys;
use foliocore::storage::{self, SharedStore};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters taken before the bookmarked point when cutting an excerpt.
const EXCERPT_LEAD: usize = 60;
const EXCERPT_LEN: usize = 120;
const ID_SUFFIX_LEN: usize = 5;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub chapter_ordinal: usize,
    pub chapter_title: String,
    pub scroll_fraction: f32,
    pub excerpt: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Bookmark {
    pub fn created_local(&self) -> Option<chrono::DateTime<chrono::Local>> {
        chrono::DateTime::from_timestamp_millis(self.created_at).map(|utc| utc.with_timezone(&chrono::Local))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

/// Up to 120 characters of `text` around `fraction`, starting a little
/// before the point so the excerpt reads as context.
pub fn excerpt_at(text: &str, fraction: f32) -> String {
    let len = text.chars().count();
    let point = (len as f32 * fraction.clamp(0.0, 1.0)).floor() as usize;
    let start = point.saturating_sub(EXCERPT_LEAD);
    let excerpt: String = text.chars().skip(start).take(EXCERPT_LEN).collect();
    excerpt.trim().to_string()
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

pub struct BookmarkManager {
    store: SharedStore,
    bookmarks: Vec<Bookmark>,
}

impl BookmarkManager {
    pub fn new(store: SharedStore) -> Self {
        let bookmarks = storage::load_or_default(&*store, keys::BOOKMARKS);
        Self { store, bookmarks }
    }

    pub fn add(&mut self, chapter_ordinal: usize, chapter_title: &str, scroll_fraction: f32, source_text: &str) -> &Bookmark {
        let created_at = chrono::Utc::now().timestamp_millis();
        let mut id = format!("{created_at}-{}", random_suffix());
        while self.bookmarks.iter().any(|b| b.id == id) {
            id = format!("{created_at}-{}", random_suffix());
        }

        let scroll_fraction = scroll_fraction.clamp(0.0, 1.0);
        let mut excerpt = excerpt_at(source_text, scroll_fraction);
        if excerpt.is_empty() {
            excerpt = chapter_title.to_string();
        }

        log::debug!("bookmark {id} in chapter {chapter_ordinal} at {scroll_fraction:.3}");
        self.bookmarks.insert(
            0,
            Bookmark {
                id,
                chapter_ordinal,
                chapter_title: chapter_title.to_string(),
                scroll_fraction,
                excerpt,
                created_at,
            },
        );
        self.persist();
        &self.bookmarks[0]
    }

    pub fn remove(&mut self, id: &str) {
        let before = self.bookmarks.len();
        self.bookmarks.retain(|b| b.id != id);
        if self.bookmarks.len() != before {
            self.persist();
        }
    }

    pub fn list_all(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn get(&self, id: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == id)
    }

    pub fn for_chapter(&self, ordinal: usize) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.chapter_ordinal == ordinal)
    }

    /// Remove every bookmark in the chapter, or add one if there are none.
    pub fn toggle_chapter(&mut self, chapter_ordinal: usize, chapter_title: &str, scroll_fraction: f32, source_text: &str) -> Toggle {
        if self.for_chapter(chapter_ordinal).is_some() {
            self.bookmarks.retain(|b| b.chapter_ordinal != chapter_ordinal);
            self.persist();
            Toggle::Removed
        } else {
            self.add(chapter_ordinal, chapter_title, scroll_fraction, source_text);
            Toggle::Added
        }
    }

    fn persist(&self) {
        if let Err(e) = storage::save(&*self.store, keys::BOOKMARKS, &self.bookmarks) {
            log::warn!("could not save bookmarks: {e}");
        }
    }
}
