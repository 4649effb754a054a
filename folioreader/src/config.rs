//! Reader configuration: where the book comes from and how progress is saved

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Used when neither the command line nor the environment names a book.
pub const DEFAULT_BOOK: &str = "books/book.epub";

/// Trailing-edge delay between the last scroll and the write of its position.
pub const DEFAULT_SCROLL_DEBOUNCE: Duration = Duration::from_millis(500);

pub const ENV_BOOK: &str = "FOLIO_BOOK";
pub const ENV_SCROLL_DEBOUNCE_MS: &str = "FOLIO_SCROLL_DEBOUNCE_MS";
pub const ENV_DATA_DIR: &str = "FOLIO_DATA_DIR";

/// Store keys for the persisted slices of a reading session.
pub mod keys {
    pub const SETTINGS: &str = "settings";
    pub const CHAPTER_INDEX: &str = "chapter-index";
    pub const SCROLL_POSITIONS: &str = "scroll-positions";
    pub const BOOKMARKS: &str = "bookmarks";
}

/// The one book this reader opens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookSource {
    Path(PathBuf),
    Url(String),
}

impl BookSource {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            BookSource::Url(raw.to_string())
        } else if let Some(path) = raw.strip_prefix("file://") {
            BookSource::Path(PathBuf::from(path))
        } else {
            BookSource::Path(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for BookSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookSource::Path(path) => write!(f, "{}", path.display()),
            BookSource::Url(url) => f.write_str(url),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReaderConfig {
    pub book: BookSource,
    pub scroll_debounce: Duration,
    pub data_dir: PathBuf,
}

impl ReaderConfig {
    /// Resolve from the process arguments and environment.
    pub fn from_env() -> Self {
        Self::resolve(std::env::args().nth(1), |key| std::env::var(key).ok())
    }

    /// Book: first argument, then `FOLIO_BOOK` at runtime, then `FOLIO_BOOK`
    /// at build time, then [`DEFAULT_BOOK`].
    pub fn resolve(arg: Option<String>, env: impl Fn(&str) -> Option<String>) -> Self {
        let book = arg
            .filter(|a| !a.trim().is_empty())
            .or_else(|| env(ENV_BOOK).filter(|v| !v.trim().is_empty()))
            .or_else(|| option_env!("FOLIO_BOOK").map(str::to_string))
            .unwrap_or_else(|| DEFAULT_BOOK.to_string());

        let scroll_debounce = match env(ENV_SCROLL_DEBOUNCE_MS) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    log::warn!("ignoring {ENV_SCROLL_DEBOUNCE_MS}={raw:?}: not a whole number of milliseconds");
                    DEFAULT_SCROLL_DEBOUNCE
                }
            },
            None => DEFAULT_SCROLL_DEBOUNCE,
        };

        let data_dir = env(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| foliocore::storage::config_dir("folio"));

        Self {
            book: BookSource::parse(&book),
            scroll_debounce,
            data_dir,
        }
    }
}
