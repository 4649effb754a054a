//! One-shot background book loading
//!
//! Reading and parsing an EPUB (or downloading one) can take long enough to
//! freeze the first frame, so it runs on its own thread and the UI polls.

use crate::book::{load_book, Book, LoadError};
use crate::config::BookSource;
use std::sync::mpsc::{self, Receiver, TryRecvError};

pub struct BookLoader {
    source: BookSource,
    rx: Receiver<Result<Book, LoadError>>,
}

impl BookLoader {
    /// Start loading `source`. `notify` runs on the loader thread once the
    /// result is ready; the app passes a repaint request.
    pub fn spawn(source: BookSource, notify: impl FnOnce() + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel();
        let thread_source = source.clone();
        std::thread::spawn(move || {
            let result = load_book(&thread_source);
            // The receiver is gone if the app closed first
            if tx.send(result).is_ok() {
                notify();
            }
        });
        Self { source, rx }
    }

    pub fn source(&self) -> &BookSource {
        &self.source
    }

    /// `None` while loading. Yields the result once.
    pub fn poll(&self) -> Option<Result<Book, LoadError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(LoadError::Interrupted)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::tests::build_epub;
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn wait(loader: &BookLoader) -> Result<Book, LoadError> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(result) = loader.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "loader did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_missing_book_reports_io_error() {
        let loader = BookLoader::spawn(BookSource::Path("/nonexistent/folio.epub".into()), || {});
        assert!(matches!(wait(&loader), Err(LoadError::Io(_))));
    }

    #[test]
    fn test_loads_book_and_notifies() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&build_epub("Loaded", &[("a.xhtml", "<p>Hello</p>")], &[]))
            .unwrap();

        let notified = Arc::new(AtomicBool::new(false));
        let flag = notified.clone();
        let loader = BookLoader::spawn(BookSource::Path(file.path().to_path_buf()), move || {
            flag.store(true, Ordering::SeqCst);
        });

        let book = wait(&loader).unwrap();
        assert_eq!(book.title, "Loaded");
        assert_eq!(book.chapter_count(), 1);
        // notify runs after the send, so give it a moment
        let deadline = Instant::now() + Duration::from_secs(5);
        while !notified.load(Ordering::SeqCst) {
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}
