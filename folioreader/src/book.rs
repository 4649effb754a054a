//! Book representation and EPUB ingestion
//!
//! A book is read once, up front. Each spine item is parsed, stripped of
//! anything that could run script, and kept only if its body has content.
//! Two identifiers travel with every chapter: its [`SpineIndex`] (position in
//! the declared reading order) and its ordinal (position in the filtered
//! `chapters` list). They differ as soon as one spine item is dropped, so
//! anything that starts from a spine index must go through
//! [`Book::ordinal_for_spine`].

use crate::config::BookSource;
use epub::doc::{EpubDoc, NavPoint};
use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// Position of an item in the book's declared reading order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpineIndex(pub usize);

/// A loaded book with chapters
#[derive(Clone, Debug)]
pub struct Book {
    pub title: String,
    pub chapters: Vec<Chapter>,
    pub toc: Vec<TocEntry>,
}

#[derive(Clone, Debug)]
pub struct Chapter {
    /// Path of the chapter document inside the container.
    pub href: String,
    /// Sanitized body markup.
    pub html: String,
    pub title: String,
    pub spine_index: SpineIndex,
    pub blocks: Vec<ContentBlock>,
    /// Whitespace-normalized plain text of the body, for excerpts.
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    pub label: String,
    pub href: String,
    pub spine_index: SpineIndex,
    /// Nesting level in the navigation document, 0 for top level.
    pub depth: usize,
}

/// Content blocks for rendering
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentBlock {
    Heading { level: u8, text: String },
    Paragraph(String),
    Quote(String),
    Code(String),
    ListItem(String),
    HorizontalRule,
    Image { alt: String },
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read book: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not download book: {0}")]
    Http(#[from] reqwest::Error),
    #[error("not a readable EPUB: {0}")]
    Epub(String),
    #[error("no chapters found in this EPUB")]
    NoSpine,
    #[error("could not extract any chapter content from this EPUB")]
    NoChapters,
    #[error("book loading stopped before it finished")]
    Interrupted,
}

impl Book {
    /// Parse an EPUB held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LoadError> {
        let mut doc = EpubDoc::from_reader(Cursor::new(bytes))
            .map_err(|e| LoadError::Epub(e.to_string()))?;

        let title = doc
            .mdata("title")
            .map(|item| item.value.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled Book".to_string());

        let spine_ids: Vec<String> = doc.spine.iter().map(|item| item.idref.clone()).collect();
        if spine_ids.is_empty() {
            return Err(LoadError::NoSpine);
        }

        let spine_paths: Vec<String> = spine_ids
            .iter()
            .map(|id| {
                doc.resources
                    .get(id)
                    .map(|res| normalize_path(&res.path.to_string_lossy()))
                    .unwrap_or_else(|| id.clone())
            })
            .collect();

        let mut toc = Vec::new();
        flatten_toc(&doc.toc, &spine_paths, 0, &mut toc);

        let mut chapters: Vec<Chapter> = Vec::new();
        for (position, id) in spine_ids.iter().enumerate() {
            let spine_index = SpineIndex(position);
            let Some((content, _mime)) = doc.get_resource(id) else {
                log::warn!("skipping spine item {position} ({id}): resource missing");
                continue;
            };
            let html = String::from_utf8_lossy(&content);
            let extracted = match extract_chapter(&html) {
                Ok(extracted) => extracted,
                Err(e) => {
                    log::warn!("skipping spine item {position} ({id}): {e}");
                    continue;
                }
            };
            if extracted.body.trim().is_empty() {
                log::debug!("dropping empty spine item {position} ({id})");
                continue;
            }

            let ordinal = chapters.len();
            let title = toc
                .iter()
                .find(|entry| entry.spine_index == spine_index)
                .map(|entry| entry.label.clone())
                .filter(|label| !label.is_empty())
                .or(extracted.heading)
                .unwrap_or_else(|| format!("Chapter {}", ordinal + 1));

            chapters.push(Chapter {
                href: spine_paths[position].clone(),
                html: extracted.body,
                title,
                spine_index,
                blocks: extracted.blocks,
                text: extracted.text,
            });
        }

        if chapters.is_empty() {
            return Err(LoadError::NoChapters);
        }

        log::info!(
            "loaded {:?}: {} chapters from {} spine items, {} contents entries",
            title,
            chapters.len(),
            spine_ids.len(),
            toc.len()
        );

        Ok(Book { title, chapters, toc })
    }

    /// Get total chapter count
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    pub fn chapter(&self, ordinal: usize) -> Option<&Chapter> {
        self.chapters.get(ordinal)
    }

    /// The ordinal of the chapter built from `spine`, if it survived filtering.
    pub fn ordinal_for_spine(&self, spine: SpineIndex) -> Option<usize> {
        self.chapters.iter().position(|c| c.spine_index == spine)
    }
}

/// Fetch and parse the configured book.
pub fn load_book(source: &BookSource) -> Result<Book, LoadError> {
    log::info!("loading book from {source}");
    let bytes = match source {
        BookSource::Path(path) => std::fs::read(path)?,
        BookSource::Url(url) => {
            let response = reqwest::blocking::get(url.as_str())?.error_for_status()?;
            response.bytes()?.to_vec()
        }
    };
    Book::from_bytes(bytes)
}

fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

fn same_document(a: &str, b: &str) -> bool {
    a == b || a.ends_with(&format!("/{b}")) || b.ends_with(&format!("/{a}"))
}

fn flatten_toc(points: &[NavPoint], spine_paths: &[String], depth: usize, out: &mut Vec<TocEntry>) {
    for point in points {
        let href = normalize_path(&point.content.to_string_lossy());
        let document = href.split('#').next().unwrap_or(&href);
        match spine_paths.iter().position(|p| same_document(p, document)) {
            Some(position) => out.push(TocEntry {
                label: point.label.trim().to_string(),
                href: href.clone(),
                spine_index: SpineIndex(position),
                depth,
            }),
            None => log::debug!("contents entry {:?} points outside the spine", point.label),
        }
        flatten_toc(&point.children, spine_paths, depth + 1, out);
    }
}

/// What one chapter document yields once parsed and sanitized.
#[derive(Debug)]
struct ExtractedChapter {
    body: String,
    heading: Option<String>,
    blocks: Vec<ContentBlock>,
    text: String,
}

fn extract_chapter(html: &str) -> std::io::Result<ExtractedChapter> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;

    strip_scripts(&dom.document);

    let Some(body) = find_element(&dom.document, &["body"]) else {
        return Ok(ExtractedChapter {
            body: String::new(),
            heading: None,
            blocks: Vec::new(),
            text: String::new(),
        });
    };

    let mut markup = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut markup, &SerializableHandle::from(body.clone()), opts)?;

    let heading = find_element(&body, &["h1", "h2", "h3"])
        .map(|h| get_text_content(&h))
        .filter(|t| !t.is_empty());

    let mut blocks = Vec::new();
    extract_content(&body, &mut blocks);

    let mut raw_text = String::new();
    collect_plain_text(&body, &mut raw_text);

    Ok(ExtractedChapter {
        body: String::from_utf8_lossy(&markup).into_owned(),
        heading,
        blocks,
        text: collapse_whitespace(&raw_text),
    })
}

/// Remove `<script>` elements, inline event handlers and `javascript:` URLs.
/// The renderer trusts chapter markup, so this is the only line of defense.
fn strip_scripts(handle: &Handle) {
    handle.children.borrow_mut().retain(|child| !is_element(child, "script"));

    if let NodeData::Element { attrs, .. } = &handle.data {
        attrs.borrow_mut().retain(|attr| {
            let name = attr.name.local.as_ref().to_ascii_lowercase();
            let is_handler = name.starts_with("on");
            let is_script_url = matches!(name.as_str(), "href" | "src" | "action" | "formaction" | "xlink:href")
                && attr.value.trim_start().to_ascii_lowercase().starts_with("javascript:");
            !is_handler && !is_script_url
        });
    }

    for child in handle.children.borrow().iter() {
        strip_scripts(child);
    }
}

fn is_element(handle: &Handle, tag: &str) -> bool {
    matches!(&handle.data, NodeData::Element { name, .. } if name.local.as_ref().eq_ignore_ascii_case(tag))
}

/// Depth-first search for the first element whose tag is in `tags`.
fn find_element(handle: &Handle, tags: &[&str]) -> Option<Handle> {
    for child in handle.children.borrow().iter() {
        if tags.iter().any(|tag| is_element(child, tag)) {
            return Some(child.clone());
        }
        if let Some(found) = find_element(child, tags) {
            return Some(found);
        }
    }
    None
}

fn extract_content(handle: &Handle, content: &mut Vec<ContentBlock>) {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let tag = name.local.as_ref();

            match tag {
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    let text = get_text_content(handle);
                    if !text.is_empty() {
                        let level = tag[1..].parse::<u8>().unwrap_or(6);
                        content.push(ContentBlock::Heading { level, text });
                    }
                }
                "p" => {
                    let text = get_text_content(handle);
                    if !text.is_empty() {
                        content.push(ContentBlock::Paragraph(text));
                    } else {
                        // Image-only paragraphs still show their placeholders
                        for child in handle.children.borrow().iter() {
                            extract_content(child, content);
                        }
                    }
                }
                "blockquote" => {
                    let text = get_text_content(handle);
                    if !text.is_empty() {
                        content.push(ContentBlock::Quote(text));
                    }
                }
                "pre" => {
                    let mut text = String::new();
                    collect_text(handle, &mut text);
                    let text = text.trim_matches('\n').to_string();
                    if !text.trim().is_empty() {
                        content.push(ContentBlock::Code(text));
                    }
                }
                "li" => {
                    let text = get_text_content(handle);
                    if !text.is_empty() {
                        content.push(ContentBlock::ListItem(text));
                    }
                }
                "hr" => {
                    content.push(ContentBlock::HorizontalRule);
                }
                "img" | "image" => {
                    let alt = attrs
                        .borrow()
                        .iter()
                        .find(|a| a.name.local.as_ref() == "alt")
                        .map(|a| a.value.trim().to_string())
                        .filter(|alt| !alt.is_empty())
                        .unwrap_or_else(|| "image".to_string());
                    content.push(ContentBlock::Image { alt });
                }
                "style" | "head" | "title" => {}
                _ if !has_structure(handle) => {
                    // Inline-only container: one paragraph, however it is marked up
                    let text = get_text_content(handle);
                    if !text.is_empty() {
                        content.push(ContentBlock::Paragraph(text));
                    }
                }
                _ => {
                    for child in handle.children.borrow().iter() {
                        extract_content(child, content);
                    }
                }
            }
        }
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                extract_content(child, content);
            }
        }
        NodeData::Text { contents } => {
            // Loose text directly inside a container (no <p> wrapper)
            let text = collapse_whitespace(&contents.borrow());
            if !text.is_empty() {
                content.push(ContentBlock::Paragraph(text));
            }
        }
        _ => {}
    }
}

fn get_text_content(handle: &Handle) -> String {
    let mut text = String::new();
    collect_text(handle, &mut text);
    collapse_whitespace(&text)
}

fn collect_text(handle: &Handle, text: &mut String) {
    match &handle.data {
        NodeData::Text { contents } => {
            text.push_str(&contents.borrow());
        }
        NodeData::Element { name, .. } if name.local.as_ref() == "style" => {}
        NodeData::Element { .. } | NodeData::Document => {
            for child in handle.children.borrow().iter() {
                collect_text(child, text);
            }
        }
        _ => {}
    }
}

/// Like [`collect_text`], but keeps adjacent blocks from running together.
fn collect_plain_text(handle: &Handle, text: &mut String) {
    match &handle.data {
        NodeData::Text { contents } => {
            text.push_str(&contents.borrow());
        }
        NodeData::Element { name, .. } => {
            let tag = name.local.as_ref();
            if tag == "style" {
                return;
            }
            for child in handle.children.borrow().iter() {
                collect_plain_text(child, text);
            }
            if is_block_tag(tag) {
                text.push(' ');
            }
        }
        _ => {}
    }
}

fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div" | "section" | "article" | "blockquote" | "pre" | "li" | "ul" | "ol" | "br"
            | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "tr" | "td" | "th" | "figure" | "figcaption"
    )
}

/// Whether any descendant needs a block of its own.
fn has_structure(handle: &Handle) -> bool {
    handle.children.borrow().iter().any(|child| match &child.data {
        NodeData::Element { name, .. } => {
            let tag = name.local.as_ref();
            is_block_tag(tag)
                || matches!(tag, "hr" | "img" | "image" | "table" | "svg")
                || has_structure(child)
        }
        _ => false,
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Build a small EPUB in memory. Each chapter is `(file name, body markup)`;
    /// `toc` pairs a label with a chapter file name.
    pub(crate) fn build_epub(title: &str, chapters: &[(&str, &str)], toc: &[(&str, &str)]) -> Vec<u8> {
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));

        zip.start_file("mimetype", options).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.start_file("META-INF/container.xml", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
        )
        .unwrap();

        let mut manifest = String::from(
            r#"<item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>"#,
        );
        let mut spine = String::new();
        for (i, (file, _)) in chapters.iter().enumerate() {
            manifest.push_str(&format!(
                r#"<item id="ch{i}" href="{file}" media-type="application/xhtml+xml"/>"#
            ));
            spine.push_str(&format!(r#"<itemref idref="ch{i}"/>"#));
        }
        let opf = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:identifier id="id">folio-test</dc:identifier>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>{manifest}</manifest>
  <spine toc="ncx">{spine}</spine>
</package>"#
        );
        zip.start_file("OEBPS/content.opf", options).unwrap();
        zip.write_all(opf.as_bytes()).unwrap();

        let mut nav_points = String::new();
        for (i, (label, file)) in toc.iter().enumerate() {
            nav_points.push_str(&format!(
                r#"<navPoint id="np{i}" playOrder="{order}"><navLabel><text>{label}</text></navLabel><content src="{file}"/></navPoint>"#,
                order = i + 1
            ));
        }
        let ncx = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="folio-test"/></head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>{nav_points}</navMap>
</ncx>"#
        );
        zip.start_file("OEBPS/toc.ncx", options).unwrap();
        zip.write_all(ncx.as_bytes()).unwrap();

        for (file, body) in chapters {
            let doc = format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>x</title></head><body>{body}</body></html>"#
            );
            zip.start_file(format!("OEBPS/{file}"), options).unwrap();
            zip.write_all(doc.as_bytes()).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    fn sample_book() -> Book {
        let bytes = build_epub(
            "A Test Book",
            &[
                ("one.xhtml", r#"<p onclick="steal()">First words.</p><script>alert(1)</script>"#),
                ("blank.xhtml", "   \n  "),
                ("two.xhtml", "<h2>The <em>Second</em> Part</h2><p>More words here.</p>"),
                ("three.xhtml", "<p>No heading at all.</p>"),
            ],
            &[("Opening", "one.xhtml"), ("Blank Page", "blank.xhtml")],
        );
        Book::from_bytes(bytes).unwrap()
    }

    #[test]
    fn test_empty_chapters_are_dropped_and_indices_diverge() {
        let book = sample_book();
        assert_eq!(book.title, "A Test Book");
        assert_eq!(book.chapter_count(), 3);
        let spines: Vec<usize> = book.chapters.iter().map(|c| c.spine_index.0).collect();
        assert_eq!(spines, vec![0, 2, 3]);

        assert_eq!(book.ordinal_for_spine(SpineIndex(0)), Some(0));
        assert_eq!(book.ordinal_for_spine(SpineIndex(1)), None);
        assert_eq!(book.ordinal_for_spine(SpineIndex(2)), Some(1));
        assert_eq!(book.ordinal_for_spine(SpineIndex(3)), Some(2));
    }

    #[test]
    fn test_title_resolution_order() {
        let book = sample_book();
        // Contents label, then first heading, then a synthesized ordinal title
        assert_eq!(book.chapters[0].title, "Opening");
        assert_eq!(book.chapters[1].title, "The Second Part");
        assert_eq!(book.chapters[2].title, "Chapter 3");
    }

    #[test]
    fn test_contents_keeps_entries_for_dropped_chapters() {
        let book = sample_book();
        let labels: Vec<(&str, usize)> = book
            .toc
            .iter()
            .map(|t| (t.label.as_str(), t.spine_index.0))
            .collect();
        assert_eq!(labels, vec![("Opening", 0), ("Blank Page", 1)]);
    }

    #[test]
    fn test_scripts_and_handlers_are_stripped() {
        let book = sample_book();
        let html = &book.chapters[0].html;
        assert!(!html.contains("<script"));
        assert!(!html.contains("alert"));
        assert!(!html.contains("onclick"));
        assert!(html.contains("First words."));
    }

    #[test]
    fn test_extract_strips_javascript_urls() {
        let extracted = extract_chapter(
            r#"<html><body><a href="javascript:void(0)">link</a><a href="notes.xhtml">ok</a></body></html>"#,
        )
        .unwrap();
        assert!(!extracted.body.contains("javascript:"));
        assert!(extracted.body.contains("notes.xhtml"));
    }

    #[test]
    fn test_extract_blocks_and_text() {
        let extracted = extract_chapter(
            "<html><body><h1>Title</h1><p>Alpha   beta</p><p>gamma</p>\
             <blockquote>Quoted</blockquote><ul><li>item</li></ul><hr/>\
             <p><img src=\"a.png\" alt=\"A map\"/></p><pre>let x = 1;</pre></body></html>",
        )
        .unwrap();
        assert_eq!(extracted.heading.as_deref(), Some("Title"));
        assert_eq!(
            extracted.blocks,
            vec![
                ContentBlock::Heading { level: 1, text: "Title".into() },
                ContentBlock::Paragraph("Alpha beta".into()),
                ContentBlock::Paragraph("gamma".into()),
                ContentBlock::Quote("Quoted".into()),
                ContentBlock::ListItem("item".into()),
                ContentBlock::HorizontalRule,
                ContentBlock::Image { alt: "A map".into() },
                ContentBlock::Code("let x = 1;".into()),
            ]
        );
        assert_eq!(extracted.text, "Title Alpha beta gamma Quoted item let x = 1;");
    }

    #[test]
    fn test_inline_markup_stays_one_paragraph() {
        let extracted = extract_chapter(
            "<html><body><div>Some <em>emphasized</em> text</div><div>one<br/>two</div></body></html>",
        )
        .unwrap();
        assert_eq!(
            extracted.blocks,
            vec![
                ContentBlock::Paragraph("Some emphasized text".into()),
                ContentBlock::Paragraph("one".into()),
                ContentBlock::Paragraph("two".into()),
            ]
        );
    }

    #[test]
    fn test_book_without_content_fails() {
        let bytes = build_epub("Hollow", &[("a.xhtml", ""), ("b.xhtml", "  ")], &[]);
        assert!(matches!(Book::from_bytes(bytes), Err(LoadError::NoChapters)));
    }

    #[test]
    fn test_garbage_is_not_an_epub() {
        assert!(matches!(
            Book::from_bytes(b"definitely not a zip".to_vec()),
            Err(LoadError::Epub(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = BookSource::Path("/nonexistent/folio/book.epub".into());
        assert!(matches!(load_book(&source), Err(LoadError::Io(_))));
    }
}
