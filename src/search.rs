//! Full-text search over a parsed document.

use memchr::memmem::Finder;
use serde::Serialize;

use crate::model::{Document, Element};

/// Characters of context kept on each side of a match.
const SNIPPET_CONTEXT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub chapter_index: usize,
    pub element_index: usize,
    /// `(row, column)` when the match is inside a table cell.
    pub cell: Option<(usize, usize)>,
    /// Byte offset of the match within the searched text.
    pub match_offset: usize,
    pub snippet: String,
}

/// Find every case-insensitive occurrence of `query`.
///
/// Matches may overlap. A blank query finds nothing.
pub fn search(document: &Document, query: &str) -> Vec<SearchResult> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    let finder = Finder::new(needle.as_bytes());
    let mut results = Vec::new();

    for (chapter_index, chapter) in document.chapters.iter().enumerate() {
        for (element_index, element) in chapter.elements.iter().enumerate() {
            let mut collect = |text: &str, cell: Option<(usize, usize)>| {
                for (start, end) in find_all(&finder, text) {
                    results.push(SearchResult {
                        chapter_index,
                        element_index,
                        cell,
                        match_offset: start,
                        snippet: snippet(text, start, end),
                    });
                }
            };

            match element {
                Element::Text(text) => collect(&text.content, None),
                Element::Table(table) => {
                    for (r, row) in table.rows.iter().enumerate() {
                        for (c, cell) in row.cells.iter().enumerate() {
                            collect(&cell.text(), Some((r, c)));
                        }
                    }
                }
                Element::Image(_) => {}
            }
        }
    }
    results
}

/// Byte ranges in `text` whose lowercase form matches the finder's needle.
fn find_all(finder: &Finder<'_>, text: &str) -> Vec<(usize, usize)> {
    // Lowercasing can change byte lengths, so keep a map back to `text`.
    let mut lowered = String::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len() + 1);
    for (i, c) in text.char_indices() {
        for lc in c.to_lowercase() {
            lowered.push(lc);
            origin.resize(lowered.len(), i);
        }
    }
    origin.push(text.len());

    let hay = lowered.as_bytes();
    let len = finder.needle().len();
    let mut matches = Vec::new();
    let mut pos = 0;
    while let Some(found) = finder.find(&hay[pos..]) {
        let at = pos + found;
        matches.push((origin[at], origin[at + len]));
        pos = at + 1;
    }
    matches
}

fn snippet(text: &str, start: usize, end: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(SNIPPET_CONTEXT - 1)
        .map_or(0, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(SNIPPET_CONTEXT)
        .map_or(text.len(), |(i, _)| end + i);
    format!("...{}...", text[from..to].replace('\n', " "))
}
