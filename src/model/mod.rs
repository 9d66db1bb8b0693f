//! Normalized document model.
//!
//! A [`Document`] is produced once per parse and never mutated afterwards.
//! Everything downstream (pagination, the word stream, search) addresses
//! content by `(chapter index, element index)` into this structure.

use serde::Serialize;

/// Placeholder used when the package declares no title.
pub const UNTITLED: &str = "Untitled Book";
/// Placeholder used when the package declares no creator.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// A parsed book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub title: String,
    pub author: String,
    pub chapters: Vec<Chapter>,
}

impl Document {
    /// Build a document, substituting placeholders for blank metadata.
    pub fn new(title: &str, author: &str, chapters: Vec<Chapter>) -> Self {
        let or = |value: &str, fallback: &str| {
            let value = value.trim();
            if value.is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        };
        Self {
            title: or(title, UNTITLED),
            author: or(author, UNKNOWN_AUTHOR),
            chapters,
        }
    }

    pub fn chapter(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    pub fn element(&self, chapter: usize, element: usize) -> Option<&Element> {
        self.chapters.get(chapter)?.elements.get(element)
    }

    /// Chapters with a non-empty title, paired with their index.
    pub fn table_of_contents(&self) -> impl Iterator<Item = (usize, &Chapter)> {
        self.chapters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_listed())
    }
}

/// One spine entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    /// Empty when the chapter should be hidden from the table of contents.
    pub title: String,
    /// Archive path the chapter was read from.
    pub path: String,
    pub elements: Vec<Element>,
}

impl Chapter {
    pub fn is_listed(&self) -> bool {
        !self.title.is_empty()
    }
}

/// Content element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Text(TextElement),
    Image(ImageElement),
    Table(TableElement),
}

impl Element {
    pub fn text(content: impl Into<String>, style: TextStyle) -> Self {
        Element::Text(TextElement {
            content: content.into(),
            style,
        })
    }

    pub fn as_text(&self) -> Option<&TextElement> {
        match self {
            Element::Text(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TextStyle {
    Title,
    Heading,
    Body,
    Caption,
    Quote,
}

impl TextStyle {
    /// Title and Heading text both feed chapter title resolution.
    pub fn is_heading(self) -> bool {
        matches!(self, TextStyle::Title | TextStyle::Heading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextElement {
    pub content: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageElement {
    /// Archive path of the image resource.
    pub resource_path: String,
    pub caption: Option<String>,
    pub is_full_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableElement {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub cells: Vec<Cell>,
}

/// A table cell. Holds only text and image elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub elements: Vec<Element>,
    pub is_header: bool,
}

impl Cell {
    /// Text of the cell's text elements joined by spaces.
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .filter_map(Element::as_text)
            .map(|t| t.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
