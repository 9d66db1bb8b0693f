//! Chapter markup → [`Element`] sequence.
//!
//! The walk is a recursive descent over the html5ever DOM. Block containers
//! accumulate inline text in a [`TextBuffer`] that is passed down explicitly
//! through inline children, and flushed into a [`TextElement`] whenever a
//! block child, an image or a non-body result interrupts the run. Output goes
//! to an explicit `&mut Vec<Element>`.
//!
//! [`TextElement`]: crate::model::TextElement

use crate::dom::{Dom, NodeData, NodeId, parse_html};
use crate::model::{Cell, Element, ImageElement, Row, TableElement, TextStyle};
use crate::util::resolve_href;

/// Result of extracting one chapter document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedChapter {
    pub elements: Vec<Element>,
    /// Text of `<head><title>`, empty when absent.
    pub head_title: String,
}

/// Extract a chapter read from `chapter_path`. Embedded resource paths are
/// resolved against the chapter's directory.
pub fn extract_chapter(markup: &[u8], chapter_path: &str) -> ExtractedChapter {
    let dom = parse_html(markup);
    let extractor = Extractor {
        dom: &dom,
        chapter_path,
    };

    let head_title = dom
        .find_by_tag(dom.document(), "head")
        .and_then(|head| dom.find_by_tag(head, "title"))
        .map(|title| clean_text(&dom.text(title)))
        .unwrap_or_default();

    let root = dom
        .find_by_tag(dom.document(), "body")
        .unwrap_or_else(|| dom.document());

    let mut elements = Vec::new();
    for child in dom.children(root) {
        extractor.extract_node(child, &mut elements);
    }

    ExtractedChapter {
        elements,
        head_title,
    }
}

/// Remove object-replacement, replacement-character and zero-width-space
/// code points, then trim.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{FFFC}' | '\u{FFFD}' | '\u{200B}'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Tags whose appearance inside a container ends the current text run.
fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "section"
            | "article"
            | "aside"
            | "blockquote"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "li"
            | "ul"
            | "ol"
            | "dl"
            | "figure"
            | "figcaption"
            | "table"
            | "pre"
            | "hr"
    )
}

/// Containers that take the buffer-and-flush path.
fn is_container_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div" | "section" | "article" | "aside" | "blockquote" | "li" | "span" | "pre"
    )
}

fn style_for_tag(tag: &str) -> TextStyle {
    match tag {
        "h1" | "h2" | "h3" => TextStyle::Title,
        "blockquote" => TextStyle::Quote,
        "figcaption" => TextStyle::Caption,
        _ => TextStyle::Body,
    }
}

/// Inline text accumulator.
///
/// Whitespace runs collapse to one space, leading whitespace is dropped and
/// line breaks swallow the spaces around them.
#[derive(Debug, Default)]
pub struct TextBuffer {
    text: String,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, raw: &str) {
        for c in raw.chars() {
            if c.is_whitespace() {
                if !self.text.is_empty() && !self.text.ends_with([' ', '\n']) {
                    self.text.push(' ');
                }
            } else {
                self.text.push(c);
            }
        }
    }

    pub fn push_break(&mut self) {
        if self.text.ends_with(' ') {
            self.text.pop();
        }
        self.text.push('\n');
    }

    /// Emit the buffered run as a text element of `style`, if it has content.
    pub fn flush(&mut self, style: TextStyle, out: &mut Vec<Element>) {
        let cleaned = clean_text(&self.text);
        self.text.clear();
        if !cleaned.is_empty() {
            out.push(Element::text(cleaned, style));
        }
    }
}

struct Extractor<'a> {
    dom: &'a Dom,
    chapter_path: &'a str,
}

impl Extractor<'_> {
    /// Hidden nodes, page-break markers and non-content elements.
    fn is_skipped(&self, node: NodeId) -> bool {
        let dom = self.dom;
        if matches!(
            dom.tag(node),
            Some("script" | "style" | "template" | "head")
        ) {
            return true;
        }
        dom.has_attr(node, "hidden")
            || dom.attr(node, "role") == Some("doc-pagebreak")
            || dom.attr(node, "aria-hidden") == Some("true")
            || dom
                .attr(node, "epub:type")
                .is_some_and(|t| t.split_ascii_whitespace().any(|v| v == "pagebreak"))
    }

    /// Block-level extraction of any node.
    fn extract_node(&self, node: NodeId, out: &mut Vec<Element>) {
        let dom = self.dom;
        let Some(data) = dom.get(node).map(|n| &n.data) else {
            return;
        };

        let tag = match data {
            NodeData::Text(text) => {
                let mut buf = TextBuffer::new();
                buf.push_text(text);
                buf.flush(TextStyle::Body, out);
                return;
            }
            NodeData::Element { name, .. } => name.local.as_ref(),
            NodeData::Document | NodeData::Comment => return,
        };

        if self.is_skipped(node) {
            return;
        }

        match tag {
            "img" | "svg" | "image" => {
                if let Some(image) = self.image(node, true) {
                    out.push(Element::Image(image));
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let mut buf = TextBuffer::new();
                self.extract_children(node, TextStyle::Title, &mut buf, out);
                buf.flush(TextStyle::Title, out);
            }
            "table" => {
                if let Some(table) = self.table(node) {
                    out.push(Element::Table(table));
                }
            }
            "figcaption" => {
                let mut buf = TextBuffer::new();
                self.extract_children(node, TextStyle::Caption, &mut buf, out);
                buf.flush(TextStyle::Caption, out);
            }
            tag if is_container_tag(tag) => {
                if self.has_only_image(node)
                    && let Some(image) = self.first_image(node)
                {
                    out.push(Element::Image(image));
                    return;
                }
                let style = style_for_tag(tag);
                let mut buf = TextBuffer::new();
                self.extract_children(node, style, &mut buf, out);
                buf.flush(style, out);
            }
            _ => {
                for child in dom.children(node) {
                    self.extract_node(child, out);
                }
            }
        }
    }

    /// Walk the children of a container or inline element, feeding `buf`.
    ///
    /// `style` is the enclosing container's style, used for every flush.
    fn extract_children(
        &self,
        node: NodeId,
        style: TextStyle,
        buf: &mut TextBuffer,
        out: &mut Vec<Element>,
    ) {
        let dom = self.dom;
        for child in dom.children(node) {
            if let Some(text) = dom.text_content(child) {
                buf.push_text(text);
                continue;
            }
            let Some(tag) = dom.tag(child) else {
                continue;
            };
            if self.is_skipped(child) {
                continue;
            }

            match tag {
                "br" => buf.push_break(),
                "img" => {
                    buf.flush(style, out);
                    if let Some(image) = self.image(child, false) {
                        out.push(Element::Image(image));
                    }
                }
                "svg" => {
                    buf.flush(style, out);
                    if let Some(image) = self.image(child, true) {
                        out.push(Element::Image(image));
                    }
                }
                tag if is_block_tag(tag) => {
                    buf.flush(style, out);
                    self.extract_node(child, out);
                }
                "span" if self.has_only_image(child) => {
                    if let Some(image) = self.first_image(child) {
                        buf.flush(style, out);
                        out.push(Element::Image(image));
                    }
                }
                _ => self.extract_children(child, style, buf, out),
            }
        }
    }

    /// Exactly one element child, which is an image or a link/span/div wrapping
    /// only an image, and no text of the container's own.
    fn has_only_image(&self, node: NodeId) -> bool {
        let dom = self.dom;
        let own_text_blank = dom
            .children(node)
            .filter_map(|c| dom.text_content(c))
            .all(|t| t.trim().is_empty());
        if !own_text_blank {
            return false;
        }

        let mut elements = dom.children(node).filter(|&c| dom.is_element(c));
        let (Some(only), None) = (elements.next(), elements.next()) else {
            return false;
        };

        match dom.tag(only) {
            Some("img" | "svg") => true,
            Some("a" | "span" | "div") => {
                dom.descendants(only).any(|d| dom.is_tag(d, "img") || dom.is_tag(d, "svg"))
                    && dom.text(only).is_empty()
            }
            _ => false,
        }
    }

    /// First image under `node`, as a full-page image.
    fn first_image(&self, node: NodeId) -> Option<ImageElement> {
        self.dom
            .descendants(node)
            .filter(|&d| matches!(self.dom.tag(d), Some("img" | "svg")))
            .find_map(|d| self.image(d, true))
    }

    /// Build an image element from an `img`, `svg` or svg `image` node.
    fn image(&self, node: NodeId, is_full_page: bool) -> Option<ImageElement> {
        let dom = self.dom;
        let source = |n: NodeId| {
            dom.attr(n, "src")
                .filter(|s| !s.is_empty())
                .or_else(|| dom.attr(n, "xlink:href"))
                .or_else(|| dom.attr(n, "href"))
                .filter(|s| !s.trim().is_empty())
        };

        let src = source(node).or_else(|| {
            if dom.is_tag(node, "svg") {
                dom.descendants(node)
                    .filter(|&d| matches!(dom.tag(d), Some("image" | "img")))
                    .find_map(source)
            } else {
                None
            }
        })?;

        let src = src.trim();
        if src.starts_with("data:") || src.contains("://") {
            return None;
        }

        let caption = dom
            .attr(node, "alt")
            .map(clean_text)
            .filter(|alt| !alt.is_empty());

        Some(ImageElement {
            resource_path: resolve_href(self.chapter_path, src),
            caption,
            is_full_page,
        })
    }

    /// Rows of this table (not of tables nested in it) with at least one cell.
    fn table(&self, table: NodeId) -> Option<TableElement> {
        let dom = self.dom;
        let rows: Vec<Row> = dom
            .select(table, "tr")
            .filter(|&tr| self.owning_table(tr) == Some(table))
            .filter_map(|tr| {
                let cells: Vec<Cell> = dom
                    .children(tr)
                    .filter(|&c| matches!(dom.tag(c), Some("td" | "th")) && !self.is_skipped(c))
                    .map(|c| Cell {
                        elements: self.cell_elements(c),
                        is_header: dom.is_tag(c, "th"),
                    })
                    .collect();
                (!cells.is_empty()).then_some(Row { cells })
            })
            .collect();

        (!rows.is_empty()).then_some(TableElement { rows })
    }

    fn owning_table(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.dom.get(node)?.parent;
        while current.is_some() {
            if self.dom.is_tag(current, "table") {
                return Some(current);
            }
            current = self.dom.get(current)?.parent;
        }
        None
    }

    /// Cell content, with nested tables flattened into their cells' elements.
    fn cell_elements(&self, cell: NodeId) -> Vec<Element> {
        let mut raw = Vec::new();
        let mut buf = TextBuffer::new();
        self.extract_children(cell, TextStyle::Body, &mut buf, &mut raw);
        buf.flush(TextStyle::Body, &mut raw);

        let mut elements = Vec::with_capacity(raw.len());
        for element in raw {
            flatten_into(element, &mut elements);
        }
        elements
    }
}

fn flatten_into(element: Element, out: &mut Vec<Element>) {
    match element {
        Element::Table(table) => {
            for cell in table.rows.into_iter().flat_map(|r| r.cells) {
                for inner in cell.elements {
                    flatten_into(inner, out);
                }
            }
        }
        other => out.push(other),
    }
}
