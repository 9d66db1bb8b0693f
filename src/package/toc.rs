//! Navigation tables: NCX and EPUB 3 nav documents.
//!
//! Both are reduced to the same shape: archive path → label, in document
//! order. Targets pointing into the same file (`ch1.xhtml#sec2`) collapse to
//! that file, and the first label seen for a file is kept so subsection
//! anchors never overwrite their chapter's title.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{attr_value, local_name, resolve_entity};
use crate::dom::{Dom, NodeId, parse_html};
use crate::error::{Error, Result};
use crate::util::resolve_href;

/// One navigation entry, resolved to an archive path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub path: String,
    pub label: String,
}

/// Archive path → label map, remembering document order.
#[derive(Debug, Clone, Default)]
pub struct Toc {
    entries: Vec<TocEntry>,
    index: HashMap<String, usize>,
}

impl Toc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a label unless the path already has one.
    pub fn insert(&mut self, path: String, label: String) {
        if path.is_empty() || self.index.contains_key(&path) {
            return;
        }
        self.index.insert(path.clone(), self.entries.len());
        self.entries.push(TocEntry { path, label });
    }

    /// Label for an archive path. Falls back to a case-insensitive match.
    pub fn label_for(&self, path: &str) -> Option<&str> {
        let idx = self.index.get(path).copied().or_else(|| {
            self.entries
                .iter()
                .position(|e| e.path.eq_ignore_ascii_case(path))
        })?;
        Some(self.entries[idx].label.as_str())
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct NavPointState {
    /// Position of the opening tag among all navPoints.
    order: usize,
    text: Option<String>,
    src: Option<String>,
}

/// Parse an NCX document located at `ncx_path`.
pub fn parse_toc(ncx_xml: &str, ncx_path: &str) -> Result<Toc> {
    let mut reader = Reader::from_str(ncx_xml);

    let mut stack: Vec<NavPointState> = Vec::new();
    let mut finished: Vec<(usize, String, String)> = Vec::new();
    let mut next_order = 0;
    let mut in_label = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"navPoint" => {
                    stack.push(NavPointState {
                        order: next_order,
                        text: None,
                        src: None,
                    });
                    next_order += 1;
                }
                b"navLabel" => in_label = true,
                b"text" if in_label => in_text = true,
                b"content" => record_src(&mut stack, &e),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"content" {
                    record_src(&mut stack, &e);
                }
            }
            Ok(Event::Text(e)) => {
                if in_text && let Some(state) = stack.last_mut() {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    state.text.get_or_insert_with(String::new).push_str(&raw);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text && let Some(state) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        state.text.get_or_insert_with(String::new).push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"text" => in_text = false,
                b"navLabel" => in_label = false,
                b"navPoint" => {
                    if let Some(state) = stack.pop()
                        && let (Some(text), Some(src)) = (state.text, state.src)
                    {
                        finished.push((state.order, text, src));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::MalformedPackage(format!(
                    "unreadable navigation file {ncx_path}: {e}"
                )));
            }
            _ => {}
        }
    }

    // Children close before their parents; restore document order.
    finished.sort_by_key(|(order, _, _)| *order);

    let mut toc = Toc::new();
    for (_, text, src) in finished {
        let label = text.split_whitespace().collect::<Vec<_>>().join(" ");
        toc.insert(resolve_href(ncx_path, &src), label);
    }
    Ok(toc)
}

fn record_src(stack: &mut [NavPointState], e: &quick_xml::events::BytesStart<'_>) {
    let Some(state) = stack.last_mut() else {
        return;
    };
    if state.src.is_some() {
        return;
    }
    if let Some(attr) = e.attributes().flatten().find(|a| a.key.as_ref() == b"src") {
        state.src = Some(attr_value(&attr));
    }
}

/// Parse an EPUB 3 navigation document located at `nav_path`.
///
/// Uses the `nav` marked `epub:type="toc"` when present, otherwise the
/// first `nav` in the document.
pub fn parse_nav(nav_html: &[u8], nav_path: &str) -> Toc {
    let dom = parse_html(nav_html);
    let root = dom.document();

    let nav = dom
        .select(root, "nav")
        .find(|&n| {
            dom.attr(n, "epub:type")
                .is_some_and(|t| t.split_ascii_whitespace().any(|v| v == "toc"))
        })
        .or_else(|| dom.find_by_tag(root, "nav"));

    let mut toc = Toc::new();
    if let Some(nav) = nav {
        collect_links(&dom, nav, nav_path, &mut toc);
    }
    toc
}

fn collect_links(dom: &Dom, nav: NodeId, nav_path: &str, toc: &mut Toc) {
    for link in dom.select(nav, "a") {
        let Some(href) = dom.attr(link, "href") else {
            continue;
        };
        let label = dom.text(link);
        if label.is_empty() {
            continue;
        }
        toc.insert(resolve_href(nav_path, href), label);
    }
}
