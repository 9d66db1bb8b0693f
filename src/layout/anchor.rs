//! Structural reading positions that survive re-pagination.

use serde::{Deserialize, Serialize};

use super::paginate::{Page, PagePart, PositionedElement};

/// A position in the document independent of page geometry.
///
/// Ordering is structural: chapter, then element, then offset. The offset is
/// a byte offset into the element content for text, the first row for
/// tables, and always 0 for images.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Anchor {
    pub chapter_index: usize,
    pub element_index: usize,
    pub offset: usize,
}

impl Anchor {
    pub fn new(chapter_index: usize, element_index: usize, offset: usize) -> Self {
        Self {
            chapter_index,
            element_index,
            offset,
        }
    }
}

impl PagePart {
    pub fn anchor(&self) -> Anchor {
        let offset = match &self.element {
            PositionedElement::Text { range, .. } => range.start,
            PositionedElement::Image { .. } => 0,
            PositionedElement::Table { first_row, .. } => *first_row,
        };
        Anchor::new(self.chapter_index, self.element.element_index(), offset)
    }

    /// Whether this fragment shows the content at `anchor`.
    pub fn covers(&self, anchor: &Anchor) -> bool {
        if self.chapter_index != anchor.chapter_index
            || self.element.element_index() != anchor.element_index
        {
            return false;
        }
        match &self.element {
            PositionedElement::Text { range, .. } => range.contains(&anchor.offset),
            PositionedElement::Image { .. } => true,
            PositionedElement::Table {
                first_row, rows, ..
            } => (*first_row..first_row + rows.len()).contains(&anchor.offset),
        }
    }
}

impl Page {
    /// Anchor of the first fragment on the page.
    pub fn anchor(&self) -> Option<Anchor> {
        self.parts.first().map(PagePart::anchor)
    }
}

/// Page to show after re-pagination so the reader lands at or after `anchor`.
///
/// Picks the first page holding a fragment at or structurally after the
/// anchor, then the page still showing the anchored content (the anchor sat
/// inside the final fragment), then `previous_index` clamped to the new page
/// count.
pub fn restore_anchor(pages: &[Page], anchor: &Anchor, previous_index: usize) -> usize {
    pages
        .iter()
        .position(|page| page.parts.iter().any(|part| part.anchor() >= *anchor))
        .or_else(|| page_containing(pages, anchor))
        .unwrap_or_else(|| previous_index.min(pages.len().saturating_sub(1)))
}

/// Page whose fragments show the content at `anchor`, if any.
pub fn page_containing(pages: &[Page], anchor: &Anchor) -> Option<usize> {
    pages
        .iter()
        .position(|page| page.parts.iter().any(|part| part.covers(anchor)))
}
