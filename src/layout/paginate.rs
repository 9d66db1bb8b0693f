//! Greedy page filling.
//!
//! Chapters paginate independently: each starts on a fresh page and the
//! per-chapter results are concatenated in chapter order. Within a chapter,
//! elements are packed top to bottom and text is split at line boundaries.

use std::mem;
use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::model::{Chapter, Document, Element, ImageElement, Row, TableElement, TextStyle};

use super::measure::{LineMetrics, TextMeasurer};
use super::params::LayoutParams;

/// Below this much free height a non-empty page is closed.
pub const MIN_LINE_SPACE: f32 = 10.0;

/// Share of the page height reserved for an inline image.
pub const INLINE_IMAGE_FRACTION: f32 = 0.4;

/// One screen of content.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Page {
    pub parts: Vec<PagePart>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn chapter_index(&self) -> Option<usize> {
        self.parts.first().map(|p| p.chapter_index)
    }
}

/// An element, or a slice of one, placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagePart {
    pub chapter_index: usize,
    pub element: PositionedElement,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PositionedElement {
    Text {
        element_index: usize,
        /// First line of this fragment in the element's own layout.
        start_line: usize,
        /// Byte range of the element content this fragment shows.
        range: Range<usize>,
        text: String,
        style: TextStyle,
    },
    Image {
        element_index: usize,
        image: ImageElement,
    },
    Table {
        element_index: usize,
        first_row: usize,
        rows: Vec<Row>,
    },
}

impl PositionedElement {
    pub fn element_index(&self) -> usize {
        match self {
            PositionedElement::Text { element_index, .. }
            | PositionedElement::Image { element_index, .. }
            | PositionedElement::Table { element_index, .. } => *element_index,
        }
    }
}

/// Lays documents out into pages using a shared measurer and worker pool.
pub struct Paginator {
    measurer: Arc<dyn TextMeasurer>,
    pool: ThreadPool,
}

impl Paginator {
    /// Create a paginator with `threads` workers (0 picks rayon's default).
    pub fn new(measurer: Arc<dyn TextMeasurer>, threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("pagewright-layout-{i}"))
            .build()?;
        Ok(Self { measurer, pool })
    }

    pub fn measurer(&self) -> &Arc<dyn TextMeasurer> {
        &self.measurer
    }

    pub fn paginate_chapter(
        &self,
        chapter_index: usize,
        chapter: &Chapter,
        params: &LayoutParams,
    ) -> Vec<Page> {
        let mut filler = PageFiller::new(chapter_index, params, self.measurer.as_ref());
        for (element_index, element) in chapter.elements.iter().enumerate() {
            match element {
                Element::Text(text) => filler.text(element_index, &text.content, text.style),
                Element::Image(image) => filler.image(element_index, image),
                Element::Table(table) => filler.table(element_index, table),
            }
        }
        filler.finish()
    }

    /// Paginate every chapter on the pool and concatenate in chapter order.
    pub fn paginate_document(&self, document: &Document, params: &LayoutParams) -> Vec<Page> {
        self.paginate_document_until(document, params, || false)
            .unwrap_or_default()
    }

    /// Like [`paginate_document`](Self::paginate_document), giving up with
    /// `None` once `is_cancelled` reports true.
    pub fn paginate_document_until<F>(
        &self,
        document: &Document,
        params: &LayoutParams,
        is_cancelled: F,
    ) -> Option<Vec<Page>>
    where
        F: Fn() -> bool + Sync,
    {
        let chapters: Option<Vec<Vec<Page>>> = self.pool.install(|| {
            document
                .chapters
                .par_iter()
                .enumerate()
                .map(|(i, chapter)| {
                    if is_cancelled() {
                        None
                    } else {
                        Some(self.paginate_chapter(i, chapter, params))
                    }
                })
                .collect()
        });

        let pages: Vec<Page> = chapters?.into_iter().flatten().collect();
        if is_cancelled() {
            return None;
        }
        debug!(
            pages = pages.len(),
            width = params.content_width,
            height = params.content_height,
            "Paginated document"
        );
        Some(pages)
    }
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("threads", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

/// Running state for one chapter.
struct PageFiller<'a> {
    chapter_index: usize,
    params: &'a LayoutParams,
    measurer: &'a dyn TextMeasurer,
    pages: Vec<Page>,
    current: Vec<PagePart>,
    height: f32,
}

impl<'a> PageFiller<'a> {
    fn new(chapter_index: usize, params: &'a LayoutParams, measurer: &'a dyn TextMeasurer) -> Self {
        Self {
            chapter_index,
            params,
            measurer,
            pages: Vec::new(),
            current: Vec::new(),
            height: 0.0,
        }
    }

    fn push(&mut self, element: PositionedElement) {
        self.current.push(PagePart {
            chapter_index: self.chapter_index,
            element,
        });
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.pages.push(Page {
                parts: mem::take(&mut self.current),
            });
        }
        self.height = 0.0;
    }

    fn finish(mut self) -> Vec<Page> {
        self.flush();
        self.pages
    }

    fn text(&mut self, element_index: usize, content: &str, style: TextStyle) {
        let font = self.params.font_for(style);
        let raw = self
            .measurer
            .measure(content, &font, self.params.content_width);
        let lines = sanitize_lines(raw, content, self.measurer.line_height(&font));
        let spacing = self.params.element_spacing;
        let page_height = self.params.content_height;

        let mut line = 0;
        while line < lines.len() {
            let space_left = page_height - self.height - spacing;
            if space_left < MIN_LINE_SPACE && !self.current.is_empty() {
                self.flush();
                continue;
            }

            let top = lines[line].top;
            let fits = lines[line..]
                .iter()
                .take_while(|m| m.bottom - top <= space_left)
                .count();
            let last = match fits {
                0 if self.current.is_empty() => line,
                0 => {
                    self.flush();
                    continue;
                }
                n => line + n - 1,
            };

            let range = lines[line].start..lines[last].end;
            self.push(PositionedElement::Text {
                element_index,
                start_line: line,
                text: content[range.clone()].to_string(),
                range,
                style,
            });
            self.height += lines[last].bottom - top + spacing;
            line = last + 1;

            if line < lines.len() {
                self.flush();
            }
        }
    }

    fn image(&mut self, element_index: usize, image: &ImageElement) {
        let element = PositionedElement::Image {
            element_index,
            image: image.clone(),
        };

        if image.is_full_page {
            self.flush();
            self.push(element);
            self.flush();
            return;
        }

        let page_height = self.params.content_height;
        let estimate = page_height * INLINE_IMAGE_FRACTION;
        if self.height + estimate > page_height && !self.current.is_empty() {
            self.flush();
        }
        self.push(element);
        self.height += estimate + self.params.element_spacing;
    }

    fn table(&mut self, element_index: usize, table: &TableElement) {
        let row_height = self.params.table_row_height();
        let page_height = self.params.content_height;
        let rows = &table.rows;

        let mut row = 0;
        while row < rows.len() {
            let mut taken = 0;
            let mut table_height = 0.0;
            while row + taken < rows.len() && self.height + table_height + row_height <= page_height
            {
                table_height += row_height;
                taken += 1;
            }

            if taken > 0 {
                self.push(PositionedElement::Table {
                    element_index,
                    first_row: row,
                    rows: rows[row..row + taken].to_vec(),
                });
                self.height += table_height + self.params.element_spacing;
                row += taken;
                if row < rows.len() {
                    self.flush();
                }
            } else if !self.current.is_empty() {
                self.flush();
            } else {
                self.push(PositionedElement::Table {
                    element_index,
                    first_row: row,
                    rows: vec![rows[row].clone()],
                });
                row += 1;
                self.flush();
            }
        }
    }
}

/// Normalize oracle output into contiguous, char-aligned lines that cover
/// `text` exactly once with non-decreasing vertical extents.
fn sanitize_lines(raw: Vec<LineMetrics>, text: &str, line_height: f32) -> Vec<LineMetrics> {
    let mut lines: Vec<LineMetrics> = Vec::with_capacity(raw.len());
    let mut cursor = 0;
    let mut floor = 0.0_f32;

    for metrics in raw {
        let mut end = metrics.end.min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        if end <= cursor {
            continue;
        }

        let top = if metrics.top.is_finite() {
            metrics.top.max(floor)
        } else {
            floor
        };
        let bottom = if metrics.bottom.is_finite() {
            metrics.bottom.max(top)
        } else {
            top + line_height
        };
        lines.push(LineMetrics {
            start: cursor,
            end,
            top,
            bottom,
        });
        cursor = end;
        floor = bottom;
    }

    if cursor < text.len() {
        match lines.last_mut() {
            Some(last) => last.end = text.len(),
            None => lines.push(LineMetrics {
                start: 0,
                end: text.len(),
                top: 0.0,
                bottom: line_height,
            }),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::measure::{FixedAdvanceMeasurer, FontSpec, Typography};
    use crate::model::{Cell, TextElement};
    use proptest::prelude::*;

    /// 10 chars per line at 100 wide, lines 20 tall, spacing 0.
    fn params(height: f32) -> LayoutParams {
        LayoutParams::new(100.0, height, Typography::new(Default::default(), 20.0, 1.0))
            .with_spacing(0.0)
    }

    fn paginator() -> Paginator {
        Paginator::new(Arc::new(FixedAdvanceMeasurer::new(0.5)), 2).unwrap()
    }

    fn chapter(elements: Vec<Element>) -> Chapter {
        Chapter {
            title: String::new(),
            path: "c.xhtml".into(),
            elements,
        }
    }

    fn body(text: &str) -> Element {
        Element::text(text, TextStyle::Body)
    }

    fn image(full: bool) -> Element {
        Element::Image(ImageElement {
            resource_path: "i.png".into(),
            caption: None,
            is_full_page: full,
        })
    }

    fn table(rows: usize) -> Element {
        let row = Row {
            cells: vec![Cell {
                elements: vec![body("x")],
                is_header: false,
            }],
        };
        Element::Table(TableElement {
            rows: vec![row; rows],
        })
    }

    fn fragments(pages: &[Page], element: usize) -> String {
        pages
            .iter()
            .flat_map(|p| &p.parts)
            .filter_map(|part| match &part.element {
                PositionedElement::Text {
                    element_index,
                    text,
                    ..
                } if *element_index == element => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_short_elements_share_a_page() {
        let pages = paginator().paginate_chapter(
            0,
            &chapter(vec![body("one"), body("two"), body("three")]),
            &params(200.0),
        );
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].parts.len(), 3);
    }

    #[test]
    fn test_long_text_splits_at_lines() {
        // 8 lines of 20 units on 70-unit pages: 3 + 3 + 2.
        let text = "aaaaaaaaa bbbbbbbbb ccccccccc ddddddddd eeeeeeeee fffffffff ggggggggg hhhhhhhhh";
        let pages = paginator().paginate_chapter(0, &chapter(vec![body(text)]), &params(70.0));
        assert_eq!(pages.len(), 3);

        let starts: Vec<usize> = pages
            .iter()
            .map(|p| match &p.parts[0].element {
                PositionedElement::Text { start_line, .. } => *start_line,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(starts, vec![0, 3, 6]);
        assert_eq!(fragments(&pages, 0), text);
    }

    #[test]
    fn test_tiny_viewport_forces_progress() {
        let text = "aaaaaaaaa bbbbbbbbb ccccccccc";
        let pages = paginator().paginate_chapter(0, &chapter(vec![body(text)]), &params(1.0));
        assert_eq!(pages.len(), 3);
        assert_eq!(fragments(&pages, 0), text);
    }

    #[test]
    fn test_full_page_image_isolated() {
        let pages = paginator().paginate_chapter(
            0,
            &chapter(vec![body("before"), image(true), body("after")]),
            &params(500.0),
        );
        assert_eq!(pages.len(), 3);
        assert!(matches!(
            pages[1].parts[..],
            [PagePart {
                element: PositionedElement::Image { element_index: 1, .. },
                ..
            }]
        ));
    }

    #[test]
    fn test_inline_images_take_forty_percent() {
        let pages = paginator().paginate_chapter(
            0,
            &chapter(vec![image(false), image(false), image(false)]),
            &params(100.0),
        );
        // 40 + 40 fit, the third would reach 120.
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].parts.len(), 2);
    }

    #[test]
    fn test_table_rows_split_across_pages() {
        // Rows are 40 tall on 100-unit pages: 2 per page.
        let pages = paginator().paginate_chapter(0, &chapter(vec![table(5)]), &params(100.0));
        let first_rows: Vec<(usize, usize)> = pages
            .iter()
            .map(|p| match &p.parts[0].element {
                PositionedElement::Table {
                    first_row, rows, ..
                } => (*first_row, rows.len()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(first_rows, vec![(0, 2), (2, 2), (4, 1)]);
    }

    #[test]
    fn test_oversized_table_row_forced_through() {
        let pages = paginator().paginate_chapter(0, &chapter(vec![table(3)]), &params(10.0));
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn test_table_moves_to_fresh_page() {
        let pages = paginator().paginate_chapter(
            0,
            &chapter(vec![body("aaaaaaaaa bbbbbbbbb ccccccccc"), table(1)]),
            &params(80.0),
        );
        assert_eq!(pages.len(), 2);
        assert!(matches!(
            pages[1].parts[0].element,
            PositionedElement::Table { first_row: 0, .. }
        ));
    }

    #[test]
    fn test_chapters_concatenate_in_order() {
        let doc = Document::new(
            "T",
            "A",
            (0..6)
                .map(|i| chapter(vec![body(&format!("chapter {i}"))]))
                .collect(),
        );
        let pages = paginator().paginate_document(&doc, &params(200.0));
        let chapters: Vec<_> = pages.iter().filter_map(Page::chapter_index).collect();
        assert_eq!(chapters, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_cancelled_run_returns_none() {
        let doc = Document::new("T", "A", vec![chapter(vec![body("x")])]);
        assert!(
            paginator()
                .paginate_document_until(&doc, &params(200.0), || true)
                .is_none()
        );
    }

    /// Oracle returning overlapping, out-of-order and mid-char offsets.
    struct HostileMeasurer;

    impl TextMeasurer for HostileMeasurer {
        fn measure(&self, text: &str, _: &FontSpec, _: f32) -> Vec<LineMetrics> {
            let mut lines = Vec::new();
            let mut i = 0;
            while i < text.len() {
                lines.push(LineMetrics {
                    start: i.saturating_sub(2),
                    end: (i + 3).min(text.len() + 4),
                    top: i as f32,
                    bottom: i as f32 - 1.0,
                });
                i += 3;
            }
            lines
        }
    }

    #[test]
    fn test_hostile_oracle_still_reconstructs() {
        let text = "héllo wörld ünïcode";
        let paginator = Paginator::new(Arc::new(HostileMeasurer), 1).unwrap();
        let pages = paginator.paginate_chapter(0, &chapter(vec![body(text)]), &params(15.0));
        assert_eq!(fragments(&pages, 0), text);
    }

    #[test]
    fn test_empty_oracle_output_keeps_text() {
        struct Silent;
        impl TextMeasurer for Silent {
            fn measure(&self, _: &str, _: &FontSpec, _: f32) -> Vec<LineMetrics> {
                Vec::new()
            }
        }
        let paginator = Paginator::new(Arc::new(Silent), 1).unwrap();
        let pages = paginator.paginate_chapter(0, &chapter(vec![body("whole")]), &params(100.0));
        assert_eq!(fragments(&pages, 0), "whole");
    }

    fn prose() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-zé]{1,14}", 1..60).prop_map(|words| words.join(" "))
    }

    proptest! {
        #[test]
        fn test_fragments_reconstruct_each_element(
            texts in prop::collection::vec(prose(), 1..5),
            height in 1.0f32..400.0,
            width in 10.0f32..300.0,
        ) {
            let elements: Vec<Element> = texts.iter().map(|t| body(t)).collect();
            let params = LayoutParams::new(width, height, Typography::default()).with_spacing(8.0);
            let pages = paginator().paginate_chapter(0, &chapter(elements), &params);

            for (i, text) in texts.iter().enumerate() {
                prop_assert_eq!(&fragments(&pages, i), text);
            }
            prop_assert!(pages.iter().all(|p| !p.is_empty()));
        }

        #[test]
        fn test_pagination_is_idempotent(
            texts in prop::collection::vec(prose(), 1..4),
            height in 20.0f32..400.0,
        ) {
            let doc = Document::new(
                "T",
                "A",
                texts.iter().map(|t| chapter(vec![body(t), table(3), image(false)])).collect(),
            );
            let params = LayoutParams::new(120.0, height, Typography::default());
            let paginator = paginator();
            prop_assert_eq!(
                paginator.paginate_document(&doc, &params),
                paginator.paginate_document(&doc, &params)
            );
        }
    }

    #[test]
    fn test_text_element_content_unchanged() {
        let element = TextElement {
            content: "kept".into(),
            style: TextStyle::Quote,
        };
        let pages = paginator().paginate_chapter(
            0,
            &chapter(vec![Element::Text(element)]),
            &params(100.0),
        );
        assert!(matches!(
            &pages[0].parts[0].element,
            PositionedElement::Text { style: TextStyle::Quote, text, .. } if text == "kept"
        ));
    }
}
