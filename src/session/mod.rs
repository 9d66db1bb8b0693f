//! Per-book reading state.
//!
//! A [`ReadingSession`] is created when a book is opened and dropped when it
//! is closed. It owns the parsed document, the current pagination and page
//! index, the lazily built word stream and at most one running pulse. All
//! mutation happens on the thread that owns the session; background work
//! (re-pagination, pulse playback) reports back through channels and atomics.

mod repaginate;

use std::cell::OnceCell;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::ReaderConfig;
use crate::error::Result;
use crate::layout::{
    Anchor, FontFamily, LayoutParams, Page, Paginator, TextMeasurer, page_containing,
    restore_anchor,
};
use crate::model::Document;
use crate::rsvp::{PulsePlayer, PulseSink, WordInfo, flatten, word_at_or_after};
use crate::search::SearchResult;
use crate::store::ProgressStore;

pub use repaginate::{LayoutResult, Repaginator};

pub struct ReadingSession {
    document: Arc<Document>,
    config: ReaderConfig,
    params: LayoutParams,
    paginator: Arc<Paginator>,
    pages: Vec<Page>,
    current_page: usize,
    words: OnceCell<Arc<[WordInfo]>>,
    player: Option<PulsePlayer>,
    repaginator: Repaginator,
}

impl ReadingSession {
    /// Open a session and paginate synchronously for the configured layout.
    pub fn new(
        document: Document,
        config: ReaderConfig,
        measurer: Arc<dyn TextMeasurer>,
    ) -> Result<Self> {
        let config = config.clamped();
        let document = Arc::new(document);
        let paginator = Arc::new(Paginator::new(
            measurer,
            config.engine.pagination_threads,
        )?);
        let params = LayoutParams::from_config(&config.layout);
        let pages = paginator.paginate_document(&document, &params);
        let repaginator = Repaginator::spawn(
            Arc::clone(&document),
            Arc::clone(&paginator),
            Duration::from_millis(config.engine.debounce_ms),
        );

        info!(
            title = %document.title,
            pages = pages.len(),
            "Opened reading session"
        );

        Ok(Self {
            document,
            config,
            params,
            paginator,
            pages,
            current_page: 0,
            words: OnceCell::new(),
            player: None,
            repaginator,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page(&self) -> Option<&Page> {
        self.pages.get(self.current_page)
    }

    /// Anchor of the page on screen.
    pub fn anchor(&self) -> Option<Anchor> {
        self.page().and_then(Page::anchor)
    }

    // Layout

    /// Queue a re-pagination for `params`; see [`poll_layout`](Self::poll_layout).
    pub fn request_layout(&mut self, params: LayoutParams) -> u64 {
        let generation = self.repaginator.submit(params);
        debug!(generation, "Requested layout");
        generation
    }

    /// Apply the newest finished layout, if any. Returns whether pages changed.
    pub fn poll_layout(&mut self) -> bool {
        match self.repaginator.try_latest() {
            Some(result) => {
                self.install(result.params, result.pages);
                true
            }
            None => false,
        }
    }

    /// Block up to `timeout` for the latest requested layout and apply it.
    pub fn wait_for_layout(&mut self, timeout: Duration) -> bool {
        match self.repaginator.wait_latest(timeout) {
            Some(result) => {
                self.install(result.params, result.pages);
                true
            }
            None => false,
        }
    }

    /// Re-paginate on the calling thread, superseding queued requests.
    pub fn apply_layout_now(&mut self, params: LayoutParams) {
        self.repaginator.invalidate();
        let pages = self.paginator.paginate_document(&self.document, &params);
        self.install(params, pages);
    }

    fn install(&mut self, params: LayoutParams, pages: Vec<Page>) {
        let anchor = self.anchor();
        let previous = self.current_page;
        self.params = params;
        self.pages = pages;
        self.current_page = match anchor {
            Some(anchor) => restore_anchor(&self.pages, &anchor, previous),
            None => previous.min(self.pages.len().saturating_sub(1)),
        };
        debug!(
            pages = self.pages.len(),
            from = previous,
            to = self.current_page,
            "Installed layout"
        );
    }

    // Settings

    fn relayout(&mut self) -> u64 {
        self.config = self.config.clone().clamped();
        self.request_layout(LayoutParams::from_config(&self.config.layout))
    }

    pub fn set_font_size(&mut self, size: f32) -> u64 {
        self.config.layout.font_size = size;
        self.relayout()
    }

    pub fn set_font_family(&mut self, family: FontFamily) -> u64 {
        self.config.layout.font_family = family;
        self.relayout()
    }

    pub fn set_line_height(&mut self, multiplier: f32) -> u64 {
        self.config.layout.line_height = multiplier;
        self.relayout()
    }

    pub fn set_padding(&mut self, horizontal: f32, vertical: f32) -> u64 {
        self.config.layout.horizontal_padding = horizontal;
        self.config.layout.vertical_padding = vertical;
        self.relayout()
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) -> u64 {
        self.config.layout.viewport_width = width;
        self.config.layout.viewport_height = height;
        self.relayout()
    }

    pub fn set_wpm(&mut self, wpm: u32) {
        self.config.rsvp.wpm = wpm;
        self.config = self.config.clone().clamped();
    }

    // Navigation

    /// Move to `index`, clamped to the page range.
    pub fn go_to_page(&mut self, index: usize) -> usize {
        self.current_page = index.min(self.pages.len().saturating_sub(1));
        self.current_page
    }

    pub fn next_page(&mut self) -> bool {
        if self.current_page + 1 < self.pages.len() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    pub fn previous_page(&mut self) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Show the page holding `anchor`, else the first page after it.
    pub fn jump_to_anchor(&mut self, anchor: &Anchor) -> usize {
        let page = page_containing(&self.pages, anchor)
            .unwrap_or_else(|| restore_anchor(&self.pages, anchor, self.current_page));
        self.go_to_page(page)
    }

    /// First page of `chapter`, or of the next chapter with content.
    pub fn jump_to_chapter(&mut self, chapter: usize) -> usize {
        self.jump_to_anchor(&Anchor::new(chapter, 0, 0))
    }

    pub fn jump_to_element(&mut self, chapter: usize, element: usize) -> usize {
        self.jump_to_anchor(&Anchor::new(chapter, element, 0))
    }

    pub fn jump_to_search_result(&mut self, result: &SearchResult) -> usize {
        let offset = match result.cell {
            Some((row, _)) => row,
            None => result.match_offset,
        };
        self.jump_to_anchor(&Anchor::new(
            result.chapter_index,
            result.element_index,
            offset,
        ))
    }

    /// Position as `current / (total - 1)`; 0 with one page or none.
    pub fn progress(&self) -> f32 {
        match self.pages.len() {
            0 | 1 => 0.0,
            n => self.current_page as f32 / (n - 1) as f32,
        }
    }

    /// Move to the page nearest `fraction` of the way through.
    pub fn restore_progress(&mut self, fraction: f32) -> usize {
        let last = self.pages.len().saturating_sub(1);
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.go_to_page((fraction * last as f32).round() as usize)
    }

    pub fn save_progress(&self, store: &mut dyn ProgressStore, book_id: &str) {
        store.set_progress(book_id, self.progress());
    }

    pub fn load_progress(&mut self, store: &dyn ProgressStore, book_id: &str) -> Option<usize> {
        store
            .progress(book_id)
            .map(|fraction| self.restore_progress(fraction))
    }

    // Pulse

    /// The flattened word stream, built on first use.
    pub fn words(&self) -> Arc<[WordInfo]> {
        let words = self.words.get_or_init(|| {
            let words: Arc<[WordInfo]> = flatten(&self.document).into();
            debug!(words = words.len(), "Flattened word stream");
            words
        });
        Arc::clone(words)
    }

    /// Start a pulse at `start_word`, stopping any running one first.
    pub fn start_pulse(&mut self, start_word: usize, wpm: u32, sink: PulseSink) {
        if let Some(player) = self.player.take() {
            player.stop();
        }
        self.player = Some(PulsePlayer::start(self.words(), start_word, wpm, sink));
    }

    /// Start a pulse at the first word on the page on screen.
    pub fn start_pulse_from_page(&mut self, sink: PulseSink) -> Option<usize> {
        let anchor = self.anchor()?;
        let start = word_at_or_after(
            &self.words(),
            anchor.chapter_index,
            anchor.element_index,
            anchor.offset,
        )?;
        self.start_pulse(start, self.config.rsvp.wpm, sink);
        Some(start)
    }

    pub fn is_pulsing(&self) -> bool {
        self.player.as_ref().is_some_and(PulsePlayer::is_running)
    }

    /// Global index of the word the running pulse last showed.
    pub fn pulse_position(&self) -> Option<usize> {
        self.player.as_ref().and_then(PulsePlayer::current_word)
    }

    /// Stop the pulse and show the page holding the last word shown.
    pub fn stop_pulse(&mut self) -> Option<usize> {
        let index = self.player.take()?.stop()?;
        let words = self.words();
        if let Some(word) = words.get(index) {
            self.jump_to_anchor(&Anchor::new(
                word.chapter_index,
                word.element_index,
                word.byte_offset,
            ));
        }
        Some(index)
    }
}

impl std::fmt::Debug for ReadingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingSession")
            .field("title", &self.document.title)
            .field("pages", &self.pages.len())
            .field("current_page", &self.current_page)
            .field("pulsing", &self.is_pulsing())
            .finish_non_exhaustive()
    }
}
