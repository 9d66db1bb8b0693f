//! Narrow storage contracts.
//!
//! The engine never owns a schema. Callers plug their own database or asset
//! directory in behind these traits; [`DirCoverStore`] and [`MemoryStore`]
//! cover the CLI and tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Persists cover image bytes keyed by book id.
pub trait CoverStore {
    /// Store the image and return where it now lives.
    fn put_cover(&self, book_id: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Writes covers as `<dir>/<book_id>.<extension>`.
#[derive(Debug, Clone)]
pub struct DirCoverStore {
    dir: PathBuf,
}

impl DirCoverStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CoverStore for DirCoverStore {
    fn put_cover(&self, book_id: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{book_id}.{extension}"));
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Reading progress as a fraction in `[0, 1]`.
pub trait ProgressStore {
    fn progress(&self, book_id: &str) -> Option<f32>;
    fn set_progress(&mut self, book_id: &str, progress: f32);
}

/// A highlighted character range within one text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: u64,
    pub book_id: String,
    pub chapter_index: usize,
    pub element_index: usize,
    /// Byte offsets into the element's content.
    pub start: usize,
    pub end: usize,
    /// ARGB color.
    pub color: u32,
}

pub trait HighlightStore {
    /// Store a highlight, assigning it a fresh id. The `id` field is ignored.
    fn add_highlight(&mut self, highlight: Highlight) -> u64;
    fn highlights_for_chapter(&self, book_id: &str, chapter_index: usize) -> Vec<Highlight>;
    fn remove_highlight(&mut self, id: u64) -> bool;
}

/// In-memory progress and highlight storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    progress: HashMap<String, f32>,
    highlights: Vec<Highlight>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryStore {
    fn progress(&self, book_id: &str) -> Option<f32> {
        self.progress.get(book_id).copied()
    }

    fn set_progress(&mut self, book_id: &str, progress: f32) {
        self.progress
            .insert(book_id.to_string(), progress.clamp(0.0, 1.0));
    }
}

impl HighlightStore for MemoryStore {
    fn add_highlight(&mut self, mut highlight: Highlight) -> u64 {
        self.next_id += 1;
        highlight.id = self.next_id;
        self.highlights.push(highlight);
        self.next_id
    }

    fn highlights_for_chapter(&self, book_id: &str, chapter_index: usize) -> Vec<Highlight> {
        self.highlights
            .iter()
            .filter(|h| h.book_id == book_id && h.chapter_index == chapter_index)
            .cloned()
            .collect()
    }

    fn remove_highlight(&mut self, id: u64) -> bool {
        let before = self.highlights.len();
        self.highlights.retain(|h| h.id != id);
        self.highlights.len() != before
    }
}
