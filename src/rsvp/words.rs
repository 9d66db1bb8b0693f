use serde::Serialize;

use crate::model::{Document, Element};

use super::sentence::is_sentence_end;

/// One word of the flattened document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordInfo {
    pub text: String,
    pub chapter_index: usize,
    pub element_index: usize,
    /// Position of the word among its element's words.
    pub offset_in_element: usize,
    /// Byte offset of the word within its element's content.
    pub byte_offset: usize,
    /// Dense index across the whole document.
    pub global_index: usize,
    /// Non-decreasing along `global_index`.
    pub sentence_index: usize,
}

/// Flatten every text element of `document` into a word stream.
///
/// Images and tables contribute no words.
pub fn flatten(document: &Document) -> Vec<WordInfo> {
    let mut words = Vec::new();
    let mut sentence_index = 0;

    for (chapter_index, chapter) in document.chapters.iter().enumerate() {
        for (element_index, element) in chapter.elements.iter().enumerate() {
            let Element::Text(text) = element else {
                continue;
            };
            for (offset_in_element, (byte_offset, word)) in
                tokens(&text.content).enumerate()
            {
                words.push(WordInfo {
                    text: word.to_string(),
                    chapter_index,
                    element_index,
                    offset_in_element,
                    byte_offset,
                    global_index: words.len(),
                    sentence_index,
                });
                if is_sentence_end(word) {
                    sentence_index += 1;
                }
            }
        }
    }
    words
}

/// Whitespace-delimited tokens paired with their byte offsets.
pub fn tokens(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut rest = 0;
    std::iter::from_fn(move || {
        let tail = &text[rest..];
        let start = rest + tail.find(|c: char| !c.is_whitespace())?;
        let len = text[start..]
            .find(char::is_whitespace)
            .unwrap_or(text.len() - start);
        rest = start + len;
        Some((start, &text[start..rest]))
    })
}

/// Index of the first word at or after the given position.
pub fn word_at_or_after(
    words: &[WordInfo],
    chapter_index: usize,
    element_index: usize,
    byte_offset: usize,
) -> Option<usize> {
    let target = (chapter_index, element_index, byte_offset);
    let i = words.partition_point(|w| (w.chapter_index, w.element_index, w.byte_offset) < target);
    (i < words.len()).then_some(i)
}
