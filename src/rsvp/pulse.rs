//! Per-word timing for rapid serial visual presentation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

use super::words::WordInfo;

/// Extra display time for a word containing a comma.
pub const COMMA_PAUSE_MS: f64 = 200.0;
/// Extra display time for a word containing `.`, `?` or `!`.
pub const SENTENCE_PAUSE_MS: f64 = 400.0;
/// Words longer than this many characters are shown longer.
pub const LONG_WORD_CHARS: usize = 8;
pub const LONG_WORD_FACTOR: f64 = 1.1;

/// A word ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PulseWord {
    pub word: String,
    /// Character index of the fixation point.
    pub pivot_index: usize,
    pub delay_ms: u64,
}

impl PulseWord {
    pub fn new(word: &str, wpm: u32) -> Self {
        Self {
            word: word.to_string(),
            pivot_index: pivot_index(word),
            delay_ms: delay_ms(word, wpm),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum PulseEvent {
    Word {
        word: PulseWord,
        /// Global index of the word in the stream.
        index: usize,
    },
    Finished,
}

/// Fixation character index, by word length.
pub fn pivot_index(word: &str) -> usize {
    let len = word.trim().chars().count();
    let pivot = match len {
        0..=1 => 0,
        2..=5 => 1,
        6..=9 => 2,
        10..=13 => 3,
        _ => 4,
    };
    pivot.min(len.saturating_sub(1))
}

/// Display time for `word` at `wpm` words per minute.
pub fn delay_ms(word: &str, wpm: u32) -> u64 {
    let mut delay = (60_000 / u64::from(wpm.max(1))) as f64;
    if word.contains(',') {
        delay += COMMA_PAUSE_MS;
    }
    if word.contains(['.', '?', '!']) {
        delay += SENTENCE_PAUSE_MS;
    }
    if word.trim().chars().count() > LONG_WORD_CHARS {
        delay *= LONG_WORD_FACTOR;
    }
    delay as u64
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Lazy stream of [`PulseEvent`]s starting at a given word.
///
/// Yields one `Word` event per remaining word and a final `Finished`. Once
/// the token is cancelled the iterator ends without `Finished`. Pacing is
/// left to the consumer, which should wait `delay_ms` after each word.
#[derive(Debug)]
pub struct Pulse {
    words: Arc<[WordInfo]>,
    next: usize,
    wpm: u32,
    cancel: CancelToken,
    finished: bool,
}

impl Pulse {
    pub fn new(words: Arc<[WordInfo]>, start: usize, wpm: u32, cancel: CancelToken) -> Self {
        Self {
            words,
            next: start,
            wpm: wpm.max(1),
            cancel,
            finished: false,
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

impl Iterator for Pulse {
    type Item = PulseEvent;

    fn next(&mut self) -> Option<PulseEvent> {
        if self.finished || self.cancel.is_cancelled() {
            return None;
        }
        match self.words.get(self.next) {
            Some(info) => {
                let index = self.next;
                self.next += 1;
                Some(PulseEvent::Word {
                    word: PulseWord::new(&info.text, self.wpm),
                    index,
                })
            }
            None => {
                self.finished = true;
                Some(PulseEvent::Finished)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsvp::words::flatten;
    use crate::model::{Chapter, Document, Element, TextStyle};

    fn words(text: &str) -> Arc<[WordInfo]> {
        let doc = Document::new(
            "T",
            "A",
            vec![Chapter {
                title: String::new(),
                path: String::new(),
                elements: vec![Element::text(text, TextStyle::Body)],
            }],
        );
        flatten(&doc).into()
    }

    #[test]
    fn test_pivot_tiers() {
        assert_eq!(pivot_index("a"), 0);
        assert_eq!(pivot_index("hello"), 1);
        assert_eq!(pivot_index("wonderful"), 2);
        assert_eq!(pivot_index("extraordinary"), 3);
        assert_eq!(pivot_index("incomprehensibilities"), 4);
        assert_eq!(pivot_index(""), 0);
    }

    #[test]
    fn test_delay_adjustments() {
        assert_eq!(delay_ms("word", 300), 200);
        assert_eq!(delay_ms("word,", 300), 400);
        assert_eq!(delay_ms("end.", 300), 600);
        assert_eq!(delay_ms("what?!", 300), 600);
        // (200 + 400) * 1.1
        assert_eq!(delay_ms("wonderful.", 300), 660);
        assert_eq!(delay_ms("word", 0), 60_000);
    }

    #[test]
    fn test_pulse_from_start_index() {
        let pulse = Pulse::new(words("one two three"), 1, 600, CancelToken::new());
        let events: Vec<PulseEvent> = pulse.collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], PulseEvent::Word { index: 1, word } if word.word == "two"));
        assert!(matches!(&events[1], PulseEvent::Word { index: 2, word } if word.delay_ms == 100));
        assert_eq!(events[2], PulseEvent::Finished);
    }

    #[test]
    fn test_cancel_stops_without_finished() {
        let mut pulse = Pulse::new(words("one two three"), 0, 300, CancelToken::new());
        assert!(pulse.next().is_some());
        pulse.cancel_token().cancel();
        assert_eq!(pulse.next(), None);
    }

    #[test]
    fn test_start_past_end_only_finishes() {
        let events: Vec<_> = Pulse::new(words("one"), 5, 300, CancelToken::new()).collect();
        assert_eq!(events, vec![PulseEvent::Finished]);
    }
}
