//! Word stream and rapid serial visual presentation.
//!
//! [`flatten`] turns a document into [`WordInfo`]s with structural
//! coordinates and sentence numbers; [`Pulse`] derives display timing from
//! them, and [`PulsePlayer`] paces a pulse in real time.

mod player;
mod pulse;
mod sentence;
mod words;

pub use player::{PulsePlayer, PulseSink};
pub use pulse::{
    CancelToken, Pulse, PulseEvent, PulseWord, delay_ms, pivot_index,
};
pub use sentence::is_sentence_end;
pub use words::{WordInfo, flatten, tokens, word_at_or_after};
