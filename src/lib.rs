//! # pagewright
//!
//! An EPUB reading core: parse a book into a normalized document, lay it out
//! into screen-sized pages under any typography, keep the reader's place
//! across layout changes, and drive word-by-word RSVP reading from the same
//! content.
//!
//! ## Features
//!
//! - Case-tolerant archive access and container/package/NCX/nav parsing
//! - HTML extraction into typed text, image and table elements
//! - Greedy pagination against a pluggable [`TextMeasurer`]
//! - Structural [`Anchor`]s that survive re-pagination
//! - Sentence-aware word stream with RSVP timing and playback
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pagewright::{FixedAdvanceMeasurer, ReaderConfig, ReadingSession, parse_book};
//!
//! let document = parse_book("book.epub")?;
//! let mut session = ReadingSession::new(
//!     document,
//!     ReaderConfig::default(),
//!     Arc::new(FixedAdvanceMeasurer::default()),
//! )?;
//!
//! session.next_page();
//! println!("{:.0}% read", session.progress() * 100.0);
//! # Ok::<(), pagewright::Error>(())
//! ```
//!
//! ## Pagination without a session
//!
//! ```
//! use std::sync::Arc;
//! use pagewright::{Chapter, Document, Element, TextStyle};
//! use pagewright::layout::{FixedAdvanceMeasurer, LayoutParams, Paginator};
//!
//! let doc = Document::new("Title", "Author", vec![Chapter {
//!     title: "One".into(),
//!     path: "one.xhtml".into(),
//!     elements: vec![Element::text("Call me Ishmael.", TextStyle::Body)],
//! }]);
//!
//! let paginator = Paginator::new(Arc::new(FixedAdvanceMeasurer::default()), 1)?;
//! let pages = paginator.paginate_document(&doc, &LayoutParams::default());
//! assert_eq!(pages.len(), 1);
//! # Ok::<(), pagewright::Error>(())
//! ```

pub mod archive;
pub mod config;
pub mod cover;
pub(crate) mod dom;
pub mod error;
pub mod extract;
pub mod layout;
pub mod model;
pub mod package;
pub mod parser;
pub mod rsvp;
pub mod search;
pub mod session;
pub mod store;
pub(crate) mod util;

pub use archive::Archive;
pub use config::{ReaderConfig, load_config, parse_config};
pub use cover::{CoverImage, extract_cover, locate_cover, read_cover};
pub use error::{Error, Result};
pub use layout::{
    Anchor, FixedAdvanceMeasurer, LayoutParams, Page, Paginator, TextMeasurer, restore_anchor,
};
pub use model::{
    Cell, Chapter, Document, Element, ImageElement, Row, TableElement, TextElement, TextStyle,
};
pub use parser::{ParseReport, parse_book, parse_book_from_reader, parse_book_report};
pub use rsvp::{PulseEvent, PulsePlayer, PulseWord, WordInfo, flatten};
pub use search::{SearchResult, search};
pub use session::ReadingSession;
pub use store::{CoverStore, DirCoverStore, HighlightStore, MemoryStore, ProgressStore};
