//! Error types for pagewright operations.

use thiserror::Error;

/// Errors that can occur while opening, parsing or laying out a book.
#[derive(Error, Debug)]
pub enum Error {
    /// The archive could not be opened, or a required entry is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// The container or package document lacks a required field.
    #[error("malformed package: {0}")]
    MalformedPackage(String),

    /// A single spine entry could not be read. Parsing skips these.
    #[error("chapter unreadable: {href}: {reason}")]
    ChapterUnreadable { href: String, reason: String },

    #[error("no cover image found")]
    CoverNotFound,

    /// No chapters survived extraction.
    #[error("book contains no readable chapters")]
    EmptyDocument,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::ChapterUnreadable {
            href: "Text/ch2.xhtml".into(),
            reason: "entry not in archive".into(),
        };
        assert_eq!(
            err.to_string(),
            "chapter unreadable: Text/ch2.xhtml: entry not in archive"
        );
    }
}
