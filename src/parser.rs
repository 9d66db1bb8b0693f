//! Whole-book parsing: archive → container → package → chapters.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::archive::Archive;
use crate::error::{Error, Result};
use crate::extract::{ExtractedChapter, extract_chapter};
use crate::model::{Chapter, Document, Element};
use crate::package::{
    CONTAINER_PATH, Package, Toc, parse_manifest, parse_nav, parse_toc, resolve_manifest_path,
};

/// Headings longer than this are cut when used as a chapter title.
const HEADING_TITLE_CHARS: usize = 50;

/// A parsed book plus what was dropped along the way.
#[derive(Debug)]
pub struct ParseReport {
    pub document: Document,
    pub package: Package,
    pub toc: Toc,
    /// One [`Error::ChapterUnreadable`] per skipped spine entry.
    pub skipped: Vec<Error>,
}

/// Parse an EPUB file on disk into a [`Document`].
///
/// # Example
///
/// ```no_run
/// let doc = pagewright::parse_book("path/to/book.epub")?;
/// println!("{} by {} ({} chapters)", doc.title, doc.author, doc.chapters.len());
/// # Ok::<(), pagewright::Error>(())
/// ```
pub fn parse_book<P: AsRef<Path>>(path: P) -> Result<Document> {
    parse_book_report(path).map(|report| report.document)
}

/// Like [`parse_book`], keeping the package, TOC and skipped chapters.
pub fn parse_book_report<P: AsRef<Path>>(path: P) -> Result<ParseReport> {
    let mut archive: Archive<File> = Archive::open(path)?;
    parse_archive(&mut archive)
}

/// Parse an EPUB from any [`Read`] + [`Seek`] source.
pub fn parse_book_from_reader<R: Read + Seek>(reader: R) -> Result<Document> {
    let mut archive = Archive::from_reader(reader)
        .map_err(|e| Error::NotFound(format!("unreadable archive: {e}")))?;
    parse_archive(&mut archive).map(|report| report.document)
}

/// Locate and parse the package document of an opened archive.
pub fn read_package<R: Read + Seek>(archive: &mut Archive<R>) -> Result<Package> {
    let container = archive
        .find_entry(CONTAINER_PATH)
        .ok_or_else(|| Error::NotFound(CONTAINER_PATH.to_string()))?;
    let container_xml = archive.read_bytes(&container)?;
    let opf_path = resolve_manifest_path(&container_xml)?;

    if archive.find_entry(&opf_path).is_none() {
        return Err(Error::MalformedPackage(format!(
            "package document {opf_path} not in archive"
        )));
    }
    let opf = archive.read_text(&opf_path)?;
    parse_manifest(&opf, &opf_path)
}

/// Parse every spine entry of an opened archive.
pub fn parse_archive<R: Read + Seek>(archive: &mut Archive<R>) -> Result<ParseReport> {
    let package = read_package(archive)?;
    let toc = read_toc(archive, &package);
    debug!(
        spine = package.spine.len(),
        manifest = package.manifest.len(),
        toc_entries = toc.len(),
        "Parsed package document"
    );

    let hrefs = package.id_to_href();
    let mut chapters = Vec::with_capacity(package.spine.len());
    let mut skipped = Vec::new();

    for idref in &package.spine {
        match read_chapter(archive, &package, &hrefs, &toc, idref) {
            Ok(chapter) => {
                debug!(
                    path = %chapter.path,
                    title = %chapter.title,
                    elements = chapter.elements.len(),
                    "Parsed chapter"
                );
                chapters.push(chapter);
            }
            Err(err) => {
                warn!("Skipping chapter: {err}");
                skipped.push(err);
            }
        }
    }

    if chapters.is_empty() {
        return Err(Error::EmptyDocument);
    }

    let document = Document::new(
        &package.metadata.title,
        &package.metadata.creator,
        chapters,
    );
    info!(
        title = %document.title,
        chapters = document.chapters.len(),
        skipped = skipped.len(),
        "Parsed book"
    );

    Ok(ParseReport {
        document,
        package,
        toc,
        skipped,
    })
}

/// Navigation labels from the NCX, else the EPUB 3 nav document.
///
/// A broken navigation file only costs chapter titles, so errors are logged
/// and an empty map returned.
fn read_toc<R: Read + Seek>(archive: &mut Archive<R>, package: &Package) -> Toc {
    if let Some(item) = package.ncx_item() {
        let path = package.resolve(&item.href);
        match archive
            .read_text(&path)
            .and_then(|xml| parse_toc(&xml, &path))
        {
            Ok(toc) => return toc,
            Err(err) => warn!(path = %path, "Ignoring unreadable NCX: {err}"),
        }
    }

    if let Some(item) = package.nav_item() {
        let path = package.resolve(&item.href);
        match archive.read_path(&path) {
            Ok(bytes) => return parse_nav(&bytes, &path),
            Err(err) => warn!(path = %path, "Ignoring unreadable nav document: {err}"),
        }
    }

    Toc::new()
}

fn read_chapter<R: Read + Seek>(
    archive: &mut Archive<R>,
    package: &Package,
    hrefs: &HashMap<&str, &str>,
    toc: &Toc,
    idref: &str,
) -> Result<Chapter> {
    let unreadable = |href: &str, reason: String| Error::ChapterUnreadable {
        href: href.to_string(),
        reason,
    };

    let href = *hrefs
        .get(idref)
        .ok_or_else(|| unreadable(idref, "spine idref not in manifest".into()))?;
    let path = package.resolve(href);

    let entry = archive
        .find_entry(&path)
        .ok_or_else(|| unreadable(href, format!("{path} not in archive")))?;
    let markup = archive
        .read_bytes(&entry)
        .map_err(|e| unreadable(href, e.to_string()))?;

    let ExtractedChapter {
        elements,
        head_title,
    } = extract_chapter(&markup, &path);

    let title = chapter_title(toc.label_for(&path), &elements, &head_title);
    Ok(Chapter {
        title,
        path,
        elements,
    })
}

/// TOC label, then the first title/heading text (truncated), then the
/// document's head title, then empty.
pub fn chapter_title(toc_label: Option<&str>, elements: &[Element], head_title: &str) -> String {
    let heading = || {
        elements
            .iter()
            .filter_map(Element::as_text)
            .find(|t| t.style.is_heading())
            .map(|t| t.content.chars().take(HEADING_TITLE_CHARS).collect::<String>())
    };

    toc_label
        .filter(|label| !label.trim().is_empty())
        .map(str::to_string)
        .or_else(heading)
        .or_else(|| (!head_title.trim().is_empty()).then(|| head_title.to_string()))
        .unwrap_or_default()
        .trim()
        .to_string()
}
