//! End-to-end parsing of small packages built in memory.

mod common;

use std::io::Cursor;

use common::{EpubBuilder, ncx};
use pagewright::{
    DirCoverStore, Element, Error, TextStyle, extract_cover, parse_book, parse_book_from_reader,
    parse_book_report,
};

fn first_text(doc: &pagewright::Document, chapter: usize) -> &str {
    doc.chapters[chapter]
        .elements
        .iter()
        .find_map(Element::as_text)
        .map(|t| t.content.as_str())
        .unwrap_or_default()
}

#[test]
fn test_spine_order_wins_over_manifest_order() {
    let book = EpubBuilder::new("Ordering", "Tester")
        .chapter("a", "a.xhtml", "<p>Alpha</p>")
        .chapter("b", "b.xhtml", "<p>Beta</p>")
        .chapter("c", "c.xhtml", "<p>Gamma</p>")
        .spine_order(&["c", "a", "b"]);

    let doc = parse_book_from_reader(Cursor::new(book.build())).unwrap();
    let order: Vec<&str> = (0..3).map(|i| first_text(&doc, i)).collect();
    assert_eq!(order, vec!["Gamma", "Alpha", "Beta"]);
    assert_eq!(doc.title, "Ordering");
    assert_eq!(doc.author, "Tester");
}

#[test]
fn test_titles_fall_back_without_ncx() {
    let book = EpubBuilder::new("No Nav", "Anon")
        .chapter("one", "one.xhtml", "<h1>Loomings</h1><p>Call me Ishmael.</p>")
        .chapter("two", "two.xhtml", "<p>No heading here.</p>");

    let doc = parse_book_from_reader(Cursor::new(book.build())).unwrap();
    assert_eq!(doc.chapters.len(), 2);
    assert_eq!(doc.chapters[0].title, "Loomings");
    assert_eq!(doc.chapters[1].title, "");

    let listed: Vec<usize> = doc.table_of_contents().map(|(i, _)| i).collect();
    assert_eq!(listed, vec![0]);
}

#[test]
fn test_ncx_labels_take_precedence() {
    let toc = ncx(&[("one.xhtml", "Chapter One"), ("two.xhtml#start", "Chapter Two")]);
    let book = EpubBuilder::new("Nav", "Anon")
        .chapter("one", "one.xhtml", "<h1>Heading One</h1>")
        .chapter("two", "two.xhtml", "<p>Body</p>")
        .item("ncx", "toc.ncx", "application/x-dtbncx+xml", toc.as_bytes());

    let (_dir, path) = book.write();
    let report = parse_book_report(&path).unwrap();
    let titles: Vec<&str> = report
        .document
        .chapters
        .iter()
        .map(|c| c.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Chapter One", "Chapter Two"]);
    assert_eq!(report.toc.len(), 2);
}

#[test]
fn test_case_mismatched_paths_resolve() {
    let book = EpubBuilder::new("Case", "Anon")
        .dangling("ch1", "Text/ch1.xhtml")
        .spine_ref("ch1")
        .raw_file(
            "oebps/text/Ch1.xhtml",
            common::xhtml("<p>Found despite casing.</p>").as_bytes(),
        );

    let doc = parse_book_from_reader(Cursor::new(book.build())).unwrap();
    assert_eq!(first_text(&doc, 0), "Found despite casing.");
}

#[test]
fn test_missing_chapter_is_skipped() {
    let book = EpubBuilder::new("Gaps", "Anon")
        .chapter("one", "one.xhtml", "<p>Present</p>")
        .dangling("two", "two.xhtml")
        .spine_ref("two")
        .chapter("three", "three.xhtml", "<p>Also present</p>");

    let (_dir, path) = book.write();
    let report = parse_book_report(&path).unwrap();
    assert_eq!(report.document.chapters.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(matches!(
        report.skipped[0],
        Error::ChapterUnreadable { ref href, .. } if href == "two.xhtml"
    ));
}

#[test]
fn test_no_readable_chapters_is_empty_document() {
    let book = EpubBuilder::new("Hollow", "Anon")
        .dangling("one", "one.xhtml")
        .spine_ref("one");
    let result = parse_book_from_reader(Cursor::new(book.build()));
    assert!(matches!(result, Err(Error::EmptyDocument)));
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let result = parse_book(dir.path().join("absent.epub"));
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn test_non_zip_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.epub");
    std::fs::write(&path, "just some text").unwrap();
    assert!(matches!(parse_book(&path), Err(Error::NotFound(_))));
}

#[test]
fn test_missing_container_is_not_found() {
    let book = EpubBuilder::new("Bare", "Anon")
        .chapter("one", "one.xhtml", "<p>x</p>")
        .without_container();
    let result = parse_book_from_reader(Cursor::new(book.build()));
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn test_rootfile_without_path_is_malformed() {
    let book = EpubBuilder::new("Broken", "Anon")
        .chapter("one", "one.xhtml", "<p>x</p>")
        .with_container("<container><rootfiles><rootfile/></rootfiles></container>");
    let result = parse_book_from_reader(Cursor::new(book.build()));
    assert!(matches!(result, Err(Error::MalformedPackage(_))));
}

#[test]
fn test_rootfile_pointing_nowhere_is_malformed() {
    let container = common::CONTAINER.replace("OEBPS/content.opf", "OEBPS/missing.opf");
    let book = EpubBuilder::new("Broken", "Anon")
        .chapter("one", "one.xhtml", "<p>x</p>")
        .with_container(&container);
    let result = parse_book_from_reader(Cursor::new(book.build()));
    assert!(matches!(result, Err(Error::MalformedPackage(_))));
}

#[test]
fn test_spineless_package_is_empty_document() {
    let book = EpubBuilder::new("Hollow", "Anon").with_opf("<package><metadata/></package>");
    let result = parse_book_from_reader(Cursor::new(book.build()));
    assert!(matches!(result, Err(Error::EmptyDocument)));
}

#[test]
fn test_blank_metadata_gets_placeholders() {
    let book = EpubBuilder::new("  ", "").chapter("one", "one.xhtml", "<p>text</p>");
    let doc = parse_book_from_reader(Cursor::new(book.build())).unwrap();
    assert_eq!(doc.title, pagewright::model::UNTITLED);
    assert_eq!(doc.author, pagewright::model::UNKNOWN_AUTHOR);
}

#[test]
fn test_heading_and_image_extraction() {
    let book = EpubBuilder::new("Mixed", "Anon")
        .chapter(
            "one",
            "text/one.xhtml",
            r#"<h2>Part</h2><p>Before</p><img src="../images/map.png" alt="map"/><blockquote>Said</blockquote>"#,
        )
        .item("map", "images/map.png", "image/png", b"\x89PNG");

    let doc = parse_book_from_reader(Cursor::new(book.build())).unwrap();
    let elements = &doc.chapters[0].elements;
    assert!(matches!(
        &elements[0],
        Element::Text(t) if t.style == TextStyle::Title && t.content == "Part"
    ));
    assert!(elements.iter().any(|e| matches!(
        e,
        Element::Image(img) if img.resource_path == "OEBPS/images/map.png"
    )));
    assert!(elements.iter().any(|e| matches!(
        e,
        Element::Text(t) if t.style == TextStyle::Quote && t.content == "Said"
    )));
}

#[test]
fn test_hidden_and_pagebreak_content_is_dropped() {
    let book = EpubBuilder::new("Markers", "Anon").chapter(
        "one",
        "one.xhtml",
        r#"<h1><span epub:type="pagebreak" id="page12">12</span>Chapter One<span hidden="">secret</span></h1>
<p>Body <span hidden="">secret</span>text</p>
<div role="doc-pagebreak">13</div>
<p aria-hidden="true">invisible</p>
<aside hidden="">footnote</aside>"#,
    );

    let doc = parse_book_from_reader(Cursor::new(book.build())).unwrap();
    let chapter = &doc.chapters[0];
    assert_eq!(chapter.title, "Chapter One");
    assert_eq!(
        chapter.elements,
        vec![
            Element::text("Chapter One", TextStyle::Title),
            Element::text("Body text", TextStyle::Body),
        ]
    );
}

#[test]
fn test_image_only_div_is_single_full_page_image() {
    let book = EpubBuilder::new("Plates", "Anon")
        .chapter(
            "plate",
            "text/plate.xhtml",
            r#"<div class="plate"> <img src="../images/a.png" alt=""/> </div>"#,
        )
        .item("a", "images/a.png", "image/png", b"\x89PNG");

    let doc = parse_book_from_reader(Cursor::new(book.build())).unwrap();
    let elements = &doc.chapters[0].elements;
    assert_eq!(elements.len(), 1);
    assert!(matches!(
        &elements[0],
        Element::Image(img) if img.is_full_page && img.resource_path == "OEBPS/images/a.png"
    ));
}

#[test]
fn test_cover_from_meta_is_stored() {
    let book = EpubBuilder::new("Covered", "Anon")
        .chapter("one", "one.xhtml", "<p>text</p>")
        .item("other", "images/other.png", "image/png", b"other")
        .item("art", "images/front.jpeg", "image/jpeg", b"jpeg-bytes")
        .meta(r#"<meta name="cover" content="art"/>"#);
    let (_dir, path) = book.write();

    let out = tempfile::tempdir().unwrap();
    let store = DirCoverStore::new(out.path().join("covers"));
    let saved = extract_cover(&path, "book-42", &store).unwrap();

    assert_eq!(saved, out.path().join("covers").join("book-42.jpeg"));
    assert_eq!(std::fs::read(saved).unwrap(), b"jpeg-bytes");
}

#[test]
fn test_cover_absent_returns_none() {
    let book = EpubBuilder::new("Plain", "Anon").chapter("one", "one.xhtml", "<p>text</p>");
    let (_dir, path) = book.write();
    let out = tempfile::tempdir().unwrap();
    let store = DirCoverStore::new(out.path());
    assert!(extract_cover(&path, "id", &store).is_none());
}
