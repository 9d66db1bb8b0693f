//! In-memory EPUB builder shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// A chapter file in the manifest.
pub struct Item {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

/// Builds the bytes of a small EPUB package rooted at `OEBPS/content.opf`.
pub struct EpubBuilder {
    title: String,
    creator: String,
    items: Vec<Item>,
    spine: Vec<String>,
    extra_meta: String,
    files: Vec<(String, Vec<u8>)>,
    container: Option<String>,
    opf_override: Option<String>,
}

impl EpubBuilder {
    pub fn new(title: &str, creator: &str) -> Self {
        Self {
            title: title.to_string(),
            creator: creator.to_string(),
            items: Vec::new(),
            spine: Vec::new(),
            extra_meta: String::new(),
            files: Vec::new(),
            container: Some(CONTAINER.to_string()),
            opf_override: None,
        }
    }

    /// Add a manifest item and the file it points to (relative to `OEBPS/`).
    pub fn item(mut self, id: &str, href: &str, media_type: &str, body: &[u8]) -> Self {
        self.items.push(Item {
            id: id.to_string(),
            href: href.to_string(),
            media_type: media_type.to_string(),
            properties: None,
        });
        self.files.push((format!("OEBPS/{href}"), body.to_vec()));
        self
    }

    /// Add an XHTML chapter and put it on the spine.
    pub fn chapter(self, id: &str, href: &str, body: &str) -> Self {
        self.item(id, href, "application/xhtml+xml", xhtml(body).as_bytes())
            .spine_ref(id)
    }

    /// Manifest entry without a backing file.
    pub fn dangling(mut self, id: &str, href: &str) -> Self {
        self.items.push(Item {
            id: id.to_string(),
            href: href.to_string(),
            media_type: "application/xhtml+xml".to_string(),
            properties: None,
        });
        self
    }

    pub fn spine_ref(mut self, id: &str) -> Self {
        self.spine.push(id.to_string());
        self
    }

    pub fn spine_order(mut self, ids: &[&str]) -> Self {
        self.spine = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn meta(mut self, raw: &str) -> Self {
        self.extra_meta.push_str(raw);
        self
    }

    /// Write an archive entry verbatim, outside the manifest.
    pub fn raw_file(mut self, name: &str, body: &[u8]) -> Self {
        self.files.push((name.to_string(), body.to_vec()));
        self
    }

    pub fn without_container(mut self) -> Self {
        self.container = None;
        self
    }

    pub fn with_container(mut self, xml: &str) -> Self {
        self.container = Some(xml.to_string());
        self
    }

    pub fn with_opf(mut self, opf: &str) -> Self {
        self.opf_override = Some(opf.to_string());
        self
    }

    fn opf(&self) -> String {
        if let Some(opf) = &self.opf_override {
            return opf.clone();
        }
        let manifest: String = self
            .items
            .iter()
            .map(|item| {
                let props = item
                    .properties
                    .as_deref()
                    .map(|p| format!(r#" properties="{p}""#))
                    .unwrap_or_default();
                format!(
                    r#"<item id="{}" href="{}" media-type="{}"{props}/>"#,
                    item.id, item.href, item.media_type
                )
            })
            .collect();
        let spine: String = self
            .spine
            .iter()
            .map(|id| format!(r#"<itemref idref="{id}"/>"#))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{}</dc:title>
    <dc:creator>{}</dc:creator>
    {}
  </metadata>
  <manifest>{manifest}</manifest>
  <spine>{spine}</spine>
</package>"#,
            self.title, self.creator, self.extra_meta
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default();

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        if let Some(container) = &self.container {
            zip.start_file("META-INF/container.xml", deflated).unwrap();
            zip.write_all(container.as_bytes()).unwrap();
        }

        zip.start_file("OEBPS/content.opf", deflated).unwrap();
        zip.write_all(self.opf().as_bytes()).unwrap();

        for (name, body) in &self.files {
            zip.start_file(name.as_str(), deflated).unwrap();
            zip.write_all(body).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    /// Write the package to a temporary directory.
    pub fn write(&self) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        std::fs::write(&path, self.build()).unwrap();
        (dir, path)
    }
}

/// Wrap body markup in a minimal XHTML document.
pub fn xhtml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title></title></head><body>{body}</body></html>"#
    )
}

/// An NCX mapping each `(src, label)` pair to a nav point.
pub fn ncx(points: &[(&str, &str)]) -> String {
    let nav_points: String = points
        .iter()
        .enumerate()
        .map(|(i, (src, label))| {
            format!(
                r#"<navPoint id="np{i}" playOrder="{}"><navLabel><text>{label}</text></navLabel><content src="{src}"/></navPoint>"#,
                i + 1
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1"><navMap>{nav_points}</navMap></ncx>"#
    )
}
