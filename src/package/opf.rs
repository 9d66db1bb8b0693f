//! Package document (OPF) parsing: manifest, spine and metadata.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{attr_value, local_name, resolve_entity};
use crate::error::{Error, Result};
use crate::util::{parent_dir, percent_decode, resolve_relative_path};

/// A manifest `item` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Href as written in the package document (relative to it).
    pub href: String,
    pub media_type: String,
    /// Space-separated `properties` attribute, empty if absent.
    pub properties: String,
}

impl ManifestItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.split_ascii_whitespace().any(|p| p == property)
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Title and creator from the package metadata. Empty when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub title: String,
    pub creator: String,
}

/// Parsed package document.
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Archive path of the package document itself.
    pub path: String,
    pub metadata: PackageMetadata,
    /// Manifest items in declaration order.
    pub manifest: Vec<ManifestItem>,
    /// Spine `idref`s in reading order.
    pub spine: Vec<String>,
    /// `toc` attribute of the spine, naming the NCX item.
    pub spine_toc: Option<String>,
    /// Content of `<meta name="cover" content="..."/>`.
    pub cover_meta: Option<String>,
}

impl Package {
    /// Directory holding the package document, used as the base for hrefs.
    pub fn base_dir(&self) -> &str {
        parent_dir(&self.path)
    }

    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// Manifest id → href mapping. A repeated id keeps its first href.
    pub fn id_to_href(&self) -> HashMap<&str, &str> {
        let mut map = HashMap::with_capacity(self.manifest.len());
        for item in &self.manifest {
            map.entry(item.id.as_str()).or_insert(item.href.as_str());
        }
        map
    }

    /// Archive path of a manifest href.
    ///
    /// The href is percent-decoded and resolved against the package
    /// directory; a leading `/` is taken as already relative to it.
    pub fn resolve(&self, href: &str) -> String {
        let decoded = percent_decode(href);
        let base = self.base_dir();
        let trimmed = decoded.trim_start_matches('/');
        if !base.is_empty() && trimmed.starts_with(&format!("{base}/")) {
            resolve_relative_path("", trimmed)
        } else {
            resolve_relative_path(base, trimmed)
        }
    }

    /// The NCX navigation item: the spine's `toc` reference, otherwise the
    /// first item whose href ends in `.ncx`.
    pub fn ncx_item(&self) -> Option<&ManifestItem> {
        self.spine_toc
            .as_deref()
            .and_then(|id| self.item(id))
            .or_else(|| {
                self.manifest
                    .iter()
                    .find(|item| item.href.to_ascii_lowercase().ends_with(".ncx"))
            })
    }

    /// The EPUB 3 navigation document, if declared.
    pub fn nav_item(&self) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.has_property("nav"))
    }
}

/// Which metadata field a text run belongs to, and whether it was prefixed.
#[derive(Clone, Copy)]
enum Field {
    Title { namespaced: bool },
    Creator { namespaced: bool },
}

/// First non-empty value seen for each lookup, namespaced and plain kept apart.
#[derive(Default)]
struct Candidates {
    namespaced: Option<String>,
    plain: Option<String>,
}

impl Candidates {
    fn offer(&mut self, namespaced: bool, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let slot = if namespaced {
            &mut self.namespaced
        } else {
            &mut self.plain
        };
        slot.get_or_insert_with(|| value.to_string());
    }

    fn resolve(self) -> String {
        self.namespaced.or(self.plain).unwrap_or_default()
    }
}

/// Parse a package document found at `opf_path`.
///
/// Item declarations may be self-closing or not; `itemref`s are kept in
/// document order regardless of manifest order.
pub fn parse_manifest(content: &str, opf_path: &str) -> Result<Package> {
    // Text is trimmed per field, not per event, so spaces around entities survive.
    let mut reader = Reader::from_str(content);

    let mut package = Package {
        path: opf_path.to_string(),
        ..Package::default()
    };
    let mut title = Candidates::default();
    let mut creator = Candidates::default();

    let mut in_metadata = false;
    let mut current: Option<Field> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let raw = name.as_ref();
                let namespaced = raw.contains(&b':');
                match local_name(raw) {
                    b"metadata" => in_metadata = true,
                    b"title" if in_metadata => {
                        current = Some(Field::Title { namespaced });
                        buf_text.clear();
                    }
                    b"creator" if in_metadata => {
                        current = Some(Field::Creator { namespaced });
                        buf_text.clear();
                    }
                    b"spine" => package.spine_toc = spine_toc(&e),
                    _ => declaration(&mut package, &e),
                }
            }
            Ok(Event::Empty(e)) => match local_name(e.name().as_ref()) {
                b"spine" => package.spine_toc = spine_toc(&e),
                _ => declaration(&mut package, &e),
            },
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"metadata" => in_metadata = false,
                    b"title" | b"creator" => match current.take() {
                        Some(Field::Title { namespaced }) => title.offer(namespaced, &buf_text),
                        Some(Field::Creator { namespaced }) => {
                            creator.offer(namespaced, &buf_text)
                        }
                        None => {}
                    },
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::MalformedPackage(format!(
                    "unreadable package document {opf_path}: {e}"
                )));
            }
            _ => {}
        }
    }

    package.metadata = PackageMetadata {
        title: title.resolve(),
        creator: creator.resolve(),
    };
    Ok(package)
}

fn spine_toc(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"toc")
        .map(|a| attr_value(&a))
        .filter(|v| !v.is_empty())
}

/// Record `item`, `itemref` and cover `meta` declarations.
fn declaration(package: &mut Package, e: &BytesStart<'_>) {
    let name = e.name();
    match local_name(name.as_ref()) {
        b"item" => {
            let mut item = ManifestItem {
                id: String::new(),
                href: String::new(),
                media_type: String::new(),
                properties: String::new(),
            };
            for attr in e.attributes().flatten() {
                match attr.key.as_ref() {
                    b"id" => item.id = attr_value(&attr),
                    b"href" => item.href = attr_value(&attr),
                    b"media-type" => item.media_type = attr_value(&attr),
                    b"properties" => item.properties = attr_value(&attr),
                    _ => {}
                }
            }
            if !item.id.is_empty() && !item.href.is_empty() {
                package.manifest.push(item);
            }
        }
        b"itemref" => {
            if let Some(idref) = e
                .attributes()
                .flatten()
                .find(|a| a.key.as_ref() == b"idref")
            {
                package.spine.push(attr_value(&idref));
            }
        }
        b"meta" => {
            let mut is_cover = false;
            let mut content = String::new();
            for attr in e.attributes().flatten() {
                match attr.key.as_ref() {
                    b"name" if attr.value.as_ref() == b"cover" => is_cover = true,
                    b"content" => content = attr_value(&attr),
                    _ => {}
                }
            }
            if is_cover && !content.is_empty() && package.cover_meta.is_none() {
                package.cover_meta = Some(content);
            }
        }
        _ => {}
    }
}
