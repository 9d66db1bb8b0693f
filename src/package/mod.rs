//! Package structure: container descriptor, package document, navigation.
//!
//! All three are small XML documents read with `quick-xml`'s pull parser.

pub mod container;
pub mod opf;
pub mod toc;

pub use container::{CONTAINER_PATH, resolve_manifest_path};
pub use opf::{ManifestItem, Package, PackageMetadata, parse_manifest};
pub use toc::{Toc, TocEntry, parse_nav, parse_toc};

use quick_xml::events::attributes::Attribute;

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Attribute value with XML escapes resolved. Malformed escapes are kept verbatim.
pub(crate) fn attr_value(attr: &Attribute<'_>) -> String {
    let raw = String::from_utf8_lossy(&attr.value);
    match quick_xml::escape::unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw.into_owned(),
    }
}

/// Resolve XML entity references.
pub(crate) fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some("\u{a0}".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };

    code.and_then(char::from_u32).map(String::from)
}
