//! Text decoding and archive path helpers.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (common in old ebooks)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Decode an XML document, using its declared encoding as the fallback hint.
pub fn decode_xml(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// Extract the encoding from an XML declaration, if present.
///
/// Only the first 100 bytes are inspected.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let (&quote, rest) = after_enc.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = rest.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&rest[..value_end]).ok()
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Percent-decode an href. Invalid UTF-8 sequences are replaced lossily.
pub fn percent_decode(href: &str) -> Cow<'_, str> {
    percent_decode_str(href).decode_utf8_lossy()
}

/// Drop any `#fragment` or `?query` suffix from an href.
pub fn strip_fragment(href: &str) -> &str {
    match href.find(['#', '?']) {
        Some(pos) => &href[..pos],
        None => href,
    }
}

/// Directory part of an archive path, without the trailing slash.
///
/// `"OEBPS/Text/ch1.xhtml"` gives `"OEBPS/Text"`; a bare file name gives `""`.
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Final path component.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Extension of the final path component, if any.
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    let dot = name.rfind('.')?;
    let ext = &name[dot + 1..];
    (!ext.is_empty()).then_some(ext)
}

/// Resolve `relative` against `base_dir`, collapsing `.` and `..` segments.
///
/// A leading `/` makes the path relative to the archive root. `..` at the root
/// is dropped rather than escaping the archive.
pub fn resolve_relative_path(base_dir: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    let rel = match relative.strip_prefix('/') {
        Some(rest) => rest,
        None => {
            segments.extend(base_dir.split('/').filter(|s| !s.is_empty()));
            relative
        }
    };

    for segment in rel.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    segments.join("/")
}

/// Resolve an href found inside the document at `source_path` to an archive path.
///
/// The href is percent-decoded and its fragment dropped first.
pub fn resolve_href(source_path: &str, href: &str) -> String {
    let decoded = percent_decode(strip_fragment(href));
    resolve_relative_path(parent_dir(source_path), &decoded)
}
