//! HTML/XHTML parsing into an arena DOM.

pub mod arena;
pub mod sink;

use std::borrow::Cow;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

pub use arena::{Attribute, Dom, NodeData, NodeId};
pub use sink::DomSink;

use crate::util::decode_xml;

/// Elements that never have content in HTML.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Parse chapter markup.
///
/// XHTML self-closing forms of non-void elements (`<title/>`, `<div/>`) are
/// expanded first: an HTML parser would otherwise treat them as open tags and
/// swallow the rest of the document.
pub fn parse_html(bytes: &[u8]) -> Dom {
    let text = decode_xml(bytes);
    let text = expand_self_closing(&text);
    let sink = DomSink::new();
    parse_document(sink, ParseOpts::default())
        .one(&*text)
        .into_dom()
}

/// Rewrite `<tag .../>` as `<tag ...></tag>` for non-void tags.
fn expand_self_closing(input: &str) -> Cow<'_, str> {
    if !input.contains("/>") {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len() + 64);
    let mut copied = 0;
    let mut i = 0;

    while let Some(offset) = memchr::memchr(b'<', &bytes[i..]) {
        let start = i + offset;
        let Some(end) = tag_end(bytes, start) else {
            break;
        };
        i = end + 1;

        let name_start = start + 1;
        let name_len = bytes[name_start..end]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':'))
            .count();
        if name_len == 0 || bytes[end - 1] != b'/' {
            continue;
        }

        let name = &input[name_start..name_start + name_len];
        if VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name)) {
            continue;
        }

        out.push_str(&input[copied..end - 1]);
        out.push_str("></");
        out.push_str(name);
        out.push('>');
        copied = end + 1;
    }

    if copied == 0 {
        return Cow::Borrowed(input);
    }
    out.push_str(&input[copied..]);
    Cow::Owned(out)
}

/// Index of the `>` closing the tag opened at `start`, skipping quoted values.
/// Comments are skipped whole.
fn tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes[start..].starts_with(b"<!--") {
        return memchr::memmem::find(&bytes[start + 4..], b"-->").map(|p| start + 4 + p + 2);
    }

    let mut quote: Option<u8> = None;
    for (offset, &b) in bytes[start + 1..].iter().enumerate() {
        match (quote, b) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(start + 1 + offset),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_self_closing() {
        assert_eq!(
            expand_self_closing(r#"<title/><div class="x"/><br/><img src="a.png" />"#),
            r#"<title></title><div class="x"></div><br/><img src="a.png" />"#
        );
        assert_eq!(expand_self_closing("<p>plain</p>"), "<p>plain</p>");
    }

    #[test]
    fn test_expand_self_closing_respects_quotes_and_comments() {
        assert_eq!(
            expand_self_closing(r#"<a title="1/>2"/><!-- <span/> -->"#),
            r#"<a title="1/>2"></a><!-- <span/> -->"#
        );
    }

    #[test]
    fn test_self_closing_title_keeps_body() {
        let dom = parse_html(
            br#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title/></head>
<body><p>Still here</p></body></html>"#,
        );
        let p = dom.find_by_tag(dom.document(), "p").expect("body survives");
        assert_eq!(dom.text(p), "Still here");
    }
}
