//! `META-INF/container.xml` handling.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{attr_value, local_name};
use crate::error::{Error, Result};
use crate::util::{decode_xml, strip_bom};

/// Fixed location of the container descriptor.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Find the package document path declared by the first `rootfile`.
pub fn resolve_manifest_path(container_xml: &[u8]) -> Result<String> {
    let content = decode_xml(strip_bom(container_xml));

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                let path = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"full-path")
                    .map(|a| attr_value(&a))
                    .filter(|p| !p.trim().is_empty());
                match path {
                    Some(path) => return Ok(path.trim().to_string()),
                    None => {
                        return Err(Error::MalformedPackage(
                            "rootfile without full-path in container.xml".into(),
                        ));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::MalformedPackage(format!(
                    "unreadable container.xml: {e}"
                )));
            }
            _ => {}
        }
    }

    Err(Error::MalformedPackage(
        "no rootfile found in container.xml".into(),
    ))
}
