//! Cover image discovery.
//!
//! Strategies, first hit wins:
//! 1. `<meta name="cover" content="ID"/>` dereferenced to the item's href
//! 2. an item whose `properties` include `cover-image`
//! 3. an item whose file name is a conventional cover name
//! 4. the first item with an `image/*` media type
//!
//! A missing cover is a normal state: [`extract_cover`] logs and returns `None`.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::archive::Archive;
use crate::error::{Error, Result};
use crate::package::{ManifestItem, Package};
use crate::parser::read_package;
use crate::store::CoverStore;
use crate::util::{extension, file_name};

/// Conventional cover file names, matched case-sensitively.
const COVER_FILE_NAMES: &[&str] = &[
    "cover.jpg",
    "cover.jpeg",
    "cover.png",
    "cover.gif",
    "Cover.jpg",
    "Cover.jpeg",
    "Cover.png",
    "cover-image.jpg",
    "cover-image.jpeg",
    "cover-image.png",
];

/// Extension used when the cover path has none.
pub const DEFAULT_COVER_EXTENSION: &str = "jpg";

/// Cover bytes read from a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    /// Archive path the image was read from.
    pub path: String,
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Pick the manifest item holding the cover.
pub fn locate_cover(package: &Package) -> Option<&ManifestItem> {
    let by_meta = || {
        package
            .cover_meta
            .as_deref()
            .and_then(|id| package.item(id))
    };
    let by_property = || {
        package
            .manifest
            .iter()
            .find(|item| item.has_property("cover-image"))
    };
    let by_name = || {
        package
            .manifest
            .iter()
            .find(|item| COVER_FILE_NAMES.contains(&file_name(&item.href)))
    };
    let first_image = || package.manifest.iter().find(|item| item.is_image());

    by_meta()
        .or_else(by_property)
        .or_else(by_name)
        .or_else(first_image)
}

/// Read the cover image of an opened archive.
pub fn read_cover<R: Read + Seek>(archive: &mut Archive<R>) -> Result<CoverImage> {
    let package = read_package(archive)?;
    let item = locate_cover(&package).ok_or(Error::CoverNotFound)?;
    let path = package.resolve(&item.href);
    let entry = archive.find_entry(&path).ok_or(Error::CoverNotFound)?;
    let bytes = archive.read_bytes(&entry)?;

    Ok(CoverImage {
        extension: extension(&path)
            .unwrap_or(DEFAULT_COVER_EXTENSION)
            .to_string(),
        path,
        bytes,
    })
}

/// Find the cover of the book at `archive_path` and persist it under `book_id`.
///
/// Returns the stored location, or `None` when there is no usable cover or
/// anything along the way fails.
pub fn extract_cover<P: AsRef<Path>>(
    archive_path: P,
    book_id: &str,
    store: &dyn CoverStore,
) -> Option<PathBuf> {
    let archive_path = archive_path.as_ref();
    let stored = Archive::open(archive_path)
        .and_then(|mut archive| read_cover(&mut archive))
        .and_then(|cover| {
            debug!(path = %cover.path, bytes = cover.bytes.len(), "Found cover image");
            store.put_cover(book_id, &cover.extension, &cover.bytes)
        });

    match stored {
        Ok(path) => Some(path),
        Err(err) => {
            warn!(archive = %archive_path.display(), "No cover extracted: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::parse_manifest;

    fn package(manifest: &str, metadata: &str) -> Package {
        let opf = format!(
            r#"<package><metadata>{metadata}</metadata><manifest>{manifest}</manifest><spine/></package>"#
        );
        parse_manifest(&opf, "OEBPS/content.opf").unwrap()
    }

    #[test]
    fn test_meta_cover_wins() {
        let package = package(
            r#"<item id="img1" href="Images/first.png" media-type="image/png"/>
<item id="c" href="Images/front.jpg" media-type="image/jpeg"/>
<item id="p" href="Images/prop.jpg" media-type="image/jpeg" properties="cover-image"/>"#,
            r#"<meta name="cover" content="c"/>"#,
        );
        assert_eq!(locate_cover(&package).unwrap().id, "c");
    }

    #[test]
    fn test_dangling_meta_falls_through_to_property() {
        let package = package(
            r#"<item id="img1" href="Images/first.png" media-type="image/png"/>
<item id="p" href="Images/prop.jpg" media-type="image/jpeg" properties="cover-image"/>"#,
            r#"<meta name="cover" content="missing"/>"#,
        );
        assert_eq!(locate_cover(&package).unwrap().id, "p");
    }

    #[test]
    fn test_conventional_name_before_first_image() {
        let package = package(
            r#"<item id="img1" href="Images/first.png" media-type="image/png"/>
<item id="cv" href="Images/Cover.jpeg" media-type="image/jpeg"/>"#,
            "",
        );
        assert_eq!(locate_cover(&package).unwrap().id, "cv");
    }

    #[test]
    fn test_first_image_fallback() {
        let package = package(
            r#"<item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
<item id="img1" href="Images/plate.gif" media-type="image/gif"/>"#,
            "",
        );
        assert_eq!(locate_cover(&package).unwrap().id, "img1");
    }

    #[test]
    fn test_no_images_no_cover() {
        let package = package(
            r#"<item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>"#,
            "",
        );
        assert!(locate_cover(&package).is_none());
    }
}
