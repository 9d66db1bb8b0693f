//! Zip archive access with lenient entry lookup.
//!
//! Packages in the wild are not consistent about path casing or separators,
//! and some wrap everything in an extra top-level folder. [`Archive::find_entry`]
//! tolerates all three.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::util::decode_xml;

/// A resolved entry inside an [`Archive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHandle {
    index: usize,
    name: String,
}

impl EntryHandle {
    /// The entry's real name in the archive.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An opened zip package.
pub struct Archive<R> {
    zip: ZipArchive<R>,
    names: Vec<String>,
}

impl Archive<File> {
    /// Open an archive on disk. Any failure to open or read the central
    /// directory is reported as [`Error::NotFound`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::NotFound(format!("{}: {e}", path.display())))?;
        Self::from_reader(file)
            .map_err(|e| Error::NotFound(format!("{}: {e}", path.display())))
    }
}

impl Archive<Cursor<Vec<u8>>> {
    /// Open an archive held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Open an archive from any [`Read`] + [`Seek`] source.
    pub fn from_reader(reader: R) -> Result<Self> {
        let zip = ZipArchive::new(reader)?;
        let names = (0..zip.len())
            .map(|i| zip.name_for_index(i).unwrap_or_default().to_string())
            .collect();
        Ok(Self { zip, names })
    }

    /// Locate an entry by path.
    ///
    /// Tries an exact match, then a case-insensitive match with `\` treated as
    /// `/`, then any entry whose name ends with `"/" + path` (ignoring case).
    pub fn find_entry(&self, path: &str) -> Option<EntryHandle> {
        let handle = |index: usize| EntryHandle {
            index,
            name: self.names[index].clone(),
        };

        if let Some(i) = self.names.iter().position(|n| n == path) {
            return Some(handle(i));
        }

        let target = path.replace('\\', "/");
        if let Some(i) = self
            .names
            .iter()
            .position(|n| n.replace('\\', "/").eq_ignore_ascii_case(&target))
        {
            return Some(handle(i));
        }

        let suffix = format!("/{}", target.trim_start_matches('/')).to_ascii_lowercase();
        self.names
            .iter()
            .position(|n| n.replace('\\', "/").to_ascii_lowercase().ends_with(&suffix))
            .map(handle)
    }

    /// Read an entry's bytes.
    pub fn read_bytes(&mut self, entry: &EntryHandle) -> Result<Vec<u8>> {
        let mut file = self.zip.by_index(entry.index)?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Find and read an entry in one step, failing with [`Error::NotFound`].
    pub fn read_path(&mut self, path: &str) -> Result<Vec<u8>> {
        let entry = self
            .find_entry(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        self.read_bytes(&entry)
    }

    /// Find and read an XML entry, decoding it to text.
    pub fn read_text(&mut self, path: &str) -> Result<String> {
        let bytes = self.read_path(path)?;
        Ok(decode_xml(&bytes).into_owned())
    }
}
