//! Random-access EPUB archive and chapter lookup.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use zip::ZipArchive;
use zip::result::ZipError;

use super::path::percent_decode;
use crate::error::{Error, Result};
use crate::io::{ByteSource, FileSource, MemorySource, SourceCursor};
use crate::util::decode_document;

/// An opened ZIP container.
///
/// Entry names are indexed once at open time, in central-directory order.
pub struct Archive {
    zip: ZipArchive<SourceCursor>,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Archive {
    /// Open an archive over any random-access byte source.
    pub fn open(source: Arc<dyn ByteSource>) -> Result<Self> {
        let zip = ZipArchive::new(SourceCursor::new(source))?;

        let mut names = Vec::with_capacity(zip.len());
        let mut index = HashMap::with_capacity(zip.len());
        for i in 0..zip.len() {
            let Some(name) = zip.name_for_index(i) else {
                continue;
            };
            if name.ends_with('/') {
                continue;
            }
            index.entry(name.to_string()).or_insert(i);
            names.push(name.to_string());
        }

        Ok(Self { zip, names, index })
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        Self::open(Arc::new(MemorySource::new(bytes)))
    }

    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::open(Arc::new(FileSource::new(file)?))
    }

    /// File entry names, in central-directory order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn entry_name(&self, name: &str) -> Option<&str> {
        self.index.get_key_value(name).map(|(key, _)| key.as_str())
    }

    /// Read and decompress one entry by exact name.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let &i = self.index.get(name).ok_or(ZipError::FileNotFound)?;
        let mut file = self.zip.by_index(i)?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Read an entry and decode it to text.
    pub fn read_text(&mut self, name: &str) -> Result<String> {
        Ok(decode_document(&self.read(name)?))
    }

    /// Resolve a stored chapter reference to an entry name.
    ///
    /// Strategies run in [`LocateStrategy::ORDER`]; the first hit wins.
    pub fn locate(&self, href: &str) -> Option<&str> {
        LocateStrategy::ORDER
            .iter()
            .find_map(|strategy| strategy.try_locate(self, href))
    }

    /// Locate and read a chapter, mapping every failure to [`Error::ChapterLoad`].
    pub fn read_chapter(&mut self, href: &str) -> Result<String> {
        let name = self
            .locate(href)
            .ok_or_else(|| Error::chapter_load(href, "no matching archive entry"))?
            .to_string();
        self.read_text(&name)
            .map_err(|e| Error::chapter_load(href, e))
    }
}

/// Ways of matching a stored chapter reference against archive entries.
///
/// Older imports stored references that were not fully decoded or resolved,
/// so lookup degrades from exact to fuzzy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateStrategy {
    /// The reference is an entry name as-is.
    Exact,
    /// The percent-decoded reference is an entry name.
    Decoded,
    /// The first markup entry whose lowercased name ends with the lowercased,
    /// decoded reference (one leading slash removed).
    Suffix,
}

impl LocateStrategy {
    pub const ORDER: [LocateStrategy; 3] = [Self::Exact, Self::Decoded, Self::Suffix];

    pub fn try_locate<'a>(self, archive: &'a Archive, href: &str) -> Option<&'a str> {
        match self {
            Self::Exact => archive.entry_name(href),
            Self::Decoded => {
                let decoded = percent_decode(href);
                if decoded == href {
                    return None;
                }
                archive.entry_name(&decoded)
            }
            Self::Suffix => {
                let decoded = percent_decode(href);
                let needle = decoded
                    .strip_prefix('/')
                    .unwrap_or(decoded.as_ref())
                    .to_lowercase();
                if needle.is_empty() {
                    return None;
                }
                archive
                    .names
                    .iter()
                    .filter(|name| is_markup_entry(name))
                    .find(|name| name.to_lowercase().ends_with(&needle))
                    .map(String::as_str)
            }
        }
    }
}

fn is_markup_entry(name: &str) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    matches!(
        ext.to_ascii_lowercase().as_str(),
        "htm" | "html" | "xhtm" | "xhtml" | "xml"
    )
}
