//! Container parsing: metadata, reading order, chapter titles and cover.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::archive::Archive;
use super::nav::parse_nav_document;
use super::parser::{ManifestItem, Package, parse_container_xml, parse_ncx, parse_opf};
use super::path::{dir_of, resolve, strip_fragment};
use crate::error::{Error, Result};

/// Fixed location of the rootfile pointer.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Author recorded when the package names none.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// One readable spine entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDescriptor {
    /// Position among readable spine entries, contiguous from 0.
    pub spine_index: usize,
    /// Decoded, archive-relative path.
    pub href: String,
    pub title: String,
}

/// Cover image bytes and their declared media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cover {
    pub media_type: String,
    pub data: Vec<u8>,
}

/// Everything an import needs from an EPUB.
#[derive(Debug, Clone)]
pub struct ParsedBook {
    pub title: String,
    pub author: String,
    pub cover: Option<Cover>,
    pub chapters: Vec<ChapterDescriptor>,
}

/// Read and parse an EPUB file from disk.
///
/// The file name without its `.epub` extension stands in for a missing title.
pub fn read_book<P: AsRef<Path>>(path: P) -> Result<ParsedBook> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut archive = Archive::open_path(path)?;
    parse_book(&mut archive, display_name_for(&file_name))
}

/// Strip a trailing `.epub` (any case) from an uploaded file name.
pub fn display_name_for(filename: &str) -> &str {
    let split = filename.len().saturating_sub(".epub".len());
    match (filename.get(..split), filename.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(".epub") => stem,
        _ => filename,
    }
}

/// Parse an opened archive.
///
/// Only a missing container descriptor or package document is fatal. An
/// empty manifest or spine yields no chapters; TOC and cover lookups degrade
/// to positional titles and no cover.
pub fn parse_book(archive: &mut Archive, display_name: &str) -> Result<ParsedBook> {
    let container = archive
        .read(CONTAINER_PATH)
        .map_err(|_| Error::MalformedArchive(format!("missing {CONTAINER_PATH}")))?;
    let opf_path = parse_container_xml(&container)?;

    let opf = archive
        .read_text(&opf_path)
        .map_err(|_| Error::MalformedArchive(format!("missing package document at {opf_path}")))?;
    let package = parse_opf(&opf)?;
    let opf_dir = dir_of(&opf_path);

    let toc = TocSource::ORDER
        .iter()
        .find_map(|source| source.titles(archive, &package, opf_dir))
        .unwrap_or_default();

    let chapters: Vec<ChapterDescriptor> = package
        .spine
        .iter()
        .filter_map(|idref| package.item(idref))
        .filter(|item| item.is_content())
        .enumerate()
        .map(|(spine_index, item)| {
            let href = resolve(opf_dir, &item.href);
            let title = toc
                .get(&href)
                .cloned()
                .unwrap_or_else(|| placeholder_title(spine_index));
            ChapterDescriptor {
                spine_index,
                href,
                title,
            }
        })
        .collect();

    let cover = CoverStrategy::ORDER
        .iter()
        .find_map(|strategy| strategy.try_read(archive, &package, opf_dir));

    let title = package
        .title
        .clone()
        .unwrap_or_else(|| display_name.to_string());
    let author = package
        .author
        .clone()
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    debug!(
        %title,
        chapters = chapters.len(),
        toc_entries = toc.len(),
        has_cover = cover.is_some(),
        "parsed book"
    );

    Ok(ParsedBook {
        title,
        author,
        cover,
        chapters,
    })
}

fn placeholder_title(spine_index: usize) -> String {
    if spine_index == 0 {
        "Introduction".to_string()
    } else {
        format!("Chapter {spine_index}")
    }
}

/// Where chapter titles come from, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocSource {
    /// EPUB 3 manifest item with the `nav` property.
    NavDocument,
    /// EPUB 2 NCX, via the spine's `toc` attribute or its media type.
    Ncx,
}

impl TocSource {
    pub const ORDER: [TocSource; 2] = [Self::NavDocument, Self::Ncx];

    fn item(self, package: &Package) -> Option<&ManifestItem> {
        match self {
            Self::NavDocument => package.manifest.iter().find(|i| i.has_property("nav")),
            Self::Ncx => package
                .spine_toc
                .as_deref()
                .and_then(|id| package.item(id))
                .or_else(|| {
                    package
                        .manifest
                        .iter()
                        .find(|i| i.media_type == NCX_MEDIA_TYPE)
                }),
        }
    }

    /// Map of resolved chapter path to title, or `None` when this source is
    /// absent or unreadable. The first title for a path wins.
    pub fn titles(
        self,
        archive: &mut Archive,
        package: &Package,
        opf_dir: &str,
    ) -> Option<HashMap<String, String>> {
        let path = resolve(opf_dir, &self.item(package)?.href);
        let document = match archive.read_text(&path) {
            Ok(document) => document,
            Err(e) => {
                warn!(source = ?self, %path, error = %e, "table of contents unreadable");
                return None;
            }
        };
        let base = dir_of(&path);

        let entries: Vec<(String, String)> = match self {
            Self::NavDocument => parse_nav_document(&document)
                .into_iter()
                .map(|link| (link.href, link.label))
                .collect(),
            Self::Ncx => match parse_ncx(&document) {
                Ok(points) => points.into_iter().map(|p| (p.src, p.label)).collect(),
                Err(e) => {
                    warn!(%path, error = %e, "malformed NCX");
                    return None;
                }
            },
        };

        let mut titles = HashMap::new();
        for (href, label) in entries {
            let target = strip_fragment(&href);
            if target.is_empty() || label.is_empty() {
                continue;
            }
            titles.entry(resolve(base, target)).or_insert(label);
        }
        Some(titles)
    }
}

/// Ways of finding the cover image, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverStrategy {
    /// `<meta name="cover" content="id">` pointing at a manifest item.
    MetaPointer,
    /// Manifest item with the `cover-image` property.
    CoverImageProperty,
    /// First image item whose id or href mentions "cover".
    NameHeuristic,
}

impl CoverStrategy {
    pub const ORDER: [CoverStrategy; 3] = [
        Self::MetaPointer,
        Self::CoverImageProperty,
        Self::NameHeuristic,
    ];

    fn candidates(self, package: &Package) -> Vec<&ManifestItem> {
        match self {
            Self::MetaPointer => package
                .cover_id
                .as_deref()
                .and_then(|id| package.item(id))
                .into_iter()
                .collect(),
            Self::CoverImageProperty => package
                .manifest
                .iter()
                .find(|i| i.has_property("cover-image"))
                .into_iter()
                .collect(),
            Self::NameHeuristic => package
                .manifest
                .iter()
                .filter(|i| i.is_image())
                .filter(|i| {
                    i.id.to_lowercase().contains("cover") || i.href.to_lowercase().contains("cover")
                })
                .collect(),
        }
    }

    /// Read the first candidate that exists in the archive.
    pub fn try_read(self, archive: &mut Archive, package: &Package, opf_dir: &str) -> Option<Cover> {
        self.candidates(package).into_iter().find_map(|item| {
            if item.href.is_empty() {
                return None;
            }
            let path = resolve(opf_dir, &item.href);
            let data = archive.read(&path).ok()?;
            let media_type = if item.media_type.is_empty() {
                "image/jpeg".to_string()
            } else {
                item.media_type.clone()
            };
            Some(Cover { media_type, data })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_for() {
        assert_eq!(display_name_for("Moby Dick.epub"), "Moby Dick");
        assert_eq!(display_name_for("SHOUT.EPUB"), "SHOUT");
        assert_eq!(display_name_for("notes.txt"), "notes.txt");
        assert_eq!(display_name_for(".epub"), "");
        assert_eq!(display_name_for("ab"), "ab");
        // Multi-byte characters near the end must not split a char boundary.
        assert_eq!(display_name_for("caf\u{e9}s"), "caf\u{e9}s");
    }

    #[test]
    fn test_placeholder_titles() {
        assert_eq!(placeholder_title(0), "Introduction");
        assert_eq!(placeholder_title(3), "Chapter 3");
    }

    #[test]
    fn test_cover_candidates_follow_strategy() {
        let package = parse_opf(
            r#"<package><metadata><meta name="cover" content="c1"/></metadata><manifest>
                <item id="c1" href="one.jpg" media-type="image/jpeg"/>
                <item id="c2" href="two.png" media-type="image/png" properties="svg cover-image"/>
                <item id="x" href="images/Cover.gif" media-type="image/gif"/>
                <item id="coverpage" href="cover.xhtml" media-type="application/xhtml+xml"/>
            </manifest><spine/></package>"#,
        )
        .unwrap();

        let hrefs = |s: CoverStrategy| -> Vec<String> {
            s.candidates(&package).iter().map(|i| i.href.clone()).collect()
        };
        assert_eq!(hrefs(CoverStrategy::MetaPointer), vec!["one.jpg"]);
        assert_eq!(hrefs(CoverStrategy::CoverImageProperty), vec!["two.png"]);
        assert_eq!(
            hrefs(CoverStrategy::NameHeuristic),
            vec!["images/Cover.gif"]
        );
    }
}
