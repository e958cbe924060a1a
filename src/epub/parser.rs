//! EPUB XML parsing (container.xml, OPF package document, NCX).

use quick_xml::Reader;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::util::{normalize_whitespace, strip_bom};

/// A manifest entry. `href` is the raw reference, relative to the OPF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: String,
}

impl ManifestItem {
    /// Whether the whitespace-separated `properties` list contains `property`.
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.split_ascii_whitespace().any(|p| p == property)
    }

    /// Spine entries with an HTML-ish or missing media type are readable content.
    pub fn is_content(&self) -> bool {
        self.media_type.is_empty() || self.media_type.to_ascii_lowercase().contains("html")
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Parsed OPF package data.
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// First non-empty `dc:title`.
    pub title: Option<String>,
    /// First non-empty `dc:creator`.
    pub author: Option<String>,
    /// Manifest items in document order.
    pub manifest: Vec<ManifestItem>,
    /// Spine `idref`s in reading order.
    pub spine: Vec<String>,
    /// The spine's `toc` attribute (an NCX manifest id).
    pub spine_toc: Option<String>,
    /// `<meta name="cover" content="...">` manifest id.
    pub cover_id: Option<String>,
}

impl Package {
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    fn read_element(&mut self, e: &BytesStart) {
        let name = e.name();
        match local_name(name.as_ref()) {
            b"item" => {
                let mut item = ManifestItem::default();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"id" => item.id = attr_value(&attr),
                        b"href" => item.href = attr_value(&attr),
                        b"media-type" => item.media_type = attr_value(&attr),
                        b"properties" => item.properties = attr_value(&attr),
                        _ => {}
                    }
                }
                if !item.id.is_empty() {
                    self.manifest.push(item);
                }
            }
            b"itemref" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"idref" {
                        self.spine.push(attr_value(&attr));
                    }
                }
            }
            b"spine" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"toc" {
                        self.spine_toc = Some(attr_value(&attr));
                    }
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
                if is_cover && !content.is_empty() && self.cover_id.is_none() {
                    self.cover_id = Some(content);
                }
            }
            _ => {}
        }
    }
}

/// A flattened NCX `navPoint`. `src` is the raw reference, relative to the NCX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    pub label: String,
    pub src: String,
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8_lossy(strip_bom(bytes));

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        let path = attr_value(&attr);
                        if !path.is_empty() {
                            return Ok(path);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::MalformedArchive(format!(
                    "unreadable container.xml: {e}"
                )));
            }
            _ => {}
        }
    }

    Err(Error::MalformedArchive(
        "No rootfile found in container.xml".into(),
    ))
}

/// Parse OPF package document.
pub fn parse_opf(content: &str) -> Result<Package> {
    // Text is split around entity references; untrimmed runs keep their spacing.
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut package = Package::default();
    let mut in_metadata = false;
    let mut current_element: Option<&'static str> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"metadata" => in_metadata = true,
                    b"title" if in_metadata => {
                        current_element = Some("title");
                        buf_text.clear();
                    }
                    b"creator" if in_metadata => {
                        current_element = Some("creator");
                        buf_text.clear();
                    }
                    _ => package.read_element(&e),
                }
            }
            Ok(Event::Empty(e)) => package.read_element(&e),
            Ok(Event::Text(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current_element.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"metadata" {
                    in_metadata = false;
                }

                if let Some(elem) = current_element.take() {
                    let value = normalize_whitespace(&buf_text);
                    let slot = match elem {
                        "title" => &mut package.title,
                        _ => &mut package.author,
                    };
                    if slot.is_none() && !value.is_empty() {
                        *slot = Some(value);
                    }
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::MalformedArchive(format!(
                    "unreadable package document: {e}"
                )));
            }
            _ => {}
        }
    }

    Ok(package)
}

/// Parse an NCX table of contents into its navigation points, flattened in
/// document (pre-)order.
pub fn parse_ncx(content: &str) -> Result<Vec<NavPoint>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    struct NavPointState {
        label: String,
        label_done: bool,
        src: Option<String>,
    }

    let mut points: Vec<NavPointState> = Vec::new();
    // Indices into `points` of the currently open navPoints.
    let mut stack: Vec<usize> = Vec::new();
    let mut in_text = false;

    let set_src = |e: &BytesStart, stack: &[usize], points: &mut Vec<NavPointState>| {
        if let Some(state) = stack.last().and_then(|&i| points.get_mut(i))
            && state.src.is_none()
        {
            state.src = e
                .attributes()
                .flatten()
                .find(|attr| attr.key.as_ref() == b"src")
                .map(|attr| attr_value(&attr));
        }
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"navPoint" => {
                        stack.push(points.len());
                        points.push(NavPointState {
                            label: String::new(),
                            label_done: false,
                            src: None,
                        });
                    }
                    b"text" => in_text = true,
                    b"content" => set_src(&e, &stack, &mut points),
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"content" {
                    set_src(&e, &stack, &mut points);
                }
            }
            Ok(Event::Text(e)) => {
                if in_text
                    && let Some(state) = stack.last().and_then(|&i| points.get_mut(i))
                    && !state.label_done
                {
                    state.label.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text
                    && let Some(state) = stack.last().and_then(|&i| points.get_mut(i))
                    && !state.label_done
                {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        state.label.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"text" => {
                        in_text = false;
                        if let Some(state) = stack.last().and_then(|&i| points.get_mut(i)) {
                            state.label_done = true;
                        }
                    }
                    b"navPoint" => {
                        stack.pop();
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(points
        .into_iter()
        .filter_map(|state| {
            Some(NavPoint {
                label: normalize_whitespace(&state.label),
                src: state.src?,
            })
        })
        .collect())
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// Attribute value with XML escapes resolved, falling back to the raw text.
fn attr_value(attr: &Attribute) -> String {
    let raw = String::from_utf8_lossy(attr.value.as_ref());
    match quick_xml::escape::unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw.into_owned(),
    }
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(|c| c.to_string())
}
