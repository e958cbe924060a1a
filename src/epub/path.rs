//! Archive-internal reference resolution.
//!
//! Manifest, spine and TOC references are relative URLs that may be
//! percent-encoded. Everything in the crate stores the decoded,
//! archive-relative form produced here.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Resolve `href` against `base_dir` into a normalized archive path.
///
/// `base_dir` is an archive directory with a trailing slash (or empty for the
/// archive root). The base is treated as the path of an authority-rooted URL,
/// so `..` segments clamp at the archive root. Fragments and queries are
/// dropped, `.`/`..` segments collapse, the leading slash is removed and the
/// result is fully percent-decoded.
///
/// Network-path and absolute URL references (`//host/a.xhtml`,
/// `http://host/a.xhtml`) keep only their path, taken from the archive root.
/// Opaque references such as `mailto:` have no path and fall back to
/// `base_dir` + decoded `href`.
pub fn resolve(base_dir: &str, href: &str) -> String {
    let decoded = percent_decode(href);
    match resolve_path(base_dir, &decoded) {
        Some(path) => percent_decode(&path).into_owned(),
        None => format!("{base_dir}{decoded}"),
    }
}

/// Directory part of an archive path, with trailing slash ("" at the root).
pub fn dir_of(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..=i])
}

/// Split off a `#fragment`, returning the path part.
pub fn strip_fragment(href: &str) -> &str {
    href.split_once('#').map_or(href, |(path, _)| path)
}

/// Percent-decode, leaving malformed or non-UTF-8 sequences untouched.
pub fn percent_decode(s: &str) -> Cow<'_, str> {
    match percent_decode_str(s).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(s),
    }
}

fn resolve_path(base_dir: &str, reference: &str) -> Option<String> {
    let reference = reference.replace('\\', "/");
    let reference = reference
        .split(['#', '?'])
        .next()
        .unwrap_or_default();

    let reference = if let Some(network) = reference.strip_prefix("//") {
        authority_path(network)
    } else if let Some(scheme) = scheme_of(reference) {
        authority_path(reference[scheme.len() + 1..].strip_prefix("//")?)
    } else {
        reference
    };

    let merged = if let Some(absolute) = reference.strip_prefix('/') {
        absolute.to_string()
    } else if reference.is_empty() {
        base_dir.to_string()
    } else {
        format!("{}{}", dir_of(base_dir), reference)
    };

    Some(remove_dot_segments(&merged))
}

/// The URL scheme of `reference`, if it has one.
fn scheme_of(reference: &str) -> Option<&str> {
    let (scheme, _) = reference.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// The path after an authority, always root-relative ("/" when empty).
fn authority_path(after_slashes: &str) -> &str {
    match after_slashes.find('/') {
        Some(i) => &after_slashes[i..],
        None => "/",
    }
}

/// Collapse `.` and `..` segments of a root-relative path, clamping at the root.
fn remove_dot_segments(path: &str) -> String {
    let mut output: Vec<&str> = Vec::new();
    let mut segments = path.split('/').peekable();
    let mut trailing_slash = false;

    while let Some(segment) = segments.next() {
        let is_last = segments.peek().is_none();
        match segment {
            "." => trailing_slash = is_last,
            ".." => {
                output.pop();
                trailing_slash = is_last;
            }
            "" if !is_last => {}
            _ => {
                output.push(segment);
                trailing_slash = false;
            }
        }
    }

    let mut result = output.join("/");
    if trailing_slash && !result.is_empty() {
        result.push('/');
    }
    result
}
