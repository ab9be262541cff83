//! SVG minification.
//!
//! A streaming rewrite over quick-xml events that drops what browsers never
//! need: the XML declaration, doctype, comments, processing instructions,
//! descriptive elements, editor namespaces and whitespace-only text.

use std::collections::HashSet;
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use regex::Regex;

use crate::xml::{attribute_value, filter_attributes, xml_error};
use crate::SvgError;

/// Elements removed together with their content.
const DROPPED_ELEMENTS: &[&[u8]] = &[b"metadata", b"title", b"desc"];

/// Namespace prefixes written by drawing tools.
const EDITOR_PREFIXES: &[&[u8]] = &[b"inkscape", b"sodipodi", b"sketch", b"serif"];

static ID_REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:url\(\s*['"]?#|href\s*=\s*["']#)([^'")\s]+)"#)
        .expect("Invalid id reference regex")
});

/// Options for [`optimize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeOptions {
    /// Indent the output, one element per line
    pub pretty: bool,

    /// Drop the root `viewBox` when it equals `0 0 width height`
    pub remove_view_box: bool,

    /// Drop `id` attributes nothing in the document references
    pub cleanup_ids: bool,
}

impl OptimizeOptions {
    /// Settings used for sprite icons.
    pub fn icons() -> Self {
        Self {
            pretty: true,
            remove_view_box: false,
            cleanup_ids: true,
        }
    }

    /// Settings used for standalone images: ids are kept so external
    /// references keep working.
    pub fn images() -> Self {
        Self {
            pretty: false,
            remove_view_box: true,
            cleanup_ids: false,
        }
    }
}

/// Minify an SVG document.
pub fn optimize(svg: &str, options: &OptimizeOptions) -> Result<String, SvgError> {
    let referenced: HashSet<&str> = if options.cleanup_ids {
        ID_REFERENCE_RE
            .captures_iter(svg)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    } else {
        HashSet::new()
    };

    let mut reader = Reader::from_str(svg);
    reader.config_mut().trim_text(true);

    let mut writer = if options.pretty {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };

    let mut skip_depth = 0usize;
    let mut seen_root = false;

    loop {
        let event = reader.read_event().map_err(xml_error)?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => return Err(SvgError::Xml("unexpected end of document".into())),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
            Event::Start(start) => {
                if is_dropped(&start) {
                    skip_depth = 1;
                    continue;
                }
                let is_root = !seen_root;
                seen_root = true;
                let start = clean_element(&start, is_root, options, &referenced)?;
                writer
                    .write_event(Event::Start(start))
                    .map_err(xml_error)?;
            }
            Event::Empty(start) => {
                if is_dropped(&start) {
                    continue;
                }
                let is_root = !seen_root;
                seen_root = true;
                let start = clean_element(&start, is_root, options, &referenced)?;
                writer
                    .write_event(Event::Empty(start))
                    .map_err(xml_error)?;
            }
            other => writer.write_event(other).map_err(xml_error)?,
        }
    }

    if !seen_root {
        return Err(SvgError::MissingRoot);
    }

    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

fn is_dropped(start: &BytesStart<'_>) -> bool {
    let name = start.name();
    if DROPPED_ELEMENTS.contains(&name.as_ref()) {
        return true;
    }
    name.prefix()
        .is_some_and(|p| EDITOR_PREFIXES.contains(&p.as_ref()))
}

fn clean_element(
    start: &BytesStart<'_>,
    is_root: bool,
    options: &OptimizeOptions,
    referenced: &HashSet<&str>,
) -> Result<BytesStart<'static>, SvgError> {
    let drop_view_box = is_root && options.remove_view_box && view_box_is_redundant(start);

    filter_attributes(start, |attr| {
        let key = attr.key.as_ref();

        if is_editor_attribute(key) {
            return false;
        }
        if drop_view_box && key == b"viewBox" {
            return false;
        }
        if options.cleanup_ids && key == b"id" {
            let value = String::from_utf8_lossy(&attr.value);
            return referenced.contains(value.as_ref());
        }
        true
    })
}

fn is_editor_attribute(key: &[u8]) -> bool {
    let prefix = match key.iter().position(|b| *b == b':') {
        Some(pos) => &key[..pos],
        None => return false,
    };
    if prefix == b"xmlns" {
        let declared = &key[6..];
        return EDITOR_PREFIXES.contains(&declared);
    }
    EDITOR_PREFIXES.contains(&prefix)
}

/// Whether the root `viewBox` carries no information beyond width and height.
fn view_box_is_redundant(start: &BytesStart<'_>) -> bool {
    let (Some(view_box), Some(width), Some(height)) = (
        attribute_value(start, b"viewBox"),
        attribute_value(start, b"width"),
        attribute_value(start, b"height"),
    ) else {
        return false;
    };

    let parts: Vec<f64> = view_box
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    let (Some(width), Some(height)) = (parse_length(&width), parse_length(&height)) else {
        return false;
    };

    parts.len() == 4 && parts[0] == 0.0 && parts[1] == 0.0 && parts[2] == width && parts[3] == height
}

fn parse_length(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").parse().ok()
}
