//! `<symbol>` sprite composition.
//!
//! Each icon becomes a `<symbol>` with the icon's viewBox, identified by its
//! file stem, so pages reference it as `<use href="sprite.svg#stem">`. Ids
//! inside an icon are prefixed with the symbol id, together with their
//! `#id` and `url(#id)` references, so icons sharing an id stay apart.

use std::collections::HashSet;
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use regex::{Captures, Regex};

use crate::xml::{attribute_value, xml_error};
use crate::SvgError;

static URL_REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(['"]?)#([^'")\s]+)"#).expect("Invalid url reference regex")
});

/// One icon inside a sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Symbol id (from the icon file stem)
    pub id: String,

    /// viewBox taken from the icon root, or derived from its size
    pub view_box: Option<String>,

    /// Markup inside the icon's root element
    pub content: String,
}

impl Symbol {
    /// Parse an icon document into a symbol.
    pub fn parse(id: &str, svg: &str) -> Result<Self, SvgError> {
        let local_ids = defined_ids(svg)?;
        let mut reader = Reader::from_str(svg);
        reader.config_mut().trim_text(false);
        let mut writer = Writer::new(Vec::new());

        let mut view_box = None;
        let mut found_root = false;
        let mut depth = 0usize;

        loop {
            let event = reader.read_event().map_err(xml_error)?;

            if !found_root {
                match event {
                    Event::Eof => break,
                    Event::Start(start) => {
                        view_box = root_view_box(&start)?;
                        found_root = true;
                        depth = 1;
                    }
                    Event::Empty(start) => {
                        view_box = root_view_box(&start)?;
                        found_root = true;
                        break;
                    }
                    // prolog
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Eof => break,
                Event::Start(start) => {
                    depth += 1;
                    let start = prefix_ids(&start, id, &local_ids)?;
                    writer.write_event(Event::Start(start)).map_err(xml_error)?;
                }
                Event::Empty(start) => {
                    let start = prefix_ids(&start, id, &local_ids)?;
                    writer.write_event(Event::Empty(start)).map_err(xml_error)?;
                }
                Event::End(end) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    writer.write_event(Event::End(end)).map_err(xml_error)?;
                }
                other => writer.write_event(other).map_err(xml_error)?,
            }
        }

        if !found_root {
            return Err(SvgError::MissingRoot);
        }

        let content = String::from_utf8(writer.into_inner()).map_err(xml_error)?;

        Ok(Self {
            id: id.to_string(),
            view_box,
            content: content.trim().to_string(),
        })
    }
}

/// Every `id` declared in the document.
fn defined_ids(svg: &str) -> Result<HashSet<String>, SvgError> {
    let mut reader = Reader::from_str(svg);
    let mut ids = HashSet::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Eof => break,
            Event::Start(start) | Event::Empty(start) => {
                if let Some(id) = attribute_value(&start, b"id") {
                    ids.insert(id);
                }
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Copy a start tag with local ids and references to them prefixed.
fn prefix_ids(
    start: &BytesStart<'_>,
    prefix: &str,
    local_ids: &HashSet<String>,
) -> Result<BytesStart<'static>, SvgError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);

    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let value = String::from_utf8_lossy(&attr.value);

        let value = if attr.key.as_ref() == b"id" && local_ids.contains(&*value) {
            format!("{prefix}-{value}")
        } else if let Some(target) = value.strip_prefix('#').filter(|t| local_ids.contains(*t)) {
            format!("#{prefix}-{target}")
        } else {
            URL_REFERENCE_RE
                .replace_all(&value, |caps: &Captures<'_>| {
                    if local_ids.contains(&caps[2]) {
                        format!("url({}#{prefix}-{}", &caps[1], &caps[2])
                    } else {
                        caps[0].to_string()
                    }
                })
                .into_owned()
        };

        out.push_attribute((attr.key.as_ref(), value.as_bytes()));
    }

    Ok(out)
}

fn root_view_box(start: &BytesStart<'_>) -> Result<Option<String>, SvgError> {
    if start.local_name().as_ref() != b"svg" {
        return Err(SvgError::MissingRoot);
    }

    if let Some(view_box) = attribute_value(start, b"viewBox") {
        return Ok(Some(view_box));
    }

    let width = attribute_value(start, b"width");
    let height = attribute_value(start, b"height");
    Ok(match (width, height) {
        (Some(w), Some(h)) => Some(format!(
            "0 0 {} {}",
            w.trim().trim_end_matches("px"),
            h.trim().trim_end_matches("px")
        )),
        _ => None,
    })
}

/// Turn a file stem into a valid symbol id.
pub fn symbol_id(stem: &str) -> String {
    let id: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if id.is_empty() {
        "icon".to_string()
    } else {
        id
    }
}

/// Collects icons and renders the combined sprite.
#[derive(Debug, Default)]
pub struct SpriteBuilder {
    symbols: Vec<Symbol>,
}

impl SpriteBuilder {
    /// Create an empty sprite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an icon and add it under `id`.
    pub fn add(&mut self, id: &str, svg: &str) -> Result<(), SvgError> {
        if self.symbols.iter().any(|s| s.id == id) {
            return Err(SvgError::DuplicateId(id.to_string()));
        }
        self.symbols.push(Symbol::parse(id, svg)?);
        Ok(())
    }

    /// Symbols added so far, in insertion order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Render the sprite document.
    pub fn build(&self) -> String {
        let mut out = String::from(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">\n",
        );

        for symbol in &self.symbols {
            out.push_str("<symbol id=\"");
            out.push_str(&symbol.id);
            out.push('"');
            if let Some(view_box) = &symbol.view_box {
                out.push_str(" viewBox=\"");
                out.push_str(view_box);
                out.push('"');
            }
            out.push('>');
            out.push_str(&symbol.content);
            out.push_str("</symbol>\n");
        }

        out.push_str("</svg>\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symbol_content() {
        let symbol = Symbol::parse(
            "arrow",
            r#"<?xml version="1.0"?><svg viewBox="0 0 10 10"><path d="M0 0"/></svg>"#,
        )
        .unwrap();

        assert_eq!(symbol.id, "arrow");
        assert_eq!(symbol.view_box.as_deref(), Some("0 0 10 10"));
        assert_eq!(symbol.content, r#"<path d="M0 0"/>"#);
    }

    #[test]
    fn derives_view_box_from_size() {
        let symbol = Symbol::parse("x", r#"<svg width="16px" height="12"><g/></svg>"#).unwrap();

        assert_eq!(symbol.view_box.as_deref(), Some("0 0 16 12"));
    }

    #[test]
    fn combines_icons_into_distinct_symbols() {
        let mut sprite = SpriteBuilder::new();
        sprite
            .add("arrow", r#"<svg viewBox="0 0 1 1"><path d="M0 0"/></svg>"#)
            .unwrap();
        sprite
            .add("close", r#"<svg viewBox="0 0 2 2"><circle r="1"/></svg>"#)
            .unwrap();

        let out = sprite.build();

        assert_eq!(sprite.len(), 2);
        assert!(out.contains(r#"<symbol id="arrow" viewBox="0 0 1 1"><path d="M0 0"/></symbol>"#));
        assert!(out.contains(r#"<symbol id="close" viewBox="0 0 2 2"><circle r="1"/></symbol>"#));
        assert_eq!(out.matches("<svg").count(), 1);
    }

    #[test]
    fn namespaces_ids_per_symbol() {
        let icon = r##"<svg viewBox="0 0 1 1"><defs><path id="shape" d="M0 0"/><linearGradient id="g"/></defs><use href="#shape" xlink:href="#shape"/><rect mask="url(#g)" clip-path="url(#elsewhere)"/></svg>"##;
        let mut sprite = SpriteBuilder::new();
        sprite.add("a", icon).unwrap();
        sprite.add("b", icon).unwrap();

        let out = sprite.build();

        assert_eq!(out.matches(r#"id="shape""#).count(), 0);
        assert_eq!(out.matches(r#"id="a-shape""#).count(), 1);
        assert_eq!(out.matches(r#"id="b-shape""#).count(), 1);
        assert!(out.contains(r##"<use href="#b-shape" xlink:href="#b-shape"/>"##));
        assert!(out.contains(r##"<rect mask="url(#a-g)" clip-path="url(#elsewhere)"/>"##));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut sprite = SpriteBuilder::new();
        sprite.add("a", "<svg/>").unwrap();

        let result = sprite.add("a", "<svg/>");

        assert!(matches!(result, Err(SvgError::DuplicateId(_))));
    }

    #[test]
    fn rejects_non_svg_root() {
        let result = Symbol::parse("a", "<html></html>");

        assert!(matches!(result, Err(SvgError::MissingRoot)));
    }

    #[test]
    fn sanitizes_ids() {
        assert_eq!(symbol_id("arrow left"), "arrow-left");
        assert_eq!(symbol_id("ok_icon-2"), "ok_icon-2");
        assert_eq!(symbol_id(""), "icon");
    }
}
