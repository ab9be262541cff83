//! Presentation attribute stripping.
//!
//! Sprite icons are recolored from CSS, so hard-coded paint attributes are
//! removed from every element.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::xml::{filter_attributes, xml_error};
use crate::SvgError;

/// Attributes removed from sprite icons.
pub const PRESENTATION_ATTRIBUTES: &[&str] = &["fill", "stroke", "style"];

/// Remove the named attributes from every element in the document.
///
/// Everything else, whitespace included, passes through untouched.
pub fn strip_attributes(svg: &str, names: &[&str]) -> Result<String, SvgError> {
    let mut reader = Reader::from_str(svg);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Eof => break,
            Event::Start(start) => {
                let start = filter_attributes(&start, |a| !is_listed(a.key.as_ref(), names))?;
                writer.write_event(Event::Start(start)).map_err(xml_error)?;
            }
            Event::Empty(start) => {
                let start = filter_attributes(&start, |a| !is_listed(a.key.as_ref(), names))?;
                writer.write_event(Event::Empty(start)).map_err(xml_error)?;
            }
            other => writer.write_event(other).map_err(xml_error)?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

fn is_listed(key: &[u8], names: &[&str]) -> bool {
    names.iter().any(|n| key == n.as_bytes())
}

/// Undo `>` escaping left behind by serializers in text and CSS content.
pub fn unescape_gt(svg: &str) -> String {
    svg.replace("&gt;", ">")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_paint_attributes_everywhere() {
        let svg = r#"<svg fill="none"><g stroke="blue"><path fill="red" style="opacity:.5" d="M0 0"/></g></svg>"#;

        let out = strip_attributes(svg, PRESENTATION_ATTRIBUTES).unwrap();

        assert_eq!(out, r#"<svg><g><path d="M0 0"/></g></svg>"#);
    }

    #[test]
    fn preserves_other_attributes_and_whitespace() {
        let svg = "<svg viewBox=\"0 0 1 1\">\n  <circle cx=\"1\" fill-rule=\"evenodd\"/>\n</svg>";

        let out = strip_attributes(svg, PRESENTATION_ATTRIBUTES).unwrap();

        assert_eq!(out, svg);
    }

    #[test]
    fn unescapes_greater_than() {
        let out = unescape_gt("<style>a &gt; b {}</style>");

        assert_eq!(out, "<style>a > b {}</style>");
    }
}
