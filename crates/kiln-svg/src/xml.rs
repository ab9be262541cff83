//! Shared quick-xml helpers.

use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesStart;

use crate::SvgError;

pub(crate) fn xml_error(err: impl std::fmt::Display) -> SvgError {
    SvgError::Xml(err.to_string())
}

/// Copy a start tag, keeping only the attributes accepted by `keep`.
///
/// Attribute values are copied raw, so existing escaping is preserved.
pub(crate) fn filter_attributes(
    start: &BytesStart<'_>,
    mut keep: impl FnMut(&Attribute<'_>) -> bool,
) -> Result<BytesStart<'static>, SvgError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);

    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        if keep(&attr) {
            out.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
        }
    }

    Ok(out)
}

/// Raw attribute value as text.
pub(crate) fn attribute_value(start: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    start
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}
