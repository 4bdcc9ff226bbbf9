//! Shared XML handling for the input adapters.
//!
//! Adapters deserialize with plain tag names, so documents are first
//! rewritten with every element and attribute reduced to its local name and
//! all namespace declarations removed.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use serde::de::DeserializeOwned;

use crate::conversion::types::{ConversionError, SourceFormat};

pub const TCX_ROOT: &str = "TrainingCenterDatabase";
pub const GPX_ROOT: &str = "gpx";

fn xml_error(err: impl std::fmt::Display) -> ConversionError {
    ConversionError::malformed(format!("XML error: {err}"))
}

fn utf8_name(raw: &[u8]) -> Result<String, ConversionError> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| ConversionError::malformed("tag name is not valid UTF-8"))
}

/// Local name of the document's root element.
pub fn root_tag(document: &str) -> Result<String, ConversionError> {
    let mut reader = Reader::from_str(document);
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(element) | Event::Empty(element) => {
                return utf8_name(element.local_name().as_ref());
            }
            Event::Eof => return Err(ConversionError::malformed("document has no root element")),
            _ => {}
        }
    }
}

/// Identify the source format from the root element.
pub fn detect_format(document: &str) -> Result<SourceFormat, ConversionError> {
    let tag = root_tag(document)?;
    match tag.as_str() {
        TCX_ROOT => Ok(SourceFormat::Tcx),
        GPX_ROOT => Ok(SourceFormat::Gpx),
        _ => Err(ConversionError::UnsupportedFormat(tag)),
    }
}

fn local_start(element: &BytesStart<'_>) -> Result<BytesStart<'static>, ConversionError> {
    let mut stripped = BytesStart::new(utf8_name(element.local_name().as_ref())?);

    for attribute in element.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }
        stripped.push_attribute((attribute.key.local_name().as_ref(), attribute.value.as_ref()));
    }

    Ok(stripped)
}

/// Rewrite `document` with namespace prefixes and declarations removed.
pub fn strip_namespaces(document: &str) -> Result<String, ConversionError> {
    let mut reader = Reader::from_str(document);
    let mut writer = Writer::new(Vec::with_capacity(document.len()));

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        let written = match event {
            Event::Start(element) => writer.write_event(Event::Start(local_start(&element)?)),
            Event::Empty(element) => writer.write_event(Event::Empty(local_start(&element)?)),
            Event::End(element) => {
                let name = utf8_name(element.local_name().as_ref())?;
                writer.write_event(Event::End(BytesEnd::new(name)))
            }
            Event::DocType(_) | Event::PI(_) | Event::Comment(_) => continue,
            Event::Eof => break,
            other => writer.write_event(other),
        };
        written.map_err(xml_error)?;
    }

    String::from_utf8(writer.into_inner())
        .map_err(|_| ConversionError::malformed("normalized document is not valid UTF-8"))
}

/// Strip namespaces and deserialize the document into an adapter's schema.
pub fn deserialize<T: DeserializeOwned>(document: &str) -> Result<T, ConversionError> {
    let normalized = strip_namespaces(document)?;
    quick_xml::de::from_str(&normalized).map_err(xml_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_formats_by_local_root_name() {
        let tcx = r#"<?xml version="1.0"?><tcx:TrainingCenterDatabase xmlns:tcx="urn:x"/>"#;
        let gpx = r#"<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1"></gpx>"#;

        assert_eq!(detect_format(tcx).unwrap(), SourceFormat::Tcx);
        assert_eq!(detect_format(gpx).unwrap(), SourceFormat::Gpx);
    }

    #[test]
    fn unknown_root_reports_its_tag() {
        let err = detect_format("<!-- hi --><kml><Document/></kml>").unwrap_err();
        match err {
            ConversionError::UnsupportedFormat(tag) => assert_eq!(tag, "kml"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_document_is_malformed() {
        assert!(matches!(
            detect_format("   ").unwrap_err(),
            ConversionError::MalformedInput(_)
        ));
    }

    #[test]
    fn namespaces_are_removed_from_tags_and_attributes() {
        let doc = r#"<a:root xmlns:a="urn:a" xmlns="urn:default" a:kind="x"><a:child v="1">t &amp; u</a:child><leaf/></a:root>"#;
        let stripped = strip_namespaces(doc).unwrap();

        assert_eq!(
            stripped,
            r#"<root kind="x"><child v="1">t &amp; u</child><leaf/></root>"#
        );
    }
}
