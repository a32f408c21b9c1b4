//! XML parsing helpers using quick-xml.

use quick_xml::escape::{resolve_html5_entity, resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;

/// Local (prefix-free) name of an element.
pub fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

/// Value of the first attribute whose local name is `name`.
pub fn attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.local_name().as_ref() == name.as_bytes() {
            Some(String::from_utf8_lossy(&attr.value).to_string())
        } else {
            None
        }
    })
}

/// Text content with XML and HTML named entities resolved. Entities that
/// cannot be resolved are kept literally; the rest of the text is still
/// decoded.
pub fn text(e: &BytesText) -> String {
    let raw = String::from_utf8_lossy(e);
    if let Ok(text) = unescape_with(&raw, resolve_entity) {
        return text.into_owned();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest: &str = &raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let end = match tail[1..].find(|c: char| c == '&' || c == ';') {
            Some(i) if tail.as_bytes()[i + 1] == b';' => i + 1,
            _ => {
                out.push('&');
                rest = &tail[1..];
                continue;
            }
        };
        let entity = &tail[..=end];
        match unescape_with(entity, resolve_entity) {
            Ok(decoded) => out.push_str(&decoded),
            Err(_) => out.push_str(entity),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    resolve_predefined_entity(name).or_else(|| resolve_html5_entity(name))
}

/// Find `attr` on the first `tag` element in a document.
pub fn find_attribute(xml: &str, tag: &str, attr: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == tag.as_bytes() {
                    if let Some(value) = attribute(e, attr) {
                        return Some(value);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }
    None
}
