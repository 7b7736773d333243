//! JSON to XML conversion and back
//!
//! Objects become nested elements, arrays repeat their element name and
//! `null` becomes an empty element. Reading XML reverses this: repeated
//! sibling names become arrays, empty elements become `null`, and text that
//! reads as a canonical JSON number or boolean is typed accordingly.
//! Attributes and mixed content are ignored.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use sxd_document::dom::{ChildOfElement, ChildOfRoot, Element};
use sxd_document::parser;

pub(crate) const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

/// Serialize a JSON value as an XML document with the given root element
pub fn json_to_xml(value: &Value, root_tag: &str) -> String {
    let mut out = String::from(XML_DECLARATION);
    write_root(value, root_tag, &mut out);
    out
}

/// Write `value` as a single element named `root_tag`, without declaration
pub(crate) fn write_root(value: &Value, root_tag: &str, out: &mut String) {
    let tag = element_name(root_tag);
    match value {
        Value::Array(items) => {
            out.push_str(&format!("<{}>", tag));
            for item in items {
                write_element("item", item, out);
            }
            out.push_str(&format!("</{}>", tag));
        }
        other => write_element(&tag, other, out),
    }
}

fn write_element(name: &str, value: &Value, out: &mut String) {
    let tag = element_name(name);
    match value {
        Value::Null => out.push_str(&format!("<{}/>", tag)),
        Value::Array(items) => {
            for item in items {
                write_element(&tag, item, out);
            }
        }
        Value::Object(map) => {
            out.push_str(&format!("<{}>", tag));
            for (key, child) in map {
                write_element(key, child, out);
            }
            out.push_str(&format!("</{}>", tag));
        }
        Value::String(s) => out.push_str(&format!("<{}>{}</{}>", tag, escape(s), tag)),
        scalar => out.push_str(&format!("<{}>{}</{}>", tag, scalar, tag)),
    }
}

/// Escape character data
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Make a JSON key usable as an element name
///
/// Characters outside `[A-Za-z0-9_.-]` become `_`; names that do not start
/// with a letter or underscore get a leading `_`.
pub fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

/// Parse an XML document into JSON, unwrapping the root element
///
/// A document that cannot be parsed falls back to its text content with the
/// tags stripped.
///
/// XML carries no type information, so `xml_to_json(json_to_xml(x))` gives
/// back `x` only when `x` avoids these shapes:
///
/// - a one-element array reads back as its element (`{"drivers": ["Ann"]}`
///   becomes `{"drivers": "Ann"}`)
/// - an empty array disappears, and an empty object, empty string or `null`
///   reads back as `null`
/// - a string that reads as a canonical number or boolean comes back typed
///   (`{"premium": "1200"}` becomes `{"premium": 1200}`)
pub fn xml_to_json(xml: &str) -> Value {
    match parse_root(xml, |root| Some(element_to_json(root))) {
        Ok(Some(value)) => value,
        Ok(None) => Value::Null,
        Err(message) => {
            log::warn!("XML parse failed ({}), falling back to stripped text", message);
            strip_tags(xml)
        }
    }
}

/// Parse `xml` and hand its root element to `f`
pub(crate) fn parse_root<T>(xml: &str, f: impl FnOnce(Element<'_>) -> Option<T>) -> Result<Option<T>, String> {
    let package = parser::parse(xml).map_err(|e| format!("{:?}", e))?;
    let document = package.as_document();
    let root = document.root().children().into_iter().find_map(|child| match child {
        ChildOfRoot::Element(element) => Some(element),
        _ => None,
    });
    Ok(root.and_then(f))
}

/// Convert one element's content to JSON
pub(crate) fn element_to_json(element: Element<'_>) -> Value {
    let mut children: Vec<(String, Value)> = Vec::new();
    let mut text = String::new();

    for child in element.children() {
        match child {
            ChildOfElement::Element(e) => children.push((e.name().local_part().to_string(), element_to_json(e))),
            ChildOfElement::Text(t) => text.push_str(t.text()),
            _ => {}
        }
    }

    if children.is_empty() {
        return scalar_from_text(text.trim());
    }

    // Child values are never arrays, so an array here came from repeated siblings.
    let mut map = Map::new();
    for (name, value) in children {
        match map.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(name, value);
            }
        }
    }
    Value::Object(map)
}

fn scalar_from_text(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(number @ Value::Number(_)) = serde_json::from_str::<Value>(text) {
        if number.to_string() == text {
            return number;
        }
    }
    Value::String(text.to_string())
}

/// Lossy fallback: drop the tags, keep the text
pub fn strip_tags(xml: &str) -> Value {
    let regex = TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").expect("Valid tag pattern"));
    let stripped = regex.replace_all(xml, " ");
    let text = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    Value::String(unescape(&text))
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_json_to_xml() {
        let xml = json_to_xml(
            &json!({"policy": {"drivers": ["Ann", "Bo"], "id": "Q&1", "note": null, "total": 12.5}}),
            "Request",
        );
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Request><policy><drivers>Ann</drivers>\
             <drivers>Bo</drivers><id>Q&amp;1</id><note/><total>12.5</total></policy></Request>"
        );
    }

    #[test]
    fn test_xml_to_json() {
        let xml = r#"<?xml version="1.0"?>
            <Response>
                <premium>1200.5</premium>
                <bound>true</bound>
                <code>007</code>
                <empty/>
                <items><item>1</item><item>2</item></items>
                <name>A &amp; B</name>
            </Response>"#;
        assert_eq!(
            xml_to_json(xml),
            json!({
                "premium": 1200.5,
                "bound": true,
                "code": "007",
                "empty": null,
                "items": {"item": [1, 2]},
                "name": "A & B"
            })
        );
    }

    #[test]
    fn test_element_names_are_sanitized() {
        assert_eq!(element_name("first name"), "first_name");
        assert_eq!(element_name("1st"), "_1st");
        assert_eq!(element_name("ok-name.v2"), "ok-name.v2");
    }

    #[test]
    fn test_untyped_shapes_do_not_survive_round_trip() {
        let round_trip = |v: Value| xml_to_json(&json_to_xml(&v, "Root"));

        assert_eq!(round_trip(json!({"drivers": ["Ann"]})), json!({"drivers": "Ann"}));
        assert_eq!(round_trip(json!({"premium": "1200"})), json!({"premium": 1200}));
        assert_eq!(round_trip(json!({"meta": {}, "state": "CA"})), json!({"meta": null, "state": "CA"}));
        assert_eq!(round_trip(json!({"note": "", "state": "CA"})), json!({"note": null, "state": "CA"}));
        assert_eq!(
            round_trip(json!({"drivers": ["Ann", "Bob"]})),
            json!({"drivers": ["Ann", "Bob"]})
        );
    }

    #[test]
    fn test_malformed_xml_falls_back_to_text() {
        assert_eq!(xml_to_json("<a><b>hello</b> world"), json!("hello world"));
    }

    #[test]
    fn test_top_level_array() {
        let xml = json_to_xml(&json!([1, 2]), "List");
        assert_eq!(xml_to_json(&xml), json!({"item": [1, 2]}));
    }
}
