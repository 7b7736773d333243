//! SOAP 1.1 envelopes
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::xml::{element_to_json, parse_root, strip_tags, write_root, XML_DECLARATION};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use sxd_document::dom::{ChildOfElement, Element};

/// SOAP 1.1 envelope namespace
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

static BODY_REGEX: OnceLock<Regex> = OnceLock::new();

/// Wrap `value` in a SOAP 1.1 envelope as the `operation` element of the body
pub fn json_to_soap(value: &Value, operation: &str) -> String {
    let mut out = String::from(XML_DECLARATION);
    out.push_str(&format!(
        r#"<soapenv:Envelope xmlns:soapenv="{}"><soapenv:Header/><soapenv:Body>"#,
        SOAP_ENV_NS
    ));
    write_root(value, operation, &mut out);
    out.push_str("</soapenv:Body></soapenv:Envelope>");
    out
}

/// Extract the body of a SOAP envelope as JSON
///
/// The `Body` element is found by local name, ignoring case and namespace
/// prefix. Each body child becomes a key of the result, so a response
/// `<GetRateResponse><premium>10</premium></GetRateResponse>` yields
/// `{"GetRateResponse": {"premium": 10}}`. Documents without an envelope
/// are read as plain XML.
pub fn soap_to_json(xml: &str) -> Value {
    match parse_root(xml, |root| Some(body_or_root(root))) {
        Ok(Some(value)) => value,
        Ok(None) => Value::Null,
        Err(message) => {
            log::warn!("SOAP parse failed ({}), falling back to body text", message);
            body_text(xml)
        }
    }
}

/// Whether a document looks like a SOAP envelope
pub fn is_envelope(text: &str) -> bool {
    let head: String = text.chars().take(512).collect::<String>().to_ascii_lowercase();
    head.contains(":envelope") || head.contains("<envelope")
}

fn body_or_root(root: Element<'_>) -> Value {
    if !root.name().local_part().eq_ignore_ascii_case("envelope") {
        return element_to_json(root);
    }

    let body = child_elements(root)
        .into_iter()
        .find(|e| e.name().local_part().eq_ignore_ascii_case("body"));
    let Some(body) = body else {
        return Value::Null;
    };

    let mut map = Map::new();
    for child in child_elements(body) {
        let name = child.name().local_part().to_string();
        let value = element_to_json(child);
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
    if map.is_empty() {
        Value::Null
    } else {
        Value::Object(map)
    }
}

fn child_elements(element: Element<'_>) -> Vec<Element<'_>> {
    element
        .children()
        .into_iter()
        .filter_map(|child| match child {
            ChildOfElement::Element(e) => Some(e),
            _ => None,
        })
        .collect()
}

fn body_text(xml: &str) -> Value {
    let regex = BODY_REGEX.get_or_init(|| {
        Regex::new(r"(?is)<(?:[\w-]+:)?body[^>]*>(.*)</(?:[\w-]+:)?body>").expect("Valid body pattern")
    });
    match regex.captures(xml).and_then(|c| c.get(1)) {
        Some(inner) => strip_tags(inner.as_str()),
        None => strip_tags(xml),
    }
}
