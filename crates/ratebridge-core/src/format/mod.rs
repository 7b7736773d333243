//! Wire formats used at external-system boundaries
//!
//! Internally every record is JSON. Systems that speak XML or SOAP get their
//! payload converted on the way out and their reply converted back.
//!
//! # Module Organization
//!
//! - [`xml`] - JSON to XML and back
//! - [`soap`] - SOAP 1.1 envelopes
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

pub mod soap;
pub mod xml;

#[cfg(test)]
mod prop_tests;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub use soap::{is_envelope, json_to_soap, soap_to_json};
pub use xml::{json_to_xml, xml_to_json};

/// Payload format declared by an external system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Json,
    Xml,
    Soap,
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Json => write!(f, "json"),
            WireFormat::Xml => write!(f, "xml"),
            WireFormat::Soap => write!(f, "soap"),
        }
    }
}

impl WireFormat {
    /// `Content-Type` header for outbound bodies
    pub fn content_type(&self) -> &'static str {
        match self {
            WireFormat::Json => "application/json",
            WireFormat::Xml => "application/xml",
            WireFormat::Soap => "text/xml; charset=utf-8",
        }
    }

    /// Guess a format from a response `Content-Type`
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("json") {
            Some(WireFormat::Json)
        } else if ct.contains("soap") {
            Some(WireFormat::Soap)
        } else if ct.contains("xml") {
            Some(WireFormat::Xml)
        } else {
            None
        }
    }

    /// Serialize a payload; `operation` names the XML root or SOAP operation
    pub fn encode(&self, value: &Value, operation: &str) -> Result<String> {
        match self {
            WireFormat::Json => Ok(serde_json::to_string(value)?),
            WireFormat::Xml => Ok(json_to_xml(value, operation)),
            WireFormat::Soap => Ok(json_to_soap(value, operation)),
        }
    }

    /// Deserialize a body in this format; an empty body is `null`
    pub fn decode(&self, body: &str) -> Result<Value> {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        match self {
            WireFormat::Json => serde_json::from_str(body).map_err(|e| Error::Format {
                format: self.to_string(),
                message: e.to_string(),
            }),
            WireFormat::Xml => Ok(xml_to_json(body)),
            WireFormat::Soap => Ok(soap_to_json(body)),
        }
    }
}

/// Decode a response body
///
/// The response `Content-Type` wins over the system's declared format; XML
/// bodies that carry an envelope are read as SOAP.
pub fn decode_response(body: &str, content_type: Option<&str>, declared: WireFormat) -> Result<Value> {
    let format = match content_type.and_then(WireFormat::from_content_type) {
        Some(WireFormat::Xml) | None if is_envelope(body) => WireFormat::Soap,
        Some(format) => format,
        None => declared,
    };
    format.decode(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(WireFormat::from_content_type("application/json; charset=utf-8"), Some(WireFormat::Json));
        assert_eq!(WireFormat::from_content_type("application/soap+xml"), Some(WireFormat::Soap));
        assert_eq!(WireFormat::from_content_type("text/xml"), Some(WireFormat::Xml));
        assert_eq!(WireFormat::from_content_type("text/plain"), None);
    }

    #[test]
    fn test_decode_response_prefers_content_type() {
        let value = decode_response(r#"{"premium": 10}"#, Some("application/json"), WireFormat::Xml).unwrap();
        assert_eq!(value, json!({"premium": 10}));

        let value = decode_response("<r><premium>10</premium></r>", None, WireFormat::Xml).unwrap();
        assert_eq!(value, json!({"premium": 10}));
    }

    #[test]
    fn test_decode_response_detects_envelope() {
        let soap = json_to_soap(&json!({"premium": 10}), "RateResponse");
        let value = decode_response(&soap, Some("text/xml"), WireFormat::Json).unwrap();
        assert_eq!(value, json!({"RateResponse": {"premium": 10}}));
    }

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(decode_response("  ", Some("application/json"), WireFormat::Json).unwrap(), Value::Null);
    }

    #[test]
    fn test_bad_json_is_a_format_error() {
        let err = WireFormat::Json.decode("{nope").unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }
}
