//! Property-based tests for the XML adapter
//!
//! The XML round trip is lossless for trees of scalars, objects and arrays
//! as long as arrays hold at least two elements (a single repeated element
//! reads back as a scalar), objects and strings are non-empty, and strings
//! do not read as numbers or booleans.

use super::{json_to_soap, json_to_xml, soap_to_json, xml_to_json};
use proptest::prelude::*;
use serde_json::Value;

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[A-Za-z&<>][A-Za-z&<> ]{0,12}[A-Za-z&<>]"
            .prop_filter("reads as a boolean", |s| s != "true" && s != "false")
            .prop_map(Value::String),
    ]
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}".prop_filter("reserved prefix", |k| !k.starts_with("xml"))
}

fn object_strategy() -> impl Strategy<Value = Value> {
    let element = leaf_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::btree_map(key_strategy(), inner, 1..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    });

    let field = prop_oneof![
        3 => element.clone(),
        1 => proptest::collection::vec(element, 2..4).prop_map(Value::Array),
    ];

    proptest::collection::btree_map(key_strategy(), field, 1..5)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

proptest! {
    #[test]
    fn prop_xml_round_trip(value in object_strategy()) {
        let xml = json_to_xml(&value, "Root");
        prop_assert_eq!(xml_to_json(&xml), value);
    }

    #[test]
    fn prop_soap_round_trip(value in object_strategy()) {
        let soap = json_to_soap(&value, "Operation");
        let decoded = soap_to_json(&soap);
        prop_assert_eq!(decoded.get("Operation"), Some(&value));
    }

    #[test]
    fn prop_xml_to_json_never_panics(text in ".{0,200}") {
        let _ = xml_to_json(&text);
    }
}
