//! Property dictionary tests

use scr_domain::value_objects::{Properties, PropertyValue};

#[test]
fn test_typed_accessors() {
    let props = Properties::new()
        .with("service.ranking", 7)
        .with("fipro.language", "en")
        .with("enabled", true);

    assert_eq!(props.get_integer("service.ranking"), Some(7));
    assert_eq!(props.get_str("service.ranking"), None);
    assert_eq!(props.get_str("fipro.language"), Some("en"));
    assert_eq!(props.get("enabled").and_then(PropertyValue::as_bool), Some(true));
    assert_eq!(props.len(), 3);
}

#[test]
fn test_iteration_is_key_ordered() {
    let props = Properties::new().with("b", 1).with("a", 2).with("c", 3);
    let keys: Vec<&str> = props.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn test_json_shape_is_flat() {
    let props = Properties::new()
        .with("fipro.language", "en")
        .with("service.ranking", 3)
        .with("topics", vec!["a/b", "c/*"]);
    let json = serde_json::to_value(&props).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "fipro.language": "en",
            "service.ranking": 3,
            "topics": ["a/b", "c/*"]
        })
    );

    let back: Properties = serde_json::from_value(json).unwrap();
    assert_eq!(back, props);
}

#[test]
fn test_display_of_values() {
    assert_eq!(PropertyValue::from(vec![1_i64, 2]).to_string(), "[1, 2]");
    assert_eq!(PropertyValue::from("x").to_string(), "x");
    assert_eq!(PropertyValue::from(3).type_name(), "integer");
}
