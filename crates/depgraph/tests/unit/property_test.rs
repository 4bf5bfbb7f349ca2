//! Unit tests for `PropertyMap` builder pattern, type-safe getters and JSON form.

use depgraph::{GraphError, PropertyMap, PropertyValue};

#[test]
fn test_property_map_builder() {
    let props = PropertyMap::new()
        .with("status", "ACTIVE")
        .with("size", 8)
        .with("archived", false)
        .with("budget", 1250.5);

    assert_eq!(props.get_string("status"), Some("ACTIVE"));
    assert_eq!(props.get_int("size"), Some(8));
    assert_eq!(props.get_bool("archived"), Some(false));
    assert_eq!(props.get_float("budget"), Some(1250.5));
}

#[test]
fn test_property_map_type_safe_getters() {
    let props = PropertyMap::new()
        .with("text", "value")
        .with("number", 123i64);

    // Type-safe getters return None for wrong type
    assert_eq!(props.get_int("text"), None);
    assert_eq!(props.get_string("number"), None);
    assert_eq!(props.get_bool("missing"), None);
}

#[test]
fn test_property_map_insert_merge_remove() {
    let mut props = PropertyMap::new();

    props.insert("location", "Berlin");
    assert!(props.contains_key("location"));
    assert_eq!(props.len(), 1);

    props.merge(PropertyMap::new().with("location", "Remote").with("size", 5));
    assert_eq!(props.get_string("location"), Some("Remote"));
    assert_eq!(props.len(), 2);

    props.remove("location");
    assert!(!props.contains_key("location"));
    assert_eq!(props.len(), 1);
}

#[test]
fn test_properties_from_json() {
    let props = PropertyMap::from_json_str(
        r#"{"status":"ACTIVE","priority":"HIGH","experience_years":7,"score":0.75,
            "tech_stack":["Kotlin","Spring Boot"],"ports":[80,443],"note":null}"#,
    )
    .unwrap();

    assert_eq!(props.get_string("priority"), Some("HIGH"));
    assert_eq!(props.get_int("experience_years"), Some(7));
    assert_eq!(props.get_float("score"), Some(0.75));
    assert_eq!(
        props.get_string_list("tech_stack").map(<[String]>::len),
        Some(2)
    );
    assert_eq!(
        props.get("ports"),
        Some(&PropertyValue::IntList(vec![80, 443]))
    );
    assert_eq!(props.get("note"), Some(&PropertyValue::Null));
}

#[test]
fn test_properties_json_output_is_key_sorted() {
    let props = PropertyMap::new().with("b", 2).with("a", "x");
    assert_eq!(props.to_json_string(), r#"{"a":"x","b":2}"#);
    assert_eq!(PropertyMap::from_json_str(&props.to_json_string()).unwrap(), props);
}

#[test]
fn test_properties_json_rejections() {
    assert!(matches!(
        PropertyMap::from_json_str(r#"{"owner":{"id":"u1"}}"#),
        Err(GraphError::InvalidArgument { .. })
    ));
    assert!(matches!(
        PropertyMap::from_json_str(r#"["not","an","object"]"#),
        Err(GraphError::InvalidArgument { .. })
    ));
    assert!(matches!(
        PropertyMap::from_json_str(r#"{"mixed":["a",1]}"#),
        Err(GraphError::InvalidArgument { .. })
    ));
    assert!(matches!(
        PropertyMap::from_json_str("{not json"),
        Err(GraphError::Serialization { .. })
    ));
}
