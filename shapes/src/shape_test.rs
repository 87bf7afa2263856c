#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

// =============================================================
// Wire format
// =============================================================

#[test]
fn rect_serializes_with_type_tag_and_flat_fields() {
    let shape = Shape::rect("r1".into(), 10.0, 10.0, 50.0, 30.0);
    let value = serde_json::to_value(&shape).unwrap();
    assert_eq!(value, json!({"id": "r1", "type": "rect", "x": 10.0, "y": 10.0, "width": 50.0, "height": 30.0}));
}

#[test]
fn pencil_uses_camel_case_field_names() {
    let shape = Shape::pencil("p1".into(), (1.0, 2.0), (3.0, 4.0), "s1".into());
    let value = serde_json::to_value(&shape).unwrap();
    assert_eq!(value["type"], "pencil");
    assert_eq!(value["startX"], 1.0);
    assert_eq!(value["startY"], 2.0);
    assert_eq!(value["endX"], 3.0);
    assert_eq!(value["endY"], 4.0);
    assert_eq!(value["strokeId"], "s1");
}

#[test]
fn circle_decodes_from_integer_coordinates() {
    let shape: Shape =
        serde_json::from_value(json!({"id": "c1", "type": "circle", "x": 5, "y": 6, "width": 7, "height": -8}))
            .unwrap();
    assert_eq!(shape.geometry, Geometry::Circle { x: 5.0, y: 6.0, width: 7.0, height: -8.0 });
}

#[test]
fn unknown_type_fails_to_decode() {
    let result: Result<Shape, _> = serde_json::from_value(json!({"id": "t1", "type": "text", "x": 0, "y": 0}));
    assert!(result.is_err());
}

#[test]
fn missing_geometry_field_fails_to_decode() {
    let result: Result<Shape, _> =
        serde_json::from_value(json!({"id": "r1", "type": "rect", "x": 0, "y": 0, "width": 10}));
    assert!(result.is_err());
}

// =============================================================
// Ids
// =============================================================

#[test]
fn generated_ids_are_distinct_and_non_empty() {
    let a = ShapeId::generate();
    let b = ShapeId::generate();
    assert_ne!(a, b);
    assert!(!a.is_empty());
    assert!(!StrokeId::generate().is_empty());
}

#[test]
fn id_display_matches_inner_string() {
    assert_eq!(ShapeId::from("abc").to_string(), "abc");
    assert_eq!(StrokeId::from(String::from("s9")).as_str(), "s9");
}

// =============================================================
// Validation
// =============================================================

#[test]
fn validate_rejects_empty_id() {
    let shape = Shape::rect("".into(), 0.0, 0.0, 1.0, 1.0);
    assert!(matches!(shape.validate(), Err(ShapeError::EmptyId)));
}

#[test]
fn validate_rejects_empty_stroke_id() {
    let shape = Shape::pencil("p1".into(), (0.0, 0.0), (1.0, 1.0), "".into());
    assert!(matches!(shape.validate(), Err(ShapeError::EmptyStrokeId(_))));
}

#[test]
fn validate_rejects_non_finite_coordinates() {
    let shape = Shape::circle("c1".into(), f64::NAN, 0.0, 1.0, 1.0);
    assert!(matches!(shape.validate(), Err(ShapeError::NonFinite(_))));
}

#[test]
fn stroke_id_only_for_pencil() {
    let pencil = Shape::pencil("p1".into(), (0.0, 0.0), (1.0, 1.0), "s1".into());
    let rect = Shape::rect("r1".into(), 0.0, 0.0, 1.0, 1.0);
    assert_eq!(pencil.stroke_id(), Some(&StrokeId::from("s1")));
    assert_eq!(rect.stroke_id(), None);
}

// =============================================================
// Chat payload
// =============================================================

#[test]
fn encoded_chat_message_wraps_shape() {
    let shape = Shape::rect("r1".into(), 10.0, 10.0, 50.0, 30.0);
    let message = encode_chat_message(&shape).unwrap();
    let value: serde_json::Value = serde_json::from_str(&message).unwrap();
    assert_eq!(value["shape"]["id"], "r1");
    assert_eq!(decode_chat_message(&message).unwrap(), shape);
}

#[test]
fn decode_chat_message_accepts_legacy_stored_text() {
    let stored = r#"{"shape":{"id":"p7","type":"pencil","startX":1,"startY":2,"endX":3,"endY":4,"strokeId":"s1"}}"#;
    let shape = decode_chat_message(stored).unwrap();
    assert_eq!(shape.id, ShapeId::from("p7"));
    assert_eq!(shape.stroke_id(), Some(&StrokeId::from("s1")));
}

#[test]
fn decode_chat_message_rejects_bare_shape_and_garbage() {
    assert!(decode_chat_message(r#"{"id":"r1","type":"rect","x":0,"y":0,"width":1,"height":1}"#).is_err());
    assert!(decode_chat_message("hello world").is_err());
    assert!(decode_chat_message(r#"{"shape":{"id":"","type":"rect","x":0,"y":0,"width":1,"height":1}}"#).is_err());
}
