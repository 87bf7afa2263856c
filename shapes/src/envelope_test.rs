use serde_json::json;

use super::*;

#[test]
fn join_room_accepts_numeric_room_id() {
    let env = Envelope::from_json(r#"{"type":"join_room","roomId":42}"#).unwrap();
    assert_eq!(env, Envelope::join("42".into()));
}

#[test]
fn join_room_accepts_string_room_id() {
    let env = Envelope::from_json(r#"{"type":"join_room","roomId":"lobby"}"#).unwrap();
    assert_eq!(env.room_id(), Some(&RoomId::from("lobby")));
}

#[test]
fn empty_room_id_is_rejected() {
    assert!(Envelope::from_json(r#"{"type":"join_room","roomId":"  "}"#).is_err());
}

#[test]
fn room_id_serializes_as_string() {
    let value = serde_json::to_value(Envelope::leave("7".into())).unwrap();
    assert_eq!(value, json!({"type": "leave_room", "roomId": "7"}));
}

#[test]
fn chat_wraps_encoded_shape() {
    let shape = Shape::rect("r1".into(), 10.0, 10.0, 50.0, 30.0);
    let env = Envelope::chat("3".into(), &shape).unwrap();
    let value = serde_json::to_value(&env).unwrap();
    assert_eq!(value["type"], "chat");
    assert_eq!(value["roomId"], "3");
    let inner: serde_json::Value = serde_json::from_str(value["message"].as_str().unwrap()).unwrap();
    assert_eq!(inner["shape"]["id"], "r1");
}

#[test]
fn delete_shapes_wire_shape() {
    let text = r#"{"type":"delete_shapes","payload":{"ids":["a","b"]},"roomId":"9"}"#;
    let env = Envelope::from_json(text).unwrap();
    assert_eq!(env, Envelope::delete("9".into(), vec!["a".into(), "b".into()]));
}

#[test]
fn unknown_type_and_garbage_fail() {
    assert!(Envelope::from_json(r#"{"type":"draw","roomId":"1"}"#).is_err());
    assert!(Envelope::from_json("{").is_err());
    assert!(Envelope::from_json(r#"{"type":"chat","roomId":"1"}"#).is_err());
}

#[test]
fn error_from_uses_code_and_display() {
    #[derive(Debug, thiserror::Error)]
    #[error("not a member of room 5")]
    struct NotMember;

    impl ErrorCode for NotMember {
        fn error_code(&self) -> &'static str {
            "E_NOT_MEMBER"
        }
    }

    let env = Envelope::error_from(&NotMember);
    assert_eq!(env, Envelope::Error { code: "E_NOT_MEMBER".into(), message: "not a member of room 5".into() });
    assert_eq!(env.room_id(), None);
}
