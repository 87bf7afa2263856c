use super::*;
use crate::services::store::MessageStore;
use crate::state::test_helpers::{test_app_state, token_for};
use serde_json::json;

fn query(token: Option<String>) -> Query<TokenQuery> {
    Query(TokenQuery { token })
}

#[tokio::test]
async fn history_returns_room_messages_oldest_first() {
    let (state, store) = test_app_state();
    let room_id = RoomId::from("7");
    store.append_message(&room_id, "alice", "first").await.unwrap();
    store.append_message(&"8".into(), "bob", "elsewhere").await.unwrap();
    store.append_message(&room_id, "bob", "second").await.unwrap();

    let Json(body) = history(State(state), Path("7".into()), query(Some(token_for("carol")))).await.unwrap();

    let messages: Vec<&str> = body.messages.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(messages, ["first", "second"]);
}

#[tokio::test]
async fn history_serializes_camel_case_records() {
    let (state, store) = test_app_state();
    store.append_message(&"7".into(), "alice", "m").await.unwrap();

    let Json(body) = history(State(state), Path("7".into()), query(Some(token_for("alice")))).await.unwrap();

    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value, json!({"messages": [{"id": 1, "roomId": "7", "userId": "alice", "message": "m"}]}));
}

#[tokio::test]
async fn history_of_unknown_room_is_empty() {
    let (state, _store) = test_app_state();
    let Json(body) = history(State(state), Path("nope".into()), query(Some(token_for("a")))).await.unwrap();
    assert!(body.messages.is_empty());
}

#[tokio::test]
async fn history_requires_valid_token() {
    let (state, _store) = test_app_state();
    let missing = history(State(state.clone()), Path("7".into()), query(None)).await.unwrap_err();
    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    let garbage = history(State(state), Path("7".into()), query(Some("x.y.z".into()))).await.unwrap_err();
    assert_eq!(garbage, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn history_rejects_blank_room_id() {
    let (state, _store) = test_app_state();
    let err = history(State(state), Path("  ".into()), query(Some(token_for("a")))).await.unwrap_err();
    assert_eq!(err, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_reports_store_outage_as_unavailable() {
    let (state, store) = test_app_state();
    store.set_unavailable(true);
    let err = history(State(state), Path("7".into()), query(Some(token_for("a")))).await.unwrap_err();
    assert_eq!(err, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn healthz_reports_resident_rooms() {
    let (state, _store) = test_app_state();
    let (_room, guard) = state.rooms.lock_room(&"1".into()).await;
    drop(guard);

    let Json(body) = crate::routes::healthz(State(state)).await;
    assert_eq!(body, json!({"status": "ok", "rooms": 1}));
}
