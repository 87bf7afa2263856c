use super::*;
use tokio::time::{Duration, timeout};

fn member() -> (Member, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(4);
    (Member { user_id: "u1".into(), tx, lag: Arc::default() }, rx)
}

#[test]
fn room_state_default_is_cold_and_empty() {
    let state = RoomState::default();
    assert!(state.shapes.is_none());
    assert!(state.members.is_empty());
}

#[tokio::test]
async fn lock_room_creates_entry_once() {
    let registry = RoomRegistry::new();
    let room_id = RoomId::from("1");

    let (first, guard) = registry.lock_room(&room_id).await;
    drop(guard);
    let (second, _guard) = registry.lock_room(&room_id).await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn lock_room_serializes_access_to_one_room() {
    let registry = RoomRegistry::new();
    let room_id = RoomId::from("1");
    let (_room, guard) = registry.lock_room(&room_id).await;

    let contender = {
        let registry = registry.clone();
        let room_id = room_id.clone();
        tokio::spawn(async move {
            let (_room, _guard) = registry.lock_room(&room_id).await;
        })
    };
    let finished_early = timeout(Duration::from_millis(50), async {
        while !contender.is_finished() {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(finished_early.is_err(), "second lock should wait for the first");

    drop(guard);
    timeout(Duration::from_millis(500), contender).await.expect("contender should acquire").unwrap();
}

#[tokio::test]
async fn different_rooms_do_not_block_each_other() {
    let registry = RoomRegistry::new();
    let (_a, _guard_a) = registry.lock_room(&"a".into()).await;
    let locked_b = timeout(Duration::from_millis(100), registry.lock_room(&"b".into())).await;
    assert!(locked_b.is_ok());
}

#[tokio::test]
async fn try_evict_requires_no_members_and_no_pending_writes() {
    let registry = RoomRegistry::new();
    let room_id = RoomId::from("1");
    let (room, mut guard) = registry.lock_room(&room_id).await;
    let (m, _rx) = member();
    guard.members.insert(Uuid::new_v4(), m);
    drop(guard);

    assert!(!registry.try_evict(&room_id, &room).await);

    let (_, mut guard) = registry.lock_room(&room_id).await;
    guard.members.clear();
    drop(guard);

    room.begin_write();
    assert!(!registry.try_evict(&room_id, &room).await);
    room.end_write();

    assert!(registry.try_evict(&room_id, &room).await);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn try_evict_skips_locked_room() {
    let registry = RoomRegistry::new();
    let room_id = RoomId::from("1");
    let (room, _guard) = registry.lock_room(&room_id).await;
    assert!(!registry.try_evict(&room_id, &room).await);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn evicted_entry_is_replaced_on_next_lock() {
    let registry = RoomRegistry::new();
    let room_id = RoomId::from("1");
    let (old, guard) = registry.lock_room(&room_id).await;
    drop(guard);
    assert!(registry.try_evict(&room_id, &old).await);

    let (fresh, guard) = registry.lock_room(&room_id).await;
    assert!(!Arc::ptr_eq(&old, &fresh));
    assert!(guard.shapes.is_none());

    // A stale handle never evicts the new entry.
    drop(guard);
    assert!(!registry.try_evict(&room_id, &old).await);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn lag_signal_wakes_waiter_raised_before_or_after_wait() {
    let early = LagSignal::default();
    early.raise();
    timeout(Duration::from_millis(200), early.raised()).await.expect("raised signal should resolve");

    let late = Arc::new(LagSignal::default());
    let waiter = {
        let late = late.clone();
        tokio::spawn(async move { late.raised().await })
    };
    tokio::task::yield_now().await;
    assert!(!late.is_raised());
    late.raise();
    timeout(Duration::from_millis(200), waiter).await.expect("waiter should wake").unwrap();
}
