use super::*;

fn rect(id: &str) -> Shape {
    Shape::rect(id.into(), 0.0, 0.0, 10.0, 10.0)
}

fn seg(id: &str, stroke: &str) -> Shape {
    Shape::pencil(id.into(), (0.0, 0.0), (1.0, 1.0), stroke.into())
}

fn ids(list: &ShapeList) -> Vec<&str> {
    list.iter().map(|s| s.id.as_str()).collect()
}

fn id_vec(raw: &[&str]) -> Vec<ShapeId> {
    raw.iter().map(|s| ShapeId::from(*s)).collect()
}

// =============================================================
// push / remove
// =============================================================

#[test]
fn push_unique_preserves_insertion_order() {
    let mut list = ShapeList::new();
    assert!(list.push_unique(rect("a")));
    assert!(list.push_unique(rect("b")));
    assert!(list.push_unique(rect("c")));
    assert_eq!(ids(&list), ["a", "b", "c"]);
}

#[test]
fn push_unique_ignores_duplicate_id() {
    let mut list = ShapeList::new();
    assert!(list.push_unique(rect("a")));
    assert!(!list.push_unique(Shape::circle("a".into(), 5.0, 5.0, 1.0, 1.0)));
    assert_eq!(list.len(), 1);
    assert!(matches!(list.get(&"a".into()).map(|s| &s.geometry), Some(crate::Geometry::Rect { .. })));
}

#[test]
fn remove_ids_keeps_survivor_order_and_counts_only_present() {
    let mut list: ShapeList = ["a", "b", "c", "d"].into_iter().map(rect).collect();
    let removed = list.remove_ids(&id_vec(&["b", "d", "zz"]));
    assert_eq!(removed, 2);
    assert_eq!(ids(&list), ["a", "c"]);
    assert!(!list.contains(&"b".into()));
}

#[test]
fn removed_id_can_be_added_again() {
    let mut list: ShapeList = ["a"].into_iter().map(rect).collect();
    list.remove_ids(&id_vec(&["a"]));
    assert!(list.push_unique(rect("a")));
}

// =============================================================
// stored messages / history
// =============================================================

#[test]
fn from_messages_skips_undecodable_entries() {
    let good_a = crate::encode_chat_message(&rect("a")).unwrap();
    let good_b = crate::encode_chat_message(&seg("b", "s1")).unwrap();
    let messages = [good_a.as_str(), "not json", r#"{"shape":{"id":"x"}}"#, good_b.as_str()];

    let (list, skipped) = ShapeList::from_messages(messages);
    assert_eq!(ids(&list), ["a", "b"]);
    assert_eq!(skipped, 2);
}

#[test]
fn from_messages_of_nothing_is_empty() {
    let (list, skipped) = ShapeList::from_messages(std::iter::empty());
    assert!(list.is_empty());
    assert_eq!(skipped, 0);
}

#[test]
fn merge_history_puts_history_first_and_keeps_newer_local_shapes() {
    let mut local: ShapeList = ["live", "b"].into_iter().map(rect).collect();
    let history: ShapeList = ["a", "b"].into_iter().map(rect).collect();
    local.merge_history(history);
    assert_eq!(ids(&local), ["a", "b", "live"]);
}

// =============================================================
// stroke expansion
// =============================================================

#[test]
fn expand_strokes_pulls_in_every_segment_of_a_hit_stroke() {
    let list: ShapeList = vec![seg("p1", "s1"), rect("r1"), seg("p2", "s1"), seg("q1", "s2"), seg("p3", "s1")]
        .into_iter()
        .collect();

    let expanded = list.expand_strokes(&id_vec(&["p2"]));
    assert_eq!(expanded, id_vec(&["p1", "p2", "p3"]));
}

#[test]
fn expand_strokes_keeps_plain_shapes_as_is() {
    let list: ShapeList = vec![rect("r1"), seg("p1", "s1"), rect("r2")].into_iter().collect();
    let expanded = list.expand_strokes(&id_vec(&["r2", "r1"]));
    assert_eq!(expanded, id_vec(&["r1", "r2"]));
}

#[test]
fn expand_strokes_appends_unknown_ids_once() {
    let list: ShapeList = vec![rect("r1")].into_iter().collect();
    let expanded = list.expand_strokes(&id_vec(&["ghost", "r1", "ghost"]));
    assert_eq!(expanded, id_vec(&["r1", "ghost"]));
}
