//! Property tests for the update engine and addressing.

use easm_state::{get_at, select, Key, Path, Store, StoreOps, Value};
use proptest::prelude::*;

fn arb_json() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i32>().prop_map(serde_json::Value::from),
        "[a-z]{0,4}".prop_map(serde_json::Value::from),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::Array),
            prop::collection::btree_map("[a-c]", inner, 0..4)
                .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Every address that resolves in `v`, root included.
fn all_paths(v: &Value, prefix: Path, out: &mut Vec<Path>) {
    out.push(prefix.clone());
    if let Some(map) = v.as_mapping() {
        for (k, child) in map {
            let mut p = prefix.clone();
            p.push(k.clone());
            all_paths(child, p, out);
        }
    } else if let Some(seq) = v.as_sequence() {
        for (i, child) in seq.iter().enumerate() {
            let mut p = prefix.clone();
            p.push(i);
            all_paths(child, p, out);
        }
    }
}

fn doc_and_path() -> impl Strategy<Value = (Value, Path)> {
    (arb_json(), any::<prop::sample::Index>()).prop_map(|(json, idx)| {
        let doc = Value::from(json);
        let mut paths = Vec::new();
        all_paths(&doc, Path::root(), &mut paths);
        let path = idx.get(&paths).clone();
        (doc, path)
    })
}

/// Children of `old` other than the one at `skip` are shared with `new`.
fn siblings_shared(old: &Value, new: &Value, skip: &Key) -> bool {
    match (old, new) {
        (Value::Mapping(o), Value::Mapping(n)) => o
            .iter()
            .filter(|(k, _)| **k != skip.to_map_key())
            .all(|(k, ov)| n.get(k).is_some_and(|nv| ov.same(nv))),
        (Value::Sequence(o), Value::Sequence(n)) => o
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip.as_index())
            .all(|(i, ov)| n.get(i).is_some_and(|nv| ov.same(nv))),
        _ => false,
    }
}

proptest! {
    /// Every ancestor of the written address is a fresh node and every
    /// subtree hanging off the path is reused.
    #[test]
    fn prop_update_shares_off_path_subtrees((doc, path) in doc_and_path()) {
        let store = Store::manual(doc.clone());
        // underscores never occur in generated strings
        store.update(path.clone(), "__written__");
        let next = store.snapshot();

        for depth in 0..path.len() {
            let prefix = Path::from(&path.keys()[..depth]);
            let old = get_at(&doc, &prefix).unwrap();
            let new = get_at(&next, &prefix).unwrap();
            prop_assert!(!old.same(new));
            prop_assert!(siblings_shared(old, new, &path.keys()[depth]));
        }
        prop_assert_eq!(get_at(&next, &path), Some(&Value::from("__written__")));
    }

    /// Writing back what is already stored keeps the root and schedules nothing.
    #[test]
    fn prop_rewriting_current_value_is_noop((doc, path) in doc_and_path()) {
        let store = Store::manual(doc);
        let before = store.snapshot();
        let current = store.get(path.clone()).unwrap();

        store.update(path, current);

        prop_assert!(store.snapshot().same(&before));
        prop_assert!(!store.is_flush_pending());
    }

    /// A path built through the selector reads the same value as the literal.
    #[test]
    fn prop_selector_matches_literal((doc, path) in doc_and_path()) {
        let selected = select(|s| path.iter().fold(s, |b, k| b.key(k.clone())));
        prop_assert_eq!(&selected, &path);

        let store = Store::manual(doc);
        let a = store.get(selected).unwrap();
        let b = store.get(path).unwrap();
        prop_assert!(a.same(&b));
    }
}
