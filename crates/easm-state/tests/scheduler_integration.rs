//! Flushes driven by the tokio local task scheduler.
#![cfg(feature = "tokio")]

use easm_state::{path, LocalTaskScheduler, Store, StoreOps, Value};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

async fn next_turns() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test]
async fn test_writes_in_one_turn_flush_once() {
    LocalSet::new()
        .run_until(async {
            let store = Store::with_scheduler(json!({"count": 0}), LocalTaskScheduler);
            let calls = Rc::new(RefCell::new(Vec::new()));
            let sink = calls.clone();
            let _sub = store.add_listener(path!("count"), move |v: Option<&Value>| {
                sink.borrow_mut().push(v.and_then(Value::as_i64));
            });

            for n in 1..=5i64 {
                store.update(path!("count"), n);
            }
            assert!(store.is_flush_pending());
            assert!(calls.borrow().is_empty());

            next_turns().await;
            assert_eq!(*calls.borrow(), vec![Some(5)]);
            assert!(!store.is_flush_pending());

            store.update(path!("count"), 6);
            next_turns().await;
            assert_eq!(*calls.borrow(), vec![Some(5), Some(6)]);
        })
        .await;
}

#[tokio::test]
async fn test_forced_flush_cancels_local_task() {
    LocalSet::new()
        .run_until(async {
            let store = Store::with_scheduler(json!({"items": []}), LocalTaskScheduler);
            let calls = Rc::new(RefCell::new(0usize));
            let sink = calls.clone();
            let sub = store.add_listener(path!("items"), move |_: Option<&Value>| {
                *sink.borrow_mut() += 1;
            });

            store.push(path!("items"), "a");
            let report = sub.remove(true).unwrap();
            assert_eq!(report.notified, 1);
            assert_eq!(*calls.borrow(), 1);

            next_turns().await;
            assert_eq!(*calls.borrow(), 1);
            assert!(!store.is_flush_pending());
        })
        .await;
}

#[tokio::test]
async fn test_dropped_store_leaves_task_harmless() {
    LocalSet::new()
        .run_until(async {
            let store = Store::with_scheduler(json!({"a": 1}), LocalTaskScheduler);
            store.update(path!("a"), 2);
            drop(store);
            next_turns().await;
        })
        .await;
}

#[tokio::test]
async fn test_default_store_flushes_on_its_own() {
    LocalSet::new()
        .run_until(async {
            let store = Store::new(json!({"user": {"name": "Ada"}}));
            let names = store.get_sub_store(path!("user"));
            let calls = Rc::new(RefCell::new(Vec::new()));
            let sink = calls.clone();
            let _sub = names.add_listener(path!("name"), move |v: Option<&Value>| {
                sink.borrow_mut().push(v.and_then(Value::as_str).map(str::to_owned));
            });

            names.update(path!("name"), "Grace");
            next_turns().await;

            assert_eq!(*calls.borrow(), vec![Some("Grace".to_string())]);
            assert_eq!(names.version(), 1);
            assert!(!store.is_flush_pending());
        })
        .await;
}
