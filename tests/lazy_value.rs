use crossbeam_utils::thread;
use ferrous_scoped::{
    DiError, Dispose, LazyScopedValue, MaybeDispose, NoAmbientScope, StorageStrategy, UniqueId,
};
use proptest::prelude::*;
use serial_test::serial;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

static BUILT: AtomicU32 = AtomicU32::new(0);
static RELEASED: AtomicU32 = AtomicU32::new(0);

struct Connection {
    serial: u32,
}

impl Dispose for Connection {
    fn dispose(&self) {
        RELEASED.fetch_add(1, Ordering::SeqCst);
    }
}

impl MaybeDispose for Connection {
    fn as_dispose(&self) -> Option<&dyn Dispose> {
        Some(self)
    }
}

fn reset_counters() {
    BUILT.store(0, Ordering::SeqCst);
    RELEASED.store(0, Ordering::SeqCst);
}

fn connection_value() -> LazyScopedValue<Connection> {
    LazyScopedValue::new(
        UniqueId::new(),
        || {
            let serial = BUILT.fetch_add(1, Ordering::SeqCst) + 1;
            Arc::new(Connection { serial })
        },
        Arc::new(NoAmbientScope),
    )
    .unwrap()
}

#[test]
#[serial]
fn test_single_materialization_per_thread() {
    reset_counters();
    let value = connection_value();
    assert_eq!(value.strategy(), StorageStrategy::ThreadLocal);
    assert!(!value.is_materialized_on_current_thread());

    let first = value.value();
    for _ in 0..100 {
        assert!(Arc::ptr_eq(&first, &value.value()));
    }

    assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    assert_eq!(first.serial, 1);
    assert!(value.is_materialized_on_current_thread());
    assert_eq!(value.thread_materializations(), 1);
}

#[test]
#[serial]
fn test_each_thread_gets_its_own_value() {
    reset_counters();
    let value = connection_value();
    let main = value.value();

    let serials: Vec<u32> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|_| {
                    let a = value.value();
                    let b = value.value();
                    assert!(Arc::ptr_eq(&a, &b));
                    a.serial
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    let mut distinct = serials.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), 4);
    assert!(!serials.contains(&main.serial));

    assert_eq!(BUILT.load(Ordering::SeqCst), 5);
    // Only the main thread is still alive to hold a value.
    assert_eq!(value.thread_materializations(), 1);
}

#[test]
#[serial]
fn test_exited_threads_release_their_values() {
    reset_counters();
    let value = Arc::new(connection_value());

    let workers: Vec<_> = (0..64)
        .map(|_| {
            let value = value.clone();
            std::thread::spawn(move || {
                let a = value.value();
                assert!(Arc::ptr_eq(&a, &value.value()));
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(BUILT.load(Ordering::SeqCst), 64);
    assert_eq!(RELEASED.load(Ordering::SeqCst), 64);
    assert_eq!(value.thread_materializations(), 0);

    // Nothing is left for dispose to release.
    value.dispose();
    assert_eq!(RELEASED.load(Ordering::SeqCst), 64);
}

#[test]
#[serial]
fn test_thread_exit_and_dispose_each_release_once() {
    reset_counters();
    let value = connection_value();
    let _ = value.value();

    thread::scope(|s| {
        for _ in 0..3 {
            s.spawn(|_| {
                let _ = value.value();
            });
        }
    })
    .unwrap();
    assert_eq!(RELEASED.load(Ordering::SeqCst), 3);

    value.dispose();
    assert_eq!(RELEASED.load(Ordering::SeqCst), 4);

    value.dispose();
    assert_eq!(RELEASED.load(Ordering::SeqCst), 4);
    assert!(value.is_disposed());
    assert!(!value.is_materialized_on_current_thread());
}

#[test]
#[serial]
fn test_dispose_before_any_read_releases_nothing() {
    reset_counters();
    let value = connection_value();
    value.dispose();

    assert!(value.is_disposed());
    assert_eq!(BUILT.load(Ordering::SeqCst), 0);
    assert_eq!(RELEASED.load(Ordering::SeqCst), 0);
}

#[test]
#[serial]
fn test_read_after_dispose_never_rebuilds() {
    reset_counters();
    let value = connection_value();
    let _ = value.value();
    value.dispose();

    assert!(matches!(value.get(), Err(DiError::UseAfterDispose(_))));
    assert_eq!(BUILT.load(Ordering::SeqCst), 1);
}

#[test]
#[should_panic(expected = "Use after dispose")]
fn test_value_after_dispose_panics() {
    let value = LazyScopedValue::new(
        UniqueId::new(),
        || Arc::new(String::from("payload")),
        Arc::new(NoAmbientScope),
    )
    .unwrap();
    value.dispose();
    let _ = value.value();
}

#[test]
#[serial]
fn test_drop_disposes() {
    reset_counters();
    let held = {
        let value = connection_value();
        value.value()
    };

    assert_eq!(RELEASED.load(Ordering::SeqCst), 1);
    // The caller's handle outlives the holder but has been released.
    assert_eq!(held.serial, 1);
}

#[test]
fn test_nil_id_is_rejected_at_construction() {
    let built = Arc::new(AtomicU32::new(0));
    let counter = built.clone();
    let result = LazyScopedValue::new(
        UniqueId::NIL,
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(7u32)
        },
        Arc::new(NoAmbientScope),
    );

    match result {
        Err(DiError::InvalidArgument(msg)) => assert!(msg.contains("u32")),
        other => panic!("expected InvalidArgument, got {:?}", other.map(|_| ())),
    }
    assert_eq!(built.load(Ordering::SeqCst), 0);
}

#[test]
fn test_values_with_distinct_ids_do_not_share_slots() {
    let a = LazyScopedValue::new(UniqueId::new(), || Arc::new(1u64), Arc::new(NoAmbientScope)).unwrap();
    let b = LazyScopedValue::new(UniqueId::new(), || Arc::new(2u64), Arc::new(NoAmbientScope)).unwrap();

    assert_eq!(*a.value(), 1);
    assert_eq!(*b.value(), 2);
    a.dispose();
    assert_eq!(*b.value(), 2);
}

proptest! {
    #[test]
    fn repeated_reads_materialize_once(reads in 1usize..200) {
        let built = Arc::new(AtomicU32::new(0));
        let counter = built.clone();
        let value = LazyScopedValue::new(
            UniqueId::new(),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Arc::new(String::from("payload"))
            },
            Arc::new(NoAmbientScope),
        )
        .unwrap();

        let first = value.value();
        for _ in 1..reads {
            prop_assert!(Arc::ptr_eq(&first, &value.value()));
        }
        prop_assert_eq!(built.load(Ordering::SeqCst), 1);
    }
}
