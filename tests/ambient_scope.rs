use ferrous_scoped::{
    Dispose, LazyScopedValue, MaybeDispose, RequestCache, ScopeContext, ScopeContextCore,
    StorageStrategy, UniqueId,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct Session {
    released: AtomicU32,
}

impl Dispose for Session {
    fn dispose(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl MaybeDispose for Session {
    fn as_dispose(&self) -> Option<&dyn Dispose> {
        Some(self)
    }
}

fn counted_value(
    id: UniqueId,
    requests: RequestCache,
) -> (LazyScopedValue<Session>, Arc<AtomicU32>) {
    let built = Arc::new(AtomicU32::new(0));
    let counter = built.clone();
    let value = LazyScopedValue::new(
        id,
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Session {
                released: AtomicU32::new(0),
            })
        },
        Arc::new(requests),
    )
    .unwrap();
    (value, built)
}

#[test]
fn test_single_materialization_per_request() {
    let requests = RequestCache::new();
    let (value, built) = counted_value(UniqueId::new(), requests);

    let (first, second) = requests.scope(|| {
        assert_eq!(value.strategy(), StorageStrategy::Ambient);
        let a = value.value();
        for _ in 0..10 {
            assert!(Arc::ptr_eq(&a, &value.value()));
        }
        let first = a.clone();

        let b = requests.scope(|| value.value());
        (first, b)
    });

    // The nested request materialized its own value.
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_second_request_gets_independent_value() {
    let requests = RequestCache::new();
    let (value, built) = counted_value(UniqueId::new(), requests);

    let a = requests.scope(|| value.value());
    let b = requests.scope(|| value.value());

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_strategy_is_selected_per_read() {
    let requests = RequestCache::new();
    let (value, built) = counted_value(UniqueId::new(), requests);

    let thread_value = value.value();
    assert_eq!(value.strategy(), StorageStrategy::ThreadLocal);

    let request = requests.begin();
    assert_eq!(value.strategy(), StorageStrategy::Ambient);
    let request_value = value.value();
    assert!(!Arc::ptr_eq(&thread_value, &request_value));
    drop(request);

    // Back on the thread path, the original per-thread value is still cached.
    assert!(Arc::ptr_eq(&thread_value, &value.value()));
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_mistyped_entry_counts_as_absent() {
    let requests = RequestCache::new();
    let id = UniqueId::new();
    let (value, built) = counted_value(id, requests);

    requests.scope(|| {
        requests.set(&id.storage_key(), String::from("not a session"));
        let session = value.value();

        assert_eq!(built.load(Ordering::SeqCst), 1);
        let stored = requests.get::<Arc<Session>>(&id.storage_key());
        assert!(stored.map_or(false, |s| Arc::ptr_eq(&s, &session)));
    });
}

#[test]
fn test_dispose_leaves_ambient_values_to_the_request() {
    let requests = RequestCache::new();
    let (value, _) = counted_value(UniqueId::new(), requests);

    let thread_session = value.value();
    let request = requests.begin();
    let request_session = value.value();

    value.dispose();
    assert_eq!(thread_session.released.load(Ordering::SeqCst), 1);
    assert_eq!(request_session.released.load(Ordering::SeqCst), 0);
    assert!(requests.scope_id().is_some());

    drop(request);
    assert_eq!(request_session.released.load(Ordering::SeqCst), 0);
}

#[test]
fn test_request_values_are_thread_confined() {
    let requests = RequestCache::new();
    let _request = requests.begin();
    requests.set("user", 42u32);

    let seen = std::thread::spawn(move || (requests.is_active(), requests.get::<u32>("user")))
        .join()
        .unwrap();

    assert_eq!(seen, (false, None));
    assert_eq!(requests.get::<u32>("user"), Some(42));
}

#[test]
fn test_out_of_order_close_keeps_inner_request() {
    let requests = RequestCache::new();
    let outer = requests.begin();
    let inner = requests.begin();
    let inner_id = inner.id();

    drop(outer);
    assert_eq!(requests.scope_id(), Some(inner_id));
    drop(inner);
    assert!(!requests.is_active());
}
