//! Ambient scope contexts layered over the default per-thread scope.
//!
//! A [`ScopeContextCore`] tells a [`LazyScopedValue`](crate::LazyScopedValue)
//! whether a scope narrower than the process (typically one inbound request)
//! is active, and lends it key/value storage while it is. When nothing is
//! active the value falls back to per-thread storage, so code running at
//! startup or on background threads still gets a cached value.
//!
//! Ambient storage is never shared across threads. Implementations need no
//! locking, and callers must not hand one request's storage to another thread.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::registration::AnyArc;

/// Object-safe core of an ambient scope context.
///
/// `get_any` may return `None` for a missing key, and it may also hand back
/// an entry that does not downcast to the type the caller expects. Consumers
/// treat both the same way. This is the weakest contract an ambient store
/// can offer, and [`LazyScopedValue`](crate::LazyScopedValue) accepts it.
pub trait ScopeContextCore: Send + Sync {
    /// Whether an ambient scope is active on the calling thread.
    fn is_active(&self) -> bool;

    /// Raw lookup in the active scope's storage.
    fn get_any(&self, key: &str) -> Option<AnyArc>;

    /// Raw store into the active scope's storage.
    fn set_any(&self, key: &str, value: AnyArc);

    /// Identity of the active scope instance, for diagnostics.
    fn scope_id(&self) -> Option<u64> {
        None
    }
}

/// Typed access on top of [`ScopeContextCore`].
///
/// Implemented for every core, trait objects included.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::{RequestCache, ScopeContext, ScopeContextCore};
///
/// let cache = RequestCache::new();
/// assert!(!cache.is_active());
///
/// let request = cache.begin();
/// cache.set("tenant", "acme".to_string());
/// assert_eq!(cache.get::<String>("tenant").as_deref(), Some("acme"));
/// drop(request);
///
/// assert!(cache.get::<String>("tenant").is_none());
/// ```
pub trait ScopeContext: ScopeContextCore {
    /// Typed lookup. Missing and mistyped entries both come back as `None`.
    fn get<T: Any + Send + Sync + Clone>(&self, key: &str) -> Option<T> {
        self.get_any(key)?.downcast_ref::<T>().cloned()
    }

    /// Typed store.
    fn set<T: Any + Send + Sync>(&self, key: &str, value: T) {
        self.set_any(key, Arc::new(value));
    }
}

impl<C: ScopeContextCore + ?Sized> ScopeContext for C {}

/// A context that is never active.
///
/// Every [`LazyScopedValue`](crate::LazyScopedValue) built on it caches per
/// thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAmbientScope;

impl ScopeContextCore for NoAmbientScope {
    fn is_active(&self) -> bool {
        false
    }

    fn get_any(&self, _key: &str) -> Option<AnyArc> {
        None
    }

    fn set_any(&self, key: &str, _value: AnyArc) {
        tracing::warn!(key, "discarding write into an inactive ambient scope");
    }
}

// ===== RequestCache =====

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static REQUEST_FRAMES: RefCell<Vec<RequestFrame>> = const { RefCell::new(Vec::new()) };
}

struct RequestFrame {
    id: u64,
    values: HashMap<String, AnyArc>,
}

/// Thread-confined per-request ambient storage.
///
/// `RequestCache` is a stateless handle: every handle observes the request
/// that is active on the calling thread. [`RequestCache::begin`] opens a
/// request and returns a [`RequestScope`] guard. The cache stays active on
/// that thread until the guard drops, and the request's values are dropped
/// with it. Requests nest, and the innermost one receives reads and writes.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::{RequestCache, ScopeContextCore};
///
/// let cache = RequestCache::new();
/// let outer = cache.begin();
/// let inner = cache.begin();
/// assert_eq!(cache.scope_id(), Some(inner.id()));
/// drop(inner);
/// assert_eq!(cache.scope_id(), Some(outer.id()));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestCache;

impl RequestCache {
    pub fn new() -> Self {
        RequestCache
    }

    /// Opens a request on the calling thread.
    pub fn begin(&self) -> RequestScope {
        let id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        REQUEST_FRAMES.with(|frames| {
            frames.borrow_mut().push(RequestFrame {
                id,
                values: HashMap::new(),
            });
        });
        tracing::trace!(request_id = id, "request scope opened");
        RequestScope {
            id,
            _thread_bound: PhantomData,
        }
    }

    /// Runs `f` inside a fresh request and closes it afterwards.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let _request = self.begin();
        f()
    }

    // Falls back to `R::default()` while thread-local storage is torn down.
    fn with_top<R: Default>(f: impl FnOnce(Option<&mut RequestFrame>) -> R) -> R {
        REQUEST_FRAMES
            .try_with(|frames| f(frames.borrow_mut().last_mut()))
            .unwrap_or_default()
    }
}

impl ScopeContextCore for RequestCache {
    fn is_active(&self) -> bool {
        Self::with_top(|top| top.is_some())
    }

    fn get_any(&self, key: &str) -> Option<AnyArc> {
        Self::with_top(|top| top.and_then(|frame| frame.values.get(key).cloned()))
    }

    fn set_any(&self, key: &str, value: AnyArc) {
        let outcome = REQUEST_FRAMES.try_with(|frames| match frames.borrow_mut().last_mut() {
            Some(frame) => Ok(frame.values.insert(key.to_string(), value)),
            None => Err(value),
        });
        match outcome {
            // Dropped after the frame borrow is released.
            Ok(Ok(previous)) => drop(previous),
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(key, "discarding write outside of any request scope")
            }
        }
    }

    fn scope_id(&self) -> Option<u64> {
        Self::with_top(|top| top.map(|frame| frame.id))
    }
}

/// Guard for an active request opened by [`RequestCache::begin`].
///
/// The guard is bound to the thread that opened it.
pub struct RequestScope {
    id: u64,
    _thread_bound: PhantomData<*const ()>,
}

impl RequestScope {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope").field("id", &self.id).finish()
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        let id = self.id;
        let removed = REQUEST_FRAMES.try_with(|frames| {
            let mut frames = frames.borrow_mut();
            let pos = frames.iter().rposition(|frame| frame.id == id)?;
            if pos + 1 != frames.len() {
                tracing::warn!(request_id = id, "request scope closed out of order");
            }
            Some(frames.remove(pos))
        });
        // Values may run their own drop logic, which can touch the cache again.
        if let Ok(Some(frame)) = removed {
            tracing::trace!(request_id = id, values = frame.values.len(), "request scope closed");
            drop(frame);
        }
    }
}
