//! Scope-consistent lazy values.
//!
//! [`LazyScopedValue`] materializes its payload at most once per logical
//! scope. A logical scope is the active ambient scope when one exists,
//! otherwise the calling thread. The storage strategy is picked on every
//! read, because an ambient scope may open or close between two reads of
//! the same value.

mod thread_slots;

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use self::thread_slots::{release_value, Owners, ThreadOwner};

use crate::error::{DiError, DiResult};
use crate::scope_context::{ScopeContext, ScopeContextCore};
use crate::traits::MaybeDispose;
use crate::unique_id::UniqueId;

/// Where a read of a [`LazyScopedValue`] is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStrategy {
    /// Per-thread slot owned end-to-end by the value.
    ThreadLocal,
    /// Entry in the active ambient scope, owned by that scope.
    Ambient,
}

impl StorageStrategy {
    /// Picks the strategy for a read happening right now.
    pub fn select(scope: &dyn ScopeContextCore) -> Self {
        if scope.is_active() {
            StorageStrategy::Ambient
        } else {
            StorageStrategy::ThreadLocal
        }
    }
}

type ValueFactory<T> = Box<dyn Fn() -> Arc<T> + Send + Sync>;

/// Lazily materialized value cached per thread or per ambient scope.
///
/// # Storage
///
/// - With no ambient scope active, each thread gets its own value. The
///   factory runs at most once per thread, and the hot path takes no lock.
///   A thread's value is released when that thread exits.
/// - With an ambient scope active, the value lives in that scope's storage
///   under [`UniqueId::storage_key`]. An entry that is missing, or that does
///   not downcast to `Arc<T>`, is treated as absent and rebuilt.
///
/// # Disposal
///
/// [`dispose`](Self::dispose) runs the release hook of every per-thread
/// value still held by a live thread exactly once and then refuses further reads with
/// [`DiError::UseAfterDispose`]. Values held by ambient scopes are left to
/// those scopes. Dropping the value disposes it.
///
/// # Preconditions
///
/// - Ambient storage is single-threaded per scope instance. No lock is added
///   on top of it.
/// - `dispose` has a single owner. Concurrent calls from several threads are
///   out of contract; the guard only absorbs repeated calls.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::{LazyScopedValue, NoAmbientScope, UniqueId};
/// use std::sync::Arc;
///
/// let value = LazyScopedValue::new(
///     UniqueId::new(),
///     || Arc::new(String::from("handler")),
///     Arc::new(NoAmbientScope),
/// )
/// .unwrap();
///
/// let a = value.value();
/// let b = value.value();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// value.dispose();
/// assert!(value.is_disposed());
/// assert!(value.get().is_err());
/// ```
pub struct LazyScopedValue<T>
where
    T: ?Sized + MaybeDispose + Send + Sync + 'static,
{
    id: UniqueId,
    storage_key: String,
    factory: ValueFactory<T>,
    scope: Arc<dyn ScopeContextCore>,
    owners: Arc<Owners<T>>,
    disposed: AtomicBool,
}

impl<T> LazyScopedValue<T>
where
    T: ?Sized + MaybeDispose + Send + Sync + 'static,
{
    /// Creates a value that is not yet materialized.
    ///
    /// Fails with [`DiError::InvalidArgument`] when `id` is [`UniqueId::NIL`].
    pub fn new<F>(id: UniqueId, factory: F, scope: Arc<dyn ScopeContextCore>) -> DiResult<Self>
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        if id.is_nil() {
            return Err(DiError::InvalidArgument(format!(
                "unique id for LazyScopedValue<{}> must be set",
                type_name::<T>()
            )));
        }

        Ok(Self {
            id,
            storage_key: id.storage_key(),
            factory: Box::new(factory),
            scope,
            owners: Arc::new(Mutex::new(Some(HashMap::new()))),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> UniqueId {
        self.id
    }

    /// Strategy the next read on this thread would use.
    pub fn strategy(&self) -> StorageStrategy {
        StorageStrategy::select(&*self.scope)
    }

    /// Reads the value for the current logical scope, materializing it if needed.
    pub fn get(&self) -> DiResult<Arc<T>> {
        if self.is_disposed() {
            return Err(self.use_after_dispose());
        }

        match self.strategy() {
            StorageStrategy::ThreadLocal => self.thread_value(),
            StorageStrategy::Ambient => Ok(self.ambient_value()),
        }
    }

    /// Reads the value, panicking if it has been disposed.
    pub fn value(&self) -> Arc<T> {
        self.get()
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", type_name::<T>(), e))
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Whether the calling thread already materialized its per-thread value.
    pub fn is_materialized_on_current_thread(&self) -> bool {
        !self.is_disposed() && thread_slots::lookup::<T>(self.id).is_some()
    }

    /// Number of live threads currently holding a per-thread value.
    pub fn thread_materializations(&self) -> usize {
        self.owners.lock().as_ref().map_or(0, HashMap::len)
    }

    /// Releases per-thread storage and disposes what it held.
    ///
    /// A second call is a no-op.
    pub fn dispose(&self) {
        let Some(values) = self.owners.lock().take() else {
            return;
        };

        thread_slots::release(self.id);

        let released = values.values().filter(|value| release_value(&***value)).count();
        let materialized = values.len();
        drop(values);

        self.disposed.store(true, Ordering::Release);
        tracing::debug!(
            value_id = %self.id,
            payload = type_name::<T>(),
            materialized,
            released,
            "scoped value disposed"
        );
    }

    fn thread_value(&self) -> DiResult<Arc<T>> {
        if let Some(value) = thread_slots::lookup::<T>(self.id) {
            return Ok(value);
        }

        let thread = thread::current().id();
        let value = (self.factory)();
        let claimed = {
            let mut owners = self.owners.lock();
            match owners.as_mut() {
                Some(map) => Some(map.entry(thread).or_insert_with(|| value.clone()).clone()),
                None => None,
            }
        };
        let Some(owned) = claimed else {
            // Disposed while the factory ran; the value was never handed out.
            release_value(&*value);
            return Err(self.use_after_dispose());
        };
        if !Arc::ptr_eq(&owned, &value) {
            // The thread already holds a value whose slot is gone; keep it.
            release_value(&*value);
            return Ok(owned);
        }
        if !thread_slots::store(self.id, ThreadOwner::new(self.id, thread, &self.owners, &value)) {
            tracing::debug!(
                value_id = %self.id,
                "thread locals torn down; value held until dispose"
            );
        }

        tracing::trace!(
            value_id = %self.id,
            payload = type_name::<T>(),
            strategy = "thread-local",
            "scoped value materialized"
        );
        Ok(value)
    }

    fn ambient_value(&self) -> Arc<T> {
        let scope: &dyn ScopeContextCore = &*self.scope;
        if let Some(value) = scope.get::<Arc<T>>(&self.storage_key) {
            return value;
        }

        let value = (self.factory)();
        scope.set(&self.storage_key, value.clone());

        tracing::trace!(
            value_id = %self.id,
            payload = type_name::<T>(),
            strategy = "ambient",
            scope_id = ?scope.scope_id(),
            "scoped value materialized"
        );
        value
    }

    fn use_after_dispose(&self) -> DiError {
        tracing::warn!(
            value_id = %self.id,
            payload = type_name::<T>(),
            "read of a disposed scoped value"
        );
        DiError::UseAfterDispose(format!("LazyScopedValue<{}> {}", type_name::<T>(), self.id))
    }
}

impl<T> Drop for LazyScopedValue<T>
where
    T: ?Sized + MaybeDispose + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> fmt::Debug for LazyScopedValue<T>
where
    T: ?Sized + MaybeDispose + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyScopedValue")
            .field("id", &self.id)
            .field("payload", &type_name::<T>())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope_context::{NoAmbientScope, RequestCache};
    use crate::traits::Dispose;
    use std::sync::atomic::AtomicUsize;

    struct Tracked {
        releases: Arc<AtomicUsize>,
    }

    impl Dispose for Tracked {
        fn dispose(&self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl MaybeDispose for Tracked {
        fn as_dispose(&self) -> Option<&dyn Dispose> {
            Some(self)
        }
    }

    fn counting(
        scope: Arc<dyn ScopeContextCore>,
    ) -> (LazyScopedValue<Tracked>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let builds = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let (b, r) = (builds.clone(), releases.clone());
        let value = LazyScopedValue::new(
            UniqueId::new(),
            move || {
                b.fetch_add(1, Ordering::SeqCst);
                Arc::new(Tracked { releases: r.clone() })
            },
            scope,
        )
        .unwrap();
        (value, builds, releases)
    }

    #[test]
    fn nil_id_is_rejected_at_construction() {
        let result = LazyScopedValue::new(UniqueId::NIL, || Arc::new(1u32), Arc::new(NoAmbientScope));
        assert!(matches!(result, Err(DiError::InvalidArgument(_))));
    }

    #[test]
    fn strategy_follows_ambient_activity() {
        let (value, _, _) = counting(Arc::new(RequestCache::new()));
        assert_eq!(value.strategy(), StorageStrategy::ThreadLocal);
        let request = RequestCache::new().begin();
        assert_eq!(value.strategy(), StorageStrategy::Ambient);
        drop(request);
        assert_eq!(value.strategy(), StorageStrategy::ThreadLocal);
    }

    #[test]
    fn dispose_releases_thread_values_once() {
        let (value, builds, releases) = counting(Arc::new(NoAmbientScope));
        let first = value.value();
        assert!(value.is_materialized_on_current_thread());
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        value.dispose();
        value.dispose();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(value.is_disposed());
        assert!(!value.is_materialized_on_current_thread());
        assert!(matches!(value.get(), Err(DiError::UseAfterDispose(_))));
        drop(first);
    }

    #[test]
    fn ambient_values_are_not_released_by_dispose() {
        let cache = RequestCache::new();
        let (value, builds, releases) = counting(Arc::new(cache));
        {
            let _request = cache.begin();
            let _ = value.value();
            value.dispose();
            assert_eq!(releases.load(Ordering::SeqCst), 0);
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(value.thread_materializations(), 0);
    }

    #[test]
    fn drop_disposes() {
        let (value, _, releases) = counting(Arc::new(NoAmbientScope));
        let _ = value.value();
        drop(value);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "Use after dispose")]
    fn value_panics_after_dispose() {
        let (value, _, _) = counting(Arc::new(NoAmbientScope));
        value.dispose();
        let _ = value.value();
    }
}
