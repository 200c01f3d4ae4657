//! Per-thread slots backing the thread-local storage strategy.
//!
//! Strong references to per-thread values live in an [`Owners`] registry
//! keyed by [`ThreadId`], shared by the owning
//! [`LazyScopedValue`](super::LazyScopedValue). Each thread keeps only a
//! [`ThreadOwner`] guard in its own slot map. The guard drops with the
//! thread's locals and takes the thread's entry out of the registry, so a
//! value read by many short-lived threads holds one entry per live thread.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread::ThreadId;

use parking_lot::Mutex;

use crate::traits::MaybeDispose;
use crate::unique_id::UniqueId;

/// Strong owners of per-thread values; `None` once the value is disposed.
pub(crate) type Owners<T> = Mutex<Option<HashMap<ThreadId, Arc<T>>>>;

/// Disposes `value` if it exposes a release hook.
pub(crate) fn release_value<T: ?Sized + MaybeDispose>(value: &T) -> bool {
    match value.as_dispose() {
        Some(hook) => {
            hook.dispose();
            true
        }
        None => false,
    }
}

/// One thread's claim on a per-thread value.
pub(crate) struct ThreadOwner<T>
where
    T: ?Sized + MaybeDispose + Send + Sync + 'static,
{
    id: UniqueId,
    thread: ThreadId,
    owners: Weak<Owners<T>>,
    value: Weak<T>,
}

impl<T> ThreadOwner<T>
where
    T: ?Sized + MaybeDispose + Send + Sync + 'static,
{
    pub(crate) fn new(id: UniqueId, thread: ThreadId, owners: &Arc<Owners<T>>, value: &Arc<T>) -> Self {
        Self {
            id,
            thread,
            owners: Arc::downgrade(owners),
            value: Arc::downgrade(value),
        }
    }
}

impl<T> Drop for ThreadOwner<T>
where
    T: ?Sized + MaybeDispose + Send + Sync + 'static,
{
    fn drop(&mut self) {
        let Some(owners) = self.owners.upgrade() else {
            return;
        };
        let removed = owners.lock().as_mut().and_then(|map| map.remove(&self.thread));
        if let Some(value) = removed {
            let released = release_value(&*value);
            tracing::trace!(
                value_id = %self.id,
                payload = type_name::<T>(),
                released,
                "per-thread value released at thread exit"
            );
        }
    }
}

trait Slot {
    fn is_dead(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T> Slot for ThreadOwner<T>
where
    T: ?Sized + MaybeDispose + Send + Sync + 'static,
{
    fn is_dead(&self) -> bool {
        self.value.strong_count() == 0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

thread_local! {
    static SLOTS: RefCell<HashMap<UniqueId, Box<dyn Slot>>> = RefCell::new(HashMap::new());
}

/// The calling thread's value for `id`, if it materialized one that is still alive.
///
/// A dead slot found on the way is dropped.
pub(crate) fn lookup<T>(id: UniqueId) -> Option<Arc<T>>
where
    T: ?Sized + MaybeDispose + Send + Sync + 'static,
{
    let (found, dead) = SLOTS
        .try_with(|slots| {
            let mut slots = slots.borrow_mut();
            let found = slots
                .get(&id)
                .and_then(|slot| slot.as_any().downcast_ref::<ThreadOwner<T>>())
                .and_then(|owner| owner.value.upgrade());
            let dead = match &found {
                None if slots.get(&id).is_some_and(|slot| slot.is_dead()) => slots.remove(&id),
                _ => None,
            };
            (found, dead)
        })
        .unwrap_or((None, None));
    // Guards drop outside the borrow; their release hooks may read slots.
    drop(dead);
    found
}

/// Installs `owner` as the calling thread's claim for `id`.
///
/// Slots of disposed values are pruned on the way. Returns `false` when the
/// thread's locals are already being torn down.
pub(crate) fn store<T>(id: UniqueId, owner: ThreadOwner<T>) -> bool
where
    T: ?Sized + MaybeDispose + Send + Sync + 'static,
{
    let dropped = SLOTS.try_with(|slots| {
        let mut slots = slots.borrow_mut();
        let dead: Vec<UniqueId> = slots
            .iter()
            .filter(|(_, slot)| slot.is_dead())
            .map(|(key, _)| *key)
            .collect();
        let mut dropped: Vec<Box<dyn Slot>> =
            dead.iter().filter_map(|key| slots.remove(key)).collect();
        dropped.extend(slots.insert(id, Box::new(owner)));
        dropped
    });
    // Guards drop outside the borrow.
    dropped.is_ok()
}

/// Drops the calling thread's slot for `id`.
pub(crate) fn release(id: UniqueId) {
    let removed = SLOTS
        .try_with(|slots| slots.borrow_mut().remove(&id))
        .ok()
        .flatten();
    drop(removed);
}
