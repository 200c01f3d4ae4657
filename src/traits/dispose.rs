//! Disposal traits for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this for payloads that need structured teardown. The host
/// container runs registered disposal hooks in LIFO order, and
/// [`LazyScopedValue`](crate::LazyScopedValue) runs them for the values it
/// materialized when it is disposed.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::Dispose;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Connection {
///     closed: AtomicBool,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         self.closed.store(true, Ordering::SeqCst);
///     }
/// }
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

/// Optional disposable capability of a cached payload.
///
/// A [`LazyScopedValue`](crate::LazyScopedValue) queries this when it is
/// disposed. Payloads without cleanup keep the default, which returns `None`,
/// and are skipped silently.
///
/// Trait-object payloads pick the capability up through a supertrait bound,
/// so `dyn MyTrait` answers the query through its vtable.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::{Dispose, MaybeDispose};
///
/// struct Plain;
/// impl MaybeDispose for Plain {}
///
/// struct Pooled;
/// impl Dispose for Pooled {
///     fn dispose(&self) {}
/// }
/// impl MaybeDispose for Pooled {
///     fn as_dispose(&self) -> Option<&dyn Dispose> {
///         Some(self)
///     }
/// }
///
/// assert!(Plain.as_dispose().is_none());
/// assert!(Pooled.as_dispose().is_some());
/// ```
pub trait MaybeDispose {
    /// Returns the release hook, if this payload has one.
    fn as_dispose(&self) -> Option<&dyn Dispose> {
        None
    }
}

macro_rules! impl_no_release {
    ($($ty:ty),* $(,)?) => {
        $(impl MaybeDispose for $ty {})*
    };
}

impl_no_release!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, str,
);

impl<T: Send + Sync> MaybeDispose for Vec<T> {}
