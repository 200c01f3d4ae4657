//! Process-unique identities for scoped values.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a [`LazyScopedValue`](crate::LazyScopedValue).
///
/// The identity doubles as the lookup key in ambient scope storage, so two
/// live values must never share one. [`UniqueId::new`] hands out ids from a
/// process-wide counter and never returns [`UniqueId::NIL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqueId(u64);

impl UniqueId {
    /// The empty identity. Rejected by every constructor that takes an id.
    pub const NIL: UniqueId = UniqueId(0);

    /// Allocates a fresh identity.
    pub fn new() -> Self {
        UniqueId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a caller-chosen raw id.
    ///
    /// The caller is responsible for uniqueness. Raw ids can collide with
    /// counter-allocated ones.
    pub const fn from_raw(raw: u64) -> Self {
        UniqueId(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    pub const fn is_nil(&self) -> bool {
        self.0 == 0
    }

    /// Fixed-width hex rendering used as the ambient storage key.
    pub fn storage_key(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl Default for UniqueId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
