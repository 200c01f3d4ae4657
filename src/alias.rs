//! Alias identity checks.
//!
//! Aliases of one singleton must be one object, not several kept in sync.
//! These helpers compare handles by data pointer, which works across
//! different trait-object types of the same value, and turn a mismatch into
//! [`DiError::AliasDivergence`].

use std::any::type_name;
use std::sync::Arc;

use crate::error::{DiError, DiResult};

/// Whether two handles point at the same value.
///
/// Only data pointers are compared, so an `Arc<Concrete>` and an
/// `Arc<dyn Facade>` of one allocation are the same instance.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::same_instance;
/// use std::fmt::Debug;
/// use std::sync::Arc;
///
/// let concrete = Arc::new(5u8);
/// let erased: Arc<dyn Debug + Send + Sync> = concrete.clone();
/// assert!(same_instance(&concrete, &erased));
/// assert!(!same_instance(&concrete, &Arc::new(5u8)));
/// ```
pub fn same_instance<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

/// Fails with `AliasDivergence` unless both handles are the same instance.
pub fn ensure_same_instance<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> DiResult<()> {
    if same_instance(a, b) {
        return Ok(());
    }
    Err(DiError::AliasDivergence(format!(
        "{} and {} resolve to different instances",
        type_name::<A>(),
        type_name::<B>()
    )))
}

/// Fails with `AliasDivergence` when an alias expected to be live reports
/// itself disposed.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::{ensure_live, DiError};
///
/// assert!(ensure_live("dyn ExecutorFactory", false).is_ok());
/// assert!(matches!(
///     ensure_live("dyn ExecutorFactory", true),
///     Err(DiError::AliasDivergence(_))
/// ));
/// ```
pub fn ensure_live(alias: &str, is_disposed: bool) -> DiResult<()> {
    if is_disposed {
        tracing::warn!(alias, "live alias observed a disposed instance");
        return Err(DiError::AliasDivergence(format!(
            "{} is still in scope but its instance was disposed",
            alias
        )));
    }
    Ok(())
}
