//! Scoped resolution and scope-end disposal.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{ResolverContext, ServiceProvider};
use crate::error::{DiError, DiResult};
use crate::internal::{with_resolution_guard, DisposeBag};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, Registration};
use crate::traits::{Resolver, ResolverCore};

/// Lifetime scope of the host container.
///
/// - **Singleton** registrations resolve through the root provider.
/// - **Scoped** registrations are cached in this scope.
/// - **Transient** registrations are built on every resolution. Disposal
///   hooks they register belong to this scope.
///
/// When the scope is disposed or dropped, every hook it owns runs in LIFO
/// order. This is where a container that misclassifies a singleton alias as
/// transient ends up disposing the singleton.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::{Dispose, ServiceCollection, Resolver};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Handle { closed: AtomicBool }
/// impl Dispose for Handle {
///     fn dispose(&self) { self.closed.store(true, Ordering::SeqCst); }
/// }
///
/// let provider = ServiceCollection::new().build();
/// let handle = Arc::new(Handle { closed: AtomicBool::new(false) });
/// {
///     let scope = provider.create_scope();
///     scope.register_disposer(handle.clone());
/// }
/// assert!(handle.closed.load(Ordering::SeqCst));
/// ```
pub struct Scope {
    pub(crate) root: ServiceProvider,
    scoped: Mutex<HashMap<Key, AnyArc>>,
    disposers: Mutex<DisposeBag>,
}

impl Scope {
    pub(crate) fn new(root: ServiceProvider) -> Self {
        Self {
            root,
            scoped: Mutex::new(HashMap::new()),
            disposers: Mutex::new(DisposeBag::default()),
        }
    }

    /// The provider this scope was created from.
    pub fn root(&self) -> &ServiceProvider {
        &self.root
    }

    /// Creates a sibling scope with fresh scoped state.
    pub fn create_child(&self) -> Scope {
        Scope::new(self.root.clone())
    }

    /// Runs every hook this scope owns, in LIFO order.
    ///
    /// Safe to call more than once; hooks run at most once.
    pub fn dispose(&self) {
        let bag = self.disposers.lock().take();
        let ran = bag.run_all_reverse();
        if ran > 0 {
            tracing::debug!(hooks = ran, "scope disposed");
        }
    }

    /// Number of disposal hooks this scope will run when it ends.
    pub fn pending_disposers(&self) -> usize {
        self.disposers.lock().len()
    }

    fn resolve_scoped(&self, reg: &Registration, key: &Key) -> DiResult<AnyArc> {
        if let Some(cached) = self.scoped.lock().get(key) {
            return Ok(cached.clone());
        }

        // Built without the lock held so the factory can resolve other services.
        let ctx = ResolverContext::new(self);
        let value = (reg.ctor)(&ctx)?;

        let mut scoped = self.scoped.lock();
        Ok(scoped.entry(key.clone()).or_insert(value).clone())
    }

    fn resolve_any_impl(&self, key: &Key) -> DiResult<AnyArc> {
        let reg = self
            .root
            .inner()
            .registry
            .get(key)
            .ok_or(DiError::NotFound(key.display_name()))?;

        match reg.lifetime {
            Lifetime::Singleton => self.root.resolve_singleton(reg),
            Lifetime::Scoped => self.resolve_scoped(reg, key),
            Lifetime::Transient => {
                let ctx = ResolverContext::new(self);
                (reg.ctor)(&ctx)
            }
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl ResolverCore for Scope {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        with_resolution_guard(key.display_name(), || self.resolve_any_impl(key))
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.disposers.lock().push(f);
    }
}

impl Resolver for Scope {}
