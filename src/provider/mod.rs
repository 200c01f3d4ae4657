//! Service provider for the host container.
//!
//! The provider plays the external container's part: it locates values by
//! key and runs the disposal hooks it believes it owns. Everything the
//! scoped-value core needs from a container goes through [`ResolverCore`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::internal::{with_resolution_guard, DisposeBag};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, Registration, Registry};
use crate::traits::{Resolver, ResolverCore};

pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::Scope;

/// Root resolver built by [`ServiceCollection::build`](crate::ServiceCollection::build).
///
/// Singletons are cached in their registration and shared by every scope.
/// Disposal hooks registered while constructing singletons, or while
/// resolving transients from the root, belong to the provider and run LIFO
/// on [`dispose_all`](Self::dispose_all) or when the last handle drops.
///
/// The provider is cheap to clone; clones share all state.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Database { url: "postgres://localhost".to_string() });
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     UserService { db: resolver.get_required::<Database>() }
/// });
///
/// let provider = collection.build();
/// let user_service = provider.get_required::<UserService>();
/// assert_eq!(user_service.db.url, "postgres://localhost");
/// ```
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

pub(crate) struct ProviderInner {
    pub(crate) registry: Registry,
    pub(crate) root_disposers: Mutex<DisposeBag>,
}

impl ServiceProvider {
    pub(crate) fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                registry,
                root_disposers: Mutex::new(DisposeBag::default()),
            }),
        }
    }

    #[inline]
    pub(crate) fn inner(&self) -> &ProviderInner {
        &self.inner
    }

    /// Creates a scope for resolving scoped services.
    ///
    /// Each scope caches its own scoped instances and owns the disposal hooks
    /// registered while resolving inside it.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_scoped::{ServiceCollection, Resolver};
    /// use std::sync::Arc;
    ///
    /// struct RequestId(u32);
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_scoped_factory::<RequestId, _>(|_| RequestId(1));
    ///
    /// let provider = collection.build();
    /// let scope1 = provider.create_scope();
    /// let scope2 = provider.create_scope();
    ///
    /// let a = scope1.get_required::<RequestId>();
    /// assert!(Arc::ptr_eq(&a, &scope1.get_required::<RequestId>()));
    /// assert!(!Arc::ptr_eq(&a, &scope2.get_required::<RequestId>()));
    /// ```
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    /// Runs every root disposal hook in LIFO order.
    ///
    /// Hooks registered afterwards run on the next call or on drop.
    pub fn dispose_all(&self) {
        let bag = self.inner().root_disposers.lock().take();
        let ran = bag.run_all_reverse();
        tracing::debug!(hooks = ran, "root provider disposed");
    }

    /// Number of root disposal hooks waiting to run.
    pub fn pending_disposers(&self) -> usize {
        self.inner().root_disposers.lock().len()
    }

    /// Number of live provider handles, scopes included.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Lists every registration with its lifetime; aliases show their target.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Service Provider Debug ===\n");
        for (key, reg) in self.inner().registry.iter() {
            match reg.forward_target() {
                Some(target) => s.push_str(&format!(
                    "  {} -> {} ({:?})\n",
                    key.display_name(),
                    target.display_name(),
                    reg.lifetime
                )),
                None => s.push_str(&format!("  {}: {:?}\n", key.display_name(), reg.lifetime)),
            }
        }
        s
    }

    /// Resolves a singleton through its registration cache.
    pub(crate) fn resolve_singleton(&self, reg: &Registration) -> DiResult<AnyArc> {
        let cell = reg
            .single_runtime
            .as_ref()
            .ok_or(DiError::WrongLifetime("singleton registration has no cache"))?;

        if let Some(value) = cell.get() {
            return Ok(value.clone());
        }

        // Re-entrant initialization of the same cell is rejected earlier by
        // the resolution guard, so blocking here cannot self-deadlock.
        cell.get_or_try_init(|| {
            let ctx = ResolverContext::new(self);
            (reg.ctor)(&ctx)
        })
        .cloned()
    }

    fn resolve_any_impl(&self, key: &Key) -> DiResult<AnyArc> {
        let reg = self
            .inner()
            .registry
            .get(key)
            .ok_or(DiError::NotFound(key.display_name()))?;

        match reg.lifetime {
            Lifetime::Singleton => self.resolve_singleton(reg),
            Lifetime::Scoped => {
                Err(DiError::WrongLifetime("Cannot resolve scoped service from root provider"))
            }
            Lifetime::Transient => {
                let ctx = ResolverContext::new(self);
                (reg.ctor)(&ctx)
            }
        }
    }
}

impl Clone for ServiceProvider {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for ProviderInner {
    fn drop(&mut self) {
        let ran = self.root_disposers.get_mut().take().run_all_reverse();
        if ran > 0 {
            tracing::debug!(hooks = ran, "root provider dropped; ran pending disposers");
        }
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        with_resolution_guard(key.display_name(), || self.resolve_any_impl(key))
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.inner().root_disposers.lock().push(f);
    }
}

impl Resolver for ServiceProvider {}
