//! Service lifetime definitions.

/// How the host container caches, and believes it owns, a registration.
///
/// The lifetime also decides disposal ownership. Hooks registered while a
/// singleton is constructed go to the root provider. Hooks registered while
/// a scoped or transient registration is resolved inside a scope go to that
/// scope, and run when the scope ends. An alias that the container wrongly
/// classifies as transient therefore gets its target disposed with the
/// first scope that resolves it.
///
/// # Examples
///
/// ```rust
/// use ferrous_scoped::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct RequestModel { id: u32 }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Config { url: "postgres://localhost".to_string() });
/// services.add_transient_factory::<RequestModel, _>(|_| RequestModel { id: 7 });
///
/// let provider = services.build();
/// let scope = provider.create_scope();
///
/// // Singleton: same instance across scopes
/// assert!(Arc::ptr_eq(&provider.get_required::<Config>(), &scope.get_required::<Config>()));
///
/// // Transient: new instance every time
/// let a = scope.get_required::<RequestModel>();
/// let b = scope.get_required::<RequestModel>();
/// assert!(!Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Single instance per root provider, cached forever
    Singleton,
    /// Single instance per scope, cached for the scope's lifetime
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}
