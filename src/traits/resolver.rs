//! Resolver traits for the host container.

use std::any::{type_name, TypeId};
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::registration::AnyArc;
use crate::traits::Dispose;

/// Object-safe resolution core shared by `ServiceProvider`, `Scope` and
/// `ResolverContext`.
///
/// These are the only two operations a cached value ever needs from its
/// host: locate a value for a key, and hand over a disposal hook the host
/// will run when it believes the owning scope has ended.
pub trait ResolverCore: Send + Sync {
    /// Resolves a single registration.
    ///
    /// Enforces lifetime rules and reports circular forwards.
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc>;

    /// Registers a synchronous disposal hook with the resolving scope.
    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>);
}

/// Typed resolution API built on [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use ferrous_scoped::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".to_string() }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(42usize);
/// services.add_singleton_trait(Arc::new(English) as Arc<dyn Greeter>);
///
/// let provider = services.build();
/// assert_eq!(*provider.get_required::<usize>(), 42);
/// assert_eq!(provider.get_required_trait::<dyn Greeter>().greet(), "hello");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a concrete service type.
    fn get<T: 'static + Send + Sync>(&self) -> DiResult<Arc<T>> {
        let key = Key::Type(TypeId::of::<T>(), type_name::<T>());
        let any = self.resolve_any(&key)?;
        any.downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(type_name::<T>()))
    }

    /// Resolves a trait registration.
    ///
    /// Trait objects are stored as `Arc<Arc<dyn Trait>>` and unwrapped here.
    fn get_trait<T: ?Sized + 'static + Send + Sync>(&self) -> DiResult<Arc<T>>
    where
        Arc<T>: 'static,
    {
        let key = Key::Trait(type_name::<T>());
        let any = self.resolve_any(&key)?;
        any.downcast::<Arc<T>>()
            .map(|boxed| (*boxed).clone())
            .map_err(|_| DiError::TypeMismatch(type_name::<T>()))
    }

    /// Resolves a concrete service type, panicking on failure.
    fn get_required<T: 'static + Send + Sync>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {:?}", type_name::<T>(), e))
    }

    /// Resolves a trait registration, panicking on failure.
    fn get_required_trait<T: ?Sized + 'static + Send + Sync>(&self) -> Arc<T>
    where
        Arc<T>: 'static,
    {
        self.get_trait::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve trait {}: {:?}", type_name::<T>(), e))
    }

    /// Hands `service` to the resolving scope for disposal.
    ///
    /// The hook runs when the scope (or, for the root provider, the provider)
    /// is disposed. Registering the same service twice disposes it twice; the
    /// service's own guard decides whether that matters.
    fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.push_sync_disposer(Box::new(move || service.dispose()));
    }
}
