//! Service collection for the host container.
//!
//! This module contains the `ServiceCollection` type: registration of
//! values, factories and aliases, plus the build-time alias checks that make
//! a misconfigured alias visible before the first scope ends.

use std::any::{type_name, TypeId};
use std::sync::Arc;

use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::provider::{ResolverContext, ServiceProvider};
use crate::registration::{AnyArc, Registration, RegistrationKind, Registry};
use crate::scope_context::ScopeContextCore;
use crate::traits::{Dispose, Resolver};

/// Registration surface of the host container.
///
/// Registrations are keyed by concrete type or by trait name; registering a
/// key twice replaces the earlier registration.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::{ServiceCollection, Resolver, Lifetime};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync { fn now(&self) -> u64; }
/// struct Fixed(u64);
/// impl Clock for Fixed { fn now(&self) -> u64 { self.0 } }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Fixed(7));
/// services.forward::<Fixed, dyn Clock, _>(|f| f as Arc<dyn Clock>);
///
/// let provider = services.build();
/// let concrete = provider.get_required::<Fixed>();
/// let alias = provider.get_required_trait::<dyn Clock>();
/// assert_eq!(alias.now(), 7);
/// assert!(ferrous_scoped::same_instance(&concrete, &alias));
/// ```
pub struct ServiceCollection {
    registry: Registry,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    // ----- Concrete Type Registrations -----

    /// Registers an already-built singleton value.
    ///
    /// The container never disposes values registered this way.
    pub fn add_singleton<T: 'static + Send + Sync>(&mut self, value: T) -> &mut Self {
        let arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext| -> DiResult<AnyArc> { Ok(arc.clone()) };
        self.registry.insert(
            Key::Type(TypeId::of::<T>(), type_name::<T>()),
            Registration::new(Lifetime::Singleton, Arc::new(ctor)),
        );
        self
    }

    /// Registers a singleton factory; the value is built on first request.
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, factory)
    }

    /// Registers a singleton whose disposal belongs to the root provider.
    ///
    /// The value's [`Dispose`] hook runs once, when the provider is disposed
    /// or its last handle drops.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_scoped::{Dispose, ServiceCollection, Resolver};
    /// use std::sync::atomic::{AtomicBool, Ordering};
    ///
    /// #[derive(Default)]
    /// struct Pool { closed: AtomicBool }
    /// impl Dispose for Pool {
    ///     fn dispose(&self) { self.closed.store(true, Ordering::SeqCst); }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_disposable_singleton_factory::<Pool, _>(|_| Pool::default());
    ///
    /// let provider = services.build();
    /// let pool = provider.get_required::<Pool>();
    /// {
    ///     let scope = provider.create_scope();
    ///     let _ = scope.get_required::<Pool>();
    /// }
    /// assert!(!pool.closed.load(Ordering::SeqCst));
    ///
    /// provider.dispose_all();
    /// assert!(pool.closed.load(Ordering::SeqCst));
    /// ```
    pub fn add_disposable_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Dispose,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_fallible_disposable_singleton_factory::<T, _>(move |r| Ok(factory(r)))
    }

    /// Fallible form of
    /// [`add_disposable_singleton_factory`](Self::add_disposable_singleton_factory).
    ///
    /// A failed construction caches nothing and registers no disposer; the
    /// next resolution tries again.
    pub fn add_fallible_disposable_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Dispose,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> {
            let value = Arc::new(factory(r)?);
            r.register_disposer(value.clone());
            let any: AnyArc = value;
            Ok(any)
        };
        self.registry.insert(
            Key::Type(TypeId::of::<T>(), type_name::<T>()),
            Registration::new(Lifetime::Singleton, Arc::new(ctor)).disposable(),
        );
        self
    }

    /// Registers a scoped factory: one instance per scope.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, factory)
    }

    /// Registers a transient factory: a new instance per resolution.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, factory)
    }

    fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r))) };
        self.registry.insert(
            Key::Type(TypeId::of::<T>(), type_name::<T>()),
            Registration::new(lifetime, Arc::new(ctor)),
        );
        self
    }

    // ----- Trait Registrations -----

    /// Registers an already-built trait object as a singleton.
    pub fn add_singleton_trait<T>(&mut self, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + 'static + Send + Sync,
    {
        // Trait objects are stored as Arc<Arc<dyn Trait>> behind Any.
        let any_arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext| -> DiResult<AnyArc> { Ok(any_arc.clone()) };
        self.registry.insert(
            Key::Trait(type_name::<T>()),
            Registration::new(Lifetime::Singleton, Arc::new(ctor)),
        );
        self
    }

    /// Registers a trait factory with the given lifetime.
    pub fn add_trait_factory<Trait, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_fallible_trait_factory::<Trait, _>(lifetime, move |r| Ok(factory(r)))
    }

    /// Registers a trait factory whose construction can fail.
    ///
    /// Errors propagate to the resolving call unchanged, and nothing is
    /// cached for a failed singleton.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_scoped::{DiError, Lifetime, Resolver, ServiceCollection};
    /// use std::sync::Arc;
    ///
    /// trait Port: Send + Sync { fn number(&self) -> u16; }
    /// struct Fixed(u16);
    /// impl Port for Fixed { fn number(&self) -> u16 { self.0 } }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_fallible_trait_factory::<dyn Port, _>(Lifetime::Transient, |_| {
    ///     Err(DiError::InvalidArgument("port not configured".into()))
    /// });
    ///
    /// let provider = services.build();
    /// assert!(matches!(provider.get_trait::<dyn Port>(), Err(DiError::InvalidArgument(_))));
    /// ```
    pub fn add_fallible_trait_factory<Trait, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> {
            let value = factory(r)?;
            Ok(Arc::new(value))
        };
        self.registry.insert(
            Key::Trait(type_name::<Trait>()),
            Registration::new(lifetime, Arc::new(ctor)),
        );
        self
    }

    /// Registers the ambient scope context every scoped value consults.
    pub fn add_scope_context(&mut self, context: Arc<dyn ScopeContextCore>) -> &mut Self {
        self.add_singleton_trait::<dyn ScopeContextCore>(context)
    }

    // ----- Aliases -----

    /// Registers `I` as an alias of the registered service `S`.
    ///
    /// The alias resolves `S` through its own registration and converts the
    /// handle. It never builds a second instance and never claims disposal
    /// of `S`, so however short-lived the resolving scope is, the target
    /// keeps the lifetime it was registered with.
    pub fn forward<S, I, F>(&mut self, convert: F) -> &mut Self
    where
        S: 'static + Send + Sync,
        I: ?Sized + 'static + Send + Sync,
        F: Fn(Arc<S>) -> Arc<I> + Send + Sync + 'static,
    {
        self.add_forward::<S, I, _>(false, move |r| Ok(convert(r.get::<S>()?)))
    }

    /// Registers `I` as an alias of `S` that the container tracks as an
    /// owned transient.
    ///
    /// Every resolution hands `S` to the resolving scope for disposal. When
    /// `S` is a singleton, the first scope that resolves the alias disposes
    /// the shared instance on exit. [`validate_aliases`](Self::validate_aliases)
    /// reports this combination, and [`build`](Self::build) logs it.
    pub fn add_transient_forward<S, I, F>(&mut self, convert: F) -> &mut Self
    where
        S: Dispose,
        I: ?Sized + 'static + Send + Sync,
        F: Fn(Arc<S>) -> Arc<I> + Send + Sync + 'static,
    {
        self.add_forward::<S, I, _>(true, move |r| {
            let target = r.get::<S>()?;
            r.register_disposer(target.clone());
            Ok(convert(target))
        })
    }

    fn add_forward<S, I, F>(&mut self, tracks_disposal: bool, resolve: F) -> &mut Self
    where
        S: 'static + Send + Sync,
        I: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext) -> DiResult<Arc<I>> + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> {
            let alias = resolve(r)?;
            Ok(Arc::new(alias))
        };
        let target = Key::Type(TypeId::of::<S>(), type_name::<S>());
        self.registry.insert(
            Key::Trait(type_name::<I>()),
            Registration::forward(target, tracks_disposal, Arc::new(ctor)),
        );
        self
    }

    // ----- Introspection -----

    /// Checks whether a concrete type is registered.
    pub fn contains<T: 'static>(&self) -> bool {
        self.registry
            .contains_key(&Key::Type(TypeId::of::<T>(), type_name::<T>()))
    }

    /// Checks whether a trait is registered.
    pub fn contains_trait<T: ?Sized + 'static>(&self) -> bool {
        self.registry.contains_key(&Key::Trait(type_name::<T>()))
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    /// Describes every registration, in registration order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_scoped::{Lifetime, ServiceCollection};
    /// use std::sync::Arc;
    ///
    /// trait Named: Send + Sync {}
    /// struct Service;
    /// impl Named for Service {}
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Service);
    /// services.forward::<Service, dyn Named, _>(|s| s as Arc<dyn Named>);
    ///
    /// let descriptors = services.descriptors();
    /// assert_eq!(descriptors.len(), 2);
    /// assert_eq!(descriptors[0].lifetime, Lifetime::Singleton);
    /// assert!(descriptors[1].is_forward());
    /// assert!(!descriptors[1].tracks_disposal);
    /// ```
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.registry
            .iter()
            .map(|(key, reg)| {
                let (forward_of, tracks_disposal) = match &reg.kind {
                    RegistrationKind::Forward {
                        target,
                        tracks_disposal,
                    } => (Some(target.clone()), *tracks_disposal),
                    RegistrationKind::Factory => (None, false),
                };
                ServiceDescriptor {
                    key: key.clone(),
                    lifetime: reg.lifetime,
                    forward_of,
                    tracks_disposal,
                    disposable: reg.disposable,
                }
            })
            .collect()
    }

    /// Checks every alias against the registration it forwards to.
    ///
    /// Returns the first finding:
    /// - `NotFound` when an alias targets a key nothing registers;
    /// - `AliasDivergence` when an alias tracks disposal of a singleton, so
    ///   that a scope ending would dispose an instance other aliases still
    ///   hold.
    pub fn validate_aliases(&self) -> DiResult<()> {
        match self.alias_findings().into_iter().next() {
            Some(finding) => Err(finding),
            None => Ok(()),
        }
    }

    fn alias_findings(&self) -> Vec<DiError> {
        let mut findings = Vec::new();
        for descriptor in self.descriptors() {
            let Some(target) = &descriptor.forward_of else {
                continue;
            };

            let Some(resolved) = self.final_target(target) else {
                findings.push(DiError::NotFound(target.display_name()));
                continue;
            };

            if descriptor.misclassifies(resolved.lifetime) {
                findings.push(DiError::AliasDivergence(format!(
                    "{} is registered as a transient alias of singleton {}; \
                     the first scope that resolves it disposes the shared instance",
                    descriptor.type_name(),
                    target.display_name()
                )));
            }
        }
        findings
    }

    /// Follows forward chains to the registration that builds the value.
    fn final_target(&self, key: &Key) -> Option<&Registration> {
        let mut current = self.registry.get(key)?;
        // A chain longer than the registry is a cycle; resolution reports it.
        for _ in 0..self.registry.len() {
            match current.forward_target() {
                Some(next) => current = self.registry.get(next)?,
                None => return Some(current),
            }
        }
        None
    }

    /// Builds the root provider.
    ///
    /// Alias findings do not fail the build; each one is logged at `warn`.
    /// Call [`validate_aliases`](Self::validate_aliases) first to treat them
    /// as errors.
    pub fn build(self) -> ServiceProvider {
        for finding in self.alias_findings() {
            tracing::warn!(error = %finding, "alias validation finding");
        }
        tracing::debug!(registrations = self.registry.len(), "service provider built");
        ServiceProvider::new(self.registry)
    }
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}
