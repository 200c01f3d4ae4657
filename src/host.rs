//! Registration of the executor factory with the host container.

use std::sync::Arc;

use crate::collection::ServiceCollection;
use crate::config::ExecutorOptions;
use crate::executor::TransientExecutor;
use crate::factory::{ExecutorFactory, ExecutorFactoryAsync, SingletonExecutorFactory};
use crate::lifetime::Lifetime;
use crate::scope_context::{RequestCache, ScopeContextCore};
use crate::traits::Resolver;

impl ServiceCollection {
    /// Registers the executor factory and its facades.
    ///
    /// - `dyn ScopeContextCore` as a [`RequestCache`], unless a scope
    ///   context is already registered;
    /// - [`SingletonExecutorFactory`] as a singleton the root provider
    ///   disposes;
    /// - `dyn ExecutorFactory` and `dyn ExecutorFactoryAsync` as aliases of
    ///   that one instance;
    /// - `dyn TransientExecutor` as a transient returning the current
    ///   handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_scoped::{
    ///     same_instance, ExecutorFactory, ExecutorFactoryAsync, Resolver, ServiceCollection,
    ///     TransientExecutor,
    /// };
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_executor_factory();
    /// let provider = services.build();
    ///
    /// {
    ///     let scope = provider.create_scope();
    ///     let via_async = scope.get_required_trait::<dyn ExecutorFactoryAsync>();
    ///     assert!(!via_async.is_disposed());
    /// }
    ///
    /// let via_sync = provider.get_required_trait::<dyn ExecutorFactory>();
    /// assert!(!via_sync.is_disposed());
    ///
    /// let handler = provider.get_required_trait::<dyn TransientExecutor>();
    /// assert!(same_instance(&handler, &via_sync.current_handler().unwrap()));
    /// ```
    pub fn add_executor_factory(&mut self) -> &mut Self {
        self.add_executor_factory_with_options(ExecutorOptions::default())
    }

    /// Same as [`add_executor_factory`](Self::add_executor_factory), with
    /// every executor built from `options`.
    ///
    /// Invalid options surface as `InvalidArgument` when the factory is
    /// first resolved.
    pub fn add_executor_factory_with_options(&mut self, options: ExecutorOptions) -> &mut Self {
        if !self.contains_trait::<dyn ScopeContextCore>() {
            self.add_scope_context(Arc::new(RequestCache::new()));
        }

        self.add_fallible_disposable_singleton_factory::<SingletonExecutorFactory, _>(move |r| {
            let scope = r.get_trait::<dyn ScopeContextCore>()?;
            SingletonExecutorFactory::with_options(scope, options.clone())
        });
        self.forward::<SingletonExecutorFactory, dyn ExecutorFactory, _>(|factory| {
            factory as Arc<dyn ExecutorFactory>
        });
        self.forward::<SingletonExecutorFactory, dyn ExecutorFactoryAsync, _>(|factory| {
            factory as Arc<dyn ExecutorFactoryAsync>
        });
        self.add_fallible_trait_factory::<dyn TransientExecutor, _>(Lifetime::Transient, |r| {
            r.get::<SingletonExecutorFactory>()?.current_handler()
        })
    }
}
