//! Aliasing-safe singleton executor factory.
//!
//! [`SingletonExecutorFactory`] is one concrete object reachable through two
//! facades, [`ExecutorFactory`] and [`ExecutorFactoryAsync`]. All reads go
//! through a single internally owned [`LazyScopedValue`], so every facade of
//! one factory instance observes the same handler and the same disposed
//! state. Two facades can only disagree when the container hands out two
//! factory instances, or disposes the one it shares.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ExecutorOptions;
use crate::error::DiResult;
use crate::executor::{ExecutorConcrete, TransientExecutor};
use crate::scope_context::ScopeContextCore;
use crate::scoped_value::LazyScopedValue;
use crate::traits::Dispose;
use crate::unique_id::UniqueId;

/// Synchronous facade of the executor factory.
pub trait ExecutorFactory: Send + Sync {
    /// The cached executor for the current logical scope.
    ///
    /// Fails with `UseAfterDispose` once the factory is disposed.
    fn current_handler(&self) -> DiResult<Arc<dyn TransientExecutor>>;

    /// Builds a fresh executor from the factory's options. Never cached.
    fn create_default_handler(&self) -> Arc<dyn TransientExecutor>;

    fn is_disposed(&self) -> bool;
}

/// Asynchronous facade of the executor factory.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::{
///     ExecutorFactoryAsync, NoAmbientScope, SingletonExecutorFactory, TransientExecutor,
/// };
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let factory = SingletonExecutorFactory::new(Arc::new(NoAmbientScope)).unwrap();
/// let facade: &dyn ExecutorFactoryAsync = &factory;
/// let handler = facade.current_handler_async().await.unwrap();
/// assert_eq!(handler.options().name, "default");
/// # }
/// ```
#[async_trait]
pub trait ExecutorFactoryAsync: Send + Sync {
    /// The cached executor for the current logical scope.
    async fn current_handler_async(&self) -> DiResult<Arc<dyn TransientExecutor>>;

    fn is_disposed(&self) -> bool;
}

/// Executor factory whose handler is cached per logical scope.
///
/// Construct one per composition root and register it once; aliases must
/// resolve to this same instance.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::{
///     Dispose, ExecutorFactory, NoAmbientScope, SingletonExecutorFactory, TransientExecutor,
/// };
/// use std::sync::Arc;
///
/// let factory = SingletonExecutorFactory::new(Arc::new(NoAmbientScope)).unwrap();
/// let sync_facade: &dyn ExecutorFactory = &factory;
///
/// let a = sync_facade.current_handler().unwrap();
/// let b = factory.current_handler().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// factory.dispose();
/// assert!(sync_facade.is_disposed());
/// assert!(a.is_released());
/// ```
pub struct SingletonExecutorFactory {
    current: LazyScopedValue<dyn TransientExecutor>,
    options: ExecutorOptions,
}

impl SingletonExecutorFactory {
    /// Creates a factory whose executors use default options.
    pub fn new(scope: Arc<dyn ScopeContextCore>) -> DiResult<Self> {
        Self::with_options(scope, ExecutorOptions::default())
    }

    /// Creates a factory whose executors use `options`.
    ///
    /// Fails with `InvalidArgument` when the options do not validate.
    pub fn with_options(scope: Arc<dyn ScopeContextCore>, options: ExecutorOptions) -> DiResult<Self> {
        options.validate()?;

        let build = options.clone();
        let current = LazyScopedValue::new(UniqueId::new(), move || build_handler(&build), scope)?;

        tracing::debug!(
            value_id = %current.id(),
            executor = %options.name,
            "executor factory created"
        );
        Ok(Self { current, options })
    }

    /// Id of the internal cached value.
    pub fn id(&self) -> UniqueId {
        self.current.id()
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    pub fn current_handler(&self) -> DiResult<Arc<dyn TransientExecutor>> {
        self.current.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.current.is_disposed()
    }
}

fn build_handler(options: &ExecutorOptions) -> Arc<dyn TransientExecutor> {
    Arc::new(ExecutorConcrete::new(options.clone()))
}

impl ExecutorFactory for SingletonExecutorFactory {
    fn current_handler(&self) -> DiResult<Arc<dyn TransientExecutor>> {
        self.current.get()
    }

    fn create_default_handler(&self) -> Arc<dyn TransientExecutor> {
        build_handler(&self.options)
    }

    fn is_disposed(&self) -> bool {
        self.current.is_disposed()
    }
}

#[async_trait]
impl ExecutorFactoryAsync for SingletonExecutorFactory {
    async fn current_handler_async(&self) -> DiResult<Arc<dyn TransientExecutor>> {
        self.current.get()
    }

    fn is_disposed(&self) -> bool {
        self.current.is_disposed()
    }
}

impl Dispose for SingletonExecutorFactory {
    fn dispose(&self) {
        self.current.dispose();
    }
}

impl fmt::Debug for SingletonExecutorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonExecutorFactory")
            .field("current", &self.current)
            .field("options", &self.options)
            .finish()
    }
}
