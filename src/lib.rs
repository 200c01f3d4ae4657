//! # ferrous-scoped
//!
//! Scope-consistent lazy values, and a singleton factory that stays correct
//! when a container reaches it through several aliases.
//!
//! ## Overview
//!
//! - **[`LazyScopedValue`]**: materializes a value at most once per logical
//!   scope, either the calling thread or the active ambient scope, and
//!   disposes what it owns exactly once.
//! - **[`ScopeContext`]**: the ambient scope a value consults on every read.
//!   [`RequestCache`] gives thread-confined per-request storage.
//! - **[`SingletonExecutorFactory`]**: one object behind two facades,
//!   [`ExecutorFactory`] and [`ExecutorFactoryAsync`], backed by a single
//!   cached value.
//! - **Host container**: [`ServiceCollection`], [`ServiceProvider`] and
//!   [`Scope`], with correct aliasing ([`ServiceCollection::forward`]) and
//!   the misclassified transient alias that disposes a shared singleton
//!   ([`ServiceCollection::add_transient_forward`]).
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_scoped::{ExecutorFactory, Resolver, ServiceCollection};
//!
//! let mut services = ServiceCollection::new();
//! services.add_executor_factory();
//! let provider = services.build();
//!
//! let handler = {
//!     let scope = provider.create_scope();
//!     let factory = scope.get_required_trait::<dyn ExecutorFactory>();
//!     factory.current_handler().unwrap()
//! };
//!
//! // The scope has ended; the other facade still sees a live factory.
//! let factory = provider.get_required_trait::<dyn ExecutorFactory>();
//! assert!(!factory.is_disposed());
//! assert!(std::sync::Arc::ptr_eq(&handler, &factory.current_handler().unwrap()));
//! ```
//!
//! ## Ambient Scopes
//!
//! ```rust
//! use ferrous_scoped::{LazyScopedValue, RequestCache, UniqueId};
//! use std::sync::Arc;
//!
//! let requests = RequestCache::new();
//! let value = LazyScopedValue::new(
//!     UniqueId::new(),
//!     || Arc::new(String::from("per-request")),
//!     Arc::new(requests),
//! )
//! .unwrap();
//!
//! let first = requests.scope(|| value.value());
//! let second = requests.scope(|| value.value());
//! // Each request materializes its own value.
//! assert!(!Arc::ptr_eq(&first, &second));
//! ```
//!
//! ## Logging
//!
//! Events are emitted through [`tracing`]; install a subscriber to see them.

pub mod alias;
pub mod collection;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod executor;
pub mod factory;
pub mod key;
pub mod lifetime;
pub mod provider;
pub mod scope_context;
pub mod scoped_value;
pub mod traits;
pub mod unique_id;

mod host;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use alias::{ensure_live, ensure_same_instance, same_instance};
pub use collection::ServiceCollection;
pub use config::ExecutorOptions;
pub use descriptors::ServiceDescriptor;
pub use error::{DiError, DiResult};
pub use executor::{ExecutorConcrete, TransientExecutor};
pub use factory::{ExecutorFactory, ExecutorFactoryAsync, SingletonExecutorFactory};
pub use key::{key_of_trait, key_of_type, Key};
pub use lifetime::Lifetime;
pub use provider::{ResolverContext, Scope, ServiceProvider};
pub use registration::AnyArc;
pub use scope_context::{NoAmbientScope, RequestCache, RequestScope, ScopeContext, ScopeContextCore};
pub use scoped_value::{LazyScopedValue, StorageStrategy};
pub use traits::{Dispose, MaybeDispose, Resolver, ResolverCore};
pub use unique_id::UniqueId;
