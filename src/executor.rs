//! The executor payload cached by [`SingletonExecutorFactory`](crate::SingletonExecutorFactory).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::ExecutorOptions;
use crate::traits::{Dispose, MaybeDispose};

/// A unit of work configuration.
///
/// The `MaybeDispose` supertrait lets a cached `dyn TransientExecutor`
/// answer the disposal query through its vtable.
pub trait TransientExecutor: MaybeDispose + Send + Sync {
    /// Options this executor was built from.
    fn options(&self) -> &ExecutorOptions;

    /// Whether the executor's release hook has run.
    fn is_released(&self) -> bool;
}

/// Default executor implementation.
pub struct ExecutorConcrete {
    options: ExecutorOptions,
    released: AtomicBool,
}

impl ExecutorConcrete {
    pub fn new(options: ExecutorOptions) -> Self {
        Self {
            options,
            released: AtomicBool::new(false),
        }
    }
}

impl TransientExecutor for ExecutorConcrete {
    fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl Dispose for ExecutorConcrete {
    fn dispose(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            tracing::trace!(executor = %self.options.name, "executor released");
        }
    }
}

impl MaybeDispose for ExecutorConcrete {
    fn as_dispose(&self) -> Option<&dyn Dispose> {
        Some(self)
    }
}

impl fmt::Debug for ExecutorConcrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorConcrete")
            .field("name", &self.options.name)
            .field("released", &self.is_released())
            .finish()
    }
}
