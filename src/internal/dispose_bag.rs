//! Internal disposal bag for managing cleanup hooks.

/// Disposal hooks owned by a scope or by the root provider.
///
/// Hooks run in LIFO order, so anything constructed later is torn down first.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<Box<dyn FnOnce() + Send>>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.hooks.push(f);
    }

    /// Detaches every pending hook so they can run without holding a lock.
    pub(crate) fn take(&mut self) -> DisposeBag {
        std::mem::take(self)
    }

    /// Runs all hooks in reverse registration order and returns how many ran.
    pub(crate) fn run_all_reverse(mut self) -> usize {
        let count = self.hooks.len();
        while let Some(f) = self.hooks.pop() {
            (f)();
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}
