//! Per-thread resolution stack for circular forward detection.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};

const MAX_DEPTH: usize = 256;

thread_local! {
    static STACK: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

struct PopOnDrop;

impl Drop for PopOnDrop {
    fn drop(&mut self) {
        let _ = STACK.try_with(|stack| stack.borrow_mut().pop());
    }
}

/// Runs `f` with `name` pushed on the calling thread's resolution stack.
///
/// Re-entering a name that is already on the stack yields
/// [`DiError::Circular`] with the full path; exceeding the depth cap yields
/// [`DiError::DepthExceeded`]. Neither case calls `f`.
pub(crate) fn with_resolution_guard<T>(
    name: &'static str,
    f: impl FnOnce() -> DiResult<T>,
) -> DiResult<T> {
    STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.contains(&name) {
            let mut path = stack.clone();
            path.push(name);
            return Err(DiError::Circular(path));
        }
        if stack.len() >= MAX_DEPTH {
            return Err(DiError::DepthExceeded(stack.len()));
        }
        stack.push(name);
        Ok(())
    })?;

    let _pop = PopOnDrop;
    f()
}
