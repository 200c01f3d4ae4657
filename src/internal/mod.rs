//! Internal implementation details.

pub(crate) mod dispose_bag;
pub(crate) mod resolution_stack;

pub(crate) use dispose_bag::DisposeBag;
pub(crate) use resolution_stack::with_resolution_guard;
