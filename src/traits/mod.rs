//! Core traits for disposal and resolution.

mod dispose;
mod resolver;

pub use dispose::{Dispose, MaybeDispose};
pub use resolver::{Resolver, ResolverCore};
