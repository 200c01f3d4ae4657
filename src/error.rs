//! Error types for scoped values and the host container.

use std::fmt;

/// Errors raised by scoped values, singleton factories and the host container.
///
/// The first three variants belong to the lazy value core. The remaining ones
/// come from the host container's resolution path.
///
/// # Examples
///
/// ```rust
/// use ferrous_scoped::{DiError, LazyScopedValue, NoAmbientScope, UniqueId};
/// use std::sync::Arc;
///
/// let result = LazyScopedValue::new(
///     UniqueId::NIL,
///     || Arc::new(42u32),
///     Arc::new(NoAmbientScope),
/// );
/// assert!(matches!(result, Err(DiError::InvalidArgument(_))));
/// ```
#[derive(Debug, Clone)]
pub enum DiError {
    /// Degenerate construction input or invalid configuration
    InvalidArgument(String),
    /// A value was read after it had been disposed
    UseAfterDispose(String),
    /// Two aliases of one logical singleton disagree on identity or liveness
    AliasDivergence(String),
    /// Service not registered
    NotFound(&'static str),
    /// Type downcast failed
    TypeMismatch(&'static str),
    /// Circular resolution detected (includes path)
    Circular(Vec<&'static str>),
    /// Invalid lifetime resolution (e.g., scoped from root)
    WrongLifetime(&'static str),
    /// Maximum resolution depth exceeded
    DepthExceeded(usize),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            DiError::UseAfterDispose(what) => write!(f, "Use after dispose: {}", what),
            DiError::AliasDivergence(msg) => write!(f, "Alias divergence: {}", msg),
            DiError::NotFound(name) => write!(f, "Service not found: {}", name),
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::Circular(path) => {
                write!(f, "Circular dependency: {}", path.join(" -> "))
            }
            DiError::WrongLifetime(msg) => write!(f, "Lifetime error: {}", msg),
            DiError::DepthExceeded(depth) => write!(f, "Max depth {} exceeded", depth),
        }
    }
}

impl std::error::Error for DiError {}

/// Result type used throughout ferrous-scoped.
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = DiError::UseAfterDispose("value 00000000000000ff".to_string());
        assert_eq!(err.to_string(), "Use after dispose: value 00000000000000ff");

        let err = DiError::Circular(vec!["A", "B", "A"]);
        assert_eq!(err.to_string(), "Circular dependency: A -> B -> A");
    }
}
