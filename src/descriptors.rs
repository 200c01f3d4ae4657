//! Service descriptors for introspection and diagnostics.

use crate::key::Key;
use crate::lifetime::Lifetime;

/// Snapshot of one registration, as returned by
/// [`ServiceCollection::descriptors`](crate::ServiceCollection::descriptors).
///
/// Descriptors make the container's view of ownership inspectable: which
/// keys are aliases, what they forward to, and whether the container will
/// hand the target to a resolving scope for disposal.
///
/// # Examples
///
/// ```rust
/// use ferrous_scoped::{Dispose, Lifetime, ServiceCollection};
/// use std::sync::Arc;
///
/// trait Handler: Send + Sync {}
/// struct Shared;
/// impl Handler for Shared {}
/// impl Dispose for Shared { fn dispose(&self) {} }
///
/// let mut services = ServiceCollection::new();
/// services.add_disposable_singleton_factory::<Shared, _>(|_| Shared);
/// services.add_transient_forward::<Shared, dyn Handler, _>(|s| s as Arc<dyn Handler>);
///
/// let descriptors = services.descriptors();
/// let shared = descriptors.iter().find(|d| !d.is_forward()).unwrap();
/// assert!(shared.disposable);
///
/// let alias = descriptors.iter().find(|d| d.is_forward()).unwrap();
/// assert_eq!(alias.lifetime, Lifetime::Transient);
/// assert!(alias.tracks_disposal);
/// assert_eq!(alias.forward_of.as_ref(), Some(&shared.key));
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// The registered key
    pub key: Key,
    /// Lifetime the container assigns to the key
    pub lifetime: Lifetime,
    /// Target key when this registration is an alias
    pub forward_of: Option<Key>,
    /// Whether resolving the alias hands its target to the resolving scope
    /// for disposal
    pub tracks_disposal: bool,
    /// Whether the root provider disposes the built value
    pub disposable: bool,
}

impl ServiceDescriptor {
    /// Returns the type or trait name of the key.
    pub fn type_name(&self) -> &'static str {
        self.key.display_name()
    }

    /// Whether this registration is an alias of another key.
    pub fn is_forward(&self) -> bool {
        self.forward_of.is_some()
    }

    /// Whether this is a tracked alias of a singleton: the combination that
    /// disposes a shared instance at the end of an unrelated scope.
    ///
    /// `target_lifetime` is the lifetime of the descriptor named by
    /// [`forward_of`](Self::forward_of).
    pub fn misclassifies(&self, target_lifetime: Lifetime) -> bool {
        self.tracks_disposal && target_lifetime == Lifetime::Singleton
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{key_of_trait, key_of_type};

    trait Marker {}

    fn alias(tracks_disposal: bool) -> ServiceDescriptor {
        ServiceDescriptor {
            key: key_of_trait::<dyn Marker>(),
            lifetime: Lifetime::Transient,
            forward_of: Some(key_of_type::<u32>()),
            tracks_disposal,
            disposable: false,
        }
    }

    #[test]
    fn untracked_alias_never_misclassifies() {
        let d = alias(false);
        assert!(d.is_forward());
        assert!(!d.misclassifies(Lifetime::Singleton));
    }

    #[test]
    fn tracked_alias_of_singleton_misclassifies() {
        let d = alias(true);
        assert!(d.misclassifies(Lifetime::Singleton));
        assert!(!d.misclassifies(Lifetime::Scoped));
        assert!(d.type_name().contains("Marker"));
    }
}
