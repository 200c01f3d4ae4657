//! Registration storage for the host container.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::DiResult;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;

/// Type-erased shared value as stored by the container and by ambient scopes.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type Ctor = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// How a registration produces its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RegistrationKind {
    /// Built by its own factory.
    Factory,
    /// Alias resolving another registration. `tracks_disposal` is set when the
    /// container claims disposal of the target for the resolving scope.
    Forward { target: Key, tracks_disposal: bool },
}

/// Registration with lifetime and constructor
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: Ctor,
    pub(crate) kind: RegistrationKind,
    /// Set when the factory registers its value for disposal with the root.
    pub(crate) disposable: bool,
    /// Singleton cache; lock-free after initialization
    pub(crate) single_runtime: Option<OnceCell<AnyArc>>,
}

impl Registration {
    pub(crate) fn new(lifetime: Lifetime, ctor: Ctor) -> Self {
        let single_runtime = match lifetime {
            Lifetime::Singleton => Some(OnceCell::new()),
            _ => None,
        };

        Self {
            lifetime,
            ctor,
            kind: RegistrationKind::Factory,
            disposable: false,
            single_runtime,
        }
    }

    pub(crate) fn forward(target: Key, tracks_disposal: bool, ctor: Ctor) -> Self {
        let mut reg = Self::new(Lifetime::Transient, ctor);
        reg.kind = RegistrationKind::Forward { target, tracks_disposal };
        reg
    }

    pub(crate) fn disposable(mut self) -> Self {
        self.disposable = true;
        self
    }

    pub(crate) fn forward_target(&self) -> Option<&Key> {
        match &self.kind {
            RegistrationKind::Forward { target, .. } => Some(target),
            RegistrationKind::Factory => None,
        }
    }
}

/// All registrations of a collection, in registration order.
#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<Key, Registration>,
    order: Vec<Key>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces; the last registration for a key wins.
    pub(crate) fn insert(&mut self, key: Key, registration: Registration) {
        if self.entries.insert(key.clone(), registration).is_none() {
            self.order.push(key);
        }
    }

    pub(crate) fn get(&self, key: &Key) -> Option<&Registration> {
        self.entries.get(key)
    }

    pub(crate) fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Registrations in the order their keys were first registered.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Key, &Registration)> {
        self.order
            .iter()
            .filter_map(move |key| self.entries.get_key_value(key))
    }
}
