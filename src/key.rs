//! Service keys for the host container.

use std::any::TypeId;
use std::hash::{Hash, Hasher};

/// Key for registration storage and lookup.
///
/// Concrete types are keyed by `TypeId`. Trait objects have no `TypeId` of
/// their own that survives erasure, so they are keyed by their type name.
///
/// # Examples
///
/// ```rust
/// use ferrous_scoped::{Key, key_of_type, key_of_trait};
///
/// trait Facade: Send + Sync {}
///
/// let concrete = key_of_type::<String>();
/// assert_eq!(concrete.display_name(), "alloc::string::String");
/// assert!(!concrete.is_trait());
///
/// let facade = key_of_trait::<dyn Facade>();
/// assert!(facade.is_trait());
/// ```
#[derive(Debug, Clone)]
pub enum Key {
    /// Concrete type key with TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Trait object key
    Trait(&'static str),
}

impl Key {
    /// Type or trait name for diagnostics and error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) => name,
            Key::Trait(name) => name,
        }
    }

    pub fn is_trait(&self) -> bool {
        matches!(self, Key::Trait(_))
    }
}

// Concrete types compare by TypeId only; the name is diagnostic.
impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::Trait(a), Key::Trait(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Trait(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

#[inline]
pub fn key_of_type<T: 'static>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}

#[inline]
pub fn key_of_trait<T: ?Sized + 'static>() -> Key {
    Key::Trait(std::any::type_name::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn type_keys_ignore_display_name() {
        let a = Key::Type(TypeId::of::<u32>(), "u32");
        let b = Key::Type(TypeId::of::<u32>(), "renamed");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn trait_and_type_keys_never_collide() {
        assert_ne!(key_of_type::<u32>(), Key::Trait("u32"));
    }
}
