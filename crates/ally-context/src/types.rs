//! Type tags and type sets
//!
//! Attributes accept a closed set of concrete value types. A [`TypeTag`] names
//! one type, a [`TypeSet`] is the union an attribute accepts.

use indexmap::IndexSet;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identifier of a concrete value type
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag for type `T`
    #[inline]
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying type id
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Ordered, deduplicated set of accepted value types
///
/// Iteration follows declaration order; equality ignores order.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TypeSet {
    tags: IndexSet<TypeTag>,
}

impl TypeSet {
    /// Empty set (invalid for an attribute, useful for building)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from tags, dropping duplicates
    #[must_use]
    pub fn from_tags(tags: impl IntoIterator<Item = TypeTag>) -> Self {
        Self {
            tags: tags.into_iter().collect(),
        }
    }

    /// Add a tag, returns false if it was already present
    #[inline]
    pub fn insert(&mut self, tag: TypeTag) -> bool {
        self.tags.insert(tag)
    }

    /// Number of types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Check if set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Check membership of a tag
    #[inline]
    #[must_use]
    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.tags.contains(tag)
    }

    /// Check membership by type id
    #[must_use]
    pub fn contains_id(&self, id: TypeId) -> bool {
        self.tags.iter().any(|tag| tag.id == id)
    }

    /// Check membership of type `T`
    #[inline]
    #[must_use]
    pub fn contains_type<T: Any>(&self) -> bool {
        self.contains_id(TypeId::of::<T>())
    }

    /// Every type of `self` is a member of `other`
    #[inline]
    #[must_use]
    pub fn is_subset(&self, other: &TypeSet) -> bool {
        self.tags.is_subset(&other.tags)
    }

    /// Types of `self` that are not members of `other`
    #[must_use]
    pub fn missing_from(&self, other: &TypeSet) -> Vec<TypeTag> {
        self.tags.difference(&other.tags).copied().collect()
    }

    /// Union of both sets, `self` first
    #[must_use]
    pub fn union(&self, other: &TypeSet) -> TypeSet {
        Self {
            tags: self.tags.union(&other.tags).copied().collect(),
        }
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &TypeTag> {
        self.tags.iter()
    }
}

impl FromIterator<TypeTag> for TypeSet {
    fn from_iter<I: IntoIterator<Item = TypeTag>>(iter: I) -> Self {
        Self::from_tags(iter)
    }
}

impl fmt::Debug for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tags.iter()).finish()
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tag}")?;
        }
        f.write_str("}")
    }
}

/// Build a [`TypeSet`] from a list of types
///
/// ```rust
/// use ally_context::types;
///
/// let set = types![i64, String];
/// assert_eq!(set.len(), 2);
/// assert!(set.contains_type::<String>());
/// ```
#[macro_export]
macro_rules! types {
    ($($ty:ty),+ $(,)?) => {
        $crate::TypeSet::from_tags([$($crate::TypeTag::of::<$ty>()),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_equality_by_type() {
        assert_eq!(TypeTag::of::<i64>(), TypeTag::of::<i64>());
        assert_ne!(TypeTag::of::<i64>(), TypeTag::of::<i32>());
    }

    #[test]
    fn tag_name() {
        assert_eq!(TypeTag::of::<String>().name(), "alloc::string::String");
    }

    #[test]
    fn set_deduplicates() {
        let set = types![i64, String, i64];
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn set_equality_ignores_order() {
        assert_eq!(types![i64, String], types![String, i64]);
    }

    #[test]
    fn set_subset() {
        let small = types![String];
        let big = types![String, Vec<u8>];
        assert!(small.is_subset(&big));
        assert!(!big.is_subset(&small));
        assert_eq!(big.missing_from(&small), vec![TypeTag::of::<Vec<u8>>()]);
    }

    #[test]
    fn set_union_keeps_first_order() {
        let union = types![bool].union(&types![i64, bool]);
        let names: Vec<_> = union.iter().map(TypeTag::name).collect();
        assert_eq!(names, vec!["bool", "i64"]);
    }

    #[test]
    fn set_display() {
        assert_eq!(types![bool, i64].to_string(), "{bool, i64}");
    }

    #[test]
    fn empty_set() {
        assert!(TypeSet::empty().is_empty());
    }
}
