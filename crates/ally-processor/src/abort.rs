//! Partial failure of batched items
//!
//! A handler that gives up on some items of a batch returns [`Flow::Abort`]
//! (or an [`Abort`] error). The chain unwinds up to the handler that owns the
//! batch, which removes exactly those items with [`Batch::exclude`] and lets
//! everything else continue.
//!
//! [`Flow::Abort`]: crate::Flow::Abort

use crate::error::ExecutionError;
use indexmap::IndexMap;
use std::fmt;

/// Identity of an item inside a [`Batch`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(String);

impl ItemKey {
    /// Create a key
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&ItemKey> for ItemKey {
    fn from(value: &ItemKey) -> Self {
        value.clone()
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request to stop processing for the named items only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    items: Vec<ItemKey>,
}

impl Abort {
    /// Abort the given items
    #[must_use]
    pub fn new<K: Into<ItemKey>>(items: impl IntoIterator<Item = K>) -> Self {
        let mut keys: Vec<ItemKey> = Vec::new();
        for key in items {
            let key = key.into();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Self { items: keys }
    }

    /// Aborted items
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[ItemKey] {
        &self.items
    }

    /// Check if an item is aborted
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &ItemKey) -> bool {
        self.items.contains(key)
    }

    /// Add the items of another abort
    pub fn merge(&mut self, other: Abort) {
        for key in other.items {
            if !self.items.contains(&key) {
                self.items.push(key);
            }
        }
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("aborted items [")?;
        for (i, key) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}")?;
        }
        f.write_str("]")
    }
}

impl std::error::Error for Abort {}

/// Keyed items processed as a unit, from which aborted items are excluded
#[derive(Debug, Clone)]
pub struct Batch<T> {
    items: IndexMap<ItemKey, T>,
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }
}

impl<T> Batch<T> {
    /// Create an empty batch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an item
    pub fn insert(&mut self, key: impl Into<ItemKey>, item: T) -> Option<T> {
        self.items.insert(key.into(), item)
    }

    /// Lookup an item
    #[inline]
    #[must_use]
    pub fn get(&self, key: &ItemKey) -> Option<&T> {
        self.items.get(key)
    }

    /// Mutably lookup an item
    #[inline]
    pub fn get_mut(&mut self, key: &ItemKey) -> Option<&mut T> {
        self.items.get_mut(key)
    }

    /// Remove an item, keeping the order of the others
    pub fn remove(&mut self, key: &ItemKey) -> Option<T> {
        self.items.shift_remove(key)
    }

    /// Check if an item is present
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &ItemKey) -> bool {
        self.items.contains_key(key)
    }

    /// Number of items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the batch is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.items.keys()
    }

    /// Items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&ItemKey, &T)> {
        self.items.iter()
    }

    /// Mutable items in insertion order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ItemKey, &mut T)> {
        self.items.iter_mut()
    }

    /// Remove the aborted items, returning them in batch order
    pub fn exclude(&mut self, abort: &Abort) -> Vec<(ItemKey, T)> {
        let mut removed = Vec::new();
        let mut kept = IndexMap::with_capacity(self.items.len());
        for (key, item) in self.items.drain(..) {
            if abort.contains(&key) {
                removed.push((key, item));
            } else {
                kept.insert(key, item);
            }
        }
        self.items = kept;
        removed
    }

    /// Run `step` for every item, then exclude the items named by the aborts
    /// it returned
    ///
    /// Returns the excluded keys.
    ///
    /// # Errors
    /// The first non-abort error stops the loop and is returned; items are
    /// left untouched in that case.
    pub fn process_each<F>(&mut self, mut step: F) -> Result<Vec<ItemKey>, ExecutionError>
    where
        F: FnMut(&ItemKey, &mut T) -> Result<(), ExecutionError>,
    {
        let mut aborted: Option<Abort> = None;
        for (key, item) in &mut self.items {
            match step(key, item) {
                Ok(()) => {}
                Err(ExecutionError::Aborted(abort)) => match aborted.as_mut() {
                    Some(all) => all.merge(abort),
                    None => aborted = Some(abort),
                },
                Err(other) => return Err(other),
            }
        }
        Ok(match aborted {
            Some(abort) => {
                tracing::debug!(%abort, "excluding aborted items from batch");
                self.exclude(&abort).into_iter().map(|(key, _)| key).collect()
            }
            None => Vec::new(),
        })
    }
}

impl<T> FromIterator<(ItemKey, T)> for Batch<T> {
    fn from_iter<I: IntoIterator<Item = (ItemKey, T)>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Batch<u32> {
        let mut batch = Batch::new();
        batch.insert("get", 1);
        batch.insert("insert", 2);
        batch.insert("delete", 3);
        batch
    }

    #[test]
    fn abort_deduplicates() {
        let abort = Abort::new(["a", "b", "a"]);
        assert_eq!(abort.items().len(), 2);
        assert_eq!(abort.to_string(), "aborted items [a, b]");
    }

    #[test]
    fn abort_merge() {
        let mut abort = Abort::new(["a"]);
        abort.merge(Abort::new(["a", "c"]));
        assert_eq!(abort.items(), &[ItemKey::from("a"), ItemKey::from("c")]);
    }

    #[test]
    fn exclude_removes_only_named() {
        let mut batch = batch();
        let removed = batch.exclude(&Abort::new(["insert"]));
        assert_eq!(removed, vec![(ItemKey::from("insert"), 2)]);
        let keys: Vec<_> = batch.keys().map(ItemKey::as_str).collect();
        assert_eq!(keys, vec!["get", "delete"]);
    }

    #[test]
    fn exclude_unknown_is_noop() {
        let mut batch = batch();
        assert!(batch.exclude(&Abort::new(["patch"])).is_empty());
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn process_each_collects_aborts() {
        let mut batch = batch();
        let excluded = batch
            .process_each(|key, value| {
                *value *= 10;
                if key.as_str() == "delete" {
                    return Err(ExecutionError::Aborted(Abort::new([key])));
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(excluded, vec![ItemKey::from("delete")]);
        let values: Vec<_> = batch.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![10, 20]);
    }

    #[test]
    fn process_each_propagates_other_errors() {
        let mut batch = batch();
        let err = batch
            .process_each(|_, _| Err(ExecutionError::UnknownSlot("x".into())))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::UnknownSlot(_)));
        assert_eq!(batch.len(), 3);
    }
}
