//! Per-run slot records

use crate::error::ExecutionError;
use ally_context::Record;
use indexmap::IndexMap;

/// Records of one run, keyed by slot name
#[derive(Debug, Default)]
pub struct Slots {
    records: IndexMap<String, Record>,
}

impl Slots {
    /// Create an empty set of slots
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, builder style
    #[must_use]
    pub fn with(mut self, slot: impl Into<String>, record: Record) -> Self {
        self.records.insert(slot.into(), record);
        self
    }

    /// Add or replace a record
    pub fn insert(&mut self, slot: impl Into<String>, record: Record) -> Option<Record> {
        self.records.insert(slot.into(), record)
    }

    /// Lookup a record
    #[inline]
    #[must_use]
    pub fn get(&self, slot: &str) -> Option<&Record> {
        self.records.get(slot)
    }

    /// Mutably lookup a record
    #[inline]
    pub fn get_mut(&mut self, slot: &str) -> Option<&mut Record> {
        self.records.get_mut(slot)
    }

    /// Record that must be present
    ///
    /// # Errors
    /// [`ExecutionError::MissingSlot`] if the slot has no record.
    pub fn record(&self, slot: &str) -> Result<&Record, ExecutionError> {
        self.records
            .get(slot)
            .ok_or_else(|| ExecutionError::MissingSlot(slot.to_string()))
    }

    /// Mutable record that must be present
    ///
    /// # Errors
    /// [`ExecutionError::MissingSlot`] if the slot has no record.
    pub fn record_mut(&mut self, slot: &str) -> Result<&mut Record, ExecutionError> {
        self.records
            .get_mut(slot)
            .ok_or_else(|| ExecutionError::MissingSlot(slot.to_string()))
    }

    /// Remove a record
    pub fn take(&mut self, slot: &str) -> Option<Record> {
        self.records.shift_remove(slot)
    }

    /// Check if a slot has a record
    #[inline]
    #[must_use]
    pub fn contains(&self, slot: &str) -> bool {
        self.records.contains_key(slot)
    }

    /// Slot names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.records.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no records are held
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Move every record out, leaving the slots empty
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (String, Record)> + '_ {
        self.records.drain(..)
    }
}
