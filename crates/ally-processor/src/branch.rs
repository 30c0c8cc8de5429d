//! Branch composition
//!
//! A branching handler owns inner assemblies. Each [`Branch`] says which
//! inner slots share the outer records (by explicit mapping, or by name with
//! [`Branch::included`]) and which are private to the branch. Shared slots
//! are resolved together with the outer assembly; private ones on their own.

use crate::assembly::Assembly;
use crate::chain::{Chain, Termination};
use crate::error::ExecutionError;
use crate::processing::Processing;
use crate::slots::Slots;
use ally_context::{ContextSpec, Record};
use std::sync::Arc;

/// Inner assembly of a branching handler, with its slot mapping
#[derive(Debug, Clone)]
pub struct Branch {
    pub(crate) assembly: Assembly,
    pub(crate) included: bool,
    pub(crate) mapping: Vec<(String, String)>,
    pub(crate) local: Vec<(String, Arc<ContextSpec>)>,
}

impl Branch {
    /// Branch into `assembly`; no slot is shared until mapped or included
    #[must_use]
    pub fn new(assembly: Assembly) -> Self {
        Self {
            assembly,
            included: false,
            mapping: Vec::new(),
            local: Vec::new(),
        }
    }

    /// Share every unmapped, non-local inner slot with the outer slot of
    /// the same name
    #[inline]
    #[must_use]
    pub fn included(mut self) -> Self {
        self.included = true;
        self
    }

    /// Share inner slot `inner` with outer slot `outer`
    #[must_use]
    pub fn map(mut self, inner: impl Into<String>, outer: impl Into<String>) -> Self {
        self.mapping.push((inner.into(), outer.into()));
        self
    }

    /// Keep `slot` private to the branch and contribute `spec` to it
    ///
    /// The branching handler supplies (or lets the route create) its record.
    #[must_use]
    pub fn using(mut self, slot: impl Into<String>, spec: impl Into<Arc<ContextSpec>>) -> Self {
        self.local.push((slot.into(), spec.into()));
        self
    }

    /// Inner assembly
    #[inline]
    #[must_use]
    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }
}

/// Built branch of a handler, obtained with [`Chain::branch`]
#[derive(Debug, Clone)]
pub struct BranchProcessing {
    processing: Processing,
    shared: Vec<(String, String)>,
}

impl BranchProcessing {
    pub(crate) fn new(processing: Processing, shared: Vec<(String, String)>) -> Self {
        Self { processing, shared }
    }

    /// Inner processing
    #[inline]
    #[must_use]
    pub fn processing(&self) -> &Processing {
        &self.processing
    }

    /// Fresh record for an inner slot
    ///
    /// # Errors
    /// [`ExecutionError::UnknownSlot`] if the branch has no such slot.
    pub fn ctx(&self, slot: &str) -> Result<Record, ExecutionError> {
        self.processing.ctx(slot)
    }

    /// Shared slots as (inner, outer) pairs
    pub fn shared(&self) -> impl Iterator<Item = (&str, &str)> {
        self.shared
            .iter()
            .map(|(inner, outer)| (inner.as_str(), outer.as_str()))
    }

    /// Route into the branch
    ///
    /// Shared records move from `outer` into the branch under their inner
    /// names, `local` records join them, and everything moves back once the
    /// nested chain ended, also when it failed. A shared record present in
    /// `outer` takes precedence over a `local` one of the same inner name;
    /// the displaced local record sits out the run and is handed back in
    /// `local` afterwards.
    ///
    /// # Errors
    /// Any error of the nested run.
    pub fn run(
        &self,
        chain: &mut Chain<'_>,
        outer: &mut Slots,
        local: &mut Slots,
    ) -> Result<Termination, ExecutionError> {
        let mut inner = Slots::new();
        for (slot, record) in local.drain() {
            inner.insert(slot, record);
        }
        let mut displaced = Slots::new();
        for (inner_slot, outer_slot) in &self.shared {
            if let Some(record) = outer.take(outer_slot) {
                if let Some(previous) = inner.insert(inner_slot.clone(), record) {
                    displaced.insert(inner_slot.clone(), previous);
                }
            }
        }

        let outcome = chain.route(&self.processing, &mut inner);

        for (inner_slot, outer_slot) in &self.shared {
            if let Some(record) = inner.take(inner_slot) {
                outer.insert(outer_slot.clone(), record);
            }
        }
        for (slot, record) in inner.drain() {
            local.insert(slot, record);
        }
        for (slot, record) in displaced.drain() {
            local.insert(slot, record);
        }
        outcome
    }
}
