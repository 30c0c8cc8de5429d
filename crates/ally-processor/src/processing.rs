//! Built processings
//!
//! A [`Processing`] is the immutable result of [`crate::Assembly::create`]:
//! handlers in build order plus one synthesized context per slot. It is
//! cheap to clone and can be shared between threads; every run owns its
//! own [`Chain`] and [`Slots`].

use crate::branch::BranchProcessing;
use crate::chain::Chain;
use crate::config::Fill;
use crate::error::ExecutionError;
use crate::handler::Handler;
use crate::slots::Slots;
use ally_context::{ContextSpec, Record};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Defined attribute that no contributor requires or reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedAttribute {
    /// Slot name
    pub slot: String,
    /// Attribute name
    pub attribute: String,
    /// Handlers defining it
    pub defined_by: Vec<String>,
}

/// Diagnostics collected while building
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Unused defined attributes, empty unless reporting is enabled
    pub unused: Vec<UnusedAttribute>,
}

impl BuildReport {
    /// Check if nothing was reported
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unused.is_empty()
    }
}

pub(crate) struct Node {
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) branches: Vec<BranchProcessing>,
}

struct Inner {
    name: String,
    nodes: Vec<Node>,
    specs: IndexMap<String, Arc<ContextSpec>>,
    report: BuildReport,
    fill: Fill,
}

/// Executable, immutable handler chain with resolved slot contexts
#[derive(Clone)]
pub struct Processing {
    inner: Arc<Inner>,
}

impl Processing {
    pub(crate) fn new(
        name: String,
        nodes: Vec<Node>,
        specs: IndexMap<String, Arc<ContextSpec>>,
        report: BuildReport,
        fill: Fill,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                nodes,
                specs,
                report,
                fill,
            }),
        }
    }

    /// Name of the assembly this was built from
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Fresh record for a slot
    ///
    /// # Errors
    /// [`ExecutionError::UnknownSlot`] if the slot is not part of this processing.
    pub fn ctx(&self, slot: &str) -> Result<Record, ExecutionError> {
        self.spec(slot)
            .map(|spec| Record::new(Arc::clone(spec)))
            .ok_or_else(|| ExecutionError::UnknownSlot(slot.to_string()))
    }

    /// Synthesized context of a slot
    #[inline]
    #[must_use]
    pub fn spec(&self, slot: &str) -> Option<&Arc<ContextSpec>> {
        self.inner.specs.get(slot)
    }

    /// Slot names
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.inner.specs.keys().map(String::as_str)
    }

    /// Handler names in execution order
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.inner.nodes.iter().map(|node| node.handler.name())
    }

    /// Build diagnostics
    #[inline]
    #[must_use]
    pub fn report(&self) -> &BuildReport {
        &self.inner.report
    }

    /// Fill mode used by [`Processing::run`]
    #[inline]
    #[must_use]
    pub fn fill(&self) -> Fill {
        self.inner.fill
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.inner.nodes
    }

    /// Run every handler over `slots`
    ///
    /// Returns the slots after the run, also when a handler canceled.
    ///
    /// # Errors
    /// Invalid supplied records, handler failures and uncaught aborts. The
    /// chain's finalizers have run in every case.
    #[tracing::instrument(skip_all, fields(processing = %self.name()))]
    pub fn execute(&self, fill: Fill, mut slots: Slots) -> Result<Slots, ExecutionError> {
        self.prepare(&mut slots, fill)?;
        match Chain::new(self, 0).drive(&mut slots) {
            Ok(termination) => {
                tracing::debug!(?termination, "processing ended");
                Ok(slots)
            }
            Err(ExecutionError::Aborted(abort)) => {
                tracing::warn!(%abort, "abort was not caught by any batch owner");
                Err(ExecutionError::Aborted(abort))
            }
            Err(err) => Err(err),
        }
    }

    /// [`Processing::execute`] with the configured fill mode
    ///
    /// # Errors
    /// See [`Processing::execute`].
    pub fn run(&self, slots: Slots) -> Result<Slots, ExecutionError> {
        self.execute(self.fill(), slots)
    }

    /// Check supplied records and create the missing ones
    pub(crate) fn prepare(&self, slots: &mut Slots, fill: Fill) -> Result<(), ExecutionError> {
        for (slot, record) in slots.iter() {
            let spec = self
                .spec(slot)
                .ok_or_else(|| ExecutionError::UnknownSlot(slot.to_string()))?;
            if !Arc::ptr_eq(record.spec(), spec) && **record.spec() != **spec {
                return Err(ExecutionError::ForeignRecord {
                    slot: slot.to_string(),
                    context: record.spec().name().to_string(),
                });
            }
        }
        if fill == Fill::All {
            for (slot, spec) in &self.inner.specs {
                if !slots.contains(slot) {
                    slots.insert(slot.clone(), Record::new(Arc::clone(spec)));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Processing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processing")
            .field("name", &self.name())
            .field("order", &self.order().collect::<Vec<_>>())
            .field("slots", &self.slots().collect::<Vec<_>>())
            .finish()
    }
}
