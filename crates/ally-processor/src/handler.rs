//! Handler contract
//!
//! A [`Handler`] is one step of a processing chain. It declares the slot
//! contexts it works with, and optionally owns branch assemblies it can
//! route into.

use crate::branch::Branch;
use crate::chain::{Chain, Flow};
use crate::slots::Slots;
use ally_context::ContextSpec;
use std::fmt;
use std::sync::Arc;

/// Slot contracts of a handler, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    slots: Vec<(String, Arc<ContextSpec>)>,
}

/// Initial slot types passed to [`crate::Assembly::create`]
pub type SlotTypes = Declarations;

impl Declarations {
    /// Create empty declarations
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the context used under a slot name
    #[must_use]
    pub fn slot(mut self, name: impl Into<String>, spec: impl Into<Arc<ContextSpec>>) -> Self {
        self.slots.push((name.into(), spec.into()));
        self
    }

    /// Lookup the first declaration for a slot
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<ContextSpec>> {
        self.slots
            .iter()
            .find(|(slot, _)| slot == name)
            .map(|(_, spec)| spec)
    }

    /// Declarations in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<ContextSpec>)> {
        self.slots.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Number of declarations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if nothing is declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// One step of a processing chain
///
/// Handlers are shared read-only between concurrent runs, all per-run state
/// lives in the [`Slots`].
pub trait Handler: Send + Sync {
    /// Unique name within an assembly
    fn name(&self) -> &str;

    /// Slot contexts this handler requires, defines or reads optionally
    fn declarations(&self) -> &Declarations;

    /// Branch assemblies this handler can route into
    fn branches(&self) -> &[Branch] {
        &[]
    }

    /// Process the slots of one run
    ///
    /// Returning [`Flow::Continue`] moves the chain to the next handler.
    ///
    /// # Errors
    /// Any error unwinds the chain. An [`crate::Abort`] error is treated as
    /// [`Flow::Abort`].
    fn process<'p>(&'p self, chain: &mut Chain<'p>, slots: &mut Slots) -> anyhow::Result<Flow>;
}

impl fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name())
            .field("slots", &self.declarations().len())
            .field("branches", &self.branches().len())
            .finish()
    }
}
