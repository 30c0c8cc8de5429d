//! Execution chains
//!
//! A [`Chain`] walks the ordered handlers of a [`Processing`] for one run.
//! It auto-advances after each handler unless the handler cancels, aborts
//! or fails, and always runs its finalizers exactly once when it ends.

use crate::abort::Abort;
use crate::branch::BranchProcessing;
use crate::config::Fill;
use crate::error::ExecutionError;
use crate::processing::Processing;
use crate::slots::Slots;
use std::fmt;

/// Outcome of a handler step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Flow {
    /// Proceed to the next handler
    #[default]
    Continue,

    /// Stop the remaining handlers of this chain without error
    Cancel,

    /// Unwind, excluding the named items at the batch owner
    Abort(Abort),
}

/// Lifecycle of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainState {
    /// Not started
    Created,
    /// Walking handlers
    Running,
    /// Every handler ran
    Completed,
    /// A handler canceled the rest of the chain
    Canceled,
    /// A handler failed or aborted
    Unwound,
}

impl ChainState {
    /// Check if the chain has ended
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Unwound)
    }
}

/// Validates a chain state transition
///
/// # Errors
/// [`ExecutionError::IllegalTransition`] if `to` is not reachable from `from`.
pub fn validate_transition(from: ChainState, to: ChainState) -> Result<(), ExecutionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ExecutionError::IllegalTransition { from, to })
    }
}

/// States reachable in one step
#[must_use]
pub fn allowed_transitions(from: ChainState) -> Vec<ChainState> {
    use ChainState::*;
    match from {
        Created => vec![Running],
        Running => vec![Completed, Canceled, Unwound],
        Completed | Canceled | Unwound => vec![],
    }
}

/// How a chain ended, as seen by finalizers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    /// Every handler ran
    Completed,
    /// Canceled by a handler
    Canceled,
    /// Unwound by an error or abort
    Unwound,
}

impl Termination {
    /// Terminal chain state for this termination
    #[inline]
    #[must_use]
    pub fn state(self) -> ChainState {
        match self {
            Self::Completed => ChainState::Completed,
            Self::Canceled => ChainState::Canceled,
            Self::Unwound => ChainState::Unwound,
        }
    }
}

type Finalizer<'p> = Box<dyn FnOnce(Termination, &mut Slots) + 'p>;

/// Run-time cursor over the handlers of a processing
pub struct Chain<'p> {
    processing: &'p Processing,
    position: usize,
    depth: usize,
    state: ChainState,
    canceled: bool,
    finalizers: Vec<Finalizer<'p>>,
}

impl<'p> Chain<'p> {
    pub(crate) fn new(processing: &'p Processing, depth: usize) -> Self {
        Self {
            processing,
            position: 0,
            depth,
            state: ChainState::Created,
            canceled: false,
            finalizers: Vec::new(),
        }
    }

    /// Processing this chain walks
    #[inline]
    #[must_use]
    pub fn processing(&self) -> &'p Processing {
        self.processing
    }

    /// Index of the current handler
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Nesting depth, 0 for the outermost chain
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Current lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Name of the current handler
    #[must_use]
    pub fn handler_name(&self) -> Option<&'p str> {
        self.processing
            .nodes()
            .get(self.position)
            .map(|node| node.handler.name())
    }

    /// Stop the remaining handlers once the current one returns
    #[inline]
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    /// Check if [`Chain::cancel`] was called
    #[inline]
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Register a callback for the end of this chain
    ///
    /// Callbacks run exactly once, last registered first, whether the chain
    /// completes, is canceled or unwinds. A panicking handler unwinds the
    /// chain too.
    pub fn on_finalize<F>(&mut self, callback: F)
    where
        F: FnOnce(Termination, &mut Slots) + 'p,
    {
        self.finalizers.push(Box::new(callback));
    }

    /// Branch processing `index` of the current handler
    ///
    /// # Errors
    /// [`ExecutionError::NoBranch`] if the handler has no such branch.
    pub fn branch(&self, index: usize) -> Result<&'p BranchProcessing, ExecutionError> {
        let node = self.processing.nodes().get(self.position);
        node.and_then(|node| node.branches.get(index))
            .ok_or_else(|| ExecutionError::NoBranch {
                handler: self.handler_name().unwrap_or_default().to_string(),
                index,
            })
    }

    /// Run `processing` to its end in a nested chain
    ///
    /// Slots of `processing` missing from `slots` are created fresh. The
    /// nested chain has its own finalizers; canceling it does not cancel this
    /// chain.
    ///
    /// # Errors
    /// Any error of the nested run, after its finalizers ran.
    pub fn route(
        &mut self,
        processing: &Processing,
        slots: &mut Slots,
    ) -> Result<Termination, ExecutionError> {
        tracing::debug!(
            from = self.handler_name().unwrap_or_default(),
            depth = self.depth + 1,
            "routing into nested chain"
        );
        processing.prepare(slots, Fill::All)?;
        Chain::new(processing, self.depth + 1).drive(slots)
    }

    pub(crate) fn drive(mut self, slots: &mut Slots) -> Result<Termination, ExecutionError> {
        self.transition(ChainState::Running)?;
        let outcome = {
            let mut guard = Unwinding {
                chain: &mut self,
                slots: &mut *slots,
                armed: true,
            };
            let outcome = guard.chain.walk(&mut *guard.slots);
            guard.armed = false;
            outcome
        };
        let termination = match &outcome {
            Ok(termination) => *termination,
            Err(_) => Termination::Unwound,
        };
        let transitioned = self.transition(termination.state());
        self.finalize(termination, slots);
        tracing::debug!(?termination, depth = self.depth, "chain ended");
        transitioned?;
        outcome
    }

    fn walk(&mut self, slots: &mut Slots) -> Result<Termination, ExecutionError> {
        let processing = self.processing;
        while let Some(node) = processing.nodes().get(self.position) {
            let handler = node.handler.as_ref();
            tracing::debug!(handler = handler.name(), depth = self.depth, "processing");
            let flow = match handler.process(self, slots) {
                Ok(flow) => flow,
                Err(err) => match as_abort(err) {
                    Ok(abort) => Flow::Abort(abort),
                    Err(source) => {
                        return Err(ExecutionError::Handler {
                            handler: handler.name().to_string(),
                            source,
                        })
                    }
                },
            };
            match flow {
                Flow::Continue if self.canceled => return Ok(Termination::Canceled),
                Flow::Continue => self.position += 1,
                Flow::Cancel => {
                    self.canceled = true;
                    return Ok(Termination::Canceled);
                }
                Flow::Abort(abort) => return Err(ExecutionError::Aborted(abort)),
            }
        }
        Ok(Termination::Completed)
    }

    fn transition(&mut self, to: ChainState) -> Result<(), ExecutionError> {
        validate_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }

    fn finalize(&mut self, termination: Termination, slots: &mut Slots) {
        while let Some(callback) = self.finalizers.pop() {
            callback(termination, slots);
        }
    }
}

/// Runs the finalizers of a chain whose handler panicked
struct Unwinding<'a, 'p> {
    chain: &'a mut Chain<'p>,
    slots: &'a mut Slots,
    armed: bool,
}

impl Drop for Unwinding<'_, '_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!(
            handler = self.chain.handler_name().unwrap_or_default(),
            depth = self.chain.depth,
            "handler panicked, unwinding chain"
        );
        self.chain.state = ChainState::Unwound;
        self.chain.finalize(Termination::Unwound, self.slots);
    }
}

/// Recover an abort raised as an error, directly or from a nested chain
fn as_abort(err: anyhow::Error) -> Result<Abort, anyhow::Error> {
    let err = match err.downcast::<Abort>() {
        Ok(abort) => return Ok(abort),
        Err(err) => err,
    };
    match err.downcast::<ExecutionError>() {
        Ok(ExecutionError::Aborted(abort)) => Ok(abort),
        Ok(other) => Err(other.into()),
        Err(err) => Err(err),
    }
}

impl fmt::Debug for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("position", &self.position)
            .field("depth", &self.depth)
            .field("state", &self.state)
            .field("canceled", &self.canceled)
            .field("finalizers", &self.finalizers.len())
            .finish()
    }
}
