//! Error types for assemblies and their execution
//!
//! Build-time problems ([`SetupError`], [`BranchError`], [`ConfigError`]) are
//! fatal and never yield a [`crate::Processing`]. Run-time problems surface as
//! [`ExecutionError`].

use crate::abort::Abort;
use crate::chain::ChainState;
use ally_context::ContextError;

/// Build-time error
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Malformed context declaration
    #[error("context declaration failed: {0}")]
    Context(#[from] ContextError),

    /// A handler or slot name is not identifier-like
    #[error("invalid {kind} name '{name}'")]
    InvalidName {
        /// `handler` or `slot`
        kind: &'static str,
        /// Offending name
        name: String,
    },

    /// Two handlers share a name in one assembly
    #[error("handler '{0}' added twice")]
    DuplicateHandler(String),

    /// No handler with that name in the assembly
    #[error("no handler named '{0}'")]
    UnknownHandler(String),

    /// A handler declares the same slot twice
    #[error("'{handler}' declares slot '{slot}' twice")]
    DuplicateSlot {
        /// Declaring handler (or `<create>`)
        handler: String,
        /// Slot name
        slot: String,
    },

    /// A before/after anchor names a handler that is not in the assembly
    #[error("'{handler}' is positioned relative to unknown handler '{anchor}'")]
    UnknownAnchor {
        /// Positioned handler
        handler: String,
        /// Missing anchor
        anchor: String,
    },

    /// The before/after constraints contain a cycle
    #[error("ordering cycle between handlers {}", .0.join(", "))]
    OrderingCycle(Vec<String>),

    /// A required attribute has no provider
    #[error("unresolved attribute '{slot}.{attribute}' required by '{required_by}'")]
    UnresolvedAttribute {
        /// Slot name
        slot: String,
        /// Attribute name
        attribute: String,
        /// Requiring handler
        required_by: String,
    },

    /// A required attribute is provided with fewer types than required
    #[error(
        "attribute '{slot}.{attribute}' required by '{required_by}' as {required} but provided as {provided}"
    )]
    IncompatibleAttribute {
        /// Slot name
        slot: String,
        /// Attribute name
        attribute: String,
        /// Requiring handler
        required_by: String,
        /// Required types
        required: String,
        /// Provided types
        provided: String,
    },

    /// Two providers define the same attribute with unrelated type sets
    #[error(
        "ambiguous attribute '{slot}.{attribute}': {first} from '{first_by}' conflicts with {second} from '{second_by}'"
    )]
    AmbiguousAttribute {
        /// Slot name
        slot: String,
        /// Attribute name
        attribute: String,
        /// Types of the earlier provider
        first: String,
        /// Earlier provider
        first_by: String,
        /// Types of the later provider
        second: String,
        /// Later provider
        second_by: String,
    },

    /// Malformed branch of a branching handler
    #[error("branch {index} of '{handler}': {source}")]
    Branch {
        /// Branching handler
        handler: String,
        /// Branch index
        index: usize,
        /// Mapping problem
        #[source]
        source: BranchError,
    },
}

impl SetupError {
    /// Check if the error comes from attribute resolution
    #[inline]
    #[must_use]
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedAttribute { .. }
                | Self::IncompatibleAttribute { .. }
                | Self::AmbiguousAttribute { .. }
        )
    }

    /// Check if the error comes from handler ordering
    #[inline]
    #[must_use]
    pub fn is_ordering_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateHandler(_) | Self::UnknownAnchor { .. } | Self::OrderingCycle(_)
        )
    }
}

/// Malformed branch slot mapping
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchError {
    /// Mapped or local slot is not used by the branch assembly
    #[error("slot '{0}' is not used by the branch")]
    UnknownSlot(String),

    /// Inner slot mapped twice, or both mapped and local
    #[error("slot '{0}' is mapped more than once")]
    DuplicateMapping(String),

    /// Two inner slots share one outer slot
    #[error("outer slot '{0}' is shared by more than one branch slot")]
    OuterCollision(String),
}

/// Run-time error
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// A handler failed; the chain was unwound
    #[error("handler '{handler}' failed: {source}")]
    Handler {
        /// Failing handler
        handler: String,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },

    /// Items were aborted and no batch owner caught it
    #[error("{0}")]
    Aborted(Abort),

    /// Slot is not part of the processing
    #[error("unknown slot '{0}'")]
    UnknownSlot(String),

    /// Slot is part of the processing but absent from this run
    #[error("slot '{0}' has no record in this run")]
    MissingSlot(String),

    /// A supplied record was not created for this slot
    #[error("record for slot '{slot}' was created for context '{context}'")]
    ForeignRecord {
        /// Slot name
        slot: String,
        /// Context the record was created for
        context: String,
    },

    /// A handler asked for a branch it does not own
    #[error("'{handler}' has no branch {index}")]
    NoBranch {
        /// Handler name
        handler: String,
        /// Requested branch index
        index: usize,
    },

    /// Chain state machine violation
    #[error("illegal chain transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: ChainState,
        /// Requested state
        to: ChainState,
    },

    /// Record misuse
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl ExecutionError {
    /// Check if the error is an uncaught abort
    #[inline]
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// Extract the abort, or give the error back
    ///
    /// # Errors
    /// Returns `self` if it is not an abort.
    pub fn into_abort(self) -> Result<Abort, Self> {
        match self {
            Self::Aborted(abort) => Ok(abort),
            other => Err(other),
        }
    }
}

/// Invalid engine configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed into an [`crate::AssemblyConfig`]
    #[error("invalid assembly configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
