//! Ally Processor
//!
//! Handler assemblies whose slot contracts are resolved at build time, and
//! the chains that execute them.
//!
//! # Core Concepts
//!
//! - [`Handler`]: one processing step, declaring the contexts it uses per slot
//! - [`Assembly`]: handlers plus before/after placement hints
//! - [`Processing`]: the built, immutable chain with one merged context per slot
//! - [`Chain`]: per-run cursor supporting cancel, finalizers and routing
//! - [`Branch`]: inner assemblies of a branching handler
//! - [`Abort`] / [`Batch`]: exclusion of failed items from a batch
//!
//! # Example
//!
//! ```rust
//! use ally_context::{defines, requires, types, ContextSpec};
//! use ally_processor::{Assembly, Chain, Declarations, Flow, Handler, SlotTypes, Slots};
//!
//! struct Greeter {
//!     declarations: Declarations,
//! }
//!
//! impl Handler for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     fn declarations(&self) -> &Declarations {
//!         &self.declarations
//!     }
//!
//!     fn process<'p>(&'p self, _: &mut Chain<'p>, slots: &mut Slots) -> anyhow::Result<Flow> {
//!         slots.record_mut("reply")?.set("text", "hello".to_string())?;
//!         Ok(Flow::Continue)
//!     }
//! }
//!
//! let reply = ContextSpec::define("Reply")
//!     .attribute("text", defines(types![String]))
//!     .build()?;
//! let mut assembly = Assembly::new("hello");
//! assembly.add(Greeter { declarations: Declarations::new().slot("reply", reply) });
//!
//! // The caller expects the text to be there
//! let expected = ContextSpec::define("Expected")
//!     .attribute("text", requires(types![String]))
//!     .build()?;
//! let processing = assembly.create(SlotTypes::new().slot("reply", expected))?;
//!
//! let slots = processing.run(Slots::new())?;
//! let text = slots.record("reply")?.get::<String>("text");
//! assert_eq!(text.map(String::as_str), Some("hello"));
//! # Ok::<(), anyhow::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod abort;
mod assembly;
mod branch;
mod chain;
mod config;
mod error;
mod handler;
mod ordering;
mod processing;
mod resolver;
mod slots;

pub use abort::{Abort, Batch, ItemKey};
pub use assembly::{Assembly, CREATE_SOURCE};
pub use branch::{Branch, BranchProcessing};
pub use chain::{allowed_transitions, validate_transition, Chain, ChainState, Flow, Termination};
pub use config::{AssemblyConfig, Fill};
pub use error::{BranchError, ConfigError, ExecutionError, SetupError};
pub use handler::{Declarations, Handler, SlotTypes};
pub use ordering::Position;
pub use processing::{BuildReport, Processing, UnusedAttribute};
pub use slots::Slots;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing handlers and building assemblies
    pub use crate::{
        Abort, Assembly, Batch, Branch, Chain, Declarations, ExecutionError, Fill, Flow, Handler,
        Position, Processing, SetupError, SlotTypes, Slots, Termination,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
