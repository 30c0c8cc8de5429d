//! Ally Context System
//!
//! Typed capability contracts for duck-typed records.
//!
//! # Core Concepts
//!
//! - [`TypeTag`] / [`TypeSet`]: the closed set of value types an attribute accepts
//! - [`Attribute`]: a named capability with a [`Status`] (required, defined, optional)
//! - [`ContextSpec`]: an ordered set of attributes, compared structurally
//! - [`Record`]: a context instance holding values for the declared attributes
//!
//! # Example
//!
//! ```rust
//! use ally_context::{defines, requires, types, ContextSpec};
//!
//! let consumer = ContextSpec::define("Invoker")
//!     .attribute("location", requires(types![String]))
//!     .build()
//!     .unwrap();
//! let provider = ContextSpec::define("InvokerProvider")
//!     .attribute("location", defines(types![String, i64]))
//!     .build()
//!     .unwrap();
//!
//! assert!(consumer.is_compatible_with(&provider));
//!
//! // Defined attributes are not obligations on the other side
//! let empty = ContextSpec::define("Empty").build().unwrap();
//! assert!(provider.is_compatible_with(&empty));
//! assert!(!consumer.is_compatible_with(&empty));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod attribute;
mod context;
mod error;
mod record;
mod types;

pub use attribute::{defines, defines_if, optional, requires, Attribute, Declaration, Status};
pub use context::{is_identifier, ContextBuilder, ContextSpec, Unsatisfied};
pub use error::ContextError;
pub use record::Record;
pub use types::{TypeSet, TypeTag};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for declaring contexts
    pub use crate::{
        defines, defines_if, optional, requires, types, Attribute, ContextError, ContextSpec,
        Record, Status, TypeSet, TypeTag,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
