//! Attribute declarations
//!
//! [`requires`], [`defines`], [`optional`] and [`defines_if`] build unnamed
//! [`Declaration`]s; a [`crate::ContextBuilder`] binds them to names.

use crate::types::TypeSet;
use std::fmt;

/// Capability status of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The producer of the context must provide a value
    Required,

    /// The owning handler may provide a value
    Defined,

    /// The value may or may not be present, and may be provided or changed
    Optional,
}

impl Status {
    /// Check if the attribute is an obligation on the providing side
    #[inline]
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(self, Self::Required)
    }

    /// Check if the attribute can supply a value
    #[inline]
    #[must_use]
    pub fn provides(self) -> bool {
        matches!(self, Self::Defined | Self::Optional)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Required => write!(f, "required"),
            Status::Defined => write!(f, "defined"),
            Status::Optional => write!(f, "optional"),
        }
    }
}

/// Unnamed attribute declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub(crate) status: Status,
    pub(crate) types: TypeSet,
    pub(crate) doc: Option<String>,
    pub(crate) conditional: bool,
}

impl Declaration {
    /// Create a declaration with the given status
    #[inline]
    #[must_use]
    pub fn new(status: Status, types: TypeSet) -> Self {
        Self {
            status,
            types,
            doc: None,
            conditional: false,
        }
    }

    /// Attach documentation
    #[inline]
    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Declared status
    #[inline]
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Accepted types
    #[inline]
    #[must_use]
    pub fn types(&self) -> &TypeSet {
        &self.types
    }
}

/// Required attribute: the context is only valid with a value of one of `types`
#[inline]
#[must_use]
pub fn requires(types: TypeSet) -> Declaration {
    Declaration::new(Status::Required, types)
}

/// Defined attribute: the handler can provide a value, but is not obliged to
#[inline]
#[must_use]
pub fn defines(types: TypeSet) -> Declaration {
    Declaration::new(Status::Defined, types)
}

/// Optional attribute: valid with or without a value
#[inline]
#[must_use]
pub fn optional(types: TypeSet) -> Declaration {
    Declaration::new(Status::Optional, types)
}

/// Defined attribute that only exists if another contributor references it
///
/// Never reported as unused. Handlers check [`crate::Record::declares`]
/// before setting it.
#[inline]
#[must_use]
pub fn defines_if(types: TypeSet) -> Declaration {
    Declaration {
        conditional: true,
        ..Declaration::new(Status::Defined, types)
    }
}

/// Named attribute of a [`crate::ContextSpec`]
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    status: Status,
    types: TypeSet,
    doc: Option<String>,
    conditional: bool,
}

impl Attribute {
    pub(crate) fn bind(name: String, declaration: Declaration) -> Self {
        Self {
            name,
            status: declaration.status,
            types: declaration.types,
            doc: declaration.doc,
            conditional: declaration.conditional,
        }
    }

    /// Attribute name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability status
    #[inline]
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Accepted value types
    #[inline]
    #[must_use]
    pub fn types(&self) -> &TypeSet {
        &self.types
    }

    /// Documentation, if any
    #[inline]
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Check if the attribute was declared with [`defines_if`]
    #[inline]
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.conditional
    }

    /// Unnamed copy of this attribute, for re-binding under another context
    #[must_use]
    pub fn declaration(&self) -> Declaration {
        Declaration {
            status: self.status,
            types: self.types.clone(),
            doc: self.doc.clone(),
            conditional: self.conditional,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, self.name, self.types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    #[test]
    fn declaration_status() {
        assert_eq!(requires(types![i64]).status(), Status::Required);
        assert_eq!(defines(types![i64]).status(), Status::Defined);
        assert_eq!(optional(types![i64]).status(), Status::Optional);
    }

    #[test]
    fn declaration_doc() {
        let decl = defines(types![String]).doc("The request method");
        assert_eq!(decl.doc.as_deref(), Some("The request method"));
    }

    #[test]
    fn defines_if_is_conditional_defined() {
        let decl = defines_if(types![String]);
        assert_eq!(decl.status(), Status::Defined);
        assert!(decl.conditional);
        assert!(!defines(types![String]).conditional);
    }

    #[test]
    fn status_provides() {
        assert!(!Status::Required.provides());
        assert!(Status::Defined.provides());
        assert!(Status::Optional.provides());
        assert!(Status::Required.is_required());
    }

    #[test]
    fn attribute_round_trips_declaration() {
        let decl = optional(types![bool]).doc("flag");
        let attr = Attribute::bind("flag".to_string(), decl.clone());
        assert_eq!(attr.declaration(), decl);
        assert_eq!(attr.to_string(), "optional flag: {bool}");
    }
}
