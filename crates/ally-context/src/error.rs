//! Context declaration and record errors

/// Error raised while declaring a context or using a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// Context name is empty
    #[error("invalid context name '{0}'")]
    InvalidContextName(String),

    /// Attribute name is not identifier-like
    #[error("invalid attribute name '{attribute}' in context '{context}'")]
    InvalidAttributeName {
        /// Context being declared
        context: String,
        /// Offending name
        attribute: String,
    },

    /// Attribute declared without any accepted type
    #[error("attribute '{attribute}' in context '{context}' needs at least one type")]
    EmptyTypes {
        /// Context being declared
        context: String,
        /// Offending attribute
        attribute: String,
    },

    /// Attribute declared twice
    #[error("attribute '{attribute}' declared twice in context '{context}'")]
    DuplicateAttribute {
        /// Context being declared
        context: String,
        /// Offending attribute
        attribute: String,
    },

    /// Record has no such attribute
    #[error("context '{context}' does not declare attribute '{attribute}'")]
    Undeclared {
        /// Context of the record
        context: String,
        /// Requested attribute
        attribute: String,
    },

    /// Value type is not accepted by the attribute
    #[error("invalid value of type {actual} for '{context}.{attribute}', expected one of {expected}")]
    TypeMismatch {
        /// Context of the record
        context: String,
        /// Target attribute
        attribute: String,
        /// Accepted types
        expected: String,
        /// Type of the rejected value
        actual: &'static str,
    },

    /// Record holds no value of the requested type
    #[error("no value of type {requested} for '{context}.{attribute}'")]
    Missing {
        /// Context of the record
        context: String,
        /// Requested attribute
        attribute: String,
        /// Requested type
        requested: &'static str,
    },
}

impl ContextError {
    /// Check if the error comes from a malformed declaration
    #[inline]
    #[must_use]
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidContextName(_)
                | Self::InvalidAttributeName { .. }
                | Self::EmptyTypes { .. }
                | Self::DuplicateAttribute { .. }
        )
    }
}
