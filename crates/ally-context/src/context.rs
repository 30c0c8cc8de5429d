//! Context specifications
//!
//! A [`ContextSpec`] is the record type of a slot: an ordered map from
//! attribute name to [`Attribute`]. Specs never inherit from each other;
//! compatibility is purely structural.

use crate::attribute::{Attribute, Declaration};
use crate::error::ContextError;
use crate::types::TypeTag;
use indexmap::IndexMap;
use std::fmt;

/// Ordered attribute contract of a context
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSpec {
    name: String,
    attributes: IndexMap<String, Attribute>,
}

/// Required attribute that a provider cannot satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsatisfied {
    /// Attribute name
    pub attribute: String,

    /// Required types the provider does not declare (all of them if the
    /// provider lacks the attribute)
    pub missing: Vec<TypeTag>,

    /// Whether the provider declares the attribute at all
    pub declared: bool,
}

impl ContextSpec {
    /// Start declaring a context
    #[inline]
    #[must_use]
    pub fn define(name: impl Into<String>) -> ContextBuilder {
        ContextBuilder {
            name: name.into(),
            attributes: IndexMap::new(),
            error: None,
        }
    }

    /// Context name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lookup an attribute by name
    #[inline]
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Stable field index of an attribute
    #[inline]
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.attributes.get_index_of(name)
    }

    /// Attribute at a field index
    #[inline]
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get_index(index).map(|(_, attr)| attr)
    }

    /// Check if an attribute is declared
    #[inline]
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Iterate attributes in declaration order
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Iterate the required attributes
    pub fn required(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values().filter(|a| a.status().is_required())
    }

    /// Number of attributes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if no attributes are declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Structural compatibility of this contract with a provider
    ///
    /// Holds iff every required attribute of `self` is declared by `provider`
    /// with a superset of the required types. Defined and optional
    /// attributes of `self` are not obligations.
    #[must_use]
    pub fn is_compatible_with(&self, provider: &ContextSpec) -> bool {
        self.required().all(|attr| {
            provider
                .attribute(attr.name())
                .is_some_and(|other| attr.types().is_subset(other.types()))
        })
    }

    /// Required attributes of `self` that `provider` cannot satisfy
    #[must_use]
    pub fn unsatisfied_by(&self, provider: &ContextSpec) -> Vec<Unsatisfied> {
        self.required()
            .filter_map(|attr| match provider.attribute(attr.name()) {
                None => Some(Unsatisfied {
                    attribute: attr.name().to_string(),
                    missing: attr.types().iter().copied().collect(),
                    declared: false,
                }),
                Some(other) => {
                    let missing = attr.types().missing_from(other.types());
                    (!missing.is_empty()).then(|| Unsatisfied {
                        attribute: attr.name().to_string(),
                        missing,
                        declared: true,
                    })
                }
            })
            .collect()
    }
}

impl fmt::Display for ContextSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, attr) in self.attributes.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{attr}")?;
        }
        f.write_str(")")
    }
}

/// Builder for [`ContextSpec`]
///
/// The first malformed declaration is kept and reported by [`ContextBuilder::build`].
#[derive(Debug)]
pub struct ContextBuilder {
    name: String,
    attributes: IndexMap<String, Attribute>,
    error: Option<ContextError>,
}

impl ContextBuilder {
    /// Declare an attribute
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, declaration: Declaration) -> Self {
        if self.error.is_some() {
            return self;
        }
        let name = name.into();
        if let Err(err) = self.check(&name, &declaration) {
            self.error = Some(err);
            return self;
        }
        self.attributes
            .insert(name.clone(), Attribute::bind(name, declaration));
        self
    }

    fn check(&self, name: &str, declaration: &Declaration) -> Result<(), ContextError> {
        if !is_identifier(name) {
            return Err(ContextError::InvalidAttributeName {
                context: self.name.clone(),
                attribute: name.to_string(),
            });
        }
        if declaration.types().is_empty() {
            return Err(ContextError::EmptyTypes {
                context: self.name.clone(),
                attribute: name.to_string(),
            });
        }
        if self.attributes.contains_key(name) {
            return Err(ContextError::DuplicateAttribute {
                context: self.name.clone(),
                attribute: name.to_string(),
            });
        }
        Ok(())
    }

    /// Finish the declaration
    ///
    /// # Errors
    /// Returns the first malformed declaration, or an empty context name.
    pub fn build(self) -> Result<ContextSpec, ContextError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.name.trim().is_empty() {
            return Err(ContextError::InvalidContextName(self.name));
        }
        Ok(ContextSpec {
            name: self.name,
            attributes: self.attributes,
        })
    }
}

/// Check if `name` is a valid attribute, slot or handler name: an ASCII
/// letter or underscore followed by letters, digits or underscores
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
