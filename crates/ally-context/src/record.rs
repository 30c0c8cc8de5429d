//! Context records
//!
//! A [`Record`] is one instance of a [`ContextSpec`]. Values are stored per
//! field index and type checked against the declared [`crate::TypeSet`] on write.

use crate::attribute::Attribute;
use crate::context::ContextSpec;
use crate::error::ContextError;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

type Value = Box<dyn Any + Send + Sync>;

/// Instance of a context
pub struct Record {
    spec: Arc<ContextSpec>,
    values: Vec<Option<Value>>,
}

impl Record {
    /// Create an empty record for a spec
    #[must_use]
    pub fn new(spec: Arc<ContextSpec>) -> Self {
        let values = std::iter::repeat_with(|| None).take(spec.len()).collect();
        Self { spec, values }
    }

    /// The record's spec
    #[inline]
    #[must_use]
    pub fn spec(&self) -> &Arc<ContextSpec> {
        &self.spec
    }

    /// Check if the spec declares an attribute
    #[inline]
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.spec.declares(name)
    }

    /// Check if a value is held for the attribute name
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.slot(name).is_some_and(|value| value.is_some())
    }

    /// Check if a value is held for `attribute` and its runtime type is one
    /// of the attribute's types
    #[must_use]
    pub fn contains(&self, attribute: &Attribute) -> bool {
        match self.slot(attribute.name()) {
            Some(Some(value)) => {
                let value: &(dyn Any + Send + Sync) = &**value;
                attribute.types().contains_id(value.type_id())
            }
            _ => false,
        }
    }

    /// Store a value
    ///
    /// # Errors
    /// [`ContextError::Undeclared`] if the attribute does not exist,
    /// [`ContextError::TypeMismatch`] if `T` is not an accepted type.
    pub fn set<T: Any + Send + Sync>(&mut self, name: &str, value: T) -> Result<(), ContextError> {
        let index = self.index_of(name)?;
        let accepted = self
            .spec
            .field(index)
            .is_some_and(|attr| attr.types().contains_id(TypeId::of::<T>()));
        if !accepted {
            return Err(ContextError::TypeMismatch {
                context: self.spec.name().to_string(),
                attribute: name.to_string(),
                expected: self
                    .spec
                    .field(index)
                    .map(|attr| attr.types().to_string())
                    .unwrap_or_default(),
                actual: std::any::type_name::<T>(),
            });
        }
        self.values[index] = Some(Box::new(value));
        Ok(())
    }

    /// Borrow a value of type `T`
    #[must_use]
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.slot(name)?.as_ref()?.downcast_ref::<T>()
    }

    /// Mutably borrow a value of type `T`
    #[must_use]
    pub fn get_mut<T: Any>(&mut self, name: &str) -> Option<&mut T> {
        let index = self.spec.field_index(name)?;
        self.values[index].as_mut()?.downcast_mut::<T>()
    }

    /// Borrow a value that must be present
    ///
    /// # Errors
    /// [`ContextError::Undeclared`] or [`ContextError::Missing`].
    pub fn try_get<T: Any>(&self, name: &str) -> Result<&T, ContextError> {
        self.index_of(name)?;
        self.get(name).ok_or_else(|| self.missing::<T>(name))
    }

    /// Mutably borrow a value that must be present
    ///
    /// # Errors
    /// [`ContextError::Undeclared`] or [`ContextError::Missing`].
    pub fn try_get_mut<T: Any>(&mut self, name: &str) -> Result<&mut T, ContextError> {
        let index = self.index_of(name)?;
        let err = self.missing::<T>(name);
        self.values[index]
            .as_mut()
            .and_then(|value| value.downcast_mut::<T>())
            .ok_or(err)
    }

    /// Move a value of type `T` out of the record
    ///
    /// A value of another type is left in place.
    pub fn take<T: Any>(&mut self, name: &str) -> Option<T> {
        let index = self.spec.field_index(name)?;
        match self.values[index].take() {
            Some(value) => match value.downcast::<T>() {
                Ok(value) => Some(*value),
                Err(value) => {
                    self.values[index] = Some(value);
                    None
                }
            },
            None => None,
        }
    }

    /// Clear a value, returns true if one was held
    pub fn remove(&mut self, name: &str) -> bool {
        match self.spec.field_index(name) {
            Some(index) => self.values[index].take().is_some(),
            None => false,
        }
    }

    /// Names of the attributes currently holding a value
    pub fn assigned(&self) -> impl Iterator<Item = &str> {
        self.spec
            .attributes()
            .zip(&self.values)
            .filter(|(_, value)| value.is_some())
            .map(|(attr, _)| attr.name())
    }

    fn slot(&self, name: &str) -> Option<&Option<Value>> {
        self.spec.field_index(name).map(|index| &self.values[index])
    }

    fn index_of(&self, name: &str) -> Result<usize, ContextError> {
        self.spec
            .field_index(name)
            .ok_or_else(|| ContextError::Undeclared {
                context: self.spec.name().to_string(),
                attribute: name.to_string(),
            })
    }

    fn missing<T: Any>(&self, name: &str) -> ContextError {
        ContextError::Missing {
            context: self.spec.name().to_string(),
            attribute: name.to_string(),
            requested: std::any::type_name::<T>(),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("context", &self.spec.name())
            .field("assigned", &self.assigned().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{defines, optional, requires};
    use crate::types;

    fn spec() -> Arc<ContextSpec> {
        Arc::new(
            ContextSpec::define("Request")
                .attribute("method", defines(types![String]))
                .attribute("id", optional(types![i64, String]))
                .attribute("parent", optional(types![Record]))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn new_record_is_empty() {
        let record = Record::new(spec());
        assert!(!record.has("method"));
        assert_eq!(record.assigned().count(), 0);
    }

    #[test]
    fn set_and_get() {
        let mut record = Record::new(spec());
        record.set("method", "GET".to_string()).unwrap();
        assert_eq!(record.get::<String>("method").map(String::as_str), Some("GET"));
        assert!(record.has("method"));
    }

    #[test]
    fn set_rejects_undeclared() {
        let mut record = Record::new(spec());
        let err = record.set("uri", "/".to_string()).unwrap_err();
        assert!(matches!(err, ContextError::Undeclared { .. }));
    }

    #[test]
    fn set_rejects_wrong_type() {
        let mut record = Record::new(spec());
        let err = record.set("method", 5_i64).unwrap_err();
        assert!(matches!(err, ContextError::TypeMismatch { actual: "i64", .. }));
        assert!(!record.has("method"));
    }

    #[test]
    fn contains_checks_runtime_type() {
        let spec = spec();
        let mut record = Record::new(spec.clone());
        record.set("id", 7_i64).unwrap();

        let id = spec.attribute("id").unwrap();
        assert!(record.contains(id));

        let id_as_string = ContextSpec::define("Other")
            .attribute("id", requires(types![String]))
            .build()
            .unwrap();
        assert!(!record.contains(id_as_string.attribute("id").unwrap()));
        assert!(!record.contains(spec.attribute("method").unwrap()));
    }

    #[test]
    fn union_attribute_accepts_each_type() {
        let mut record = Record::new(spec());
        record.set("id", 1_i64).unwrap();
        record.set("id", "one".to_string()).unwrap();
        assert_eq!(record.get::<i64>("id"), None);
        assert_eq!(record.get::<String>("id").map(String::as_str), Some("one"));
    }

    #[test]
    fn nested_record() {
        let mut parent = Record::new(spec());
        parent.set("method", "POST".to_string()).unwrap();

        let mut child = Record::new(spec());
        child.set("parent", parent).unwrap();

        let parent = child.get::<Record>("parent").unwrap();
        assert_eq!(parent.get::<String>("method").map(String::as_str), Some("POST"));
    }

    #[test]
    fn take_leaves_other_types() {
        let mut record = Record::new(spec());
        record.set("id", 3_i64).unwrap();
        assert_eq!(record.take::<String>("id"), None);
        assert_eq!(record.take::<i64>("id"), Some(3));
        assert!(!record.has("id"));
    }

    #[test]
    fn try_get_reports_missing() {
        let record = Record::new(spec());
        let err = record.try_get::<String>("method").unwrap_err();
        assert!(matches!(err, ContextError::Missing { .. }));
        let err = record.try_get::<String>("nope").unwrap_err();
        assert!(matches!(err, ContextError::Undeclared { .. }));
    }

    #[test]
    fn get_mut_and_remove() {
        let mut record = Record::new(spec());
        record.set("method", "get".to_string()).unwrap();
        record.try_get_mut::<String>("method").unwrap().make_ascii_uppercase();
        assert_eq!(record.get::<String>("method").map(String::as_str), Some("GET"));
        assert!(record.remove("method"));
        assert!(!record.remove("method"));
    }

    #[test]
    fn debug_lists_assigned() {
        let mut record = Record::new(spec());
        record.set("method", "GET".to_string()).unwrap();
        assert_eq!(
            format!("{record:?}"),
            r#"Record { context: "Request", assigned: ["method"] }"#
        );
    }
}
