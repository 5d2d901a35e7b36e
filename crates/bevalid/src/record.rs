//! The host model seam.

use crate::error::ValidationErrors;
use crate::value::Value;
use std::collections::HashMap;

/// What a rule needs from the model it validates.
///
/// Hosts implement this for their record types. Only [`Record::read`] and the
/// two error accessors are required; the remaining methods have defaults
/// derived from `read`.
pub trait Record {
    /// Current (type-converted) value of a field. Unknown fields read as `Nil`.
    fn read(&self, field: &str) -> Value;

    /// The field's original textual form, before type conversion.
    ///
    /// A date column fed `"2021-02-30"` reads as `Nil` but keeps its original
    /// text here so failure messages can quote what the user typed.
    fn read_before_type_cast(&self, field: &str) -> Option<String> {
        let value = self.read(field);
        if value.is_nil() {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Call a zero-argument predicate on a field's value.
    ///
    /// Returns `None` when the predicate is unknown for that field.
    fn call_predicate(&self, field: &str, predicate: &str) -> Option<bool> {
        self.read(field).predicate(predicate)
    }

    /// The record's error collection.
    fn errors(&self) -> &ValidationErrors;

    /// Mutable access to the record's error collection.
    fn errors_mut(&mut self) -> &mut ValidationErrors;

    /// An alternative error collection (e.g. warnings), selected by name.
    fn errors_at(&mut self, level: &str) -> Option<&mut ValidationErrors> {
        let _ = level;
        None
    }

    /// Drop every recorded error before a validation run. Records exposing
    /// extra levels through [`Record::errors_at`] should clear those too.
    fn clear_errors(&mut self) {
        self.errors_mut().clear();
    }
}

/// A map-backed [`Record`], handy for hosts without a model layer and for tests.
///
/// ```rust,ignore
/// use bevalid::prelude::*;
///
/// let record = MapRecord::new()
///     .with("salary", 10)
///     .with("email", Value::Nil);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapRecord {
    fields: HashMap<String, Value>,
    originals: HashMap<String, String>,
    predicates: HashMap<(String, String), bool>,
    levels: HashMap<String, ValidationErrors>,
    errors: ValidationErrors,
}

impl MapRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a field value together with the raw text it was converted from.
    pub fn with_original(
        mut self,
        field: impl Into<String>,
        value: impl Into<Value>,
        original: impl Into<String>,
    ) -> Self {
        let field = field.into();
        self.originals.insert(field.clone(), original.into());
        self.fields.insert(field, value.into());
        self
    }

    /// Answer a custom predicate for a field, e.g. `status` / `premium?`.
    pub fn with_predicate(
        mut self,
        field: impl Into<String>,
        predicate: impl Into<String>,
        answer: bool,
    ) -> Self {
        self.predicates
            .insert((field.into(), predicate.into()), answer);
        self
    }

    /// Register an additional named error collection.
    pub fn with_error_level(mut self, level: impl Into<String>) -> Self {
        self.levels.insert(level.into(), ValidationErrors::new());
        self
    }

    /// Overwrite a field value in place, dropping any recorded original text.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        self.originals.remove(&field);
        self.fields.insert(field, value.into());
    }

    /// Errors recorded at a named level.
    pub fn level(&self, level: &str) -> Option<&ValidationErrors> {
        self.levels.get(level)
    }
}

impl Record for MapRecord {
    fn read(&self, field: &str) -> Value {
        self.fields.get(field).cloned().unwrap_or_default()
    }

    fn read_before_type_cast(&self, field: &str) -> Option<String> {
        match self.originals.get(field) {
            Some(original) => Some(original.clone()),
            None => {
                let value = self.read(field);
                (!value.is_nil()).then(|| value.to_string())
            }
        }
    }

    fn call_predicate(&self, field: &str, predicate: &str) -> Option<bool> {
        self.predicates
            .get(&(field.to_string(), predicate.to_string()))
            .copied()
            .or_else(|| self.read(field).predicate(predicate))
    }

    fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    fn errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.errors
    }

    fn errors_at(&mut self, level: &str) -> Option<&mut ValidationErrors> {
        self.levels.get_mut(level)
    }

    fn clear_errors(&mut self) {
        self.errors.clear();
        self.levels.values_mut().for_each(ValidationErrors::clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn unknown_fields_read_as_nil() {
        let record = MapRecord::new();
        assert!(record.read("missing").is_nil());
        assert_eq!(record.read_before_type_cast("missing"), None);
    }

    #[test]
    fn original_text_survives_conversion() {
        let record = MapRecord::new().with_original("birthday", Value::Nil, "2021-02-30");
        assert!(record.read("birthday").is_nil());
        assert_eq!(
            record.read_before_type_cast("birthday").as_deref(),
            Some("2021-02-30")
        );

        let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let record = MapRecord::new().with("birthday", date);
        assert_eq!(
            record.read_before_type_cast("birthday").as_deref(),
            Some("2021-01-01")
        );
    }

    #[test]
    fn custom_predicates_take_precedence() {
        let record = MapRecord::new()
            .with("status", "gold")
            .with_predicate("status", "premium?", true)
            .with("salary", 0);
        assert_eq!(record.call_predicate("status", "premium?"), Some(true));
        assert_eq!(record.call_predicate("salary", "zero?"), Some(true));
        assert_eq!(record.call_predicate("salary", "premium?"), None);
    }

    #[test]
    fn error_levels_are_opt_in() {
        let mut record = MapRecord::new().with_error_level("warnings");
        assert!(record.errors_at("warnings").is_some());
        assert!(record.errors_at("notices").is_none());
        assert!(record.level("warnings").unwrap().is_empty());
    }
}
