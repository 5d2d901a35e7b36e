//! Error types: configuration errors, per-rule failures and the per-record
//! error collection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// A mistake in how a rule was declared.
///
/// These are raised to the caller when a rule runs (or when its options are
/// decoded) and are never recorded as validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A `must_be` rule with nothing to check.
    #[error("must_be requires at least one comparison operator for attribute `{field}`")]
    MissingDirective { field: String },

    /// The `when` option was not a mapping of field names to conditions.
    #[error("invalid `when` option provided to must_be, expected a mapping but found {found}")]
    MalformedWhen { found: String },

    /// A `when` predicate the record cannot answer.
    #[error("unknown predicate `{predicate}` for field `{field}`")]
    UnknownPredicate { field: String, predicate: String },

    /// A pattern that does not compile.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// An option with the wrong shape.
    #[error("invalid option `{option}`: {reason}")]
    InvalidOption { option: String, reason: String },

    /// A configuration document that could not be parsed.
    #[error("invalid configuration document: {0}")]
    Document(String),
}

impl ConfigError {
    pub(crate) fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of running one rule against one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid,
}

impl Verdict {
    pub fn is_valid(self) -> bool {
        self == Verdict::Valid
    }
}

/// A single failed rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleError {
    /// The validator that produced the error ("must_be", "date")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Name of the rule that failed, when one was declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    /// Extra metadata: the validated `field`, and for date rules the failing `bound`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, serde_json::Value>,
}

impl RuleError {
    /// Create a new rule error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            rule_name: None,
            params: HashMap::new(),
        }
    }

    /// Attach the rule name metadata.
    pub fn with_rule_name(mut self, rule_name: Option<String>) -> Self {
        self.rule_name = rule_name;
        self
    }

    /// Add a parameter to the error.
    pub fn param(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.params.insert(key.into(), v);
        }
        self
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RuleError {}

/// Errors collected on a record, keyed by attribute.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    /// Map of attribute name to list of errors for that attribute
    #[serde(flatten)]
    fields: HashMap<String, Vec<RuleError>>,
    /// Attributes in the order their first error was added
    #[serde(skip)]
    order: Vec<String>,
}

impl ValidationErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error for an attribute.
    pub fn add(&mut self, field: impl Into<String>, error: RuleError) {
        let field = field.into();
        if !self.fields.contains_key(&field) {
            self.order.push(field.clone());
        }
        self.fields.entry(field).or_default().push(error);
    }

    /// Merge another collection into this one.
    pub fn merge(&mut self, mut other: ValidationErrors) {
        for field in other.order {
            if let Some(errors) = other.fields.remove(&field) {
                for error in errors {
                    self.add(field.clone(), error);
                }
            }
        }
    }

    /// Drop every recorded error.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.order.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total number of errors.
    pub fn len(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    /// Errors for one attribute.
    pub fn get(&self, field: &str) -> Option<&Vec<RuleError>> {
        self.fields.get(field)
    }

    /// Messages for one attribute; empty when the attribute has no errors.
    pub fn messages(&self, field: &str) -> Vec<String> {
        self.get(field)
            .map(|errors| errors.iter().map(|e| e.message.clone()).collect())
            .unwrap_or_default()
    }

    /// Attributes with errors, in insertion order.
    pub fn field_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Every message prefixed with its humanized attribute name,
    /// e.g. `"Name must be blank."`.
    pub fn full_messages(&self) -> Vec<String> {
        self.order
            .iter()
            .flat_map(|field| {
                let label = humanize(field);
                self.fields
                    .get(field)
                    .into_iter()
                    .flatten()
                    .map(move |e| format!("{label} {}", e.message))
            })
            .collect()
    }

    /// Ok if no errors, Err otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: {} error(s)", self.len())
    }
}

impl std::error::Error for ValidationErrors {}

/// `"naming_day"` -> `"Naming day"`.
pub fn humanize(attribute: &str) -> String {
    let spaced = attribute
        .strip_suffix("_id")
        .unwrap_or(attribute)
        .replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_error_creation() {
        let error = RuleError::new("must_be", "must be blank.");
        assert_eq!(error.code, "must_be");
        assert_eq!(error.message, "must be blank.");
        assert!(error.rule_name.is_none());
        assert!(error.params.is_empty());
    }

    #[test]
    fn rule_error_carries_rule_name() {
        let error = RuleError::new("must_be", "must be present.")
            .with_rule_name(Some("email_required".to_string()))
            .param("attribute", "email");
        assert_eq!(error.rule_name.as_deref(), Some("email_required"));
        assert_eq!(error.params["attribute"], serde_json::json!("email"));
    }

    #[test]
    fn validation_errors_add_and_get() {
        let mut errors = ValidationErrors::new();
        errors.add("email", RuleError::new("must_be", "must be present."));
        errors.add("email", RuleError::new("must_be", "must be matching /@/."));
        errors.add("salary", RuleError::new("must_be", "must be greater than 10."));

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("email").unwrap().len(), 2);
        assert_eq!(errors.messages("salary"), vec!["must be greater than 10."]);
        assert!(errors.messages("name").is_empty());
    }

    #[test]
    fn full_messages_keep_insertion_order() {
        let mut errors = ValidationErrors::new();
        errors.add("name", RuleError::new("must_be", "must be blank."));
        errors.add("naming_day", RuleError::new("date", "must be present."));

        assert_eq!(
            errors.full_messages(),
            vec!["Name must be blank.", "Naming day must be present."]
        );
        assert_eq!(errors.field_names(), vec!["name", "naming_day"]);
    }

    #[test]
    fn errors_serialize_as_a_field_map() {
        let mut errors = ValidationErrors::new();
        errors.add("salary", RuleError::new("must_be", "must be greater than 10."));

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["salary"][0]["message"], "must be greater than 10.");
        assert_eq!(errors.full_messages(), vec!["Salary must be greater than 10."]);
    }

    #[test]
    fn validation_errors_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.add("field", RuleError::new("code", "message"));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn validation_errors_merge_and_clear() {
        let mut first = ValidationErrors::new();
        first.add("email", RuleError::new("must_be", "Invalid"));

        let mut second = ValidationErrors::new();
        second.add("bonus", RuleError::new("must_be", "Out of range"));

        first.merge(second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.field_names(), vec!["email", "bonus"]);

        first.clear();
        assert!(first.is_empty());
        assert!(first.field_names().is_empty());
    }

    #[test]
    fn config_error_messages() {
        let err = ConfigError::MissingDirective {
            field: "salary".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "must_be requires at least one comparison operator for attribute `salary`"
        );
    }

    #[test]
    fn humanize_attribute_names() {
        assert_eq!(humanize("name"), "Name");
        assert_eq!(humanize("naming_day"), "Naming day");
        assert_eq!(humanize("user_id"), "User");
    }
}
