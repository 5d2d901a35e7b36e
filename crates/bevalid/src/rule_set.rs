//! Registering rules against fields and running them over a record.

use crate::config::ValidationContext;
use crate::date::DateRule;
use crate::error::{ConfigError, Verdict};
use crate::must_be::MustBe;
use crate::record::Record;
use serde_json::Value as Json;

/// A rule of either kind.
#[derive(Debug, Clone)]
pub enum FieldRule {
    MustBe(MustBe),
    Date(DateRule),
}

impl FieldRule {
    /// Run the rule for `field`, recording failures on the record.
    pub fn validate_each(
        &self,
        ctx: &ValidationContext,
        record: &mut dyn Record,
        field: &str,
    ) -> Result<Verdict, ConfigError> {
        match self {
            FieldRule::MustBe(rule) => rule.validate_each(ctx, record, field),
            FieldRule::Date(rule) => Ok(rule.validate_each(ctx, record, field)),
        }
    }
}

impl From<MustBe> for FieldRule {
    fn from(rule: MustBe) -> Self {
        FieldRule::MustBe(rule)
    }
}

impl From<DateRule> for FieldRule {
    fn from(rule: DateRule) -> Self {
        FieldRule::Date(rule)
    }
}

/// Rules declared for a model, run in declaration order.
///
/// ## Example
///
/// ```rust,ignore
/// use bevalid::prelude::*;
///
/// let rules = RuleSet::new()
///     .must_be("salary", MustBe::new().greater_than(0))
///     .date("birthday", DateRule::new().before(DateBound::Today));
///
/// let valid = rules.validate(&ctx, &mut record)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(String, FieldRule)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule of any kind for `field`.
    pub fn add(mut self, field: impl Into<String>, rule: impl Into<FieldRule>) -> Self {
        self.rules.push((field.into(), rule.into()));
        self
    }

    pub fn must_be(self, field: impl Into<String>, rule: MustBe) -> Self {
        self.add(field, rule)
    }

    pub fn date(self, field: impl Into<String>, rule: DateRule) -> Self {
        self.add(field, rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules declared for one field.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldRule> + 'a {
        self.rules
            .iter()
            .filter(move |(f, _)| f == field)
            .map(|(_, rule)| rule)
    }

    /// Clear the record's errors (every level, see [`Record::clear_errors`]),
    /// run every rule and report whether the default collection ended up
    /// empty.
    ///
    /// A configuration error stops the run and is returned as-is.
    pub fn validate(
        &self,
        ctx: &ValidationContext,
        record: &mut dyn Record,
    ) -> Result<bool, ConfigError> {
        record.clear_errors();
        for (field, rule) in &self.rules {
            rule.validate_each(ctx, record, field)?;
        }
        let valid = record.errors().is_empty();
        trace_debug!(rules = self.rules.len(), errors = record.errors().len(), valid, "record validated");
        Ok(valid)
    }

    /// Decode a rule set from `{"<field>": {"must_be": {...}, "date": {...}}}`.
    ///
    /// Fields run in document order; within a field `date` runs before
    /// `must_be` when both are present.
    pub fn from_json(json: &Json) -> Result<Self, ConfigError> {
        let fields = json.as_object().ok_or_else(|| {
            ConfigError::invalid_option("rules", format!("expected an object, got {json}"))
        })?;
        let mut set = RuleSet::new();
        for (field, kinds) in fields {
            let kinds = kinds.as_object().ok_or_else(|| {
                ConfigError::invalid_option(field.as_str(), format!("expected an object, got {kinds}"))
            })?;
            if let Some(options) = kinds.get(DateRule::CODE) {
                set = set.date(field.as_str(), DateRule::from_json(options)?);
            }
            if let Some(options) = kinds.get(MustBe::CODE) {
                set = set.must_be(field.as_str(), MustBe::from_json(options)?);
            }
        }
        Ok(set)
    }

    /// Parse a JSON document holding a rule set.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let json: Json =
            serde_json::from_str(json).map_err(|e| ConfigError::Document(e.to_string()))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MapRecord;
    use crate::value::Value;
    use chrono::NaiveDate;

    #[test]
    fn validate_clears_stale_errors() {
        let ctx = ValidationContext::new();
        let rules = RuleSet::new().must_be("salary", MustBe::new().greater_than(10));
        let mut record = MapRecord::new().with("salary", 5);

        assert!(!rules.validate(&ctx, &mut record).unwrap());
        assert_eq!(record.errors().len(), 1);

        record.set("salary", 20);
        assert!(rules.validate(&ctx, &mut record).unwrap());
        assert!(record.errors().is_empty());
    }

    #[test]
    fn validate_clears_error_levels() {
        let ctx = ValidationContext::new();
        let rules = RuleSet::new().date(
            "birthday",
            DateRule::new()
                .before(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
                .error_level("warnings"),
        );
        let mut record = MapRecord::new()
            .with("birthday", NaiveDate::from_ymd_opt(2001, 1, 1).unwrap())
            .with_error_level("warnings");

        for _ in 0..3 {
            assert!(rules.validate(&ctx, &mut record).unwrap());
        }
        assert_eq!(record.level("warnings").unwrap().len(), 1);
    }

    #[test]
    fn runs_rules_in_declaration_order() {
        let ctx = ValidationContext::new();
        let rules = RuleSet::new()
            .must_be("name", MustBe::new().blank())
            .date("birthday", DateRule::new().before(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()))
            .must_be("email", MustBe::new().present());
        let mut record = MapRecord::new()
            .with("name", "jay")
            .with("birthday", NaiveDate::from_ymd_opt(2001, 1, 1).unwrap());

        assert!(!rules.validate(&ctx, &mut record).unwrap());
        assert_eq!(record.errors().field_names(), ["name", "birthday", "email"]);
        assert_eq!(rules.for_field("email").count(), 1);
    }

    #[test]
    fn config_errors_stop_the_run() {
        let ctx = ValidationContext::new();
        let rules = RuleSet::new()
            .must_be("salary", MustBe::new())
            .must_be("email", MustBe::new().present());
        let mut record = MapRecord::new();

        assert!(rules.validate(&ctx, &mut record).is_err());
        assert!(record.errors().is_empty());
    }

    #[test]
    fn decodes_from_json() {
        let rules = RuleSet::from_json_str(
            r#"{
                "salary": {"must_be": {"greater_than": 10}},
                "birthday": {"date": {"before": "2000-01-01"}, "must_be": {"present": true}}
            }"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 3);
        assert!(matches!(rules.for_field("birthday").next(), Some(FieldRule::Date(_))));

        let ctx = ValidationContext::new();
        let mut record = MapRecord::new().with("salary", Value::Int(11)).with(
            "birthday",
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        );
        assert!(rules.validate(&ctx, &mut record).unwrap());

        assert!(RuleSet::from_json_str(r#"{"salary": true}"#).is_err());
    }
}
