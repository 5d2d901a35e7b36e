//! The `must_be` rule: a small interpreter over comparison directives.
//!
//! Directives run in a fixed order. Any directive that is satisfied passes the
//! whole rule immediately; every unsatisfied one contributes to the failure
//! message (see [`crate::message`]). Only when no directive passes is the
//! rule reported as failed.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bevalid::prelude::*;
//!
//! let rule = MustBe::new().greater_than(10);
//! let ctx = ValidationContext::new();
//! let mut record = MapRecord::new().with("salary", 10);
//!
//! rule.validate_each(&ctx, &mut record, "salary")?;
//! assert_eq!(record.errors().messages("salary"), ["must be greater than 10."]);
//! ```

use crate::condition::{Condition, When};
use crate::config::ValidationContext;
use crate::date::{check_bound, BoundCheck, DateBound, Direction};
use crate::error::{ConfigError, RuleError, Verdict};
use crate::message::{Directive, MessageState};
use crate::operand::{Comparator, Comparison, Operand, Pattern, Resolved};
use crate::record::Record;
use crate::value::{join, Value};

/// Configuration of one `must_be` rule on one field.
#[derive(Debug, Clone)]
pub struct MustBe {
    /// Passes when the value is blank
    pub blank: bool,
    /// Passes when the value is present
    pub present: bool,
    /// Allowed values (flattened)
    pub one_of: Option<Vec<Value>>,
    /// Forbidden values (flattened)
    pub not_any_of: Option<Vec<Value>>,
    /// Every element of the value must be one of these (flattened)
    pub only_from: Option<Vec<Value>>,
    pub before: Option<DateBound>,
    pub after: Option<DateBound>,
    /// Compare `before` / `after` at time precision
    pub time: bool,
    /// Comparisons in declaration order
    pub comparisons: Vec<Comparison>,
    /// Conditions under which the rule applies
    pub when: When,
    /// List allowed / forbidden values in failure messages
    pub show_values: bool,
    /// Replaces the composed failure message entirely
    pub message: Option<String>,
    /// Identifies the rule in the registry and in error metadata
    pub rule_name: Option<String>,
}

impl Default for MustBe {
    fn default() -> Self {
        Self {
            blank: false,
            present: false,
            one_of: None,
            not_any_of: None,
            only_from: None,
            before: None,
            after: None,
            time: false,
            comparisons: Vec::new(),
            when: When::new(),
            show_values: true,
            message: None,
            rule_name: None,
        }
    }
}

fn flatten_all<I, T>(values: I) -> Vec<Value>
where
    I: IntoIterator<Item = T>,
    T: Into<Value>,
{
    values.into_iter().flat_map(|v| v.into().flatten()).collect()
}

impl MustBe {
    pub const CODE: &'static str = "must_be";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    pub fn present(mut self) -> Self {
        self.present = true;
        self
    }

    pub fn one_of<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.one_of = Some(flatten_all(values));
        self
    }

    pub fn not_any_of<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.not_any_of = Some(flatten_all(values));
        self
    }

    pub fn only_from<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.only_from = Some(flatten_all(values));
        self
    }

    /// Add a comparison. Comparisons run in the order they are added.
    pub fn compare(mut self, comparator: Comparator, operand: impl Into<Operand>) -> Self {
        self.comparisons.push(Comparison::new(comparator, operand));
        self
    }

    pub fn equal_to(self, operand: impl Into<Operand>) -> Self {
        self.compare(Comparator::EqualTo, operand)
    }

    pub fn not_equal_to(self, operand: impl Into<Operand>) -> Self {
        self.compare(Comparator::NotEqualTo, operand)
    }

    pub fn greater_than(self, operand: impl Into<Operand>) -> Self {
        self.compare(Comparator::GreaterThan, operand)
    }

    pub fn greater_or_equal_to(self, operand: impl Into<Operand>) -> Self {
        self.compare(Comparator::GreaterOrEqualTo, operand)
    }

    pub fn less_than(self, operand: impl Into<Operand>) -> Self {
        self.compare(Comparator::LessThan, operand)
    }

    pub fn less_or_equal_to(self, operand: impl Into<Operand>) -> Self {
        self.compare(Comparator::LessOrEqualTo, operand)
    }

    pub fn matching(self, pattern: Pattern) -> Self {
        self.compare(Comparator::Matching, pattern)
    }

    pub fn before(mut self, bound: impl Into<DateBound>) -> Self {
        self.before = Some(bound.into());
        self
    }

    pub fn after(mut self, bound: impl Into<DateBound>) -> Self {
        self.after = Some(bound.into());
        self
    }

    pub fn with_time(mut self) -> Self {
        self.time = true;
        self
    }

    /// Only apply the rule when `field` satisfies `condition`.
    pub fn when(mut self, field: impl Into<String>, condition: impl Into<Condition>) -> Self {
        self.when.push(field, condition);
        self
    }

    pub fn show_values(mut self, show: bool) -> Self {
        self.show_values = show;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn rule_name(mut self, name: impl Into<String>) -> Self {
        self.rule_name = Some(name.into());
        self
    }

    /// Whether anything is configured to check.
    pub fn has_directive(&self) -> bool {
        self.blank
            || self.present
            || self.one_of.is_some()
            || self.not_any_of.is_some()
            || self.only_from.is_some()
            || self.before.is_some()
            || self.after.is_some()
            || !self.comparisons.is_empty()
    }

    /// Evaluate `value` as the value of `field` on `record`.
    ///
    /// Returns `Ok(None)` when the rule passes (or does not apply), and the
    /// error to record when it fails. The record is not modified.
    pub fn evaluate(
        &self,
        ctx: &ValidationContext,
        record: &dyn Record,
        field: &str,
        value: &Value,
    ) -> Result<Option<RuleError>, ConfigError> {
        if !self.has_directive() {
            trace_warn!(field, "must_be rule declared without directives");
            return Err(ConfigError::MissingDirective {
                field: field.to_string(),
            });
        }

        if let Some(name) = self.rule_name.as_deref() {
            if ctx.is_disabled(name) {
                trace_debug!(field, rule_name = name, "rule disabled, skipping");
                return Ok(None);
            }
        }

        let mut message = MessageState::new();

        if self.blank {
            if value.is_blank() {
                return Ok(None);
            }
            message.apply(Directive::Blank, " blank");
        }
        if self.present {
            if value.is_present() {
                return Ok(None);
            }
            message.apply(Directive::Present, " present");
        }

        if let Some(allowed) = &self.one_of {
            if allowed.contains(value) {
                return Ok(None);
            }
            message.apply(Directive::OneOf, format!(": '{value}' is not a valid value"));
        }
        if let Some(forbidden) = &self.not_any_of {
            if !forbidden.contains(value) {
                return Ok(None);
            }
            message.apply(Directive::NotAnyOf, format!(": '{value}' is not a valid value"));
        }
        if let Some(allowed) = &self.only_from {
            if value.to_list().iter().all(|v| allowed.contains(v)) {
                return Ok(None);
            }
            message.apply(Directive::OnlyFrom, format!(": {value} is not a valid value"));
        }

        if self.before.is_some() || self.after.is_some() {
            let original = record.read_before_type_cast(field);
            let bounds = [
                (&self.before, Direction::Before, Directive::Before),
                (&self.after, Direction::After, Directive::After),
            ];
            for (bound, direction, directive) in bounds {
                let Some(bound) = bound else { continue };
                match check_bound(
                    ctx,
                    record,
                    value,
                    original.as_deref(),
                    bound,
                    direction,
                    self.time,
                ) {
                    BoundCheck::Within => return Ok(None),
                    // a later failing bound overwrites an earlier one
                    BoundCheck::Outside(text) => message.apply(directive, text),
                }
            }
        }

        for comparison in &self.comparisons {
            let comparator = comparison.comparator;
            let operand = comparison.operand.resolve(record);
            if operand.is_nil() && comparator != Comparator::NotEqualTo {
                return Ok(None);
            }
            if comparator.holds(value, &operand) {
                return Ok(None);
            }
            if comparator == Comparator::NotEqualTo
                && matches!(&operand, Resolved::Value(o) if value != o)
            {
                return Ok(None);
            }
            message.apply(Directive::Comparison, comparison.clause());
        }

        if !self.when.is_empty() {
            match self.when.applies(record)? {
                Some(clauses) => {
                    message.apply(Directive::When, format!(" when {}", clauses.join(" and ")));
                }
                None => {
                    trace_debug!(field, "when conditions not met, rule does not apply");
                    return Ok(None);
                }
            }
        }

        if self.show_values {
            if let Some(allowed) = &self.one_of {
                message.apply(Directive::ShowValues, format!(". Valid values: {}", join(allowed)));
            }
            if let Some(allowed) = &self.only_from {
                message.apply(Directive::ShowValues, format!(". Valid values: {}", join(allowed)));
            }
            if let Some(forbidden) = &self.not_any_of {
                message.apply(
                    Directive::ShowValues,
                    format!(". Invalid values: {}", join(forbidden)),
                );
            }
        }

        let message = self.message.clone().unwrap_or_else(|| message.finish());
        Ok(Some(
            RuleError::new(Self::CODE, message)
                .with_rule_name(self.rule_name.clone())
                .param("field", field),
        ))
    }

    /// Pass or fail `value` without recording anything.
    pub fn check(
        &self,
        ctx: &ValidationContext,
        record: &dyn Record,
        field: &str,
        value: &Value,
    ) -> Result<Verdict, ConfigError> {
        Ok(match self.evaluate(ctx, record, field, value)? {
            None => Verdict::Valid,
            Some(_) => Verdict::Invalid,
        })
    }

    /// Validate `field` on the record, appending the failure to its errors.
    pub fn validate_each(
        &self,
        ctx: &ValidationContext,
        record: &mut dyn Record,
        field: &str,
    ) -> Result<Verdict, ConfigError> {
        let value = record.read(field);
        match self.evaluate(ctx, &*record, field, &value)? {
            None => Ok(Verdict::Valid),
            Some(error) => {
                trace_debug!(
                    field,
                    rule_name = error.rule_name.as_deref(),
                    message = %error.message,
                    "must_be rule failed"
                );
                record.errors_mut().add(field, error);
                Ok(Verdict::Invalid)
            }
        }
    }

    /// Render the rule as an attribute-style declaration, for logs and docs.
    pub fn pretty_print(&self) -> String {
        let mut parts = Vec::new();
        if self.blank {
            parts.push("blank".to_string());
        }
        if self.present {
            parts.push("present".to_string());
        }
        let lists = [
            ("one_of", &self.one_of),
            ("not_any_of", &self.not_any_of),
            ("only_from", &self.only_from),
        ];
        for (key, values) in lists {
            if let Some(values) = values {
                parts.push(format!("{key}({})", join(values)));
            }
        }
        for (key, bound) in [("before", &self.before), ("after", &self.after)] {
            if let Some(bound) = bound {
                parts.push(format!("{key} = {}", describe_bound(bound)));
            }
        }
        if self.time {
            parts.push("time".to_string());
        }
        for comparison in &self.comparisons {
            parts.push(format!(
                "{} = {}",
                comparison.comparator.key(),
                describe_operand(&comparison.operand)
            ));
        }
        if !self.when.is_empty() {
            let conditions = self
                .when
                .iter()
                .map(|(field, condition)| describe_condition(field, condition))
                .collect::<Vec<_>>();
            parts.push(format!("when({})", conditions.join(", ")));
        }
        if !self.show_values {
            parts.push("show_values = false".to_string());
        }
        if let Some(message) = &self.message {
            parts.push(format!("message = \"{message}\""));
        }
        if let Some(name) = &self.rule_name {
            parts.push(format!("rule_name = \"{name}\""));
        }
        format!("#[must_be({})]", parts.join(", "))
    }
}

fn describe_operand(operand: &Operand) -> String {
    match operand {
        Operand::Value(Value::Str(s)) => format!("\"{s}\""),
        Operand::Value(v) => v.to_string(),
        Operand::Field(name) => format!("field({name})"),
        Operand::Pattern(p) => p.to_string(),
    }
}

fn describe_bound(bound: &DateBound) -> String {
    match bound {
        DateBound::Date(d) => Value::Date(*d).to_string(),
        DateBound::DateTime(dt) => Value::DateTime(*dt).to_string(),
        DateBound::Field(name) => format!("field({name})"),
        DateBound::Now => "now".to_string(),
        DateBound::Today => "today".to_string(),
        DateBound::Callable(_) => "fn".to_string(),
    }
}

fn describe_condition(field: &str, condition: &Condition) -> String {
    match condition {
        Condition::Equals(v) => format!("{field} = {}", describe_operand(&Operand::Value(v.clone()))),
        Condition::OneOf(values) => format!("{field} in ({})", join(values)),
        Condition::Matches(p) => format!("{field} =~ {p}"),
        Condition::Blank => format!("{field} is blank"),
        Condition::Present => format!("{field} is present"),
        Condition::Predicate(name) => format!("{field}.{name}"),
    }
}
