//! `when` conditions: decide whether a rule applies to a record at all.

use crate::error::ConfigError;
use crate::operand::Pattern;
use crate::record::Record;
use crate::value::Value;

/// A predicate on one field of the record.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Strict equality.
    Equals(Value),
    /// Membership in a (flattened) set.
    OneOf(Vec<Value>),
    /// Regex search on the field's text. A nil field never matches.
    Matches(Pattern),
    /// The field is blank.
    Blank,
    /// The field is present.
    Present,
    /// A zero-argument predicate on the field's value, e.g. `premium?`.
    Predicate(String),
}

impl Condition {
    /// Membership condition. Nested lists are flattened.
    pub fn one_of<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Condition::OneOf(
            values
                .into_iter()
                .flat_map(|v| v.into().flatten())
                .collect(),
        )
    }

    /// Predicate condition, answered by [`Record::call_predicate`].
    ///
    /// `blank?` and `present?` (with or without the `?`) become
    /// [`Condition::Blank`] and [`Condition::Present`].
    pub fn predicate(name: impl Into<String>) -> Self {
        let name = name.into();
        let sentinel = match name.strip_suffix('?').unwrap_or(&name) {
            "blank" => Some(Condition::Blank),
            "present" => Some(Condition::Present),
            _ => None,
        };
        sentinel.unwrap_or_else(|| Condition::Predicate(name))
    }

    /// Test the condition against `field` on the record.
    pub fn holds(&self, record: &dyn Record, field: &str) -> Result<bool, ConfigError> {
        let held = match self {
            Condition::Equals(expected) => record.read(field) == *expected,
            Condition::OneOf(values) => values.contains(&record.read(field)),
            Condition::Matches(pattern) => {
                let value = record.read(field);
                !value.is_nil() && pattern.is_match(&value.to_string())
            }
            Condition::Blank => record.read(field).is_blank(),
            Condition::Present => record.read(field).is_present(),
            Condition::Predicate(name) => {
                record
                    .call_predicate(field, name)
                    .ok_or_else(|| ConfigError::UnknownPredicate {
                        field: field.to_string(),
                        predicate: name.clone(),
                    })?
            }
        };
        Ok(held)
    }

    /// Clause describing a satisfied condition, e.g. `"salary = 10"` or
    /// `"salary is present"`.
    pub fn describe(&self, record: &dyn Record, field: &str) -> String {
        match self {
            Condition::Blank => format!("{field} is blank"),
            Condition::Present => format!("{field} is present"),
            _ => format!("{field} = {}", record.read(field)),
        }
    }
}

impl From<Value> for Condition {
    fn from(v: Value) -> Self {
        match v {
            Value::List(_) => Condition::OneOf(v.flatten()),
            other => Condition::Equals(other),
        }
    }
}

impl From<Pattern> for Condition {
    fn from(p: Pattern) -> Self {
        Condition::Matches(p)
    }
}

macro_rules! impl_condition_from_literal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Condition {
                fn from(v: $ty) -> Self {
                    Condition::from(Value::from(v))
                }
            }
        )*
    };
}

impl_condition_from_literal!(bool, i64, i32, u32, f64, &str, String);

/// The `when` clause of a rule: every condition must hold for the rule to apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct When {
    conditions: Vec<(String, Condition)>,
}

impl When {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, condition: impl Into<Condition>) {
        self.conditions.push((field.into(), condition.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(f, c)| (f.as_str(), c))
    }

    /// `Some(clauses)` when every condition holds, `None` as soon as one does
    /// not. An empty clause always applies.
    pub fn applies(&self, record: &dyn Record) -> Result<Option<Vec<String>>, ConfigError> {
        let mut clauses = Vec::with_capacity(self.conditions.len());
        for (field, condition) in &self.conditions {
            if !condition.holds(record, field)? {
                return Ok(None);
            }
            clauses.push(condition.describe(record, field));
        }
        Ok(Some(clauses))
    }
}

impl<F, C> FromIterator<(F, C)> for When
where
    F: Into<String>,
    C: Into<Condition>,
{
    fn from_iter<I: IntoIterator<Item = (F, C)>>(iter: I) -> Self {
        let mut when = When::new();
        for (field, condition) in iter {
            when.push(field, condition);
        }
        when
    }
}
