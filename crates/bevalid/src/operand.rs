//! Comparison directives and their operands.

use crate::error::ConfigError;
use crate::record::Record;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::fmt;

/// A compiled regular expression used as an operand or a `when` condition.
///
/// Displays in slash-delimited literal notation (`/strange.*love/`), which is
/// how patterns appear in failure messages.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile a pattern from its source.
    pub fn new(source: &str) -> Result<Self, ConfigError> {
        Regex::new(source)
            .map(Pattern)
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })
    }

    /// The pattern source, without delimiters.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Unanchored search.
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Pattern(regex)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.as_str())
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal used as-is.
    Value(Value),
    /// Another field of the same record, read when the rule runs.
    Field(String),
    /// A regular expression (for `matching`).
    Pattern(Pattern),
}

/// An operand after field references have been read.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    Value(Value),
    Pattern(&'a Pattern),
}

impl Resolved<'_> {
    pub fn is_nil(&self) -> bool {
        matches!(self, Resolved::Value(Value::Nil))
    }
}

impl Operand {
    /// Reference another field of the record.
    pub fn field(name: impl Into<String>) -> Self {
        Operand::Field(name.into())
    }

    /// Read field references from the record; literals and patterns pass through.
    pub fn resolve(&self, record: &dyn Record) -> Resolved<'_> {
        match self {
            Operand::Value(v) => Resolved::Value(v.clone()),
            Operand::Field(name) => Resolved::Value(record.read(name)),
            Operand::Pattern(p) => Resolved::Pattern(p),
        }
    }
}

/// How an operand shows up in a failure message: literals by value, field
/// references by name, patterns in literal notation.
impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{v}"),
            Operand::Field(name) => f.write_str(name),
            Operand::Pattern(p) => write!(f, "{p}"),
        }
    }
}

macro_rules! impl_operand_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Value(v.into())
                }
            }
        )*
    };
}

impl_operand_from_value!(Value, bool, i64, i32, u32, f64, &str, String, NaiveDate, DateTime<Utc>);

impl From<Pattern> for Operand {
    fn from(p: Pattern) -> Self {
        Operand::Pattern(p)
    }
}

/// The comparison kinds a `must_be` rule understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterOrEqualTo,
    LessThan,
    LessOrEqualTo,
    Matching,
}

impl Comparator {
    pub const ALL: [Comparator; 7] = [
        Comparator::EqualTo,
        Comparator::NotEqualTo,
        Comparator::GreaterThan,
        Comparator::GreaterOrEqualTo,
        Comparator::LessThan,
        Comparator::LessOrEqualTo,
        Comparator::Matching,
    ];

    /// Option key, e.g. `"greater_or_equal_to"`.
    pub fn key(self) -> &'static str {
        match self {
            Comparator::EqualTo => "equal_to",
            Comparator::NotEqualTo => "not_equal_to",
            Comparator::GreaterThan => "greater_than",
            Comparator::GreaterOrEqualTo => "greater_or_equal_to",
            Comparator::LessThan => "less_than",
            Comparator::LessOrEqualTo => "less_or_equal_to",
            Comparator::Matching => "matching",
        }
    }

    /// Message form, e.g. `"greater or equal to"`.
    pub fn humanized(self) -> &'static str {
        match self {
            Comparator::EqualTo => "equal to",
            Comparator::NotEqualTo => "not equal to",
            Comparator::GreaterThan => "greater than",
            Comparator::GreaterOrEqualTo => "greater or equal to",
            Comparator::LessThan => "less than",
            Comparator::LessOrEqualTo => "less or equal to",
            Comparator::Matching => "matching",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Apply the comparator to `value` and an already resolved operand.
    ///
    /// A nil value never satisfies a comparator. `Matching` searches the
    /// value's textual form; every other comparator uses [`Value`] equality
    /// and ordering, so incomparable kinds simply do not hold.
    pub fn holds(self, value: &Value, operand: &Resolved<'_>) -> bool {
        if value.is_nil() {
            return false;
        }
        match (self, operand) {
            (Comparator::Matching, Resolved::Pattern(p)) => p.is_match(&value.to_string()),
            (Comparator::Matching, Resolved::Value(_)) => false,
            (Comparator::NotEqualTo, Resolved::Pattern(_)) => true,
            (_, Resolved::Pattern(_)) => false,
            (Comparator::EqualTo, Resolved::Value(o)) => value == o,
            (Comparator::NotEqualTo, Resolved::Value(o)) => value != o,
            (Comparator::GreaterThan, Resolved::Value(o)) => value > o,
            (Comparator::GreaterOrEqualTo, Resolved::Value(o)) => value >= o,
            (Comparator::LessThan, Resolved::Value(o)) => value < o,
            (Comparator::LessOrEqualTo, Resolved::Value(o)) => value <= o,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One configured comparison: a comparator and its operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub comparator: Comparator,
    pub operand: Operand,
}

impl Comparison {
    pub fn new(comparator: Comparator, operand: impl Into<Operand>) -> Self {
        Self {
            comparator,
            operand: operand.into(),
        }
    }

    /// The clause appended to a failure message, e.g. `" greater than 10"`.
    pub fn clause(&self) -> String {
        format!(" {} {}", self.comparator.humanized(), self.operand)
    }
}
