//! Date bound evaluation and the standalone date validator.

use crate::config::ValidationContext;
use crate::error::{RuleError, Verdict};
use crate::record::Record;
use crate::value::Value;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::fmt;
use std::sync::Arc;

/// Grace applied to `now` bounds to absorb clock skew between the
/// validating process and whoever produced the value.
pub const NOW_LENIENCY_SECS: i64 = 60;

/// A callable bound, invoked with the record being validated.
pub type BoundFn = Arc<dyn Fn(&dyn Record) -> Value + Send + Sync>;

/// The limit a `before` / `after` directive compares against.
#[derive(Clone)]
pub enum DateBound {
    /// A literal date.
    Date(NaiveDate),
    /// A literal instant.
    DateTime(DateTime<Utc>),
    /// Another field of the record.
    Field(String),
    /// The current instant, with [`NOW_LENIENCY_SECS`] of slack.
    Now,
    /// The current date.
    Today,
    /// Computed from the record.
    Callable(BoundFn),
}

impl DateBound {
    /// Bound on another field of the record.
    pub fn field(name: impl Into<String>) -> Self {
        DateBound::Field(name.into())
    }

    /// Bound computed from the record when the rule runs.
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&dyn Record) -> Value + Send + Sync + 'static,
    {
        DateBound::Callable(Arc::new(f))
    }

    /// Resolve to a concrete value. `Nil` means there is no bound to enforce.
    pub fn resolve(
        &self,
        ctx: &ValidationContext,
        record: &dyn Record,
        direction: Direction,
    ) -> Value {
        match self {
            DateBound::Date(d) => Value::Date(*d),
            DateBound::DateTime(dt) => Value::DateTime(*dt),
            DateBound::Field(name) => record.read(name),
            DateBound::Today => Value::Date(ctx.today()),
            DateBound::Now => {
                let slack = Duration::seconds(NOW_LENIENCY_SECS);
                Value::DateTime(match direction {
                    Direction::After => ctx.now() - slack,
                    Direction::Before => ctx.now() + slack,
                })
            }
            DateBound::Callable(f) => f(record),
        }
    }

    /// How the bound is named in a failure message.
    fn describe(&self, record: &dyn Record) -> String {
        match self {
            DateBound::Date(d) => Value::Date(*d).to_string(),
            DateBound::DateTime(dt) => Value::DateTime(*dt).to_string(),
            DateBound::Field(name) => name.clone(),
            DateBound::Now | DateBound::Today => String::new(),
            DateBound::Callable(f) => f(record).to_string(),
        }
    }
}

impl fmt::Debug for DateBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateBound::Date(d) => f.debug_tuple("Date").field(d).finish(),
            DateBound::DateTime(dt) => f.debug_tuple("DateTime").field(dt).finish(),
            DateBound::Field(name) => f.debug_tuple("Field").field(name).finish(),
            DateBound::Now => f.write_str("Now"),
            DateBound::Today => f.write_str("Today"),
            DateBound::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

impl From<NaiveDate> for DateBound {
    fn from(d: NaiveDate) -> Self {
        DateBound::Date(d)
    }
}

impl From<DateTime<Utc>> for DateBound {
    fn from(dt: DateTime<Utc>) -> Self {
        DateBound::DateTime(dt)
    }
}

/// Which side of the bound the value must stay on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Value must be on or before the bound.
    Before,
    /// Value must be on or after the bound.
    After,
}

/// Result of a single bound check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundCheck {
    Within,
    /// Outside the bound, with the failure message (no trailing period).
    Outside(String),
}

impl BoundCheck {
    pub fn is_within(&self) -> bool {
        matches!(self, BoundCheck::Within)
    }
}

/// Check `value` against one bound.
///
/// Bounds are inclusive. Unless `time` is set both sides are compared at date
/// precision; with `time` both are compared as instants. A bound that
/// resolves to nothing is always satisfied, while a value that is not a date
/// never is.
pub fn check_bound(
    ctx: &ValidationContext,
    record: &dyn Record,
    value: &Value,
    original: Option<&str>,
    bound: &DateBound,
    direction: Direction,
    time: bool,
) -> BoundCheck {
    let resolved = bound.resolve(ctx, record, direction);
    if resolved.is_blank() {
        return BoundCheck::Within;
    }
    if !resolved.is_temporal() {
        trace_warn!(bound = ?bound, resolved = %resolved, "date bound did not resolve to a date, skipping");
        return BoundCheck::Within;
    }

    let within = if time {
        compare(value.to_datetime(), resolved.to_datetime(), direction)
    } else {
        compare(value.to_date(), resolved.to_date(), direction)
    };
    if within {
        return BoundCheck::Within;
    }

    let (relative, absolute) = match direction {
        Direction::After => ("in the past", "before"),
        Direction::Before => ("in the future", "after"),
    };
    let clause = match bound {
        DateBound::Now | DateBound::Today => relative.to_string(),
        other => format!("{absolute} {}", other.describe(record)),
    };
    BoundCheck::Outside(format!(
        ": {} is not a valid value. Date cannot be {clause}",
        original.unwrap_or_default()
    ))
}

fn compare<T: PartialOrd>(value: Option<T>, bound: Option<T>, direction: Direction) -> bool {
    match (value, bound) {
        (Some(v), Some(b)) => match direction {
            Direction::After => v >= b,
            Direction::Before => v <= b,
        },
        _ => false,
    }
}

/// Standalone date validator.
///
/// Reports unparseable dates (the host hands over `Nil` with the raw text
/// still readable through [`Record::read_before_type_cast`]) and enforces
/// optional `after` / `before` bounds. Both bounds can fail at once, in which
/// case two errors are recorded.
#[derive(Debug, Clone, Default)]
pub struct DateRule {
    pub after: Option<DateBound>,
    pub before: Option<DateBound>,
    /// Compare at time precision and accept date-times in the format hint
    pub time: bool,
    /// A missing value with blank original text is acceptable
    pub allow_blank: bool,
    pub message: Option<String>,
    pub after_message: Option<String>,
    pub before_message: Option<String>,
    /// Name of an alternative error collection on the record
    pub error_level: Option<String>,
}

impl DateRule {
    pub const CODE: &'static str = "date";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn after(mut self, bound: impl Into<DateBound>) -> Self {
        self.after = Some(bound.into());
        self
    }

    pub fn before(mut self, bound: impl Into<DateBound>) -> Self {
        self.before = Some(bound.into());
        self
    }

    pub fn with_time(mut self) -> Self {
        self.time = true;
        self
    }

    pub fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_after_message(mut self, message: impl Into<String>) -> Self {
        self.after_message = Some(message.into());
        self
    }

    pub fn with_before_message(mut self, message: impl Into<String>) -> Self {
        self.before_message = Some(message.into());
        self
    }

    pub fn error_level(mut self, level: impl Into<String>) -> Self {
        self.error_level = Some(level.into());
        self
    }

    /// Evaluate `value` for `field` without touching the record. Returns
    /// every failure found.
    pub fn evaluate(
        &self,
        ctx: &ValidationContext,
        record: &dyn Record,
        field: &str,
        value: &Value,
    ) -> Vec<RuleError> {
        let original = record.read_before_type_cast(field);
        self.evaluate_with_original(ctx, record, field, value, original.as_deref())
    }

    fn evaluate_with_original(
        &self,
        ctx: &ValidationContext,
        record: &dyn Record,
        field: &str,
        value: &Value,
        original: Option<&str>,
    ) -> Vec<RuleError> {
        if value.is_nil() {
            if self.allow_blank && original.map_or(true, |o| o.trim().is_empty()) {
                return Vec::new();
            }
            let hint = if self.time {
                "YYYY-MM-DD or YYYY-MM-DD HH:MM:SS format"
            } else {
                "YYYY-MM-DD"
            };
            let message = self.message.clone().unwrap_or_else(|| {
                format!(
                    ": {} is not a valid value. Value must be a date in {hint}.",
                    original.unwrap_or_default()
                )
            });
            return vec![RuleError::new(Self::CODE, message).param("field", field)];
        }
        if !value.is_temporal() {
            return Vec::new();
        }

        let mut errors = Vec::new();
        let checks = [
            (&self.after, Direction::After, &self.after_message, "after"),
            (&self.before, Direction::Before, &self.before_message, "before"),
        ];
        for (bound, direction, custom, key) in checks {
            let Some(bound) = bound else { continue };
            if let BoundCheck::Outside(message) =
                check_bound(ctx, record, value, original, bound, direction, self.time)
            {
                let message = custom.clone().unwrap_or_else(|| format!("{message}."));
                errors.push(
                    RuleError::new(Self::CODE, message)
                        .param("field", field)
                        .param("bound", key),
                );
            }
        }
        errors
    }

    /// Validate `field` on the record, appending failures to its errors
    /// (or to the `error_level` collection when the record exposes one).
    pub fn validate_each(
        &self,
        ctx: &ValidationContext,
        record: &mut dyn Record,
        field: &str,
    ) -> Verdict {
        let value = record.read(field);
        let errors = self.evaluate(ctx, &*record, field, &value);
        if errors.is_empty() {
            return Verdict::Valid;
        }
        trace_debug!(field, count = errors.len(), "date rule failed");

        if let Some(level) = self.error_level.as_deref() {
            if let Some(target) = record.errors_at(level) {
                for error in errors {
                    target.add(field, error);
                }
                return Verdict::Invalid;
            }
            trace_warn!(level, "record has no such error level, using default errors");
        }
        let target = record.errors_mut();
        for error in errors {
            target.add(field, error);
        }
        Verdict::Invalid
    }
}
