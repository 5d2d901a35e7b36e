//! Dynamic field values as supplied by the host model.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use std::cmp::Ordering;
use std::fmt;

/// A field value read from a record.
///
/// Hosts coerce their column types into one of these variants before a rule
/// runs. Equality and ordering are lenient across numeric kinds (`Int` vs
/// `Float`) and across temporal kinds (`Date` vs `DateTime`, a date being
/// midnight UTC); every other cross-kind pair is unequal and unordered.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Unset / null
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    List(Vec<Value>),
}

impl Value {
    /// Returns true for `Nil` only.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Blank values: nil, `false`, whitespace-only strings and empty lists.
    ///
    /// Numbers are never blank, zero included.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Bool(b) => !b,
            Value::Str(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Int(_) | Value::Float(_) | Value::Date(_) | Value::DateTime(_) => false,
        }
    }

    /// Inverse of [`Value::is_blank`].
    pub fn is_present(&self) -> bool {
        !self.is_blank()
    }

    /// Borrow the inner string, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the value carries a date or a date-time.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::DateTime(_))
    }

    /// Date precision view of a temporal value.
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date_naive()),
            _ => None,
        }
    }

    /// Time precision view of a temporal value. Dates are taken at midnight UTC.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(midnight(*d)),
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Flatten nested lists into a single level. Scalars become a one-element list.
    pub fn flatten(&self) -> Vec<Value> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<Value>) {
        match self {
            Value::List(items) => items.iter().for_each(|item| item.flatten_into(out)),
            other => out.push(other.clone()),
        }
    }

    /// View the value as a sequence: lists as-is, nil as empty, scalars wrapped.
    pub fn to_list(&self) -> Vec<Value> {
        match self {
            Value::Nil => Vec::new(),
            Value::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// Evaluate one of the built-in zero-argument predicates on this value.
    ///
    /// The trailing `?` is optional: `"zero?"` and `"zero"` are the same predicate.
    /// Returns `None` for unknown predicates or predicates that do not apply to
    /// the value's kind.
    pub fn predicate(&self, name: &str) -> Option<bool> {
        let name = name.strip_suffix('?').unwrap_or(name);
        match name {
            "blank" => Some(self.is_blank()),
            "present" => Some(self.is_present()),
            "nil" => Some(self.is_nil()),
            "empty" => match self {
                Value::Str(s) => Some(s.is_empty()),
                Value::List(items) => Some(items.is_empty()),
                _ => None,
            },
            "zero" | "positive" | "negative" => {
                let n = match self {
                    Value::Int(i) => *i as f64,
                    Value::Float(f) => *f,
                    _ => return None,
                };
                Some(match name {
                    "zero" => n == 0.0,
                    "positive" => n > 0.0,
                    _ => n < 0.0,
                })
            }
            "true" => match self {
                Value::Bool(b) => Some(*b),
                _ => None,
            },
            "false" => match self {
                Value::Bool(b) => Some(!b),
                _ => None,
            },
            _ => None,
        }
    }

    /// Convert a JSON literal. Objects have no counterpart and map to `Nil`.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null | serde_json::Value::Object(_) => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Nil),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (a, b) if a.is_temporal() && b.is_temporal() => a.to_datetime() == b.to_datetime(),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Nil, Value::Nil) => Some(Ordering::Equal),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) if a == b => Some(Ordering::Equal),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => a.iter().partial_cmp(b.iter()),
            (a, b) if a.is_temporal() && b.is_temporal() => {
                a.to_datetime().partial_cmp(&b.to_datetime())
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
            Value::List(_) => f.write_str(&join(&self.flatten())),
        }
    }
}

/// Comma-join values the way failure messages list them.
pub fn join(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v $(as $cast)?)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    i64 => Int,
    i32 => Int as i64,
    u32 => Int as i64,
    f64 => Float,
    String => Str,
    NaiveDate => Date,
    DateTime<Utc> => DateTime,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn blank_and_present() {
        assert!(Value::Nil.is_blank());
        assert!(Value::from("").is_blank());
        assert!(Value::from("  ").is_blank());
        assert!(Value::Bool(false).is_blank());
        assert!(Value::List(vec![]).is_blank());

        assert!(Value::Int(0).is_present());
        assert!(Value::Float(0.0).is_present());
        assert!(Value::from("foo").is_present());
        assert!(Value::Date(date(2020, 1, 1)).is_present());
    }

    #[test]
    fn numeric_equality_crosses_kinds() {
        assert_eq!(Value::Int(10), Value::Float(10.0));
        assert_ne!(Value::Int(10), Value::from("10"));
        assert!(Value::Int(11) > Value::Float(10.5));
        assert_eq!(Value::from("a").partial_cmp(&Value::Int(1)), None);
    }

    #[test]
    fn ordering_agrees_with_equality() {
        let pairs = [
            (Value::Nil, Value::Nil),
            (Value::from(vec!["a"]), Value::from(vec!["a"])),
            (Value::from(vec![1, 2]), Value::from(vec![1.0, 2.0])),
            (Value::Bool(true), Value::Bool(true)),
            (Value::Int(3), Value::Float(3.0)),
        ];
        for (a, b) in pairs {
            assert_eq!(a, b);
            assert_eq!(a.partial_cmp(&b), Some(Ordering::Equal), "{a:?} vs {b:?}");
            assert!(a <= b && a >= b);
        }

        assert!(Value::from(vec![1, 2]) < Value::from(vec![1, 3]));
        assert!(Value::from(vec![1]) < Value::from(vec![1, 0]));
        assert_eq!(Value::Nil.partial_cmp(&Value::Int(0)), None);
    }

    #[test]
    fn dates_compare_with_datetimes() {
        let d = Value::Date(date(2020, 1, 1));
        let dt = Value::DateTime(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let later = Value::DateTime(Utc.with_ymd_and_hms(2020, 1, 1, 8, 0, 0).unwrap());
        assert_eq!(d, dt);
        assert!(d < later);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Nil.to_string(), "");
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(Value::Float(10.0).to_string(), "10.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Date(date(2021, 1, 1)).to_string(), "2021-01-01");
        assert_eq!(
            Value::DateTime(Utc.with_ymd_and_hms(2021, 1, 1, 9, 30, 0).unwrap()).to_string(),
            "2021-01-01 09:30:00 UTC"
        );
        let nested = Value::from(vec![Value::from("a"), Value::from(vec!["b", "c"])]);
        assert_eq!(nested.to_string(), "a, b, c");
    }

    #[test]
    fn flatten_and_list_views() {
        let nested = Value::from(vec![Value::Int(1), Value::from(vec![2, 3])]);
        assert_eq!(nested.flatten(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(Value::Int(4).to_list(), vec![Value::Int(4)]);
        assert!(Value::Nil.to_list().is_empty());
    }

    #[test]
    fn builtin_predicates() {
        assert_eq!(Value::Int(0).predicate("zero?"), Some(true));
        assert_eq!(Value::Int(-3).predicate("negative"), Some(true));
        assert_eq!(Value::Nil.predicate("nil?"), Some(true));
        assert_eq!(Value::from("").predicate("empty?"), Some(true));
        assert_eq!(Value::from("x").predicate("premium?"), None);
        assert_eq!(Value::from("x").predicate("zero?"), None);
    }

    #[test]
    fn from_json_literals() {
        let json = serde_json::json!([1, 2.5, "x", null, true]);
        assert_eq!(
            Value::from_json(&json),
            Value::List(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::from("x"),
                Value::Nil,
                Value::Bool(true),
            ])
        );
    }
}
