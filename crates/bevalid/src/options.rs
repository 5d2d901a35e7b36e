//! Decoding rule options from JSON.
//!
//! Option objects mirror the builder methods one key at a time:
//!
//! ```json
//! {
//!   "greater_than": ":bonus",
//!   "matching": "/^[A-Z]/",
//!   "when": { "status": ":present?", "salary": [1, 2, 3] },
//!   "rule_name": "bonus_cap"
//! }
//! ```
//!
//! Strings carry the non-literal forms. `":name"` refers to another field
//! (or, where a sentinel is expected, to `:now`, `:today`, `:blank?`,
//! `:present?` or a predicate), `"/src/"` is a pattern, and bound strings
//! are parsed as dates or date-times. Unknown keys are ignored.

use crate::condition::{Condition, When};
use crate::date::{DateBound, DateRule};
use crate::error::ConfigError;
use crate::must_be::MustBe;
use crate::operand::{Comparator, Operand, Pattern};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value as Json};

/// Parse a date (`2020-01-31`) or date-time (RFC 3339, or
/// `2020-01-31 13:45:00` taken as UTC).
pub fn parse_temporal(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Value::Date(date));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Value::DateTime(dt.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| Value::DateTime(dt.and_utc()))
}

fn object<'a>(json: &'a Json, rule: &str) -> Result<&'a Map<String, Json>, ConfigError> {
    json.as_object()
        .ok_or_else(|| ConfigError::invalid_option(rule, format!("expected an object, got {json}")))
}

fn boolean(key: &str, json: &Json) -> Result<bool, ConfigError> {
    json.as_bool()
        .ok_or_else(|| ConfigError::invalid_option(key, format!("expected a boolean, got {json}")))
}

fn string(key: &str, json: &Json) -> Result<String, ConfigError> {
    json.as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::invalid_option(key, format!("expected a string, got {json}")))
}

fn reference(s: &str) -> Option<&str> {
    s.strip_prefix(':').filter(|name| !name.is_empty())
}

fn pattern_source(s: &str) -> Option<&str> {
    s.strip_prefix('/')
        .and_then(|rest| rest.strip_suffix('/'))
}

/// Scalars become one-element lists; nested arrays are flattened.
fn values(json: &Json) -> Vec<Value> {
    Value::from_json(json).flatten()
}

fn operand(comparator: Comparator, json: &Json) -> Result<Operand, ConfigError> {
    if let Some(s) = json.as_str() {
        if let Some(name) = reference(s) {
            return Ok(Operand::field(name));
        }
        if let Some(source) = pattern_source(s) {
            return Ok(Pattern::new(source)?.into());
        }
        if comparator == Comparator::Matching {
            return Ok(Pattern::new(s)?.into());
        }
    }
    if comparator == Comparator::Matching {
        return Err(ConfigError::invalid_option(
            comparator.key(),
            format!("expected a pattern string, got {json}"),
        ));
    }
    if json.is_object() {
        return Err(ConfigError::invalid_option(
            comparator.key(),
            "objects are not valid operands",
        ));
    }
    Ok(Operand::Value(Value::from_json(json)))
}

fn bound(key: &str, json: &Json) -> Result<DateBound, ConfigError> {
    let s = json
        .as_str()
        .ok_or_else(|| ConfigError::invalid_option(key, format!("expected a string, got {json}")))?;
    match reference(s) {
        Some("now") => Ok(DateBound::Now),
        Some("today") => Ok(DateBound::Today),
        Some(name) => Ok(DateBound::field(name)),
        None => match parse_temporal(s) {
            Some(Value::Date(d)) => Ok(DateBound::Date(d)),
            Some(Value::DateTime(dt)) => Ok(DateBound::DateTime(dt)),
            _ => Err(ConfigError::invalid_option(
                key,
                format!("'{s}' is not a date, a date-time or a reference"),
            )),
        },
    }
}

fn condition(field: &str, json: &Json) -> Result<Condition, ConfigError> {
    if json.is_object() {
        return Err(ConfigError::invalid_option(
            format!("when.{field}"),
            format!("objects are not valid conditions, got {json}"),
        ));
    }
    if let Some(s) = json.as_str() {
        match reference(s) {
            Some("blank?") => return Ok(Condition::Blank),
            Some("present?") => return Ok(Condition::Present),
            Some(name) => return Ok(Condition::predicate(name)),
            None => {}
        }
        if let Some(source) = pattern_source(s) {
            return Ok(Pattern::new(source)?.into());
        }
    }
    Ok(Condition::from(Value::from_json(json)))
}

fn when(json: &Json) -> Result<When, ConfigError> {
    let conditions = json.as_object().ok_or_else(|| ConfigError::MalformedWhen {
        found: json.to_string(),
    })?;
    let mut when = When::new();
    for (field, expected) in conditions {
        when.push(field.as_str(), condition(field, expected)?);
    }
    Ok(when)
}

impl MustBe {
    /// Build a rule from a JSON option object.
    ///
    /// Decoding does not check that a directive is present; a rule without
    /// one is reported when it is evaluated.
    pub fn from_json(options: &Json) -> Result<Self, ConfigError> {
        let options = object(options, Self::CODE)?;
        let mut rule = MustBe::new();
        for (key, json) in options {
            if let Some(comparator) = Comparator::from_key(key) {
                let operand = operand(comparator, json)?;
                rule = rule.compare(comparator, operand);
                continue;
            }
            match key.as_str() {
                "blank" => rule.blank = boolean(key, json)?,
                "present" => rule.present = boolean(key, json)?,
                "one_of" => rule.one_of = Some(values(json)),
                "not_any_of" => rule.not_any_of = Some(values(json)),
                "only_from" => rule.only_from = Some(values(json)),
                "before" => rule.before = Some(bound(key, json)?),
                "after" => rule.after = Some(bound(key, json)?),
                "time" => rule.time = boolean(key, json)?,
                "when" => rule.when = when(json)?,
                "show_values" => rule.show_values = boolean(key, json)?,
                "message" => rule.message = Some(string(key, json)?),
                "rule_name" => rule.rule_name = Some(string(key, json)?),
                other => {
                    trace_debug!(option = other, "ignoring unknown must_be option");
                }
            }
        }
        Ok(rule)
    }

    /// Parse a JSON document holding an option object.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: Json =
            serde_json::from_str(json).map_err(|e| ConfigError::Document(e.to_string()))?;
        Self::from_json(&options)
    }
}

impl DateRule {
    /// Build a date rule from a JSON option object.
    pub fn from_json(options: &Json) -> Result<Self, ConfigError> {
        let options = object(options, Self::CODE)?;
        let mut rule = DateRule::new();
        for (key, json) in options {
            match key.as_str() {
                "after" => rule.after = Some(bound(key, json)?),
                "before" => rule.before = Some(bound(key, json)?),
                "time" => rule.time = boolean(key, json)?,
                "allow_blank" => rule.allow_blank = boolean(key, json)?,
                "message" => rule.message = Some(string(key, json)?),
                "after_message" => rule.after_message = Some(string(key, json)?),
                "before_message" => rule.before_message = Some(string(key, json)?),
                "error_level" => rule.error_level = Some(string(key, json)?),
                other => {
                    trace_debug!(option = other, "ignoring unknown date option");
                }
            }
        }
        Ok(rule)
    }

    /// Parse a JSON document holding an option object.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: Json =
            serde_json::from_str(json).map_err(|e| ConfigError::Document(e.to_string()))?;
        Self::from_json(&options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn temporal_formats() {
        assert_eq!(
            parse_temporal("2020-01-31"),
            Some(Value::Date(NaiveDate::from_ymd_opt(2020, 1, 31).unwrap()))
        );
        let expected = Value::DateTime(Utc.with_ymd_and_hms(2020, 1, 31, 13, 45, 0).unwrap());
        assert_eq!(parse_temporal("2020-01-31 13:45:00"), Some(expected.clone()));
        assert_eq!(parse_temporal("2020-01-31T15:45:00+02:00"), Some(expected));
        assert_eq!(parse_temporal("2021-02-30"), None);
        assert_eq!(parse_temporal("soon"), None);
    }

    #[test]
    fn comparisons_keep_declaration_order() {
        let rule = MustBe::from_json(&json!({
            "less_than": 5,
            "greater_than": ":bonus",
            "matching": "/^a/",
        }))
        .unwrap();
        let keys: Vec<_> = rule.comparisons.iter().map(|c| c.comparator).collect();
        assert_eq!(
            keys,
            [Comparator::LessThan, Comparator::GreaterThan, Comparator::Matching]
        );
        assert_eq!(rule.comparisons[1].operand, Operand::field("bonus"));
        assert_eq!(
            rule.comparisons[2].operand,
            Operand::Pattern(Pattern::new("^a").unwrap())
        );
    }

    #[test]
    fn sets_flags_and_metadata() {
        let rule = MustBe::from_json(&json!({
            "one_of": [[1, 2], 3],
            "show_values": false,
            "message": "pick a tier",
            "rule_name": "tier",
            "unrelated": true,
        }))
        .unwrap();
        assert_eq!(rule.one_of, Some(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
        assert!(!rule.show_values);
        assert_eq!(rule.message.as_deref(), Some("pick a tier"));
        assert_eq!(rule.rule_name.as_deref(), Some("tier"));
    }

    #[test]
    fn when_conditions() {
        let rule = MustBe::from_json(&json!({
            "present": true,
            "when": {
                "salary": ":present?",
                "email": ":blank?",
                "status": ":premium?",
                "name": "/^bey/",
                "tier": [1, 2],
                "country": "NL",
            }
        }))
        .unwrap();
        let conditions: Vec<_> = rule.when.iter().map(|(f, c)| (f.to_string(), c.clone())).collect();
        assert_eq!(
            conditions,
            vec![
                ("salary".to_string(), Condition::Present),
                ("email".to_string(), Condition::Blank),
                ("status".to_string(), Condition::predicate("premium?")),
                ("name".to_string(), Condition::Matches(Pattern::new("^bey").unwrap())),
                ("tier".to_string(), Condition::OneOf(vec![Value::Int(1), Value::Int(2)])),
                ("country".to_string(), Condition::Equals(Value::from("NL"))),
            ]
        );
    }

    #[test]
    fn malformed_when_is_reported() {
        let err = MustBe::from_json(&json!({"present": true, "when": "salary"})).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MalformedWhen {
                found: "\"salary\"".to_string()
            }
        );
    }

    #[test]
    fn bounds() {
        let rule = MustBe::from_json(&json!({
            "before": ":today",
            "after": "2000-01-01",
            "time": true,
        }))
        .unwrap();
        assert!(matches!(rule.before, Some(DateBound::Today)));
        assert!(matches!(rule.after, Some(DateBound::Date(_))));
        assert!(rule.time);

        let rule = DateRule::from_json(&json!({"after": ":now", "before": ":naming_day"})).unwrap();
        assert!(matches!(rule.after, Some(DateBound::Now)));
        assert!(matches!(rule.before, Some(DateBound::Field(ref f)) if f == "naming_day"));

        let err = MustBe::from_json(&json!({"before": "tomorrow"})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { ref option, .. } if option == "before"));
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        assert!(matches!(
            MustBe::from_json(&json!([1, 2])).unwrap_err(),
            ConfigError::InvalidOption { .. }
        ));
        assert!(matches!(
            MustBe::from_json(&json!({"blank": "yes"})).unwrap_err(),
            ConfigError::InvalidOption { .. }
        ));
        assert!(matches!(
            MustBe::from_json(&json!({"matching": "/(/"})).unwrap_err(),
            ConfigError::InvalidPattern { .. }
        ));
        assert!(matches!(
            MustBe::from_json(&json!({"matching": 5})).unwrap_err(),
            ConfigError::InvalidOption { ref option, .. } if option == "matching"
        ));
        assert!(matches!(
            MustBe::from_json(&json!({"present": true, "when": {"salary": {"gt": 1}}})).unwrap_err(),
            ConfigError::InvalidOption { ref option, .. } if option == "when.salary"
        ));
        assert!(matches!(
            MustBe::from_json_str("{").unwrap_err(),
            ConfigError::Document(_)
        ));
    }

    #[test]
    fn date_rule_options() {
        let rule = DateRule::from_json_str(
            r#"{"allow_blank": true, "time": true, "after_message": "too early", "error_level": "warnings"}"#,
        )
        .unwrap();
        assert!(rule.allow_blank);
        assert!(rule.time);
        assert_eq!(rule.after_message.as_deref(), Some("too early"));
        assert_eq!(rule.error_level.as_deref(), Some("warnings"));
    }
}
