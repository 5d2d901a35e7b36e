//! # bevalid
//!
//! Declarative attribute validation for record-based models.
//!
//! Two validators are provided:
//!
//! - [`MustBe`] - a mini-language of comparisons (`greater_than`, `one_of`,
//!   `before`, `matching`, ...) with conditional application (`when`) and
//!   composed, human-readable failure messages.
//! - [`DateRule`] - reports unparseable dates and enforces `after` / `before`
//!   bounds.
//!
//! Rules read the model through the [`Record`] trait and consult a
//! [`ValidationContext`] for the rule registry (rules can be switched off by
//! name) and the clock used by `now` / `today` bounds.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bevalid::prelude::*;
//!
//! let ctx = ValidationContext::new();
//! let rules = RuleSet::new()
//!     .must_be("salary", MustBe::new().greater_than(10))
//!     .must_be("bonus", MustBe::new().one_of([1, 2, 3]));
//!
//! let mut record = MapRecord::new().with("salary", 10).with("bonus", 7);
//! assert!(!rules.validate(&ctx, &mut record)?);
//!
//! assert_eq!(record.errors().messages("salary"), ["must be greater than 10."]);
//! assert_eq!(
//!     record.errors().messages("bonus"),
//!     [": '7' is not a valid value. Valid values: 1, 2, 3."]
//! );
//! ```
//!
//! ## Options from JSON
//!
//! Rules can also be declared as JSON option objects, see [`options`]:
//!
//! ```rust,ignore
//! let rule = MustBe::from_json_str(r#"{"present": true, "when": {"salary": ":present?"}}"#)?;
//! ```
//!
//! ## Features
//!
//! - `tracing` (default) - debug/warn logging of skipped rules, failures and
//!   configuration errors through the `tracing` crate.

#[macro_use]
mod tracing_macros;

pub mod condition;
pub mod config;
pub mod date;
pub mod error;
pub mod message;
pub mod must_be;
pub mod operand;
pub mod options;
pub mod record;
pub mod rule_set;
pub mod value;


pub use condition::{Condition, When};
pub use config::{
    Clock, Configuration, RuleSettings, ScopedRule, ValidationContext, ValidationContextBuilder,
};
pub use date::{check_bound, BoundCheck, DateBound, DateRule, Direction, NOW_LENIENCY_SECS};
pub use error::{humanize, ConfigError, RuleError, ValidationErrors, Verdict};
pub use must_be::MustBe;
pub use operand::{Comparator, Comparison, Operand, Pattern};
pub use options::parse_temporal;
pub use record::{MapRecord, Record};
pub use rule_set::{FieldRule, RuleSet};
pub use value::Value;

/// Prelude module for validation
pub mod prelude {
    pub use crate::condition::{Condition, When};
    pub use crate::config::{Configuration, RuleSettings, ValidationContext};
    pub use crate::date::{DateBound, DateRule};
    pub use crate::error::{ConfigError, RuleError, ValidationErrors, Verdict};
    pub use crate::must_be::MustBe;
    pub use crate::operand::{Comparator, Operand, Pattern};
    pub use crate::record::{MapRecord, Record};
    pub use crate::rule_set::RuleSet;
    pub use crate::value::Value;
}
