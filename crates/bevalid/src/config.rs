//! Rule registry and validation context.
//!
//! Rules are disabled globally by name through the registry held by a
//! [`ValidationContext`]. The context is passed to every evaluation, so
//! hosts decide its scope: one per process, one per tenant, one per test.

use crate::error::ConfigError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Per-rule switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSettings {
    #[serde(default)]
    pub disabled: bool,
}

impl RuleSettings {
    pub fn disabled() -> Self {
        Self { disabled: true }
    }
}

/// The mutable configuration object handed out by [`ValidationContext::configure`].
///
/// Serializes as `{"rules": {"<rule_name>": {"disabled": true}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub rules: HashMap<String, RuleSettings>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON registry document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Document(e.to_string()))
    }

    pub fn is_disabled(&self, rule_name: &str) -> bool {
        self.rules.get(rule_name).is_some_and(|s| s.disabled)
    }

    pub fn disable(&mut self, rule_name: impl Into<String>) {
        self.rules.entry(rule_name.into()).or_default().disabled = true;
    }

    pub fn enable(&mut self, rule_name: impl Into<String>) {
        self.rules.entry(rule_name.into()).or_default().disabled = false;
    }
}

/// Source of the current instant, used by `now` / `today` bounds.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Shared state consulted by every rule evaluation.
///
/// Cloning is cheap and clones share the same registry. Reconfiguring while
/// other threads validate is safe, but the expected pattern is to configure
/// once at start-up (or in test setup) and only read afterwards.
///
/// ## Example
///
/// ```rust,ignore
/// use bevalid::prelude::*;
///
/// let ctx = ValidationContext::new();
/// ctx.configure(|config| {
///     config.rules.insert("bonus_cap".into(), RuleSettings { disabled: true });
/// });
/// ```
#[derive(Clone)]
pub struct ValidationContext {
    config: Arc<RwLock<Configuration>>,
    clock: Clock,
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self {
            config: Arc::new(RwLock::new(Configuration::default())),
            clock: Arc::new(Utc::now),
        }
    }
}

impl ValidationContext {
    /// Create a context with an empty registry and the system clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing a validation context.
    pub fn builder() -> ValidationContextBuilder {
        ValidationContextBuilder::new()
    }

    /// Mutate the registry.
    pub fn configure<F>(&self, f: F)
    where
        F: FnOnce(&mut Configuration),
    {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut config);
        trace_info!(rules = config.rules.len(), "validation rules reconfigured");
    }

    /// Snapshot of the current registry.
    pub fn config(&self) -> Configuration {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the named rule is switched off.
    pub fn is_disabled(&self, rule_name: &str) -> bool {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_disabled(rule_name)
    }

    /// The current instant according to the context clock.
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Today's date according to the context clock.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Disable a rule until the returned guard is dropped.
    ///
    /// The previous registry entry (or its absence) is restored on drop, so
    /// tests can switch a rule off without leaking state into other tests.
    pub fn disable_scoped(&self, rule_name: impl Into<String>) -> ScopedRule {
        let name = rule_name.into();
        let mut previous = None;
        self.configure(|config| {
            previous = config.rules.insert(name.clone(), RuleSettings::disabled());
        });
        ScopedRule {
            ctx: self.clone(),
            name,
            previous,
        }
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("config", &self.config())
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`ValidationContext::disable_scoped`].
#[must_use = "the rule is re-enabled as soon as the guard is dropped"]
pub struct ScopedRule {
    ctx: ValidationContext,
    name: String,
    previous: Option<RuleSettings>,
}

impl Drop for ScopedRule {
    fn drop(&mut self) {
        let previous = self.previous.take();
        self.ctx.configure(|config| match previous {
            Some(settings) => {
                config.rules.insert(self.name.clone(), settings);
            }
            None => {
                config.rules.remove(&self.name);
            }
        });
    }
}

/// Builder for constructing a `ValidationContext`.
#[derive(Default)]
pub struct ValidationContextBuilder {
    config: Configuration,
    clock: Option<Clock>,
}

impl ValidationContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing registry.
    pub fn configuration(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    /// Disable a rule by name.
    pub fn disable(mut self, rule_name: impl Into<String>) -> Self {
        self.config.disable(rule_name);
        self
    }

    /// Use a custom clock.
    pub fn clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Freeze the clock at a fixed instant.
    pub fn fixed_now(self, now: DateTime<Utc>) -> Self {
        self.clock(move || now)
    }

    /// Build the validation context.
    pub fn build(self) -> ValidationContext {
        ValidationContext {
            config: Arc::new(RwLock::new(self.config)),
            clock: self.clock.unwrap_or_else(|| Arc::new(Utc::now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_context() {
        let ctx = ValidationContext::new();
        assert!(ctx.config().rules.is_empty());
        assert!(!ctx.is_disabled("anything"));
    }

    #[test]
    fn configure_disables_rules() {
        let ctx = ValidationContext::new();
        ctx.configure(|config| {
            config
                .rules
                .insert("bonus_cap".to_string(), RuleSettings { disabled: true });
        });
        assert!(ctx.is_disabled("bonus_cap"));

        // clones share the registry
        let other = ctx.clone();
        other.configure(|config| config.enable("bonus_cap"));
        assert!(!ctx.is_disabled("bonus_cap"));
    }

    #[test]
    fn context_builder() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let ctx = ValidationContext::builder()
            .disable("legacy")
            .fixed_now(now)
            .build();

        assert!(ctx.is_disabled("legacy"));
        assert_eq!(ctx.now(), now);
        assert_eq!(ctx.today(), now.date_naive());
    }

    #[test]
    fn scoped_disable_restores_previous_state() {
        let ctx = ValidationContext::new();
        {
            let _guard = ctx.disable_scoped("temporary");
            assert!(ctx.is_disabled("temporary"));
        }
        assert!(!ctx.is_disabled("temporary"));
        assert!(!ctx.config().rules.contains_key("temporary"));

        ctx.configure(|config| config.enable("kept"));
        {
            let _guard = ctx.disable_scoped("kept");
            assert!(ctx.is_disabled("kept"));
        }
        assert_eq!(ctx.config().rules.get("kept"), Some(&RuleSettings::default()));
    }

    #[test]
    fn registry_document_parses() {
        let config =
            Configuration::from_json_str(r#"{"rules": {"a": {"disabled": true}, "b": {}}}"#)
                .unwrap();
        assert!(config.is_disabled("a"));
        assert!(!config.is_disabled("b"));
        assert!(!config.is_disabled("c"));

        let err = Configuration::from_json_str("{").unwrap_err();
        assert!(matches!(err, ConfigError::Document(_)));
    }
}
