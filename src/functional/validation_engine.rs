//! Rule-Based Validation Engine
//!
//! Evaluates a rules map (field → ordered rule specs) against posted data. Each
//! field's rules run in order: a passing rule records the field's value in the
//! validated set and evaluation continues, the first failing rule records an
//! error message and stops that field. Fields are independent of each other.
//!
//! The engine itself is a pure fold over `(field, rule)` pairs; any I/O happens
//! inside handlers (such as `unique`) and surfaces as an `Err`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ServiceError, ServiceResult};
use crate::functional::rule_spec::RuleSpec;
use crate::functional::validation_rules::RuleRegistry;

/// Custom error messages keyed by `"<field>.<rule>"`.
pub type MessageOverrides = HashMap<String, String>;

/// Key under which an override for `field` failing `rule_name` is looked up.
pub fn override_key(field: &str, rule_name: &str) -> String {
    format!("{}.{}", field, rule_name)
}

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Fail with [`ServiceError::UnknownRule`] instead of skipping rule names
    /// the registry does not know.
    pub strict_rules: bool,
}

/// Posted request data: field name → JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostedData {
    fields: Map<String, Value>,
}

impl PostedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl From<Map<String, Value>> for PostedData {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for PostedData {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Field → ordered rule specs. Field order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesMap {
    fields: Vec<(String, Vec<String>)>,
}

impl RulesMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule specs of `field`.
    ///
    /// Setting a field twice replaces its specs but keeps its original position.
    pub fn field<I, S>(mut self, field: impl Into<String>, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(field, specs);
        self
    }

    pub fn insert<I, S>(&mut self, field: impl Into<String>, specs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let field = field.into();
        let specs: Vec<String> = specs.into_iter().map(Into::into).collect();

        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = specs,
            None => self.fields.push((field, specs)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, specs)| specs.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, specs)| (name.as_str(), specs.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, I, S> FromIterator<(K, I)> for RulesMap
where
    K: Into<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, I)>>(iter: T) -> Self {
        let mut rules = RulesMap::new();
        for (field, specs) in iter {
            rules.insert(field, specs);
        }
        rules
    }
}

/// Result of validating posted data.
///
/// A field that passes an earlier rule and fails a later one appears in both
/// maps: `validated` keeps the value recorded by the passing rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub validated: HashMap<String, Value>,
    pub errors: HashMap<String, String>,
}

impl ValidationOutcome {
    /// `true` when no field failed.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.validated.get(field)
    }

    /// The error map as a JSON object, the form persisted to the session.
    pub fn errors_value(&self) -> Value {
        Value::Object(
            self.errors
                .iter()
                .map(|(field, message)| (field.clone(), Value::String(message.clone())))
                .collect(),
        )
    }
}

/// Validation engine driven by a shared rule registry
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    registry: Arc<RuleRegistry>,
    config: ValidationConfig,
}

impl ValidationEngine {
    /// Constructs a ValidationEngine using the default ValidationConfig.
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self::with_config(registry, ValidationConfig::default())
    }

    pub fn with_config(registry: Arc<RuleRegistry>, config: ValidationConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validates `posted` against `rules`.
    ///
    /// Rule failures are reported in the returned outcome. `Err` is reserved for
    /// a rule registered without a handler, an unknown rule in strict mode, and
    /// failures raised by handlers themselves (for example the data store behind
    /// `unique`); any of these aborts the whole call.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let rules = RulesMap::new().field("name", ["required", "min:3"]);
    /// let outcome = engine.validate(&posted, &rules, &MessageOverrides::new())?;
    /// if !outcome.is_valid() {
    ///     println!("{:?}", outcome.errors);
    /// }
    /// ```
    pub fn validate(
        &self,
        posted: &PostedData,
        rules: &RulesMap,
        messages: &MessageOverrides,
    ) -> ServiceResult<ValidationOutcome> {
        let mut outcome = ValidationOutcome::default();

        for (field, specs) in rules.iter() {
            self.validate_field(posted.get(field), field, specs, messages, &mut outcome)?;
        }

        log::debug!(
            "Validated {} field(s): {} passed, {} failed",
            rules.len(),
            outcome.validated.len(),
            outcome.errors.len()
        );
        Ok(outcome)
    }

    fn validate_field(
        &self,
        value: Option<&Value>,
        field: &str,
        specs: &[String],
        messages: &MessageOverrides,
        outcome: &mut ValidationOutcome,
    ) -> ServiceResult<()> {
        for spec in specs {
            let RuleSpec {
                rule_name,
                raw_param,
            } = RuleSpec::parse(spec);

            if !self.registry.exists(rule_name) {
                if self.config.strict_rules {
                    return Err(ServiceError::unknown_rule(rule_name));
                }
                log::warn!(
                    "Skipping unknown validation rule '{}' for field '{}'",
                    rule_name,
                    field
                );
                continue;
            }

            let handler = self.registry.handler(rule_name)?;
            if handler(value, raw_param)? {
                outcome
                    .validated
                    .insert(field.to_string(), value.cloned().unwrap_or(Value::Null));
                continue;
            }

            let override_message = messages
                .get(&override_key(field, rule_name))
                .map(String::as_str)
                .unwrap_or("");
            let message = self
                .registry
                .render_error(field, rule_name, raw_param, override_message)?;

            log::debug!("Field '{}' failed rule '{}'", field, rule_name);
            outcome.errors.insert(field.to_string(), message);
            break;
        }

        Ok(())
    }
}
