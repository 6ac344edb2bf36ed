//! Named Validation Rules
//!
//! This module holds the rule registry: a capability table mapping a rule name
//! to its handler, its default error template and the schema used to extract
//! named values from the rule's parameter. Rules are plain function values so
//! new ones can be registered without touching the engine.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::constants::{
    RULE_EMAIL, RULE_MAX, RULE_MIN, RULE_REQUIRED, RULE_UNIQUE, TEMPLATE_EMAIL, TEMPLATE_MAX,
    TEMPLATE_MIN, TEMPLATE_REQUIRED, TEMPLATE_UNIQUE, UNIQUE_PARAM_SEPARATOR,
};
use crate::error::{ServiceError, ServiceResult};
use crate::functional::message_format::{render_template, ParamSchema};
use crate::services::data_store::{is_valid_identifier, DataStore};

/// Leading integer of a parameter, the way `min:3` and `min: 3px` are read.
static LEADING_INT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)").unwrap());
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Predicate backing a rule: `(value, raw_param) -> passes`.
///
/// `value` is `None` when the field was not posted. Handlers that talk to
/// external systems report their failures through the `Err` branch.
pub type RuleHandler = Arc<dyn Fn(Option<&Value>, &str) -> ServiceResult<bool> + Send + Sync>;

/// A registered rule. Immutable once handed to the registry.
#[derive(Clone)]
pub struct RuleDefinition {
    name: String,
    handler: Option<RuleHandler>,
    error_template: String,
    params: ParamSchema,
}

impl RuleDefinition {
    pub fn new<F>(name: impl Into<String>, error_template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Option<&Value>, &str) -> ServiceResult<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Some(Arc::new(handler)),
            error_template: error_template.into(),
            params: ParamSchema::none(),
        }
    }

    /// A definition with metadata only. Looking up its handler is a configuration error.
    pub fn without_handler(name: impl Into<String>, error_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: None,
            error_template: error_template.into(),
            params: ParamSchema::none(),
        }
    }

    pub fn with_params(mut self, params: ParamSchema) -> Self {
        self.params = params;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error_template(&self) -> &str {
        &self.error_template
    }

    pub fn params(&self) -> &ParamSchema {
        &self.params
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }
}

impl fmt::Debug for RuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDefinition")
            .field("name", &self.name)
            .field("has_handler", &self.handler.is_some())
            .field("error_template", &self.error_template)
            .field("params", &self.params)
            .finish()
    }
}

/// Registry of named rules.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, RuleDefinition>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in rules.
    ///
    /// The data store is captured by the `unique` rule; every other rule is pure.
    pub fn with_builtin_rules(data_store: Arc<dyn DataStore>) -> Self {
        let mut registry = Self::new();
        register_builtin_rules(&mut registry, data_store);
        registry
    }

    /// Adds a rule, replacing any previous definition with the same name.
    pub fn register(&mut self, definition: RuleDefinition) -> &mut Self {
        if self.rules.contains_key(definition.name()) {
            log::debug!("Replacing validation rule '{}'", definition.name());
        }
        self.rules.insert(definition.name.clone(), definition);
        self
    }

    pub fn exists(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn definition(&self, name: &str) -> Option<&RuleDefinition> {
        self.rules.get(name)
    }

    /// Returns the handler registered under `name`.
    ///
    /// Fails with [`ServiceError::UnknownRule`] when the rule is not registered and
    /// with [`ServiceError::Configuration`] when it was registered without a handler.
    pub fn handler(&self, name: &str) -> ServiceResult<&RuleHandler> {
        let definition = self
            .rules
            .get(name)
            .ok_or_else(|| ServiceError::unknown_rule(name))?;

        definition
            .handler
            .as_ref()
            .ok_or_else(|| ServiceError::configuration(name))
    }

    /// All registered rule names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        self.rules.keys().sorted().cloned().collect()
    }

    /// Renders the error for `field` failing `rule_name`.
    ///
    /// `override_message` replaces the rule's default template when non-empty;
    /// placeholders are substituted in either case.
    pub fn render_error(
        &self,
        field: &str,
        rule_name: &str,
        raw_param: &str,
        override_message: &str,
    ) -> ServiceResult<String> {
        let definition = self
            .rules
            .get(rule_name)
            .ok_or_else(|| ServiceError::unknown_rule(rule_name))?;

        let template = if override_message.is_empty() {
            definition.error_template.as_str()
        } else {
            override_message
        };

        Ok(render_template(template, field, raw_param, &definition.params))
    }
}

/// Registers `required`, `min`, `max`, `email` and `unique`.
pub fn register_builtin_rules(registry: &mut RuleRegistry, data_store: Arc<dyn DataStore>) {
    registry
        .register(RuleDefinition::new(RULE_REQUIRED, TEMPLATE_REQUIRED, |value, _| {
            Ok(!is_empty_value(value))
        }))
        .register(
            RuleDefinition::new(RULE_MIN, TEMPLATE_MIN, |value, param| {
                Ok(text_length(value) >= parse_int_param(param))
            })
            .with_params(ParamSchema::named([RULE_MIN])),
        )
        .register(
            RuleDefinition::new(RULE_MAX, TEMPLATE_MAX, |value, param| {
                Ok(text_length(value) <= parse_int_param(param))
            })
            .with_params(ParamSchema::named([RULE_MAX])),
        )
        .register(RuleDefinition::new(RULE_EMAIL, TEMPLATE_EMAIL, |value, _| {
            Ok(EMAIL_REGEX.is_match(&value_text(value)))
        }))
        .register(
            RuleDefinition::new(RULE_UNIQUE, TEMPLATE_UNIQUE, move |value, param| {
                let (table, column) = unique_target(param)?;
                let matches = data_store.count_matching(table, column, &value_text(value))?;
                Ok(matches == 0)
            })
            .with_params(
                ParamSchema::named(["table", "field"]).with_separator(UNIQUE_PARAM_SEPARATOR),
            ),
        );
}

/// Splits a `unique` parameter into `(table, column)`.
///
/// Both parts must be plain identifiers; anything else is a rule declaration bug.
pub fn unique_target(param: &str) -> ServiceResult<(&str, &str)> {
    match param.split_once(UNIQUE_PARAM_SEPARATOR) {
        Some((table, column)) if is_valid_identifier(table) && is_valid_identifier(column) => {
            Ok((table, column))
        }
        _ => Err(ServiceError::invalid_rule_param(RULE_UNIQUE, param)),
    }
}

/// Whether a posted value counts as empty for `required`.
///
/// Absent, `null`, `false`, zero, `""`, `"0"` and empty collections are empty.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(flag)) => !flag,
        Some(Value::Number(number)) => number.as_f64().map_or(false, |n| n == 0.0),
        Some(Value::String(text)) => text.is_empty() || text == "0",
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
    }
}

/// Text form of a posted value, used by length and pattern rules and by `unique`.
pub fn value_text(value: Option<&Value>) -> Cow<'_, str> {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Cow::Borrowed(""),
        Some(Value::Bool(true)) => Cow::Borrowed("1"),
        Some(Value::String(text)) => Cow::Borrowed(text.as_str()),
        Some(Value::Number(number)) => Cow::Owned(number.to_string()),
        Some(other) => Cow::Owned(other.to_string()),
    }
}

fn text_length(value: Option<&Value>) -> i64 {
    i64::try_from(value_text(value).chars().count()).unwrap_or(i64::MAX)
}

/// Reads the leading integer of a rule parameter. Anything unparsable reads as zero.
pub fn parse_int_param(param: &str) -> i64 {
    LEADING_INT_REGEX
        .captures(param)
        .and_then(|captures| captures.get(1))
        .map(|digits| {
            let digits = digits.as_str();
            digits.parse::<i64>().unwrap_or(if digits.starts_with('-') {
                i64::MIN
            } else {
                i64::MAX
            })
        })
        .unwrap_or(0)
}
