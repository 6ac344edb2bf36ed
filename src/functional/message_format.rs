//! Error message templating
//!
//! Templates carry `:name:` placeholders. Positional values are taken from a
//! rule's raw parameter, split by the rule's separator, and matched to the
//! placeholder names declared by its [`ParamSchema`]. The `:field:` placeholder
//! receives the field name.
//!
//! Substitution is a single left-to-right pass over the template: replacement
//! text is written to the output and never scanned again, so a posted value that
//! happens to contain `:field:` cannot inject further substitutions.

use crate::constants::{DEFAULT_PARAM_SEPARATOR, FIELD_PLACEHOLDER};

/// Describes how a rule's raw parameter maps to named template placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParamSchema {
    /// Separator used to split the raw parameter; a single space when `None`.
    pub separator: Option<String>,
    /// Placeholder names in positional order.
    pub names: Vec<String>,
}

impl ParamSchema {
    /// A schema without any named parameters.
    pub fn none() -> Self {
        Self::default()
    }

    /// A schema whose positional values are split on the default separator.
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            separator: None,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(DEFAULT_PARAM_SEPARATOR)
    }

    /// Splits `raw_param` into positional values.
    pub fn split<'a>(&self, raw_param: &'a str) -> Vec<&'a str> {
        let separator = self.separator();
        if separator.is_empty() {
            return vec![raw_param];
        }
        raw_param.split(separator).collect()
    }
}

/// Renders `template` for `field` using the positional values of `raw_param`.
///
/// Every placeholder named in `schema` is replaced by the value at the same
/// position, or by nothing when the parameter has fewer values than names.
/// Schema names are matched before `:field:`, so a rule may declare its own
/// `field` slot (as `unique` does for the column name).
///
/// # Examples
///
/// ```
/// let schema = ParamSchema::named(["min"]);
/// let message = render_template("Value for ':field:' must be at least :min: symbols", "name", "3", &schema);
/// assert_eq!(message, "Value for 'name' must be at least 3 symbols");
/// ```
pub fn render_template(template: &str, field: &str, raw_param: &str, schema: &ParamSchema) -> String {
    let values = schema.split(raw_param);

    let mut substitutions: Vec<(String, &str)> = schema
        .names
        .iter()
        .enumerate()
        .map(|(index, name)| (format!(":{}:", name), values.get(index).copied().unwrap_or("")))
        .collect();
    substitutions.push((FIELD_PLACEHOLDER.to_string(), field));

    substitute(template, &substitutions)
}

fn substitute(template: &str, substitutions: &[(String, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(position) = rest.find(':') {
        output.push_str(&rest[..position]);
        let tail = &rest[position..];

        match substitutions
            .iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder.as_str()))
        {
            Some((placeholder, value)) => {
                output.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                output.push(':');
                rest = &tail[1..];
            }
        }
    }

    output.push_str(rest);
    output
}
