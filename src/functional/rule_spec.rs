//! Rule spec parsing
//!
//! A rule spec is the compact textual form used in a rules map: `name` or
//! `name:param`. Only the first `:` separates the name from its parameter, so
//! the parameter itself may contain further colons.

use crate::constants::RULE_PARAM_DELIMITER;

/// A parsed rule spec borrowing from the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSpec<'a> {
    pub rule_name: &'a str,
    pub raw_param: &'a str,
}

impl<'a> RuleSpec<'a> {
    /// Splits `spec` on its first `:`.
    ///
    /// A spec without `:` yields an empty `raw_param`.
    ///
    /// # Examples
    ///
    /// ```
    /// let spec = RuleSpec::parse("min:3");
    /// assert_eq!(spec.rule_name, "min");
    /// assert_eq!(spec.raw_param, "3");
    /// ```
    pub fn parse(spec: &'a str) -> Self {
        match spec.split_once(RULE_PARAM_DELIMITER) {
            Some((rule_name, raw_param)) => Self {
                rule_name,
                raw_param,
            },
            None => Self {
                rule_name: spec,
                raw_param: "",
            },
        }
    }

    pub fn has_param(&self) -> bool {
        !self.raw_param.is_empty()
    }
}
