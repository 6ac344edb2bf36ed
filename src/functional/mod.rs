pub mod message_format;
pub mod prelude;
pub mod rule_spec;
pub mod validation_engine;
pub mod validation_rules;
