//! Rule-based validation of untrusted request data.
//!
//! Rules are declared per field as compact specs (`"required"`, `"min:3"`,
//! `"unique:users.email"`), looked up in a [`RuleRegistry`](functional::validation_rules::RuleRegistry)
//! and evaluated by the [`ValidationEngine`](functional::validation_engine::ValidationEngine).
//! The `api` module wires the engine to actix-web requests: decoding posted
//! data, flashing errors to a session and redirecting back on failure.

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod functional;
pub mod services;
pub mod utils;
