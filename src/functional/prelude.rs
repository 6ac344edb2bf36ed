//! Prelude for the validation engine
//!
//! Re-exports the types needed to declare rules and run validations.

pub use crate::error::{ServiceError, ServiceResult};
pub use crate::functional::message_format::{render_template, ParamSchema};
pub use crate::functional::rule_spec::RuleSpec;
pub use crate::functional::validation_engine::{
    override_key, MessageOverrides, PostedData, RulesMap, ValidationConfig, ValidationEngine,
    ValidationOutcome,
};
pub use crate::functional::validation_rules::{
    register_builtin_rules, RuleDefinition, RuleHandler, RuleRegistry,
};
pub use crate::services::data_store::{DataStore, MemoryDataStore};
pub use crate::services::session_store::{MemorySessionStore, SessionStore};

use std::sync::Arc;

/// Creates an engine over the built-in rules with the given data store.
///
/// # Examples
///
/// ```no_run
/// let engine = create_engine(Arc::new(MemoryDataStore::new()), ValidationConfig::default());
/// ```
pub fn create_engine(data_store: Arc<dyn DataStore>, config: ValidationConfig) -> ValidationEngine {
    ValidationEngine::with_config(
        Arc::new(RuleRegistry::with_builtin_rules(data_store)),
        config,
    )
}
