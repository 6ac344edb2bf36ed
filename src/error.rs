//! Service error type shared by the validation engine and its collaborators.
//!
//! Field-level validation failures are never represented here: they are data in
//! [`ValidationOutcome`](crate::functional::validation_engine::ValidationOutcome).
//! Only programming errors (bad rule registration) and failures of injected
//! dependencies travel as `Err`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A rule is registered without a handler.
    #[error("Handler for {rule} does not set")]
    Configuration { rule: String },

    /// A rule spec carries a parameter its rule cannot use.
    #[error("Invalid parameter '{param}' for rule {rule}")]
    InvalidRuleParam { rule: String, param: String },

    /// A rule name was looked up that the registry does not know.
    #[error("Validator does not have {rule}")]
    UnknownRule { rule: String },

    /// The external data store backing a rule failed.
    #[error("Data store failure: {0}")]
    Dependency(String),

    /// The session store could not persist or read a value.
    #[error("Session store failure: {0}")]
    Session(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn configuration(rule: impl Into<String>) -> Self {
        ServiceError::Configuration { rule: rule.into() }
    }

    pub fn invalid_rule_param(rule: impl Into<String>, param: impl Into<String>) -> Self {
        ServiceError::InvalidRuleParam {
            rule: rule.into(),
            param: param.into(),
        }
    }

    pub fn unknown_rule(rule: impl Into<String>) -> Self {
        ServiceError::UnknownRule { rule: rule.into() }
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        ServiceError::Dependency(message.into())
    }

    pub fn session(message: impl Into<String>) -> Self {
        ServiceError::Session(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ServiceError::BadRequest(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    /// Whether the error is caused by the caller's input rather than by the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::BadRequest(_))
    }
}

impl From<diesel::result::Error> for ServiceError {
    fn from(err: diesel::result::Error) -> Self {
        ServiceError::Dependency(err.to_string())
    }
}

impl From<r2d2::Error> for ServiceError {
    fn from(err: r2d2::Error) -> Self {
        ServiceError::Dependency(format!("Failed to get connection from pool: {}", err))
    }
}

impl From<redis::RedisError> for ServiceError {
    fn from(err: redis::RedisError) -> Self {
        ServiceError::Session(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(format!("JSON serialization failed: {}", err))
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal details stay in the logs.
        let message = if self.is_client_error() {
            self.to_string()
        } else {
            log::error!("{}", self);
            crate::constants::MESSAGE_INTERNAL_SERVER_ERROR.to_string()
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
