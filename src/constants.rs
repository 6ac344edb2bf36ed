// Session keys written on validation failure
pub const SESSION_KEY_ERRORS: &str = "errors";
pub const SESSION_KEY_FORM_DATA: &str = "form_data";

// Built-in rule names
pub const RULE_REQUIRED: &str = "required";
pub const RULE_MIN: &str = "min";
pub const RULE_MAX: &str = "max";
pub const RULE_EMAIL: &str = "email";
pub const RULE_UNIQUE: &str = "unique";

// Built-in rule error templates
pub const TEMPLATE_REQUIRED: &str = "Field ':field:' is required";
pub const TEMPLATE_MIN: &str = "Value for ':field:' is must be at least :min: symbols";
pub const TEMPLATE_MAX: &str = "Value for ':field:' must be at most :max: symbols";
pub const TEMPLATE_EMAIL: &str = "Field ':field:' must be a valid email address";
pub const TEMPLATE_UNIQUE: &str = "Value is already exists in table ':table:' for field ':field:'";

pub const DEFAULT_PARAM_SEPARATOR: &str = " ";
pub const RULE_PARAM_DELIMITER: char = ':';
pub const FIELD_PLACEHOLDER: &str = ":field:";
pub const UNIQUE_PARAM_SEPARATOR: &str = ".";

// Request
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const DEFAULT_REDIRECT_LOCATION: &str = "/";

// Messages
pub const MESSAGE_INTERNAL_SERVER_ERROR: &str = "Internal Server Error";
pub const MESSAGE_INVALID_JSON_BODY: &str = "Request body is not valid JSON";

// Configuration defaults
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
pub const SESSION_KEY_PREFIX: &str = "session";
