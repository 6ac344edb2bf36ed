//! Request-side collaborator of the validation engine.
//!
//! `RequestData` owns what a handler needs from an inbound request: the method,
//! the headers and the posted fields decoded from either a JSON or a
//! form-encoded body. Its `validate` method runs the engine and, when any field
//! fails, persists the errors and the submitted data to the session and builds
//! the `303` redirect back to the referring page.

use actix_web::dev::Payload;
use actix_web::http::header::{self, HeaderMap};
use actix_web::http::Method;
use actix_web::web::Bytes;
use actix_web::{FromRequest, HttpRequest, HttpResponse};
use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::Value;
use url::Url;

use crate::api::response::see_other;
use crate::constants::{
    CONTENT_TYPE_JSON, DEFAULT_REDIRECT_LOCATION, MESSAGE_INVALID_JSON_BODY, SESSION_KEY_ERRORS,
    SESSION_KEY_FORM_DATA,
};
use crate::error::{ServiceError, ServiceResult};
use crate::functional::validation_engine::{
    MessageOverrides, PostedData, RulesMap, ValidationEngine, ValidationOutcome,
};
use crate::services::session_store::SessionStore;

/// Outcome of [`RequestData::validate`].
pub enum Validated {
    /// Every field passed.
    Passed(ValidationOutcome),
    /// At least one field failed; the session has been written and `redirect`
    /// should be returned to the client.
    Failed {
        outcome: ValidationOutcome,
        redirect: HttpResponse,
    },
}

impl Validated {
    pub fn is_passed(&self) -> bool {
        matches!(self, Validated::Passed(_))
    }

    pub fn outcome(&self) -> &ValidationOutcome {
        match self {
            Validated::Passed(outcome) | Validated::Failed { outcome, .. } => outcome,
        }
    }

    /// `Ok` with the outcome when valid, `Err` with the redirect otherwise.
    pub fn into_result(self) -> Result<ValidationOutcome, HttpResponse> {
        match self {
            Validated::Passed(outcome) => Ok(outcome),
            Validated::Failed { redirect, .. } => Err(redirect),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestData {
    method: Method,
    headers: HeaderMap,
    posted: PostedData,
}

impl RequestData {
    pub fn new(method: Method, headers: HeaderMap, posted: PostedData) -> Self {
        Self {
            method,
            headers,
            posted,
        }
    }

    /// Decodes the posted fields from `body` according to the `Content-Type` header.
    ///
    /// `application/json` bodies must be valid JSON; anything other than an
    /// object yields no fields. Every other content type is read as
    /// `application/x-www-form-urlencoded`.
    pub fn from_parts(method: Method, headers: HeaderMap, body: &[u8]) -> ServiceResult<Self> {
        let posted = if is_json_content_type(&headers) {
            parse_json_body(body)?
        } else {
            parse_form_body(body)
        };
        Ok(Self::new(method, headers, posted))
    }

    /// A posted field, or `None` when it was not submitted.
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.posted.get(name)
    }

    pub fn input_all(&self) -> &PostedData {
        &self.posted
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.posted.set(name, value);
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Exact, case-sensitive comparison with the request method.
    pub fn is_method(&self, method: &str) -> bool {
        self.method.as_str() == method
    }

    /// A header value by case-insensitive name; `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn referer(&self) -> Option<&str> {
        self.header(header::REFERER.as_str())
    }

    /// Validates the posted fields.
    ///
    /// On failure the error map is stored under `errors` and the posted data
    /// under `form_data`, and a `303 See Other` to the `Referer` is prepared.
    /// Engine and session failures propagate as `Err`.
    pub fn validate(
        &self,
        engine: &ValidationEngine,
        session: &dyn SessionStore,
        rules: &RulesMap,
        messages: &MessageOverrides,
    ) -> ServiceResult<Validated> {
        let outcome = engine.validate(&self.posted, rules, messages)?;
        if outcome.is_valid() {
            return Ok(Validated::Passed(outcome));
        }

        session.set(SESSION_KEY_ERRORS, outcome.errors_value())?;
        session.set(SESSION_KEY_FORM_DATA, self.posted.to_value())?;

        let location = redirect_location(self.referer());
        tracing::info!(
            failed_fields = outcome.errors.len(),
            location = %location,
            "Validation failed, redirecting back"
        );

        Ok(Validated::Failed {
            redirect: see_other(&location),
            outcome,
        })
    }
}

impl FromRequest for RequestData {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let method = req.method().clone();
        let headers = req.headers().clone();
        let body = Bytes::from_request(req, payload);

        async move {
            let body = body.await?;
            RequestData::from_parts(method, headers, &body).map_err(actix_web::Error::from)
        }
        .boxed_local()
    }
}

/// Where to send the client after a failed validation.
///
/// The `Referer` is used when it is an absolute `http`/`https` URL or a
/// same-origin path; anything else (including a missing header) falls back to `/`.
pub fn redirect_location(referer: Option<&str>) -> String {
    let Some(referer) = referer.map(str::trim).filter(|r| !r.is_empty()) else {
        return DEFAULT_REDIRECT_LOCATION.to_string();
    };

    let is_local_path = referer.starts_with('/') && !referer.starts_with("//");
    let is_http_url = Url::parse(referer)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false);

    if is_local_path || is_http_url {
        referer.to_string()
    } else {
        log::warn!("Ignoring unusable Referer for redirect: {:?}", referer);
        DEFAULT_REDIRECT_LOCATION.to_string()
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(CONTENT_TYPE_JSON))
        .unwrap_or(false)
}

fn parse_json_body(body: &[u8]) -> ServiceResult<PostedData> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PostedData::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(PostedData::from(map)),
        Ok(_) => Ok(PostedData::new()),
        Err(e) => {
            log::debug!("Rejected JSON body: {}", e);
            Err(ServiceError::bad_request(MESSAGE_INVALID_JSON_BODY))
        }
    }
}

/// Reads a form-encoded body. A key ending in `[]` collects its values in an
/// array; for any other repeated key the last value wins.
fn parse_form_body(body: &[u8]) -> PostedData {
    let mut posted = PostedData::new();

    for (key, value) in url::form_urlencoded::parse(body) {
        let value = Value::String(value.into_owned());
        match key.strip_suffix("[]").map(str::to_string) {
            Some(name) => {
                let mut items = match posted.get(&name) {
                    Some(Value::Array(items)) => items.clone(),
                    _ => Vec::new(),
                };
                items.push(value);
                posted.set(name, Value::Array(items));
            }
            None => posted.set(key.into_owned(), value),
        }
    }

    posted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functional::validation_rules::RuleRegistry;
    use crate::services::data_store::MemoryDataStore;
    use crate::services::session_store::MemorySessionStore;
    use actix_web::http::header::{HeaderName, HeaderValue};
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;
    use serde_json::json;
    use std::sync::Arc;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        map
    }

    fn engine() -> ValidationEngine {
        ValidationEngine::new(Arc::new(RuleRegistry::with_builtin_rules(Arc::new(
            MemoryDataStore::new(),
        ))))
    }

    #[test]
    fn test_json_body_is_decoded() {
        let request = RequestData::from_parts(
            Method::POST,
            headers(&[("content-type", "application/json; charset=utf-8")]),
            br#"{"name": "Ada", "tags": ["a", "b"]}"#,
        )
        .unwrap();

        assert_eq!(request.input("name"), Some(&json!("Ada")));
        assert_eq!(request.input("tags"), Some(&json!(["a", "b"])));
        assert!(request.input("missing").is_none());
    }

    #[test]
    fn test_non_object_json_yields_no_fields() {
        let request = RequestData::from_parts(
            Method::POST,
            headers(&[("content-type", "application/json")]),
            b"[1, 2, 3]",
        )
        .unwrap();
        assert!(request.input_all().is_empty());
    }

    #[test]
    fn test_empty_json_body_yields_no_fields() {
        let request =
            RequestData::from_parts(Method::POST, headers(&[("content-type", "application/json")]), b"")
                .unwrap();
        assert!(request.input_all().is_empty());
    }

    #[test]
    fn test_invalid_json_is_bad_request() {
        let err = RequestData::from_parts(
            Method::POST,
            headers(&[("content-type", "application/json")]),
            b"{not json",
        )
        .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_form_body_is_decoded() {
        let request = RequestData::from_parts(
            Method::POST,
            headers(&[("content-type", "application/x-www-form-urlencoded")]),
            b"name=Ada+Lovelace&email=ada%40example.com&role=a&role=b&tags[]=x&tags[]=y",
        )
        .unwrap();

        assert_eq!(request.input("name"), Some(&json!("Ada Lovelace")));
        assert_eq!(request.input("email"), Some(&json!("ada@example.com")));
        assert_eq!(request.input("role"), Some(&json!("b")));
        assert_eq!(request.input("tags"), Some(&json!(["x", "y"])));
    }

    #[test]
    fn test_missing_content_type_reads_form() {
        let request = RequestData::from_parts(Method::POST, HeaderMap::new(), b"a=1").unwrap();
        assert_eq!(request.input("a"), Some(&json!("1")));
    }

    #[test]
    fn test_set_and_method_and_headers() {
        let mut request = RequestData::new(
            Method::PATCH,
            headers(&[("referer", "/profile"), ("x-request-id", "abc")]),
            PostedData::new(),
        );
        request.set("name", json!("Grace"));

        assert_eq!(request.input("name"), Some(&json!("Grace")));
        assert!(request.is_method("PATCH"));
        assert!(!request.is_method("patch"));
        assert_eq!(request.method(), &Method::PATCH);
        assert_eq!(request.header("X-Request-Id"), Some("abc"));
        assert_eq!(request.referer(), Some("/profile"));
        assert!(request.header("authorization").is_none());
        assert_eq!(request.headers().len(), 2);
    }

    #[test]
    fn test_redirect_location() {
        assert_eq!(redirect_location(Some("https://example.com/signup?x=1")), "https://example.com/signup?x=1");
        assert_eq!(redirect_location(Some("/signup")), "/signup");
        assert_eq!(redirect_location(None), "/");
        assert_eq!(redirect_location(Some("")), "/");
        assert_eq!(redirect_location(Some("//evil.example.com")), "/");
        assert_eq!(redirect_location(Some("javascript:alert(1)")), "/");
    }

    #[test]
    fn test_validate_passes_without_touching_session() {
        let session = MemorySessionStore::new();
        let request = RequestData::new(
            Method::POST,
            HeaderMap::new(),
            [("age", json!("30"))].into_iter().collect(),
        );
        let rules = RulesMap::new().field("age", ["required"]);

        let validated = request
            .validate(&engine(), &session, &rules, &MessageOverrides::new())
            .unwrap();

        assert!(validated.is_passed());
        assert_eq!(validated.outcome().value("age"), Some(&json!("30")));
        assert_eq!(session.get(SESSION_KEY_ERRORS).unwrap(), None);
        assert_eq!(session.get(SESSION_KEY_FORM_DATA).unwrap(), None);
    }

    #[test]
    fn test_validate_failure_persists_and_redirects() {
        let session = MemorySessionStore::new();
        let request = RequestData::new(
            Method::POST,
            headers(&[("referer", "https://example.com/signup")]),
            [("name", json!("ab")), ("age", json!("30"))].into_iter().collect(),
        );
        let rules = RulesMap::new()
            .field("name", ["required", "min:3"])
            .field("age", ["required"]);

        let validated = request
            .validate(&engine(), &session, &rules, &MessageOverrides::new())
            .unwrap();
        assert!(!validated.is_passed());

        assert_eq!(
            session.get(SESSION_KEY_ERRORS).unwrap(),
            Some(json!({"name": "Value for 'name' is must be at least 3 symbols"}))
        );
        assert_eq!(
            session.get(SESSION_KEY_FORM_DATA).unwrap(),
            Some(json!({"name": "ab", "age": "30"}))
        );

        let redirect = validated.into_result().unwrap_err();
        assert_eq!(redirect.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            redirect.headers().get(header::LOCATION).unwrap(),
            "https://example.com/signup"
        );
    }

    #[actix_rt::test]
    async fn test_extractor_reads_json_payload() {
        let (req, mut payload) = TestRequest::post()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .insert_header((header::REFERER, "/form"))
            .set_payload(r#"{"email": "a@example.com"}"#)
            .to_http_parts();

        let request = RequestData::from_request(&req, &mut payload).await.unwrap();
        assert!(request.is_method("POST"));
        assert_eq!(request.input("email"), Some(&json!("a@example.com")));
        assert_eq!(request.referer(), Some("/form"));
    }

    #[actix_rt::test]
    async fn test_extractor_rejects_invalid_json() {
        let (req, mut payload) = TestRequest::post()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{")
            .to_http_parts();

        let err = RequestData::from_request(&req, &mut payload).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::BAD_REQUEST);
    }
}
