use actix_web::http::{header, StatusCode};
use actix_web::HttpResponse;
use serde::Serialize;

use crate::constants::{CONTENT_TYPE_JSON, MESSAGE_INTERNAL_SERVER_ERROR};

/// Serializes `content` as a JSON response with the given status.
pub fn json<T: Serialize>(content: &T, status: StatusCode) -> HttpResponse {
    match serde_json::to_vec(content) {
        Ok(body) => HttpResponse::build(status)
            .content_type(CONTENT_TYPE_JSON)
            .body(body),
        Err(e) => {
            log::error!("Failed to serialize response body: {}", e);
            HttpResponse::InternalServerError()
                .content_type(CONTENT_TYPE_JSON)
                .body(format!("{{\"message\":\"{}\"}}", MESSAGE_INTERNAL_SERVER_ERROR))
        }
    }
}

/// `303 See Other` pointing at `location`.
pub fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}
