//! Outbound responses.
//!
//! # Responsibilities
//! - Carry status, headers and a rendered body back to the transport
//! - Provide constructors for the common shapes (text, HTML, JSON, redirect)
//! - Convert into an axum response at the transport boundary
//!
//! # Design Decisions
//! - Bodies are fully rendered strings; rendering happens before dispatch ends
//! - Request ID echoed by the transport layer, not stored here

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;

use crate::uri::Uri;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// A response produced by a handler or by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Response {
    /// Plain-text response.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// `200 OK` plain text.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, body).with_header(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML))
    }

    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_string(value)?;
        Ok(Self::new(status, body).with_header(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON)))
    }

    /// `302 Found` pointing at `location`.
    pub fn redirect(location: &Uri) -> Result<Self, header::InvalidHeaderValue> {
        let value = HeaderValue::from_str(&location.to_string())?;
        Ok(Self::new(StatusCode::FOUND, "").with_header(header::LOCATION, value))
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status, self.body).into_response();
        response.headers_mut().extend(self.headers);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors_set_content_type() {
        assert_eq!(Response::ok("x").content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(
            Response::html(StatusCode::NOT_FOUND, "<p/>").content_type(),
            Some("text/html; charset=utf-8")
        );

        let json = Response::json(StatusCode::CREATED, &json!({"id": 7})).unwrap();
        assert_eq!(json.status(), StatusCode::CREATED);
        assert_eq!(json.body(), r#"{"id":7}"#);
        assert_eq!(json.content_type(), Some("application/json"));
    }

    #[test]
    fn test_redirect() {
        let target = Uri::parse("https://example.com/next?a=1").unwrap();
        let response = Response::redirect(&target).unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://example.com/next?a=1"
        );
    }

    #[test]
    fn test_into_axum_response() {
        let response = Response::html(StatusCode::IM_A_TEAPOT, "tea").into_response();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }
}
