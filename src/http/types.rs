//! Request and response values for the transport client.

use std::time::Duration;

use bytes::Bytes;
use reqwest::blocking::multipart::Form;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Outbound request body
#[derive(Debug)]
pub enum RequestBody {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
    Multipart(Form),
}

/// Per-call options: query string, body, timeout and header overrides.
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn bytes(mut self, body: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Bytes(body));
        self
    }

    pub fn multipart(mut self, form: Form) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }

    /// Override the client's default timeout for this call only.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add or override a header for this call only.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Interpreted response body. Exactly one shape per response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Content type declared JSON
    Json(Value),
    /// Any other content type, verbatim
    Text(String),
    /// 204 No Content
    Empty,
}

impl ResponseBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Deserialize a JSON body into `T`.
    pub fn deserialize<T: DeserializeOwned>(self) -> Option<Result<T, serde_json::Error>> {
        self.into_json().map(serde_json::from_value)
    }
}

/// A completed HTTP exchange before status interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// URL the request was sent to
    pub request_url: String,
    /// Final URL after redirects
    pub url: String,
    /// Lowercased `Content-Type`, empty when absent
    pub content_type: String,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type.contains("json")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, content_type: &str, body: &str) -> RawResponse {
        RawResponse {
            status,
            request_url: "https://api.example.com/x".to_string(),
            url: "https://api.example.com/x".to_string(),
            content_type: content_type.to_string(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_request_options_builder() {
        let opts = RequestOptions::new()
            .query("limit", "10")
            .header("X-Trace", "abc")
            .timeout(Duration::from_secs(3))
            .json(serde_json::json!({"a": 1}));
        assert_eq!(opts.query, vec![("limit".to_string(), "10".to_string())]);
        assert_eq!(opts.headers.len(), 1);
        assert_eq!(opts.timeout, Some(Duration::from_secs(3)));
        assert!(matches!(opts.body, Some(RequestBody::Json(_))));
    }

    #[test]
    fn test_last_body_wins() {
        let opts = RequestOptions::new().text("first").bytes(vec![1, 2]);
        assert!(matches!(opts.body, Some(RequestBody::Bytes(ref b)) if b == &vec![1, 2]));
    }

    #[test]
    fn test_response_body_accessors() {
        let json = ResponseBody::Json(serde_json::json!({"ok": true}));
        assert_eq!(json.as_json().unwrap()["ok"], true);
        assert!(json.as_text().is_none());

        let text = ResponseBody::Text("hello".to_string());
        assert_eq!(text.as_text(), Some("hello"));
        assert!(text.clone().into_json().is_none());

        assert!(ResponseBody::Empty.is_empty());
    }

    #[test]
    fn test_response_body_deserialize() {
        #[derive(serde::Deserialize)]
        struct Item {
            id: u32,
        }
        let body = ResponseBody::Json(serde_json::json!({"id": 7}));
        let item: Item = body.deserialize().unwrap().unwrap();
        assert_eq!(item.id, 7);
        assert!(ResponseBody::Empty.deserialize::<Item>().is_none());
    }

    #[test]
    fn test_raw_response_classification() {
        assert!(raw(200, "application/json; charset=utf-8", "{}").is_json());
        assert!(raw(200, "application/problem+json", "{}").is_json());
        assert!(!raw(200, "text/plain", "hi").is_json());
        assert!(raw(204, "", "").is_success());
        assert!(!raw(302, "", "").is_success());
        assert_eq!(raw(200, "text/plain", "hi").text(), "hi");
    }
}
