//! Outbound HTTP transport shared by every connector.
//!
//! One [`HttpClient`] wraps one pooled `reqwest::blocking::Client` bound to a
//! base URL. Every call is timed and logged once; failures are mapped onto
//! the crate error taxonomy. There is no retry.

pub mod types;

pub use types::*;

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use tracing::info;
use url::Url;

use crate::error::{ApiError, ConnectorError, Error, Result};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Error messages derived from response bodies are cut to this many chars.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 1000;

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    base_url: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
}

impl HttpClientBuilder {
    /// Static header sent with every call (auth, app keys).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::config(format!("invalid header name '{}': {}", name, e)))?;
            let mut value = HeaderValue::from_str(value)
                .map_err(|e| Error::config(format!("invalid value for header '{}': {}", name, e)))?;
            value.set_sensitive(true);
            default_headers.insert(name, value);
        }

        let client = reqwest::blocking::Client::builder()
            .default_headers(default_headers)
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(HttpClient {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            timeout: self.timeout,
        })
    }
}

/// Blocking REST client bound to one base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpClient {
    pub fn builder(base_url: impl Into<String>) -> HttpClientBuilder {
        HttpClientBuilder {
            base_url: base_url.into(),
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Join `path` onto the base URL with exactly one separator.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn resolve(&self, path: &str, query: &[(String, String)]) -> Result<String> {
        let url = self.url(path);
        if query.is_empty() {
            return Ok(url);
        }
        let mut parsed =
            Url::parse(&url).map_err(|e| ApiError::new(0, format!("invalid URL: {}", e), &url))?;
        parsed.query_pairs_mut().extend_pairs(query);
        Ok(parsed.into())
    }

    /// Send a request and return the raw exchange.
    ///
    /// Only transport-level failures are errors here (status code 0); any
    /// HTTP status is returned as-is for the caller to interpret.
    pub fn execute(&self, method: Method, path: &str, options: RequestOptions) -> Result<RawResponse> {
        let url = self.resolve(path, &options.query)?;

        let mut request = self
            .client
            .request(method.clone(), &url)
            .timeout(options.timeout.unwrap_or(self.timeout));
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request = match options.body {
            Some(RequestBody::Json(body)) => request.json(&body),
            Some(RequestBody::Text(body)) => request.body(body),
            Some(RequestBody::Bytes(body)) => request.body(body),
            Some(RequestBody::Multipart(form)) => request.multipart(form),
            None => request,
        };

        let started = Instant::now();
        let response = request
            .send()
            .map_err(|e| ApiError::new(0, e.to_string(), &url))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();
        let body = response
            .bytes()
            .map_err(|e| ApiError::new(0, e.to_string(), &url))?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            http.method = %method,
            http.url = %url,
            http.status_code = status,
            elapsed_ms,
            "{} {} -> {} ({}ms)",
            method,
            url,
            status,
            elapsed_ms
        );

        Ok(RawResponse {
            status,
            request_url: url,
            url: final_url,
            content_type,
            body,
        })
    }

    /// Send a request and interpret the response by status and content type.
    pub fn request(&self, method: Method, path: &str, options: RequestOptions) -> Result<ResponseBody> {
        let raw = self.execute(method, path, options)?;
        interpret(raw)
    }

    pub fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ResponseBody> {
        let options = query
            .iter()
            .fold(RequestOptions::new(), |opts, (k, v)| opts.query(*k, *v));
        self.request(Method::GET, path, options)
    }

    pub fn post_json(&self, path: &str, body: Value) -> Result<ResponseBody> {
        self.request(Method::POST, path, RequestOptions::new().json(body))
    }

    pub fn put_json(&self, path: &str, body: Value) -> Result<ResponseBody> {
        self.request(Method::PUT, path, RequestOptions::new().json(body))
    }

    pub fn delete(&self, path: &str) -> Result<ResponseBody> {
        self.request(Method::DELETE, path, RequestOptions::new())
    }
}

/// Map an error status onto a typed error; 2xx passes.
///
/// 429 is checked before any other non-2xx status.
pub fn check_status(raw: &RawResponse) -> Result<()> {
    if raw.status == 429 {
        return Err(ConnectorError::RateLimit(format!("Rate limit (429) on {}", raw.request_url)).into());
    }

    if !raw.is_success() {
        let message = error_message(&raw.body);
        return Err(ApiError::new(raw.status, message, &raw.url).into());
    }

    Ok(())
}

/// Map a raw exchange onto a body or a typed error.
pub fn interpret(raw: RawResponse) -> Result<ResponseBody> {
    check_status(&raw)?;

    if raw.status == 204 {
        return Ok(ResponseBody::Empty);
    }

    if raw.is_json() {
        let value: Value = raw.json().map_err(|e| {
            ApiError::new(raw.status, format!("invalid JSON response body: {}", e), &raw.url)
        })?;
        return Ok(ResponseBody::Json(value));
    }

    Ok(ResponseBody::Text(raw.text()))
}

/// Derive an error message from a failed response body.
///
/// Prefers the `error` then `message` field of a JSON document, falling back
/// to the trimmed body text.
pub fn error_message(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let message = match serde_json::from_str::<Value>(&text) {
        Ok(payload) => describe_error_payload(&payload),
        Err(_) => text.trim().to_string(),
    };
    truncate_chars(&message, MAX_ERROR_MESSAGE_CHARS)
}

fn describe_error_payload(payload: &Value) -> String {
    let present = |v: &&Value| !v.is_null() && v.as_str() != Some("");
    let field = payload
        .get("error")
        .filter(present)
        .or_else(|| payload.get("message").filter(present));
    match field {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => payload.to_string(),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> HttpClient {
        HttpClient::builder(server.url()).build().unwrap()
    }

    #[test]
    fn test_url_trims_duplicate_separators() {
        let client = HttpClient::builder("https://api.example.com/v1/").build().unwrap();
        assert_eq!(client.url("/files"), "https://api.example.com/v1/files");
        assert_eq!(client.url("files"), "https://api.example.com/v1/files");
        assert_eq!(client.base_url(), "https://api.example.com/v1");
    }

    #[test]
    fn test_default_timeout() {
        let client = HttpClient::builder("https://api.example.com").build().unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let err = HttpClient::builder("https://api.example.com")
            .header("bad header", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_json_response_is_parsed() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/items")
            .with_status(200)
            .with_header("content-type", "application/json; charset=utf-8")
            .with_body(r#"{"results": [1, 2, 3]}"#)
            .create();

        let body = client_for(&server).get("/items", &[]).unwrap();
        mock.assert();
        assert_eq!(body, ResponseBody::Json(serde_json::json!({"results": [1, 2, 3]})));
    }

    #[test]
    fn test_non_json_response_is_verbatim_text() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/plain")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("  {\"looks\": \"like json\"}  ")
            .create();

        let body = client_for(&server).get("plain", &[]).unwrap();
        assert_eq!(body, ResponseBody::Text("  {\"looks\": \"like json\"}  ".to_string()));
    }

    #[test]
    fn test_no_content_is_empty() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("DELETE", "/items/1")
            .with_status(204)
            .with_header("content-type", "application/json")
            .create();

        let body = client_for(&server).delete("/items/1").unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_rate_limit_takes_priority_over_api_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/generate")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "quota exceeded"}"#)
            .create();

        let err = client_for(&server)
            .post_json("/generate", serde_json::json!({}))
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert!(err.as_api_error().is_none());
        assert!(err.to_string().contains("Rate limit (429) on"));
        assert!(err.to_string().contains("/generate"));
    }

    #[test]
    fn test_api_error_uses_json_error_field() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/broken")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "internal failure", "message": "ignored"}"#)
            .create();

        let err = client_for(&server).get("/broken", &[]).unwrap_err();
        let api = err.as_api_error().unwrap();
        assert_eq!(api.status_code, 500);
        assert_eq!(api.message, "internal failure");
        assert!(api.url.ends_with("/broken"));
        assert!(api.details.is_none());
    }

    #[test]
    fn test_api_error_falls_back_to_message_field() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body(r#"{"code": 101, "message": "Object not found."}"#)
            .create();

        let err = client_for(&server).get("/missing", &[]).unwrap_err();
        assert_eq!(err.as_api_error().unwrap().message, "Object not found.");
    }

    #[test]
    fn test_api_error_text_body_truncated() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/huge")
            .with_status(502)
            .with_header("content-type", "text/html")
            .with_body("x".repeat(1500))
            .create();

        let err = client_for(&server).get("/huge", &[]).unwrap_err();
        let api = err.as_api_error().unwrap();
        assert_eq!(api.status_code, 502);
        assert_eq!(api.message.chars().count(), MAX_ERROR_MESSAGE_CHARS);
    }

    #[test]
    fn test_transport_failure_is_status_zero() {
        let client = HttpClient::builder("http://127.0.0.1:1").build().unwrap();
        let err = client.get("/unreachable", &[]).unwrap_err();
        let api = err.as_api_error().unwrap();
        assert_eq!(api.status_code, 0);
        assert_eq!(api.url, "http://127.0.0.1:1/unreachable");
        assert!(!api.message.is_empty());
    }

    #[test]
    fn test_per_call_timeout_is_transport_failure() {
        // Accepted by the kernel backlog but never answered.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = HttpClient::builder(format!("http://{}", addr)).build().unwrap();

        let err = client
            .request(
                Method::GET,
                "/slow",
                RequestOptions::new().timeout(Duration::from_millis(200)),
            )
            .unwrap_err();
        assert_eq!(err.as_api_error().unwrap().status_code, 0);
        drop(listener);
    }

    #[test]
    fn test_static_headers_and_per_call_override() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/secure")
            .match_header("authorization", "Bearer token123")
            .match_header("x-app-id", "override")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("ok")
            .create();

        let client = HttpClient::builder(server.url())
            .bearer_auth("token123")
            .header("X-App-Id", "static")
            .build()
            .unwrap();
        let body = client
            .request(
                Method::GET,
                "/secure",
                RequestOptions::new().header("X-App-Id", "override"),
            )
            .unwrap();
        mock.assert();
        assert_eq!(body.as_text(), Some("ok"));
    }

    #[test]
    fn test_query_and_json_body_are_sent() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("PUT", "/api/classes/Item/abc")
            .match_query(Matcher::UrlEncoded("where".into(), r#"{"a":1}"#.into()))
            .match_body(Matcher::Json(serde_json::json!({"name": "x"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"updatedAt": "2024-01-01"}"#)
            .create();

        let client = HttpClient::builder(format!("{}/api/", server.url())).build().unwrap();
        let body = client
            .request(
                Method::PUT,
                "/classes/Item/abc",
                RequestOptions::new()
                    .query("where", r#"{"a":1}"#)
                    .json(serde_json::json!({"name": "x"})),
            )
            .unwrap();
        mock.assert();
        assert_eq!(body.as_json().unwrap()["updatedAt"], "2024-01-01");
    }

    #[test]
    fn test_invalid_json_with_json_content_type() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/garbled")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{not json")
            .create();

        let err = client_for(&server).get("/garbled", &[]).unwrap_err();
        let api = err.as_api_error().unwrap();
        assert_eq!(api.status_code, 200);
        assert!(api.message.starts_with("invalid JSON response body"));
    }

    #[test]
    fn test_error_message_rules() {
        assert_eq!(error_message(br#"{"error": "boom"}"#), "boom");
        assert_eq!(error_message(br#"{"error": null, "message": "m"}"#), "m");
        assert_eq!(
            error_message(br#"{"error": {"message": "nested"}}"#),
            r#"{"message":"nested"}"#
        );
        assert_eq!(error_message(br#"{"detail": "x"}"#), r#"{"detail":"x"}"#);
        assert_eq!(error_message(b"  upstream down \n"), "upstream down");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        let s = "é".repeat(1200);
        let cut = truncate_chars(&s, MAX_ERROR_MESSAGE_CHARS);
        assert_eq!(cut.chars().count(), 1000);
        assert_eq!(truncate_chars("short", 1000), "short");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn request_lines(&self) -> Vec<String> {
            let raw = self.0.lock().unwrap();
            String::from_utf8_lossy(&raw)
                .lines()
                .filter(|line| line.contains("connectors::http"))
                .map(str::to_string)
                .collect()
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        (out, logs)
    }

    #[test]
    fn test_each_call_logs_one_line() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body("pong")
            .create();
        let client = client_for(&server);
        let url = client.url("ping");

        let (body, logs) = with_captured_logs(|| client.get("ping", &[]));
        assert_eq!(body.unwrap(), ResponseBody::Text("pong".to_string()));

        let lines = logs.request_lines();
        assert_eq!(lines.len(), 1, "{:?}", lines);
        let line = &lines[0];
        assert!(line.contains("INFO"));
        assert!(line.contains("GET"));
        assert!(line.contains(&url));
        assert!(line.contains("200"));
        assert!(line.contains("ms"));
    }

    #[test]
    fn test_failed_call_is_logged_before_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/boom")
            .with_status(500)
            .with_body("internal failure")
            .create();
        let client = client_for(&server);
        let url = client.url("boom");

        let (result, logs) = with_captured_logs(|| client.get("boom", &[]));
        assert_eq!(result.unwrap_err().as_api_error().unwrap().status_code, 500);

        let lines = logs.request_lines();
        assert_eq!(lines.len(), 1, "{:?}", lines);
        assert!(lines[0].contains(&url));
        assert!(lines[0].contains("500"));
    }
}
