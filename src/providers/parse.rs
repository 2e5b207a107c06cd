//! Parse Server object store: class queries, object fetch and update.

use serde_json::{json, Value};

use crate::config::ParseConfig;
use crate::error::Result;
use crate::http::{HttpClient, ResponseBody};

#[derive(Debug, Clone)]
pub struct ParseClient {
    http: HttpClient,
}

impl ParseClient {
    pub fn new(config: &ParseConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::builder(&config.base_url)
            .header("X-Parse-Application-Id", &config.app_id)
            .header("X-Parse-Master-Key", &config.master_key)
            .build()?;
        Ok(Self { http })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&ParseConfig::from_env())
    }

    /// `GET /classes/{class}`. Returns the `results` array; bodies without
    /// one yield an empty list.
    pub fn list_class(&self, class_name: &str, query: &[(&str, &str)]) -> Result<Vec<Value>> {
        let body = self.http.get(&format!("classes/{}", class_name), query)?;
        Ok(match body {
            ResponseBody::Json(Value::Object(mut map)) => match map.remove("results") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            ResponseBody::Json(Value::Array(items)) => items,
            _ => Vec::new(),
        })
    }

    /// `GET /classes/{class}/{id}`. Non-object bodies are wrapped as
    /// `{"data": ...}`.
    pub fn get_object(&self, class_name: &str, object_id: &str) -> Result<Value> {
        let body = self
            .http
            .get(&format!("classes/{}/{}", class_name, object_id), &[])?;
        Ok(match body {
            ResponseBody::Json(value @ Value::Object(_)) => value,
            ResponseBody::Json(other) => json!({ "data": other }),
            ResponseBody::Text(text) => json!({ "data": text }),
            ResponseBody::Empty => json!({ "data": null }),
        })
    }

    /// `PUT /classes/{class}/{id}`. Returns the server's update receipt.
    pub fn update_object(&self, class_name: &str, object_id: &str, fields: Value) -> Result<ResponseBody> {
        self.http
            .put_json(&format!("classes/{}/{}", class_name, object_id), fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> ParseClient {
        let config = ParseConfig {
            base_url: format!("{}/parse", server.url()),
            app_id: "app".into(),
            master_key: "master".into(),
        };
        ParseClient::new(&config).unwrap()
    }

    #[test]
    fn test_missing_credentials() {
        let config = ParseConfig {
            base_url: "https://parse.example.com".into(),
            ..ParseConfig::default()
        };
        let err = ParseClient::new(&config).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m == "Missing Parse credentials: app_id, master_key"));
    }

    #[test]
    fn test_list_class_returns_results() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/parse/classes/Invoice")
            .match_header("x-parse-application-id", "app")
            .match_header("x-parse-master-key", "master")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "2".into()),
                Matcher::UrlEncoded("where".into(), r#"{"paid":false}"#.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"results": [{"objectId": "a"}, {"objectId": "b"}]}"#)
            .create();

        let items = client_for(&server)
            .list_class("Invoice", &[("limit", "2"), ("where", r#"{"paid":false}"#)])
            .unwrap();
        mock.assert();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["objectId"], "b");
    }

    #[test]
    fn test_list_class_without_results_is_empty() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/parse/classes/Invoice")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"count": 0}"#)
            .create();

        assert!(client_for(&server).list_class("Invoice", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_list_class_accepts_bare_array() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/parse/classes/Invoice")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"objectId": "a"}]"#)
            .create();

        assert_eq!(client_for(&server).list_class("Invoice", &[]).unwrap().len(), 1);
    }

    #[test]
    fn test_get_object_wraps_non_objects() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/parse/classes/Invoice/a")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"objectId": "a", "total": 42}"#)
            .create();
        let _mock = server
            .mock("GET", "/parse/classes/Invoice/b")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[1, 2]")
            .create();

        let client = client_for(&server);
        assert_eq!(client.get_object("Invoice", "a").unwrap()["total"], 42);
        assert_eq!(
            client.get_object("Invoice", "b").unwrap(),
            json!({"data": [1, 2]})
        );
    }

    #[test]
    fn test_get_missing_object_is_api_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/parse/classes/Invoice/zzz")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code": 101, "error": "Object not found."}"#)
            .create();

        let err = client_for(&server).get_object("Invoice", "zzz").unwrap_err();
        let api = err.as_api_error().unwrap();
        assert_eq!(api.status_code, 404);
        assert_eq!(api.message, "Object not found.");
    }

    #[test]
    fn test_update_object_puts_fields() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("PUT", "/parse/classes/Invoice/a")
            .match_body(Matcher::Json(json!({"paid": true})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"updatedAt": "2024-05-01T10:00:00.000Z"}"#)
            .create();

        let receipt = client_for(&server)
            .update_object("Invoice", "a", json!({"paid": true}))
            .unwrap();
        mock.assert();
        assert_eq!(receipt.as_json().unwrap()["updatedAt"], "2024-05-01T10:00:00.000Z");
    }
}
