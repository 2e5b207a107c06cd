//! OpenAI Files API: upload, list and delete documents referenced by
//! extraction requests.

use std::path::Path;

use reqwest::blocking::multipart::Form;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::OpenAiClient;
use crate::error::{ConnectorError, Result};
use crate::http::RequestOptions;
use crate::providers::decode_json;

/// Purpose attached to uploads meant as model input.
pub const FILE_PURPOSE_USER_DATA: &str = "user_data";

/// A stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub purpose: String,
}

/// Deletion receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDeleted {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    data: Vec<FileObject>,
}

impl OpenAiClient {
    /// Upload a local file with purpose `user_data`.
    pub fn upload_file(&self, path: &Path) -> Result<FileObject> {
        let form = Form::new()
            .text("purpose", FILE_PURPOSE_USER_DATA)
            .file("file", path)
            .map_err(|e| {
                ConnectorError::failure_with_source(format!("cannot read {}", path.display()), e)
            })?;

        let body = self
            .http()
            .request(Method::POST, "files", RequestOptions::new().multipart(form))?;
        let file: FileObject = decode_json(body, "file upload")?;
        info!(file_id = %file.id, bytes = file.bytes, "uploaded file");
        Ok(file)
    }

    pub fn list_files(&self) -> Result<Vec<FileObject>> {
        let body = self.http().get("files", &[])?;
        let list: FileList = decode_json(body, "file list")?;
        Ok(list.data)
    }

    pub fn delete_file(&self, file_id: &str) -> Result<FileDeleted> {
        let body = self.http().delete(&format!("files/{}", file_id))?;
        decode_json(body, "file deletion")
    }

    /// Delete every stored file. Returns `None` when there was nothing to
    /// delete.
    ///
    /// Irreversible; stops at the first failed deletion.
    pub fn delete_all_files(&self) -> Result<Option<Vec<FileDeleted>>> {
        let files = self.list_files()?;
        if files.is_empty() {
            return Ok(None);
        }

        warn!(count = files.len(), "deleting all stored files");
        let deleted = files
            .iter()
            .map(|file| self.delete_file(&file.id))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(deleted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> OpenAiClient {
        let config = OpenAiConfig::default()
            .with_api_key("sk-test")
            .with_base_url(server.url());
        OpenAiClient::new(&config).unwrap()
    }

    #[test]
    fn test_upload_file_sends_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();

        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/files")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("user_data".into()),
                Matcher::Regex("invoice.pdf".into()),
                Matcher::Regex("%PDF-1.4 test".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id": "file-abc", "object": "file", "bytes": 13, "created_at": 1700000000, "filename": "invoice.pdf", "purpose": "user_data"}"#,
            )
            .create();

        let file = client_for(&server).upload_file(&path).unwrap();
        mock.assert();
        assert_eq!(file.id, "file-abc");
        assert_eq!(file.bytes, 13);
        assert_eq!(file.purpose, "user_data");
    }

    #[test]
    fn test_upload_missing_file_fails_before_request() {
        let server = mockito::Server::new();
        let err = client_for(&server)
            .upload_file(Path::new("/nonexistent/invoice.pdf"))
            .unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn test_list_files() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/files")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"object": "list", "data": [{"id": "file-1"}, {"id": "file-2", "filename": "b.pdf"}]}"#)
            .create();

        let files = client_for(&server).list_files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].filename, "b.pdf");
    }

    #[test]
    fn test_delete_all_files() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/files")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"id": "file-1"}, {"id": "file-2"}]}"#)
            .create();
        let deletes = server
            .mock("DELETE", Matcher::Regex(r"^/files/file-\d$".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "file-x", "object": "file", "deleted": true}"#)
            .expect(2)
            .create();

        let deleted = client_for(&server).delete_all_files().unwrap().unwrap();
        deletes.assert();
        assert_eq!(deleted.len(), 2);
        assert!(deleted.iter().all(|d| d.deleted));
    }

    #[test]
    fn test_delete_all_files_when_empty() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/files")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": []}"#)
            .create();

        assert_eq!(client_for(&server).delete_all_files().unwrap(), None);
    }

    #[test]
    fn test_delete_missing_file_is_api_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("DELETE", "/files/file-missing")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"message": "No such File object: file-missing"}}"#)
            .create();

        let err = client_for(&server).delete_file("file-missing").unwrap_err();
        let api = err.as_api_error().unwrap();
        assert_eq!(api.status_code, 404);
        assert!(api.message.contains("No such File object"));
    }
}
