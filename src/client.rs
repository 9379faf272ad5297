//! HTTP client for a docsign server.
//!
//! Each call is exactly one request. The response body is parsed as JSON
//! and handed back as-is, whatever the status code; only transport
//! failures and non-JSON bodies become errors.

use crate::error::{Result, SignError};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// File name browsers give an anonymous blob upload.
const BLOB_FILE_NAME: &str = "blob";

/// A document to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl Document {
    pub fn new<B: Into<Vec<u8>>>(bytes: B) -> Self {
        Self {
            bytes: bytes.into(),
            filename: None,
            content_type: None,
        }
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a document from disk, keeping its file name.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut document = Self::new(std::fs::read(path)?);
        if let Some(name) = path.file_name() {
            document.filename = Some(name.to_string_lossy().into_owned());
        }
        Ok(document)
    }

    fn into_part(self) -> Result<Part> {
        let part = Part::bytes(self.bytes)
            .file_name(self.filename.unwrap_or_else(|| BLOB_FILE_NAME.to_string()));
        match self.content_type {
            Some(content_type) => Ok(part.mime_str(&content_type)?),
            None => Ok(part),
        }
    }
}

impl From<Vec<u8>> for Document {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for Document {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Client for the key provisioning, signing and verification endpoints.
#[derive(Debug, Clone)]
pub struct SignClient {
    base_url: Url,
    http: reqwest::Client,
}

impl SignClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_http_client(base_url, reqwest::Client::new())
    }

    /// Create a client that sends through a preconfigured
    /// `reqwest::Client` (timeouts, proxies, TLS roots).
    pub fn with_http_client(base_url: &str, http: reqwest::Client) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            SignError::InvalidFormat(format!("Invalid base URL {}: {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SignError::InvalidFormat(format!(
                "Base URL cannot carry a path: {}",
                base_url
            )));
        }
        Ok(Self { base_url, http })
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        // the url crate drops dot segments instead of encoding them
        if let Some(dot) = segments.iter().find(|s| matches!(**s, "." | "..")) {
            return Err(SignError::InvalidFormat(format!(
                "Path segment {:?} cannot be sent in a URL",
                dot
            )));
        }
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                SignError::InvalidFormat(format!(
                    "Base URL cannot carry a path: {}",
                    self.base_url
                ))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        tracing::debug!(status = %response.status(), url = %response.url(), "docsign response");
        Ok(response.json::<Value>().await?)
    }

    /// Create key material for `user_id`: `POST /users/{user_id}/keys`,
    /// no body. A user id of `.` or `..` is refused without sending.
    pub async fn generate_keys(&self, user_id: &str) -> Result<Value> {
        let url = self.endpoint(&["users", user_id, "keys"])?;
        let response = self.http.post(url).send().await?;
        Self::read_json(response).await
    }

    /// Sign a document: `POST /sign` with multipart fields `user_id`,
    /// `document` and `signature_base64`.
    pub async fn sign_document<D: Into<Document>>(
        &self,
        user_id: &str,
        document: D,
        signature_base64: &str,
    ) -> Result<Value> {
        let form = Form::new()
            .text("user_id", user_id.to_string())
            .part("document", document.into().into_part()?)
            .text("signature_base64", signature_base64.to_string());

        let url = self.endpoint(&["sign"])?;
        let response = self.http.post(url).multipart(form).send().await?;
        Self::read_json(response).await
    }

    /// Verify a signature: `POST /verify` with multipart fields `document`,
    /// `signed_package` (the package serialized as a JSON blob) and
    /// `signature_base64`.
    pub async fn verify_signature<D, P>(
        &self,
        document: D,
        signed_package: &P,
        signature_base64: &str,
    ) -> Result<Value>
    where
        D: Into<Document>,
        P: Serialize + ?Sized,
    {
        let package = Part::bytes(serde_json::to_vec(signed_package)?)
            .file_name(BLOB_FILE_NAME)
            .mime_str("application/json")?;

        let form = Form::new()
            .part("document", document.into().into_part()?)
            .part("signed_package", package)
            .text("signature_base64", signature_base64.to_string());

        let url = self.endpoint(&["verify"])?;
        let response = self.http.post(url).multipart(form).send().await?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        let client = SignClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.endpoint(&["users", "alice", "keys"]).unwrap().as_str(),
            "http://localhost:8000/users/alice/keys"
        );

        let client = SignClient::new("http://localhost:8000/api/").unwrap();
        assert_eq!(
            client.endpoint(&["sign"]).unwrap().as_str(),
            "http://localhost:8000/api/sign"
        );
    }

    #[test]
    fn test_user_id_is_one_path_segment() {
        let client = SignClient::new("http://localhost:8000").unwrap();
        let url = client.endpoint(&["users", "a/b c", "keys"]).unwrap();
        assert_eq!(url.path(), "/users/a%2Fb%20c/keys");

        for user_id in [".", ".."] {
            let err = client.endpoint(&["users", user_id, "keys"]).unwrap_err();
            assert!(matches!(err, SignError::InvalidFormat(_)));
        }
        let url = client.endpoint(&["users", "a.b", "keys"]).unwrap();
        assert_eq!(url.path(), "/users/a.b/keys");
    }

    #[test]
    fn test_bad_base_url() {
        assert!(SignClient::new("not a url").is_err());
        assert!(SignClient::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_document_builders() {
        let document = Document::from("hello")
            .with_filename("hello.txt")
            .with_content_type("text/plain");
        assert_eq!(document.bytes, b"hello");
        assert_eq!(document.filename.as_deref(), Some("hello.txt"));
        assert!(document.into_part().is_ok());
    }
}
