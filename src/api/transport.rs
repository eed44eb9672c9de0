use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;

/// Path and query parameters for a request.
///
/// Path parameters fill `{token}` placeholders in the endpoint template;
/// query parameters are appended as an encoded query string.
#[derive(Debug, Default, Clone)]
pub struct RequestParams<'a> {
    pub path: Vec<(&'a str, &'a str)>,
    pub query: Vec<(&'a str, &'a str)>,
}

impl<'a> RequestParams<'a> {
    pub fn path(key: &'a str, value: &'a str) -> Self {
        Self {
            path: vec![(key, value)],
            query: Vec::new(),
        }
    }

    pub fn query(key: &'a str, value: &'a str) -> Self {
        Self {
            path: Vec::new(),
            query: vec![(key, value)],
        }
    }
}

/// A file ready to be sent as the `file` field of a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping its file name for the upload.
    pub async fn read(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.jpg")
            .to_string();
        Ok(Self { file_name, bytes })
    }

    /// Best-effort MIME type from the file extension.
    pub fn mime_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "heic" => "image/heic",
            _ => "image/jpeg",
        }
    }
}

/// HTTP client bound to a single backend base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client with explicit timeouts.
    ///
    /// The request timeout must outlast the backend's long-poll on the
    /// `wait` endpoints.
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client with default timeouts (useful for testing).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(base_url, Duration::from_secs(10), Duration::from_secs(300))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// JSON GET against `endpoint`, after path substitution and query encoding.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &RequestParams<'_>,
    ) -> Result<T, ApiError> {
        let url = self.url(&resolve_path(endpoint, &params.path));
        debug!(%url, "GET");
        let mut request = json_headers(self.client.get(&url));
        if !params.query.is_empty() {
            request = request.query(&params.query);
        }
        self.send(request).await
    }

    /// JSON POST of `body` against `endpoint`.
    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!(%url, "POST");
        let request = json_headers(self.client.post(&url)).json(body);
        self.send(request).await
    }

    /// Multipart POST with the file under the `file` field.
    ///
    /// No content-type header is set by hand; reqwest adds the multipart
    /// boundary itself.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        file: &UploadFile,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let url = self.url(endpoint);
        debug!(%url, file = %file.file_name, bytes = file.bytes.len(), "POST multipart");
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.mime_type())?;
        let form = Form::new().part("file", part);
        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_upload_body(status.as_u16(), &text, fallback));
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "request failed");
            return Err(ApiError::from_body(status.as_u16(), &text));
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

fn json_headers(request: RequestBuilder) -> RequestBuilder {
    request
        .header("Content-Type", "application/json")
        .header("Accept", "application/json")
}

/// Substitute `{key}` placeholders in an endpoint template.
pub fn resolve_path(template: &str, path: &[(&str, &str)]) -> String {
    path.iter().fold(template.to_string(), |url, (key, value)| {
        url.replace(&format!("{{{key}}}"), value)
    })
}
