//! Question-answering backend client

use std::time::Duration;

use log::debug;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::documents::PDF_CONTENT_TYPE;

/// A file sent along with a question
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Non-2xx reply. `error` and `message` come from the JSON body.
    #[error("server returned {status}: {}", .error.as_deref().unwrap_or("Server error"))]
    Status {
        status: u16,
        error: Option<String>,
        message: Option<String>,
    },

    #[error("{0}")]
    Network(String),
}

#[allow(async_fn_in_trait)]
pub trait ChatBackend {
    /// Ask a question about the attached documents. An empty string means
    /// the backend replied without an answer.
    async fn ask(&self, question: &str, attachments: Vec<Attachment>)
    -> Result<String, BackendError>;

    /// Download a remote document
    async fn fetch_document(&self, url: &str) -> Result<Vec<u8>, BackendError>;
}

#[derive(Debug, Default, Deserialize)]
struct AnswerBody {
    #[serde(default)]
    answer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Talks to the `/ask` endpoint over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChatBackend for HttpBackend {
    async fn ask(
        &self,
        question: &str,
        attachments: Vec<Attachment>,
    ) -> Result<String, BackendError> {
        let mut form = Form::new().text("question", question.to_string());
        for attachment in attachments {
            let part = Part::bytes(attachment.bytes)
                .file_name(attachment.filename)
                .mime_str(PDF_CONTENT_TYPE)
                .map_err(|e| BackendError::Network(e.to_string()))?;
            form = form.part("files", part);
        }

        let url = format!("{}/ask", self.endpoint);
        debug!("POST {url}");
        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if !status.is_success() {
            let parsed: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                error: parsed.error,
                message: parsed.message,
            });
        }

        let parsed: AnswerBody = serde_json::from_slice(&body)
            .map_err(|e| BackendError::Network(format!("invalid response body: {e}")))?;
        Ok(parsed.answer.unwrap_or_default())
    }

    async fn fetch_document(&self, url: &str) -> Result<Vec<u8>, BackendError> {
        if !is_http_url(url) {
            let path = url.strip_prefix("file://").unwrap_or(url);
            return tokio::fs::read(path)
                .await
                .map_err(|e| BackendError::Network(format!("{path}: {e}")));
        }

        debug!("GET {url}");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                error: None,
                message: None,
            });
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Whether `url` needs a network fetch rather than a filesystem read
#[must_use]
pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
