use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::error::ClientError;
use crate::state::{ChatRequest, ChatResponse, UploadReceipt, UploadResponse};
use crate::upload::Document;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// The two calls the document backend offers.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn upload(&self, document: Document) -> Result<UploadReceipt, ClientError>;
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ClientError>;
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    upload_timeout: Duration,
    chat_timeout: Option<Duration>,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            chat_timeout: None,
        }
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn with_chat_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.chat_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn upload(&self, document: Document) -> Result<UploadReceipt, ClientError> {
        let url = format!("{}/upload/", self.base_url);
        let fallback_name = document.file_name.clone();
        tracing::info!(file = %document.file_name, bytes = document.bytes.len(), "uploading document");

        let part = Part::bytes(document.bytes)
            .file_name(document.file_name)
            .mime_str("application/pdf")
            .map_err(|e| ClientError::from_reqwest(&url, e))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(&url, e))?;

        // Only a plain 200 counts as processed.
        if response.status() != StatusCode::OK {
            return Err(backend_error(response).await);
        }

        let body = response.text().await.map_err(|e| ClientError::from_reqwest(&url, e))?;
        let parsed: UploadResponse = serde_json::from_str(&body).unwrap_or_default();
        Ok(UploadReceipt {
            file_name: parsed.file_name.unwrap_or(fallback_name),
            message: parsed.message,
        })
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ClientError> {
        let url = format!("{}/chat/", self.base_url);
        tracing::debug!(history = request.chat_history.len(), "sending question");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(timeout) = self.chat_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(&url, e))?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Build a backend error, keeping the `detail` string from a JSON body
async fn backend_error(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::Backend {
        status,
        detail: extract_detail(&body),
    }
}

fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
}
