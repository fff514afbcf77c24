//! Image attachment upload
//!
//! Uploads go to an external endpoint as a single multipart file under
//! the `data` form key. The response body is an opaque descriptor used
//! only to confirm success; the chat message referencing the upload
//! carries fixed placeholder text instead.

use crate::config::WidgetConfig;
use crate::gateway::GatewayError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// A single dropped file
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Opaque descriptor returned by the upload endpoint
#[derive(Debug, Clone)]
pub struct UploadReceipt(pub serde_json::Value);

/// External file-upload capability
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, attachment: Attachment) -> Result<UploadReceipt, GatewayError>;
}

/// Production uploader POSTing to the configured endpoint
pub struct HttpUploader {
    client: Client,
    upload_url: String,
}

impl HttpUploader {
    pub fn new(config: &WidgetConfig) -> Self {
        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            upload_url: config.upload_url.clone(),
        }
    }
}

#[async_trait]
impl FileUploader for HttpUploader {
    async fn upload(&self, attachment: Attachment) -> Result<UploadReceipt, GatewayError> {
        let part = Part::bytes(attachment.bytes)
            .file_name(attachment.file_name)
            .mime_str(&attachment.content_type)
            .map_err(|e| GatewayError::invalid_request(format!("Bad content type: {e}")))?;
        let form = Form::new().part("data", part);

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::network(format!("Upload timeout: {e}"))
                } else if e.is_connect() {
                    GatewayError::network(format!("Upload connection failed: {e}"))
                } else {
                    GatewayError::unknown(format!("Upload failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::network(format!("Failed to read upload response: {e}")))?;

        if !status.is_success() {
            return Err(match status.as_u16() {
                400 => GatewayError::invalid_request(format!("Upload rejected: {body}")),
                500..=599 => GatewayError::server_error(format!("Upload server error: {body}")),
                _ => GatewayError::unknown(format!("Upload HTTP {status}: {body}")),
            });
        }

        let descriptor = serde_json::from_str(&body)
            .map_err(|e| GatewayError::unknown(format!("Undecodable upload response: {e}")))?;
        Ok(UploadReceipt(descriptor))
    }
}
