use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use std::time::Duration;

use crate::inference::{InferenceError, InferenceService};
use crate::model::AnalysisResult;
use crate::upload::UploadedImage;

pub const ANALYZE_PATH: &str = "/api/analyze";
pub const HEALTH_PATH: &str = "/api/health";

/// Client for a real analysis backend speaking the `AnalysisResult` JSON shape.
pub struct HttpInference {
    client: Client,
    base_url: String,
}

impl HttpInference {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Http(e.to_string()))?;
        Ok(Self::with_client(base_url, client))
    }

    /// Use a preconfigured client (proxy, TLS or timeout settings).
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl InferenceService for HttpInference {
    fn analyze(&self, image: &UploadedImage) -> Result<AnalysisResult, InferenceError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.name().to_string())
            .mime_str(image.format().mime_type())
            .map_err(|e| InferenceError::Http(e.to_string()))?;
        let form = Form::new().part("image", part);

        let url = self.endpoint(ANALYZE_PATH);
        tracing::debug!("POST {url} ({} bytes)", image.bytes().len());
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| InferenceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("analysis backend answered {status}");
            return Err(InferenceError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| InferenceError::Http(e.to_string()))?;
        let result: AnalysisResult =
            serde_json::from_str(&body).map_err(|e| InferenceError::Decode(e.to_string()))?;
        result.validate()?;
        Ok(result)
    }

    fn health(&self) -> bool {
        match self.client.get(self.endpoint(HEALTH_PATH)).send() {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!("health check failed: {e}");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
