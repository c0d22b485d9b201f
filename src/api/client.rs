//! HTTP implementation of [`SchemaTransport`] over the backend REST surface.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

use crate::api::{ImportResponse, SaveResponse, SchemaTransport, SpreadsheetUpload, TransportError};
use crate::core::config::Config;
use crate::core::wire::WireSchema;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, Duration::from_secs(crate::core::config::DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let base_url = config
            .api_base_url
            .as_deref()
            .ok_or(TransportError::NotConfigured)?;
        Self::with_timeout(base_url, Duration::from_secs(config.request_timeout_secs))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turn a non-2xx response into a [`TransportError::Status`] carrying
    /// whatever message body the backend sent.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SchemaTransport for HttpTransport {
    async fn fetch_schema(&self, schema_id: &str) -> Result<WireSchema, TransportError> {
        debug!(schema_id, "fetching schema");
        let response = self
            .client
            .get(self.endpoint(&format!("schemas/{schema_id}")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn save_schema(
        &self,
        schema_id: &str,
        payload: &serde_json::Value,
    ) -> Result<SaveResponse, TransportError> {
        debug!(schema_id, "saving schema");
        let response = self
            .client
            .put(self.endpoint(&format!("schemas/{schema_id}")))
            .json(payload)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn export_schema(&self, schema_id: &str) -> Result<Vec<u8>, TransportError> {
        debug!(schema_id, "exporting schema spreadsheet");
        let response = self
            .client
            .get(self.endpoint(&format!("schemas/{schema_id}/export")))
            .send()
            .await?;
        Ok(Self::check(response).await?.bytes().await?.to_vec())
    }

    async fn import_schema(
        &self,
        schema_id: &str,
        upload: SpreadsheetUpload,
    ) -> Result<ImportResponse, TransportError> {
        debug!(schema_id, file = %upload.file_name, "importing schema spreadsheet");
        let form = Form::new().part("file", Part::bytes(upload.bytes).file_name(upload.file_name));
        let response = self
            .client
            .post(self.endpoint(&format!("schemas/{schema_id}/import")))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}
