//! Backend transport for ingest/save/export/import.
//!
//! The orchestrator talks to the backend only through [`SchemaTransport`],
//! so tests inject an in-memory implementation and no mutation entry point
//! ever lives on ambient global state.

pub mod client;

pub use client::HttpTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::wire::WireSchema;

/// Transport failures. Surfaced to the caller as notifications; the
/// in-memory model is never changed by a failed call.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("no backend configured (SEMASCHEMA_API_URL is not set)")]
    NotConfigured,
}

/// Backend acknowledgement of a save.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SaveResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Backend report for a spreadsheet import.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImportResponse {
    #[serde(default)]
    pub updated_columns: usize,
}

/// A spreadsheet file selected for import.
#[derive(Debug, Clone)]
pub struct SpreadsheetUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait SchemaTransport: Send + Sync {
    /// Fetch the persisted wire schema for an entity id.
    async fn fetch_schema(&self, schema_id: &str) -> Result<WireSchema, TransportError>;

    /// Persist an egressed payload for an entity id.
    async fn save_schema(
        &self,
        schema_id: &str,
        payload: &serde_json::Value,
    ) -> Result<SaveResponse, TransportError>;

    /// Request the server-generated spreadsheet rendering of the persisted
    /// schema. The caller owns the download side effect.
    async fn export_schema(&self, schema_id: &str) -> Result<Vec<u8>, TransportError>;

    /// Upload a spreadsheet; the server applies it and reports how many
    /// columns changed.
    async fn import_schema(
        &self,
        schema_id: &str,
        upload: SpreadsheetUpload,
    ) -> Result<ImportResponse, TransportError>;
}
