//! Save/load orchestration: pre-submit validation, synonym rollup, payload
//! transform, and the transport round trips.
//!
//! Failures never leave a half-committed session: validation and the
//! serialization guard both run before any network call, and a transport
//! failure surfaces the error while the in-memory model stays as it was.

use serde_json::Value;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tracing::{info, warn};

use crate::api::{SaveResponse, SchemaTransport, SpreadsheetUpload, TransportError};
use crate::core::config::{Config, DEFAULT_PAYLOAD_WARN_BYTES};
use crate::core::error::{SubmitValidationError, TransformError};
use crate::core::model::SchemaModel;
use crate::core::normalize::{egress, ingest};
use crate::core::rollup::{rollup_relationship_synonyms, rollup_table_synonyms};
use crate::core::schema::DatabaseSchema;
use crate::core::wire::WireSchema;

/// Payload metadata keys for the relationship-synonym indexes.
const META_SYNONYMS_BY_ID: &str = "relationship_synonyms_by_id";
const META_SYNONYMS_BY_PAIR: &str = "relationship_synonyms_by_pair";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error(transparent)]
    Validation(#[from] SubmitValidationError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Successful save: the transformed payload (for any caller-side completion
/// handling) plus the backend acknowledgement.
#[derive(Debug)]
pub struct SaveOutcome {
    pub payload: Value,
    pub response: SaveResponse,
}

/// Successful import: the server's updated-column count and the re-ingested
/// session model.
#[derive(Debug)]
pub struct ImportOutcome {
    pub updated_columns: usize,
    pub model: SchemaModel,
}

pub struct PersistenceOrchestrator<T: SchemaTransport> {
    transport: T,
    payload_warn_bytes: usize,
}

impl<T: SchemaTransport> PersistenceOrchestrator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            payload_warn_bytes: DEFAULT_PAYLOAD_WARN_BYTES,
        }
    }

    pub fn with_config(transport: T, config: &Config) -> Self {
        Self {
            transport,
            payload_warn_bytes: config.payload_warn_bytes,
        }
    }

    /// Fetch and ingest the schema for an entity id, starting a session.
    pub async fn load(&self, schema_id: &str) -> Result<SchemaModel, PersistError> {
        let wire = self.transport.fetch_schema(schema_id).await?;
        info!(schema_id, "schema fetched and ingested");
        Ok(SchemaModel::new(ingest(wire)))
    }

    /// Edit-mode entry: normalize a pre-supplied wire payload, skipping the
    /// fetch.
    pub fn enter_edit_mode(&self, wire: WireSchema) -> SchemaModel {
        SchemaModel::new(ingest(wire))
    }

    /// Submit the session. On success the transformed payload comes back to
    /// the caller; on any failure the in-memory model is left unchanged.
    pub async fn save(
        &self,
        schema_id: &str,
        model: &SchemaModel,
    ) -> Result<SaveOutcome, PersistError> {
        let payload = build_save_payload(model)?;
        self.lint_metric_sql(model.schema());

        let payload_bytes = payload.to_string().len();
        if payload_bytes > self.payload_warn_bytes {
            warn!(
                payload_bytes,
                threshold = self.payload_warn_bytes,
                "save payload exceeds the warning threshold"
            );
        }

        let response = self.transport.save_schema(schema_id, &payload).await?;
        info!(schema_id, payload_bytes, "schema saved");
        Ok(SaveOutcome { payload, response })
    }

    /// Request the server-rendered spreadsheet for the persisted schema.
    pub async fn export(&self, schema_id: &str) -> Result<Vec<u8>, PersistError> {
        Ok(self.transport.export_schema(schema_id).await?)
    }

    /// Upload a spreadsheet, then re-ingest the refreshed schema. A failed
    /// upload leaves the current session model untouched (the caller keeps
    /// it; nothing here mutates it).
    pub async fn import(
        &self,
        schema_id: &str,
        upload: SpreadsheetUpload,
    ) -> Result<ImportOutcome, PersistError> {
        let report = self.transport.import_schema(schema_id, upload).await?;
        info!(
            schema_id,
            updated_columns = report.updated_columns,
            "spreadsheet imported, re-ingesting"
        );
        let model = self.load(schema_id).await?;
        Ok(ImportOutcome {
            updated_columns: report.updated_columns,
            model,
        })
    }

    /// Advisory parse check over metric expressions. A failed parse is
    /// logged and never blocks the save: expression syntax is ultimately the
    /// downstream engine's concern.
    fn lint_metric_sql(&self, schema: &DatabaseSchema) {
        let dialect = GenericDialect {};
        let mut check = |owner: &str, name: &str, expression: &str| {
            if expression.trim().is_empty() {
                return;
            }
            let sql = format!("SELECT {expression}");
            if let Err(err) = Parser::parse_sql(&dialect, &sql) {
                warn!(owner, metric = name, %err, "metric expression does not parse");
            }
        };
        for metric in schema.metrics.values() {
            check("schema", &metric.name, &metric.expression);
        }
        for table in schema.tables.values() {
            for metric in table.metric_items.values() {
                check(&table.name, &metric.name, &metric.expression);
            }
        }
    }
}

/// Pre-submit validation. Fatal failures block submission; no network call
/// is made.
pub fn validate_for_save(schema: &DatabaseSchema) -> Result<(), SubmitValidationError> {
    if schema.tables.is_empty() {
        return Err(SubmitValidationError::NoTables);
    }
    if schema.id.trim().is_empty() {
        return Err(SubmitValidationError::MissingSchemaId);
    }
    if schema.display_name.trim().is_empty() {
        return Err(SubmitValidationError::MissingDisplayName);
    }
    if connection_config_is_empty(&schema.connection_config) {
        return Err(SubmitValidationError::MissingConnectionConfig);
    }
    Ok(())
}

/// Validate, roll up, egress, and serialize the session into the save
/// payload. Pure with respect to the model.
pub fn build_save_payload(model: &SchemaModel) -> Result<Value, PersistError> {
    validate_for_save(model.schema())?;

    let mut wire = egress(model.schema());
    wire.synonyms = rollup_table_synonyms(model.schema());

    let rollup = rollup_relationship_synonyms(model.schema());
    wire.metadata.insert(
        META_SYNONYMS_BY_ID.to_string(),
        serde_json::to_value(&rollup.by_relationship).map_err(TransformError)?,
    );
    wire.metadata.insert(
        META_SYNONYMS_BY_PAIR.to_string(),
        serde_json::to_value(&rollup.by_table_pair).map_err(TransformError)?,
    );

    Ok(serde_json::to_value(&wire).map_err(TransformError)?)
}

fn connection_config_is_empty(config: &Value) -> bool {
    match config {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}
