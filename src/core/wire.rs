//! Wire-format types for the persisted schema representation.
//!
//! The wire shape is external and loosely specified: synonyms arrive as plain
//! strings or `{synonym, sample_values}` objects, foreign keys as a bool or a
//! detailed reference, relationships in a compact `from`/`to` form or fully
//! structured, and table metrics as a name list or a name->definition map.
//! Each of those is a tagged union here, resolved once at the ingest boundary
//! ([`crate::core::normalize`]); the rest of the crate only ever sees the
//! canonical editable model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct WireSchema {
    pub id: String,
    pub display_name: String,
    pub dialect: String,
    pub schema_prefix: String,
    pub connection_config: Value,
    pub tables: BTreeMap<String, WireTable>,
    pub relationships: Vec<WireRelationship>,
    /// Schema-level synonym name -> sample values.
    pub synonyms: BTreeMap<String, Vec<String>>,
    /// Schema-scope metrics.
    pub metrics: Vec<WireMetric>,
    pub aliases: WireAliases,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Short-form names for tables and columns, keyed by table name.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct WireAliases {
    pub table_aliases: BTreeMap<String, String>,
    pub column_aliases: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct WireTable {
    /// Usually redundant with the map key; the key wins on ingest.
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub business_context: String,
    pub schema_name: String,
    pub database_id: String,
    pub columns: BTreeMap<String, WireColumn>,
    pub synonyms: Vec<WireSynonym>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<WireTableMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Table metrics: a name->definition map, or a legacy plain name list.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum WireTableMetrics {
    Definitions(BTreeMap<String, WireMetricDef>),
    Names(Vec<String>),
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct WireMetricDef {
    pub expression: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub default_filters: Vec<String>,
}

/// Schema-scope metric entry.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct WireMetric {
    pub name: String,
    pub expression: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub default_filters: Vec<String>,
}

/// A synonym as it may arrive on the wire: bare string or full group.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum WireSynonym {
    Plain(String),
    Grouped {
        synonym: String,
        #[serde(default)]
        sample_values: Vec<String>,
    },
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct WireColumn {
    // Primary fields.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fk: Option<bool>,
    // Legacy fields, kept for backward compatibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub business_context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary_key: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_foreign_key: Option<WireForeignKey>,
    pub exclude_column: bool,
    pub synonyms: Vec<WireSynonym>,
    pub business_description: String,
    pub business_terms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub is_preferred: bool,
    pub use_cases: Vec<String>,
    pub relevance_keywords: Vec<String>,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Legacy foreign-key field: a flag, or a detailed `{table, column}` target.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum WireForeignKey {
    Flag(bool),
    Reference { table: String, column: String },
}

/// A relationship on the wire. Structured entries pass through ingest
/// unchanged; compact entries carry `"table.col1,col2"` endpoint strings.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum WireRelationship {
    Structured(StructuredRelationship),
    Compact(CompactRelationship),
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct StructuredRelationship {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source_table_id: String,
    #[serde(default)]
    pub source_columns: Vec<String>,
    pub target_table_id: String,
    #[serde(default)]
    pub target_columns: Vec<String>,
    #[serde(default, rename = "type", alias = "relationship_type")]
    pub relationship_type: Option<String>,
    #[serde(default)]
    pub cardinality_ratio: Option<String>,
    #[serde(default)]
    pub join_sql: Option<String>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CompactRelationship {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "from")]
    pub from_field: String,
    pub to: String,
    #[serde(default, rename = "type", alias = "relationship_type")]
    pub relationship_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_sql: Option<String>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synonym_accepts_both_shapes() {
        let parsed: Vec<WireSynonym> =
            serde_json::from_str(r#"["vip", {"synonym": "big spenders", "sample_values": ["VIP"]}]"#)
                .unwrap();
        assert_eq!(parsed[0], WireSynonym::Plain("vip".into()));
        assert_eq!(
            parsed[1],
            WireSynonym::Grouped {
                synonym: "big spenders".into(),
                sample_values: vec!["VIP".into()],
            }
        );
    }

    #[test]
    fn test_foreign_key_accepts_both_shapes() {
        let flag: WireForeignKey = serde_json::from_str("true").unwrap();
        assert_eq!(flag, WireForeignKey::Flag(true));

        let reference: WireForeignKey =
            serde_json::from_str(r#"{"table": "customers", "column": "id"}"#).unwrap();
        assert_eq!(
            reference,
            WireForeignKey::Reference {
                table: "customers".into(),
                column: "id".into(),
            }
        );
    }

    #[test]
    fn test_relationship_compact_vs_structured() {
        let compact: WireRelationship = serde_json::from_str(
            r#"{"from": "orders.customer_id", "to": "customers.id", "type": "many_to_one"}"#,
        )
        .unwrap();
        assert!(matches!(compact, WireRelationship::Compact(_)));

        let structured: WireRelationship = serde_json::from_str(
            r#"{"source_table_id": "orders", "source_columns": ["customer_id"],
                "target_table_id": "customers", "target_columns": ["id"]}"#,
        )
        .unwrap();
        assert!(matches!(structured, WireRelationship::Structured(_)));
    }

    #[test]
    fn test_table_metrics_map_or_list() {
        let defs: WireTableMetrics =
            serde_json::from_str(r#"{"total_orders": {"expression": "SUM(amount)"}}"#).unwrap();
        assert!(matches!(defs, WireTableMetrics::Definitions(_)));

        let names: WireTableMetrics = serde_json::from_str(r#"["total_orders"]"#).unwrap();
        assert_eq!(names, WireTableMetrics::Names(vec!["total_orders".into()]));
    }

    #[test]
    fn test_schema_tolerates_missing_fields() {
        let wire: WireSchema = serde_json::from_str(r#"{"id": "sales"}"#).unwrap();
        assert_eq!(wire.id, "sales");
        assert!(wire.tables.is_empty());
        assert!(wire.created_at.is_none());
    }
}
