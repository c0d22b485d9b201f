//! Bidirectional transform between the wire schema and the editable model.
//!
//! `ingest` is pure and deterministic (`ingest_at` pins the clock used for
//! healing); `egress` is its inverse. Cosmetic malformations (timestamps,
//! unrecognized synonym/metric/relationship-type shapes) are silently
//! defaulted here. Structural problems, like a relationship without
//! endpoints, are dropped with a warning rather than invented.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::core::schema::{
    Column, DatabaseSchema, ForeignKeyRef, Metric, Priority, Relationship, RelationshipType,
    SynonymGroup, Table, insert_synonym_group,
};
use crate::core::wire::{
    CompactRelationship, StructuredRelationship, WireAliases, WireColumn, WireForeignKey,
    WireMetric, WireMetricDef, WireRelationship, WireSchema, WireSynonym, WireTable,
    WireTableMetrics,
};

/// Metadata keys lifted into typed relationship fields at ingest and written
/// back at egress.
const META_USER_CREATED: &str = "user_created";
const META_RELATIONSHIP_SYNONYMS: &str = "relationship_synonyms";

/// Default expression for a metric that arrived as a bare name.
const DEFAULT_METRIC_EXPRESSION: &str = "COUNT(*)";

/// Build the editable model from a wire schema.
pub fn ingest(wire: WireSchema) -> DatabaseSchema {
    ingest_at(wire, Utc::now())
}

/// [`ingest`] with a pinned clock for the heal-to-now defaults.
pub fn ingest_at(wire: WireSchema, now: DateTime<Utc>) -> DatabaseSchema {
    let WireSchema {
        id,
        display_name,
        dialect,
        schema_prefix,
        connection_config,
        tables,
        relationships,
        synonyms,
        metrics,
        aliases,
        metadata,
        created_at,
        updated_at,
    } = wire;

    let tables: BTreeMap<String, Table> = tables
        .into_iter()
        .map(|(name, table)| {
            let table = ingest_table(&name, table, &aliases, now);
            (name, table)
        })
        .collect();

    let relationships = relationships
        .into_iter()
        .filter_map(|rel| ingest_relationship(rel, now))
        .collect();

    let metrics = metrics
        .into_iter()
        .map(|m| {
            (
                m.name.clone(),
                Metric {
                    name: m.name,
                    expression: m.expression,
                    default_filters: m.default_filters,
                },
            )
        })
        .collect();

    DatabaseSchema {
        id,
        display_name,
        dialect,
        schema_prefix,
        connection_config,
        tables,
        relationships,
        synonyms,
        metrics,
        metadata,
        created_at: parse_timestamp(created_at.as_deref(), now),
        updated_at: parse_timestamp(updated_at.as_deref(), now),
    }
}

/// Flatten the editable model back to the wire representation.
pub fn egress(schema: &DatabaseSchema) -> WireSchema {
    let mut aliases = WireAliases::default();

    let tables: BTreeMap<String, WireTable> = schema
        .tables
        .iter()
        .map(|(name, table)| {
            if let Some(alias) = &table.alias {
                aliases.table_aliases.insert(name.clone(), alias.clone());
            }
            for column in table.columns.values() {
                if let Some(alias) = &column.alias {
                    aliases
                        .column_aliases
                        .entry(name.clone())
                        .or_default()
                        .insert(column.name.clone(), alias.clone());
                }
            }
            (name.clone(), egress_table(table))
        })
        .collect();

    let relationships = schema
        .relationships
        .iter()
        .map(egress_relationship)
        .collect();

    let metrics = schema
        .metrics
        .values()
        .map(|m| WireMetric {
            name: m.name.clone(),
            expression: m.expression.clone(),
            default_filters: m.default_filters.clone(),
        })
        .collect();

    WireSchema {
        id: schema.id.clone(),
        display_name: schema.display_name.clone(),
        dialect: schema.dialect.clone(),
        schema_prefix: schema.schema_prefix.clone(),
        connection_config: schema.connection_config.clone(),
        tables,
        relationships,
        synonyms: schema.synonyms.clone(),
        metrics,
        aliases,
        metadata: schema.metadata.clone(),
        created_at: Some(schema.created_at.to_rfc3339()),
        updated_at: Some(schema.updated_at.to_rfc3339()),
    }
}

fn ingest_table(name: &str, wire: WireTable, aliases: &WireAliases, now: DateTime<Utc>) -> Table {
    let column_aliases = aliases.column_aliases.get(name);

    let columns: BTreeMap<String, Column> = wire
        .columns
        .into_iter()
        .map(|(col_name, col)| {
            let alias = column_aliases
                .and_then(|m| m.get(&col_name))
                .cloned();
            let column = ingest_column(name, &col_name, col, alias, now);
            (col_name, column)
        })
        .collect();

    let (metric_items, metric_names) = match wire.metrics {
        Some(WireTableMetrics::Definitions(defs)) => {
            let items = defs
                .into_iter()
                .map(|(metric_name, def)| {
                    (
                        metric_name.clone(),
                        Metric {
                            name: metric_name,
                            expression: def.expression,
                            default_filters: def.default_filters,
                        },
                    )
                })
                .collect();
            (items, Vec::new())
        }
        Some(WireTableMetrics::Names(names)) => {
            let mut seen = Vec::new();
            for metric_name in names {
                if !seen.contains(&metric_name) {
                    seen.push(metric_name);
                }
            }
            (BTreeMap::new(), seen)
        }
        None => (BTreeMap::new(), Vec::new()),
    };

    Table {
        name: name.to_string(),
        display_name: wire.display_name,
        description: wire.description,
        business_context: wire.business_context,
        schema_name: wire.schema_name,
        database_id: wire.database_id,
        columns,
        synonym_groups: normalize_synonyms(wire.synonyms),
        row_count_estimate: wire.row_count,
        metric_items,
        metric_names,
        alias: aliases.table_aliases.get(name).cloned(),
        metadata: wire.metadata,
        created_at: parse_timestamp(wire.created_at.as_deref(), now),
        updated_at: parse_timestamp(wire.updated_at.as_deref(), now),
    }
}

fn egress_table(table: &Table) -> WireTable {
    let columns: BTreeMap<String, WireColumn> = table
        .columns
        .iter()
        .map(|(name, column)| (name.clone(), egress_column(column)))
        .collect();

    // The definitions cache wins over same-named plain-list entries; names
    // without a definition get the default expression.
    let mut defs: BTreeMap<String, WireMetricDef> = table
        .metric_items
        .iter()
        .map(|(name, metric)| {
            (
                name.clone(),
                WireMetricDef {
                    expression: metric.expression.clone(),
                    default_filters: metric.default_filters.clone(),
                },
            )
        })
        .collect();
    for name in &table.metric_names {
        defs.entry(name.clone()).or_insert_with(|| WireMetricDef {
            expression: DEFAULT_METRIC_EXPRESSION.to_string(),
            default_filters: Vec::new(),
        });
    }
    let metrics = if defs.is_empty() {
        None
    } else {
        Some(WireTableMetrics::Definitions(defs))
    };

    WireTable {
        name: table.name.clone(),
        display_name: table.display_name.clone(),
        description: table.description.clone(),
        business_context: table.business_context.clone(),
        schema_name: table.schema_name.clone(),
        database_id: table.database_id.clone(),
        columns,
        synonyms: egress_synonyms(&table.synonym_groups),
        metrics,
        row_count: table.row_count_estimate,
        metadata: table.metadata.clone(),
        created_at: Some(table.created_at.to_rfc3339()),
        updated_at: Some(table.updated_at.to_rfc3339()),
    }
}

fn ingest_column(
    table: &str,
    name: &str,
    wire: WireColumn,
    alias: Option<String>,
    now: DateTime<Utc>,
) -> Column {
    let (legacy_flag, foreign_key) = match wire.is_foreign_key {
        Some(WireForeignKey::Flag(flag)) => (flag, None),
        Some(WireForeignKey::Reference { table, column }) => {
            (true, Some(ForeignKeyRef { table, column }))
        }
        None => (false, None),
    };

    Column {
        id: format!("{table}.{name}"),
        name: name.to_string(),
        display_name: wire.display_name,
        description: wire.description,
        business_context: wire.business_context,
        exclude_column: wire.exclude_column,
        data_type: wire.data_type.or(wire.column_type).unwrap_or_default(),
        is_primary_key: wire.is_primary_key.or(wire.pk).unwrap_or(false),
        is_unique: wire.unique.unwrap_or(false),
        default_value: wire.default_value,
        is_foreign_key: legacy_flag || wire.fk.unwrap_or(false),
        foreign_key,
        synonym_groups: normalize_synonyms(wire.synonyms),
        alias,
        business_description: wire.business_description,
        business_terms: wire.business_terms,
        priority: parse_priority(wire.priority.as_deref()),
        is_preferred: wire.is_preferred,
        use_cases: wire.use_cases,
        relevance_keywords: wire.relevance_keywords,
        metadata: wire.metadata,
        created_at: parse_timestamp(wire.created_at.as_deref(), now),
        updated_at: parse_timestamp(wire.updated_at.as_deref(), now),
    }
}

fn egress_column(column: &Column) -> WireColumn {
    let fk = column.is_foreign_key || column.foreign_key.is_some();
    let legacy_fk = match &column.foreign_key {
        Some(reference) => WireForeignKey::Reference {
            table: reference.table.clone(),
            column: reference.column.clone(),
        },
        None => WireForeignKey::Flag(column.is_foreign_key),
    };

    WireColumn {
        column_type: Some(column.data_type.clone()),
        pk: Some(column.is_primary_key),
        unique: Some(column.is_unique),
        default_value: column.default_value.clone(),
        fk: Some(fk),
        id: Some(column.id.clone()),
        name: column.name.clone(),
        display_name: column.display_name.clone(),
        description: column.description.clone(),
        business_context: column.business_context.clone(),
        data_type: Some(column.data_type.clone()),
        is_primary_key: Some(column.is_primary_key),
        is_foreign_key: Some(legacy_fk),
        exclude_column: column.exclude_column,
        synonyms: egress_synonyms(&column.synonym_groups),
        business_description: column.business_description.clone(),
        business_terms: column.business_terms.clone(),
        priority: Some(column.priority.to_string()),
        is_preferred: column.is_preferred,
        use_cases: column.use_cases.clone(),
        relevance_keywords: column.relevance_keywords.clone(),
        metadata: column.metadata.clone(),
        created_at: Some(column.created_at.to_rfc3339()),
        updated_at: Some(column.updated_at.to_rfc3339()),
    }
}

fn ingest_relationship(wire: WireRelationship, now: DateTime<Utc>) -> Option<Relationship> {
    match wire {
        WireRelationship::Structured(rel) => ingest_structured(rel, now),
        WireRelationship::Compact(rel) => ingest_compact(rel, now),
    }
}

fn ingest_structured(rel: StructuredRelationship, now: DateTime<Utc>) -> Option<Relationship> {
    if rel.source_table_id.is_empty() || rel.target_table_id.is_empty() {
        warn!(id = %rel.id, "dropping relationship with empty endpoint");
        return None;
    }

    let mut metadata = rel.metadata;
    let user_created = metadata
        .remove(META_USER_CREATED)
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let synonyms = take_relationship_synonyms(&mut metadata);

    let id = if rel.id.is_empty() {
        derive_relationship_id(
            &rel.source_table_id,
            &rel.source_columns,
            &rel.target_table_id,
            &rel.target_columns,
        )
    } else {
        rel.id
    };

    Some(Relationship {
        id,
        name: rel.name,
        description: rel.description,
        source_table_id: rel.source_table_id,
        source_columns: rel.source_columns,
        target_table_id: rel.target_table_id,
        target_columns: rel.target_columns,
        relationship_type: parse_relationship_type(rel.relationship_type.as_deref()),
        confidence_score: rel.confidence_score.unwrap_or(1.0).clamp(0.0, 1.0),
        user_created,
        synonyms,
        metadata,
        created_at: parse_timestamp(rel.created_at.as_deref(), now),
    })
}

fn ingest_compact(rel: CompactRelationship, now: DateTime<Utc>) -> Option<Relationship> {
    let Some((source_table, source_columns)) = parse_endpoint(&rel.from_field) else {
        warn!(from = %rel.from_field, "dropping relationship with unparsable 'from' endpoint");
        return None;
    };
    let Some((target_table, target_columns)) = parse_endpoint(&rel.to) else {
        warn!(to = %rel.to, "dropping relationship with unparsable 'to' endpoint");
        return None;
    };

    let mut metadata = rel.metadata;
    let user_created = metadata
        .remove(META_USER_CREATED)
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let synonyms = take_relationship_synonyms(&mut metadata);

    let id = if rel.id.is_empty() {
        derive_relationship_id(&source_table, &source_columns, &target_table, &target_columns)
    } else {
        rel.id
    };

    Some(Relationship {
        id,
        name: rel.name,
        description: rel.description,
        source_table_id: source_table,
        source_columns,
        target_table_id: target_table,
        target_columns,
        relationship_type: parse_relationship_type(rel.relationship_type.as_deref()),
        confidence_score: rel.confidence_score.unwrap_or(1.0).clamp(0.0, 1.0),
        user_created,
        synonyms,
        metadata,
        created_at: parse_timestamp(rel.created_at.as_deref(), now),
    })
}

fn egress_relationship(rel: &Relationship) -> WireRelationship {
    let mut metadata = rel.metadata.clone();
    metadata.insert(META_USER_CREATED.to_string(), Value::Bool(rel.user_created));

    // The wire keeps relationship synonyms as bare strings; sample values
    // collected during the session do not survive egress.
    if rel.synonyms.iter().any(|g| !g.sample_values.is_empty()) {
        warn!(
            relationship = %rel.id,
            "flattening relationship synonyms to plain strings; sample values dropped"
        );
    }
    metadata.insert(
        META_RELATIONSHIP_SYNONYMS.to_string(),
        Value::Array(
            rel.synonyms
                .iter()
                .map(|g| Value::String(g.synonym.clone()))
                .collect(),
        ),
    );

    WireRelationship::Compact(CompactRelationship {
        id: rel.id.clone(),
        name: rel.name.clone(),
        description: rel.description.clone(),
        from_field: join_endpoint(&rel.source_table_id, &rel.source_columns),
        to: join_endpoint(&rel.target_table_id, &rel.target_columns),
        relationship_type: Some(rel.relationship_type.as_str().to_string()),
        cardinality_ratio: Some(rel.cardinality_ratio().to_string()),
        join_sql: Some(rel.join_sql()),
        confidence_score: Some(rel.confidence_score),
        metadata,
        created_at: Some(rel.created_at.to_rfc3339()),
    })
}

/// Parse a compact `"table.col1,col2"` endpoint. A bare table name (no dot)
/// is accepted with no columns; an empty table is not.
fn parse_endpoint(raw: &str) -> Option<(String, Vec<String>)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.split_once('.') {
        Some((table, columns)) => {
            if table.is_empty() {
                return None;
            }
            let columns = columns
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            Some((table.to_string(), columns))
        }
        None => Some((raw.to_string(), Vec::new())),
    }
}

fn join_endpoint(table: &str, columns: &[String]) -> String {
    if columns.is_empty() {
        table.to_string()
    } else {
        format!("{}.{}", table, columns.join(","))
    }
}

fn derive_relationship_id(
    source_table: &str,
    source_columns: &[String],
    target_table: &str,
    target_columns: &[String],
) -> String {
    format!(
        "{}__{}",
        join_endpoint(source_table, source_columns),
        join_endpoint(target_table, target_columns)
    )
}

/// Normalize wire synonyms into canonical groups, deduplicating
/// case-insensitively (first occurrence wins).
fn normalize_synonyms(wire: Vec<WireSynonym>) -> Vec<SynonymGroup> {
    let mut groups = Vec::new();
    for synonym in wire {
        let group = match synonym {
            WireSynonym::Plain(name) => SynonymGroup::new(name),
            WireSynonym::Grouped {
                synonym,
                sample_values,
            } => SynonymGroup {
                synonym,
                sample_values,
            },
        };
        insert_synonym_group(&mut groups, group);
    }
    groups
}

fn egress_synonyms(groups: &[SynonymGroup]) -> Vec<WireSynonym> {
    groups
        .iter()
        .map(|g| WireSynonym::Grouped {
            synonym: g.synonym.clone(),
            sample_values: g.sample_values.clone(),
        })
        .collect()
}

fn take_relationship_synonyms(metadata: &mut serde_json::Map<String, Value>) -> Vec<SynonymGroup> {
    let Some(raw) = metadata.remove(META_RELATIONSHIP_SYNONYMS) else {
        return Vec::new();
    };
    match serde_json::from_value::<Vec<WireSynonym>>(raw) {
        Ok(wire) => normalize_synonyms(wire),
        Err(_) => {
            warn!("discarding unrecognized relationship_synonyms shape");
            Vec::new()
        }
    }
}

fn parse_relationship_type(raw: Option<&str>) -> RelationshipType {
    match raw {
        Some(text) => text.parse().unwrap_or_else(|_| {
            warn!(value = text, "unknown relationship type, defaulting to one_to_many");
            RelationshipType::default()
        }),
        None => RelationshipType::default(),
    }
}

fn parse_priority(raw: Option<&str>) -> Priority {
    match raw.map(|p| p.trim().to_lowercase()).as_deref() {
        Some("high") => Priority::High,
        Some("low") => Priority::Low,
        Some("medium") | None => Priority::Medium,
        Some(other) => {
            warn!(value = other, "unknown priority, defaulting to medium");
            Priority::Medium
        }
    }
}

fn parse_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    match raw {
        Some(text) => match DateTime::parse_from_rfc3339(text) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(_) => {
                warn!(value = text, "unparsable timestamp, defaulting to now");
                now
            }
        },
        None => now,
    }
}

#[cfg(test)]
pub(crate) fn canonical(wire: &WireSchema) -> Value {
    let mut value = serde_json::to_value(wire).expect("wire schema serializes");
    strip_timestamp_keys(&mut value);
    value
}

#[cfg(test)]
fn strip_timestamp_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("created_at");
            map.remove("updated_at");
            for child in map.values_mut() {
                strip_timestamp_keys(child);
            }
        }
        Value::Array(items) => {
            for child in items {
                strip_timestamp_keys(child);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    fn wire_fixture() -> WireSchema {
        serde_json::from_value(serde_json::json!({
            "id": "sales",
            "display_name": "Sales",
            "dialect": "postgres",
            "connection_config": {"host": "db.internal"},
            "tables": {
                "customers": {
                    "description": "People who buy things",
                    "columns": {
                        "id": {"type": "BIGINT", "pk": true},
                        "email": {"data_type": "VARCHAR(255)", "unique": true},
                        "region_id": {"is_foreign_key": {"table": "regions", "column": "id"}}
                    },
                    "synonyms": ["clients", {"synonym": "big spenders", "sample_values": ["VIP"]}],
                    "metrics": {"total_customers": {"expression": "COUNT(DISTINCT id)"}}
                },
                "orders": {
                    "columns": {
                        "id": {"type": "BIGINT", "pk": true},
                        "customer_id": {"type": "BIGINT", "fk": true}
                    },
                    "metrics": ["total_orders"]
                }
            },
            "relationships": [
                {"from": "orders.customer_id", "to": "customers.id", "type": "many_to_one",
                 "metadata": {"relationship_synonyms": ["placed by"]}}
            ],
            "synonyms": {"revenue": ["gross", "net"]},
            "metrics": [{"name": "total_revenue", "expression": "SUM(orders.amount)"}],
            "aliases": {
                "table_aliases": {"customers": "cust"},
                "column_aliases": {"customers": {"email": "mail"}}
            },
            "created_at": "2025-11-02T08:30:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_ingest_builds_column_ids() {
        let schema = ingest_at(wire_fixture(), fixed_now());
        let customers = schema.table("customers").unwrap();
        assert_eq!(customers.column("email").unwrap().id, "customers.email");
        assert_eq!(customers.column("id").unwrap().id, "customers.id");
    }

    #[test]
    fn test_ingest_normalizes_synonym_shapes() {
        let schema = ingest_at(wire_fixture(), fixed_now());
        let groups = &schema.table("customers").unwrap().synonym_groups;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], SynonymGroup::new("clients"));
        assert_eq!(
            groups[1],
            SynonymGroup::new("big spenders").with_samples(["VIP"])
        );
    }

    #[test]
    fn test_ingest_overlays_aliases() {
        let schema = ingest_at(wire_fixture(), fixed_now());
        let customers = schema.table("customers").unwrap();
        assert_eq!(customers.alias.as_deref(), Some("cust"));
        assert_eq!(customers.column("email").unwrap().alias.as_deref(), Some("mail"));
        assert_eq!(customers.column("id").unwrap().alias, None);
    }

    #[test]
    fn test_alias_round_trip() {
        let schema = ingest_at(wire_fixture(), fixed_now());
        let wire = egress(&schema);
        assert_eq!(
            wire.aliases.table_aliases.get("customers").map(String::as_str),
            Some("cust")
        );
        assert_eq!(
            wire.aliases
                .column_aliases
                .get("customers")
                .and_then(|m| m.get("email"))
                .map(String::as_str),
            Some("mail")
        );
    }

    #[test]
    fn test_ingest_parses_compact_relationship() {
        let schema = ingest_at(wire_fixture(), fixed_now());
        assert_eq!(schema.relationships.len(), 1);
        let rel = &schema.relationships[0];
        assert_eq!(rel.source_table_id, "orders");
        assert_eq!(rel.source_columns, vec!["customer_id"]);
        assert_eq!(rel.target_table_id, "customers");
        assert_eq!(rel.target_columns, vec!["id"]);
        assert_eq!(rel.relationship_type, RelationshipType::ManyToOne);
        assert_eq!(rel.synonyms, vec![SynonymGroup::new("placed by")]);
        assert!(!rel.user_created);
    }

    #[test]
    fn test_multi_column_endpoint_round_trips() {
        let (table, columns) = parse_endpoint("orders.customer_id,region_id").unwrap();
        assert_eq!(table, "orders");
        assert_eq!(columns, vec!["customer_id", "region_id"]);
        assert_eq!(
            join_endpoint(&table, &columns),
            "orders.customer_id,region_id"
        );
        assert_eq!(parse_endpoint("  "), None);
        assert_eq!(parse_endpoint(".id"), None);
        assert_eq!(parse_endpoint("orders"), Some(("orders".into(), vec![])));
    }

    #[test]
    fn test_structured_relationship_passes_through() {
        let wire: WireRelationship = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "source_table_id": "orders",
            "source_columns": ["customer_id"],
            "target_table_id": "customers",
            "target_columns": ["id"],
            "type": "many_to_one",
            "metadata": {"user_created": true}
        }))
        .unwrap();
        let rel = ingest_relationship(wire, fixed_now()).unwrap();
        assert_eq!(rel.id, "r1");
        assert!(rel.user_created);
        assert_eq!(rel.relationship_type, RelationshipType::ManyToOne);
    }

    #[test]
    fn test_unknown_relationship_type_heals_to_default() {
        let wire: WireRelationship = serde_json::from_value(serde_json::json!({
            "from": "a.x", "to": "b.y", "type": "sideways"
        }))
        .unwrap();
        let rel = ingest_relationship(wire, fixed_now()).unwrap();
        assert_eq!(rel.relationship_type, RelationshipType::OneToMany);
    }

    #[test]
    fn test_confidence_clamped_at_ingest() {
        let wire: WireRelationship = serde_json::from_value(serde_json::json!({
            "from": "a.x", "to": "b.y", "confidence_score": 3.5
        }))
        .unwrap();
        let rel = ingest_relationship(wire, fixed_now()).unwrap();
        assert_eq!(rel.confidence_score, 1.0);
    }

    #[test]
    fn test_timestamp_healing_is_deterministic() {
        let now = fixed_now();
        let schema = ingest_at(wire_fixture(), now);
        // Fixture carries created_at but no updated_at.
        assert_eq!(
            schema.created_at,
            Utc.with_ymd_and_hms(2025, 11, 2, 8, 30, 0).unwrap()
        );
        assert_eq!(schema.updated_at, now);
        assert_eq!(ingest_at(wire_fixture(), now), schema);
    }

    #[test]
    fn test_fk_flag_is_or_of_flag_and_reference() {
        let schema = ingest_at(wire_fixture(), fixed_now());
        let region = schema
            .table("customers")
            .unwrap()
            .column("region_id")
            .unwrap();
        assert!(region.is_foreign_key);
        assert_eq!(
            region.foreign_key,
            Some(ForeignKeyRef {
                table: "regions".into(),
                column: "id".into()
            })
        );

        let order_fk = schema
            .table("orders")
            .unwrap()
            .column("customer_id")
            .unwrap();
        assert!(order_fk.is_foreign_key);
        assert_eq!(order_fk.foreign_key, None);
    }

    #[test]
    fn test_egress_emits_primary_and_legacy_column_fields() {
        let schema = ingest_at(wire_fixture(), fixed_now());
        let wire = egress(&schema);
        let id_col = &wire.tables["customers"].columns["id"];
        assert_eq!(id_col.column_type.as_deref(), Some("BIGINT"));
        assert_eq!(id_col.data_type.as_deref(), Some("BIGINT"));
        assert_eq!(id_col.pk, Some(true));
        assert_eq!(id_col.is_primary_key, Some(true));
        assert_eq!(id_col.fk, Some(false));
        assert_eq!(id_col.id.as_deref(), Some("customers.id"));

        let region = &wire.tables["customers"].columns["region_id"];
        assert_eq!(region.fk, Some(true));
        assert!(matches!(
            region.is_foreign_key,
            Some(WireForeignKey::Reference { .. })
        ));
    }

    #[test]
    fn test_metric_cache_precedence_and_default_expression() {
        let mut schema = ingest_at(wire_fixture(), fixed_now());
        // orders arrived with a plain list entry only.
        let orders = schema.tables.get_mut("orders").unwrap();
        assert_eq!(orders.metric_names, vec!["total_orders"]);
        orders.metric_items.insert(
            "total_orders".into(),
            Metric::new("total_orders", "SUM(amount)"),
        );

        let wire = egress(&schema);
        let Some(WireTableMetrics::Definitions(defs)) = &wire.tables["orders"].metrics else {
            panic!("expected metric definitions");
        };
        assert_eq!(defs["total_orders"].expression, "SUM(amount)");
    }

    #[test]
    fn test_plain_metric_names_default_to_count() {
        let schema = ingest_at(wire_fixture(), fixed_now());
        let wire = egress(&schema);
        let Some(WireTableMetrics::Definitions(defs)) = &wire.tables["orders"].metrics else {
            panic!("expected metric definitions");
        };
        assert_eq!(defs["total_orders"].expression, "COUNT(*)");
    }

    #[test]
    fn test_egress_relationship_compact_form() {
        let schema = ingest_at(wire_fixture(), fixed_now());
        let wire = egress(&schema);
        let WireRelationship::Compact(rel) = &wire.relationships[0] else {
            panic!("expected compact relationship");
        };
        assert_eq!(rel.from_field, "orders.customer_id");
        assert_eq!(rel.to, "customers.id");
        assert_eq!(rel.relationship_type.as_deref(), Some("many_to_one"));
        assert_eq!(rel.cardinality_ratio.as_deref(), Some("N:1"));
        assert_eq!(
            rel.join_sql.as_deref(),
            Some("orders.customer_id = customers.id")
        );
        assert_eq!(
            rel.metadata.get("relationship_synonyms"),
            Some(&serde_json::json!(["placed by"]))
        );
        assert_eq!(rel.metadata.get("user_created"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_relationship_synonym_samples_dropped_at_egress() {
        let mut schema = ingest_at(wire_fixture(), fixed_now());
        schema.relationships[0]
            .synonyms
            .push(SynonymGroup::new("ordered by").with_samples(["Acme"]));

        let wire = egress(&schema);
        let WireRelationship::Compact(rel) = &wire.relationships[0] else {
            panic!("expected compact relationship");
        };
        assert_eq!(
            rel.metadata.get("relationship_synonyms"),
            Some(&serde_json::json!(["placed by", "ordered by"]))
        );
    }

    #[test]
    fn test_round_trip_is_idempotent_after_one_pass() {
        let now = fixed_now();
        let once = ingest_at(wire_fixture(), now);
        let twice = ingest_at(egress(&once), now);
        assert_eq!(canonical(&egress(&once)), canonical(&egress(&twice)));
    }
}
