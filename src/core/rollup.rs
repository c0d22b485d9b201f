//! Save-time aggregation of per-entity synonym annotations into the
//! schema-level indexes the downstream matcher consumes.

use std::collections::BTreeMap;

use crate::core::schema::DatabaseSchema;

/// Relationship-synonym indexes emitted alongside the saved payload. The
/// by-pair index merges synonyms from distinct relationships that share the
/// same two tables; the by-id index preserves the unmerged truth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipSynonymRollup {
    pub by_relationship: BTreeMap<String, Vec<String>>,
    /// Keyed by the unordered table pair, smaller name first.
    pub by_table_pair: BTreeMap<String, Vec<String>>,
}

/// Key for the unordered (source, target) pair index.
pub fn table_pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}__{b}")
    } else {
        format!("{b}__{a}")
    }
}

/// Merge per-table synonym groups into the schema-level synonym map. Groups
/// stay inline on their tables; this produces the aggregated copy. Sample
/// values are deduplicated preserving first-seen order.
pub fn rollup_table_synonyms(schema: &DatabaseSchema) -> BTreeMap<String, Vec<String>> {
    let mut merged = schema.synonyms.clone();
    for table in schema.tables.values() {
        for group in &table.synonym_groups {
            let samples = merged.entry(group.synonym.clone()).or_default();
            for value in &group.sample_values {
                if !samples.contains(value) {
                    samples.push(value.clone());
                }
            }
        }
    }
    merged
}

/// Index relationship synonyms by relationship id and by unordered table
/// pair.
pub fn rollup_relationship_synonyms(schema: &DatabaseSchema) -> RelationshipSynonymRollup {
    let mut rollup = RelationshipSynonymRollup::default();
    for rel in &schema.relationships {
        if rel.synonyms.is_empty() {
            continue;
        }
        let names: Vec<String> = rel.synonyms.iter().map(|g| g.synonym.clone()).collect();
        rollup
            .by_relationship
            .insert(rel.id.clone(), names.clone());

        let pair = rollup
            .by_table_pair
            .entry(table_pair_key(&rel.source_table_id, &rel.target_table_id))
            .or_default();
        for name in names {
            if !pair.contains(&name) {
                pair.push(name);
            }
        }
    }
    rollup
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{RelationshipSpec, SchemaModel, SynonymScope};
    use crate::core::normalize::ingest;
    use crate::core::schema::{SynonymGroup, Table};
    use crate::core::wire::WireSchema;

    fn model_with_tables(names: &[&str]) -> SchemaModel {
        let mut schema = ingest(WireSchema {
            id: "test".into(),
            ..Default::default()
        });
        for name in names {
            schema.tables.insert((*name).to_string(), Table::new(*name));
        }
        SchemaModel::new(schema)
    }

    #[test]
    fn test_table_synonyms_merge_into_schema_map() {
        let mut model = model_with_tables(&["customers"]);
        model
            .add_synonym_group(
                SynonymScope::Table("customers".into()),
                SynonymGroup::new("big spenders").with_samples(["VIP"]),
            )
            .unwrap();

        let merged = rollup_table_synonyms(model.schema());
        assert_eq!(merged.get("big spenders"), Some(&vec!["VIP".to_string()]));
        // The group also remains inline on the table.
        assert_eq!(
            model.schema().table("customers").unwrap().synonym_groups.len(),
            1
        );
    }

    #[test]
    fn test_sample_values_deduplicated_across_tables() {
        let mut model = model_with_tables(&["customers", "accounts"]);
        model
            .add_synonym_group(
                SynonymScope::Table("customers".into()),
                SynonymGroup::new("clients").with_samples(["Acme", "Globex"]),
            )
            .unwrap();
        model
            .add_synonym_group(
                SynonymScope::Table("accounts".into()),
                SynonymGroup::new("clients").with_samples(["Globex", "Initech"]),
            )
            .unwrap();

        let merged = rollup_table_synonyms(model.schema());
        // accounts sorts before customers, so its samples come first.
        assert_eq!(
            merged.get("clients"),
            Some(&vec![
                "Globex".to_string(),
                "Initech".to_string(),
                "Acme".to_string()
            ])
        );
    }

    #[test]
    fn test_relationship_rollup_by_id_and_pair() {
        let mut model = model_with_tables(&["orders", "customers"]);
        let first = model
            .add_relationship(RelationshipSpec {
                source_table_id: "orders".into(),
                target_table_id: "customers".into(),
                synonyms: vec![SynonymGroup::new("placed by")],
                ..Default::default()
            })
            .unwrap();
        let second = model
            .add_relationship(RelationshipSpec {
                name: "billing".into(),
                source_table_id: "customers".into(),
                target_table_id: "orders".into(),
                synonyms: vec![SynonymGroup::new("billed to"), SynonymGroup::new("placed by")],
                ..Default::default()
            })
            .unwrap();

        let rollup = rollup_relationship_synonyms(model.schema());
        assert_eq!(
            rollup.by_relationship.get(&first),
            Some(&vec!["placed by".to_string()])
        );
        assert_eq!(
            rollup.by_relationship.get(&second),
            Some(&vec!["billed to".to_string(), "placed by".to_string()])
        );
        // Distinct relationships sharing the two tables merge in the pair
        // index regardless of direction.
        assert_eq!(
            rollup.by_table_pair.get("customers__orders"),
            Some(&vec!["placed by".to_string(), "billed to".to_string()])
        );
    }

    #[test]
    fn test_relationships_without_synonyms_are_skipped() {
        let mut model = model_with_tables(&["orders", "customers"]);
        model
            .add_relationship(RelationshipSpec {
                source_table_id: "orders".into(),
                target_table_id: "customers".into(),
                ..Default::default()
            })
            .unwrap();
        let rollup = rollup_relationship_synonyms(model.schema());
        assert!(rollup.by_relationship.is_empty());
        assert!(rollup.by_table_pair.is_empty());
    }
}
