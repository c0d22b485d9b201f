use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// In-session editable representation of a semantic schema.
///
/// Built by [`crate::core::normalize::ingest`] from the wire form, mutated
/// only through [`crate::core::model::SchemaModel`], and flattened back with
/// [`crate::core::normalize::egress`] on save. Alias maps exist only on the
/// wire; here the alias lives on the table/column it names.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DatabaseSchema {
    pub id: String,
    pub display_name: String,
    pub dialect: String,
    pub schema_prefix: String,
    pub connection_config: Value,
    /// Tables keyed by name. Table names are unique by construction.
    pub tables: BTreeMap<String, Table>,
    pub relationships: Vec<Relationship>,
    /// Schema-level synonym name -> sample values.
    pub synonyms: BTreeMap<String, Vec<String>>,
    /// Schema-scope metrics keyed by name.
    pub metrics: BTreeMap<String, Metric>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DatabaseSchema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn relationship(&self, id: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id == id)
    }

    /// All relationships between the two tables, in either direction.
    pub fn relationships_between<'a>(
        &'a self,
        a: &'a str,
        b: &'a str,
    ) -> impl Iterator<Item = &'a Relationship> {
        self.relationships.iter().filter(move |r| {
            (r.source_table_id == a && r.target_table_id == b)
                || (r.source_table_id == b && r.target_table_id == a)
        })
    }
}

/// A table annotation. The table name doubles as its id: structural identity
/// is owned by the live database, not by this layer.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Table {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub business_context: String,
    pub schema_name: String,
    pub database_id: String,
    /// Columns keyed by name, unique within the table.
    pub columns: BTreeMap<String, Column>,
    pub synonym_groups: Vec<SynonymGroup>,
    pub row_count_estimate: Option<u64>,
    /// Metric definitions cache; wins over `metric_names` at egress.
    pub metric_items: BTreeMap<String, Metric>,
    /// Names that arrived as a plain metrics list with no definition.
    pub metric_names: Vec<String>,
    pub alias: Option<String>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            display_name: String::new(),
            description: String::new(),
            business_context: String::new(),
            schema_name: String::new(),
            database_id: String::new(),
            columns: BTreeMap::new(),
            synonym_groups: Vec::new(),
            row_count_estimate: None,
            metric_items: BTreeMap::new(),
            metric_names: Vec::new(),
            alias: None,
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_column(mut self, column: Column) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }
}

/// A column annotation. `id` is `{table}.{column}`, assigned once at ingest
/// and never revalidated on rename.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Column {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub business_context: String,
    pub exclude_column: bool,
    pub data_type: String,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub default_value: Option<Value>,
    pub is_foreign_key: bool,
    pub foreign_key: Option<ForeignKeyRef>,
    pub synonym_groups: Vec<SynonymGroup>,
    pub alias: Option<String>,
    pub business_description: String,
    pub business_terms: Vec<String>,
    pub priority: Priority,
    pub is_preferred: bool,
    pub use_cases: Vec<String>,
    pub relevance_keywords: Vec<String>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Column {
    pub fn new(
        table: impl AsRef<str>,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: format!("{}.{}", table.as_ref(), name),
            name,
            display_name: String::new(),
            description: String::new(),
            business_context: String::new(),
            exclude_column: false,
            data_type: data_type.into(),
            is_primary_key: false,
            is_unique: false,
            default_value: None,
            is_foreign_key: false,
            foreign_key: None,
            synonym_groups: Vec::new(),
            alias: None,
            business_description: String::new(),
            business_terms: Vec::new(),
            priority: Priority::Medium,
            is_preferred: false,
            use_cases: Vec::new(),
            relevance_keywords: Vec::new(),
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self.is_foreign_key = true;
        self
    }
}

/// Detailed foreign-key target carried alongside the boolean flag.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// Column priority for the downstream natural-language matcher.
#[derive(
    Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[display("high")]
    High,
    #[default]
    #[display("medium")]
    Medium,
    #[display("low")]
    Low,
}

/// An alternate name/phrase for an entity, optionally paired with example
/// values. Names are unique case-insensitively within the owning entity.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct SynonymGroup {
    pub synonym: String,
    pub sample_values: Vec<String>,
}

impl SynonymGroup {
    pub fn new(synonym: impl Into<String>) -> Self {
        Self {
            synonym: synonym.into(),
            sample_values: Vec::new(),
        }
    }

    pub fn with_samples<I, S>(mut self, samples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sample_values = samples.into_iter().map(Into::into).collect();
        self
    }
}

/// Insert a synonym group unless one with the same name (case-insensitively)
/// already exists. Returns whether the group was added.
pub(crate) fn insert_synonym_group(list: &mut Vec<SynonymGroup>, group: SynonymGroup) -> bool {
    let lowered = group.synonym.to_lowercase();
    if list.iter().any(|g| g.synonym.to_lowercase() == lowered) {
        return false;
    }
    list.push(group);
    true
}

/// A named SQL aggregation expression.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Metric {
    pub name: String,
    pub expression: String,
    pub default_filters: Vec<String>,
}

impl Metric {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            default_filters: Vec::new(),
        }
    }
}

/// A join between two tables. User-authored relationships stay mutable and
/// deletable; system-derived ones accept only synonym annotation.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub name: String,
    pub description: String,
    pub source_table_id: String,
    pub source_columns: Vec<String>,
    pub target_table_id: String,
    pub target_columns: Vec<String>,
    pub relationship_type: RelationshipType,
    pub confidence_score: f64,
    pub user_created: bool,
    pub synonyms: Vec<SynonymGroup>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    /// Cardinality shorthand derived from the relationship type.
    pub fn cardinality_ratio(&self) -> &'static str {
        self.relationship_type.ratio()
    }

    /// Join predicate derived from the endpoint column pairs.
    pub fn join_sql(&self) -> String {
        self.source_columns
            .iter()
            .zip(self.target_columns.iter())
            .map(|(s, t)| {
                format!(
                    "{}.{} = {}.{}",
                    self.source_table_id, s, self.target_table_id, t
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Relationship cardinality between two tables.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    #[default]
    OneToMany,
    ManyToOne,
    OneToOne,
    ManyToMany,
}

impl RelationshipType {
    pub fn ratio(self) -> &'static str {
        match self {
            RelationshipType::OneToMany => "1:N",
            RelationshipType::ManyToOne => "N:1",
            RelationshipType::OneToOne => "1:1",
            RelationshipType::ManyToMany => "N:M",
        }
    }

    /// The snake_case wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipType::OneToMany => "one_to_many",
            RelationshipType::ManyToOne => "many_to_one",
            RelationshipType::OneToOne => "one_to_one",
            RelationshipType::ManyToMany => "many_to_many",
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ratio())
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_to_many" | "1:N" => Ok(RelationshipType::OneToMany),
            "many_to_one" | "N:1" => Ok(RelationshipType::ManyToOne),
            "one_to_one" | "1:1" => Ok(RelationshipType::OneToOne),
            "many_to_many" | "N:M" => Ok(RelationshipType::ManyToMany),
            _ => Err(()),
        }
    }
}
