//! In-session schema model: every mutation the editor can perform, with the
//! invariants enforced at mutation time.
//!
//! Structural names (tables, columns, data types) are immutable here by
//! construction: the edit enums below simply have no variant for them. The
//! annotation layer never creates or renames database objects; entities come
//! into existence at ingest only.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::ModelError;
use crate::core::schema::{
    Column, DatabaseSchema, Metric, Priority, Relationship, RelationshipType, SynonymGroup, Table,
    insert_synonym_group,
};
use crate::core::validation::{validate_alias, validate_metric_name};

/// Editable (non-structural) table fields.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEdit {
    DisplayName(String),
    Description(String),
    BusinessContext(String),
    Alias(Option<String>),
}

/// Editable (non-structural) column fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnEdit {
    DisplayName(String),
    Description(String),
    BusinessContext(String),
    BusinessDescription(String),
    ExcludeColumn(bool),
    Priority(Priority),
    IsPreferred(bool),
    BusinessTerms(Vec<String>),
    UseCases(Vec<String>),
    RelevanceKeywords(Vec<String>),
    Alias(Option<String>),
}

/// Owner of a synonym group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynonymScope {
    Table(String),
    Column { table: String, column: String },
    Relationship(String),
}

/// Owner of a metric.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MetricScope {
    #[display("schema")]
    Schema,
    #[display("{_0}")]
    Table(String),
}

/// Input for [`SchemaModel::add_relationship`]. An empty `name` gets the
/// `{source}_to_{target}` default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipSpec {
    pub name: String,
    pub description: String,
    pub source_table_id: String,
    pub source_columns: Vec<String>,
    pub target_table_id: String,
    pub target_columns: Vec<String>,
    pub relationship_type: RelationshipType,
    pub synonyms: Vec<SynonymGroup>,
}

/// Partial update for a user-authored relationship.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub relationship_type: Option<RelationshipType>,
    pub confidence_score: Option<f64>,
    pub source_columns: Option<Vec<String>>,
    pub target_columns: Option<Vec<String>>,
}

/// The session state: the editable schema plus the selected-table set that
/// drives the diagram and the inspector.
///
/// Inspector invariant: the active (displayed) table is always a member of
/// the selection, or `None` when the selection is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaModel {
    schema: DatabaseSchema,
    selected: Vec<String>,
    active: Option<String>,
}

impl SchemaModel {
    pub fn new(schema: DatabaseSchema) -> Self {
        Self {
            schema,
            selected: Vec::new(),
            active: None,
        }
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    pub fn into_schema(self) -> DatabaseSchema {
        self.schema
    }

    // ------------------------------------------------------------------
    // Field edits
    // ------------------------------------------------------------------

    pub fn apply_table_edit(&mut self, table: &str, edit: TableEdit) -> Result<(), ModelError> {
        if let TableEdit::Alias(Some(alias)) = &edit {
            validate_alias(alias).map_err(|reason| ModelError::InvalidName {
                name: alias.clone(),
                reason,
            })?;
        }
        let entry = self.table_mut(table)?;
        match edit {
            TableEdit::DisplayName(value) => entry.display_name = value,
            TableEdit::Description(value) => entry.description = value,
            TableEdit::BusinessContext(value) => entry.business_context = value,
            TableEdit::Alias(value) => entry.alias = value,
        }
        entry.updated_at = Utc::now();
        debug!(table, "table edit applied");
        Ok(())
    }

    pub fn apply_column_edit(
        &mut self,
        table: &str,
        column: &str,
        edit: ColumnEdit,
    ) -> Result<(), ModelError> {
        if let ColumnEdit::Alias(Some(alias)) = &edit {
            validate_alias(alias).map_err(|reason| ModelError::InvalidName {
                name: alias.clone(),
                reason,
            })?;
        }
        let entry = self.column_mut(table, column)?;
        match edit {
            ColumnEdit::DisplayName(value) => entry.display_name = value,
            ColumnEdit::Description(value) => entry.description = value,
            ColumnEdit::BusinessContext(value) => entry.business_context = value,
            ColumnEdit::BusinessDescription(value) => entry.business_description = value,
            ColumnEdit::ExcludeColumn(value) => entry.exclude_column = value,
            ColumnEdit::Priority(value) => entry.priority = value,
            ColumnEdit::IsPreferred(value) => entry.is_preferred = value,
            ColumnEdit::BusinessTerms(value) => entry.business_terms = value,
            ColumnEdit::UseCases(value) => entry.use_cases = value,
            ColumnEdit::RelevanceKeywords(value) => entry.relevance_keywords = value,
            ColumnEdit::Alias(value) => entry.alias = value,
        }
        entry.updated_at = Utc::now();
        debug!(table, column, "column edit applied");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Relationships
    // ------------------------------------------------------------------

    /// Add a user-authored relationship. Both endpoints must name existing
    /// tables; an empty endpoint adds nothing.
    pub fn add_relationship(&mut self, spec: RelationshipSpec) -> Result<String, ModelError> {
        if spec.source_table_id.is_empty() || spec.target_table_id.is_empty() {
            return Err(ModelError::EmptyEndpoint);
        }
        self.require_table(&spec.source_table_id)?;
        self.require_table(&spec.target_table_id)?;

        let name = if spec.name.trim().is_empty() {
            format!("{}_to_{}", spec.source_table_id, spec.target_table_id)
        } else {
            spec.name
        };

        let mut synonyms = Vec::new();
        for group in spec.synonyms {
            insert_synonym_group(&mut synonyms, group);
        }

        let id = format!("rel_{}", Uuid::new_v4());
        debug!(%id, source = %spec.source_table_id, target = %spec.target_table_id, "relationship added");
        self.schema.relationships.push(Relationship {
            id: id.clone(),
            name,
            description: spec.description,
            source_table_id: spec.source_table_id,
            source_columns: spec.source_columns,
            target_table_id: spec.target_table_id,
            target_columns: spec.target_columns,
            relationship_type: spec.relationship_type,
            confidence_score: 1.0,
            user_created: true,
            synonyms,
            metadata: serde_json::Map::new(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    /// Remove a user-authored relationship. System-derived relationships are
    /// read-only.
    pub fn remove_relationship(&mut self, id: &str) -> Result<(), ModelError> {
        let index = self
            .schema
            .relationships
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| ModelError::UnknownRelationship(id.to_string()))?;
        if !self.schema.relationships[index].user_created {
            return Err(ModelError::ReadOnlyRelationship(id.to_string()));
        }
        self.schema.relationships.remove(index);
        debug!(%id, "relationship removed");
        Ok(())
    }

    /// Update a user-authored relationship's mutable fields.
    pub fn update_relationship(
        &mut self,
        id: &str,
        update: RelationshipUpdate,
    ) -> Result<(), ModelError> {
        if let Some(score) = update.confidence_score
            && !(0.0..=1.0).contains(&score)
        {
            return Err(ModelError::InvalidConfidence(score));
        }
        let rel = self.relationship_mut(id)?;
        if !rel.user_created {
            return Err(ModelError::ReadOnlyRelationship(id.to_string()));
        }
        if let Some(name) = update.name {
            rel.name = name;
        }
        if let Some(description) = update.description {
            rel.description = description;
        }
        if let Some(relationship_type) = update.relationship_type {
            rel.relationship_type = relationship_type;
        }
        if let Some(score) = update.confidence_score {
            rel.confidence_score = score;
        }
        if let Some(columns) = update.source_columns {
            rel.source_columns = columns;
        }
        if let Some(columns) = update.target_columns {
            rel.target_columns = columns;
        }
        debug!(%id, "relationship updated");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Synonyms
    // ------------------------------------------------------------------

    /// Add a synonym group to a table, column, or relationship. Synonym
    /// annotation is the one mutation allowed on system-derived
    /// relationships. Returns `false` when the name already exists
    /// (case-insensitively) on the owner: a no-op, not an error.
    pub fn add_synonym_group(
        &mut self,
        scope: SynonymScope,
        group: SynonymGroup,
    ) -> Result<bool, ModelError> {
        let added = match &scope {
            SynonymScope::Table(table) => {
                let entry = self.table_mut(table)?;
                let added = insert_synonym_group(&mut entry.synonym_groups, group);
                entry.updated_at = Utc::now();
                added
            }
            SynonymScope::Column { table, column } => {
                let entry = self.column_mut(table, column)?;
                let added = insert_synonym_group(&mut entry.synonym_groups, group);
                entry.updated_at = Utc::now();
                added
            }
            SynonymScope::Relationship(id) => {
                let rel = self.relationship_mut(id)?;
                insert_synonym_group(&mut rel.synonyms, group)
            }
        };
        debug!(?scope, added, "synonym group insert");
        Ok(added)
    }

    /// Remove a synonym group by name (case-insensitive). Returns whether a
    /// group was removed.
    pub fn remove_synonym_group(
        &mut self,
        scope: SynonymScope,
        name: &str,
    ) -> Result<bool, ModelError> {
        let lowered = name.to_lowercase();
        let remove = |groups: &mut Vec<SynonymGroup>| {
            let before = groups.len();
            groups.retain(|g| g.synonym.to_lowercase() != lowered);
            groups.len() != before
        };
        let removed = match &scope {
            SynonymScope::Table(table) => {
                let entry = self.table_mut(table)?;
                let removed = remove(&mut entry.synonym_groups);
                entry.updated_at = Utc::now();
                removed
            }
            SynonymScope::Column { table, column } => {
                let entry = self.column_mut(table, column)?;
                let removed = remove(&mut entry.synonym_groups);
                entry.updated_at = Utc::now();
                removed
            }
            SynonymScope::Relationship(id) => remove(&mut self.relationship_mut(id)?.synonyms),
        };
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Metrics
    // ------------------------------------------------------------------

    /// Insert or replace a metric in the given scope.
    pub fn add_metric(&mut self, scope: MetricScope, metric: Metric) -> Result<(), ModelError> {
        validate_metric_name(&metric.name).map_err(|reason| ModelError::InvalidName {
            name: metric.name.clone(),
            reason,
        })?;
        match &scope {
            MetricScope::Schema => {
                self.schema.metrics.insert(metric.name.clone(), metric);
            }
            MetricScope::Table(table) => {
                let entry = self.table_mut(table)?;
                entry.metric_names.retain(|n| n != &metric.name);
                entry.metric_items.insert(metric.name.clone(), metric);
                entry.updated_at = Utc::now();
            }
        }
        debug!(%scope, "metric added");
        Ok(())
    }

    pub fn remove_metric(&mut self, scope: MetricScope, name: &str) -> Result<(), ModelError> {
        let found = match &scope {
            MetricScope::Schema => self.schema.metrics.remove(name).is_some(),
            MetricScope::Table(table) => {
                let entry = self.table_mut(table)?;
                let in_items = entry.metric_items.remove(name).is_some();
                let before = entry.metric_names.len();
                entry.metric_names.retain(|n| n != name);
                let in_names = entry.metric_names.len() != before;
                if in_items || in_names {
                    entry.updated_at = Utc::now();
                }
                in_items || in_names
            }
        };
        if !found {
            return Err(ModelError::UnknownMetric {
                scope: scope.to_string(),
                name: name.to_string(),
            });
        }
        debug!(%scope, name, "metric removed");
        Ok(())
    }

    /// Change an existing metric's expression. A plain-list table metric is
    /// promoted to a full definition.
    pub fn edit_metric(
        &mut self,
        scope: MetricScope,
        name: &str,
        expression: String,
    ) -> Result<(), ModelError> {
        match &scope {
            MetricScope::Schema => {
                let metric =
                    self.schema
                        .metrics
                        .get_mut(name)
                        .ok_or_else(|| ModelError::UnknownMetric {
                            scope: scope.to_string(),
                            name: name.to_string(),
                        })?;
                metric.expression = expression;
            }
            MetricScope::Table(table) => {
                let entry = self.table_mut(table)?;
                if let Some(metric) = entry.metric_items.get_mut(name) {
                    metric.expression = expression;
                } else if entry.metric_names.iter().any(|n| n == name) {
                    entry.metric_names.retain(|n| n != name);
                    entry
                        .metric_items
                        .insert(name.to_string(), Metric::new(name, expression));
                } else {
                    return Err(ModelError::UnknownMetric {
                        scope: scope.to_string(),
                        name: name.to_string(),
                    });
                }
                entry.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, table: &str) -> bool {
        self.selected.iter().any(|t| t == table)
    }

    /// The table the inspector currently displays, if any.
    pub fn active_table(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn select(&mut self, table: &str) -> Result<(), ModelError> {
        self.require_table(table)?;
        if !self.is_selected(table) {
            self.selected.push(table.to_string());
        }
        Ok(())
    }

    pub fn deselect(&mut self, table: &str) {
        self.selected.retain(|t| t != table);
        if self.active.as_deref() == Some(table) {
            // Fall back to the first remaining selected table; closing the
            // inspector when the selection is now empty.
            self.active = self.selected.first().cloned();
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.schema.tables.keys().cloned().collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.active = None;
    }

    /// Make `table` the inspector's displayed table, selecting it first if
    /// needed so the inspector invariant holds by construction.
    pub fn set_active(&mut self, table: &str) -> Result<(), ModelError> {
        self.select(table)?;
        self.active = Some(table.to_string());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    fn require_table(&self, table: &str) -> Result<(), ModelError> {
        if self.schema.tables.contains_key(table) {
            Ok(())
        } else {
            Err(ModelError::UnknownTable(table.to_string()))
        }
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut Table, ModelError> {
        self.schema
            .tables
            .get_mut(table)
            .ok_or_else(|| ModelError::UnknownTable(table.to_string()))
    }

    fn column_mut(&mut self, table: &str, column: &str) -> Result<&mut Column, ModelError> {
        self.schema
            .tables
            .get_mut(table)
            .ok_or_else(|| ModelError::UnknownTable(table.to_string()))?
            .columns
            .get_mut(column)
            .ok_or_else(|| ModelError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    fn relationship_mut(&mut self, id: &str) -> Result<&mut Relationship, ModelError> {
        self.schema
            .relationships
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ModelError::UnknownRelationship(id.to_string()))
    }
}

impl From<DatabaseSchema> for SchemaModel {
    fn from(schema: DatabaseSchema) -> Self {
        Self::new(schema)
    }
}
