//! Graph-editor state machine: table/relationship selection and relationship
//! authoring via connect-drag gestures.
//!
//! The gesture cycle is `Idle -> PendingConnection` (drag started from a
//! table node) `-> draft modal open` (drop on a distinct valid target)
//! `-> Idle` on commit or cancel. A drop on the origin node or on empty
//! space proposes nothing. Cancel keeps the uncommitted draft as a ghost
//! edge; clicking that edge reopens the modal with the retained values.

use petgraph::Directed;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::error::ModelError;
use crate::core::model::{RelationshipSpec, SchemaModel};
use crate::core::schema::{Relationship, RelationshipType, SynonymGroup};
use crate::editor::layout::{GridConfig, GridLayout};

/// Columns shown inline on a table node before the overflow affordance
/// appears.
pub const INLINE_COLUMN_LIMIT: usize = 8;

/// A table node on the diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramNode {
    pub table: String,
    /// The table has more columns than fit inline.
    pub column_overflow: bool,
}

/// An edge on the diagram. `relationship_id` is `None` for the ghost edge of
/// an uncommitted draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramEdge {
    pub relationship_id: Option<String>,
    pub source: String,
    pub target: String,
}

/// Diagram graph: nodes are selected tables, edges are relationships.
pub type DiagramGraph = StableGraph<DiagramNode, DiagramEdge, Directed>;

/// Connect-drag phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectPhase {
    #[default]
    Idle,
    /// Drag started from this table, no drop yet.
    PendingConnection {
        source_table: String,
    },
    /// The relationship draft modal is open.
    DraftOpen,
}

/// An uncommitted relationship, held while the modal is open and retained
/// after cancel until committed or replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDraft {
    pub source_table: String,
    pub target_table: String,
    pub name: String,
    pub description: String,
    pub relationship_type: RelationshipType,
    pub source_columns: Vec<String>,
    pub target_columns: Vec<String>,
    pub synonyms: Vec<SynonymGroup>,
}

impl RelationshipDraft {
    fn new(source: &str, target: &str) -> Self {
        Self {
            source_table: source.to_string(),
            target_table: target.to_string(),
            name: String::new(),
            description: String::new(),
            relationship_type: RelationshipType::default(),
            source_columns: Vec::new(),
            target_columns: Vec::new(),
            synonyms: Vec::new(),
        }
    }
}

/// Inspector pane tab. The relationships tab is filtered to the exact
/// (source, target) pair that was clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectorTab {
    Details,
    Columns,
    Relationships { source: String, target: String },
}

/// Outcome of completing a connect drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Dropped on a distinct valid table; the draft modal is open.
    DraftOpened,
    /// Dropped on the origin, empty space, or an unknown table.
    Ignored,
}

/// Outcome of clicking a diagram edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeClick {
    /// The edge was an uncommitted draft; the modal reopened.
    DraftReopened,
    /// Inspector opened on the relationships tab for this exact pair.
    RelationshipsFiltered { source: String, target: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InteractionError {
    #[error("no relationship draft is open")]
    NoDraft,

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Driver for the diagram: owns the graph, the connect-drag state, the
/// layout, and the inspector tab. The schema itself stays in
/// [`SchemaModel`]; the engine only reads it during [`sync`] and writes
/// through its operations on commit.
///
/// [`sync`]: DiagramInteractionEngine::sync
#[derive(Debug, Default)]
pub struct DiagramInteractionEngine {
    graph: DiagramGraph,
    nodes: BTreeMap<String, NodeIndex>,
    phase: ConnectPhase,
    draft: Option<RelationshipDraft>,
    layout: GridLayout,
    inspector_tab: Option<InspectorTab>,
}

impl DiagramInteractionEngine {
    pub fn new() -> Self {
        Self::with_layout(GridConfig::default())
    }

    pub fn with_layout(config: GridConfig) -> Self {
        Self {
            graph: DiagramGraph::default(),
            nodes: BTreeMap::new(),
            phase: ConnectPhase::Idle,
            draft: None,
            layout: GridLayout::new(config),
            inspector_tab: None,
        }
    }

    /// Rebuild the diagram from the model's selected-table set. Call after
    /// selection or relationship changes; property edits do not need it and
    /// never move nodes either way.
    pub fn sync(&mut self, model: &SchemaModel) {
        self.graph = DiagramGraph::default();
        self.nodes.clear();

        for table_name in model.selected() {
            let Some(table) = model.schema().table(table_name) else {
                continue;
            };
            let node = self.graph.add_node(DiagramNode {
                table: table_name.clone(),
                column_overflow: table.columns.len() > INLINE_COLUMN_LIMIT,
            });
            self.nodes.insert(table_name.clone(), node);
        }

        for rel in &model.schema().relationships {
            if let (Some(&source), Some(&target)) = (
                self.nodes.get(&rel.source_table_id),
                self.nodes.get(&rel.target_table_id),
            ) {
                self.graph.add_edge(
                    source,
                    target,
                    DiagramEdge {
                        relationship_id: Some(rel.id.clone()),
                        source: rel.source_table_id.clone(),
                        target: rel.target_table_id.clone(),
                    },
                );
            }
        }

        if let Some(draft) = &self.draft
            && let (Some(&source), Some(&target)) = (
                self.nodes.get(&draft.source_table),
                self.nodes.get(&draft.target_table),
            )
        {
            self.graph.add_edge(
                source,
                target,
                DiagramEdge {
                    relationship_id: None,
                    source: draft.source_table.clone(),
                    target: draft.target_table.clone(),
                },
            );
        }

        self.layout.sync(model.selected());

        if model.active_table().is_none() {
            self.inspector_tab = None;
        }
    }

    pub fn graph(&self) -> &DiagramGraph {
        &self.graph
    }

    pub fn phase(&self) -> &ConnectPhase {
        &self.phase
    }

    pub fn draft(&self) -> Option<&RelationshipDraft> {
        self.draft.as_ref()
    }

    /// Mutable access for the modal form fields while the draft is open.
    pub fn draft_mut(&mut self) -> Option<&mut RelationshipDraft> {
        match self.phase {
            ConnectPhase::DraftOpen => self.draft.as_mut(),
            _ => None,
        }
    }

    pub fn inspector_tab(&self) -> Option<&InspectorTab> {
        self.inspector_tab.as_ref()
    }

    pub fn node_position(&self, table: &str) -> Option<(f64, f64)> {
        self.layout.position(table)
    }

    /// Record a manual node reposition.
    pub fn move_node(&mut self, table: &str, position: (f64, f64)) {
        self.layout.set_position(table, position);
    }

    // ------------------------------------------------------------------
    // Connect-drag gesture
    // ------------------------------------------------------------------

    /// Start a connect drag from a table node. Returns whether the drag
    /// started (the table must be on the diagram and the engine idle).
    pub fn begin_connect(&mut self, table: &str) -> bool {
        if self.phase != ConnectPhase::Idle || !self.nodes.contains_key(table) {
            return false;
        }
        self.phase = ConnectPhase::PendingConnection {
            source_table: table.to_string(),
        };
        true
    }

    /// Finish a connect drag. `None` is a drop on empty space. A drop on the
    /// origin node or on an unknown table proposes nothing.
    pub fn complete_connect(&mut self, target: Option<&str>) -> ConnectOutcome {
        let ConnectPhase::PendingConnection { source_table } = self.phase.clone() else {
            return ConnectOutcome::Ignored;
        };

        match target {
            Some(target) if target != source_table && self.nodes.contains_key(target) => {
                debug!(source = %source_table, target, "relationship draft opened");
                self.draft = Some(RelationshipDraft::new(&source_table, target));
                self.phase = ConnectPhase::DraftOpen;
                ConnectOutcome::DraftOpened
            }
            _ => {
                self.phase = ConnectPhase::Idle;
                ConnectOutcome::Ignored
            }
        }
    }

    /// Commit the open draft into the model. On success the draft is cleared
    /// and the diagram resynced; on failure the modal stays open and the
    /// model is unchanged.
    pub fn commit_draft(&mut self, model: &mut SchemaModel) -> Result<String, InteractionError> {
        if self.phase != ConnectPhase::DraftOpen {
            return Err(InteractionError::NoDraft);
        }
        let draft = self.draft.as_ref().ok_or(InteractionError::NoDraft)?;

        let id = model.add_relationship(RelationshipSpec {
            name: draft.name.clone(),
            description: draft.description.clone(),
            source_table_id: draft.source_table.clone(),
            source_columns: draft.source_columns.clone(),
            target_table_id: draft.target_table.clone(),
            target_columns: draft.target_columns.clone(),
            relationship_type: draft.relationship_type,
            synonyms: draft.synonyms.clone(),
        })?;

        self.draft = None;
        self.phase = ConnectPhase::Idle;
        self.sync(model);
        Ok(id)
    }

    /// Close the modal without committing. The draft is retained and shows
    /// as a ghost edge until committed or replaced.
    pub fn cancel_draft(&mut self, model: &SchemaModel) {
        if self.phase == ConnectPhase::DraftOpen {
            self.phase = ConnectPhase::Idle;
        }
        self.resync_ghost(model);
    }

    // ------------------------------------------------------------------
    // Click routing
    // ------------------------------------------------------------------

    /// Click on a table node: open the inspector details tab for it.
    pub fn click_node(&mut self, model: &mut SchemaModel, table: &str) -> Result<(), ModelError> {
        model.set_active(table)?;
        self.inspector_tab = Some(InspectorTab::Details);
        Ok(())
    }

    /// Click on the column-overflow affordance: open the columns tab
    /// directly.
    pub fn click_column_overflow(
        &mut self,
        model: &mut SchemaModel,
        table: &str,
    ) -> Result<(), ModelError> {
        model.set_active(table)?;
        self.inspector_tab = Some(InspectorTab::Columns);
        Ok(())
    }

    /// Click on a diagram edge. A ghost edge reopens the draft modal; a
    /// committed edge opens the relationships tab filtered to the exact
    /// clicked pair.
    pub fn click_edge(
        &mut self,
        model: &mut SchemaModel,
        edge: EdgeIndex,
    ) -> Option<EdgeClick> {
        let weight = self.graph.edge_weight(edge)?.clone();
        match weight.relationship_id {
            None => {
                self.phase = ConnectPhase::DraftOpen;
                Some(EdgeClick::DraftReopened)
            }
            Some(_) => {
                // The source table is on the diagram, so it is selected.
                let _ = model.set_active(&weight.source);
                self.inspector_tab = Some(InspectorTab::Relationships {
                    source: weight.source.clone(),
                    target: weight.target.clone(),
                });
                Some(EdgeClick::RelationshipsFiltered {
                    source: weight.source,
                    target: weight.target,
                })
            }
        }
    }

    /// Relationships shown by the inspector under the current tab filter:
    /// only those with the exact clicked (source, target) pair, so multiple
    /// relationships between the same two tables don't all surface at once.
    pub fn inspector_relationships<'a>(&self, model: &'a SchemaModel) -> Vec<&'a Relationship> {
        let Some(InspectorTab::Relationships { source, target }) = &self.inspector_tab else {
            return Vec::new();
        };
        model
            .schema()
            .relationships
            .iter()
            .filter(|r| &r.source_table_id == source && &r.target_table_id == target)
            .collect()
    }

    /// Rebuild just the ghost edge after a draft state change.
    fn resync_ghost(&mut self, model: &SchemaModel) {
        // Drop any existing ghost edge, then re-add from the current draft.
        let ghost: Vec<EdgeIndex> = self
            .graph
            .edge_indices()
            .filter(|&e| {
                self.graph
                    .edge_weight(e)
                    .is_some_and(|w| w.relationship_id.is_none())
            })
            .collect();
        for edge in ghost {
            self.graph.remove_edge(edge);
        }
        if let Some(draft) = &self.draft
            && let (Some(&source), Some(&target)) = (
                self.nodes.get(&draft.source_table),
                self.nodes.get(&draft.target_table),
            )
            && model.is_selected(&draft.source_table)
            && model.is_selected(&draft.target_table)
        {
            self.graph.add_edge(
                source,
                target,
                DiagramEdge {
                    relationship_id: None,
                    source: draft.source_table.clone(),
                    target: draft.target_table.clone(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::RelationshipSpec;
    use crate::core::normalize::ingest;
    use crate::core::schema::{Column, Table};
    use crate::core::wire::WireSchema;

    fn model_with_tables(names: &[&str]) -> SchemaModel {
        let mut schema = ingest(WireSchema {
            id: "test".into(),
            ..Default::default()
        });
        for name in names {
            let table =
                Table::new(*name).add_column(Column::new(*name, "id", "BIGINT").primary_key());
            schema.tables.insert((*name).to_string(), table);
        }
        SchemaModel::new(schema)
    }

    fn engine_for(model: &mut SchemaModel, selected: &[&str]) -> DiagramInteractionEngine {
        for table in selected {
            model.select(table).unwrap();
        }
        let mut engine = DiagramInteractionEngine::new();
        engine.sync(model);
        engine
    }

    #[test]
    fn test_connect_drag_opens_draft() {
        let mut model = model_with_tables(&["orders", "customers"]);
        let mut engine = engine_for(&mut model, &["orders", "customers"]);

        assert!(engine.begin_connect("orders"));
        assert_eq!(
            engine.complete_connect(Some("customers")),
            ConnectOutcome::DraftOpened
        );
        let draft = engine.draft().unwrap();
        assert_eq!(draft.source_table, "orders");
        assert_eq!(draft.target_table, "customers");
        assert_eq!(*engine.phase(), ConnectPhase::DraftOpen);
    }

    #[test]
    fn test_drop_on_origin_is_ignored() {
        let mut model = model_with_tables(&["orders"]);
        let mut engine = engine_for(&mut model, &["orders"]);

        assert!(engine.begin_connect("orders"));
        assert_eq!(engine.complete_connect(Some("orders")), ConnectOutcome::Ignored);
        assert_eq!(*engine.phase(), ConnectPhase::Idle);
        assert!(engine.draft().is_none());
    }

    #[test]
    fn test_drop_on_empty_space_is_ignored() {
        let mut model = model_with_tables(&["orders", "customers"]);
        let mut engine = engine_for(&mut model, &["orders", "customers"]);

        assert!(engine.begin_connect("orders"));
        assert_eq!(engine.complete_connect(None), ConnectOutcome::Ignored);
        assert_eq!(*engine.phase(), ConnectPhase::Idle);
    }

    #[test]
    fn test_connect_requires_diagram_node() {
        let mut model = model_with_tables(&["orders", "customers"]);
        // Only orders is selected; customers is not on the diagram.
        let mut engine = engine_for(&mut model, &["orders"]);

        assert!(!engine.begin_connect("customers"));
        assert!(engine.begin_connect("orders"));
        assert_eq!(
            engine.complete_connect(Some("customers")),
            ConnectOutcome::Ignored
        );
    }

    #[test]
    fn test_commit_draft_adds_relationship() {
        let mut model = model_with_tables(&["orders", "customers"]);
        let mut engine = engine_for(&mut model, &["orders", "customers"]);

        engine.begin_connect("orders");
        engine.complete_connect(Some("customers"));
        {
            let draft = engine.draft_mut().unwrap();
            draft.name = "belongs_to".into();
            draft.relationship_type = RelationshipType::ManyToOne;
        }
        let id = engine.commit_draft(&mut model).unwrap();

        assert_eq!(model.schema().relationships.len(), 1);
        let rel = model.schema().relationship(&id).unwrap();
        assert_eq!(rel.name, "belongs_to");
        assert_eq!(rel.source_table_id, "orders");
        assert_eq!(rel.target_table_id, "customers");
        assert_eq!(rel.cardinality_ratio(), "N:1");
        assert!(engine.draft().is_none());
        assert_eq!(*engine.phase(), ConnectPhase::Idle);
        // The committed relationship is now a real edge.
        assert_eq!(engine.graph().edge_count(), 1);
    }

    #[test]
    fn test_commit_without_draft_errors() {
        let mut model = model_with_tables(&["orders"]);
        let mut engine = engine_for(&mut model, &["orders"]);
        assert_eq!(
            engine.commit_draft(&mut model),
            Err(InteractionError::NoDraft)
        );
        assert!(model.schema().relationships.is_empty());
    }

    #[test]
    fn test_cancel_retains_ghost_edge_and_click_reopens() {
        let mut model = model_with_tables(&["orders", "customers"]);
        let mut engine = engine_for(&mut model, &["orders", "customers"]);

        engine.begin_connect("orders");
        engine.complete_connect(Some("customers"));
        engine.draft_mut().unwrap().name = "belongs_to".into();
        engine.cancel_draft(&model);

        assert_eq!(*engine.phase(), ConnectPhase::Idle);
        assert_eq!(engine.graph().edge_count(), 1);
        let ghost = engine.graph().edge_indices().next().unwrap();
        assert_eq!(
            engine.graph().edge_weight(ghost).unwrap().relationship_id,
            None
        );

        // Clicking the ghost edge reopens the modal with retained values.
        assert_eq!(
            engine.click_edge(&mut model, ghost),
            Some(EdgeClick::DraftReopened)
        );
        assert_eq!(*engine.phase(), ConnectPhase::DraftOpen);
        assert_eq!(engine.draft().unwrap().name, "belongs_to");
    }

    #[test]
    fn test_edge_click_filters_exact_pair() {
        let mut model = model_with_tables(&["orders", "customers", "payments"]);
        model
            .add_relationship(RelationshipSpec {
                name: "placed".into(),
                source_table_id: "orders".into(),
                target_table_id: "customers".into(),
                ..Default::default()
            })
            .unwrap();
        model
            .add_relationship(RelationshipSpec {
                name: "billed".into(),
                source_table_id: "payments".into(),
                target_table_id: "customers".into(),
                ..Default::default()
            })
            .unwrap();

        let mut engine = engine_for(&mut model, &["orders", "customers", "payments"]);
        let edge = engine
            .graph()
            .edge_indices()
            .find(|&e| engine.graph().edge_weight(e).unwrap().source == "orders")
            .unwrap();

        let outcome = engine.click_edge(&mut model, edge).unwrap();
        assert_eq!(
            outcome,
            EdgeClick::RelationshipsFiltered {
                source: "orders".into(),
                target: "customers".into(),
            }
        );
        let shown = engine.inspector_relationships(&model);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].name, "placed");
    }

    #[test]
    fn test_node_click_opens_details_tab() {
        let mut model = model_with_tables(&["orders"]);
        let mut engine = engine_for(&mut model, &["orders"]);

        engine.click_node(&mut model, "orders").unwrap();
        assert_eq!(engine.inspector_tab(), Some(&InspectorTab::Details));
        assert_eq!(model.active_table(), Some("orders"));
    }

    #[test]
    fn test_overflow_click_opens_columns_tab() {
        let mut model = model_with_tables(&["orders"]);
        let mut engine = engine_for(&mut model, &["orders"]);

        engine.click_column_overflow(&mut model, "orders").unwrap();
        assert_eq!(engine.inspector_tab(), Some(&InspectorTab::Columns));
    }

    #[test]
    fn test_overflow_flag_set_on_wide_tables() {
        let mut schema = ingest(WireSchema {
            id: "test".into(),
            ..Default::default()
        });
        let mut wide = Table::new("wide");
        for i in 0..(INLINE_COLUMN_LIMIT + 1) {
            let name = format!("col_{i}");
            wide = wide.add_column(Column::new("wide", name, "TEXT"));
        }
        schema.tables.insert("wide".into(), wide);

        let mut model = SchemaModel::new(schema);
        let engine = engine_for(&mut model, &["wide"]);
        let node = engine.graph().node_indices().next().unwrap();
        assert!(engine.graph().node_weight(node).unwrap().column_overflow);
    }

    #[test]
    fn test_sync_closes_tab_when_inspector_closed() {
        let mut model = model_with_tables(&["orders"]);
        let mut engine = engine_for(&mut model, &["orders"]);
        engine.click_node(&mut model, "orders").unwrap();

        model.deselect("orders");
        engine.sync(&model);
        assert_eq!(engine.inspector_tab(), None);
    }

    #[test]
    fn test_property_edit_does_not_move_nodes() {
        let mut model = model_with_tables(&["orders", "customers"]);
        let mut engine = engine_for(&mut model, &["orders", "customers"]);

        engine.move_node("orders", (640.0, 480.0));
        model
            .apply_table_edit(
                "orders",
                crate::core::model::TableEdit::Description("Order headers".into()),
            )
            .unwrap();
        engine.sync(&model);
        assert_eq!(engine.node_position("orders"), Some((640.0, 480.0)));
    }
}
