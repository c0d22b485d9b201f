//! Draft buffer for text-field editing.
//!
//! Structural edits apply on explicit commit signals (field blur, save
//! actions), not on every keystroke: the draft value lives here and the
//! model is only touched by [`EditSession::commit`]. This keeps render
//! cadence decoupled from mutation cadence while editing a large nested
//! entity tree. Small enumerated inputs (priority selector, flags) skip the
//! buffer and call the model's edit operations directly.

use crate::core::error::ModelError;
use crate::core::model::{ColumnEdit, SchemaModel, TableEdit};

/// Text fields editable through a buffered session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableTextField {
    DisplayName,
    Description,
    BusinessContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnTextField {
    DisplayName,
    Description,
    BusinessContext,
    BusinessDescription,
}

/// The entity field a draft is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Table {
        table: String,
        field: TableTextField,
    },
    Column {
        table: String,
        column: String,
        field: ColumnTextField,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct DraftEdit {
    target: EditTarget,
    value: String,
    dirty: bool,
}

/// A single-field edit buffer. At most one draft is open at a time; focusing
/// a new field replaces an uncommitted draft (the blur that precedes the new
/// focus is expected to have committed it).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditSession {
    draft: Option<DraftEdit>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    /// Current draft text, if a field has focus.
    pub fn value(&self) -> Option<&str> {
        self.draft.as_ref().map(|d| d.value.as_str())
    }

    /// Focus a field, seeding the draft with its current value.
    pub fn begin(&mut self, target: EditTarget, current: &str) {
        self.draft = Some(DraftEdit {
            target,
            value: current.to_string(),
            dirty: false,
        });
    }

    /// A keystroke: updates the draft only, never the model.
    pub fn update(&mut self, text: &str) {
        if let Some(draft) = &mut self.draft {
            draft.value = text.to_string();
            draft.dirty = true;
        }
    }

    /// Discard the draft without touching the model.
    pub fn cancel(&mut self) {
        self.draft = None;
    }

    /// Blur/explicit commit: flush the draft into the model. Returns whether
    /// a mutation was applied; an unchanged draft is a no-op. On failure the
    /// model is untouched and the draft is kept so the value can be fixed.
    pub fn commit(&mut self, model: &mut SchemaModel) -> Result<bool, ModelError> {
        let Some(draft) = self.draft.take() else {
            return Ok(false);
        };
        if !draft.dirty {
            return Ok(false);
        }

        let result = match &draft.target {
            EditTarget::Table { table, field } => {
                let edit = match field {
                    TableTextField::DisplayName => TableEdit::DisplayName(draft.value.clone()),
                    TableTextField::Description => TableEdit::Description(draft.value.clone()),
                    TableTextField::BusinessContext => {
                        TableEdit::BusinessContext(draft.value.clone())
                    }
                };
                model.apply_table_edit(table, edit)
            }
            EditTarget::Column {
                table,
                column,
                field,
            } => {
                let edit = match field {
                    ColumnTextField::DisplayName => ColumnEdit::DisplayName(draft.value.clone()),
                    ColumnTextField::Description => ColumnEdit::Description(draft.value.clone()),
                    ColumnTextField::BusinessContext => {
                        ColumnEdit::BusinessContext(draft.value.clone())
                    }
                    ColumnTextField::BusinessDescription => {
                        ColumnEdit::BusinessDescription(draft.value.clone())
                    }
                };
                model.apply_column_edit(table, column, edit)
            }
        };

        match result {
            Ok(()) => Ok(true),
            Err(err) => {
                self.draft = Some(draft);
                Err(err)
            }
        }
    }
}
