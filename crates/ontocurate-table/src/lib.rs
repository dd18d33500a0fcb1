//! Curation tables and their reconciliation.
//!
//! A curation sheet is a header plus rows of string cells. This crate resolves
//! the sheet's known columns once ([`TableSchema`]), validates rows before a
//! save, and reconciles a locally edited table against a server table that
//! may have moved on since editing started:
//!
//! ```text
//!          base ───────────────┐
//!         /    \               │ three-way merge -> merged rows + conflicts
//!    server    local ──────────┘
//!         \    /
//!          diff (server -> local) -> highlighted HTML
//! ```
//!
//! Conflicts are data, not errors: [`reconcile`] always returns a
//! [`ReconcileOutcome`].

pub mod align;
pub mod diff;
pub mod merge;
pub mod render;
pub mod schema;
pub mod table;
pub mod validate;

pub use align::Alignment;
pub use diff::{DiffAction, DiffRow, DiffSummary, TableDiff};
pub use merge::{conflict_marker, merge3, CellConflict, MergeResult, RowConflict, RowConflictKind};
pub use schema::{RelationColumn, TableSchema};
pub use table::{Row, Table};
pub use validate::{validate, CellIssue, RowIssues, ValidationReport};

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("row {row} is not a JSON object")]
    NotAnObject { row: usize },

    #[error("row {row} has {found} cells, header has {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub diff_html: String,
    pub diff: TableDiff,
    pub merged: Table,
    pub cell_conflicts: Vec<CellConflict>,
    pub row_conflicts: Vec<RowConflict>,
}

impl ReconcileOutcome {
    pub fn has_difference(&self) -> bool {
        self.diff.summary.has_difference()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.cell_conflicts.is_empty() || !self.row_conflicts.is_empty()
    }

    /// Merged rows as editor records with fresh 1-based row ids.
    pub fn merged_records(&self) -> Vec<Value> {
        self.merged.to_records_with_row_ids()
    }
}

/// Reconcile `local` against `server` relative to `base`.
///
/// All three tables are projected onto the server header with the UI
/// row-sequence column removed. Rows are compared as given; callers that want
/// label order should pass [`Table::normalized_for_diff`] tables.
pub fn reconcile(base: &Table, server: &Table, local: &Table) -> ReconcileOutcome {
    let server = server.without_column(schema::ROW_SEQUENCE);
    let header = server.header().to_vec();
    let base = base.without_column(schema::ROW_SEQUENCE).project(&header);
    let local = local.without_column(schema::ROW_SEQUENCE).project(&header);

    let merge = merge3(&base, &server, &local);
    let key_column = TableSchema::resolve(&header).key_column();
    let diff = TableDiff::compute(&server, &local, key_column, &merge.conflicted_server_rows);
    let diff_html = render::render_html(&diff);

    tracing::debug!(
        rows = merge.merged.len(),
        inserts = diff.summary.row_inserts,
        deletes = diff.summary.row_deletes,
        updates = diff.summary.row_updates,
        conflicts = merge.cell_conflicts.len() + merge.row_conflicts.len(),
        "reconciled table"
    );

    ReconcileOutcome {
        diff_html,
        diff,
        merged: merge.merged,
        cell_conflicts: merge.cell_conflicts,
        row_conflicts: merge.row_conflicts,
    }
}
