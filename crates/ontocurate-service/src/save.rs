//! Preparing an editor save.
//!
//! Rows that are complete but have no `ID` get one. If the server sheet has
//! not moved since editing started (or the user asked to overwrite), the
//! local table is accepted and queued for re-indexing. Otherwise the local
//! table is reconciled against the server and handed back for manual
//! resolution together with the server's fresh revision token.

use ontocurate_storage::SheetUpdate;
use ontocurate_table::schema::ROW_SEQUENCE;
use ontocurate_table::{ReconcileOutcome, Table};

use crate::service::CurationService;
use crate::ServiceError;

#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub repo: String,
    pub folder: String,
    pub sheet_name: String,
    /// Table as it was when editing started.
    pub base: Table,
    /// Table the user is saving.
    pub local: Table,
    /// Server revision token captured when editing started.
    pub initial_token: String,
    pub overwrite: bool,
}

/// Current server copy of the sheet.
#[derive(Debug, Clone)]
pub struct ServerSheet {
    pub table: Table,
    pub token: String,
}

#[derive(Debug, Clone)]
pub enum SaveDecision {
    /// Write `table` as is.
    Accept { table: Table },
    /// The server moved on; the operator resolves `outcome`.
    Reconcile {
        outcome: ReconcileOutcome,
        server_token: String,
    },
}

#[derive(Debug, Clone)]
pub struct PreparedSave {
    /// Identifiers issued for rows that had none, in row order.
    pub ids_assigned: Vec<String>,
    pub decision: SaveDecision,
}

impl PreparedSave {
    pub fn is_accepted(&self) -> bool {
        matches!(self.decision, SaveDecision::Accept { .. })
    }
}

impl CurationService {
    /// Give every complete row without an `ID` a fresh identifier.
    ///
    /// A row is complete when `Label`, `Parent` and `Definition` are non-blank.
    /// Sheets lacking any of those columns are left alone.
    pub fn backfill_identifiers(&self, repo: &str, table: &mut Table) -> Result<Vec<String>, ServiceError> {
        let schema = table.schema();
        let Some(id_col) = schema.id else {
            return Ok(Vec::new());
        };
        if !schema.has_core_fields() {
            return Ok(Vec::new());
        }
        let pending: Vec<usize> = table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                schema.id(row).is_none()
                    && schema.label(row).is_some()
                    && schema.definition(row).is_some()
                    && schema.parent_label(row).is_some()
            })
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.next_identifiers(repo, pending.len())?;
        let rows = table.rows_mut();
        for (&row, id) in pending.iter().zip(&ids) {
            rows[row][id_col] = id.clone();
        }
        tracing::info!(repo = %repo, assigned = ids.len(), "assigned identifiers to new rows");
        Ok(ids)
    }

    pub fn prepare_save(
        &self,
        request: &SaveRequest,
        server: &ServerSheet,
    ) -> Result<PreparedSave, ServiceError> {
        let mut local = request.local.without_column(ROW_SEQUENCE);
        let ids_assigned = self.backfill_identifiers(&request.repo, &mut local)?;

        if request.overwrite || server.token == request.initial_token {
            self.enqueue_index_update(SheetUpdate {
                repo: request.repo.clone(),
                folder: request.folder.clone(),
                sheet_name: request.sheet_name.clone(),
                table: local.clone(),
            })?;
            tracing::info!(
                repo = %request.repo,
                sheet = %request.sheet_name,
                overwrite = request.overwrite,
                "save accepted"
            );
            return Ok(PreparedSave {
                ids_assigned,
                decision: SaveDecision::Accept { table: local },
            });
        }

        let outcome = self.reconcile(&request.base, &server.table, &local);
        tracing::info!(
            repo = %request.repo,
            sheet = %request.sheet_name,
            conflicts = outcome.has_conflicts(),
            "server sheet changed since editing started"
        );
        Ok(PreparedSave {
            ids_assigned,
            decision: SaveDecision::Reconcile {
                outcome,
                server_token: server.token.clone(),
            },
        })
    }
}
