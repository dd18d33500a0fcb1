//! Three-way merge of `local` and `server` edits against their common `base`.
//!
//! The working copy starts as the server table. Per cell:
//!
//! ```text
//!   local == server          keep
//!   local == base            keep server (only the server changed it)
//!   server == base           take local  (only the local side changed it)
//!   otherwise                conflict: "((( base ))) local /// server"
//! ```
//!
//! Rows deleted on one side are deleted in the merge only if the other side
//! left them untouched; otherwise the modified row is kept and a
//! [`RowConflict`] is recorded. Rows added locally are inserted after the
//! merged position of the preceding local row.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::align::Alignment;
use crate::schema::TableSchema;
use crate::table::{Row, Table};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellConflict {
    /// 1-based row id in the merged table.
    pub row: usize,
    pub key: Option<String>,
    pub column: String,
    pub base: String,
    pub local: String,
    pub server: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowConflictKind {
    DeletedLocallyModifiedOnServer,
    DeletedOnServerModifiedLocally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowConflict {
    /// 1-based row id of the kept row in the merged table.
    pub row: usize,
    pub key: Option<String>,
    pub kind: RowConflictKind,
}

#[derive(Debug, Clone)]
pub struct MergeResult {
    pub merged: Table,
    pub cell_conflicts: Vec<CellConflict>,
    pub row_conflicts: Vec<RowConflict>,
    /// Server rows whose merged content carries conflict markers, with that content.
    pub(crate) conflicted_server_rows: HashMap<usize, Row>,
}

pub fn conflict_marker(base: &str, local: &str, server: &str) -> String {
    format!("((( {base} ))) {local} /// {server}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Origin {
    Server(usize),
    Local(usize),
}

struct PendingCell {
    origin: Origin,
    column: usize,
    base: String,
    local: String,
    server: String,
}

fn merge_cells(
    origin: Origin,
    base: &[String],
    server: &[String],
    local: &[String],
    pending: &mut Vec<PendingCell>,
) -> Row {
    let mut out = Vec::with_capacity(server.len());
    for (c, ((b, s), l)) in base.iter().zip(server).zip(local).enumerate() {
        if l == s || l == b {
            out.push(s.clone());
        } else if s == b {
            out.push(l.clone());
        } else {
            out.push(conflict_marker(b, l, s));
            pending.push(PendingCell {
                origin,
                column: c,
                base: b.clone(),
                local: l.clone(),
                server: s.clone(),
            });
        }
    }
    out
}

/// Merge `local` and `server` relative to `base`. All three must share a header.
pub fn merge3(base: &Table, server: &Table, local: &Table) -> MergeResult {
    let header = server.header().to_vec();
    let key_col = TableSchema::resolve(&header).key_column();
    let empty_row: Row = vec![String::new(); header.len()];

    let bs = Alignment::compute(base, server, key_col);
    let bl = Alignment::compute(base, local, key_col);
    let sl = Alignment::compute(server, local, key_col);

    let mut working: Vec<Row> = server.rows().to_vec();
    let mut deleted = vec![false; server.len()];
    let mut local_to_server: Vec<Option<usize>> = vec![None; local.len()];
    let mut inserted = vec![false; local.len()];
    let mut pending_cells: Vec<PendingCell> = Vec::new();
    let mut pending_rows: Vec<(Origin, RowConflictKind)> = Vec::new();

    for (b, base_row) in base.rows().iter().enumerate() {
        match (bs.left_to_right[b], bl.left_to_right[b]) {
            (Some(s), Some(l)) => {
                local_to_server[l] = Some(s);
                working[s] = merge_cells(
                    Origin::Server(s),
                    base_row,
                    &server.rows()[s],
                    &local.rows()[l],
                    &mut pending_cells,
                );
            }
            (Some(s), None) => {
                if server.rows()[s] == *base_row {
                    deleted[s] = true;
                } else {
                    pending_rows.push((Origin::Server(s), RowConflictKind::DeletedLocallyModifiedOnServer));
                }
            }
            (None, Some(l)) => {
                if local.rows()[l] != *base_row {
                    inserted[l] = true;
                    pending_rows.push((Origin::Local(l), RowConflictKind::DeletedOnServerModifiedLocally));
                }
            }
            (None, None) => {}
        }
    }

    for l in 0..local.len() {
        if bl.right_to_left[l].is_some() {
            continue;
        }
        match sl.right_to_left[l] {
            Some(s) if bs.right_to_left[s].is_none() => {
                // Added on both sides: merge against an empty row.
                local_to_server[l] = Some(s);
                working[s] = merge_cells(
                    Origin::Server(s),
                    &empty_row,
                    &server.rows()[s],
                    &local.rows()[l],
                    &mut pending_cells,
                );
            }
            _ => inserted[l] = true,
        }
    }

    let mut leading: Vec<usize> = Vec::new();
    let mut after: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut anchor: Option<usize> = None;
    for l in 0..local.len() {
        if inserted[l] {
            match anchor {
                Some(s) => after.entry(s).or_default().push(l),
                None => leading.push(l),
            }
        } else if let Some(s) = local_to_server[l] {
            anchor = Some(s);
        }
    }

    let mut out_rows: Vec<Row> = Vec::with_capacity(server.len() + local.len());
    let mut row_of: HashMap<Origin, usize> = HashMap::new();
    let mut emit = |origin: Origin, row: Row| {
        out_rows.push(row);
        row_of.insert(origin, out_rows.len());
    };
    for l in leading {
        emit(Origin::Local(l), local.rows()[l].clone());
    }
    for s in 0..server.len() {
        if !deleted[s] {
            emit(Origin::Server(s), working[s].clone());
        }
        for l in after.remove(&s).unwrap_or_default() {
            emit(Origin::Local(l), local.rows()[l].clone());
        }
    }
    let merged = Table::from_parts(header.clone(), out_rows);

    let key_of = |row_id: usize| -> Option<String> {
        let col = key_col?;
        let value = merged.rows().get(row_id.checked_sub(1)?)?[col].trim().to_string();
        (!value.is_empty()).then_some(value)
    };

    let mut conflicted_server_rows = HashMap::new();
    let cell_conflicts: Vec<CellConflict> = pending_cells
        .into_iter()
        .map(|p| {
            if let Origin::Server(s) = p.origin {
                conflicted_server_rows.insert(s, working[s].clone());
            }
            let row = row_of.get(&p.origin).copied().unwrap_or_default();
            CellConflict {
                row,
                key: key_of(row),
                column: header[p.column].clone(),
                base: p.base,
                local: p.local,
                server: p.server,
            }
        })
        .collect();
    let row_conflicts: Vec<RowConflict> = pending_rows
        .into_iter()
        .map(|(origin, kind)| {
            let row = row_of.get(&origin).copied().unwrap_or_default();
            RowConflict {
                row,
                key: key_of(row),
                kind,
            }
        })
        .collect();

    if !cell_conflicts.is_empty() || !row_conflicts.is_empty() {
        let rows: BTreeSet<usize> = cell_conflicts
            .iter()
            .map(|c| c.row)
            .chain(row_conflicts.iter().map(|r| r.row))
            .collect();
        tracing::debug!(
            cell_conflicts = cell_conflicts.len(),
            row_conflicts = row_conflicts.len(),
            rows = rows.len(),
            "three-way merge produced conflicts"
        );
    }

    MergeResult {
        merged,
        cell_conflicts,
        row_conflicts,
        conflicted_server_rows,
    }
}
