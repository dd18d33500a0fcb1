//! Two-way highlighted diff from the server table to the local table.

use std::collections::HashMap;

use serde::Serialize;

use crate::align::Alignment;
use crate::table::{Row, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiffAction {
    /// Run of unchanged rows, collapsed.
    Skip,
    Insert,
    Delete,
    Modify,
    Conflict,
}

impl DiffAction {
    pub fn symbol(self) -> &'static str {
        match self {
            DiffAction::Skip => "...",
            DiffAction::Insert => "+++",
            DiffAction::Delete => "---",
            DiffAction::Modify => "->",
            DiffAction::Conflict => "!!!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRow {
    pub action: DiffAction,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub row_inserts: usize,
    pub row_deletes: usize,
    pub row_updates: usize,
    pub row_conflicts: usize,
}

impl DiffSummary {
    pub fn has_difference(&self) -> bool {
        self.row_inserts + self.row_deletes + self.row_updates > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDiff {
    pub header: Vec<String>,
    pub rows: Vec<DiffRow>,
    pub summary: DiffSummary,
}

fn modified_cells(from: &[String], to: &[String]) -> Vec<String> {
    from.iter()
        .zip(to)
        .map(|(a, b)| if a == b { a.clone() } else { format!("{a}->{b}") })
        .collect()
}

impl TableDiff {
    /// `conflicted` maps server row indices to their conflict-marked merged content.
    pub fn compute(
        server: &Table,
        local: &Table,
        key_column: Option<usize>,
        conflicted: &HashMap<usize, Row>,
    ) -> Self {
        let alignment = Alignment::compute(server, local, key_column);
        let mut rows: Vec<DiffRow> = Vec::new();
        let mut summary = DiffSummary::default();
        let mut skipping = false;
        let width = server.header().len();

        for (s, l) in alignment.ordered() {
            let row = match (s, l) {
                (Some(s), Some(l)) => {
                    let (sr, lr) = (&server.rows()[s], &local.rows()[l]);
                    if let Some(marked) = conflicted.get(&s) {
                        summary.row_conflicts += 1;
                        if sr != lr {
                            summary.row_updates += 1;
                        }
                        Some(DiffRow {
                            action: DiffAction::Conflict,
                            cells: marked.clone(),
                        })
                    } else if sr == lr {
                        None
                    } else {
                        summary.row_updates += 1;
                        Some(DiffRow {
                            action: DiffAction::Modify,
                            cells: modified_cells(sr, lr),
                        })
                    }
                }
                (Some(s), None) => {
                    summary.row_deletes += 1;
                    Some(DiffRow {
                        action: DiffAction::Delete,
                        cells: server.rows()[s].clone(),
                    })
                }
                (None, Some(l)) => {
                    summary.row_inserts += 1;
                    Some(DiffRow {
                        action: DiffAction::Insert,
                        cells: local.rows()[l].clone(),
                    })
                }
                (None, None) => None,
            };

            match row {
                Some(row) => {
                    rows.push(row);
                    skipping = false;
                }
                None if !skipping => {
                    rows.push(DiffRow {
                        action: DiffAction::Skip,
                        cells: vec!["...".to_string(); width],
                    });
                    skipping = true;
                }
                None => {}
            }
        }

        Self {
            header: server.header().to_vec(),
            rows,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> Table {
        Table::from_rows(
            vec!["ID".into(), "Label".into()],
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn identical_tables_have_no_difference() {
        let t = table(&[&["X:1", "a"], &["X:2", "b"]]);
        let diff = TableDiff::compute(&t, &t, Some(0), &HashMap::new());
        assert!(!diff.summary.has_difference());
        assert_eq!(diff.rows.len(), 1);
        assert_eq!(diff.rows[0].action, DiffAction::Skip);
    }

    #[test]
    fn modifications_show_old_and_new() {
        let server = table(&[&["X:1", "a"], &["X:2", "b"], &["X:3", "c"]]);
        let local = table(&[&["X:1", "a"], &["X:2", "bee"], &["X:4", "d"]]);
        let diff = TableDiff::compute(&server, &local, Some(0), &HashMap::new());

        let actions: Vec<_> = diff.rows.iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![DiffAction::Skip, DiffAction::Modify, DiffAction::Delete, DiffAction::Insert]
        );
        assert_eq!(diff.rows[1].cells[1], "b->bee");
        assert_eq!(
            diff.summary,
            DiffSummary {
                row_inserts: 1,
                row_deletes: 1,
                row_updates: 1,
                row_conflicts: 0
            }
        );
    }
}
