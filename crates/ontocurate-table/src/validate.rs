//! Row validation for the editor's save button.
//!
//! Two checks per row: required cells must not be blank, and `ID`, `Label`
//! and `Definition` values must be unique across the table. Both are a single
//! pass over rows; value counts are computed once up front.

use std::collections::HashMap;

use serde::Serialize;

use crate::schema::{
    TableSchema, CURATION_STATUS, DEFINITION, ID, LABEL, PARENT, STATUS_EXTERNAL, STATUS_PROPOSED,
    SUB_ONTOLOGY,
};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellIssue {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowIssues {
    /// Zero-based row index.
    pub row: usize,
    pub blank: Vec<CellIssue>,
    pub not_unique: Vec<CellIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub rows: Vec<RowIssues>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn issues_for(&self, row: usize) -> Option<&RowIssues> {
        self.rows.iter().find(|r| r.row == row)
    }
}

fn value_counts(table: &Table, col: Option<usize>) -> HashMap<&str, usize> {
    let Some(col) = col else {
        return HashMap::new();
    };
    table.rows().iter().fold(HashMap::new(), |mut counts, row| {
        let value = row[col].trim();
        if !value.is_empty() {
            *counts.entry(value).or_insert(0) += 1;
        }
        counts
    })
}

pub fn validate(table: &Table) -> ValidationReport {
    let schema = TableSchema::resolve(table.header());

    let always_required = [
        (LABEL, schema.label),
        (SUB_ONTOLOGY, schema.sub_ontology),
        (CURATION_STATUS, schema.curation_status),
    ];
    let status_required = [(DEFINITION, schema.definition), (PARENT, schema.parent)];
    let unique = [
        (ID, schema.id, value_counts(table, schema.id)),
        (LABEL, schema.label, value_counts(table, schema.label)),
        (DEFINITION, schema.definition, value_counts(table, schema.definition)),
    ];

    let rows = table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let mut issues = RowIssues {
                row: i,
                ..Default::default()
            };

            let status = schema.curation_status(row);
            let needs_content = matches!(status, Some(s) if s != STATUS_PROPOSED && s != STATUS_EXTERNAL);
            let required = always_required
                .iter()
                .chain(status_required.iter().filter(|_| needs_content));
            for (name, col) in required {
                if let Some(col) = col {
                    if row[*col].trim().is_empty() {
                        issues.blank.push(CellIssue {
                            column: name.to_string(),
                            value: row[*col].clone(),
                        });
                    }
                }
            }

            for (name, col, counts) in &unique {
                let Some(col) = col else { continue };
                let value = row[*col].trim();
                if counts.get(value).copied().unwrap_or(0) > 1 {
                    issues.not_unique.push(CellIssue {
                        column: name.to_string(),
                        value: value.to_string(),
                    });
                }
            }

            (!issues.blank.is_empty() || !issues.not_unique.is_empty()).then_some(issues)
        })
        .collect();

    ValidationReport { rows }
}
