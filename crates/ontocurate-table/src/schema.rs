//! Known columns of a curation sheet.
//!
//! Sheets vary: most carry `ID`/`Label`/`Definition`/`Parent`, many add
//! `Curation status`, and relation columns are free-form headers such as
//! `REL 'has part'`. The schema is resolved once per header so row access is
//! an index lookup rather than a string search per cell.

use std::sync::OnceLock;

use regex::Regex;

pub const ID: &str = "ID";
pub const LABEL: &str = "Label";
pub const DEFINITION: &str = "Definition";
pub const PARENT: &str = "Parent";
pub const CURATION_STATUS: &str = "Curation status";
pub const SUB_ONTOLOGY: &str = "Sub-ontology";
pub const REVIEWER: &str = "To be reviewed by";
/// UI-only row sequence added by the editor grid.
pub const ROW_SEQUENCE: &str = "id";

pub const STATUS_OBSOLETE: &str = "Obsolete";
pub const STATUS_PROPOSED: &str = "Proposed";
pub const STATUS_EXTERNAL: &str = "External";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationColumn {
    pub index: usize,
    pub header: String,
    /// Relation name quoted in the header, e.g. `has part`.
    pub relation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub id: Option<usize>,
    pub label: Option<usize>,
    pub definition: Option<usize>,
    pub parent: Option<usize>,
    pub curation_status: Option<usize>,
    pub sub_ontology: Option<usize>,
    pub reviewer: Option<usize>,
    pub relations: Vec<RelationColumn>,
}

fn quoted_token() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([^']+)'").ok()).as_ref()
}

fn bracketed() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[.*?\]").ok()).as_ref()
}

/// Relation name encoded in a column header (`REL 'has part'` -> `has part`).
pub fn relation_name(header: &str) -> Option<String> {
    if !header.contains("REL") {
        return None;
    }
    quoted_token()?
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Remove bracketed annotations such as `[obsolete]` and trim.
pub fn strip_bracketed(value: &str) -> String {
    match bracketed() {
        Some(re) => re.replace_all(value, "").trim().to_string(),
        None => value.trim().to_string(),
    }
}

fn non_blank(row: &[String], col: Option<usize>) -> Option<&str> {
    let value = row.get(col?)?.trim();
    (!value.is_empty()).then_some(value)
}

impl TableSchema {
    pub fn resolve(header: &[String]) -> Self {
        let find = |name: &str| header.iter().position(|h| h == name);
        let relations = header
            .iter()
            .enumerate()
            .filter_map(|(index, h)| {
                relation_name(h).map(|relation| RelationColumn {
                    index,
                    header: h.clone(),
                    relation,
                })
            })
            .collect();
        Self {
            id: find(ID),
            label: find(LABEL),
            definition: find(DEFINITION),
            parent: find(PARENT),
            curation_status: find(CURATION_STATUS),
            sub_ontology: find(SUB_ONTOLOGY),
            reviewer: find(REVIEWER),
            relations,
        }
    }

    /// `ID`, `Label`, `Definition` and `Parent` are all present.
    pub fn has_core_fields(&self) -> bool {
        self.id.is_some() && self.label.is_some() && self.definition.is_some() && self.parent.is_some()
    }

    pub fn id<'r>(&self, row: &'r [String]) -> Option<&'r str> {
        non_blank(row, self.id)
    }

    pub fn label<'r>(&self, row: &'r [String]) -> Option<&'r str> {
        non_blank(row, self.label)
    }

    pub fn definition<'r>(&self, row: &'r [String]) -> Option<&'r str> {
        non_blank(row, self.definition)
    }

    /// Parent label with bracketed annotations removed.
    pub fn parent_label(&self, row: &[String]) -> Option<String> {
        let parent = strip_bracketed(non_blank(row, self.parent)?);
        (!parent.is_empty()).then_some(parent)
    }

    pub fn curation_status<'r>(&self, row: &'r [String]) -> Option<&'r str> {
        non_blank(row, self.curation_status)
    }

    pub fn reviewer<'r>(&self, row: &'r [String]) -> Option<&'r str> {
        non_blank(row, self.reviewer)
    }

    pub fn is_obsolete(&self, row: &[String]) -> bool {
        self.curation_status(row) == Some(STATUS_OBSOLETE)
    }

    /// Alignment key column: `ID` when present, else `Label`.
    pub fn key_column(&self) -> Option<usize> {
        self.id.or(self.label)
    }

    /// Targets listed in a relation cell, split on `;`.
    pub fn relation_targets<'r>(&self, row: &'r [String], column: &RelationColumn) -> Vec<&'r str> {
        row.get(column.index)
            .map(|cell| {
                cell.split(';')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
