//! Closure computation for visualisation and impact analysis.
//!
//! A closure starts from seed identifiers and collects, in first-seen order:
//!
//! ```text
//!   seed
//!   seed's parent (sheet rows only, via the label index)
//!   superclasses of the seed from the release (selection / id-list only)
//!   everything below the seed, following both
//!     - release subclass edges (formal ontology), and
//!     - graph out-edges (overlay relations not yet released)
//! ```
//!
//! Descent alternates freely between the two sources, so the result is closed
//! under both. An identifier unknown to one source contributes nothing from
//! that source; it is never an error.

use std::collections::{HashSet, VecDeque};

use ontocurate_release::OntologyRelease;
use ontocurate_table::{Table, TableSchema};

use crate::store::{canonical_id, normalize_id, GraphStore, Subgraph};

/// Curation-status restriction on which rows may seed a closure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    AnyOf(Vec<String>),
}

impl StatusFilter {
    pub fn single(status: impl Into<String>) -> Self {
        StatusFilter::AnyOf(vec![status.into()])
    }

    pub fn any_of<I, S>(statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StatusFilter::AnyOf(statuses.into_iter().map(Into::into).collect())
    }

    pub fn admits(&self, status: Option<&str>) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::AnyOf(allowed) => {
                status.is_some_and(|s| allowed.iter().any(|a| a.trim() == s))
            }
        }
    }
}

#[derive(Debug, Default)]
struct OrderedIds {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedIds {
    fn push(&mut self, id: &str) -> bool {
        let key = normalize_id(id);
        if self.seen.insert(key.clone()) {
            self.items.push(key);
            true
        } else {
            false
        }
    }
}

pub struct ClosureEngine<'a> {
    graph: &'a GraphStore,
    release: Option<&'a OntologyRelease>,
}

impl<'a> ClosureEngine<'a> {
    pub fn new(graph: &'a GraphStore, release: Option<&'a OntologyRelease>) -> Self {
        Self { graph, release }
    }

    fn release_children(&self, key: &str) -> Vec<String> {
        let Some(release) = self.release else {
            return Vec::new();
        };
        let Some(iri) = release.iri_for_id(&canonical_id(key)) else {
            return Vec::new();
        };
        release
            .subclasses(&iri)
            .iter()
            .filter_map(|child| release.id_for_iri(child))
            .collect()
    }

    fn release_superclasses(&self, key: &str) -> Vec<String> {
        let Some(release) = self.release else {
            return Vec::new();
        };
        let Some(iri) = release.iri_for_id(&canonical_id(key)) else {
            return Vec::new();
        };
        release
            .superclasses(&iri)
            .iter()
            .filter_map(|sup| release.id_for_iri(sup))
            .collect()
    }

    /// Add `seed` and everything below it.
    fn descend(&self, out: &mut OrderedIds, seed: &str) {
        out.push(seed);
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([normalize_id(seed)]);
        while let Some(key) = queue.pop_front() {
            if !visited.insert(key.clone()) {
                continue;
            }
            let from_graph = self.graph.successors(&key).unwrap_or_else(|| {
                tracing::trace!(id = %key, "not in graph, no graph descendants");
                Vec::new()
            });
            for child in self.release_children(&key).into_iter().chain(from_graph) {
                let child = normalize_id(&child);
                out.push(&child);
                if !visited.contains(&child) {
                    queue.push_back(child);
                }
            }
        }
    }

    fn expand(&self, out: &mut OrderedIds, seed: &str, parent: Option<&str>, with_superclasses: bool) {
        out.push(seed);
        if let Some(parent) = parent {
            out.push(parent);
        }
        if with_superclasses {
            for sup in self.release_superclasses(&normalize_id(seed)) {
                out.push(&sup);
            }
        }
        self.descend(out, seed);
    }

    fn row_seed(
        &self,
        schema: &TableSchema,
        cells: &[String],
        filter: &StatusFilter,
    ) -> Option<(String, Option<String>)> {
        if schema.is_obsolete(cells) {
            tracing::debug!(id = ?schema.id(cells), "obsolete row excluded from closure seeds");
            return None;
        }
        if !filter.admits(schema.curation_status(cells)) {
            return None;
        }
        let id = schema.id(cells)?.to_string();
        let parent = schema
            .parent_label(cells)
            .and_then(|p| self.graph.resolve_label(&p).map(str::to_string));
        Some((id, parent))
    }

    /// Closure seeded by every eligible row of a sheet.
    pub fn for_table(&self, table: &Table, filter: &StatusFilter) -> Vec<String> {
        let schema = table.schema();
        let mut out = OrderedIds::default();
        for cells in table.rows() {
            if let Some((id, parent)) = self.row_seed(&schema, cells, filter) {
                self.expand(&mut out, &id, parent.as_deref(), false);
            }
        }
        out.items
    }

    /// Closure seeded by the selected rows of a sheet.
    pub fn for_selection(&self, table: &Table, selected: &[usize], filter: &StatusFilter) -> Vec<String> {
        let schema = table.schema();
        let mut out = OrderedIds::default();
        for &row in selected {
            let Some(cells) = table.rows().get(row) else {
                tracing::warn!(row, rows = table.len(), "selected row out of range");
                continue;
            };
            if let Some((id, parent)) = self.row_seed(&schema, cells, filter) {
                self.expand(&mut out, &id, parent.as_deref(), true);
            }
        }
        out.items
    }

    /// Closure of a plain identifier list (cross-sheet visualisation).
    pub fn for_ids(&self, ids: &[String]) -> Vec<String> {
        let mut out = OrderedIds::default();
        for id in ids.iter().filter(|id| !id.trim().is_empty()) {
            self.expand(&mut out, id, None, true);
        }
        out.items
    }

    /// Seeds plus everything below them. Idempotent.
    pub fn descendant_closure(&self, seeds: &[String]) -> Vec<String> {
        let mut out = OrderedIds::default();
        for seed in seeds.iter().filter(|id| !id.trim().is_empty()) {
            self.descend(&mut out, seed);
        }
        out.items
    }

    pub fn subgraph(&self, ids: &[String]) -> Subgraph {
        self.graph.induced_subgraph(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RelationEdge;

    fn graph() -> GraphStore {
        let mut g = GraphStore::new("addicto");
        for (id, label) in [
            ("A:1", "behaviour"),
            ("A:2", "smoking"),
            ("A:3", "cigar smoking"),
            ("A:4", "vaping"),
        ] {
            g.insert_node(id, label);
            g.register_label(label, id);
        }
        g.add_edge("A:1", "A:2", RelationEdge::subclass());
        g.add_edge("A:2", "A:3", RelationEdge::subclass());
        g.add_edge("A:1", "A:4", RelationEdge::subclass());
        g
    }

    fn sheet(rows: &[[&str; 4]]) -> Table {
        Table::from_rows(
            vec!["ID".into(), "Label".into(), "Parent".into(), "Curation status".into()],
            rows.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn selection_includes_seed_parent_and_descendants() {
        let g = graph();
        let engine = ClosureEngine::new(&g, None);
        let t = sheet(&[["A:2", "smoking", "behaviour", "Published"]]);
        assert_eq!(engine.for_selection(&t, &[0], &StatusFilter::All), vec!["A_2", "A_1", "A_3"]);
    }

    #[test]
    fn obsolete_rows_do_not_seed_but_can_be_reached() {
        let g = graph();
        let engine = ClosureEngine::new(&g, None);
        let t = sheet(&[
            ["A:1", "behaviour", "", "Published"],
            ["A:3", "cigar smoking", "smoking", "Obsolete"],
        ]);
        let ids = engine.for_table(&t, &StatusFilter::All);
        assert!(ids.contains(&"A_3".to_string()));
        assert_eq!(engine.for_selection(&t, &[1], &StatusFilter::All), Vec::<String>::new());
    }

    #[test]
    fn status_filter_accepts_single_value_or_list() {
        let g = graph();
        let engine = ClosureEngine::new(&g, None);
        let t = sheet(&[
            ["A:3", "cigar smoking", "", "Published"],
            ["A:4", "vaping", "", "Proposed"],
        ]);
        assert_eq!(engine.for_table(&t, &StatusFilter::single("Proposed")), vec!["A_4"]);
        let both = StatusFilter::any_of(["Proposed", "Published"]);
        assert_eq!(engine.for_table(&t, &both), vec!["A_3", "A_4"]);
    }

    #[test]
    fn unknown_ids_are_kept_as_seeds_without_failing() {
        let g = graph();
        let engine = ClosureEngine::new(&g, None);
        let ids = engine.for_ids(&["Z:9".to_string(), "A:2".to_string()]);
        assert_eq!(ids, vec!["Z_9", "A_2", "A_3"]);
        // The induced subgraph just leaves the unknown seed out.
        assert_eq!(engine.subgraph(&ids).nodes.len(), 2);
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let g = graph();
        let engine = ClosureEngine::new(&g, None);
        let t = sheet(&[["A:4", "vaping", "", ""]]);
        assert_eq!(engine.for_selection(&t, &[0, 7], &StatusFilter::All), vec!["A_4"]);
    }
}
