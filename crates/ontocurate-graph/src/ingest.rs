//! Populating a [`GraphStore`] from a release and from sheet rows.
//!
//! Both ingestors run in two passes: first nodes (and the label index), then
//! edges, so edges may refer to nodes registered later in the input. A
//! resolution miss never creates a partial node; it is logged and reported.

use serde::Serialize;

use ontocurate_release::OntologyRelease;
use ontocurate_table::Table;

use crate::store::{normalize_id, GraphStore, RelationEdge};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Class IRI outside every known prefix.
    NoIdentifier { iri: String },
    /// Class without a label annotation.
    NoLabel { iri: String },
    /// Superclass or parent label not in the label index.
    UnresolvedParent { class: String, parent: String },
    /// Relation target label not in the label index.
    UnresolvedTarget {
        class: String,
        relation: String,
        target: String,
    },
    /// Sheet lacks one of `ID`, `Label`, `Definition`, `Parent`.
    MissingColumns,
    /// Sheet row with a blank `ID`.
    BlankId { row: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub nodes_added: usize,
    pub nodes_replaced: usize,
    pub edges_added: usize,
    pub skipped: Vec<SkipReason>,
}

impl IngestReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Load every labelled class of `release` into `graph`, then subclass and
/// `SomeValuesFrom` relation edges between registered classes.
pub fn ingest_ontology(
    graph: &mut GraphStore,
    release: &OntologyRelease,
    label_property: &str,
) -> IngestReport {
    let mut report = IngestReport::default();
    let label_of = |iri: &str| {
        release
            .annotation(iri, label_property)
            .map(str::trim)
            .filter(|l| !l.is_empty())
    };

    for iri in release.classes() {
        let Some(id) = release.id_for_iri(iri) else {
            tracing::warn!(repo = %graph.repo(), iri = %iri, "could not determine ID for class");
            report.skipped.push(SkipReason::NoIdentifier { iri: iri.clone() });
            continue;
        };
        if graph.contains(&id) {
            continue;
        }
        let Some(label) = label_of(iri) else {
            tracing::warn!(repo = %graph.repo(), iri = %iri, "could not determine label for class");
            report.skipped.push(SkipReason::NoLabel { iri: iri.clone() });
            continue;
        };
        graph.register_label(label, &id);
        if graph.insert_node(&id, label) {
            report.nodes_added += 1;
        }
    }

    for iri in release.classes() {
        let Some(id) = release.id_for_iri(iri) else {
            continue;
        };

        for parent in release.superclasses(iri) {
            let resolved = label_of(parent).and_then(|l| graph.resolve_label(l).map(str::to_string));
            match resolved {
                Some(parent_key) => {
                    if graph.add_edge(&parent_key, &id, RelationEdge::subclass()) {
                        report.edges_added += 1;
                    }
                }
                None => {
                    report.skipped.push(SkipReason::UnresolvedParent {
                        class: normalize_id(&id),
                        parent: parent.clone(),
                    });
                }
            }
        }

        for axiom in release.axioms(iri) {
            let Some((property, filler)) = axiom.some_values_from() else {
                continue;
            };
            let relation = label_of(property)
                .map(str::to_string)
                .or_else(|| release.id_for_iri(property))
                .unwrap_or_else(|| property.to_string());
            let target = label_of(filler).and_then(|l| graph.resolve_label(l).map(str::to_string));
            match target {
                Some(target_key) => {
                    if graph.add_edge(&id, &target_key, RelationEdge::relation(&relation)) {
                        report.edges_added += 1;
                    }
                }
                None => {
                    tracing::debug!(class = %id, relation = %relation, target = %filler, "relation target not registered");
                    report.skipped.push(SkipReason::UnresolvedTarget {
                        class: normalize_id(&id),
                        relation,
                        target: filler.to_string(),
                    });
                }
            }
        }
    }

    tracing::info!(
        repo = %graph.repo(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        skipped = report.skipped.len(),
        "ingested ontology release"
    );
    report
}

/// Merge sheet rows into `graph`, replacing nodes the rows describe.
///
/// Re-running with the same table leaves node and edge counts unchanged.
pub fn ingest_overlay(graph: &mut GraphStore, table: &Table) -> IngestReport {
    let mut report = IngestReport::default();
    let schema = table.schema();
    if !schema.has_core_fields() {
        tracing::debug!(repo = %graph.repo(), "sheet lacks ID/Label/Definition/Parent, overlay skipped");
        report.skipped.push(SkipReason::MissingColumns);
        return report;
    }

    for (i, row) in table.rows().iter().enumerate() {
        let Some(id) = schema.id(row) else {
            report.skipped.push(SkipReason::BlankId { row: i });
            continue;
        };
        let label = schema.label(row).unwrap_or(id);
        if schema.label(row).is_some() {
            graph.register_label(label, id);
        }
        if graph.contains(id) {
            report.nodes_replaced += 1;
        } else {
            report.nodes_added += 1;
        }
        graph.upsert_node(id, label);
    }

    for row in table.rows() {
        let Some(id) = schema.id(row) else {
            continue;
        };

        if let Some(parent) = schema.parent_label(row) {
            match graph.resolve_label(&parent).map(str::to_string) {
                Some(parent_key) => {
                    if graph.add_edge(&parent_key, id, RelationEdge::subclass()) {
                        report.edges_added += 1;
                    }
                }
                None => report.skipped.push(SkipReason::UnresolvedParent {
                    class: normalize_id(id),
                    parent,
                }),
            }
        }

        for column in &schema.relations {
            for target in schema.relation_targets(row, column) {
                match graph.resolve_label(target).map(str::to_string) {
                    Some(target_key) => {
                        if graph.add_edge(id, &target_key, RelationEdge::relation(&column.relation)) {
                            report.edges_added += 1;
                        }
                    }
                    None => report.skipped.push(SkipReason::UnresolvedTarget {
                        class: normalize_id(id),
                        relation: column.relation.clone(),
                        target: target.to_string(),
                    }),
                }
            }
        }
    }

    tracing::debug!(
        repo = %graph.repo(),
        added = report.nodes_added,
        replaced = report.nodes_replaced,
        edges = report.edges_added,
        "applied sheet overlay"
    );
    report
}
