//! The per-repository graph.
//!
//! Nodes are keyed by the normalized identifier (`ABC:123` -> `ABC_123`).
//! Subclass edges run parent -> child and carry `back = true` so renderers
//! draw the arrow towards the parent; following outgoing edges therefore
//! walks down the hierarchy (and out along other relations).

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;

/// Graph key for an identifier.
pub fn normalize_id(id: &str) -> String {
    id.trim().replace(':', "_")
}

/// Canonical `PREFIX:local` form of a graph key.
pub fn canonical_id(key: &str) -> String {
    let key = key.trim();
    if key.contains(':') {
        key.to_string()
    } else {
        key.replacen('_', ":", 1)
    }
}

// ============================================================================
// Relations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RelationKind {
    Subclass,
    PartOf,
    Containment,
    Role,
    Aboutness,
    Participation,
    Other,
}

impl RelationKind {
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "has part" | "part of" => RelationKind::PartOf,
            "contains" => RelationKind::Containment,
            "has role" => RelationKind::Role,
            "is about" => RelationKind::Aboutness,
            "has participant" => RelationKind::Participation,
            _ => RelationKind::Other,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RelationKind::Subclass => "black",
            RelationKind::PartOf => "blue",
            RelationKind::Containment => "green",
            RelationKind::Role => "darkgreen",
            RelationKind::Aboutness => "darkgrey",
            RelationKind::Participation => "darkblue",
            RelationKind::Other => "orange",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassNode {
    pub key: String,
    pub label: String,
    /// Presentation attributes (`shape`, `style`, `fontname`).
    pub attrs: BTreeMap<String, String>,
}

impl ClassNode {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        let attrs = [("shape", "box"), ("style", "rounded"), ("fontname", "helvetica")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            key: key.into(),
            label: label.into(),
            attrs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationEdge {
    pub kind: RelationKind,
    /// Relation name shown on the edge; `None` for subclass edges.
    pub name: Option<String>,
    pub color: String,
    /// Rendered with `dir=back`.
    pub back: bool,
}

impl RelationEdge {
    pub fn subclass() -> Self {
        Self {
            kind: RelationKind::Subclass,
            name: None,
            color: RelationKind::Subclass.color().to_string(),
            back: true,
        }
    }

    pub fn relation(name: &str) -> Self {
        let kind = RelationKind::from_name(name);
        Self {
            kind,
            name: Some(name.to_string()),
            color: kind.color().to_string(),
            back: false,
        }
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
}

/// An induced subgraph: exactly the requested nodes that exist, and every
/// edge between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Subgraph {
    pub nodes: Vec<ClassNode>,
    pub edges: Vec<(String, String, RelationEdge)>,
}

#[derive(Debug)]
pub struct GraphStore {
    repo: String,
    graph: StableDiGraph<ClassNode, RelationEdge>,
    index: HashMap<String, NodeIndex>,
    labels: HashMap<String, String>,
}

impl GraphStore {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            graph: StableDiGraph::new(),
            index: HashMap::new(),
            labels: HashMap::new(),
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.graph.node_count(),
            edges: self.graph.edge_count(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(&normalize_id(id))
    }

    pub fn node(&self, id: &str) -> Option<&ClassNode> {
        let ix = self.index.get(&normalize_id(id))?;
        self.graph.node_weight(*ix)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ClassNode> {
        self.graph.node_indices().map(move |ix| &self.graph[ix])
    }

    /// Point `label` at `key`. Later registrations win.
    pub fn register_label(&mut self, label: &str, key: &str) {
        self.labels.insert(label.trim().to_string(), normalize_id(key));
    }

    pub fn resolve_label(&self, label: &str) -> Option<&str> {
        self.labels.get(label.trim()).map(String::as_str)
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Insert a node unless one with the same key exists. Returns whether it was inserted.
    pub fn insert_node(&mut self, id: &str, label: &str) -> bool {
        let key = normalize_id(id);
        if self.index.contains_key(&key) {
            return false;
        }
        let ix = self.graph.add_node(ClassNode::new(key.clone(), label.trim()));
        self.index.insert(key, ix);
        true
    }

    /// Replace a node (and drop its incident edges) or insert it fresh.
    pub fn upsert_node(&mut self, id: &str, label: &str) {
        let key = normalize_id(id);
        if let Some(ix) = self.index.remove(&key) {
            self.graph.remove_node(ix);
        }
        let ix = self.graph.add_node(ClassNode::new(key.clone(), label.trim()));
        self.index.insert(key, ix);
    }

    /// Add an edge between two existing nodes.
    ///
    /// Returns `false` when either endpoint is missing or an identical edge
    /// already exists.
    pub fn add_edge(&mut self, from: &str, to: &str, edge: RelationEdge) -> bool {
        let (Some(&a), Some(&b)) = (
            self.index.get(&normalize_id(from)),
            self.index.get(&normalize_id(to)),
        ) else {
            return false;
        };
        if self
            .graph
            .edges_directed(a, Direction::Outgoing)
            .any(|existing| existing.target() == b && *existing.weight() == edge)
        {
            return false;
        }
        self.graph.add_edge(a, b, edge);
        true
    }

    /// Direct successors along outgoing edges. `None` when `id` is not in the graph.
    pub fn successors(&self, id: &str) -> Option<Vec<String>> {
        let ix = *self.index.get(&normalize_id(id))?;
        let mut out: Vec<String> = Vec::new();
        for next in self.graph.neighbors_directed(ix, Direction::Outgoing) {
            let key = &self.graph[next].key;
            if !out.contains(key) {
                out.push(key.clone());
            }
        }
        Some(out)
    }

    /// Every node reachable along outgoing edges, excluding `id` itself.
    ///
    /// `None` when `id` is not in the graph.
    pub fn descendants(&self, id: &str) -> Option<Vec<String>> {
        let start = *self.index.get(&normalize_id(id))?;
        let mut seen: HashSet<NodeIndex> = HashSet::new();
        seen.insert(start);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(ix) = queue.pop_front() {
            for next in self.graph.neighbors_directed(ix, Direction::Outgoing) {
                if seen.insert(next) {
                    out.push(self.graph[next].key.clone());
                    queue.push_back(next);
                }
            }
        }
        Some(out)
    }

    pub fn induced_subgraph(&self, ids: &[String]) -> Subgraph {
        let mut members: Vec<NodeIndex> = Vec::new();
        let mut member_set: HashSet<NodeIndex> = HashSet::new();
        for id in ids {
            if let Some(&ix) = self.index.get(&normalize_id(id)) {
                if member_set.insert(ix) {
                    members.push(ix);
                }
            }
        }

        let nodes = members.iter().map(|ix| self.graph[*ix].clone()).collect();
        let mut edges = Vec::new();
        for &ix in &members {
            for e in self.graph.edges_directed(ix, Direction::Outgoing) {
                if member_set.contains(&e.target()) {
                    edges.push((
                        self.graph[ix].key.clone(),
                        self.graph[e.target()].key.clone(),
                        e.weight().clone(),
                    ));
                }
            }
        }
        Subgraph { nodes, edges }
    }
}
