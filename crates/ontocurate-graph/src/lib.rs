//! Ontology graphs for curation.
//!
//! One [`GraphStore`] per repository holds the classes of the published
//! release plus whatever the curators' sheets add on top:
//!
//! ```text
//!   OntologyRelease ──ingest_ontology──▶ GraphStore ◀──ingest_overlay── sheet Table
//!                                            │
//!                                   ClosureEngine (+ release)
//!                                            │
//!                                  induced Subgraph ──▶ render_dot
//! ```
//!
//! [`MetadataResolver`] answers label/definition/synonym lookups straight
//! from the release.

pub mod closure;
pub mod dot;
pub mod ingest;
pub mod metadata;
pub mod store;

pub use closure::{ClosureEngine, StatusFilter};
pub use dot::render_dot;
pub use ingest::{ingest_ontology, ingest_overlay, IngestReport, SkipReason};
pub use metadata::{ClassMetadata, MetadataResolver};
pub use store::{
    canonical_id, normalize_id, ClassNode, GraphStats, GraphStore, RelationEdge, RelationKind,
    Subgraph,
};
