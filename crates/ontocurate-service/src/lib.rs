//! Ontocurate service: one coordinating registry over every configured
//! repository.
//!
//! ```text
//!   CurationService
//!     ├── repos: DashMap<key, Mutex<RepoState { release, graph, refreshed_on }>>
//!     ├── IdentifierAllocator ─┐
//!     ├── IndexUpdateQueue ────┴── StoreLock ── TextIndex / FastCache
//!     └── Config (ontocurate.toml + ONTOCURATE_* overrides)
//! ```
//!
//! Releases are re-ingested at most once per calendar day; editor tables are
//! overlaid on every graph request.

pub mod config;
pub mod save;
pub mod service;

pub use config::{Config, ConfigError, RefreshPolicy, RepoConfig, SourceKind};
pub use save::{PreparedSave, SaveDecision, SaveRequest, ServerSheet};
pub use service::{CurationService, GraphView};

use ontocurate_release::ReleaseError;
use ontocurate_storage::{AllocError, IndexError};
use ontocurate_table::TableError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("unknown repository `{0}`")]
    UnknownRepo(String),

    #[error("no release loaded for `{0}`")]
    NoRelease(String),

    #[error("release refresh for `{repo}` failed: {source}")]
    Release {
        repo: String,
        #[source]
        source: ReleaseError,
    },

    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
