//! The repository-keyed coordinating service.
//!
//! Each configured repository owns one [`RepoState`] (release, graph, refresh
//! date) behind its own lock; nothing is shared across repositories except
//! the identifier allocator and the text index, which are serialized by the
//! storage crate's `StoreLock`.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use ontocurate_graph::{
    ingest_ontology, ingest_overlay, render_dot, ClassMetadata, ClosureEngine, GraphStats,
    GraphStore, IngestReport, MetadataResolver, StatusFilter, Subgraph,
};
use ontocurate_release::{load_release, FileOntologySource, OntologyRelease, OntologySource};
use ontocurate_storage::{
    FastCache, IdentifierAllocator, IndexDocument, IndexUpdateQueue, MemoryCache, MemoryTextIndex,
    SearchQuery, SheetUpdate, StoreLock, TextIndex,
};
use ontocurate_table::schema::ROW_SEQUENCE;
use ontocurate_table::{validate, ReconcileOutcome, Table, ValidationReport};

use crate::config::{Config, RefreshPolicy, SourceKind};
use crate::ServiceError;

/// A closure ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    /// Closure identifiers in first-seen order (graph key form).
    pub ids: Vec<String>,
    pub subgraph: Subgraph,
    pub dot: String,
}

struct RepoState {
    release: Option<Arc<OntologyRelease>>,
    graph: GraphStore,
    refreshed_on: Option<NaiveDate>,
}

impl RepoState {
    fn new(repo: &str) -> Self {
        Self {
            release: None,
            graph: GraphStore::new(repo),
            refreshed_on: None,
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct CurationService {
    config: Config,
    source: Arc<dyn OntologySource>,
    index: Arc<dyn TextIndex>,
    allocator: IdentifierAllocator,
    updates: IndexUpdateQueue,
    repos: DashMap<String, Arc<Mutex<RepoState>>>,
}

impl CurationService {
    pub fn new(
        config: Config,
        source: Arc<dyn OntologySource>,
        index: Arc<dyn TextIndex>,
        cache: Arc<dyn FastCache>,
    ) -> Result<Self, ServiceError> {
        let mut allocator = IdentifierAllocator::new(index.clone(), cache, StoreLock::new())
            .with_default_digits(config.digit_count);
        for repo in &config.repos {
            allocator = allocator.with_repo(&repo.key, &repo.id_prefix(), repo.digit_count);
        }
        let updates = IndexUpdateQueue::spawn(index.clone(), allocator.lock().clone())?;
        Ok(Self {
            config,
            source,
            index,
            allocator,
            updates,
            repos: DashMap::new(),
        })
    }

    /// Service with the sources and backends named by `config`.
    pub fn from_config(config: Config) -> Result<Self, ServiceError> {
        let source: Arc<dyn OntologySource> = match config.source {
            SourceKind::File => Arc::new(FileOntologySource::new(
                config.release_dir.clone(),
                config.release_locations(),
            )),
            #[cfg(feature = "http")]
            SourceKind::Github => Arc::new(
                ontocurate_release::HttpOntologySource::new(config.release_locations())
                    .map_err(|source| ServiceError::Release {
                        repo: "*".to_string(),
                        source,
                    })?,
            ),
            #[cfg(not(feature = "http"))]
            SourceKind::Github => {
                return Err(crate::config::ConfigError::Invalid(
                    "source = \"github\" needs the `http` feature".to_string(),
                )
                .into())
            }
        };
        let index: Arc<dyn TextIndex> = match &config.index_path {
            Some(path) => Arc::new(MemoryTextIndex::open(path.clone())?),
            None => Arc::new(MemoryTextIndex::new()),
        };
        Self::new(config, source, index, Arc::new(MemoryCache::new()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn state(&self, repo: &str) -> Result<Arc<Mutex<RepoState>>, ServiceError> {
        if self.config.repo(repo).is_none() {
            return Err(ServiceError::UnknownRepo(repo.to_string()));
        }
        Ok(self
            .repos
            .entry(repo.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(RepoState::new(repo))))
            .value()
            .clone())
    }

    // ========================================================================
    // Release refresh
    // ========================================================================

    fn refresh_locked(
        &self,
        repo: &str,
        state: &mut RepoState,
        day: NaiveDate,
    ) -> Result<IngestReport, ServiceError> {
        let release = match load_release(self.source.as_ref(), repo, self.config.prefix_map()) {
            Ok(release) => release,
            Err(source) => {
                tracing::warn!(
                    repo = %repo,
                    error = %source,
                    keeping_previous = state.release.is_some(),
                    "release refresh failed"
                );
                return Err(ServiceError::Release {
                    repo: repo.to_string(),
                    source,
                });
            }
        };
        let mut graph = GraphStore::new(repo);
        let report = ingest_ontology(&mut graph, &release, &self.config.label_annotation);
        state.release = Some(Arc::new(release));
        state.graph = graph;
        state.refreshed_on = Some(day);
        tracing::info!(repo = %repo, day = %day, nodes = report.nodes_added, "release refreshed");
        Ok(report)
    }

    fn ensure_current(&self, repo: &str, state: &mut RepoState, day: NaiveDate) -> Result<bool, ServiceError> {
        let stale = match (state.refreshed_on, self.config.refresh) {
            (None, _) => true,
            (Some(last), RefreshPolicy::Daily) => last < day,
            (Some(_), RefreshPolicy::Manual) => false,
        };
        if !stale {
            return Ok(false);
        }
        match self.refresh_locked(repo, state, day) {
            Ok(_) => Ok(true),
            // The previous graph stays usable until a refresh succeeds.
            Err(_) if state.release.is_some() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Fetch, parse and ingest the release of `repo`, replacing its graph.
    ///
    /// On failure the previous graph, if any, is kept.
    pub fn ingest_release(&self, repo: &str) -> Result<IngestReport, ServiceError> {
        let state = self.state(repo)?;
        let mut state = state.lock();
        self.refresh_locked(repo, &mut state, today())
    }

    /// Re-ingest when the cached release is older than `day`. Returns whether
    /// a refresh happened.
    pub fn refresh_if_stale(&self, repo: &str, day: NaiveDate) -> Result<bool, ServiceError> {
        let state = self.state(repo)?;
        let mut state = state.lock();
        self.ensure_current(repo, &mut state, day)
    }

    pub fn graph_stats(&self, repo: &str) -> Result<GraphStats, ServiceError> {
        let state = self.state(repo)?;
        let state = state.lock();
        Ok(state.graph.stats())
    }

    // ========================================================================
    // Graph operations
    // ========================================================================

    /// Merge editor rows into the repository graph.
    pub fn apply_overlay(&self, repo: &str, table: &Table) -> Result<IngestReport, ServiceError> {
        let state = self.state(repo)?;
        let mut state = state.lock();
        self.ensure_current(repo, &mut state, today())?;
        Ok(ingest_overlay(&mut state.graph, &table.without_column(ROW_SEQUENCE)))
    }

    fn view(repo: &str, engine: &ClosureEngine<'_>, ids: Vec<String>) -> GraphView {
        let subgraph = engine.subgraph(&ids);
        let dot = render_dot(repo, &subgraph);
        GraphView { ids, subgraph, dot }
    }

    /// Closure of an identifier list, with superclasses.
    pub fn closure(&self, repo: &str, ids: &[String]) -> Result<GraphView, ServiceError> {
        let state = self.state(repo)?;
        let mut state = state.lock();
        self.ensure_current(repo, &mut state, today())?;
        let engine = ClosureEngine::new(&state.graph, state.release.as_deref());
        let closure = engine.for_ids(ids);
        Ok(Self::view(repo, &engine, closure))
    }

    /// Closure of every eligible row of `table`, after overlaying it.
    pub fn closure_for_table(
        &self,
        repo: &str,
        table: &Table,
        filter: &StatusFilter,
    ) -> Result<GraphView, ServiceError> {
        let table = table.without_column(ROW_SEQUENCE);
        let state = self.state(repo)?;
        let mut state = state.lock();
        self.ensure_current(repo, &mut state, today())?;
        ingest_overlay(&mut state.graph, &table);
        let engine = ClosureEngine::new(&state.graph, state.release.as_deref());
        let closure = engine.for_table(&table, filter);
        Ok(Self::view(repo, &engine, closure))
    }

    /// Closure of the selected rows of `table`, after overlaying it.
    pub fn closure_for_selection(
        &self,
        repo: &str,
        table: &Table,
        rows: &[usize],
        filter: &StatusFilter,
    ) -> Result<GraphView, ServiceError> {
        let table = table.without_column(ROW_SEQUENCE);
        let state = self.state(repo)?;
        let mut state = state.lock();
        self.ensure_current(repo, &mut state, today())?;
        ingest_overlay(&mut state.graph, &table);
        let engine = ClosureEngine::new(&state.graph, state.release.as_deref());
        let closure = engine.for_selection(&table, rows, filter);
        Ok(Self::view(repo, &engine, closure))
    }

    fn current_release(&self, repo: &str) -> Result<Arc<OntologyRelease>, ServiceError> {
        let state = self.state(repo)?;
        let mut state = state.lock();
        self.ensure_current(repo, &mut state, today())?;
        state
            .release
            .clone()
            .ok_or_else(|| ServiceError::NoRelease(repo.to_string()))
    }

    pub fn metadata(&self, repo: &str, ids: &[String]) -> Result<Vec<ClassMetadata>, ServiceError> {
        let release = self.current_release(repo)?;
        let properties = self.config.annotation_properties();
        Ok(MetadataResolver::new(&release, &properties).resolve(ids))
    }

    /// Every class label in the release, sorted and deduplicated.
    pub fn release_labels(&self, repo: &str) -> Result<Vec<String>, ServiceError> {
        let release = self.current_release(repo)?;
        let labels: BTreeSet<String> = release
            .labels(&self.config.label_annotation)
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Ok(labels.into_iter().collect())
    }

    // ========================================================================
    // Identifiers, index and tables
    // ========================================================================

    pub fn next_identifier(&self, repo: &str) -> Result<String, ServiceError> {
        self.state(repo)?;
        Ok(self.allocator.next_identifier(repo)?)
    }

    pub fn next_identifiers(&self, repo: &str, count: usize) -> Result<Vec<String>, ServiceError> {
        self.state(repo)?;
        Ok(self.allocator.next_identifiers(repo, count)?)
    }

    pub fn search(&self, query: &SearchQuery) -> Result<Vec<IndexDocument>, ServiceError> {
        self.state(&query.repo)?;
        Ok(self.index.search(query)?)
    }

    /// Queue a re-index of one sheet. Runs after every update queued before it.
    pub fn enqueue_index_update(&self, update: SheetUpdate) -> Result<(), ServiceError> {
        self.state(&update.repo)?;
        Ok(self.updates.enqueue(update)?)
    }

    /// Three-way reconciliation of editor tables, normalized first (row-sequence
    /// column dropped, rows sorted by label).
    pub fn reconcile(&self, base: &Table, server: &Table, local: &Table) -> ReconcileOutcome {
        ontocurate_table::reconcile(
            &base.normalized_for_diff(),
            &server.normalized_for_diff(),
            &local.normalized_for_diff(),
        )
    }

    /// [`Self::reconcile`] over editor records sharing `header`.
    pub fn reconcile_records(
        &self,
        header: &[String],
        base: &[Value],
        server: &[Value],
        local: &[Value],
    ) -> Result<ReconcileOutcome, ServiceError> {
        let base = Table::from_records(header, base)?;
        let server = Table::from_records(header, server)?;
        let local = Table::from_records(header, local)?;
        Ok(self.reconcile(&base, &server, &local))
    }

    pub fn validate(&self, table: &Table) -> ValidationReport {
        validate(&table.without_column(ROW_SEQUENCE))
    }

    /// Finish queued index updates.
    pub fn shutdown(self) {
        self.updates.shutdown();
    }
}
