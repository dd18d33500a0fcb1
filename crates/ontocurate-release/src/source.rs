//! Where release files come from.
//!
//! Sources are deliberately blocking: fetches happen on refresh and are
//! serialized per repository by the caller.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::rdf::RdfFormat;
use crate::ReleaseError;

/// GitHub coordinates of a repository's release file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseLocation {
    /// `owner/name` on GitHub.
    pub github: String,
    /// Path of the release file within the repository.
    pub release_file: String,
}

#[derive(Debug, Clone)]
pub struct FetchedRelease {
    pub locator: String,
    pub format: RdfFormat,
    pub bytes: Vec<u8>,
}

impl FetchedRelease {
    pub fn new(locator: impl Into<String>, bytes: Vec<u8>) -> Self {
        let locator = locator.into();
        let format = RdfFormat::from_file_name(&locator).unwrap_or_else(|| RdfFormat::sniff(&bytes));
        Self {
            locator,
            format,
            bytes,
        }
    }
}

pub trait OntologySource: Send + Sync {
    fn fetch(&self, repo: &str) -> Result<FetchedRelease, ReleaseError>;
}

// ============================================================================
// Local files
// ============================================================================

/// Reads `<root>/<release_file>` for each configured repository.
#[derive(Debug, Clone)]
pub struct FileOntologySource {
    root: PathBuf,
    locations: HashMap<String, ReleaseLocation>,
}

impl FileOntologySource {
    pub fn new(root: impl Into<PathBuf>, locations: HashMap<String, ReleaseLocation>) -> Self {
        Self {
            root: root.into(),
            locations,
        }
    }
}

impl OntologySource for FileOntologySource {
    fn fetch(&self, repo: &str) -> Result<FetchedRelease, ReleaseError> {
        let location = self
            .locations
            .get(repo)
            .ok_or_else(|| ReleaseError::UnknownRepo(repo.to_string()))?;
        let path = self.root.join(&location.release_file);
        let bytes = std::fs::read(&path).map_err(|source| ReleaseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(repo, path = %path.display(), bytes = bytes.len(), "read release file");
        Ok(FetchedRelease::new(path.display().to_string(), bytes))
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Fixed release documents, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticOntologySource {
    releases: HashMap<String, FetchedRelease>,
}

impl StaticOntologySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(mut self, repo: &str, locator: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.releases
            .insert(repo.to_string(), FetchedRelease::new(locator, bytes.into()));
        self
    }
}

impl OntologySource for StaticOntologySource {
    fn fetch(&self, repo: &str) -> Result<FetchedRelease, ReleaseError> {
        self.releases
            .get(repo)
            .cloned()
            .ok_or_else(|| ReleaseError::UnknownRepo(repo.to_string()))
    }
}

// ============================================================================
// GitHub raw content
// ============================================================================

#[cfg(feature = "http")]
pub const RAW_GITHUB_BASE: &str = "https://raw.githubusercontent.com";

#[cfg(feature = "http")]
pub struct HttpOntologySource {
    client: reqwest::blocking::Client,
    base_url: String,
    branch: String,
    locations: HashMap<String, ReleaseLocation>,
}

#[cfg(feature = "http")]
impl HttpOntologySource {
    pub fn new(locations: HashMap<String, ReleaseLocation>) -> Result<Self, ReleaseError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("ontocurate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReleaseError::Fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: RAW_GITHUB_BASE.to_string(),
            branch: "master".to_string(),
            locations,
        })
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn url_for(&self, location: &ReleaseLocation) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            location.github,
            self.branch,
            location.release_file.trim_start_matches('/')
        )
    }
}

#[cfg(feature = "http")]
impl OntologySource for HttpOntologySource {
    fn fetch(&self, repo: &str) -> Result<FetchedRelease, ReleaseError> {
        let location = self
            .locations
            .get(repo)
            .ok_or_else(|| ReleaseError::UnknownRepo(repo.to_string()))?;
        let url = self.url_for(location);
        let response = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ReleaseError::Fetch(format!("GET {url}: {e}")))?;
        let bytes = response
            .bytes()
            .map_err(|e| ReleaseError::Fetch(format!("reading body of {url}: {e}")))?;
        tracing::info!(repo, url = %url, bytes = bytes.len(), "fetched release");
        Ok(FetchedRelease::new(url, bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_source_reads_configured_release() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("addicto.nt"), b"").unwrap();

        let mut locations = HashMap::new();
        locations.insert(
            "addicto".to_string(),
            ReleaseLocation {
                github: "addicto-org/addiction-ontology".to_string(),
                release_file: "addicto.nt".to_string(),
            },
        );
        let source = FileOntologySource::new(dir.path(), locations);

        let fetched = source.fetch("addicto").unwrap();
        assert_eq!(fetched.format, RdfFormat::NTriples);
        assert!(matches!(
            source.fetch("bcio"),
            Err(ReleaseError::UnknownRepo(repo)) if repo == "bcio"
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut locations = HashMap::new();
        locations.insert(
            "bcio".to_string(),
            ReleaseLocation {
                github: "HumanBehaviourChangeProject/ontologies".to_string(),
                release_file: "bcio.owl".to_string(),
            },
        );
        let source = FileOntologySource::new(dir.path(), locations);
        assert!(matches!(source.fetch("bcio"), Err(ReleaseError::Io { .. })));
    }
}
