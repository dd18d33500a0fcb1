//! Service configuration.
//!
//! Loaded with the following priority:
//! 1. Environment variables (highest priority)
//! 2. An explicit config file, or `./ontocurate.toml`
//! 3. Built-in defaults (lowest priority)
//!
//! ```toml
//! release_dir = "releases"
//! digit_count = 7
//!
//! [prefixes]
//! BFO = "http://purl.obolibrary.org/obo/BFO_"
//!
//! [[repos]]
//! key = "addicto"
//! github = "addicto-org/addiction-ontology"
//! release_file = "addicto.owl"
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ontocurate_release::{
    AnnotationProperties, PrefixMap, ReleaseLocation, IAO_ALTERNATIVE_TERM, IAO_DEFINITION,
    RDFS_LABEL,
};
use ontocurate_storage::DEFAULT_DIGIT_COUNT;

pub const DEFAULT_CONFIG_FILE: &str = "ontocurate.toml";
pub const DEFAULT_RELEASE_DIR: &str = "releases";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// When a cached release is re-ingested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPolicy {
    /// At most once per calendar day.
    #[default]
    Daily,
    /// Only on explicit `ingest_release`.
    Manual,
}

/// Where release files come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `<release_dir>/<release_file>`.
    #[default]
    File,
    /// Raw file from the repository's default branch (feature `http`).
    Github,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub key: String,
    /// `owner/name`.
    pub github: String,
    pub release_file: String,
    /// Identifier prefix; the upper-cased key when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_prefix: Option<String>,
    /// Zero-padding width override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digit_count: Option<usize>,
}

impl RepoConfig {
    pub fn id_prefix(&self) -> String {
        self.id_prefix
            .clone()
            .unwrap_or_else(|| self.key.to_uppercase())
    }

    pub fn location(&self) -> ReleaseLocation {
        ReleaseLocation {
            github: self.github.clone(),
            release_file: self.release_file.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceKind,
    pub release_dir: PathBuf,
    /// JSON snapshot of the text index; in-memory only when absent.
    pub index_path: Option<PathBuf>,
    pub digit_count: usize,
    pub refresh: RefreshPolicy,
    pub label_annotation: String,
    pub definition_annotation: String,
    pub synonym_annotation: String,
    /// CURIE prefix -> IRI expansion, applied to every release.
    pub prefixes: BTreeMap<String, String>,
    pub repos: Vec<RepoConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            release_dir: PathBuf::from(DEFAULT_RELEASE_DIR),
            index_path: None,
            digit_count: DEFAULT_DIGIT_COUNT,
            refresh: RefreshPolicy::default(),
            label_annotation: RDFS_LABEL.to_string(),
            definition_annotation: IAO_DEFINITION.to_string(),
            synonym_annotation: IAO_ALTERNATIVE_TERM.to_string(),
            prefixes: BTreeMap::new(),
            repos: Vec::new(),
        }
    }
}

impl Config {
    /// Load from `path`, else `./ontocurate.toml`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_file(DEFAULT_CONFIG_FILE);
        }
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse without environment overrides.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("ONTOCURATE_RELEASE_DIR") {
            self.release_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("ONTOCURATE_INDEX_PATH") {
            self.index_path = Some(PathBuf::from(path));
        }
        if let Ok(count) = std::env::var("ONTOCURATE_DIGIT_COUNT") {
            match count.parse() {
                Ok(n) => self.digit_count = n,
                Err(_) => tracing::warn!(value = %count, "ignoring non-numeric ONTOCURATE_DIGIT_COUNT"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.digit_count == 0 {
            return Err(ConfigError::Invalid("digit_count must be positive".into()));
        }
        let mut seen = HashSet::new();
        for repo in &self.repos {
            if repo.key.trim().is_empty() {
                return Err(ConfigError::Invalid("repository with an empty key".into()));
            }
            if !seen.insert(repo.key.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate repository `{}`", repo.key)));
            }
            if repo.digit_count == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "repository `{}`: digit_count must be positive",
                    repo.key
                )));
            }
        }
        Ok(())
    }

    pub fn repo(&self, key: &str) -> Option<&RepoConfig> {
        self.repos.iter().find(|r| r.key == key)
    }

    pub fn prefix_map(&self) -> PrefixMap {
        let mut map = PrefixMap::new();
        for (prefix, expansion) in &self.prefixes {
            map.insert(prefix.clone(), expansion.clone());
        }
        map
    }

    pub fn annotation_properties(&self) -> AnnotationProperties {
        AnnotationProperties {
            label: self.label_annotation.clone(),
            definition: self.definition_annotation.clone(),
            synonym: self.synonym_annotation.clone(),
        }
    }

    pub fn release_locations(&self) -> HashMap<String, ReleaseLocation> {
        self.repos
            .iter()
            .map(|r| (r.key.clone(), r.location()))
            .collect()
    }

    /// Default config file content.
    pub fn default_config_string() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}
