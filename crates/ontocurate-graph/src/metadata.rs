//! Label, definition and synonyms of classes, read from the release.

use serde::Serialize;

use ontocurate_release::{AnnotationProperties, OntologyRelease};

use crate::store::canonical_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassMetadata {
    pub id: String,
    pub label: String,
    pub definition: String,
    pub synonyms: Vec<String>,
}

/// Commas and quotes break the editor's comma-separated tooltips.
fn sanitize(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, ',' | '\'' | '"')).collect()
}

pub struct MetadataResolver<'a> {
    release: &'a OntologyRelease,
    properties: &'a AnnotationProperties,
}

impl<'a> MetadataResolver<'a> {
    pub fn new(release: &'a OntologyRelease, properties: &'a AnnotationProperties) -> Self {
        Self {
            release,
            properties,
        }
    }

    /// Metadata for each resolvable identifier, in request order.
    ///
    /// Identifiers may be given as `ABC:123` or `ABC_123`; unknown ones are skipped.
    pub fn resolve(&self, ids: &[String]) -> Vec<ClassMetadata> {
        let mut out = Vec::new();
        for id in ids {
            let canonical = canonical_id(id);
            let Some(iri) = self.release.iri_for_id(&canonical) else {
                tracing::debug!(id = %id, "no class for identifier");
                continue;
            };
            out.push(ClassMetadata {
                id: canonical,
                label: self
                    .release
                    .annotation(&iri, &self.properties.label)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                definition: self
                    .release
                    .annotation(&iri, &self.properties.definition)
                    .map(sanitize)
                    .unwrap_or_default(),
                synonyms: self
                    .release
                    .annotation_values(&iri, &self.properties.synonym)
                    .iter()
                    .map(|s| sanitize(s))
                    .collect(),
            });
        }
        out
    }
}
