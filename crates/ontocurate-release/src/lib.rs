//! Published ontology releases.
//!
//! A release is the authoritative OWL file of a repository. This crate parses
//! it (RDF/XML, Turtle or N-Triples via Sophia) into an [`OntologyRelease`]
//! offering the small set of queries the curation workflow needs: class
//! listing, identifier resolution, annotations, logical axioms, direct
//! superclasses and inferred descendants.

pub mod prefix;
mod rdf;
pub mod release;
pub mod source;

pub use prefix::{PrefixMap, OBO_BASE};
pub use rdf::RdfFormat;
pub use release::{
    Axiom, ClassExpression, OntologyRelease, IAO_ALTERNATIVE_TERM, IAO_DEFINITION, RDFS_LABEL,
};
#[cfg(feature = "http")]
pub use source::HttpOntologySource;
pub use source::{
    FetchedRelease, FileOntologySource, OntologySource, ReleaseLocation, StaticOntologySource,
};

/// Annotation properties used for a class's label, definition and synonyms.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnnotationProperties {
    pub label: String,
    pub definition: String,
    pub synonym: String,
}

impl Default for AnnotationProperties {
    fn default() -> Self {
        Self {
            label: RDFS_LABEL.to_string(),
            definition: IAO_DEFINITION.to_string(),
            synonym: IAO_ALTERNATIVE_TERM.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("no release configured for repository `{0}`")]
    UnknownRepo(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch release: {0}")]
    Fetch(String),

    #[error("{0}")]
    Parse(String),
}

/// Fetch the release for `repo` from `source` and parse it.
pub fn load_release(
    source: &dyn OntologySource,
    repo: &str,
    prefixes: PrefixMap,
) -> Result<OntologyRelease, ReleaseError> {
    let fetched = source.fetch(repo)?;
    OntologyRelease::parse_as(&fetched.bytes, fetched.format, prefixes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_NT: &str = r#"
<http://purl.obolibrary.org/obo/ADDICTO_0000001> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#Class> .
<http://purl.obolibrary.org/obo/ADDICTO_0000001> <http://www.w3.org/2000/01/rdf-schema#label> "behaviour"@en .
<http://purl.obolibrary.org/obo/ADDICTO_0000002> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#Class> .
<http://purl.obolibrary.org/obo/ADDICTO_0000002> <http://www.w3.org/2000/01/rdf-schema#label> "smoking" .
<http://purl.obolibrary.org/obo/ADDICTO_0000002> <http://purl.obolibrary.org/obo/IAO_0000115> "Inhaling tobacco smoke." .
<http://purl.obolibrary.org/obo/ADDICTO_0000002> <http://purl.obolibrary.org/obo/IAO_0000118> "tobacco use" .
<http://purl.obolibrary.org/obo/ADDICTO_0000002> <http://purl.obolibrary.org/obo/IAO_0000118> "cigarette smoking" .
<http://purl.obolibrary.org/obo/ADDICTO_0000002> <http://www.w3.org/2000/01/rdf-schema#subClassOf> <http://purl.obolibrary.org/obo/ADDICTO_0000001> .
<http://purl.obolibrary.org/obo/ADDICTO_0000003> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#Class> .
<http://purl.obolibrary.org/obo/ADDICTO_0000003> <http://www.w3.org/2000/01/rdf-schema#label> "cigar smoking" .
<http://purl.obolibrary.org/obo/ADDICTO_0000003> <http://www.w3.org/2000/01/rdf-schema#subClassOf> <http://purl.obolibrary.org/obo/ADDICTO_0000002> .
<http://purl.obolibrary.org/obo/ADDICTO_0000003> <http://www.w3.org/2000/01/rdf-schema#subClassOf> _:r1 .
_:r1 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#Restriction> .
_:r1 <http://www.w3.org/2002/07/owl#onProperty> <http://purl.obolibrary.org/obo/BFO_0000051> .
_:r1 <http://www.w3.org/2002/07/owl#someValuesFrom> <http://purl.obolibrary.org/obo/ADDICTO_0000004> .
<http://purl.obolibrary.org/obo/BFO_0000051> <http://www.w3.org/2000/01/rdf-schema#label> "has part" .
"#;

    fn sample() -> OntologyRelease {
        OntologyRelease::parse_as(SAMPLE_NT.as_bytes(), RdfFormat::NTriples, PrefixMap::new())
            .unwrap()
    }

    #[test]
    fn parses_classes_labels_and_annotations() {
        let release = sample();
        assert_eq!(release.classes().len(), 3);

        let smoking = release.iri_for_id("ADDICTO:0000002").unwrap();
        assert_eq!(release.annotation(&smoking, RDFS_LABEL), Some("smoking"));
        assert_eq!(
            release.annotation(&smoking, IAO_DEFINITION),
            Some("Inhaling tobacco smoke.")
        );
        assert_eq!(release.annotation_values(&smoking, IAO_ALTERNATIVE_TERM).len(), 2);
        assert_eq!(
            release.labels(RDFS_LABEL),
            vec!["behaviour", "smoking", "cigar smoking"]
        );
    }

    #[test]
    fn undeclared_identifiers_do_not_resolve() {
        let release = sample();
        assert_eq!(release.iri_for_id("ADDICTO:9999999"), None);
        // Mentioned as a filler but never declared as a class.
        assert_eq!(release.iri_for_id("ADDICTO:0000004"), None);
    }

    #[test]
    fn restrictions_become_some_values_from_axioms() {
        let release = sample();
        let cigar = release.iri_for_id("ADDICTO:0000003").unwrap();
        let svf: Vec<_> = release
            .axioms(&cigar)
            .iter()
            .filter_map(Axiom::some_values_from)
            .collect();
        assert_eq!(
            svf,
            vec![(
                "http://purl.obolibrary.org/obo/BFO_0000051",
                "http://purl.obolibrary.org/obo/ADDICTO_0000004"
            )]
        );
        assert_eq!(
            release.annotation("http://purl.obolibrary.org/obo/BFO_0000051", RDFS_LABEL),
            Some("has part")
        );
    }

    #[test]
    fn descendants_are_transitive_and_superclasses_direct() {
        let release = sample();
        let behaviour = release.iri_for_id("ADDICTO:0000001").unwrap();
        let cigar = release.iri_for_id("ADDICTO:0000003").unwrap();

        let desc = release.descendants(&behaviour);
        assert_eq!(desc.len(), 2);
        assert!(desc.contains(&cigar));

        assert_eq!(
            release.superclasses(&cigar),
            &["http://purl.obolibrary.org/obo/ADDICTO_0000002".to_string()]
        );
        assert!(release.descendants(&cigar).is_empty());
    }

    #[test]
    fn descendants_tolerate_cycles() {
        let nt = r#"
<http://x/A> <http://www.w3.org/2000/01/rdf-schema#subClassOf> <http://x/B> .
<http://x/B> <http://www.w3.org/2000/01/rdf-schema#subClassOf> <http://x/A> .
"#;
        let release =
            OntologyRelease::parse_as(nt.as_bytes(), RdfFormat::NTriples, PrefixMap::new()).unwrap();
        assert_eq!(release.descendants("http://x/A"), vec!["http://x/B".to_string()]);
    }

    #[test]
    fn turtle_with_declared_prefix() {
        let ttl = r#"
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix ex: <http://example.org/onto#> .

ex:Thing a owl:Class ; rdfs:label "thing" .
ex:Widget a owl:Class ; rdfs:label "widget" ; rdfs:subClassOf ex:Thing .
"#;
        let mut prefixes = PrefixMap::new();
        prefixes.insert("EX", "http://example.org/onto#");
        let release = OntologyRelease::parse(ttl.as_bytes(), prefixes).unwrap();

        let widget = release.iri_for_id("EX:Widget").unwrap();
        assert_eq!(release.id_for_iri(&widget).as_deref(), Some("EX:Widget"));
        assert_eq!(release.superclasses(&widget), &["http://example.org/onto#Thing".to_string()]);
    }

    #[test]
    fn load_release_from_static_source() {
        let source = StaticOntologySource::new().with_release("addicto", "addicto.nt", SAMPLE_NT);
        let release = load_release(&source, "addicto", PrefixMap::new()).unwrap();
        assert_eq!(release.classes().len(), 3);
        assert!(matches!(
            load_release(&source, "other", PrefixMap::new()),
            Err(ReleaseError::UnknownRepo(_))
        ));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = OntologyRelease::parse_as(b"<http://a> <http://b", RdfFormat::NTriples, PrefixMap::new())
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Parse(_)));
    }
}
