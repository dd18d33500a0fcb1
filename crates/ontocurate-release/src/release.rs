//! In-memory view of a published ontology release.
//!
//! Only the parts a curator needs are retained:
//!
//! ```text
//!   owl:Class declarations          -> classes()
//!   C rdfs:subClassOf D             -> superclasses(C), descendants(D)
//!   C rdfs:subClassOf [ owl:onProperty R ; owl:someValuesFrom T ]
//!                                   -> axioms(C) (SomeValuesFrom)
//!   C <annotation> "literal"        -> annotation(C, <annotation>)
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use crate::prefix::PrefixMap;
use crate::rdf::{self, RdfFormat, RdfNode, RdfObject};
use crate::ReleaseError;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
pub const OWL_RESTRICTION: &str = "http://www.w3.org/2002/07/owl#Restriction";
pub const OWL_ON_PROPERTY: &str = "http://www.w3.org/2002/07/owl#onProperty";
pub const OWL_SOME_VALUES_FROM: &str = "http://www.w3.org/2002/07/owl#someValuesFrom";
pub const IAO_DEFINITION: &str = "http://purl.obolibrary.org/obo/IAO_0000115";
pub const IAO_ALTERNATIVE_TERM: &str = "http://purl.obolibrary.org/obo/IAO_0000118";

/// Right-hand side of a subclass axiom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassExpression {
    Named(String),
    SomeValuesFrom { property: String, filler: String },
}

/// A logical axiom attached to a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Axiom {
    SubClassOf {
        sub: String,
        sup: ClassExpression,
    },
}

impl Axiom {
    /// `(property, filler)` if this is a `SubClassOf(C, SomeValuesFrom(R, T))` axiom.
    pub fn some_values_from(&self) -> Option<(&str, &str)> {
        match self {
            Axiom::SubClassOf {
                sup: ClassExpression::SomeValuesFrom { property, filler },
                ..
            } => Some((property.as_str(), filler.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct OntologyRelease {
    classes: Vec<String>,
    class_set: HashSet<String>,
    superclasses: HashMap<String, Vec<String>>,
    subclasses: HashMap<String, Vec<String>>,
    axioms: HashMap<String, Vec<Axiom>>,
    annotations: HashMap<String, HashMap<String, Vec<String>>>,
    prefixes: PrefixMap,
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

impl OntologyRelease {
    /// Parse a release document, sniffing the serialization.
    pub fn parse(bytes: &[u8], prefixes: PrefixMap) -> Result<Self, ReleaseError> {
        Self::parse_as(bytes, RdfFormat::sniff(bytes), prefixes)
    }

    pub fn parse_as(
        bytes: &[u8],
        format: RdfFormat,
        prefixes: PrefixMap,
    ) -> Result<Self, ReleaseError> {
        let statements = rdf::parse_statements(bytes, format)?;

        // Blank node descriptions, needed to decode restrictions.
        let mut blank: HashMap<String, HashMap<String, RdfNode>> = HashMap::new();
        for st in &statements {
            if let (RdfNode::BlankNode(b), RdfObject::Node(node)) = (&st.subject, &st.object) {
                blank
                    .entry(b.clone())
                    .or_default()
                    .insert(st.predicate_iri.clone(), node.clone());
            }
        }

        let mut release = OntologyRelease {
            prefixes,
            ..Default::default()
        };

        for st in &statements {
            let RdfNode::Iri(subject) = &st.subject else {
                continue;
            };
            match (st.predicate_iri.as_str(), &st.object) {
                (RDF_TYPE, RdfObject::Node(RdfNode::Iri(ty))) if ty == OWL_CLASS => {
                    release.declare_class(subject);
                }
                (RDFS_SUBCLASS_OF, RdfObject::Node(RdfNode::Iri(sup))) => {
                    release.add_subclass(subject, sup);
                }
                (RDFS_SUBCLASS_OF, RdfObject::Node(RdfNode::BlankNode(b))) => {
                    let Some(desc) = blank.get(b) else { continue };
                    let is_restriction = matches!(
                        desc.get(RDF_TYPE),
                        Some(RdfNode::Iri(t)) if t == OWL_RESTRICTION
                    ) || desc.contains_key(OWL_ON_PROPERTY);
                    if !is_restriction {
                        continue;
                    }
                    match (desc.get(OWL_ON_PROPERTY), desc.get(OWL_SOME_VALUES_FROM)) {
                        (Some(RdfNode::Iri(property)), Some(RdfNode::Iri(filler))) => {
                            release.axioms.entry(subject.clone()).or_default().push(
                                Axiom::SubClassOf {
                                    sub: subject.clone(),
                                    sup: ClassExpression::SomeValuesFrom {
                                        property: property.clone(),
                                        filler: filler.clone(),
                                    },
                                },
                            );
                        }
                        _ => {
                            tracing::debug!(class = %subject, "ignoring unsupported restriction");
                        }
                    }
                }
                (predicate, RdfObject::Literal(lit)) => {
                    release
                        .annotations
                        .entry(subject.clone())
                        .or_default()
                        .entry(predicate.to_string())
                        .or_default()
                        .push(lit.lexical.clone());
                }
                _ => {}
            }
        }

        tracing::debug!(
            classes = release.classes.len(),
            statements = statements.len(),
            "parsed ontology release"
        );
        Ok(release)
    }

    fn declare_class(&mut self, iri: &str) {
        if self.class_set.insert(iri.to_string()) {
            self.classes.push(iri.to_string());
        }
    }

    fn add_subclass(&mut self, sub: &str, sup: &str) {
        push_unique(self.superclasses.entry(sub.to_string()).or_default(), sup);
        push_unique(self.subclasses.entry(sup.to_string()).or_default(), sub);
        self.axioms.entry(sub.to_string()).or_default().push(Axiom::SubClassOf {
            sub: sub.to_string(),
            sup: ClassExpression::Named(sup.to_string()),
        });
    }

    /// Declared class IRIs in document order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn is_class(&self, iri: &str) -> bool {
        self.class_set.contains(iri)
    }

    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    /// Compact identifier for an IRI, if one of the known prefixes covers it.
    pub fn id_for_iri(&self, iri: &str) -> Option<String> {
        self.prefixes.compress(iri)
    }

    /// IRI of a declared class. Unknown identifiers resolve to `None`.
    pub fn iri_for_id(&self, id: &str) -> Option<String> {
        let iri = self.prefixes.expand(id)?;
        self.class_set.contains(&iri).then_some(iri)
    }

    /// First value of an annotation on `iri`.
    pub fn annotation(&self, iri: &str, property: &str) -> Option<&str> {
        self.annotation_values(iri, property).first().map(String::as_str)
    }

    pub fn annotation_values(&self, iri: &str, property: &str) -> &[String] {
        self.annotations
            .get(iri)
            .and_then(|props| props.get(property))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn axioms(&self, iri: &str) -> &[Axiom] {
        self.axioms.get(iri).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct named superclasses.
    pub fn superclasses(&self, iri: &str) -> &[String] {
        self.superclasses.get(iri).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct named subclasses.
    pub fn subclasses(&self, iri: &str) -> &[String] {
        self.subclasses.get(iri).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every class reachable downward through `subClassOf`, excluding `iri`.
    pub fn descendants(&self, iri: &str) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(iri);
        let mut out = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(iri);
        while let Some(current) = queue.pop_front() {
            for child in self.subclasses.get(current).into_iter().flatten() {
                if seen.insert(child.as_str()) {
                    out.push(child.clone());
                    queue.push_back(child.as_str());
                }
            }
        }
        out
    }

    /// Labels of every declared class that has one, in document order.
    pub fn labels(&self, label_property: &str) -> Vec<String> {
        self.classes
            .iter()
            .filter_map(|iri| self.annotation(iri, label_property))
            .map(str::to_string)
            .collect()
    }
}
