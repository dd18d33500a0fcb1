//! RDF statement extraction.
//!
//! Sophia does the syntax work; we flatten every triple into a small owned
//! term model so the rest of the crate never touches Sophia types.

use sophia::api::prelude::*;

use crate::ReleaseError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum RdfNode {
    Iri(String),
    BlankNode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RdfLiteral {
    pub lexical: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RdfObject {
    Node(RdfNode),
    Literal(RdfLiteral),
}

#[derive(Debug, Clone)]
pub(crate) struct RdfStatement {
    pub subject: RdfNode,
    pub predicate_iri: String,
    pub object: RdfObject,
}

/// Serialization of a release file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    Turtle,
    RdfXml,
}

impl RdfFormat {
    /// Pick a format from a file name extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit('.').next()?.to_ascii_lowercase();
        match ext.as_str() {
            "nt" | "ntriples" => Some(Self::NTriples),
            "ttl" | "turtle" => Some(Self::Turtle),
            "owl" | "rdf" | "xml" => Some(Self::RdfXml),
            _ => None,
        }
    }

    /// Guess the format from the leading bytes of a document.
    ///
    /// XML documents start with a declaration or an element; Turtle files
    /// usually open with `@prefix`/`PREFIX`. Anything else is read as N-Triples.
    pub fn sniff(bytes: &[u8]) -> Self {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
        let head = head.trim_start_matches('\u{feff}').trim_start();
        if head.starts_with('<') && !head.starts_with("<http") && !head.starts_with("<urn") {
            return Self::RdfXml;
        }
        let lowered = head.to_ascii_lowercase();
        if lowered.starts_with("@prefix") || lowered.starts_with("prefix") || lowered.starts_with("@base") {
            return Self::Turtle;
        }
        Self::NTriples
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct RdfSinkError {
    message: String,
}

fn unescape_rdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_term_display(term: &str) -> Result<RdfObject, RdfSinkError> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(RdfObject::Node(RdfNode::Iri(rest.to_string())));
    }

    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(RdfObject::Node(RdfNode::BlankNode(rest.to_string())));
    }

    if s.starts_with('"') {
        let mut end_quote = None;
        let mut escaped = false;
        for (i, ch) in s.char_indices().skip(1) {
            if ch == '"' && !escaped {
                end_quote = Some(i);
                break;
            }
            escaped = ch == '\\' && !escaped;
        }
        let Some(end) = end_quote else {
            return Err(RdfSinkError {
                message: format!("invalid literal term (missing closing quote): {s}"),
            });
        };

        let lexical = unescape_rdf_string(&s[1..end]);
        let rest = s[end + 1..].trim();
        let language = rest.strip_prefix('@').map(str::to_string);

        return Ok(RdfObject::Literal(RdfLiteral { lexical, language }));
    }

    Err(RdfSinkError {
        message: format!("unsupported RDF term form: {s}"),
    })
}

fn parse_node_term_display(term: &str) -> Result<RdfNode, RdfSinkError> {
    match parse_term_display(term)? {
        RdfObject::Node(node) => Ok(node),
        RdfObject::Literal(_) => Err(RdfSinkError {
            message: format!("expected IRI/blank node, got literal: {term}"),
        }),
    }
}

fn statement_from_display(
    subject: &str,
    predicate: &str,
    object: &str,
) -> Result<Option<RdfStatement>, RdfSinkError> {
    let subject = parse_node_term_display(subject)?;
    let RdfNode::Iri(predicate_iri) = parse_node_term_display(predicate)? else {
        return Ok(None);
    };
    let object = parse_term_display(object)?;
    Ok(Some(RdfStatement {
        subject,
        predicate_iri,
        object,
    }))
}

pub(crate) fn parse_statements(
    bytes: &[u8],
    format: RdfFormat,
) -> Result<Vec<RdfStatement>, ReleaseError> {
    let reader = std::io::BufReader::new(std::io::Cursor::new(bytes));
    let mut out: Vec<RdfStatement> = Vec::new();

    match format {
        RdfFormat::NTriples => {
            let mut parser = sophia::turtle::parser::nt::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> Result<(), RdfSinkError> {
                    let stmt = statement_from_display(
                        &t.s().to_string(),
                        &t.p().to_string(),
                        &t.o().to_string(),
                    )?;
                    out.extend(stmt);
                    Ok(())
                })
                .map_err(|e| ReleaseError::Parse(format!("failed to parse N-Triples: {e}")))?;
        }
        RdfFormat::Turtle => {
            let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> Result<(), RdfSinkError> {
                    let stmt = statement_from_display(
                        &t.s().to_string(),
                        &t.p().to_string(),
                        &t.o().to_string(),
                    )?;
                    out.extend(stmt);
                    Ok(())
                })
                .map_err(|e| ReleaseError::Parse(format!("failed to parse Turtle: {e}")))?;
        }
        RdfFormat::RdfXml => {
            let mut parser = sophia::xml::parser::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> Result<(), RdfSinkError> {
                    let stmt = statement_from_display(
                        &t.s().to_string(),
                        &t.p().to_string(),
                        &t.o().to_string(),
                    )?;
                    out.extend(stmt);
                    Ok(())
                })
                .map_err(|e| ReleaseError::Parse(format!("failed to parse RDF/XML: {e}")))?;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_terms_in_display_form() {
        let iri = parse_term_display("<http://example.org/A>").unwrap();
        assert_eq!(
            iri,
            RdfObject::Node(RdfNode::Iri("http://example.org/A".to_string()))
        );

        let bnode = parse_term_display("_:b0").unwrap();
        assert_eq!(bnode, RdfObject::Node(RdfNode::BlankNode("b0".to_string())));

        let lit = parse_term_display(r#""smoking \"cessation\""@en"#).unwrap();
        assert_eq!(
            lit,
            RdfObject::Literal(RdfLiteral {
                lexical: "smoking \"cessation\"".to_string(),
                language: Some("en".to_string()),
            })
        );
    }

    #[test]
    fn literal_predicates_are_rejected() {
        assert!(statement_from_display("<http://a>", "\"p\"", "<http://b>").is_err());
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(RdfFormat::sniff(b"<?xml version=\"1.0\"?>\n<rdf:RDF>"), RdfFormat::RdfXml);
        assert_eq!(RdfFormat::sniff(b"@prefix owl: <http://x#> ."), RdfFormat::Turtle);
        assert_eq!(
            RdfFormat::sniff(b"<http://a> <http://b> <http://c> ."),
            RdfFormat::NTriples
        );
        assert_eq!(RdfFormat::from_file_name("addicto.owl"), Some(RdfFormat::RdfXml));
        assert_eq!(RdfFormat::from_file_name("README"), None);
    }
}
