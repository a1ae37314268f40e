//! Triple-graph primitive backing template rendering and shape derivation
//!
//! A [`Graph`] is a deduplicated, deterministically ordered set of triples plus
//! the prefix bindings used when serializing. It supports the operations the
//! rest of the crate needs: insertion, union (`+=`), difference (`-=`),
//! triple-pattern matching, concise-bounded-description extraction, parsing of
//! the serialization grammar, Turtle output, and blank-node-aware isomorphism
//! comparison.

mod grammar;
pub mod lexer;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{AddAssign, SubAssign};

use crate::error::ParseError;
use crate::namespaces::RDF_TYPE;

/// A node or value in a graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal {
        lexical: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::Blank(label.into())
    }

    /// A plain string literal
    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Blank(label) => write!(f, "_:{}", label),
            Term::Literal {
                lexical,
                datatype,
                language,
            } => {
                write!(f, "\"{}\"", escape_literal(lexical))?;
                if let Some(language) = language {
                    write!(f, "@{}", language)?;
                } else if let Some(datatype) = datatype {
                    write!(f, "^^<{}>", datatype)?;
                }
                Ok(())
            }
        }
    }
}

/// A single (subject, predicate, object) statement
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

/// An in-memory labeled graph of triples
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    triples: BTreeSet<Triple>,
    prefixes: BTreeMap<String, String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prefix binding used by [`Graph::to_turtle`]
    pub fn bind(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }

    /// Insert a triple; returns false if it was already present
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    pub fn contains_triple(&self, subject: &Term, predicate: &Term, object: &Term) -> bool {
        self.triples.contains(&Triple {
            subject: subject.clone(),
            predicate: predicate.clone(),
            object: object.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// All triples matching a pattern; `None` positions are wildcards
    pub fn triples_matching<'a>(
        &'a self,
        subject: Option<&'a Term>,
        predicate: Option<&'a Term>,
        object: Option<&'a Term>,
    ) -> impl Iterator<Item = &'a Triple> + 'a {
        self.triples.iter().filter(move |t| {
            subject.map_or(true, |s| &t.subject == s)
                && predicate.map_or(true, |p| &t.predicate == p)
                && object.map_or(true, |o| &t.object == o)
        })
    }

    /// Concise bounded description of a node: its outgoing triples, closed
    /// over blank-node objects
    pub fn cbd(&self, node: &Term) -> Graph {
        let mut out = Graph {
            triples: BTreeSet::new(),
            prefixes: self.prefixes.clone(),
        };
        let mut queue = vec![node.clone()];
        let mut visited = BTreeSet::new();
        while let Some(current) = queue.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for triple in self.triples_matching(Some(&current), None, None) {
                if triple.object.is_blank() {
                    queue.push(triple.object.clone());
                }
                out.triples.insert(triple.clone());
            }
        }
        out
    }

    /// Parse serialization text into a graph
    pub fn parse(input: &str) -> Result<Graph, Vec<ParseError>> {
        let (triples, prefixes) = grammar::parse(input)?;
        Ok(Graph {
            triples: triples.into_iter().collect(),
            prefixes,
        })
    }

    /// Serialize to Turtle, emitting only the prefixes the triples use
    pub fn to_turtle(&self) -> String {
        let mut by_subject: BTreeMap<&Term, BTreeMap<&Term, Vec<&Term>>> = BTreeMap::new();
        for triple in &self.triples {
            by_subject
                .entry(&triple.subject)
                .or_default()
                .entry(&triple.predicate)
                .or_default()
                .push(&triple.object);
        }

        let mut used = BTreeSet::new();
        let mut body = String::new();
        for (subject, properties) in &by_subject {
            body.push_str(&self.compact(subject, false, &mut used));
            let mut first = true;
            for (predicate, objects) in properties {
                if first {
                    body.push(' ');
                    first = false;
                } else {
                    body.push_str(" ;\n    ");
                }
                body.push_str(&self.compact(predicate, true, &mut used));
                body.push(' ');
                let rendered: Vec<String> = objects
                    .iter()
                    .map(|o| self.compact(o, false, &mut used))
                    .collect();
                body.push_str(&rendered.join(", "));
            }
            body.push_str(" .\n");
        }

        let mut out = String::new();
        for (prefix, iri) in &self.prefixes {
            if used.contains(prefix) {
                out.push_str(&format!("@prefix {}: <{}> .\n", prefix, iri));
            }
        }
        if !out.is_empty() && !body.is_empty() {
            out.push('\n');
        }
        out.push_str(&body);
        out
    }

    /// Compact a term for Turtle output, recording which prefixes were used
    fn compact(&self, term: &Term, predicate_position: bool, used: &mut BTreeSet<String>) -> String {
        match term {
            Term::Iri(iri) => {
                if predicate_position && iri == RDF_TYPE {
                    return "a".to_string();
                }
                // longest matching namespace wins
                let mut best: Option<(&String, &str)> = None;
                for (prefix, namespace) in &self.prefixes {
                    if let Some(local) = iri.strip_prefix(namespace.as_str()) {
                        if is_pname_local(local)
                            && best.map_or(true, |(_, b)| namespace.len() > iri.len() - b.len())
                        {
                            best = Some((prefix, local));
                        }
                    }
                }
                match best {
                    Some((prefix, local)) => {
                        used.insert(prefix.clone());
                        format!("{}:{}", prefix, local)
                    }
                    None => format!("<{}>", iri),
                }
            }
            Term::Blank(label) => format!("_:{}", label),
            Term::Literal {
                lexical,
                datatype,
                language,
            } => {
                let mut out = format!("\"{}\"", escape_literal(lexical));
                if let Some(language) = language {
                    out.push('@');
                    out.push_str(language);
                } else if let Some(datatype) = datatype {
                    out.push_str("^^");
                    out.push_str(&self.compact(&Term::Iri(datatype.clone()), false, used));
                }
                out
            }
        }
    }

    /// Compare two graphs up to blank-node relabeling.
    ///
    /// Blank nodes are relabeled canonically using iterative signature
    /// refinement over their incident edges. Blanks left indistinguishable by
    /// refinement are genuinely interchangeable in the graphs this crate
    /// produces, so any consistent assignment yields the same canonical form.
    pub fn isomorphic(&self, other: &Graph) -> bool {
        if self.triples.len() != other.triples.len() {
            return false;
        }
        self.canonical_triples() == other.canonical_triples()
    }

    fn canonical_triples(&self) -> BTreeSet<Triple> {
        let blanks: BTreeSet<String> = self
            .triples
            .iter()
            .flat_map(|t| [&t.subject, &t.object])
            .filter_map(|term| match term {
                Term::Blank(label) => Some(label.clone()),
                _ => None,
            })
            .collect();
        if blanks.is_empty() {
            return self.triples.clone();
        }

        let mut signatures: BTreeMap<String, String> =
            blanks.iter().map(|b| (b.clone(), String::new())).collect();
        for _ in 0..blanks.len() {
            let mut next = BTreeMap::new();
            for blank in &blanks {
                let mut parts = Vec::new();
                for triple in &self.triples {
                    if matches!(&triple.subject, Term::Blank(b) if b == blank) {
                        parts.push(format!(
                            "+ {} {}",
                            triple.predicate,
                            signature_of(&triple.object, &signatures)
                        ));
                    }
                    if matches!(&triple.object, Term::Blank(b) if b == blank) {
                        parts.push(format!(
                            "- {} {}",
                            triple.predicate,
                            signature_of(&triple.subject, &signatures)
                        ));
                    }
                }
                parts.sort();
                next.insert(blank.clone(), parts.join("|"));
            }
            signatures = next;
        }

        let mut ordered: Vec<&String> = blanks.iter().collect();
        ordered.sort_by(|a, b| signatures[*a].cmp(&signatures[*b]).then(a.cmp(b)));
        let relabel: BTreeMap<&String, String> = ordered
            .iter()
            .enumerate()
            .map(|(i, blank)| (*blank, format!("c{}", i)))
            .collect();

        self.triples
            .iter()
            .map(|t| Triple {
                subject: relabel_term(&t.subject, &relabel),
                predicate: t.predicate.clone(),
                object: relabel_term(&t.object, &relabel),
            })
            .collect()
    }
}

fn signature_of(term: &Term, signatures: &BTreeMap<String, String>) -> String {
    match term {
        Term::Blank(label) => format!("[{}]", signatures.get(label).map_or("", |s| s.as_str())),
        other => other.to_string(),
    }
}

fn relabel_term(term: &Term, relabel: &BTreeMap<&String, String>) -> Term {
    match term {
        Term::Blank(label) => match relabel.get(label) {
            Some(canonical) => Term::Blank(canonical.clone()),
            None => term.clone(),
        },
        other => other.clone(),
    }
}

/// Whether a local name can round-trip through the serialization grammar
fn is_pname_local(local: &str) -> bool {
    let mut chars = local.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

impl AddAssign<&Graph> for Graph {
    /// Union: all triples of `rhs` are added; prefix bindings already present
    /// keep their existing expansion
    fn add_assign(&mut self, rhs: &Graph) {
        for triple in &rhs.triples {
            self.triples.insert(triple.clone());
        }
        for (prefix, iri) in &rhs.prefixes {
            self.prefixes
                .entry(prefix.clone())
                .or_insert_with(|| iri.clone());
        }
    }
}

impl SubAssign<&Graph> for Graph {
    /// Difference: every triple of `rhs` is removed; prefixes are untouched
    fn sub_assign(&mut self, rhs: &Graph) {
        for triple in &rhs.triples {
            self.triples.remove(triple);
        }
    }
}

impl Extend<Triple> for Graph {
    fn extend<T: IntoIterator<Item = Triple>>(&mut self, iter: T) {
        self.triples.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Graph {
    type Item = &'a Triple;
    type IntoIter = std::collections::btree_set::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::{RDF_TYPE, XSD_INTEGER};

    fn zone_graph() -> Graph {
        let mut g = Graph::new();
        g.bind("brick", "https://brickschema.org/schema/Brick#");
        g.bind("bldg", "urn:building/");
        g.insert(Triple::new(
            Term::iri("urn:building/zone1"),
            Term::iri(RDF_TYPE),
            Term::iri("https://brickschema.org/schema/Brick#HVAC_Zone"),
        ));
        g.insert(Triple::new(
            Term::iri("urn:building/zone1"),
            Term::iri("https://brickschema.org/schema/Brick#hasPart"),
            Term::iri("urn:building/cav1"),
        ));
        g
    }

    #[test]
    fn test_insert_deduplicates() {
        let mut g = zone_graph();
        assert_eq!(g.len(), 2);
        let duplicate = Triple::new(
            Term::iri("urn:building/zone1"),
            Term::iri("https://brickschema.org/schema/Brick#hasPart"),
            Term::iri("urn:building/cav1"),
        );
        assert!(!g.insert(duplicate));
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn test_union_and_difference() {
        let mut g = zone_graph();
        let mut extra = Graph::new();
        extra.insert(Triple::new(
            Term::iri("urn:building/zone1"),
            Term::iri("http://www.w3.org/2000/01/rdf-schema#label"),
            Term::literal("hvac zone 1"),
        ));

        g += &extra;
        assert_eq!(g.len(), 3);

        g -= &extra;
        assert_eq!(g.len(), 2);
        assert!(!g.contains(&Triple::new(
            Term::iri("urn:building/zone1"),
            Term::iri("http://www.w3.org/2000/01/rdf-schema#label"),
            Term::literal("hvac zone 1"),
        )));
    }

    #[test]
    fn test_triples_matching() {
        let g = zone_graph();
        let rdf_type = Term::iri(RDF_TYPE);
        let typed: Vec<_> = g.triples_matching(None, Some(&rdf_type), None).collect();
        assert_eq!(typed.len(), 1);

        let subject = Term::iri("urn:building/zone1");
        let outgoing: Vec<_> = g.triples_matching(Some(&subject), None, None).collect();
        assert_eq!(outgoing.len(), 2);
    }

    #[test]
    fn test_cbd_follows_blank_objects() {
        let mut g = Graph::new();
        let shape = Term::iri("urn:___mark___#zone");
        let property = Term::blank("p0");
        g.insert(Triple::new(
            shape.clone(),
            Term::iri("http://www.w3.org/ns/shacl#property"),
            property.clone(),
        ));
        g.insert(Triple::new(
            property.clone(),
            Term::iri("http://www.w3.org/ns/shacl#path"),
            Term::iri("urn:___mark___#name"),
        ));
        g.insert(Triple::new(
            Term::iri("urn:___mark___#other"),
            Term::iri("http://www.w3.org/ns/shacl#path"),
            Term::iri("urn:___mark___#ignored"),
        ));

        let cbd = g.cbd(&shape);
        assert_eq!(cbd.len(), 2);
        assert!(cbd.contains(&Triple::new(
            property,
            Term::iri("http://www.w3.org/ns/shacl#path"),
            Term::iri("urn:___mark___#name"),
        )));
    }

    #[test]
    fn test_serialize_then_reparse() {
        let g = zone_graph();
        let turtle = g.to_turtle();
        assert!(turtle.contains("@prefix brick:"));
        assert!(turtle.contains("bldg:zone1 a brick:HVAC_Zone"));

        let reparsed = Graph::parse(&turtle).expect("Should parse");
        assert!(g.isomorphic(&reparsed));
    }

    #[test]
    fn test_serialize_omits_unused_prefixes() {
        let mut g = zone_graph();
        g.bind("qudt", "http://qudt.org/schema/qudt/");
        let turtle = g.to_turtle();
        assert!(!turtle.contains("@prefix qudt:"));
    }

    #[test]
    fn test_serialize_typed_literal() {
        let mut g = Graph::new();
        g.bind("xsd", "http://www.w3.org/2001/XMLSchema#");
        g.insert(Triple::new(
            Term::iri("urn:building/zone1"),
            Term::iri("urn:building/floorCount"),
            Term::typed_literal("2", XSD_INTEGER),
        ));
        let turtle = g.to_turtle();
        assert!(turtle.contains("\"2\"^^xsd:integer"));
    }

    #[test]
    fn test_isomorphic_ignores_blank_labels() {
        let left = Graph::parse(
            r#"
            @prefix sh: <http://www.w3.org/ns/shacl#> .
            @prefix mark: <urn:___mark___#> .
            mark:zone sh:property [ sh:path mark:name ] , [ sh:path mark:cav ] .
        "#,
        )
        .expect("Should parse");
        let right = Graph::parse(
            r#"
            @prefix sh: <http://www.w3.org/ns/shacl#> .
            @prefix mark: <urn:___mark___#> .
            mark:zone sh:property [ sh:path mark:cav ] , [ sh:path mark:name ] .
        "#,
        )
        .expect("Should parse");
        assert!(left.isomorphic(&right));
    }

    #[test]
    fn test_not_isomorphic_when_structure_differs() {
        let left = zone_graph();
        let mut right = zone_graph();
        right.insert(Triple::new(
            Term::iri("urn:building/zone2"),
            Term::iri(RDF_TYPE),
            Term::iri("https://brickschema.org/schema/Brick#HVAC_Zone"),
        ));
        assert!(!left.isomorphic(&right));
    }
}
