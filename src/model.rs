//! Data-graph facade and the external validator boundary

use crate::graph::{Graph, Triple};

/// What an external validator reports back for one validation run
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub valid: bool,
    /// Machine-readable report graph
    pub report: Graph,
    /// Human-readable report text
    pub message: String,
}

/// The external structural-constraint validator, treated as opaque.
///
/// Implementations receive the data graph, the shape graph derived by this
/// crate, and optionally an ontology graph for inference, and report whether
/// the data satisfies the shapes.
pub trait ShapeValidator {
    fn validate(&self, data: &Graph, shapes: &Graph, ontology: Option<&Graph>)
        -> ValidationOutcome;
}

/// A named data graph assembled from evaluated templates
#[derive(Debug, Clone, Default)]
pub struct Model {
    name: String,
    graph: Graph,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: Graph::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Add triples to the model's graph
    pub fn add_triples(&mut self, triples: impl IntoIterator<Item = Triple>) {
        self.graph.extend(triples);
    }

    /// Union another graph into the model
    pub fn add_graph(&mut self, graph: &Graph) {
        self.graph += graph;
    }

    /// Hand the model's graph and the given shapes to an external validator
    pub fn validate<V: ShapeValidator>(
        &self,
        validator: &V,
        shapes: &Graph,
        ontology: Option<&Graph>,
    ) -> ValidationOutcome {
        validator.validate(&self.graph, shapes, ontology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Term;
    use crate::namespaces::{RDF_TYPE, RDFS};

    /// Accepts any data graph that labels every typed node
    struct LabelValidator;

    impl ShapeValidator for LabelValidator {
        fn validate(
            &self,
            data: &Graph,
            _shapes: &Graph,
            _ontology: Option<&Graph>,
        ) -> ValidationOutcome {
            let rdf_type = Term::iri(RDF_TYPE);
            let label = Term::iri(format!("{}label", RDFS));
            let missing: Vec<_> = data
                .triples_matching(None, Some(&rdf_type), None)
                .filter(|t| {
                    data.triples_matching(Some(&t.subject), Some(&label), None)
                        .next()
                        .is_none()
                })
                .collect();
            ValidationOutcome {
                valid: missing.is_empty(),
                report: Graph::new(),
                message: format!("{} node(s) missing a label", missing.len()),
            }
        }
    }

    #[test]
    fn test_validate_hands_the_model_graph_over() {
        let mut model = Model::new("urn:building/");
        model.add_triples([Triple::new(
            Term::iri("urn:building/zone1"),
            Term::iri(RDF_TYPE),
            Term::iri("https://brickschema.org/schema/Brick#HVAC_Zone"),
        )]);

        let outcome = model.validate(&LabelValidator, &Graph::new(), None);
        assert!(!outcome.valid);

        model.add_triples([Triple::new(
            Term::iri("urn:building/zone1"),
            Term::iri(format!("{}label", RDFS)),
            Term::literal("hvac zone 1"),
        )]);
        let outcome = model.validate(&LabelValidator, &Graph::new(), None);
        assert!(outcome.valid);
    }

    #[test]
    fn test_add_graph_unions() {
        let mut model = Model::new("urn:building/");
        let mut g = Graph::new();
        g.insert(Triple::new(
            Term::iri("urn:building/zone1"),
            Term::iri(RDF_TYPE),
            Term::iri("https://brickschema.org/schema/Brick#HVAC_Zone"),
        ));
        model.add_graph(&g);
        model.add_graph(&g);
        assert_eq!(model.graph().len(), 1);
    }
}
