//! Derivation of structural-constraint shapes from template parameters
//!
//! Every template maps to one node shape in the private mark namespace whose
//! property constraints mirror the template's parameter set. The derived
//! graph is consumed by an external validator; this crate never interprets it.

use crate::graph::{Graph, Term, Triple};
use crate::namespaces::{MARK, RDF_TYPE, SH, XSD_INTEGER};
use crate::template::{Template, TemplateError, TemplateLibrary};

/// Derive the constraint node for one template: `mark:<name>` is a
/// `sh:NodeShape` with one expected-property constraint per parameter.
///
/// Property shapes use blank nodes keyed by template and parameter name, so
/// variants sharing a name accumulate onto one constraint node when their
/// fragments are unioned.
pub fn template_to_shape(
    template: &Template,
    library: &TemplateLibrary,
) -> Result<Graph, TemplateError> {
    let mut graph = Graph::new();
    graph.bind("mark", MARK);
    graph.bind("sh", SH);
    graph.bind("xsd", "http://www.w3.org/2001/XMLSchema#");

    let shape = Term::iri(format!("{}{}", MARK, template.name));
    graph.insert(Triple::new(
        shape.clone(),
        Term::iri(RDF_TYPE),
        Term::iri(format!("{}NodeShape", SH)),
    ));

    for param in template.parameters(library)? {
        let property = Term::blank(format!("{}_{}", template.name, param));
        graph.insert(Triple::new(
            shape.clone(),
            Term::iri(format!("{}property", SH)),
            property.clone(),
        ));
        graph.insert(Triple::new(
            property.clone(),
            Term::iri(format!("{}path", SH)),
            Term::iri(format!("{}{}", MARK, param)),
        ));
        graph.insert(Triple::new(
            property,
            Term::iri(format!("{}minCount", SH)),
            Term::typed_literal("1", XSD_INTEGER),
        ));
    }

    Ok(graph)
}

/// Union of every template's constraint fragment, one combined graph
pub fn library_shapes(library: &TemplateLibrary) -> Result<Graph, TemplateError> {
    let mut full = Graph::new();
    full.bind("mark", MARK);
    full.bind("sh", SH);
    for template in library.iter() {
        let fragment = template_to_shape(template, library)?;
        full += &fragment;
    }
    Ok(full)
}
