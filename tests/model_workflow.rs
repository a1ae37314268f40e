//! End-to-end workflow: load a library, fill a template, assemble a model,
//! and hand it to a validator

use graft::namespaces::{RDF_TYPE, RDFS};
use graft::{Graph, Model, ShapeValidator, Term, TemplateLibrary, Triple, ValidationOutcome};

const HVAC_SOURCE: &str = r#"
- zone:
    head: [name, cav]
    body: |
      {name} a brick:HVAC_Zone ;
          brick:hasPart {cav} .
"#;

/// A stand-in for the external validator: every typed node must carry a label
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
            .map(|t| t.subject.clone())
            .collect();
        ValidationOutcome {
            valid: missing.is_empty(),
            report: Graph::new(),
            message: format!("{} node(s) missing a label", missing.len()),
        }
    }
}

/// Resolve a generated `bldg:...` binding back to the IRI it denotes
fn resolve_binding(value: &str) -> Term {
    let local = value
        .strip_prefix("bldg:")
        .expect("Should be namespace-qualified");
    Term::iri(format!("urn:building/{}", local))
}

#[test]
fn test_fill_model_then_validate() {
    let library = TemplateLibrary::from_yaml_str("hvac", HVAC_SOURCE).expect("Should load");
    let zone = library.primary("zone").expect("Should resolve");

    let (bindings, instance) = zone
        .fill_in(&library, "bldg", "urn:building/")
        .expect("Should fill in");

    let mut model = Model::new("urn:building/");
    model.add_graph(&instance);

    let shapes = library.get_shacl_shapes().expect("Should derive");
    let outcome = model.validate(&LabelValidator, &shapes, None);
    assert!(!outcome.valid, "unlabeled zone should fail validation");

    // label the generated zone node and validate again
    model.add_triples([Triple::new(
        resolve_binding(&bindings["name"]),
        Term::iri(format!("{}label", RDFS)),
        Term::literal("hvac zone 1"),
    )]);
    let outcome = model.validate(&LabelValidator, &shapes, None);
    assert!(outcome.valid, "labeled zone should pass validation");
}

#[test]
fn test_model_accumulates_template_instances() {
    let library = TemplateLibrary::from_yaml_str("hvac", HVAC_SOURCE).expect("Should load");
    let zone = library.primary("zone").expect("Should resolve");

    let mut model = Model::new("urn:building/");
    for _ in 0..3 {
        let (_, instance) = zone
            .fill_in(&library, "bldg", "urn:building/")
            .expect("Should fill in");
        model.add_graph(&instance);
    }

    // three independent instances: identifiers never collide
    let rdf_type = Term::iri(RDF_TYPE);
    assert_eq!(
        model
            .graph()
            .triples_matching(None, Some(&rdf_type), None)
            .count(),
        3
    );
    assert_eq!(model.graph().len(), 6);
}
