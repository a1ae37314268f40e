//! Graft - parameterized templates for semantic graph construction
//!
//! This library provides reusable, parameterized fragments of graph data:
//! templates are loaded from declarative YAML libraries, composed by inlining
//! their dependencies, bound (partially or fully) with concrete values, and
//! rendered either into a concrete graph or into a structural-shape
//! description for an external validator.
//!
//! # Example
//!
//! ```rust
//! use graft::TemplateLibrary;
//!
//! let source = r#"
//! - zone:
//!     head: [name, cav]
//!     body: |
//!       {name} a brick:HVAC_Zone ;
//!           brick:hasPart {cav} .
//! "#;
//!
//! let library = TemplateLibrary::from_yaml_str("hvac", source).unwrap();
//! let zone = library.primary("zone").unwrap();
//!
//! let params = zone.parameters(&library).unwrap();
//! assert!(params.contains("name") && params.contains("cav"));
//!
//! let (bindings, graph) = zone.fill_in(&library, "bldg", "urn:building/").unwrap();
//! assert_eq!(graph.len(), 2);
//! assert!(bindings["name"].starts_with("bldg:name_"));
//! ```

pub mod error;
pub mod graph;
pub mod model;
pub mod namespaces;
pub mod shape;
pub mod template;

pub use error::ParseError;
pub use graph::{Graph, Term, Triple};
pub use model::{Model, ShapeValidator, ValidationOutcome};
pub use template::{
    Bindings, Evaluated, LibraryError, Template, TemplateError, TemplateLibrary,
};
