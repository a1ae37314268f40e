//! Parameterized graph templates
//!
//! A template is a function from parameter bindings to a graph: a named body
//! of graph-serialization text with `{param}` placeholders, an ordered head of
//! declared parameters, and a set of dependencies on other templates that are
//! composed in by inlining.
//!
//! # Example
//!
//! ```text
//! - zone:
//!     head: [name, cav]
//!     body: >
//!       {name} a brick:HVAC_Zone ;
//!           brick:hasPart {cav} .
//! - vav:
//!     head: [vav_name]
//!     body: >
//!       {vav_name} a brick:VAV .
//!     dependencies:
//!       - rule: zone
//!         args: [vav_name, ~]
//! ```

mod library;

pub use library::{LibraryError, TemplateLibrary};

use std::collections::{BTreeSet, HashMap};

use hashlink::LinkedHashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ParseError;
use crate::graph::Graph;
use crate::namespaces::preamble_with;

/// Errors that can occur during template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template or dependency not found in the library
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// Recursive composition through mutually dependent templates
    #[error("circular template dependency detected: {chain}")]
    CircularDependency { chain: String },

    /// The fully-bound rendering is not valid graph syntax
    #[error("rendered template is not valid graph syntax: {}", format_parse_errors(.0))]
    Render(Vec<ParseError>),
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parameter bindings supplied to [`Template::evaluate`].
///
/// Keys outside the template's parameter set are accepted and ignored.
pub type Bindings = HashMap<String, String>;

/// Positional arguments passed to a dependency; `None` leaves the slot
/// unbound so the dependency's own parameter name survives (renamed)
pub type DependencyArgs = Vec<Option<String>>;

/// Result of evaluating a template
#[derive(Debug, Clone)]
pub enum Evaluated {
    /// Every parameter was bound; the rendered body parsed into a graph
    Complete(Graph),
    /// Some parameters remain; an independent, reduced template
    Partial(Template),
}

impl Evaluated {
    pub fn is_complete(&self) -> bool {
        matches!(self, Evaluated::Complete(_))
    }

    pub fn graph(self) -> Option<Graph> {
        match self {
            Evaluated::Complete(graph) => Some(graph),
            Evaluated::Partial(_) => None,
        }
    }

    pub fn template(self) -> Option<Template> {
        match self {
            Evaluated::Partial(template) => Some(template),
            Evaluated::Complete(_) => None,
        }
    }
}

/// A named, parameterized fragment of graph-serialization text
#[derive(Debug, Clone)]
pub struct Template {
    /// Unique name within a library
    pub name: String,
    /// Declared positional parameter signature; order is how dependent
    /// templates address these parameters
    pub head: Vec<String>,
    /// Serialization text with `{param}` placeholders
    pub body: String,
    /// Dependency name -> positional arguments, in declaration order
    pub deps: LinkedHashMap<String, DependencyArgs>,
}

impl Template {
    pub fn new(name: impl Into<String>, head: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            head,
            body: body.into(),
            deps: LinkedHashMap::new(),
        }
    }

    /// Declare a dependency on another template. A repeated rule name
    /// replaces the earlier argument list.
    pub fn add_dependency(&mut self, rule: impl Into<String>, args: DependencyArgs) {
        self.deps.insert(rule.into(), args);
    }

    /// The set of all parameters used by this template, including those of
    /// its dependencies, computed recursively.
    pub fn parameters(&self, library: &TemplateLibrary) -> Result<BTreeSet<String>, TemplateError> {
        let mut resolving = Vec::new();
        self.parameters_inner(library, &mut resolving)
    }

    fn parameters_inner(
        &self,
        library: &TemplateLibrary,
        resolving: &mut Vec<String>,
    ) -> Result<BTreeSet<String>, TemplateError> {
        if resolving.contains(&self.name) {
            return Err(cycle_error(resolving, &self.name));
        }
        resolving.push(self.name.clone());
        let mut params = body_parameters(&self.body);
        for dep_name in self.deps.keys() {
            let dep = library.primary(dep_name)?;
            params.extend(dep.parameters_inner(library, resolving)?);
        }
        resolving.pop();
        Ok(params)
    }

    /// The parameters reachable through this template's dependencies: the
    /// argument names it passes plus each dependency's own parameter sets.
    ///
    /// This over-approximates the dependencies' free parameters; it exists
    /// for collision awareness during inlining, not as an authoritative set.
    pub fn dependency_parameters(
        &self,
        library: &TemplateLibrary,
    ) -> Result<BTreeSet<String>, TemplateError> {
        let mut resolving = Vec::new();
        self.dependency_parameters_inner(library, &mut resolving)
    }

    fn dependency_parameters_inner(
        &self,
        library: &TemplateLibrary,
        resolving: &mut Vec<String>,
    ) -> Result<BTreeSet<String>, TemplateError> {
        if resolving.contains(&self.name) {
            return Err(cycle_error(resolving, &self.name));
        }
        resolving.push(self.name.clone());
        let mut params = BTreeSet::new();
        for (dep_name, dep_args) in &self.deps {
            params.extend(dep_args.iter().flatten().cloned());
            let dep = library.primary(dep_name)?;
            params.extend(dep.parameters_inner(library, resolving)?);
            params.extend(dep.dependency_parameters_inner(library, resolving)?);
        }
        resolving.pop();
        Ok(params)
    }

    /// The first dependency, in declaration order, whose argument list passes
    /// the given parameter
    pub fn dependency_for_parameter(&self, param: &str) -> Option<&str> {
        self.deps
            .iter()
            .find(|(_, args)| args.iter().flatten().any(|arg| arg == param))
            .map(|(name, _)| name.as_str())
    }

    /// An inline-able copy of this template: every parameter not named in
    /// `preserve` is renamed behind a collision-resistant prefix so that two
    /// inlined instances can never share a placeholder unintentionally.
    pub fn to_inline(
        &self,
        preserve: &[String],
        library: &TemplateLibrary,
    ) -> Result<Template, TemplateError> {
        let mut inlined = self.clone();
        let prefix = format!("{}-{}", self.name, fresh_hex());
        for param in self.parameters(library)? {
            if preserve.contains(&param) {
                continue;
            }
            let fresh = format!("{}_{}", prefix, param);
            inlined.body = rename_placeholder(&inlined.body, &param, &fresh);
            for slot in inlined.head.iter_mut() {
                if *slot == param {
                    *slot = fresh.clone();
                }
            }
        }
        Ok(inlined)
    }

    /// Inline every dependency, recursively, until this template is
    /// self-contained: `deps` ends up empty, and `head`/`body` incorporate
    /// each dependency's renamed content.
    ///
    /// Callers should operate on a private copy; the shared library entry is
    /// never mutated by this crate.
    pub fn inline_dependencies(&mut self, library: &TemplateLibrary) -> Result<(), TemplateError> {
        let mut resolving = Vec::new();
        self.inline_dependencies_inner(library, &mut resolving)
    }

    fn inline_dependencies_inner(
        &mut self,
        library: &TemplateLibrary,
        resolving: &mut Vec<String>,
    ) -> Result<(), TemplateError> {
        if resolving.contains(&self.name) {
            return Err(cycle_error(resolving, &self.name));
        }
        resolving.push(self.name.clone());

        let deps = std::mem::take(&mut self.deps);
        for (dep_name, dep_args) in &deps {
            // dependencies-of-dependencies resolve before the parent
            // incorporates them
            let mut dep = library.primary(dep_name)?.clone();
            dep.inline_dependencies_inner(library, resolving)?;

            // positional mapping: callee head name -> caller argument.
            // `None` slots are skipped; those parameters keep their own
            // (about to be renamed) names.
            let mut mapping: HashMap<String, String> = HashMap::new();
            for (idx, caller_arg) in dep_args.iter().enumerate() {
                let (Some(caller_arg), Some(callee_arg)) = (caller_arg, dep.head.get(idx)) else {
                    continue;
                };
                mapping.insert(callee_arg.clone(), caller_arg.clone());
            }

            for (callee, caller) in &mapping {
                dep.body = rename_placeholder(&dep.body, callee, caller);
            }
            for slot in dep.head.iter_mut() {
                if let Some(caller) = mapping.get(slot) {
                    *slot = caller.clone();
                }
            }

            let preserve: Vec<String> = mapping.values().cloned().collect();
            let dep = dep.to_inline(&preserve, library)?;

            for param in dep.head {
                if !self.head.contains(&param) {
                    self.head.push(param);
                }
            }
            self.body.push('\n');
            self.body.push_str(&dep.body);
        }

        resolving.pop();
        Ok(())
    }

    /// Evaluate the template with as many bindings as are provided.
    ///
    /// The template is fully bound when every member of [`Template::parameters`]
    /// appears as a binding key; the rendered body is then parsed into a graph
    /// under the well-known preamble plus `more_namespaces`. Otherwise a new,
    /// independent template is returned with the supplied bindings substituted
    /// and `head` reduced to the still-unbound entries.
    ///
    /// Binding values are substituted verbatim: a value containing
    /// syntax-significant characters surfaces as a parse error at
    /// materialization time.
    pub fn evaluate(
        &self,
        library: &TemplateLibrary,
        bindings: &Bindings,
        more_namespaces: &[(String, String)],
    ) -> Result<Evaluated, TemplateError> {
        let full = self.parameters(library)?;
        let fully_bound = full.iter().all(|param| bindings.contains_key(param));

        if fully_bound {
            let mut body = self.body.clone();
            for param in &full {
                if let Some(value) = bindings.get(param) {
                    body = substitute(&body, param, value);
                }
            }
            let text = format!("{}\n{}\n", preamble_with(more_namespaces), body);
            let graph = Graph::parse(&text).map_err(TemplateError::Render)?;
            return Ok(Evaluated::Complete(graph));
        }

        let mut partial = self.clone();
        for (param, value) in bindings {
            if full.contains(param) {
                partial.body = substitute(&partial.body, param, value);
            }
        }
        partial.head.retain(|h| !bindings.contains_key(h));
        Ok(Evaluated::Partial(partial))
    }

    /// Evaluate with autogenerated bindings: every parameter receives a fresh
    /// `prefix:param_<hex>` identifier under the given namespace. Always
    /// materializes; the generated bindings are returned so callers can keep
    /// building on the new identifiers.
    pub fn fill_in(
        &self,
        library: &TemplateLibrary,
        prefix: &str,
        namespace: &str,
    ) -> Result<(Bindings, Graph), TemplateError> {
        let mut bindings = Bindings::new();
        for param in self.parameters(library)? {
            let value = format!("{}:{}_{}", prefix, param, fresh_hex());
            bindings.insert(param, value);
        }
        let extra = [(prefix.to_string(), namespace.to_string())];
        match self.evaluate(library, &bindings, &extra)? {
            Evaluated::Complete(graph) => Ok((bindings, graph)),
            Evaluated::Partial(_) => unreachable!("bindings cover every parameter"),
        }
    }
}

/// The distinct `{name}` placeholders textually present in a body
fn body_parameters(body: &str) -> BTreeSet<String> {
    let mut params = BTreeSet::new();
    let mut rest = body;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else { break };
        let candidate = &after[..end];
        if !candidate.is_empty() && candidate.chars().all(is_placeholder_char) {
            params.insert(candidate.to_string());
        }
        rest = &after[end + 1..];
    }
    params
}

fn is_placeholder_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Rename a placeholder, keeping it a placeholder
fn rename_placeholder(body: &str, from: &str, to: &str) -> String {
    body.replace(&format!("{{{}}}", from), &format!("{{{}}}", to))
}

/// Replace a placeholder with a bound value
fn substitute(body: &str, param: &str, value: &str) -> String {
    body.replace(&format!("{{{}}}", param), value)
}

/// 16 hex characters of fresh randomness for rename prefixes and generated
/// identifiers
fn fresh_hex() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..16].to_string()
}

fn cycle_error(resolving: &[String], name: &str) -> TemplateError {
    let mut chain: Vec<&str> = resolving.iter().map(|s| s.as_str()).collect();
    chain.push(name);
    TemplateError::CircularDependency {
        chain: chain.join(" -> "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> Template {
        Template::new(
            "zone",
            vec!["name".to_string(), "cav".to_string()],
            "{name} a brick:HVAC_Zone ;\n    brick:hasPart {cav} .",
        )
    }

    fn empty_library() -> TemplateLibrary {
        TemplateLibrary::new("test")
    }

    #[test]
    fn test_body_parameters() {
        let params = body_parameters("{name} a brick:HVAC_Zone ; brick:hasPart {cav} .");
        assert_eq!(
            params,
            BTreeSet::from(["name".to_string(), "cav".to_string()])
        );
    }

    #[test]
    fn test_body_parameters_skips_non_placeholders() {
        let params = body_parameters("{name} rdfs:label \"brace { inside }\" .");
        assert_eq!(params, BTreeSet::from(["name".to_string()]));
    }

    #[test]
    fn test_parameters_without_dependencies() {
        let library = empty_library();
        let params = zone().parameters(&library).expect("Should resolve");
        assert_eq!(
            params,
            BTreeSet::from(["name".to_string(), "cav".to_string()])
        );
    }

    #[test]
    fn test_parameters_include_dependencies() {
        let mut library = empty_library();
        library.insert(zone());
        let mut vav = Template::new(
            "vav",
            vec!["vav_name".to_string()],
            "{vav_name} a brick:VAV .",
        );
        vav.add_dependency("zone", vec![Some("vav_name".to_string()), None]);

        let params = vav.parameters(&library).expect("Should resolve");
        assert_eq!(
            params,
            BTreeSet::from([
                "vav_name".to_string(),
                "name".to_string(),
                "cav".to_string()
            ])
        );
    }

    #[test]
    fn test_dependency_parameters() {
        let mut library = empty_library();
        library.insert(zone());
        let mut vav = Template::new(
            "vav",
            vec!["vav_name".to_string()],
            "{vav_name} a brick:VAV .",
        );
        vav.add_dependency("zone", vec![Some("vav_name".to_string()), None]);

        let params = vav
            .dependency_parameters(&library)
            .expect("Should resolve");
        assert!(params.contains("vav_name"));
        assert!(params.contains("name"));
        assert!(params.contains("cav"));
    }

    #[test]
    fn test_dependency_for_parameter() {
        let mut vav = Template::new("vav", vec!["vav_name".to_string()], "");
        vav.add_dependency("zone", vec![Some("vav_name".to_string()), None]);
        assert_eq!(vav.dependency_for_parameter("vav_name"), Some("zone"));
        assert_eq!(vav.dependency_for_parameter("cav"), None);
    }

    #[test]
    fn test_unknown_dependency_is_an_error() {
        let library = empty_library();
        let mut t = Template::new("t", vec![], "{x} a brick:Thing .");
        t.add_dependency("missing", vec![Some("x".to_string())]);
        let result = t.parameters(&library);
        assert!(matches!(result, Err(TemplateError::NotFound { .. })));
    }

    #[test]
    fn test_to_inline_renames_everything_not_preserved() {
        let library = empty_library();
        let inlined = zone()
            .to_inline(&["name".to_string()], &library)
            .expect("Should inline");

        // preserved parameter untouched
        assert!(inlined.body.contains("{name}"));
        assert!(inlined.head.contains(&"name".to_string()));
        // the other parameter is renamed in body and head alike
        assert!(!inlined.body.contains("{cav}"));
        assert!(!inlined.head.contains(&"cav".to_string()));
        let renamed = inlined
            .head
            .iter()
            .find(|h| h.ends_with("_cav"))
            .expect("Should have a renamed form of cav");
        assert!(renamed.starts_with("zone-"));
        assert!(inlined.body.contains(&format!("{{{}}}", renamed)));
    }

    #[test]
    fn test_to_inline_uses_fresh_prefixes() {
        let library = empty_library();
        let first = zone().to_inline(&[], &library).expect("Should inline");
        let second = zone().to_inline(&[], &library).expect("Should inline");
        assert_ne!(first.head, second.head);
    }

    #[test]
    fn test_inline_dependencies_clears_deps() {
        let mut library = empty_library();
        library.insert(zone());
        let mut vav = Template::new(
            "vav",
            vec!["vav_name".to_string()],
            "{vav_name} a brick:VAV .",
        );
        vav.add_dependency("zone", vec![Some("vav_name".to_string()), None]);

        vav.inline_dependencies(&library).expect("Should inline");
        assert!(vav.deps.is_empty());
        // caller argument substituted into the dependency body
        assert!(!vav.body.contains("{name}"));
        assert!(vav.body.contains("{vav_name} a brick:HVAC_Zone"));
        // the unpassed parameter was renamed
        assert!(!vav.body.contains("{cav}"));
        assert!(vav.head.iter().any(|h| h.ends_with("_cav")));
        // head keeps declaration order and gains no duplicates
        assert_eq!(vav.head[0], "vav_name");
        assert_eq!(vav.head.len(), 2);
    }

    #[test]
    fn test_cyclic_dependency_fails_fast() {
        let mut library = empty_library();
        let mut a = Template::new("a", vec!["x".to_string()], "{x} a brick:A .");
        a.add_dependency("b", vec![Some("x".to_string())]);
        let mut b = Template::new("b", vec!["y".to_string()], "{y} a brick:B .");
        b.add_dependency("a", vec![Some("y".to_string())]);
        library.insert(a.clone());
        library.insert(b);

        let result = a.parameters(&library);
        assert!(matches!(
            result,
            Err(TemplateError::CircularDependency { .. })
        ));

        let mut copy = a.clone();
        let result = copy.inline_dependencies(&library);
        assert!(matches!(
            result,
            Err(TemplateError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_evaluate_partial_reduces_head() {
        let library = empty_library();
        let bindings = Bindings::from([("name".to_string(), "bldg:zone1".to_string())]);
        let partial = zone()
            .evaluate(&library, &bindings, &[])
            .expect("Should evaluate")
            .template()
            .expect("Should be partial");

        assert_eq!(partial.head, vec!["cav".to_string()]);
        assert!(partial.body.contains("bldg:zone1 a brick:HVAC_Zone"));
        assert!(partial.body.contains("{cav}"));
    }

    #[test]
    fn test_evaluate_classifies_by_set_membership_not_count() {
        let library = empty_library();
        // two bindings, but only one names a real parameter: still partial
        let bindings = Bindings::from([
            ("name".to_string(), "bldg:zone1".to_string()),
            ("unrelated".to_string(), "bldg:x".to_string()),
        ]);
        let result = zone()
            .evaluate(&library, &bindings, &[])
            .expect("Should evaluate");
        assert!(!result.is_complete());
    }

    #[test]
    fn test_evaluate_ignores_unknown_binding_names() {
        let library = empty_library();
        let bindings = Bindings::from([
            ("name".to_string(), "bldg:zone1".to_string()),
            ("cav".to_string(), "bldg:cav1".to_string()),
            ("unrelated".to_string(), "bldg:x".to_string()),
        ]);
        let result = zone()
            .evaluate(&library, &bindings, &[("bldg".to_string(), "urn:building/".to_string())])
            .expect("Should evaluate");
        assert!(result.is_complete());
    }

    #[test]
    fn test_evaluate_surfaces_parse_errors() {
        let library = empty_library();
        let bindings = Bindings::from([
            ("name".to_string(), "not a valid { token".to_string()),
            ("cav".to_string(), "bldg:cav1".to_string()),
        ]);
        let result = zone().evaluate(
            &library,
            &bindings,
            &[("bldg".to_string(), "urn:building/".to_string())],
        );
        assert!(matches!(result, Err(TemplateError::Render(_))));
    }

    #[test]
    fn test_fill_in_materializes() {
        let library = empty_library();
        let (bindings, graph) = zone()
            .fill_in(&library, "bldg", "urn:building/")
            .expect("Should fill in");
        assert_eq!(bindings.len(), 2);
        assert!(bindings["name"].starts_with("bldg:name_"));
        assert_eq!(graph.len(), 2);
    }
}
