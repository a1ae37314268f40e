//! Graft CLI
//!
//! Usage:
//!   graft <LIBRARY> [OPTIONS]
//!
//! Options:
//!   -t, --template <NAME>          Template to evaluate
//!   -b, --bind <PARAM=VALUE>       Bind a parameter (repeatable)
//!   -n, --namespace <PREFIX=IRI>   Register an extra namespace (repeatable)
//!   -f, --fill <PREFIX=IRI>        Auto-generate bindings under a namespace
//!   -i, --inline                   Inline dependencies before evaluating
//!   -s, --shapes                   Print the derived shape graph
//!   -l, --list                     List templates and their parameters

use std::path::PathBuf;
use std::process::exit;

use clap::Parser;

use graft::{Bindings, Evaluated, TemplateLibrary};

#[derive(Parser)]
#[command(name = "graft")]
#[command(about = "Parameterized templates for semantic graph construction")]
struct Cli {
    /// Template library: a YAML file or a directory of YAML files
    library: PathBuf,

    /// Template to evaluate
    #[arg(short, long)]
    template: Option<String>,

    /// Bind a parameter, e.g. --bind name=bldg:zone1
    #[arg(short, long, value_name = "PARAM=VALUE")]
    bind: Vec<String>,

    /// Register an extra namespace, e.g. --namespace bldg=urn:building/
    #[arg(short, long, value_name = "PREFIX=IRI")]
    namespace: Vec<String>,

    /// Auto-generate bindings for every parameter under a namespace,
    /// e.g. --fill bldg=urn:building/
    #[arg(short, long, value_name = "PREFIX=IRI")]
    fill: Option<String>,

    /// Inline template dependencies before evaluating
    #[arg(short, long)]
    inline: bool,

    /// Print the derived shape graph for the whole library
    #[arg(short, long)]
    shapes: bool,

    /// List templates and their parameters
    #[arg(short, long)]
    list: bool,
}

fn main() {
    let cli = Cli::parse();

    let library = if cli.library.is_dir() {
        TemplateLibrary::from_dir(&cli.library)
    } else {
        TemplateLibrary::from_file(&cli.library)
    };
    let library = match library {
        Ok(library) => library,
        Err(e) => {
            eprintln!("Error loading library '{}': {}", cli.library.display(), e);
            exit(1);
        }
    };

    if cli.list {
        for name in library.names() {
            let template = match library.primary(name) {
                Ok(template) => template,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    exit(1);
                }
            };
            match template.parameters(&library) {
                Ok(params) => {
                    let params: Vec<&str> = params.iter().map(|p| p.as_str()).collect();
                    println!("{}: {}", name, params.join(", "));
                }
                Err(e) => {
                    eprintln!("Error resolving '{}': {}", name, e);
                    exit(1);
                }
            }
        }
        return;
    }

    if cli.shapes {
        match library.get_shacl_shapes() {
            Ok(graph) => println!("{}", graph.to_turtle()),
            Err(e) => {
                eprintln!("Error deriving shapes: {}", e);
                exit(1);
            }
        }
        return;
    }

    let Some(template_name) = &cli.template else {
        eprintln!("Error: nothing to do; supply --template, --shapes, or --list");
        exit(1);
    };

    let mut template = match library.primary(template_name) {
        Ok(template) => template.clone(),
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    };

    if cli.inline {
        if let Err(e) = template.inline_dependencies(&library) {
            eprintln!("Error inlining '{}': {}", template_name, e);
            exit(1);
        }
    }

    let mut namespaces = Vec::new();
    for pair in &cli.namespace {
        namespaces.push(split_pair(pair, "--namespace"));
    }

    // --fill takes over when no explicit bindings are given
    if cli.bind.is_empty() {
        let Some(fill) = &cli.fill else {
            eprintln!("Error: supply --bind pairs or --fill to evaluate '{}'", template_name);
            exit(1);
        };
        let (prefix, iri) = split_pair(fill, "--fill");
        match template.fill_in(&library, &prefix, &iri) {
            Ok((_, graph)) => println!("{}", graph.to_turtle()),
            Err(e) => {
                eprintln!("Error evaluating '{}': {}", template_name, e);
                exit(1);
            }
        }
        return;
    }

    let mut bindings = Bindings::new();
    for pair in &cli.bind {
        let (param, value) = split_pair(pair, "--bind");
        bindings.insert(param, value);
    }

    match template.evaluate(&library, &bindings, &namespaces) {
        Ok(Evaluated::Complete(graph)) => println!("{}", graph.to_turtle()),
        Ok(Evaluated::Partial(partial)) => {
            let remaining = match partial.parameters(&library) {
                Ok(params) => params.into_iter().collect::<Vec<_>>().join(", "),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    exit(1);
                }
            };
            eprintln!(
                "Error: '{}' is not fully bound; unbound parameters: {}",
                template_name, remaining
            );
            exit(1);
        }
        Err(e) => {
            eprintln!("Error evaluating '{}': {}", template_name, e);
            exit(1);
        }
    }
}

/// Split a `key=value` argument, exiting with a usage error otherwise
fn split_pair(pair: &str, flag: &str) -> (String, String) {
    match pair.split_once('=') {
        Some((key, value)) => (key.to_string(), value.to_string()),
        None => {
            eprintln!("Error: {} expects KEY=VALUE, got '{}'", flag, pair);
            exit(1);
        }
    }
}
