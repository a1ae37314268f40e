//! Template libraries loaded from declarative YAML sources

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::graph::Graph;
use crate::template::{DependencyArgs, Template, TemplateError};

/// Errors that can occur when loading a template library
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to read template source: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse template source YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no templates defined under {src}")]
    Empty { src: String },
}

/// YAML structure for a single template definition
#[derive(Debug, Deserialize)]
struct RawTemplate {
    head: Vec<String>,
    body: String,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
}

#[derive(Debug, Deserialize)]
struct RawDependency {
    rule: String,
    args: DependencyArgs,
}

/// A library source is a sequence of mapping entries, each keyed by a
/// template name. `LinkedHashMap` keeps the written order so that load order
/// decides the primary variant when a name repeats.
type RawDocument = Vec<LinkedHashMap<String, RawTemplate>>;

/// A named, ordered collection of templates.
///
/// A name may carry several variants; lookup yields them in load order and
/// [`TemplateLibrary::primary`] returns the first. The collection is
/// read-only once loading has completed.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    name: String,
    templates: BTreeMap<String, Vec<Template>>,
}

impl TemplateLibrary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            templates: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load a library from YAML text
    pub fn from_yaml_str(name: impl Into<String>, source: &str) -> Result<Self, LibraryError> {
        let mut library = Self::new(name);
        library.load_yaml_str(source)?;
        Ok(library)
    }

    /// Load a library from a single YAML file; the file stem becomes the
    /// library name
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let source = fs::read_to_string(path)?;
        Self::from_yaml_str(name, &source)
    }

    /// Load every `.yml`/`.yaml` file under a directory (recursively) into
    /// one library. Files are visited in sorted order so the primary variant
    /// of a repeated name is deterministic.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut library = Self::new(name);

        let mut files = Vec::new();
        collect_yaml_files(path, &mut files)?;
        files.sort();
        for file in &files {
            let source = fs::read_to_string(file)?;
            library.load_yaml_str(&source)?;
        }

        if library.is_empty() {
            return Err(LibraryError::Empty {
                src: path.display().to_string(),
            });
        }
        Ok(library)
    }

    fn load_yaml_str(&mut self, source: &str) -> Result<(), LibraryError> {
        let document: RawDocument = serde_yaml::from_str(source)?;
        for entry in document {
            for (name, raw) in entry {
                let mut template = Template::new(name, raw.head, raw.body);
                for dep in raw.dependencies {
                    template.add_dependency(dep.rule, dep.args);
                }
                self.insert(template);
            }
        }
        Ok(())
    }

    /// Add a template. Part of loading; libraries are read-only afterwards.
    pub fn insert(&mut self, template: Template) {
        self.templates
            .entry(template.name.clone())
            .or_default()
            .push(template);
    }

    /// All variants registered under a name, in load order
    pub fn get(&self, name: &str) -> Option<&[Template]> {
        self.templates.get(name).map(|v| v.as_slice())
    }

    /// The primary (first-loaded) variant of a name
    pub fn primary(&self, name: &str) -> Result<&Template, TemplateError> {
        self.templates
            .get(name)
            .and_then(|variants| variants.first())
            .ok_or_else(|| TemplateError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }

    /// Every template in the library, variants included
    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.templates.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Derive the structural-constraint graph for every template in the
    /// library. Purely derived; recomputed on each call.
    pub fn get_shacl_shapes(&self) -> Result<Graph, TemplateError> {
        crate::shape::library_shapes(self)
    }
}

fn collect_yaml_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), std::io::Error> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_yaml_files(&path, files)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        ) {
            files.push(path);
        }
    }
    Ok(())
}
