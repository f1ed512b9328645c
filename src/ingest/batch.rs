//! GraphBatch - merges per-file extractions into one consistent node/edge set
//!
//! Files are merged in sorted path order so the result never depends on parse
//! scheduling. A qualified name seen more than once is merged from at most one
//! declaration and one definition:
//!
//! - the declaration (or, lacking one, the definition) supplies kind and owner
//! - the definition (or, lacking one, the declaration) supplies the location
//! - a location outside the owner's file is recorded as `impl_path`
//!
//! A second declaration or a second definition of the same name is dropped and
//! counted, so a qualified name is stored at most once across all languages.
//! Methods whose owning type never appeared are re-homed as functions of their
//! file's module, so every class, function and method has exactly one owner.
//! Modules hang off the package or folder holding their file.

use super::graph::{GraphNode, NodeLabel, NodeRef, Relation, StagedGraph};
use super::structure::{ExternalDependency, RepositoryLayout, file_name};
use crate::extractors::{Entity, EntityKind, FileExtraction, ModuleInfo, Owner};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Per-file extractions awaiting merge, plus the repository layout around them
#[derive(Debug, Default)]
pub struct GraphBatch {
    project_name: String,
    layout: RepositoryLayout,
    files: Vec<FileExtraction>,
}

/// One sighting of an entity together with the file it came from
#[derive(Clone, Copy)]
struct Sighting<'a> {
    entity: &'a Entity,
    file: &'a ModuleInfo,
}

#[derive(Default)]
struct Merged<'a> {
    declaration: Option<Sighting<'a>>,
    definition: Option<Sighting<'a>>,
}

impl<'a> Merged<'a> {
    /// Supplies kind and owner
    fn shape(&self) -> Option<Sighting<'a>> {
        self.declaration.or(self.definition)
    }

    /// Supplies the line range
    fn location(&self) -> Option<Sighting<'a>> {
        self.definition.or(self.declaration)
    }

    fn docstring(&self) -> Option<String> {
        self.definition
            .and_then(|s| s.entity.docstring.clone())
            .or_else(|| self.declaration.and_then(|s| s.entity.docstring.clone()))
    }
}

impl GraphBatch {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    pub fn add_file(&mut self, extraction: FileExtraction) {
        self.layout.add_file(&extraction.module.path);
        self.files.push(extraction);
    }

    /// A directory seen by the walk, possibly empty
    pub fn record_directory(&mut self, relative_path: &str) {
        self.layout.add_directory(relative_path);
    }

    /// Any file seen by the walk, parsed or not
    pub fn record_file(&mut self, relative_path: &str) {
        self.layout.add_file(relative_path);
    }

    pub fn add_dependencies(&mut self, dependencies: Vec<ExternalDependency>) {
        self.layout.add_dependencies(dependencies);
    }

    /// Merge every file into nodes and edges
    pub fn stage(mut self) -> StagedGraph {
        self.files.sort_by(|a, b| a.module.path.cmp(&b.module.path));

        let mut staged = StagedGraph::default();
        let containers = self.layout.stage(&self.project_name, &mut staged);

        // Modules claim their names before any entity can
        let mut modules: BTreeMap<&str, &ModuleInfo> = BTreeMap::new();
        for file in &self.files {
            let module = &file.module;
            if let Some(existing) = modules.get(module.qualified_name.as_str()) {
                warn!(
                    "Module {} is defined by both {} and {}; keeping {}",
                    module.qualified_name, existing.path, module.path, existing.path
                );
                staged.duplicates += 1;
                continue;
            }
            modules.insert(&module.qualified_name, module);
        }

        let mut merged: BTreeMap<&str, Merged> = BTreeMap::new();
        for file in &self.files {
            for entity in &file.entities {
                let qn = entity.qualified_name.as_str();
                if modules.contains_key(qn) {
                    warn!("{} in {} collides with a module name; skipped", qn, file.module.path);
                    staged.duplicates += 1;
                    continue;
                }

                let slot = merged.entry(qn).or_default();
                let target = if entity.is_definition {
                    &mut slot.definition
                } else {
                    &mut slot.declaration
                };
                match *target {
                    Some(first) => {
                        let what = if entity.is_definition { "definition" } else { "declaration" };
                        warn!(
                            "Duplicate {} of {} in {} (keeping {}:{})",
                            what, qn, file.module.path, first.file.path, first.entity.start_line
                        );
                        staged.duplicates += 1;
                    }
                    None => *target = Some(Sighting { entity, file: &file.module }),
                }
            }
        }

        for module in modules.values() {
            let mut node = GraphNode::structural(
                NodeLabel::Module,
                module.qualified_name.as_str(),
                module_display_name(&module.path),
                Some(module.path.clone()),
            );
            node.start_line = Some(1);
            node.end_line = Some(module.line_count.max(1));
            node.language = Some(module.language.clone());
            let module_ref = node.node_ref();
            staged.nodes.push(node);
            staged.push_edge(
                containers.of_file(&module.path),
                Relation::ContainsModule,
                module_ref,
            );
        }

        // Types first: methods need their owner's file to decide impl_path
        let mut type_paths: HashMap<&str, &str> = HashMap::new();
        for (qn, entry) in &merged {
            let (Some(shape), Some(location)) = (entry.shape(), entry.location()) else {
                continue;
            };
            if shape.entity.kind != EntityKind::Type {
                continue;
            }
            let module_qn = shape.file.qualified_name.as_str();
            let owner_file = modules.get(module_qn).map(|m| m.path.as_str());

            type_paths.insert(*qn, location.file.path.as_str());
            staged.nodes.push(node(
                qn,
                shape,
                location,
                entry,
                EntityKind::Type,
                Some(location.file.path.clone()),
                owner_file,
            ));
            staged.push_edge(
                NodeRef::new(NodeLabel::Module, module_qn),
                Relation::Defines,
                NodeRef::new(NodeLabel::Class, *qn),
            );
        }

        for (qn, entry) in &merged {
            let (Some(shape), Some(location)) = (entry.shape(), entry.location()) else {
                continue;
            };
            if shape.entity.kind == EntityKind::Type {
                continue;
            }
            let module_qn = shape.file.qualified_name.as_str();

            let module = NodeRef::new(NodeLabel::Module, module_qn);
            let (kind, src, relation, owner_file) = match &shape.entity.owner {
                Owner::Type(type_qn) => match type_paths.get(type_qn.as_str()) {
                    Some(type_path) => (
                        EntityKind::Method,
                        NodeRef::new(NodeLabel::Class, type_qn.as_str()),
                        Relation::DefinesMethod,
                        Some(*type_path),
                    ),
                    None => {
                        debug!(
                            "Owner {} of {} not found; recording it as a function of {}",
                            type_qn, qn, module_qn
                        );
                        staged.demoted += 1;
                        (
                            EntityKind::Function,
                            module,
                            Relation::Defines,
                            modules.get(module_qn).map(|m| m.path.as_str()),
                        )
                    }
                },
                Owner::Module => (
                    EntityKind::Function,
                    module,
                    Relation::Defines,
                    modules.get(module_qn).map(|m| m.path.as_str()),
                ),
            };

            staged.nodes.push(node(qn, shape, location, entry, kind, None, owner_file));
            staged.push_edge(src, relation, NodeRef::new(kind.into(), *qn));
        }

        staged
    }
}

fn node(
    qualified_name: &str,
    shape: Sighting<'_>,
    location: Sighting<'_>,
    entry: &Merged<'_>,
    kind: EntityKind,
    path: Option<String>,
    owner_file: Option<&str>,
) -> GraphNode {
    let location_file = location.file.path.as_str();
    let impl_path = (owner_file != Some(location_file)).then(|| location_file.to_string());

    GraphNode {
        label: kind.into(),
        qualified_name: qualified_name.to_string(),
        name: shape.entity.name.clone(),
        path,
        impl_path,
        start_line: Some(location.entity.start_line),
        end_line: Some(location.entity.end_line.max(location.entity.start_line)),
        docstring: entry.docstring(),
        language: Some(location.file.language.clone()),
        extension: None,
        version_spec: None,
    }
}

/// File name without extension, e.g. `math/vec.cc` -> `vec`
fn module_display_name(path: &str) -> String {
    let file_name = file_name(path);
    file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(file_name)
        .to_string()
}
