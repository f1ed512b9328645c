//! Repository structure - project, packages, folders, files and dependencies
//!
//! A directory holding `__init__.py` is a Python package; any other directory
//! is a folder. Packages, folders, files and modules each have exactly one
//! container: the package or folder they sit in, or the project at the root.
//! Dependencies declared in `pyproject.toml` become external packages of the
//! project.

use super::graph::{GraphNode, NodeLabel, NodeRef, Relation, StagedGraph};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const PYPROJECT_FILE: &str = "pyproject.toml";
const PACKAGE_MARKER: &str = "__init__.py";

/// Distribution name at the start of a PEP 508 requirement
static REQUIREMENT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)").unwrap());

/// A third-party package the project declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalDependency {
    pub name: String,
    /// Requirement as written, without the name; empty when unconstrained
    pub version_spec: String,
}

/// Dependencies declared by one `pyproject.toml`
///
/// Poetry's `[tool.poetry.dependencies]` table takes precedence over the
/// PEP 621 `[project].dependencies` list. The `python` entry constrains the
/// interpreter and is not a package.
pub fn parse_pyproject(content: &str) -> Result<Vec<ExternalDependency>, toml::de::Error> {
    let document: toml::Table = toml::from_str(content)?;
    let mut dependencies = Vec::new();

    let poetry = document
        .get("tool")
        .and_then(|tool| tool.get("poetry"))
        .and_then(|poetry| poetry.get("dependencies"))
        .and_then(toml::Value::as_table);
    let pep621 = document
        .get("project")
        .and_then(|project| project.get("dependencies"))
        .and_then(toml::Value::as_array);

    if let Some(table) = poetry {
        for (name, spec) in table {
            if name.eq_ignore_ascii_case("python") {
                continue;
            }
            let version_spec = match spec {
                toml::Value::String(version) => version.clone(),
                other => other.to_string(),
            };
            dependencies.push(ExternalDependency {
                name: name.clone(),
                version_spec,
            });
        }
    } else if let Some(requirements) = pep621 {
        for requirement in requirements.iter().filter_map(toml::Value::as_str) {
            let captures = REQUIREMENT_NAME_RE.captures(requirement);
            let Some(name) = captures.and_then(|c| c.get(1)) else {
                warn!("Ignoring unparseable requirement '{}'", requirement);
                continue;
            };
            if name.as_str().eq_ignore_ascii_case("python") {
                continue;
            }
            dependencies.push(ExternalDependency {
                name: name.as_str().to_string(),
                version_spec: requirement[name.end()..].trim().to_string(),
            });
        }
    }

    Ok(dependencies)
}

/// Directories, files and declared dependencies of one repository
#[derive(Debug, Default)]
pub struct RepositoryLayout {
    directories: BTreeSet<String>,
    files: BTreeSet<String>,
    dependencies: Vec<ExternalDependency>,
}

/// Which node holds the contents of each directory
#[derive(Debug)]
pub struct Containers {
    project: NodeRef,
    by_dir: BTreeMap<String, NodeRef>,
}

impl Containers {
    /// Container of whatever sits directly in `dir` (`""` is the root)
    pub fn of_dir(&self, dir: &str) -> NodeRef {
        self.by_dir
            .get(dir)
            .cloned()
            .unwrap_or_else(|| self.project.clone())
    }

    /// Container of the file at `relative_path`
    pub fn of_file(&self, relative_path: &str) -> NodeRef {
        self.of_dir(parent_dir(relative_path))
    }
}

impl RepositoryLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a directory and all of its ancestors
    pub fn add_directory(&mut self, relative_path: &str) {
        let mut current = relative_path.trim_matches('/');
        while !current.is_empty() {
            if !self.directories.insert(current.to_string()) {
                break;
            }
            current = parent_dir(current);
        }
    }

    /// Record a file and the directories above it
    pub fn add_file(&mut self, relative_path: &str) {
        self.add_directory(parent_dir(relative_path));
        self.files.insert(relative_path.to_string());
    }

    /// The first declaration of a name wins
    pub fn add_dependencies(&mut self, dependencies: impl IntoIterator<Item = ExternalDependency>) {
        for dependency in dependencies {
            if let Some(kept) = self.dependencies.iter().find(|d| d.name == dependency.name) {
                debug!(
                    "Dependency {} declared again as '{}'; keeping '{}'",
                    dependency.name, dependency.version_spec, kept.version_spec
                );
                continue;
            }
            self.dependencies.push(dependency);
        }
    }

    fn is_package(&self, dir: &str) -> bool {
        let marker = if dir.is_empty() {
            PACKAGE_MARKER.to_string()
        } else {
            format!("{dir}/{PACKAGE_MARKER}")
        };
        self.files.contains(&marker)
    }

    /// Emit structural nodes and containment edges into `staged`
    pub fn stage(&self, project_name: &str, staged: &mut StagedGraph) -> Containers {
        let project = NodeRef::new(NodeLabel::Project, project_name);
        staged.nodes.push(GraphNode::structural(
            NodeLabel::Project,
            project_name,
            project_name,
            None,
        ));

        let mut by_dir: BTreeMap<String, NodeRef> = BTreeMap::new();
        let mut package_names: BTreeSet<String> = BTreeSet::new();

        if self.is_package("") {
            let root_package = NodeRef::new(NodeLabel::Package, project_name);
            staged.nodes.push(GraphNode::structural(
                NodeLabel::Package,
                project_name,
                project_name,
                Some(".".to_string()),
            ));
            staged.push_edge(project.clone(), Relation::ContainsPackage, root_package.clone());
            package_names.insert(project_name.to_string());
            by_dir.insert(String::new(), root_package);
        }

        // Sorted order visits every directory after its parent
        for dir in &self.directories {
            let parent = by_dir
                .get(parent_dir(dir))
                .cloned()
                .unwrap_or_else(|| project.clone());
            let name = file_name(dir);

            let package_name = self.is_package(dir).then(|| dotted_name(project_name, dir));
            let container = match package_name {
                Some(qn) if package_names.insert(qn.clone()) => {
                    let relation = if parent.label == NodeLabel::Package {
                        Relation::ContainsSubpackage
                    } else {
                        Relation::ContainsPackage
                    };
                    let package = NodeRef::new(NodeLabel::Package, qn.as_str());
                    staged.nodes.push(GraphNode::structural(
                        NodeLabel::Package,
                        qn,
                        name,
                        Some(dir.clone()),
                    ));
                    staged.push_edge(parent, relation, package.clone());
                    package
                }
                taken => {
                    if let Some(qn) = taken {
                        warn!(
                            "Package name {} of {} is already taken; recording a folder",
                            qn, dir
                        );
                    }
                    let folder = NodeRef::new(NodeLabel::Folder, dir.as_str());
                    staged.nodes.push(GraphNode::structural(
                        NodeLabel::Folder,
                        dir.as_str(),
                        name,
                        Some(dir.clone()),
                    ));
                    staged.push_edge(parent, Relation::ContainsFolder, folder.clone());
                    folder
                }
            };
            by_dir.insert(dir.clone(), container);
        }

        let containers = Containers { project, by_dir };

        for file in &self.files {
            let mut node = GraphNode::structural(
                NodeLabel::File,
                file.as_str(),
                file_name(file),
                Some(file.clone()),
            );
            node.extension = Some(extension(file));
            staged.nodes.push(node);
            staged.push_edge(
                containers.of_file(file),
                Relation::ContainsFile,
                NodeRef::new(NodeLabel::File, file.as_str()),
            );
        }

        for dependency in &self.dependencies {
            let mut node = GraphNode::structural(
                NodeLabel::ExternalPackage,
                dependency.name.as_str(),
                dependency.name.as_str(),
                None,
            );
            node.version_spec = Some(dependency.version_spec.clone());
            staged.nodes.push(node);
            staged.push_edge(
                containers.project.clone(),
                Relation::DependsOnExternal,
                NodeRef::new(NodeLabel::ExternalPackage, dependency.name.as_str()),
            );
        }

        containers
    }
}

/// `pkg/sub/mod.py` -> `pkg/sub`; top-level entries -> `""`
pub(super) fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

pub(super) fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `.py` for `pkg/mod.py`; empty for `Makefile` and `.gitignore`
fn extension(path: &str) -> String {
    match file_name(path).rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!(".{ext}"),
        _ => String::new(),
    }
}

/// `pkg/sub` under project `proj` -> `proj.pkg.sub`
fn dotted_name(project_name: &str, dir: &str) -> String {
    std::iter::once(project_name)
        .filter(|name| !name.is_empty())
        .chain(dir.split('/'))
        .collect::<Vec<_>>()
        .join(".")
}
