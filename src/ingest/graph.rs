//! Staged graph - nodes and edges ready to be written to the store
//!
//! Every node is addressed by its label plus a key that is unique within that
//! label. Code entities (modules, classes, functions, methods) are keyed by
//! qualified name and share one namespace; structural nodes use their own keys
//! (relative path for folders and files, dotted name for packages).

use crate::extractors::EntityKind;
use serde::Serialize;

/// Node label as stored in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeLabel {
    Project,
    Package,
    Folder,
    File,
    Module,
    Class,
    Function,
    Method,
    ExternalPackage,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Project => "Project",
            NodeLabel::Package => "Package",
            NodeLabel::Folder => "Folder",
            NodeLabel::File => "File",
            NodeLabel::Module => "Module",
            NodeLabel::Class => "Class",
            NodeLabel::Function => "Function",
            NodeLabel::Method => "Method",
            NodeLabel::ExternalPackage => "ExternalPackage",
        }
    }

    /// Modules, classes, functions and methods: resolvable by qualified name
    pub fn is_code_entity(&self) -> bool {
        matches!(
            self,
            NodeLabel::Module | NodeLabel::Class | NodeLabel::Function | NodeLabel::Method
        )
    }
}

impl From<EntityKind> for NodeLabel {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Module => NodeLabel::Module,
            EntityKind::Type => NodeLabel::Class,
            EntityKind::Function => NodeLabel::Function,
            EntityKind::Method => NodeLabel::Method,
        }
    }
}

/// Typed relationship between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Relation {
    /// Module -> Class or free Function
    Defines,
    /// Class -> Method
    DefinesMethod,
    /// Project or Folder -> top-level Package
    ContainsPackage,
    /// Package -> nested Package
    ContainsSubpackage,
    /// Project, Package or Folder -> Folder
    ContainsFolder,
    /// Project, Package or Folder -> Module
    ContainsModule,
    /// Project, Package or Folder -> File
    ContainsFile,
    /// Project -> ExternalPackage
    DependsOnExternal,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Defines => "DEFINES",
            Relation::DefinesMethod => "DEFINES_METHOD",
            Relation::ContainsPackage => "CONTAINS_PACKAGE",
            Relation::ContainsSubpackage => "CONTAINS_SUBPACKAGE",
            Relation::ContainsFolder => "CONTAINS_FOLDER",
            Relation::ContainsModule => "CONTAINS_MODULE",
            Relation::ContainsFile => "CONTAINS_FILE",
            Relation::DependsOnExternal => "DEPENDS_ON_EXTERNAL",
        }
    }

    /// DEFINES and DEFINES_METHOD: the single owner of a code entity
    pub fn is_ownership(&self) -> bool {
        matches!(self, Relation::Defines | Relation::DefinesMethod)
    }
}

/// Label plus key: the address of one node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeRef {
    pub label: NodeLabel,
    pub key: String,
}

impl NodeRef {
    pub fn new(label: NodeLabel, key: impl Into<String>) -> Self {
        Self {
            label,
            key: key.into(),
        }
    }
}

/// A node ready to be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub label: NodeLabel,
    /// Key within the label; the qualified name for code entities
    pub qualified_name: String,
    pub name: String,
    pub path: Option<String>,
    /// Set when the location lives outside the owner's file
    pub impl_path: Option<String>,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub docstring: Option<String>,
    pub language: Option<String>,
    /// File nodes: extension with its dot, empty when there is none
    pub extension: Option<String>,
    /// External packages: requirement as declared, e.g. `>=2.0`
    pub version_spec: Option<String>,
}

impl GraphNode {
    /// Node without a line range or language
    pub fn structural(
        label: NodeLabel,
        key: impl Into<String>,
        name: impl Into<String>,
        path: Option<String>,
    ) -> Self {
        Self {
            label,
            qualified_name: key.into(),
            name: name.into(),
            path,
            impl_path: None,
            start_line: None,
            end_line: None,
            docstring: None,
            language: None,
            extension: None,
            version_spec: None,
        }
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(self.label, self.qualified_name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub src: NodeRef,
    pub relation: Relation,
    pub dst: NodeRef,
}

impl GraphEdge {
    pub fn new(src: NodeRef, relation: Relation, dst: NodeRef) -> Self {
        Self { src, relation, dst }
    }
}

/// Output of `GraphBatch::stage`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Repeated declarations/definitions that were dropped
    pub duplicates: usize,
    /// Methods re-homed as module functions
    pub demoted: usize,
}

impl StagedGraph {
    pub fn count(&self, label: NodeLabel) -> usize {
        self.nodes.iter().filter(|n| n.label == label).count()
    }

    pub(crate) fn push_edge(&mut self, src: NodeRef, relation: Relation, dst: NodeRef) {
        self.edges.push(GraphEdge::new(src, relation, dst));
    }
}
