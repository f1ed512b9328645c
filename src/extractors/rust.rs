use crate::extractors::base::{
    BaseExtractor, Entity, EntityKind, FileContext, LanguageRuleset, Owner,
};
use crate::extractors::registry::LanguageExtractor;
use tree_sitter::{Node, Tree};

/// Rust extractor
///
/// - structs, enums, unions and traits become types
/// - functions in `impl` and `trait` blocks become methods of the implementing type
/// - inline `mod name { .. }` blocks extend the scope chain
pub struct RustExtractor {
    ruleset: LanguageRuleset,
}

impl Default for RustExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RustExtractor {
    pub fn new() -> Self {
        Self {
            ruleset: LanguageRuleset {
                scope_separator: "::",
                module_prefixed: true,
            },
        }
    }
}

impl LanguageExtractor for RustExtractor {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_rust::LANGUAGE.into()
    }

    /// `src/net/mod.rs` -> `<project>::net`, `src/net/tcp.rs` -> `<project>::net::tcp`
    fn module_name(&self, relative_path: &str, project_name: &str) -> String {
        let without_ext = relative_path.strip_suffix(".rs").unwrap_or(relative_path);
        let mut segments: Vec<&str> = without_ext
            .split('/')
            .filter(|s| !s.is_empty() && *s != "src")
            .collect();
        if segments.last() == Some(&"mod") {
            segments.pop();
        }

        let mut parts: Vec<&str> = Vec::with_capacity(segments.len() + 1);
        if !project_name.is_empty() {
            parts.push(project_name);
        }
        parts.extend(segments);
        if parts.is_empty() {
            return without_ext.to_string();
        }
        parts.join("::")
    }

    fn extract(&self, context: &FileContext, tree: &Tree) -> Vec<Entity> {
        let walker = RustWalker {
            base: BaseExtractor::new(context, &self.ruleset),
        };
        let mut entities = Vec::new();
        walker.visit_items(tree.root_node(), &[], &mut entities);
        entities
    }
}

struct RustWalker<'a> {
    base: BaseExtractor<'a>,
}

impl RustWalker<'_> {
    /// Items of a source file or an inline module body
    fn visit_items(&self, node: Node, path: &[String], entities: &mut Vec<Entity>) {
        let mut cursor = node.walk();
        for item in node.named_children(&mut cursor) {
            match item.kind() {
                "struct_item" | "enum_item" | "union_item" => {
                    self.push_type(item, path, entities);
                }
                "trait_item" => {
                    if let Some(trait_qn) = self.push_type(item, path, entities) {
                        if let (Some(name), Some(body)) =
                            (self.base.field_text(&item, "name"), item.child_by_field_name("body"))
                        {
                            let mut scope = path.to_vec();
                            scope.push(name);
                            self.visit_methods(body, &scope, &trait_qn, entities);
                        }
                    }
                }
                "impl_item" => self.visit_impl(item, path, entities),
                "function_item" => {
                    let Some(name) = self.base.field_text(&item, "name") else {
                        continue;
                    };
                    entities.push(self.base.create_entity(
                        &item,
                        EntityKind::Function,
                        name.clone(),
                        self.base.qualify(path, &name),
                        Owner::Module,
                        true,
                        self.doc_comment(&item),
                    ));
                }
                "mod_item" => {
                    // `mod name;` lives in another file and is extracted there
                    if let (Some(name), Some(body)) =
                        (self.base.field_text(&item, "name"), item.child_by_field_name("body"))
                    {
                        let mut scope = path.to_vec();
                        scope.push(name);
                        self.visit_items(body, &scope, entities);
                    }
                }
                _ => {}
            }
        }
    }

    /// Returns the type's qualified name
    fn push_type(&self, node: Node, path: &[String], entities: &mut Vec<Entity>) -> Option<String> {
        let name = self.base.field_text(&node, "name")?;
        let qualified_name = self.base.qualify(path, &name);
        entities.push(self.base.create_entity(
            &node,
            EntityKind::Type,
            name,
            qualified_name.clone(),
            Owner::Module,
            true,
            self.doc_comment(&node),
        ));
        Some(qualified_name)
    }

    fn visit_impl(&self, node: Node, path: &[String], entities: &mut Vec<Entity>) {
        let type_name = node
            .child_by_field_name("type")
            .and_then(|t| self.impl_type_name(t));
        let Some(type_name) = type_name else {
            return;
        };
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let owner_qn = self.base.qualify(path, &type_name);
        let mut scope = path.to_vec();
        scope.push(type_name);
        self.visit_methods(body, &scope, &owner_qn, entities);
    }

    /// `Vec3`, `Vec3<T>`, `crate::geo::Vec3` -> `Vec3`
    fn impl_type_name(&self, type_node: Node) -> Option<String> {
        match type_node.kind() {
            "type_identifier" => Some(self.base.node_text(&type_node)),
            "generic_type" => self.impl_type_name(type_node.child_by_field_name("type")?),
            "scoped_type_identifier" => self.base.field_text(&type_node, "name"),
            // Blanket and reference impls have no single owning type
            _ => None,
        }
    }

    fn visit_methods(
        &self,
        body: Node,
        scope: &[String],
        owner_qn: &str,
        entities: &mut Vec<Entity>,
    ) {
        let mut cursor = body.walk();
        for item in body.named_children(&mut cursor) {
            let is_definition = match item.kind() {
                "function_item" => true,
                "function_signature_item" => false,
                _ => continue,
            };
            let Some(name) = self.base.field_text(&item, "name") else {
                continue;
            };
            entities.push(self.base.create_entity(
                &item,
                EntityKind::Method,
                name.clone(),
                self.base.qualify(scope, &name),
                Owner::Type(owner_qn.to_string()),
                is_definition,
                self.doc_comment(&item),
            ));
        }
    }

    fn doc_comment(&self, node: &Node) -> Option<String> {
        self.base
            .leading_comment_block_where(node, &["attribute_item"], |c| self.is_outer_doc(c))
    }

    /// `///` and `/** */` document the next item; `//`, `////` and `//!` do not
    fn is_outer_doc(&self, comment: &Node) -> bool {
        let mut cursor = comment.walk();
        if comment
            .children(&mut cursor)
            .any(|child| child.kind() == "outer_doc_comment_marker")
        {
            return true;
        }
        let text = self.base.node_text(comment);
        (text.starts_with("///") && !text.starts_with("////"))
            || (text.starts_with("/**") && !text.starts_with("/***") && text != "/**/")
    }
}
