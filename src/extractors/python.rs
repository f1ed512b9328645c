use crate::extractors::base::{
    BaseExtractor, Entity, EntityKind, FileContext, LanguageRuleset, Owner,
};
use crate::extractors::registry::LanguageExtractor;
use tree_sitter::{Node, Tree};

/// Python extractor: classes, module-level functions and methods
pub struct PythonExtractor {
    ruleset: LanguageRuleset,
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PythonExtractor {
    pub fn new() -> Self {
        Self {
            ruleset: LanguageRuleset {
                scope_separator: ".",
                module_prefixed: true,
            },
        }
    }
}

/// What encloses the node currently being visited
#[derive(Debug, Clone)]
enum Scope {
    Module,
    Class(String),
}

impl LanguageExtractor for PythonExtractor {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    /// `pkg/sub/mod.py` -> `<project>.pkg.sub.mod`; `__init__.py` names its package
    fn module_name(&self, relative_path: &str, project_name: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !project_name.is_empty() {
            parts.push(project_name);
        }

        let segments: Vec<&str> = relative_path.split('/').filter(|s| !s.is_empty()).collect();
        if let Some((file_name, dirs)) = segments.split_last() {
            parts.extend(dirs.iter().copied());
            let stem = file_name
                .rsplit_once('.')
                .map(|(stem, _)| stem)
                .unwrap_or(file_name);
            if stem != "__init__" {
                parts.push(stem);
            }
        }
        parts.join(".")
    }

    fn extract(&self, context: &FileContext, tree: &Tree) -> Vec<Entity> {
        let walker = PythonWalker {
            base: BaseExtractor::new(context, &self.ruleset),
        };
        let mut entities = Vec::new();
        walker.visit_children(tree.root_node(), &[], &Scope::Module, &mut entities);
        entities
    }
}

struct PythonWalker<'a> {
    base: BaseExtractor<'a>,
}

impl PythonWalker<'_> {
    fn visit_children(
        &self,
        node: Node,
        path: &[String],
        scope: &Scope,
        entities: &mut Vec<Entity>,
    ) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, path, scope, entities);
        }
    }

    fn visit(&self, node: Node, path: &[String], scope: &Scope, entities: &mut Vec<Entity>) {
        match node.kind() {
            "decorated_definition" => {
                if let Some(definition) = node.child_by_field_name("definition") {
                    self.visit_definition(definition, node, path, scope, entities);
                }
            }
            "class_definition" | "function_definition" => {
                self.visit_definition(node, node, path, scope, entities);
            }
            _ => self.visit_children(node, path, scope, entities),
        }
    }

    /// `span` is the decorated wrapper when decorators are present
    fn visit_definition(
        &self,
        definition: Node,
        span: Node,
        path: &[String],
        scope: &Scope,
        entities: &mut Vec<Entity>,
    ) {
        let Some(name) = self.base.field_text(&definition, "name") else {
            return;
        };
        let qualified_name = self.base.qualify(path, &name);
        let docstring = self.extract_docstring(&definition);

        match (definition.kind(), scope) {
            ("class_definition", Scope::Module | Scope::Class(_)) => {
                let name_for_scope = name.clone();
                // Nested classes still hang off the module so DEFINES stays Module -> Type
                entities.push(self.base.create_entity(
                    &span,
                    EntityKind::Type,
                    name,
                    qualified_name.clone(),
                    Owner::Module,
                    true,
                    docstring,
                ));
                if let Some(body) = definition.child_by_field_name("body") {
                    let mut inner_path = path.to_vec();
                    inner_path.push(name_for_scope);
                    self.visit_children(body, &inner_path, &Scope::Class(qualified_name), entities);
                }
            }
            // Function bodies are never visited: anything defined there is local
            ("function_definition", Scope::Module) => {
                entities.push(self.base.create_entity(
                    &span,
                    EntityKind::Function,
                    name,
                    qualified_name,
                    Owner::Module,
                    true,
                    docstring,
                ));
            }
            ("function_definition", Scope::Class(class_qn)) => {
                entities.push(self.base.create_entity(
                    &span,
                    EntityKind::Method,
                    name,
                    qualified_name,
                    Owner::Type(class_qn.clone()),
                    true,
                    docstring,
                ));
            }
            _ => {}
        }
    }

    /// First string statement of a class or function body
    fn extract_docstring(&self, definition: &Node) -> Option<String> {
        let body = definition.child_by_field_name("body")?;
        let mut cursor = body.walk();
        let first = body.named_children(&mut cursor).find(|c| c.kind() != "comment")?;

        let string_node = match first.kind() {
            "expression_statement" => first.named_child(0).filter(|c| c.kind() == "string")?,
            "string" => first,
            _ => return None,
        };

        let text = strip_string_delimiters(&self.base.node_text(&string_node));
        let text = text.trim();
        if text.is_empty() { None } else { Some(text.to_string()) }
    }
}

/// Remove string prefixes (r, b, u, f) and single or triple quotes
fn strip_string_delimiters(raw: &str) -> String {
    let is_prefix = |c: char| matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F');
    let text = raw.trim_start_matches(is_prefix);
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if text.len() >= quote.len() * 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[quote.len()..text.len() - quote.len()].to_string();
        }
    }
    text.to_string()
}
