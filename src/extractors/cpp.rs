use crate::extractors::base::{
    BaseExtractor, Entity, EntityKind, FileContext, LanguageRuleset, Owner, line_span,
};
use crate::extractors::registry::LanguageExtractor;
use tree_sitter::{Node, Tree};

/// C++ extractor (headers included)
///
/// Qualified names are namespace chains (`geo::Vec3::dot`), not prefixed by the
/// module, so a declaration in a header and its out-of-line definition in a
/// source file share one name.
pub struct CppExtractor {
    ruleset: LanguageRuleset,
}

impl Default for CppExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CppExtractor {
    pub fn new() -> Self {
        Self {
            ruleset: LanguageRuleset {
                scope_separator: "::",
                module_prefixed: false,
            },
        }
    }
}

impl LanguageExtractor for CppExtractor {
    fn name(&self) -> &'static str {
        "cpp"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cc", "cpp", "cxx", "c++", "h", "hh", "hpp", "hxx", "ipp"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_cpp::LANGUAGE.into()
    }

    /// Files have no language-level module name; the path is unique
    fn module_name(&self, relative_path: &str, _project_name: &str) -> String {
        relative_path.to_string()
    }

    fn extract(&self, context: &FileContext, tree: &Tree) -> Vec<Entity> {
        let walker = CppWalker {
            base: BaseExtractor::new(context, &self.ruleset),
        };
        let mut entities = Vec::new();
        walker.visit_children(tree.root_node(), &[], None, &mut entities);
        entities
    }
}

struct CppWalker<'a> {
    base: BaseExtractor<'a>,
}

impl CppWalker<'_> {
    /// `class_qn` is set while walking a class body
    fn visit_children(
        &self,
        node: Node,
        path: &[String],
        class_qn: Option<&str>,
        entities: &mut Vec<Entity>,
    ) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, path, class_qn, entities);
        }
    }

    fn visit(
        &self,
        node: Node,
        path: &[String],
        class_qn: Option<&str>,
        entities: &mut Vec<Entity>,
    ) {
        match node.kind() {
            "namespace_definition" => {
                let mut inner = path.to_vec();
                if let Some(name) = self.base.field_text(&node, "name") {
                    inner.extend(split_scope(&name));
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_children(body, &inner, None, entities);
                }
            }
            "linkage_specification" => {
                if let Some(body) = node.child_by_field_name("body") {
                    if body.kind() == "declaration_list" {
                        self.visit_children(body, path, class_qn, entities);
                    } else {
                        self.visit(body, path, class_qn, entities);
                    }
                }
            }
            "template_declaration" | "declaration_list" | "field_declaration_list" | "preproc_if"
            | "preproc_ifdef" | "preproc_else" | "preproc_elif" | "preproc_elifdef" | "ERROR" => {
                self.visit_children(node, path, class_qn, entities);
            }
            "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier" => {
                self.visit_type(node, path, entities);
            }
            "function_definition" => self.visit_function(node, path, class_qn, true, entities),
            "declaration" | "field_declaration" => {
                if let Some(type_node) = node.child_by_field_name("type") {
                    self.visit(type_node, path, class_qn, entities);
                }
                if find_function_declarator(node).is_some() {
                    self.visit_function(node, path, class_qn, false, entities);
                }
            }
            "type_definition" => {
                if let Some(type_node) = node.child_by_field_name("type") {
                    self.visit(type_node, path, class_qn, entities);
                }
            }
            _ => {}
        }
    }

    fn visit_type(&self, node: Node, path: &[String], entities: &mut Vec<Entity>) {
        // Forward declarations and anonymous types define nothing addressable
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let Some(raw_name) = self.base.field_text(&node, "name") else {
            return;
        };

        let mut segments = split_scope(&raw_name);
        let Some(name) = segments.pop() else {
            return;
        };
        let mut scope = path.to_vec();
        scope.extend(segments);
        let qualified_name = self.base.qualify(&scope, &name);

        let anchor = template_anchor(node);
        let docstring = self.base.leading_comment_block(&anchor, &[]);
        entities.push(self.base.create_entity(
            &anchor,
            EntityKind::Type,
            name.clone(),
            qualified_name.clone(),
            Owner::Module,
            true,
            docstring,
        ));

        if node.kind() != "enum_specifier" {
            scope.push(name);
            self.visit_children(body, &scope, Some(&qualified_name), entities);
        }
    }

    fn visit_function(
        &self,
        node: Node,
        path: &[String],
        class_qn: Option<&str>,
        is_definition: bool,
        entities: &mut Vec<Entity>,
    ) {
        let Some(declarator) = find_function_declarator(node) else {
            return;
        };
        let Some(name_node) = declarator.child_by_field_name("declarator") else {
            return;
        };

        let mut segments = split_scope(&self.base.node_text(&name_node));
        let Some(name) = segments.pop() else {
            return;
        };

        let anchor = template_anchor(node);
        let docstring = self.base.leading_comment_block(&anchor, &[]);

        let (kind, owner, qualified_name) = match class_qn {
            // Declared or defined inside the class body
            Some(class_qn) if segments.is_empty() => (
                EntityKind::Method,
                Owner::Type(class_qn.to_string()),
                self.base.qualify(path, &name),
            ),
            Some(_) => return,
            // Out-of-line member definition: `Type::method`
            None if !segments.is_empty() => {
                let mut scope = path.to_vec();
                scope.extend(segments);
                let owner_qn = scope.join(self.base.ruleset.scope_separator);
                (EntityKind::Method, Owner::Type(owner_qn), self.base.qualify(&scope, &name))
            }
            None => (EntityKind::Function, Owner::Module, self.base.qualify(path, &name)),
        };

        let (start_line, end_line) = line_span(&anchor);
        entities.push(Entity {
            kind,
            qualified_name,
            name,
            start_line,
            end_line,
            docstring,
            owner,
            is_definition,
        });
    }
}

/// Follow the declarator chain (pointers, references) down to the function declarator
fn find_function_declarator(node: Node) -> Option<Node> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        match current.kind() {
            "function_declarator" => return Some(current),
            "pointer_declarator" | "attributed_declarator" => {
                current = current.child_by_field_name("declarator")?;
            }
            // No declarator field on these; the inner declarator is the only named child
            "reference_declarator" | "parenthesized_declarator" => {
                current = current.named_child(0)?;
            }
            _ => return None,
        }
    }
}

/// Templates carry the comment and the span for the entity they wrap
fn template_anchor(node: Node) -> Node {
    match node.parent() {
        Some(parent) if parent.kind() == "template_declaration" => parent,
        _ => node,
    }
}

/// `::a::Vec<T>::dot` -> ["a", "Vec", "dot"]
fn split_scope(text: &str) -> Vec<String> {
    let compact: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = compact.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '<' if !current.trim_start().starts_with("operator") => depth += 1,
            '>' if depth > 0 => depth -= 1,
            ':' if depth == 0 && chars.peek() == Some(&':') => {
                chars.next();
                segments.push(std::mem::take(&mut current));
            }
            _ if depth == 0 => current.push(c),
            _ => {}
        }
    }
    segments.push(current);

    segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
