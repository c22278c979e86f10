//! Declaration index of a C# document
//!
//! Collects what binding needs without keeping nodes alive: usings, type
//! and member declarations with their name positions, type references for
//! diagnostics, and syntax problems reported by tree-sitter.

use std::collections::HashSet;
use std::ops::Range;

use tree_sitter::{Node, Tree};

use super::{LineIndex, node_text};
use crate::models::symbol::{Position, SymbolId, SymbolKind};

pub const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "struct_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

pub const ACCESSOR_KEYWORDS: &[&str] = &["get", "set", "init", "add", "remove"];

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub namespace: String,
    pub name: String,
    /// Namespace-qualified name; nested types include their outer types.
    pub full_name: String,
    pub kind: SymbolKind,
    pub name_position: Position,
    pub is_partial: bool,
    pub base_types: Vec<String>,
    pub members: Vec<MemberDecl>,
    pub byte_range: Range<usize>,
}

impl TypeDecl {
    pub fn symbol_id(&self) -> SymbolId {
        SymbolId::for_type(&self.full_name)
    }
}

#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub name: String,
    pub kind: SymbolKind,
    /// Return type of methods; value type of properties, fields and events.
    pub ty: Option<String>,
    pub parameters: Vec<ParameterDecl>,
    pub accessors: Vec<AccessorDecl>,
    pub is_partial: bool,
    pub has_body: bool,
    pub name_position: Position,
    pub byte_range: Range<usize>,
}

impl MemberDecl {
    pub fn parameter_types(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn symbol_id(&self, container: &str) -> SymbolId {
        SymbolId::for_member(self.kind, container, &self.name, &self.parameter_types())
    }
}

#[derive(Debug, Clone)]
pub struct ParameterDecl {
    pub name: String,
    pub ty: String,
    pub name_position: Position,
}

#[derive(Debug, Clone)]
pub struct AccessorDecl {
    pub keyword: String,
    pub position: Position,
}

/// A type name written in a type position.
#[derive(Debug, Clone)]
pub struct TypeReference {
    pub name: String,
    pub namespace: String,
    /// Full name of the type whose body contains the reference.
    pub container: Option<String>,
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone)]
pub struct SyntaxIssue {
    pub start: Position,
    pub end: Position,
    /// Kind of the token tree-sitter had to insert, if any.
    pub missing: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    pub usings: Vec<String>,
    pub types: Vec<TypeDecl>,
    pub type_references: Vec<TypeReference>,
    pub type_parameters: HashSet<String>,
    pub syntax_issues: Vec<SyntaxIssue>,
}

impl DocumentIndex {
    pub fn build(tree: &Tree, text: &str, lines: &LineIndex) -> Self {
        let mut builder = IndexBuilder {
            text,
            lines,
            index: DocumentIndex::default(),
            containers: Vec::new(),
        };
        let root = tree.root_node();
        builder.visit_unit(root);
        if root.has_error() {
            builder.collect_issues(root);
        }
        builder.index
    }

    /// Innermost type declaration containing `byte`.
    pub fn enclosing_type(&self, byte: usize) -> Option<&TypeDecl> {
        self.types
            .iter()
            .filter(|t| t.byte_range.contains(&byte))
            .min_by_key(|t| t.byte_range.len())
    }

    /// Member declaration containing `byte` within `ty`.
    pub fn enclosing_member<'a>(&self, ty: &'a TypeDecl, byte: usize) -> Option<&'a MemberDecl> {
        ty.members
            .iter()
            .filter(|m| m.byte_range.contains(&byte))
            .min_by_key(|m| m.byte_range.len())
    }
}

struct IndexBuilder<'a> {
    text: &'a str,
    lines: &'a LineIndex,
    index: DocumentIndex,
    containers: Vec<String>,
}

impl IndexBuilder<'_> {
    fn position(&self, node: Node<'_>) -> Position {
        self.lines.position(self.text, node.start_position())
    }

    fn end_position(&self, node: Node<'_>) -> Position {
        self.lines.position(self.text, node.end_position())
    }

    fn visit_unit(&mut self, root: Node<'_>) {
        let mut namespace = String::new();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if child.kind() == "file_scoped_namespace_declaration" {
                if let Some(name) = child.child_by_field_name("name") {
                    namespace = compact(node_text(name, self.text));
                }
                self.visit_children(child, &namespace);
            } else {
                self.visit(child, &namespace);
            }
        }
    }

    fn visit_children(&mut self, node: Node<'_>, namespace: &str) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, namespace);
        }
    }

    fn visit(&mut self, node: Node<'_>, namespace: &str) {
        match node.kind() {
            "using_directive" => self.visit_using(node),
            "namespace_declaration" => {
                let Some(name) = node.child_by_field_name("name") else {
                    return;
                };
                let nested = qualify(namespace, &compact(node_text(name, self.text)));
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_children(body, &nested);
                }
            }
            kind if TYPE_DECLARATION_KINDS.contains(&kind) => {
                self.visit_type(node, namespace, None);
            }
            "comment" => {}
            _ => self.visit_children(node, namespace),
        }
    }

    fn visit_using(&mut self, node: Node<'_>) {
        if node.child_by_field_name("name").is_some() {
            // alias directive
            return;
        }
        let mut cursor = node.walk();
        let target = node
            .named_children(&mut cursor)
            .find(|c| matches!(c.kind(), "identifier" | "qualified_name"));
        if let Some(target) = target {
            self.index.usings.push(compact(node_text(target, self.text)));
        }
    }

    fn visit_type(&mut self, node: Node<'_>, namespace: &str, outer: Option<&str>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.text).to_string();
        let full_name = match outer {
            Some(outer) => format!("{}.{}", outer, name),
            None => qualify(namespace, &name),
        };
        let kind = match node.kind() {
            "struct_declaration" => SymbolKind::Struct,
            "interface_declaration" => SymbolKind::Interface,
            "enum_declaration" => SymbolKind::Enum,
            _ => SymbolKind::Class,
        };

        self.collect_type_parameters(node);

        let mut base_types = Vec::new();
        let mut cursor = node.walk();
        let base_list = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "base_list");
        if let Some(base_list) = base_list {
            let mut cursor = base_list.walk();
            for base in base_list.named_children(&mut cursor) {
                if let Some(name) = self.reference(base, namespace) {
                    base_types.push(name);
                }
            }
        }

        self.containers.push(full_name.clone());
        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                if TYPE_DECLARATION_KINDS.contains(&child.kind()) {
                    self.visit_type(child, namespace, Some(&full_name));
                } else {
                    self.visit_member(child, namespace, &mut members);
                }
            }
        }
        self.containers.pop();

        self.index.types.push(TypeDecl {
            namespace: namespace.to_string(),
            name,
            full_name,
            kind,
            name_position: self.position(name_node),
            is_partial: has_modifier(node, "partial", self.text),
            base_types,
            members,
            byte_range: node.byte_range(),
        });
    }

    fn visit_member(&mut self, node: Node<'_>, namespace: &str, members: &mut Vec<MemberDecl>) {
        let kind = match node.kind() {
            "method_declaration" => SymbolKind::Method,
            "constructor_declaration" => SymbolKind::Constructor,
            "property_declaration" => SymbolKind::Property,
            "event_declaration" => SymbolKind::Event,
            "enum_member_declaration" => SymbolKind::EnumMember,
            "field_declaration" => {
                self.visit_fields(node, namespace, SymbolKind::Field, members);
                return;
            }
            "event_field_declaration" => {
                self.visit_fields(node, namespace, SymbolKind::Event, members);
                return;
            }
            _ => return,
        };
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };

        let ty = node
            .child_by_field_name("returns")
            .or_else(|| node.child_by_field_name("type"));
        let ty = ty.map(|t| {
            self.reference(t, namespace);
            compact(node_text(t, self.text))
        });

        self.collect_type_parameters(node);
        let parameters = node
            .child_by_field_name("parameters")
            .map(|list| self.parameters(list, namespace))
            .unwrap_or_default();

        let accessors = node
            .child_by_field_name("accessors")
            .map(|list| self.accessors(list))
            .unwrap_or_default();

        let body = node.child_by_field_name("body").or_else(|| {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .find(|c| matches!(c.kind(), "block" | "arrow_expression_clause"))
        });
        if let Some(body) = body {
            self.collect_body_references(body, namespace);
        }

        members.push(MemberDecl {
            name: node_text(name_node, self.text).to_string(),
            kind,
            ty,
            parameters,
            accessors,
            is_partial: has_modifier(node, "partial", self.text),
            has_body: body.is_some(),
            name_position: self.position(name_node),
            byte_range: node.byte_range(),
        });
    }

    fn visit_fields(
        &mut self,
        node: Node<'_>,
        namespace: &str,
        kind: SymbolKind,
        members: &mut Vec<MemberDecl>,
    ) {
        let mut cursor = node.walk();
        let Some(declaration) = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "variable_declaration")
        else {
            return;
        };
        let ty = declaration.child_by_field_name("type").map(|t| {
            self.reference(t, namespace);
            compact(node_text(t, self.text))
        });

        let mut cursor = declaration.walk();
        for declarator in declaration.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = declarator_name(declarator) else {
                continue;
            };
            self.collect_body_references(declarator, namespace);
            members.push(MemberDecl {
                name: node_text(name_node, self.text).to_string(),
                kind,
                ty: ty.clone(),
                parameters: Vec::new(),
                accessors: Vec::new(),
                is_partial: false,
                has_body: false,
                name_position: self.position(name_node),
                byte_range: node.byte_range(),
            });
        }
    }

    fn parameters(&mut self, list: Node<'_>, namespace: &str) -> Vec<ParameterDecl> {
        let mut parameters = Vec::new();
        let mut cursor = list.walk();
        for parameter in list.named_children(&mut cursor) {
            if parameter.kind() != "parameter" {
                continue;
            }
            let Some(name_node) = parameter.child_by_field_name("name") else {
                continue;
            };
            let ty = parameter
                .child_by_field_name("type")
                .map(|t| {
                    self.reference(t, namespace);
                    compact(node_text(t, self.text))
                })
                .unwrap_or_default();
            parameters.push(ParameterDecl {
                name: node_text(name_node, self.text).to_string(),
                ty,
                name_position: self.position(name_node),
            });
        }
        parameters
    }

    fn accessors(&mut self, list: Node<'_>) -> Vec<AccessorDecl> {
        let mut accessors = Vec::new();
        let mut cursor = list.walk();
        for accessor in list.named_children(&mut cursor) {
            if accessor.kind() != "accessor_declaration" {
                continue;
            }
            if let Some(keyword) = accessor_keyword(accessor) {
                accessors.push(AccessorDecl {
                    keyword: keyword.kind().to_string(),
                    position: self.position(keyword),
                });
            }
        }
        accessors
    }

    fn collect_type_parameters(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let list = node
            .child_by_field_name("type_parameters")
            .or_else(|| {
                node.named_children(&mut cursor)
                    .find(|c| c.kind() == "type_parameter_list")
            });
        let Some(list) = list else {
            return;
        };
        let mut cursor = list.walk();
        for parameter in list.named_children(&mut cursor) {
            let name = parameter.child_by_field_name("name").or_else(|| {
                let mut inner = parameter.walk();
                parameter
                    .named_children(&mut inner)
                    .find(|c| c.kind() == "identifier")
            });
            if let Some(name) = name {
                self.index
                    .type_parameters
                    .insert(node_text(name, self.text).to_string());
            }
        }
    }

    /// Type references inside executable code: local declarations and `new` expressions.
    fn collect_body_references(&mut self, body: Node<'_>, namespace: &str) {
        let mut cursor = body.walk();
        let mut stack = vec![body];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "variable_declaration" | "object_creation_expression" => {
                    if let Some(ty) = node.child_by_field_name("type") {
                        self.reference(ty, namespace);
                    }
                }
                "local_function_statement" | "lambda_expression" => {
                    self.collect_type_parameters(node);
                }
                _ => {}
            }
            stack.extend(node.named_children(&mut cursor));
        }
    }

    /// Record a type reference and return the referenced name.
    fn reference(&mut self, node: Node<'_>, namespace: &str) -> Option<String> {
        let target = type_name_node(node)?;
        let name = compact(node_text(target, self.text));
        if matches!(name.as_str(), "var" | "dynamic") {
            return None;
        }
        self.index.type_references.push(TypeReference {
            name: name.clone(),
            namespace: namespace.to_string(),
            container: self.containers.last().cloned(),
            start: self.position(target),
            end: self.end_position(target),
        });
        Some(name)
    }

    fn collect_issues(&mut self, root: Node<'_>) {
        let mut cursor = root.walk();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_missing() {
                self.index.syntax_issues.push(SyntaxIssue {
                    start: self.position(node),
                    end: self.end_position(node),
                    missing: Some(node.kind().to_string()),
                });
            } else if node.is_error() {
                self.index.syntax_issues.push(SyntaxIssue {
                    start: self.position(node),
                    end: self.end_position(node),
                    missing: None,
                });
                continue;
            }
            if node.has_error() {
                stack.extend(node.children(&mut cursor));
            }
        }
        self.index.syntax_issues.sort_by_key(|issue| issue.start);
    }
}

/// The name part of a type syntax node, skipping predefined and implicit types.
pub fn type_name_node(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "identifier" | "qualified_name" | "generic_name" => Some(node),
        "nullable_type" | "array_type" | "pointer_type" | "ref_type" | "scoped_type" => {
            let inner = node.child_by_field_name("type").or_else(|| {
                let mut cursor = node.walk();
                node.named_children(&mut cursor).next()
            })?;
            type_name_node(inner)
        }
        "primary_constructor_base_type" => {
            let inner = node.child_by_field_name("type").or_else(|| {
                let mut cursor = node.walk();
                node.named_children(&mut cursor).next()
            })?;
            type_name_node(inner)
        }
        _ => None,
    }
}

/// Name node of a variable declarator.
pub fn declarator_name(declarator: Node<'_>) -> Option<Node<'_>> {
    declarator.child_by_field_name("name").or_else(|| {
        let mut cursor = declarator.walk();
        declarator
            .named_children(&mut cursor)
            .find(|c| c.kind() == "identifier")
    })
}

/// The `get`/`set`/`init`/`add`/`remove` token of an accessor declaration.
pub fn accessor_keyword(accessor: Node<'_>) -> Option<Node<'_>> {
    let by_field = accessor
        .child_by_field_name("name")
        .filter(|n| ACCESSOR_KEYWORDS.contains(&n.kind()));
    by_field.or_else(|| {
        let mut cursor = accessor.walk();
        accessor
            .children(&mut cursor)
            .find(|c| ACCESSOR_KEYWORDS.contains(&c.kind()))
    })
}

pub fn has_modifier(node: Node<'_>, modifier: &str, text: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| {
        c.kind() == modifier || (c.kind() == "modifier" && node_text(c, text) == modifier)
    })
}

/// Strip generic arguments, array ranks, nullability and `global::`.
pub fn simple_type_name(name: &str) -> &str {
    let name = name.strip_prefix("global::").unwrap_or(name);
    let end = name.find(['<', '[', '?']).unwrap_or(name.len());
    name[..end].trim()
}

pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

pub(crate) fn compact(text: &str) -> String {
    text.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::csharp::CSharpParser;
    use std::path::Path;

    fn index(source: &str) -> DocumentIndex {
        CSharpParser::new()
            .unwrap()
            .parse(Path::new("a.cs"), source)
            .unwrap()
            .index
    }

    #[test]
    fn test_indexes_namespaced_types_and_members() {
        let idx = index(
            r#"using System;
using Acme.Text;

namespace App.Core
{
    public partial class Widget : Base, IThing
    {
        private int _count, _total;
        public string Name { get; set; }
        public void Run(int times, string label) { }
        partial void Hook(int x);
        public Widget() { }

        class Inner { }
    }
}
"#,
        );
        assert_eq!(idx.usings, vec!["System", "Acme.Text"]);

        let widget = idx.types.iter().find(|t| t.name == "Widget").unwrap();
        assert_eq!(widget.full_name, "App.Core.Widget");
        assert!(widget.is_partial);
        assert_eq!(widget.base_types, vec!["Base", "IThing"]);
        assert_eq!(widget.name_position, Position::new(5, 25));

        let names: Vec<&str> = widget.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["_count", "_total", "Name", "Run", "Hook", "Widget"]);

        let run = widget.members.iter().find(|m| m.name == "Run").unwrap();
        assert_eq!(run.parameter_types(), vec!["int", "string"]);
        assert_eq!(
            run.symbol_id(&widget.full_name).as_str(),
            "M:App.Core.Widget.Run(int,string)"
        );
        assert!(run.has_body);

        let hook = widget.members.iter().find(|m| m.name == "Hook").unwrap();
        assert!(hook.is_partial);
        assert!(!hook.has_body);

        let name = widget.members.iter().find(|m| m.name == "Name").unwrap();
        let keywords: Vec<&str> = name.accessors.iter().map(|a| a.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["get", "set"]);

        let inner = idx.types.iter().find(|t| t.name == "Inner").unwrap();
        assert_eq!(inner.full_name, "App.Core.Widget.Inner");
    }

    #[test]
    fn test_file_scoped_namespace() {
        let idx = index("namespace App;\n\nclass A { }\n");
        assert_eq!(idx.types[0].full_name, "App.A");
    }

    #[test]
    fn test_type_references_skip_predefined_types() {
        let idx = index(
            "class A { B b; int n; void M(C c) { var x = new D(); E e = null; } }",
        );
        let names: Vec<&str> = idx.type_references.iter().map(|r| r.name.as_str()).collect();
        for expected in ["B", "C", "D", "E"] {
            assert!(names.contains(&expected), "missing {expected} in {names:?}");
        }
        assert!(!names.contains(&"int"));
        assert!(!names.contains(&"var"));
    }

    #[test]
    fn test_syntax_issues_are_collected() {
        let idx = index("class A { void M() { int x = 1 } }");
        assert!(!idx.syntax_issues.is_empty());
        assert!(index("class A { }").syntax_issues.is_empty());
    }

    #[test]
    fn test_simple_type_name() {
        assert_eq!(simple_type_name("List<int>"), "List");
        assert_eq!(simple_type_name("global::Acme.Foo[]"), "Acme.Foo");
        assert_eq!(simple_type_name("Foo?"), "Foo");
    }
}
