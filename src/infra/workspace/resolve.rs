//! Name binding over a project's declaration indexes
//!
//! Resolution is purely syntactic: names are looked up through enclosing
//! types, namespaces and `using` directives against the types declared in
//! the project's documents and the modules it references. Receiver types of
//! member accesses come from declared types of locals, fields, properties
//! and method return types.

use std::collections::HashSet;
use std::path::Path;

use tree_sitter::Node;

use super::ProjectState;
use crate::infra::csharp::syntax::{
    ACCESSOR_KEYWORDS, TYPE_DECLARATION_KINDS, accessor_keyword, compact, declarator_name,
    qualify, simple_type_name,
};
use crate::infra::csharp::{MemberDecl, ParsedDocument, TypeDecl, node_text};
use crate::models::call::{CallShape, LiteralKind};
use crate::models::module::{ExternalMember, ExternalTypeRef};
use crate::models::symbol::{Location, Position, Symbol, SymbolId, SymbolKind};

const MAX_DEPTH: usize = 16;

const PREDEFINED_TYPES: &[&str] = &[
    "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "nint", "nuint",
    "long", "ulong", "short", "ushort", "object", "string", "void", "dynamic", "var",
];

/// Namespace roots shipped with the runtime rather than the workspace.
const FRAMEWORK_ROOTS: &[&str] = &["System", "Microsoft"];

/// A type a name resolved to.
#[derive(Debug, Clone)]
pub(crate) enum TypeTarget {
    Source(String),
    External(ExternalTypeRef),
}

impl TypeTarget {
    fn full_name(&self) -> String {
        match self {
            Self::Source(full_name) => full_name.clone(),
            Self::External(external) => external.ty().full_name(),
        }
    }
}

/// What an expression denotes.
enum Resolved {
    Value(TypeTarget),
    Type(TypeTarget),
    Namespace(String),
}

/// Lookup context for type names.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope<'u> {
    pub namespace: String,
    /// Innermost enclosing type, for nested type lookup.
    pub container: Option<String>,
    pub usings: &'u [String],
}

impl Scope<'_> {
    /// Fully qualified names `name` could refer to, most specific first.
    fn candidates(&self, name: &str) -> Vec<String> {
        let mut candidates = Vec::new();
        if let Some(container) = &self.container {
            let mut outer = container.as_str();
            while outer.len() > self.namespace.len() {
                candidates.push(format!("{}.{}", outer, name));
                match outer.rsplit_once('.') {
                    Some((prefix, _)) => outer = prefix,
                    None => break,
                }
            }
        }

        let mut namespace = self.namespace.as_str();
        loop {
            candidates.push(qualify(namespace, name));
            if namespace.is_empty() {
                break;
            }
            namespace = namespace.rsplit_once('.').map(|(prefix, _)| prefix).unwrap_or("");
        }

        for using in self.usings {
            candidates.push(qualify(using, name));
        }

        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.clone()));
        candidates
    }
}

/// One declaration of a source type.
#[derive(Clone, Copy)]
struct SourceType<'a> {
    path: &'a Path,
    doc: &'a ParsedDocument,
    decl: &'a TypeDecl,
}

impl<'a> SourceType<'a> {
    fn member_scope(&self) -> Scope<'a> {
        let doc: &'a ParsedDocument = self.doc;
        Scope {
            namespace: self.decl.namespace.clone(),
            container: Some(self.decl.full_name.clone()),
            usings: &doc.index.usings,
        }
    }

    /// Base lists are bound outside the type's own body.
    fn base_scope(&self) -> Scope<'a> {
        let doc: &'a ParsedDocument = self.doc;
        let container = self
            .decl
            .full_name
            .rsplit_once('.')
            .map(|(outer, _)| outer.to_string())
            .filter(|outer| outer.len() > self.decl.namespace.len());
        Scope {
            namespace: self.decl.namespace.clone(),
            container,
            usings: &doc.index.usings,
        }
    }
}

enum MemberHit<'a> {
    Source {
        owner: SourceType<'a>,
        member: &'a MemberDecl,
    },
    External {
        owner: ExternalTypeRef,
        member: ExternalMember,
    },
}

impl<'a> MemberHit<'a> {
    fn symbol(&self, binder: &Binder<'a>) -> Symbol {
        match self {
            Self::Source { owner, member } => binder.declared_member_symbol(*owner, member),
            Self::External { owner, member } => owner.member_symbol(member),
        }
    }

    fn value_type(&self, binder: &Binder<'a>) -> Option<TypeTarget> {
        match self {
            Self::Source { owner, member } => {
                binder.resolve_type(member.ty.as_deref()?, &owner.member_scope())
            }
            Self::External { owner, member } => {
                let ty = owner.ty();
                let scope = Scope {
                    namespace: ty.namespace.clone(),
                    container: Some(ty.full_name()),
                    usings: &[],
                };
                binder.resolve_type(member.ty.as_deref()?, &scope)
            }
        }
    }
}

/// A local or parameter found by walking enclosing scopes.
struct LocalBinding<'t> {
    name: Node<'t>,
    kind: SymbolKind,
    declared_type: Option<Node<'t>>,
    initializer: Option<Node<'t>>,
}

pub(crate) struct Binder<'a> {
    project: &'a ProjectState,
}

impl<'a> Binder<'a> {
    pub fn new(project: &'a ProjectState) -> Self {
        Self { project }
    }

    // ---- type lookup ----

    fn source_types(&self, full_name: &str) -> Vec<SourceType<'a>> {
        let project: &'a ProjectState = self.project;
        let mut found = Vec::new();
        for (path, doc) in &project.documents {
            let doc: &'a ParsedDocument = doc;
            for decl in doc.index.types.iter().filter(|t| t.full_name == full_name) {
                found.push(SourceType {
                    path: path.as_path(),
                    doc,
                    decl,
                });
            }
        }
        found
    }

    /// Compiled type by full name, optionally restricted to one module.
    pub fn external(&self, module: Option<&str>, full_name: &str) -> Option<ExternalTypeRef> {
        self.project
            .modules
            .iter()
            .filter(|m| module.is_none_or(|name| m.name == name))
            .find_map(|m| {
                m.find_type(full_name)
                    .and_then(|index| ExternalTypeRef::new(m.clone(), index))
            })
    }

    /// Source declarations shadow compiled types of the same name.
    fn lookup_type(&self, full_name: &str) -> Option<TypeTarget> {
        let declared = self
            .project
            .documents
            .values()
            .any(|doc| doc.index.types.iter().any(|t| t.full_name == full_name));
        if declared {
            return Some(TypeTarget::Source(full_name.to_string()));
        }
        self.external(None, full_name).map(TypeTarget::External)
    }

    fn namespace_exists(&self, namespace: &str) -> bool {
        let nested = format!("{}.", namespace);
        self.project.documents.values().any(|doc| {
            doc.index
                .types
                .iter()
                .any(|t| t.namespace == namespace || t.namespace.starts_with(&nested))
        }) || self.project.modules.iter().any(|m| m.has_namespace(namespace))
    }

    pub fn resolve_type(&self, name: &str, scope: &Scope<'_>) -> Option<TypeTarget> {
        let name = simple_type_name(name);
        if name.is_empty() || PREDEFINED_TYPES.contains(&name) {
            return None;
        }
        scope
            .candidates(name)
            .iter()
            .find_map(|candidate| self.lookup_type(candidate))
    }

    /// Whether `name` may live in a framework namespace no loaded module describes.
    pub fn may_bind_to_framework(&self, name: &str, scope: &Scope<'_>) -> bool {
        let unloaded = |namespace: &str| {
            let root = namespace.split('.').next().unwrap_or(namespace);
            FRAMEWORK_ROOTS.contains(&root) && !self.namespace_exists(namespace)
        };
        match simple_type_name(name).rsplit_once('.') {
            Some((qualifier, _)) => unloaded(qualifier),
            None => scope.usings.iter().any(|using| unloaded(using.as_str())),
        }
    }

    fn resolve_namespace(&self, name: &str, scope: &Scope<'_>) -> Option<String> {
        let namespaces = Scope {
            namespace: scope.namespace.clone(),
            container: None,
            usings: &[],
        };
        namespaces
            .candidates(name)
            .into_iter()
            .find(|candidate| self.namespace_exists(candidate))
    }

    fn nested_type(&self, owner: &TypeTarget, name: &str) -> Option<TypeTarget> {
        self.lookup_type(&format!("{}.{}", owner.full_name(), name))
    }

    fn namespace_member(&self, namespace: &str, name: &str) -> Option<Resolved> {
        let full_name = qualify(namespace, name);
        if let Some(ty) = self.lookup_type(&full_name) {
            return Some(Resolved::Type(ty));
        }
        self.namespace_exists(&full_name)
            .then_some(Resolved::Namespace(full_name))
    }

    // ---- symbols ----

    /// Type symbol carrying one location per source declaration.
    pub fn type_symbol(&self, target: &TypeTarget) -> Option<Symbol> {
        match target {
            TypeTarget::Source(full_name) => {
                let declarations = self.source_types(full_name);
                let first = declarations.first()?;
                let mut symbol =
                    Symbol::new(first.decl.symbol_id(), first.decl.name.clone(), first.decl.kind);
                for declared in &declarations {
                    symbol = symbol
                        .with_location(Location::in_source(declared.path, declared.decl.name_position));
                }
                Some(symbol)
            }
            TypeTarget::External(external) => Some(external.type_symbol()),
        }
    }

    /// Member symbol; partial method definitions carry their implementation.
    fn declared_member_symbol(&self, owner: SourceType<'_>, member: &MemberDecl) -> Symbol {
        let symbol = source_member_symbol(owner, member);
        if member.kind != SymbolKind::Method || !member.is_partial || member.has_body {
            return symbol;
        }
        let implementation = self
            .source_types(&owner.decl.full_name)
            .into_iter()
            .find_map(|other| {
                other
                    .decl
                    .members
                    .iter()
                    .find(|m| {
                        m.is_partial && m.has_body && m.symbol_id(&other.decl.full_name) == symbol.id
                    })
                    .map(|m| source_member_symbol(other, m))
            });
        match implementation {
            Some(implementation) => symbol.with_partial_implementation(implementation),
            None => symbol,
        }
    }

    fn find_member(
        &self,
        target: &TypeTarget,
        name: &str,
        call: Option<&CallShape>,
        depth: usize,
    ) -> Option<MemberHit<'a>> {
        if depth > MAX_DEPTH {
            return None;
        }
        match target {
            TypeTarget::Source(full_name) => {
                let declarations = self.source_types(full_name);
                let mut candidates: Vec<(SourceType<'a>, &'a MemberDecl)> = Vec::new();
                for owner in &declarations {
                    let decl: &'a TypeDecl = owner.decl;
                    for member in decl
                        .members
                        .iter()
                        .filter(|m| m.name == name && m.kind != SymbolKind::Constructor)
                    {
                        candidates.push((*owner, member));
                    }
                }
                if let Some(call) = call {
                    call.narrow(&mut candidates, |(_, m)| m.parameter_types());
                }

                if let Some(&(owner, member)) = candidates.first() {
                    let id = member.symbol_id(full_name);
                    let (owner, member) = candidates
                        .iter()
                        .copied()
                        .find(|(_, m)| m.is_partial && !m.has_body && m.symbol_id(full_name) == id)
                        .unwrap_or((owner, member));
                    return Some(MemberHit::Source { owner, member });
                }

                for owner in &declarations {
                    let scope = owner.base_scope();
                    for base in &owner.decl.base_types {
                        if let Some(base) = self.resolve_type(base, &scope)
                            && let Some(hit) = self.find_member(&base, name, call, depth + 1)
                        {
                            return Some(hit);
                        }
                    }
                }
                None
            }
            TypeTarget::External(external) => {
                let ty = external.ty();
                if let Some(member) = ty.members_named(name, call).first() {
                    return Some(MemberHit::External {
                        owner: external.clone(),
                        member: (*member).clone(),
                    });
                }
                let scope = Scope {
                    namespace: ty.namespace.clone(),
                    container: None,
                    usings: &[],
                };
                for base in &ty.base_types {
                    if let Some(base) = self.resolve_type(base, &scope)
                        && let Some(hit) = self.find_member(&base, name, call, depth + 1)
                    {
                        return Some(hit);
                    }
                }
                None
            }
        }
    }

    // ---- positions in workspace documents ----

    /// Symbol declared or referenced at `position` of a workspace document.
    pub fn symbol_at(&self, path: &Path, doc: &ParsedDocument, position: Position) -> Option<Symbol> {
        let node = doc.node_at(position)?;
        if ACCESSOR_KEYWORDS.contains(&node.kind()) {
            return accessor_symbol(path, doc, node);
        }
        if node.kind() != "identifier" {
            return None;
        }

        let start = doc.position(node.start_position());
        if let Some(symbol) = self.declared_symbol(path, doc, start) {
            return Some(symbol);
        }
        if let Some(written) = namespace_name_at(doc, node) {
            return Some(self.written_name_symbol(written));
        }

        let scope = scope_at(doc, node);
        let name = doc.node_text(node);
        let target = reference_node(node);
        if let Some(parent) = target.parent() {
            match parent.kind() {
                "variable_declarator" if same(declarator_name(parent), node) => {
                    return Some(local_symbol(path, doc, node, SymbolKind::Local));
                }
                "foreach_statement" if same(parent.child_by_field_name("left"), target) => {
                    return Some(local_symbol(path, doc, node, SymbolKind::Local));
                }
                "catch_declaration" if same(parent.child_by_field_name("name"), target) => {
                    return Some(local_symbol(path, doc, node, SymbolKind::Local));
                }
                "parameter" if same(parent.child_by_field_name("name"), target) => {
                    return Some(local_symbol(path, doc, node, SymbolKind::Parameter));
                }
                "member_access_expression" if same(parent.child_by_field_name("name"), target) => {
                    return self.member_access_symbol(doc, parent, name, &scope);
                }
                "qualified_name" => return self.qualified_symbol(doc, parent, target, &scope),
                _ => {}
            }
        }

        if is_type_position(target) {
            return self
                .resolve_type(name, &scope)
                .and_then(|ty| self.type_symbol(&ty));
        }
        self.simple_name_symbol(path, doc, target, name, &scope)
    }

    fn declared_symbol(&self, path: &Path, doc: &ParsedDocument, position: Position) -> Option<Symbol> {
        for decl in &doc.index.types {
            if decl.name_position == position {
                return self.type_symbol(&TypeTarget::Source(decl.full_name.clone()));
            }
            for member in &decl.members {
                if member.name_position == position {
                    let owner = SourceType { path, doc, decl };
                    return Some(self.declared_member_symbol(owner, member));
                }
                if let Some(parameter) = member.parameters.iter().find(|p| p.name_position == position) {
                    let owner = member.symbol_id(&decl.full_name);
                    return Some(
                        Symbol::new(
                            SymbolId::for_local(&owner, &parameter.name),
                            parameter.name.clone(),
                            SymbolKind::Parameter,
                        )
                        .with_location(Location::in_source(path, parameter.name_position)),
                    );
                }
            }
        }
        None
    }

    fn member_access_symbol(
        &self,
        doc: &ParsedDocument,
        access: Node<'_>,
        name: &str,
        scope: &Scope<'_>,
    ) -> Option<Symbol> {
        let receiver = access.child_by_field_name("expression")?;
        let call = call_shape(access);
        match self.infer(doc, receiver, scope, 0)? {
            Resolved::Value(owner) => self
                .find_member(&owner, name, call.as_ref(), 0)
                .map(|hit| hit.symbol(self)),
            Resolved::Type(owner) => match self.find_member(&owner, name, call.as_ref(), 0) {
                Some(hit) => Some(hit.symbol(self)),
                None => self
                    .nested_type(&owner, name)
                    .and_then(|ty| self.type_symbol(&ty)),
            },
            Resolved::Namespace(namespace) => match self.namespace_member(&namespace, name)? {
                Resolved::Type(ty) => self.type_symbol(&ty),
                Resolved::Namespace(full_name) => Some(namespace_symbol(&full_name)),
                Resolved::Value(_) => None,
            },
        }
    }

    fn qualified_symbol(
        &self,
        doc: &ParsedDocument,
        qualified: Node<'_>,
        target: Node<'_>,
        scope: &Scope<'_>,
    ) -> Option<Symbol> {
        let prefix = compact(doc.text.get(qualified.start_byte()..target.end_byte())?);
        if let Some(ty) = self.resolve_type(&prefix, scope) {
            return self.type_symbol(&ty);
        }
        self.resolve_namespace(&prefix, scope)
            .map(|namespace| namespace_symbol(&namespace))
    }

    /// Using targets are fully qualified and may name a type (`using static`).
    fn written_name_symbol(&self, written: WrittenName) -> Symbol {
        match written {
            WrittenName::Namespace(namespace) => namespace_symbol(&namespace),
            WrittenName::UsingTarget(prefix) => self
                .lookup_type(&prefix)
                .and_then(|ty| self.type_symbol(&ty))
                .unwrap_or_else(|| namespace_symbol(&prefix)),
        }
    }

    fn simple_name_symbol(
        &self,
        path: &Path,
        doc: &ParsedDocument,
        target: Node<'_>,
        name: &str,
        scope: &Scope<'_>,
    ) -> Option<Symbol> {
        if let Some(local) = find_local(doc, target, name) {
            return Some(local_symbol(path, doc, local.name, local.kind));
        }

        let call = call_shape(target);
        for decl in enclosing_types(doc, target.start_byte()) {
            let owner = TypeTarget::Source(decl.full_name.clone());
            if let Some(hit) = self.find_member(&owner, name, call.as_ref(), 0) {
                return Some(hit.symbol(self));
            }
        }

        if let Some(ty) = self.resolve_type(name, scope) {
            return self.type_symbol(&ty);
        }
        self.resolve_namespace(name, scope)
            .map(|namespace| namespace_symbol(&namespace))
    }

    fn infer(
        &self,
        doc: &ParsedDocument,
        expr: Node<'_>,
        scope: &Scope<'_>,
        depth: usize,
    ) -> Option<Resolved> {
        if depth > MAX_DEPTH {
            return None;
        }
        match expr.kind() {
            "this" | "this_expression" => scope
                .container
                .clone()
                .map(|container| Resolved::Value(TypeTarget::Source(container))),
            "base" | "base_expression" => {
                let container = scope.container.as_deref()?;
                let owner = self
                    .source_types(container)
                    .into_iter()
                    .find(|t| !t.decl.base_types.is_empty())?;
                let base = owner.decl.base_types.first()?;
                self.resolve_type(base, &owner.base_scope())
                    .map(Resolved::Value)
            }
            "identifier" => self.infer_name(doc, expr, scope, depth),
            "generic_name" | "qualified_name" => self
                .resolve_type(doc.node_text(expr), scope)
                .map(Resolved::Type),
            "member_access_expression" => {
                let receiver = expr.child_by_field_name("expression")?;
                let name = identifier_text(doc, expr.child_by_field_name("name")?);
                match self.infer(doc, receiver, scope, depth + 1)? {
                    Resolved::Value(owner) => self
                        .find_member(&owner, name, None, 0)?
                        .value_type(self)
                        .map(Resolved::Value),
                    Resolved::Type(owner) => match self.find_member(&owner, name, None, 0) {
                        Some(hit) => hit.value_type(self).map(Resolved::Value),
                        None => self.nested_type(&owner, name).map(Resolved::Type),
                    },
                    Resolved::Namespace(namespace) => self.namespace_member(&namespace, name),
                }
            }
            "invocation_expression" => {
                let function = expr.child_by_field_name("function")?;
                let call = call_shape(function);
                let hit = match function.kind() {
                    "member_access_expression" => {
                        let receiver = function.child_by_field_name("expression")?;
                        let name = identifier_text(doc, function.child_by_field_name("name")?);
                        match self.infer(doc, receiver, scope, depth + 1)? {
                            Resolved::Value(owner) | Resolved::Type(owner) => {
                                self.find_member(&owner, name, call.as_ref(), 0)?
                            }
                            Resolved::Namespace(_) => return None,
                        }
                    }
                    "identifier" | "generic_name" => {
                        let container = scope.container.clone()?;
                        let name = identifier_text(doc, function);
                        self.find_member(&TypeTarget::Source(container), name, call.as_ref(), 0)?
                    }
                    _ => return None,
                };
                hit.value_type(self).map(Resolved::Value)
            }
            "object_creation_expression" | "cast_expression" => {
                let ty = expr.child_by_field_name("type")?;
                self.resolve_type(doc.node_text(ty), scope)
                    .map(Resolved::Value)
            }
            "parenthesized_expression" => self.infer(doc, expr.named_child(0)?, scope, depth + 1),
            _ => None,
        }
    }

    fn infer_name(
        &self,
        doc: &ParsedDocument,
        ident: Node<'_>,
        scope: &Scope<'_>,
        depth: usize,
    ) -> Option<Resolved> {
        let name = doc.node_text(ident);
        if let Some(local) = find_local(doc, ident, name) {
            if let Some(ty) = local.declared_type {
                return self
                    .resolve_type(doc.node_text(ty), scope)
                    .map(Resolved::Value);
            }
            return match self.infer(doc, local.initializer?, scope, depth + 1)? {
                Resolved::Value(ty) => Some(Resolved::Value(ty)),
                _ => None,
            };
        }

        if let Some(container) = &scope.container
            && let Some(hit) = self.find_member(&TypeTarget::Source(container.clone()), name, None, 0)
        {
            return hit.value_type(self).map(Resolved::Value);
        }
        if let Some(ty) = self.resolve_type(name, scope) {
            return Some(Resolved::Type(ty));
        }
        self.resolve_namespace(name, scope).map(Resolved::Namespace)
    }

    // ---- positions in synthesized documents ----

    /// Type and namespace names in a synthesized document.
    ///
    /// Declared members there are found through anchors, not through binding.
    pub fn metadata_symbol_at(&self, doc: &ParsedDocument, position: Position) -> Option<Symbol> {
        let node = doc.node_at(position)?;
        if node.kind() != "identifier" {
            return None;
        }
        if let Some(written) = namespace_name_at(doc, node) {
            return Some(self.written_name_symbol(written));
        }

        let scope = scope_at(doc, node);
        let target = reference_node(node);
        if let Some(parent) = target.parent()
            && parent.kind() == "qualified_name"
        {
            return self.qualified_symbol(doc, parent, target, &scope);
        }

        let name = doc.node_text(node);
        if let Some(ty) = self.resolve_type(name, &scope) {
            return self.type_symbol(&ty);
        }
        self.resolve_namespace(name, &scope)
            .map(|namespace| namespace_symbol(&namespace))
    }
}

fn source_member_symbol(owner: SourceType<'_>, member: &MemberDecl) -> Symbol {
    Symbol::new(
        member.symbol_id(&owner.decl.full_name),
        member.name.clone(),
        member.kind,
    )
    .with_container(owner.decl.full_name.clone())
    .with_location(Location::in_source(owner.path, member.name_position))
}

pub(crate) fn namespace_symbol(namespace: &str) -> Symbol {
    let name = namespace.rsplit('.').next().unwrap_or(namespace);
    Symbol::new(SymbolId::for_namespace(namespace), name, SymbolKind::Namespace)
}

/// `get_X`/`set_X` style accessor method of a property or event.
fn accessor_symbol(path: &Path, doc: &ParsedDocument, keyword: Node<'_>) -> Option<Symbol> {
    let accessor = keyword
        .parent()
        .filter(|p| p.kind() == "accessor_declaration")?;
    if !same(accessor_keyword(accessor), keyword) {
        return None;
    }
    let owner = accessor.parent()?.parent()?;
    let name = owner.child_by_field_name("name")?;
    let name_position = doc.position(name.start_position());
    let decl = doc.index.enclosing_type(owner.start_byte())?;
    let member = decl
        .members
        .iter()
        .find(|m| m.name_position == name_position)?;
    if !matches!(member.kind, SymbolKind::Property | SymbolKind::Event) {
        return None;
    }

    let method = format!("{}_{}", keyword.kind(), member.name);
    let parameters = match keyword.kind() {
        "get" => Vec::new(),
        _ => vec![member.ty.clone().unwrap_or_default()],
    };
    Some(
        Symbol::new(
            SymbolId::for_member(SymbolKind::Method, &decl.full_name, &method, &parameters),
            method,
            SymbolKind::Method,
        )
        .with_container(decl.full_name.clone())
        .with_associated(member.symbol_id(&decl.full_name), member.kind)
        .with_location(Location::in_source(path, doc.position(keyword.start_position()))),
    )
}

fn local_symbol(path: &Path, doc: &ParsedDocument, name: Node<'_>, kind: SymbolKind) -> Symbol {
    let text = doc.node_text(name);
    let byte = name.start_byte();
    let owner = doc
        .index
        .enclosing_type(byte)
        .map(|ty| match doc.index.enclosing_member(ty, byte) {
            Some(member) => member.symbol_id(&ty.full_name),
            None => ty.symbol_id(),
        })
        .unwrap_or_else(|| SymbolId::new("<global>"));
    Symbol::new(SymbolId::for_local(&owner, text), text, kind)
        .with_location(Location::in_source(path, doc.position(name.start_position())))
}

/// Walk enclosing scopes for a local or parameter named `name` declared before `from`.
fn find_local<'t>(doc: &ParsedDocument, from: Node<'t>, name: &str) -> Option<LocalBinding<'t>> {
    let text: &str = &doc.text;
    let limit = from.start_byte();
    let mut current = from.parent();
    while let Some(scope) = current {
        let kind = scope.kind();
        if TYPE_DECLARATION_KINDS.contains(&kind) {
            return None;
        }
        let found = match kind {
            "block" | "switch_section" => {
                let mut cursor = scope.walk();
                let found = scope
                    .named_children(&mut cursor)
                    .filter(|s| s.start_byte() < limit && s.kind() == "local_declaration_statement")
                    .filter_map(|s| child_of_kind(s, "variable_declaration"))
                    .filter_map(|d| declared_local(d, name, text))
                    .last();
                found
            }
            "for_statement" | "using_statement" | "fixed_statement" => {
                child_of_kind(scope, "variable_declaration").and_then(|d| declared_local(d, name, text))
            }
            "foreach_statement" => scope
                .child_by_field_name("left")
                .filter(|left| node_text(*left, text) == name)
                .map(|left| LocalBinding {
                    name: left,
                    kind: SymbolKind::Local,
                    declared_type: scope
                        .child_by_field_name("type")
                        .filter(|ty| !is_implicit(*ty, text)),
                    initializer: None,
                }),
            "catch_clause" => child_of_kind(scope, "catch_declaration").and_then(|declaration| {
                let ident = declaration.child_by_field_name("name")?;
                (node_text(ident, text) == name).then(|| LocalBinding {
                    name: ident,
                    kind: SymbolKind::Local,
                    declared_type: declaration.child_by_field_name("type"),
                    initializer: None,
                })
            }),
            "method_declaration"
            | "constructor_declaration"
            | "operator_declaration"
            | "indexer_declaration"
            | "local_function_statement"
            | "lambda_expression"
            | "anonymous_method_expression" => scope
                .child_by_field_name("parameters")
                .and_then(|list| declared_parameter(list, name, text)),
            _ => None,
        };
        if found.is_some() {
            return found;
        }
        current = scope.parent();
    }
    None
}

fn declared_local<'t>(declaration: Node<'t>, name: &str, text: &str) -> Option<LocalBinding<'t>> {
    let declared_type = declaration
        .child_by_field_name("type")
        .filter(|ty| !is_implicit(*ty, text));
    let mut cursor = declaration.walk();
    let found = declaration
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "variable_declarator")
        .find_map(|declarator| {
            let ident = declarator_name(declarator)?;
            (node_text(ident, text) == name).then(|| LocalBinding {
                name: ident,
                kind: SymbolKind::Local,
                declared_type,
                initializer: declarator_value(declarator),
            })
        });
    found
}

fn declared_parameter<'t>(list: Node<'t>, name: &str, text: &str) -> Option<LocalBinding<'t>> {
    if matches!(list.kind(), "identifier" | "implicit_parameter") {
        return (node_text(list, text) == name).then_some(LocalBinding {
            name: list,
            kind: SymbolKind::Parameter,
            declared_type: None,
            initializer: None,
        });
    }
    let mut cursor = list.walk();
    let found = list
        .named_children(&mut cursor)
        .filter(|p| p.kind() == "parameter")
        .find_map(|parameter| {
            let ident = parameter.child_by_field_name("name")?;
            (node_text(ident, text) == name).then(|| LocalBinding {
                name: ident,
                kind: SymbolKind::Parameter,
                declared_type: parameter.child_by_field_name("type"),
                initializer: None,
            })
        });
    found
}

fn declarator_value(declarator: Node<'_>) -> Option<Node<'_>> {
    let name = declarator_name(declarator);
    let mut cursor = declarator.walk();
    let value = declarator.named_children(&mut cursor).find(|c| {
        !same(name, *c) && !matches!(c.kind(), "bracketed_argument_list" | "tuple_pattern")
    })?;
    if value.kind() == "equals_value_clause" {
        return value.named_child(0);
    }
    Some(value)
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn is_implicit(ty: Node<'_>, text: &str) -> bool {
    ty.kind() == "implicit_type" || node_text(ty, text) == "var"
}

/// Whether `node` is written where only a type can appear.
fn is_type_position(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    let is_field = |field: &str| same(parent.child_by_field_name(field), node);
    match parent.kind() {
        "base_list" | "type_argument_list" | "array_type" | "nullable_type" | "pointer_type"
        | "ref_type" | "type_parameter_constraint" => true,
        "variable_declaration"
        | "parameter"
        | "property_declaration"
        | "event_declaration"
        | "indexer_declaration"
        | "object_creation_expression"
        | "cast_expression"
        | "typeof_expression"
        | "default_expression"
        | "sizeof_expression"
        | "foreach_statement"
        | "catch_declaration"
        | "declaration_expression"
        | "declaration_pattern" => is_field("type"),
        "method_declaration"
        | "local_function_statement"
        | "delegate_declaration"
        | "operator_declaration" => is_field("returns") || is_field("type"),
        _ => false,
    }
}

/// Arguments of the invocation whose callee is `node`.
fn call_shape(node: Node<'_>) -> Option<CallShape> {
    let invocation = node
        .parent()
        .filter(|p| p.kind() == "invocation_expression")?;
    if !same(invocation.child_by_field_name("function"), node) {
        return None;
    }
    let arguments = invocation.child_by_field_name("arguments")?;
    let mut cursor = arguments.walk();
    let kinds = arguments
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "argument")
        .map(|argument| last_named_child(argument).and_then(literal_kind))
        .collect();
    Some(CallShape::new(kinds))
}

fn literal_kind(expr: Node<'_>) -> Option<LiteralKind> {
    match expr.kind() {
        "string_literal"
        | "verbatim_string_literal"
        | "raw_string_literal"
        | "interpolated_string_expression" => Some(LiteralKind::String),
        "character_literal" => Some(LiteralKind::Char),
        "integer_literal" => Some(LiteralKind::Integer),
        "real_literal" => Some(LiteralKind::Real),
        "boolean_literal" => Some(LiteralKind::Bool),
        "null_literal" => Some(LiteralKind::Null),
        "prefix_unary_expression" | "parenthesized_expression" => {
            last_named_child(expr).and_then(literal_kind)
        }
        _ => None,
    }
}

fn last_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).last()
}

/// The identifier itself, or its `generic_name` wrapper.
fn reference_node(node: Node<'_>) -> Node<'_> {
    match node.parent() {
        Some(parent) if parent.kind() == "generic_name" => parent,
        _ => node,
    }
}

fn identifier_text<'d>(doc: &'d ParsedDocument, node: Node<'_>) -> &'d str {
    if node.kind() == "generic_name"
        && let Some(ident) = child_of_kind(node, "identifier")
    {
        return doc.node_text(ident);
    }
    doc.node_text(node)
}

fn enclosing_types(doc: &ParsedDocument, byte: usize) -> Vec<&TypeDecl> {
    let mut types: Vec<&TypeDecl> = doc
        .index
        .types
        .iter()
        .filter(|t| t.byte_range.contains(&byte))
        .collect();
    types.sort_by_key(|t| t.byte_range.len());
    types
}

/// A dotted name outside any type, up to and including the clicked identifier.
enum WrittenName {
    Namespace(String),
    UsingTarget(String),
}

/// Name written at `node` in a namespace declaration or a using directive.
fn namespace_name_at(doc: &ParsedDocument, node: Node<'_>) -> Option<WrittenName> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        match ancestor.kind() {
            "namespace_declaration" | "file_scoped_namespace_declaration" => {
                let name = ancestor.child_by_field_name("name")?;
                if !contains(name, node) {
                    return None;
                }
                return prefix_text(doc, name, node).map(WrittenName::Namespace);
            }
            "using_directive" => {
                if ancestor.child_by_field_name("name").is_some() {
                    return None;
                }
                let mut cursor = ancestor.walk();
                let target = ancestor
                    .named_children(&mut cursor)
                    .find(|c| matches!(c.kind(), "identifier" | "qualified_name"))?;
                return prefix_text(doc, target, node)
                    .map(|prefix| prefix.trim_start_matches("global::").to_string())
                    .map(WrittenName::UsingTarget);
            }
            "block" | "arrow_expression_clause" => return None,
            kind if TYPE_DECLARATION_KINDS.contains(&kind) => return None,
            _ => {}
        }
        current = ancestor.parent();
    }
    None
}

fn prefix_text(doc: &ParsedDocument, name: Node<'_>, node: Node<'_>) -> Option<String> {
    doc.text
        .get(name.start_byte()..node.end_byte())
        .map(compact)
}

fn scope_at<'d>(doc: &'d ParsedDocument, node: Node<'_>) -> Scope<'d> {
    match doc.index.enclosing_type(node.start_byte()) {
        Some(decl) => Scope {
            namespace: decl.namespace.clone(),
            container: Some(decl.full_name.clone()),
            usings: &doc.index.usings,
        },
        None => Scope {
            namespace: namespace_around(doc, node),
            container: None,
            usings: &doc.index.usings,
        },
    }
}

fn namespace_around(doc: &ParsedDocument, node: Node<'_>) -> String {
    let mut parts = Vec::new();
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if matches!(
            ancestor.kind(),
            "namespace_declaration" | "file_scoped_namespace_declaration"
        ) && let Some(name) = ancestor.child_by_field_name("name")
            && !contains(name, node)
        {
            parts.push(compact(doc.node_text(name)));
        }
        current = ancestor.parent();
    }
    if parts.is_empty() {
        let root = doc.tree.root_node();
        if let Some(name) = child_of_kind(root, "file_scoped_namespace_declaration")
            .and_then(|ns| ns.child_by_field_name("name"))
        {
            return compact(doc.node_text(name));
        }
    }
    parts.reverse();
    parts.join(".")
}

fn contains(outer: Node<'_>, inner: Node<'_>) -> bool {
    outer.start_byte() <= inner.start_byte() && inner.end_byte() <= outer.end_byte()
}

fn same(node: Option<Node<'_>>, other: Node<'_>) -> bool {
    node.is_some_and(|n| n.id() == other.id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_search_outward_then_usings() {
        let usings = vec!["Acme.Text".to_string()];
        let scope = Scope {
            namespace: "App.Core".to_string(),
            container: Some("App.Core.Widget".to_string()),
            usings: &usings,
        };
        assert_eq!(
            scope.candidates("Foo"),
            vec![
                "App.Core.Widget.Foo",
                "App.Core.Foo",
                "App.Foo",
                "Foo",
                "Acme.Text.Foo",
            ]
        );
    }

    #[test]
    fn test_candidates_in_global_namespace() {
        let scope = Scope::default();
        assert_eq!(scope.candidates("Foo"), vec!["Foo"]);
    }

    #[test]
    fn test_namespace_symbol_has_no_location() {
        let symbol = namespace_symbol("Acme.Text");
        assert_eq!(symbol.name, "Text");
        assert_eq!(symbol.kind, SymbolKind::Namespace);
        assert!(symbol.locations.is_empty());
    }
}
