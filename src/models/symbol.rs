//! Symbol model definitions
//!
//! Core types describing what the semantic provider hands back for a
//! cursor position: the symbol identity, its relations and where it lives.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Stable identity of a symbol.
///
/// Documentation-id style (`T:Ns.Foo`, `M:Ns.Foo.Bar(int,string)`), so two
/// overloads of the same method never share an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(String);

impl SymbolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn for_type(full_name: &str) -> Self {
        Self(format!("T:{}", full_name))
    }

    pub fn for_namespace(name: &str) -> Self {
        Self(format!("N:{}", name))
    }

    /// Identity of a member declared in `container`.
    ///
    /// Callable members carry their parameter types so overloads differ.
    pub fn for_member(kind: SymbolKind, container: &str, name: &str, parameters: &[String]) -> Self {
        let prefix = kind.id_prefix();
        if kind.is_callable() {
            Self(format!(
                "{}:{}.{}({})",
                prefix,
                container,
                name,
                parameters.join(",")
            ))
        } else {
            Self(format!("{}:{}.{}", prefix, container, name))
        }
    }

    /// Identity of a local or parameter, scoped to the declaring member.
    pub fn for_local(owner: &SymbolId, name: &str) -> Self {
        Self(format!("L:{}#{}", owner.0, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Zero-based editor coordinates. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Where a symbol is declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    /// Declared in an editable workspace document.
    InSource {
        file: PathBuf,
        line: u32,
        column: u32,
    },
    /// Declared in a compiled dependency; only the containing type is known.
    InExternalModule { module: String, type_name: String },
}

impl Location {
    pub fn in_source(file: impl Into<PathBuf>, position: Position) -> Self {
        Self::InSource {
            file: file.into(),
            line: position.line,
            column: position.column,
        }
    }

    pub fn in_module(module: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::InExternalModule {
            module: module.into(),
            type_name: type_name.into(),
        }
    }

    pub fn is_in_source(&self) -> bool {
        matches!(self, Self::InSource { .. })
    }

    pub fn is_in_external_module(&self) -> bool {
        matches!(self, Self::InExternalModule { .. })
    }
}

/// The symbol an accessor method belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedSymbol {
    pub id: SymbolId,
    pub kind: SymbolKind,
}

/// A resolved program entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    /// Full name of the containing type, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Name of the compiled module declaring this symbol (external symbols only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated: Option<AssociatedSymbol>,
    /// Body-bearing facet of a partial method declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_implementation: Option<Box<Symbol>>,
    #[serde(default)]
    pub locations: Vec<Location>,
}

impl Symbol {
    pub fn new(id: SymbolId, name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            container: None,
            module: None,
            associated: None,
            partial_implementation: None,
            locations: Vec::new(),
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_associated(mut self, id: SymbolId, kind: SymbolKind) -> Self {
        self.associated = Some(AssociatedSymbol { id, kind });
        self
    }

    pub fn with_partial_implementation(mut self, implementation: Symbol) -> Self {
        self.partial_implementation = Some(Box::new(implementation));
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    /// Canonical location, as ordered by the provider.
    pub fn primary_location(&self) -> Option<&Location> {
        self.locations.first()
    }

    /// Property `get`/`set` accessor methods.
    pub fn is_property_accessor(&self) -> bool {
        self.kind == SymbolKind::Method
            && self
                .associated
                .as_ref()
                .is_some_and(|a| a.kind == SymbolKind::Property)
    }

    /// Full name of the type whose document shows this symbol.
    pub fn containing_type_name(&self) -> Option<&str> {
        if self.kind.is_type() {
            self.id.as_str().strip_prefix("T:")
        } else {
            self.container.as_deref()
        }
    }
}

/// Symbol classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Namespace,
    #[default]
    Class,
    Struct,
    Interface,
    Enum,
    Method,
    Constructor,
    Property,
    Field,
    Event,
    EnumMember,
    Parameter,
    Local,
}

impl SymbolKind {
    /// Check if this is a type definition
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Self::Class | Self::Struct | Self::Interface | Self::Enum
        )
    }

    /// Check if this is callable
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Method | Self::Constructor)
    }

    /// Members that live inside a type declaration
    pub fn is_member(&self) -> bool {
        matches!(
            self,
            Self::Method
                | Self::Constructor
                | Self::Property
                | Self::Field
                | Self::Event
                | Self::EnumMember
        )
    }

    fn id_prefix(&self) -> char {
        match self {
            Self::Namespace => 'N',
            Self::Class | Self::Struct | Self::Interface | Self::Enum => 'T',
            Self::Method | Self::Constructor => 'M',
            Self::Property => 'P',
            Self::Field | Self::EnumMember => 'F',
            Self::Event => 'E',
            Self::Parameter | Self::Local => 'L',
        }
    }

    /// C# keyword introducing a type of this kind
    pub fn type_keyword(&self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Enum => "enum",
            _ => "class",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Namespace => "namespace",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Property => "property",
            Self::Field => "field",
            Self::Event => "event",
            Self::EnumMember => "enum_member",
            Self::Parameter => "parameter",
            Self::Local => "local",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SymbolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "namespace" => Ok(Self::Namespace),
            "class" => Ok(Self::Class),
            "struct" => Ok(Self::Struct),
            "interface" => Ok(Self::Interface),
            "enum" => Ok(Self::Enum),
            "method" => Ok(Self::Method),
            "constructor" | "ctor" => Ok(Self::Constructor),
            "property" => Ok(Self::Property),
            "field" => Ok(Self::Field),
            "event" => Ok(Self::Event),
            "enum_member" | "enummember" => Ok(Self::EnumMember),
            "parameter" => Ok(Self::Parameter),
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown symbol kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_ids_distinguish_overloads() {
        let one = SymbolId::for_member(SymbolKind::Method, "Ns.Foo", "Bar", &["int".into()]);
        let two = SymbolId::for_member(
            SymbolKind::Method,
            "Ns.Foo",
            "Bar",
            &["int".into(), "string".into()],
        );
        assert_eq!(one.as_str(), "M:Ns.Foo.Bar(int)");
        assert_eq!(two.as_str(), "M:Ns.Foo.Bar(int,string)");
        assert_ne!(one, two);
    }

    #[test]
    fn test_non_callable_ids_have_no_parameter_list() {
        let id = SymbolId::for_member(SymbolKind::Property, "Ns.Foo", "Count", &[]);
        assert_eq!(id.as_str(), "P:Ns.Foo.Count");
    }

    #[test]
    fn test_property_accessor_detection() {
        let property = SymbolId::for_member(SymbolKind::Property, "Foo", "Name", &[]);
        let getter = Symbol::new(SymbolId::new("M:Foo.get_Name()"), "get_Name", SymbolKind::Method)
            .with_associated(property.clone(), SymbolKind::Property);
        assert!(getter.is_property_accessor());

        let adder = Symbol::new(SymbolId::new("M:Foo.add_Changed()"), "add_Changed", SymbolKind::Method)
            .with_associated(SymbolId::new("E:Foo.Changed"), SymbolKind::Event);
        assert!(!adder.is_property_accessor());
    }

    #[test]
    fn test_containing_type_name() {
        let ty = Symbol::new(SymbolId::for_type("Ns.Foo"), "Foo", SymbolKind::Class);
        assert_eq!(ty.containing_type_name(), Some("Ns.Foo"));

        let method = Symbol::new(SymbolId::new("M:Ns.Foo.Bar()"), "Bar", SymbolKind::Method)
            .with_container("Ns.Foo");
        assert_eq!(method.containing_type_name(), Some("Ns.Foo"));
    }

    #[test]
    fn test_location_serialization_is_tagged() {
        let loc = Location::in_module("Lib", "Ns.Foo");
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["kind"], "in_external_module");
        assert_eq!(json["type_name"], "Ns.Foo");
    }

    #[test]
    fn test_symbol_kind_parsing() {
        assert_eq!("ctor".parse::<SymbolKind>(), Ok(SymbolKind::Constructor));
        assert_eq!("Property".parse::<SymbolKind>(), Ok(SymbolKind::Property));
        assert!("widget".parse::<SymbolKind>().is_err());
    }
}
