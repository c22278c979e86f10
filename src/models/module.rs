//! Compiled module manifests
//!
//! External modules are compiled dependencies outside the editable
//! workspace. Their public surface is described by a JSON manifest
//! (`*.module.json`), which is all the synthesizers have to work with.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::call::CallShape;
use super::symbol::{Location, Symbol, SymbolId, SymbolKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub name: String,
    #[serde(default = "defaults::version")]
    pub version: String,
    /// Whether the module carries enough information to reconstruct bodies.
    #[serde(default = "defaults::decompilable")]
    pub decompilable: bool,
    #[serde(default)]
    pub types: Vec<ExternalType>,
}

mod defaults {
    pub fn version() -> String {
        "0.0.0.0".to_string()
    }
    pub fn decompilable() -> bool {
        true
    }
}

impl ModuleManifest {
    pub fn find_type(&self, full_name: &str) -> Option<usize> {
        self.types.iter().position(|t| t.full_name() == full_name)
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.types.iter().any(|t| {
            t.namespace == namespace || t.namespace.starts_with(&format!("{}.", namespace))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalType {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub kind: SymbolKind,
    #[serde(default)]
    pub base_types: Vec<String>,
    #[serde(default)]
    pub members: Vec<ExternalMember>,
}

impl ExternalType {
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn symbol_id(&self) -> SymbolId {
        SymbolId::for_type(&self.full_name())
    }

    /// Members named `name`, narrowed to the overloads `call` binds to.
    pub fn members_named(&self, name: &str, call: Option<&CallShape>) -> Vec<&ExternalMember> {
        let mut named: Vec<&ExternalMember> =
            self.members.iter().filter(|m| m.name == name).collect();
        if let Some(call) = call {
            call.narrow(&mut named, |m| m.parameter_types());
        }
        named
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalMember {
    pub name: String,
    #[serde(default = "defaults_member::kind")]
    pub kind: SymbolKind,
    /// Return type for methods, value type for properties/fields/events.
    #[serde(default, rename = "type")]
    pub ty: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ExternalParameter>,
    #[serde(default)]
    pub is_static: bool,
    /// Property accessors, e.g. `["get", "set"]`.
    #[serde(default)]
    pub accessors: Vec<String>,
    /// Reconstructed body lines, when the module recorded them.
    #[serde(default)]
    pub body: Option<Vec<String>>,
}

mod defaults_member {
    use super::SymbolKind;

    pub fn kind() -> SymbolKind {
        SymbolKind::Method
    }
}

impl ExternalMember {
    pub fn parameter_types(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn symbol_id(&self, owner: &str) -> SymbolId {
        SymbolId::for_member(self.kind, owner, &self.name, &self.parameter_types())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A type inside a loaded module; cheap to clone and `'static`.
#[derive(Debug, Clone)]
pub struct ExternalTypeRef {
    pub module: Arc<ModuleManifest>,
    pub index: usize,
}

impl ExternalTypeRef {
    pub fn new(module: Arc<ModuleManifest>, index: usize) -> Option<Self> {
        (index < module.types.len()).then_some(Self { module, index })
    }

    pub fn ty(&self) -> &ExternalType {
        &self.module.types[self.index]
    }

    pub fn module_name(&self) -> &str {
        &self.module.name
    }

    pub fn type_symbol(&self) -> Symbol {
        let ty = self.ty();
        let full_name = ty.full_name();
        Symbol::new(ty.symbol_id(), ty.name.clone(), ty.kind)
            .with_module(self.module.name.clone())
            .with_location(Location::in_module(self.module.name.clone(), full_name))
    }

    pub fn member_symbol(&self, member: &ExternalMember) -> Symbol {
        let full_name = self.ty().full_name();
        Symbol::new(member.symbol_id(&full_name), member.name.clone(), member.kind)
            .with_container(full_name.clone())
            .with_module(self.module.name.clone())
            .with_location(Location::in_module(self.module.name.clone(), full_name))
    }
}
