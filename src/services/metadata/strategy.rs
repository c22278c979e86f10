//! Synthesis strategies
//!
//! Each strategy turns one external type into a C#-like document. The
//! [`StrategyTable`] maps the configured [`SynthesisStrategy`] to the
//! synthesizer that is actually available in this build.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::writer::{SourceWriter, SynthesizedText};
use crate::error::SynthesisError;
use crate::models::metadata::{MetadataKey, SynthesisStrategy};
use crate::models::module::{ExternalMember, ExternalType, ExternalTypeRef};
use crate::models::symbol::SymbolKind;

/// Everything a synthesizer needs to render one type.
#[derive(Debug, Clone)]
pub struct SynthesisInput {
    pub key: MetadataKey,
    pub project_name: String,
    pub external: ExternalTypeRef,
    pub snapshot: u64,
}

#[async_trait]
pub trait TypeSynthesizer: Send + Sync {
    fn strategy(&self) -> SynthesisStrategy;

    async fn synthesize(&self, input: &SynthesisInput) -> Result<SynthesizedText, SynthesisError>;
}

/// Declarations only. Works for every module.
#[derive(Debug, Default)]
pub struct SignatureStubSynthesizer;

#[async_trait]
impl TypeSynthesizer for SignatureStubSynthesizer {
    fn strategy(&self) -> SynthesisStrategy {
        SynthesisStrategy::StubFromSignature
    }

    async fn synthesize(&self, input: &SynthesisInput) -> Result<SynthesizedText, SynthesisError> {
        let external = &input.external;
        let ty = external.ty();
        let full_name = ty.full_name();

        let mut writer = SourceWriter::new();
        write_header(&mut writer, external);
        let in_namespace = open_namespace(&mut writer, ty);
        open_type(&mut writer, ty);

        for member in &ty.members {
            tokio::task::yield_now().await;
            let (prefix, name, suffix) = member_parts(ty, member);
            let terminator = match member.kind {
                SymbolKind::Property => "",
                SymbolKind::EnumMember => ",",
                _ => ";",
            };
            writer.declare(
                &prefix,
                &name,
                &format!("{}{}", suffix, terminator),
                member.symbol_id(&full_name),
            );
        }

        writer.close();
        if in_namespace {
            writer.close();
        }
        Ok(writer.finish())
    }
}

/// Reconstructs member bodies from what the module recorded.
#[derive(Debug, Default)]
pub struct ManifestDecompiler;

impl ManifestDecompiler {
    fn check_body(owner: &str, member: &ExternalMember, body: &[String]) -> Result<(), SynthesisError> {
        let mut depth: i64 = 0;
        for line in body {
            for c in line.chars() {
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
                if depth < 0 {
                    break;
                }
            }
            if depth < 0 {
                break;
            }
        }
        if depth != 0 {
            return Err(SynthesisError::Decompile(format!(
                "unbalanced braces in body of {}.{}",
                owner, member.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TypeSynthesizer for ManifestDecompiler {
    fn strategy(&self) -> SynthesisStrategy {
        SynthesisStrategy::Decompile
    }

    async fn synthesize(&self, input: &SynthesisInput) -> Result<SynthesizedText, SynthesisError> {
        let external = &input.external;
        if !external.module.decompilable {
            return Err(SynthesisError::Unsupported(external.module_name().to_string()));
        }
        let ty = external.ty();
        let full_name = ty.full_name();

        let mut writer = SourceWriter::new();
        write_header(&mut writer, external);
        writer.line("// Decompiled from module metadata");
        writer.blank();
        let in_namespace = open_namespace(&mut writer, ty);
        open_type(&mut writer, ty);

        for (i, member) in ty.members.iter().enumerate() {
            tokio::task::yield_now().await;
            let (prefix, name, suffix) = member_parts(ty, member);
            let id = member.symbol_id(&full_name);
            match member.kind {
                SymbolKind::Method | SymbolKind::Constructor if ty.kind != SymbolKind::Interface => {
                    if i > 0 {
                        writer.blank();
                    }
                    writer.open_declared(&prefix, &name, &suffix, id);
                    match &member.body {
                        Some(body) => {
                            Self::check_body(&full_name, member, body)?;
                            for line in body {
                                writer.line(line);
                            }
                        }
                        None => writer.line("throw null;"),
                    }
                    writer.close();
                }
                SymbolKind::Property => writer.declare(&prefix, &name, &suffix, id),
                SymbolKind::EnumMember => writer.declare(&prefix, &name, &format!("{},", suffix), id),
                _ => writer.declare(&prefix, &name, &format!("{};", suffix), id),
            }
        }

        writer.close();
        if in_namespace {
            writer.close();
        }
        Ok(writer.finish())
    }
}

fn write_header(writer: &mut SourceWriter, external: &ExternalTypeRef) {
    writer.line(&format!(
        "#region Assembly {}, Version={}",
        external.module_name(),
        external.module.version
    ));
    writer.line(&format!("// {}", external.module_name()));
    writer.line("#endregion");
    writer.blank();
}

fn open_namespace(writer: &mut SourceWriter, ty: &ExternalType) -> bool {
    if ty.namespace.is_empty() {
        return false;
    }
    writer.open(&format!("namespace {}", ty.namespace));
    true
}

fn open_type(writer: &mut SourceWriter, ty: &ExternalType) {
    let bases = if ty.base_types.is_empty() {
        String::new()
    } else {
        format!(" : {}", ty.base_types.join(", "))
    };
    writer.open_declared(
        &format!("public {} ", ty.kind.type_keyword()),
        &ty.name,
        &bases,
        ty.symbol_id(),
    );
}

/// Split a member declaration around its name: `(prefix, name, suffix)`.
fn member_parts(owner: &ExternalType, member: &ExternalMember) -> (String, String, String) {
    let in_interface = owner.kind == SymbolKind::Interface;
    let mut prefix = String::new();
    if !in_interface && member.kind != SymbolKind::EnumMember {
        prefix.push_str("public ");
    }
    if member.is_static {
        prefix.push_str("static ");
    }
    let ty = member.ty.as_deref().unwrap_or("void");
    let parameters = member
        .parameters
        .iter()
        .map(|p| format!("{} {}", p.ty, p.name))
        .collect::<Vec<_>>()
        .join(", ");

    match member.kind {
        SymbolKind::Constructor => (prefix, owner.name.clone(), format!("({})", parameters)),
        SymbolKind::Method => {
            prefix.push_str(ty);
            prefix.push(' ');
            (prefix, member.name.clone(), format!("({})", parameters))
        }
        SymbolKind::Property => {
            prefix.push_str(ty);
            prefix.push(' ');
            let accessors = if member.accessors.is_empty() {
                "get;".to_string()
            } else {
                member
                    .accessors
                    .iter()
                    .map(|a| format!("{};", a))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            (prefix, member.name.clone(), format!(" {{ {} }}", accessors))
        }
        SymbolKind::Event => {
            prefix.push_str("event ");
            prefix.push_str(member.ty.as_deref().unwrap_or("EventHandler"));
            prefix.push(' ');
            (prefix, member.name.clone(), String::new())
        }
        SymbolKind::EnumMember => (prefix, member.name.clone(), String::new()),
        _ => {
            prefix.push_str(ty);
            prefix.push(' ');
            (prefix, member.name.clone(), String::new())
        }
    }
}

/// Synthesizers indexed by strategy.
#[derive(Clone)]
pub struct StrategyTable {
    entries: HashMap<SynthesisStrategy, Arc<dyn TypeSynthesizer>>,
}

impl StrategyTable {
    /// Strategies available in this build.
    pub fn detect() -> Self {
        let table = Self::stub_only();
        if cfg!(feature = "decompiler") {
            table.with(Arc::new(ManifestDecompiler))
        } else {
            table
        }
    }

    pub fn stub_only() -> Self {
        let mut entries: HashMap<SynthesisStrategy, Arc<dyn TypeSynthesizer>> = HashMap::new();
        entries.insert(
            SynthesisStrategy::StubFromSignature,
            Arc::new(SignatureStubSynthesizer),
        );
        Self { entries }
    }

    /// Register `synthesizer` under its own strategy, replacing any previous one.
    pub fn with(mut self, synthesizer: Arc<dyn TypeSynthesizer>) -> Self {
        self.entries.insert(synthesizer.strategy(), synthesizer);
        self
    }

    pub fn supports(&self, strategy: SynthesisStrategy) -> bool {
        self.entries.contains_key(&strategy)
    }

    /// Strategy that will actually run when `requested` is configured.
    pub fn resolve(&self, requested: SynthesisStrategy) -> SynthesisStrategy {
        if self.supports(requested) {
            requested
        } else {
            SynthesisStrategy::StubFromSignature
        }
    }

    fn get(&self, strategy: SynthesisStrategy) -> Result<&Arc<dyn TypeSynthesizer>, SynthesisError> {
        self.entries
            .get(&strategy)
            .ok_or_else(|| SynthesisError::Decompile(format!("no synthesizer for {}", strategy)))
    }

    /// Synthesize with `requested`, falling back to stubs when the decompiler cannot help.
    pub async fn run(
        &self,
        requested: SynthesisStrategy,
        input: &SynthesisInput,
    ) -> Result<(SynthesisStrategy, SynthesizedText), SynthesisError> {
        let strategy = self.resolve(requested);
        match self.get(strategy)?.synthesize(input).await {
            Ok(text) => Ok((strategy, text)),
            Err(err) if strategy == SynthesisStrategy::Decompile && err.falls_back_to_stub() => {
                tracing::debug!("Decompiling {} failed ({}), using stub", input.key, err);
                let fallback = SynthesisStrategy::StubFromSignature;
                let text = self.get(fallback)?.synthesize(input).await?;
                Ok((fallback, text))
            }
            Err(err) => Err(err),
        }
    }
}
