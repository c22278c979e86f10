use std::path::PathBuf;

use crate::models::symbol::{Location, Position, Symbol};

/// Where a definition request goes next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Declared in the workspace; answered directly.
    Source { file: PathBuf, position: Position },
    /// Declared in a compiled module and the caller opted in.
    Materialize,
    /// Nothing the caller can be taken to.
    Unavailable,
}

/// Classify a symbol by its canonical (first) location.
pub fn classify(symbol: &Symbol, want_metadata: bool) -> Destination {
    debug_assert!(
        !symbol.locations.is_empty(),
        "resolved symbol {} has no locations",
        symbol.id
    );
    match symbol.primary_location() {
        Some(Location::InSource { file, line, column }) => Destination::Source {
            file: file.clone(),
            position: Position::new(*line, *column),
        },
        Some(Location::InExternalModule { .. }) if want_metadata => Destination::Materialize,
        Some(Location::InExternalModule { .. }) | None => Destination::Unavailable,
    }
}
