use crate::models::symbol::{Symbol, SymbolKind};

/// Symbol whose definition the caller should be taken to.
///
/// Property accessors have no definition of their own. A partial method
/// definition stands for its implementation.
pub fn disambiguate(mut symbol: Symbol) -> Option<Symbol> {
    if symbol.is_property_accessor() {
        return None;
    }
    if symbol.kind == SymbolKind::Method
        && let Some(implementation) = symbol.partial_implementation.take()
    {
        return Some(*implementation);
    }
    Some(symbol)
}
