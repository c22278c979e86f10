//! Call-site shapes used to pick between overloads

/// Kind of a literal argument written at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Char,
    Integer,
    Real,
    Bool,
    Null,
}

const NUMERIC_TYPES: &[&str] = &[
    "sbyte", "byte", "short", "ushort", "int", "uint", "long", "ulong", "nint", "nuint", "float",
    "double", "decimal",
];

const VALUE_TYPES: &[&str] = &["bool", "char"];

/// Framework names of the predefined types, mapped to their keywords.
const FRAMEWORK_ALIASES: &[(&str, &str)] = &[
    ("Boolean", "bool"),
    ("Byte", "byte"),
    ("SByte", "sbyte"),
    ("Char", "char"),
    ("Decimal", "decimal"),
    ("Double", "double"),
    ("Single", "float"),
    ("Int16", "short"),
    ("UInt16", "ushort"),
    ("Int32", "int"),
    ("UInt32", "uint"),
    ("Int64", "long"),
    ("UInt64", "ulong"),
    ("IntPtr", "nint"),
    ("UIntPtr", "nuint"),
    ("Object", "object"),
    ("String", "string"),
];

/// How well an argument matches a parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Fit {
    No,
    /// `object`, generic or user types: the literal may convert.
    Loose,
    Exact,
}

/// Keyword form of a parameter type and whether it was written nullable.
fn normalize(ty: &str) -> (&str, bool) {
    let ty = ty.trim().trim_start_matches("global::");
    let (ty, nullable) = match ty.strip_suffix('?') {
        Some(inner) => (inner, true),
        None => (ty, false),
    };
    let simple = ty.strip_prefix("System.").unwrap_or(ty);
    let keyword = FRAMEWORK_ALIASES
        .iter()
        .find(|(framework, _)| *framework == simple)
        .map(|(_, keyword)| *keyword)
        .unwrap_or(ty);
    (keyword, nullable)
}

fn is_predefined(ty: &str) -> bool {
    ty == "string" || ty == "object" || NUMERIC_TYPES.contains(&ty) || VALUE_TYPES.contains(&ty)
}

impl LiteralKind {
    fn fit(self, parameter_type: &str) -> Fit {
        let (ty, nullable) = normalize(parameter_type);
        if ty == "object" {
            return Fit::Loose;
        }
        let exact = match self {
            Self::String => ty == "string",
            Self::Char => ty == "char",
            Self::Integer => NUMERIC_TYPES.contains(&ty),
            Self::Real => matches!(ty, "float" | "double" | "decimal"),
            Self::Bool => ty == "bool",
            Self::Null => nullable || ty == "string",
        };
        if exact {
            Fit::Exact
        } else if self == Self::Char && NUMERIC_TYPES.contains(&ty) && ty != "byte" && ty != "sbyte" {
            Fit::Loose
        } else if is_predefined(ty) || ty.ends_with(']') {
            Fit::No
        } else {
            Fit::Loose
        }
    }
}

/// Arguments at a call site; `None` where the argument is not a literal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallShape {
    pub arguments: Vec<Option<LiteralKind>>,
}

impl CallShape {
    pub fn new(arguments: Vec<Option<LiteralKind>>) -> Self {
        Self { arguments }
    }

    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    /// Summed fit of the literal arguments, `None` when one cannot bind.
    fn score(&self, parameter_types: &[String]) -> Option<usize> {
        if parameter_types.len() != self.arity() {
            return None;
        }
        let mut score = 0;
        for (argument, ty) in self.arguments.iter().zip(parameter_types) {
            match argument.map(|kind| kind.fit(ty)) {
                Some(Fit::No) => return None,
                Some(fit) => score += fit as usize,
                None => {}
            }
        }
        Some(score)
    }

    /// Keep the overloads this call binds to best.
    ///
    /// Narrows by argument count, then by literal arguments against
    /// parameter types. Candidates are left alone when nothing matches.
    pub fn narrow<T>(&self, candidates: &mut Vec<T>, parameter_types: impl Fn(&T) -> Vec<String>) {
        let scores: Vec<Option<usize>> = candidates
            .iter()
            .map(|c| self.score(&parameter_types(c)))
            .collect();
        if let Some(best) = scores.iter().flatten().max().copied() {
            let mut scores = scores.into_iter();
            candidates.retain(|_| scores.next().flatten() == Some(best));
            return;
        }
        if candidates.iter().any(|c| parameter_types(c).len() == self.arity()) {
            candidates.retain(|c| parameter_types(c).len() == self.arity());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_string_literal_prefers_string_parameter() {
        let call = CallShape::new(vec![Some(LiteralKind::String)]);
        let mut overloads = vec![types(&["int"]), types(&["string"])];
        call.narrow(&mut overloads, |p| p.clone());
        assert_eq!(overloads, vec![types(&["string"])]);
    }

    #[test]
    fn test_framework_names_match_keywords() {
        let call = CallShape::new(vec![Some(LiteralKind::Integer), Some(LiteralKind::Bool)]);
        let mut overloads = vec![
            types(&["System.String", "bool"]),
            types(&["System.Int64", "Boolean"]),
        ];
        call.narrow(&mut overloads, |p| p.clone());
        assert_eq!(overloads, vec![types(&["System.Int64", "Boolean"])]);
    }

    #[test]
    fn test_null_binds_to_references_and_nullables() {
        assert_eq!(LiteralKind::Null.fit("int"), Fit::No);
        assert_eq!(LiteralKind::Null.fit("int?"), Fit::Exact);
        assert_eq!(LiteralKind::Null.fit("string"), Fit::Exact);
        assert_eq!(LiteralKind::Null.fit("Widget"), Fit::Loose);
    }

    #[test]
    fn test_exact_type_beats_object() {
        let call = CallShape::new(vec![Some(LiteralKind::Real)]);
        let mut overloads = vec![types(&["object"]), types(&["double"])];
        call.narrow(&mut overloads, |p| p.clone());
        assert_eq!(overloads, vec![types(&["double"])]);
    }

    #[test]
    fn test_non_literal_arguments_narrow_by_count_only() {
        let call = CallShape::new(vec![None]);
        let mut overloads = vec![types(&[]), types(&["int"]), types(&["string"])];
        call.narrow(&mut overloads, |p| p.clone());
        assert_eq!(overloads.len(), 2);
    }

    #[test]
    fn test_nothing_binds_keeps_candidates() {
        let call = CallShape::new(vec![Some(LiteralKind::Bool)]);
        let mut overloads = vec![types(&["int"]), types(&["string"])];
        call.narrow(&mut overloads, |p| p.clone());
        assert_eq!(overloads.len(), 2);

        let mut overloads = vec![types(&["int"]), types(&["int", "int"])];
        CallShape::new(vec![]).narrow(&mut overloads, |p| p.clone());
        assert_eq!(overloads.len(), 2);
    }
}
