//! Declared return types by function name.

use crate::analysis::declarations::FunctionDeclaration;
use std::collections::HashMap;
use std::fmt;

/// A resolved return type. Only bare-name annotations resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Known(String),
    Unknown,
}

impl TypeTag {
    pub fn known_name(&self) -> Option<&str> {
        match self {
            TypeTag::Known(name) => Some(name),
            TypeTag::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TypeTag::Unknown)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Known(name) => f.write_str(name),
            TypeTag::Unknown => f.write_str("Unknown"),
        }
    }
}

static UNKNOWN: TypeTag = TypeTag::Unknown;

/// Flat name to return type map. A later declaration with the same name
/// replaces an earlier one, whatever file either came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnTypeTable {
    entries: HashMap<String, TypeTag>,
}

impl ReturnTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_declarations<'a, I>(declarations: I) -> Self
    where
        I: IntoIterator<Item = &'a FunctionDeclaration>,
    {
        let mut table = Self::new();
        for declaration in declarations {
            table.record(declaration);
        }
        table
    }

    pub fn record(&mut self, declaration: &FunctionDeclaration) {
        let tag = declaration
            .def
            .returns
            .as_ref()
            .and_then(|annotation| annotation.simple_name.clone())
            .map(TypeTag::Known)
            .unwrap_or(TypeTag::Unknown);
        self.insert(declaration.name(), tag);
    }

    pub fn insert(&mut self, name: impl Into<String>, tag: TypeTag) {
        self.entries.insert(name.into(), tag);
    }

    /// Return type registered for `name`, `Unknown` when absent.
    pub fn lookup(&self, name: &str) -> &TypeTag {
        self.entries.get(name).unwrap_or(&UNKNOWN)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::declarations::declarations_from_source;
    use indoc::indoc;
    use std::path::Path;

    fn table(source: &str) -> ReturnTypeTable {
        let decls = declarations_from_source(source, Path::new("t.py")).unwrap();
        ReturnTypeTable::from_declarations(&decls)
    }

    #[test]
    fn test_only_bare_names_resolve() {
        let t = table(indoc! {"
            def a() -> int: pass
            def b() -> List[int]: pass
            def c() -> 'int': pass
            def d() -> None: pass
            def e() -> typing.Any: pass
            def f(): pass
        "});
        assert_eq!(t.lookup("a"), &TypeTag::Known("int".into()));
        for name in ["b", "c", "d", "e", "f"] {
            assert_eq!(t.lookup(name), &TypeTag::Unknown, "{}", name);
        }
    }

    #[test]
    fn test_missing_name_is_unknown() {
        assert!(ReturnTypeTable::new().lookup("nowhere").is_unknown());
    }

    #[test]
    fn test_last_declaration_wins() {
        let first = declarations_from_source("def h() -> int: pass\n", Path::new("a.py")).unwrap();
        let second = declarations_from_source("def h() -> str: pass\n", Path::new("b.py")).unwrap();
        let t = ReturnTypeTable::from_declarations(first.iter().chain(second.iter()));
        assert_eq!(t.lookup("h").known_name(), Some("str"));
        assert_eq!(t.len(), 1);
    }
}
