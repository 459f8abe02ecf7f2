//! The catalog of accepted functions.

use crate::analysis::FunctionDeclaration;
use crate::python::unparse_function;
use serde::Serialize;
use std::path::PathBuf;

/// How a catalog entry was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Acceptance {
    Static,
    Dynamic,
}

impl Acceptance {
    pub fn as_str(self) -> &'static str {
        match self {
            Acceptance::Static => "static",
            Acceptance::Dynamic => "dynamic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterEntry {
    pub name: String,
    /// Declared type as written, e.g. `int` or `list[int]`.
    pub annotation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub path: PathBuf,
    pub line: usize,
    /// Reconstructed source, after sample substitution.
    pub source: String,
    pub parameters: Vec<ParameterEntry>,
    pub acceptance: Acceptance,
}

impl CatalogEntry {
    pub fn from_declaration(declaration: &FunctionDeclaration, acceptance: Acceptance) -> Self {
        Self {
            name: declaration.name().to_string(),
            path: declaration.path.as_ref().clone(),
            line: declaration.line(),
            source: unparse_function(&declaration.def),
            parameters: declaration
                .parameter_pairs()
                .into_iter()
                .map(|(name, annotation)| ParameterEntry { name, annotation })
                .collect(),
            acceptance,
        }
    }
}

/// Accepted functions in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FunctionCatalog {
    entries: Vec<CatalogEntry>,
}

impl FunctionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

impl<'c> IntoIterator for &'c FunctionCatalog {
    type Item = &'c CatalogEntry;
    type IntoIter = std::slice::Iter<'c, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::declarations_from_source;
    use std::path::Path;

    #[test]
    fn test_entry_from_declaration() {
        let declarations = declarations_from_source(
            "def add(a: int, b) -> int:\n    return a + b\n",
            Path::new("m.py"),
        )
        .unwrap();
        let entry = CatalogEntry::from_declaration(&declarations[0], Acceptance::Static);
        assert_eq!(entry.name, "add");
        assert_eq!(entry.line, 1);
        assert_eq!(
            entry.parameters,
            vec![
                ParameterEntry {
                    name: "a".into(),
                    annotation: Some("int".into())
                },
                ParameterEntry {
                    name: "b".into(),
                    annotation: None
                },
            ]
        );
        assert_eq!(entry.source, "def add(a: int, b) -> int:\n    return a + b\n");
    }

    #[test]
    fn test_catalog_serializes_as_array() {
        let mut catalog = FunctionCatalog::new();
        catalog.push(CatalogEntry {
            name: "f".into(),
            path: PathBuf::from("m.py"),
            line: 3,
            source: "def f(): ...".into(),
            parameters: vec![],
            acceptance: Acceptance::Dynamic,
        });
        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json[0]["acceptance"], "dynamic");
        assert_eq!(json[0]["line"], 3);
        assert_eq!(catalog.names(), vec!["f"]);
    }
}
