//! Function declaration extraction.
//!
//! Collects every plain `def` in a module in pre-order: a function comes
//! before the functions nested in it, and those come before its later
//! siblings. Class bodies are opaque to the front end, so methods are never
//! reached. `async def` is skipped.

use crate::errors::Result;
use crate::python::ast::{FunctionDef, Module, Span};
use crate::python::parse_module;
use crate::python::visit::{walk_function_def, Visitor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A function found in a source file, together with the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub path: Arc<PathBuf>,
    pub def: FunctionDef,
}

impl FunctionDeclaration {
    pub fn new(path: Arc<PathBuf>, def: FunctionDef) -> Self {
        Self { path, def }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn line(&self) -> usize {
        self.def.line()
    }

    pub fn span(&self) -> Span {
        self.def.span
    }

    /// Same declaration with a different definition body.
    pub fn with_def(&self, def: FunctionDef) -> Self {
        Self {
            path: Arc::clone(&self.path),
            def,
        }
    }

    /// `(name, declared type)` pairs in source order.
    pub fn parameter_pairs(&self) -> Vec<(String, Option<String>)> {
        parameter_pairs(&self.def)
    }
}

pub fn parameter_pairs(def: &FunctionDef) -> Vec<(String, Option<String>)> {
    def.params
        .iter()
        .map(|p| (p.name.clone(), p.annotation.as_ref().map(|a| a.text.clone())))
        .collect()
}

/// Parse `source` and return its function declarations.
pub fn declarations_from_source(source: &str, path: &Path) -> Result<Vec<FunctionDeclaration>> {
    let module = parse_module(source, path)?;
    Ok(collect_declarations(&module, Arc::new(path.to_path_buf())))
}

pub fn collect_declarations(module: &Module, path: Arc<PathBuf>) -> Vec<FunctionDeclaration> {
    let mut collector = DeclarationCollector {
        path,
        found: Vec::new(),
    };
    for stmt in &module.body {
        collector.visit_stmt(stmt);
    }
    collector.found
}

struct DeclarationCollector {
    path: Arc<PathBuf>,
    found: Vec<FunctionDeclaration>,
}

impl<'a> Visitor<'a> for DeclarationCollector {
    fn visit_function_def(&mut self, def: &'a FunctionDef) {
        if !def.is_async {
            self.found
                .push(FunctionDeclaration::new(Arc::clone(&self.path), def.clone()));
        }
        walk_function_def(self, def);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use indoc::indoc;

    fn names(source: &str) -> Vec<String> {
        declarations_from_source(source, Path::new("mod.py"))
            .unwrap()
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    #[test]
    fn test_nested_functions_follow_parent() {
        let source = indoc! {"
            def outer(a):
                def inner(b):
                    def innermost(c):
                        return c
                    return b
                return a

            def sibling(x):
                return x
        "};
        assert_eq!(names(source), vec!["outer", "inner", "innermost", "sibling"]);
    }

    #[test]
    fn test_definitions_inside_blocks_are_found() {
        let source = indoc! {"
            if DEBUG:
                def debug_only(a):
                    return a
            else:
                def release(a):
                    return a
            try:
                def guarded(a):
                    return a
            except ImportError:
                pass
        "};
        assert_eq!(names(source), vec!["debug_only", "release", "guarded"]);
    }

    #[test]
    fn test_class_methods_and_async_are_skipped() {
        let source = indoc! {"
            class Widget:
                def method(self, a):
                    return a

            async def fetch(a):
                return a

            def plain(a):
                return a
        "};
        assert_eq!(names(source), vec!["plain"]);
    }

    #[test]
    fn test_parameter_pairs_keep_source_order() {
        let decls = declarations_from_source(
            "def f(a: int, *rest, b, c: List[int] = [], **kw: str) -> int:\n    return a\n",
            Path::new("mod.py"),
        )
        .unwrap();
        assert_eq!(
            decls[0].parameter_pairs(),
            vec![
                ("a".to_string(), Some("int".to_string())),
                ("rest".to_string(), None),
                ("b".to_string(), None),
                ("c".to_string(), Some("List[int]".to_string())),
                ("kw".to_string(), Some("str".to_string())),
            ]
        );
        assert_eq!(decls[0].line(), 1);
        assert_eq!(decls[0].path.as_path(), Path::new("mod.py"));
    }

    #[test]
    fn test_invalid_source_is_a_syntax_error() {
        let err = declarations_from_source("def f(:\n", Path::new("bad.py")).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }
}
