//! Call-site enumeration for a single function.

use crate::analysis::return_types::{ReturnTypeTable, TypeTag};
use crate::analysis::samples::is_builtin;
use crate::python::ast::{Expr, ExprKind, FunctionDef, Opaque, Span};
use crate::python::visit::{walk_expr, walk_function_def, Visitor};

/// One call found in a function, annotated with what is known about the callee.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite<'a> {
    pub callee: String,
    pub return_type: TypeTag,
    pub builtin: bool,
    /// False for calls inside constructs kept as raw source; those cannot be
    /// substituted.
    pub rewritable: bool,
    pub span: Span,
    /// The call expression itself, absent for calls inside opaque source.
    pub node: Option<&'a Expr>,
}

impl CallSite<'_> {
    /// A replaceable call has a known return type with a sample literal.
    pub fn has_sample(&self) -> bool {
        self.return_type
            .known_name()
            .is_some_and(crate::analysis::samples::has_sample)
    }
}

pub struct CallSiteAnalyzer<'t> {
    table: &'t ReturnTypeTable,
}

impl<'t> CallSiteAnalyzer<'t> {
    pub fn new(table: &'t ReturnTypeTable) -> Self {
        Self { table }
    }

    /// Calls in `def` in syntactic order: decorators, parameter defaults,
    /// then the body. Nested definitions, lambdas and comprehensions are
    /// entered. A call precedes the calls inside its callee and arguments.
    pub fn analyze<'a>(&self, def: &'a FunctionDef) -> Vec<CallSite<'a>> {
        let mut collector = CallCollector {
            table: self.table,
            sites: Vec::new(),
        };
        walk_function_def(&mut collector, def);
        collector.sites
    }
}

struct CallCollector<'t, 'a> {
    table: &'t ReturnTypeTable,
    sites: Vec<CallSite<'a>>,
}

impl<'a> CallCollector<'_, 'a> {
    fn site(&self, callee: String, rewritable: bool, span: Span, node: Option<&'a Expr>) -> CallSite<'a> {
        CallSite {
            return_type: self.table.lookup(&callee).clone(),
            builtin: is_builtin(&callee),
            callee,
            rewritable,
            span,
            node,
        }
    }
}

impl<'a> Visitor<'a> for CallCollector<'_, 'a> {
    fn visit_expr(&mut self, expr: &'a Expr) {
        if let ExprKind::Call { func, .. } = &expr.kind {
            let site = self.site(func.call_target_name(), true, expr.span, Some(expr));
            self.sites.push(site);
        }
        walk_expr(self, expr);
    }

    fn visit_opaque(&mut self, opaque: &'a Opaque, span: Span) {
        for callee in &opaque.calls {
            let site = self.site(callee.clone(), false, span, None);
            self.sites.push(site);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::declarations::declarations_from_source;
    use crate::analysis::declarations::FunctionDeclaration;
    use crate::python::ast::UNNAMED_CALLEE;
    use indoc::indoc;
    use std::path::Path;

    fn decls(source: &str) -> Vec<FunctionDeclaration> {
        declarations_from_source(source, Path::new("t.py")).unwrap()
    }

    #[test]
    fn test_calls_in_syntactic_order() {
        let all = decls(indoc! {"
            def helper() -> int:
                return 1

            def f(a):
                x = outer(inner(a), len(a))
                y = obj.method(a)
                z = a.b.c(1)
                w = get()(2)
                return helper()
        "});
        let table = ReturnTypeTable::from_declarations(&all);
        let sites = CallSiteAnalyzer::new(&table).analyze(&all[1].def);
        let callees: Vec<&str> = sites.iter().map(|s| s.callee.as_str()).collect();
        assert_eq!(
            callees,
            vec!["outer", "inner", "len", "obj.method", "c", UNNAMED_CALLEE, "get", "helper"]
        );

        let helper = sites.last().unwrap();
        assert_eq!(helper.return_type, TypeTag::Known("int".into()));
        assert!(!helper.builtin);
        assert!(helper.has_sample());

        let len = &sites[2];
        assert!(len.builtin);
        assert!(len.return_type.is_unknown());
    }

    #[test]
    fn test_nested_scopes_are_entered() {
        let all = decls(indoc! {"
            def f(a=default()):
                def g():
                    return inner_call()
                h = lambda: lambda_call()
                return [comp_call(i) for i in range(a)]
        "});
        let table = ReturnTypeTable::from_declarations(&all);
        let sites = CallSiteAnalyzer::new(&table).analyze(&all[0].def);
        let callees: Vec<&str> = sites.iter().map(|s| s.callee.as_str()).collect();
        assert_eq!(
            callees,
            vec!["default", "inner_call", "lambda_call", "comp_call", "range"]
        );
        assert!(sites.iter().all(|s| s.rewritable && s.node.is_some()));
    }

    #[test]
    fn test_calls_in_opaque_source_are_not_rewritable() {
        let all = decls(indoc! {"
            def f(path):
                with open(path) as fh:
                    data = parse(fh)
                return 0
        "});
        let table = ReturnTypeTable::from_declarations(&all);
        let sites = CallSiteAnalyzer::new(&table).analyze(&all[0].def);
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].callee, "open");
        assert_eq!(sites[1].callee, "parse");
        assert!(sites.iter().all(|s| !s.rewritable && s.node.is_none()));
        assert_eq!(sites[0].span.line, 2);
    }
}
