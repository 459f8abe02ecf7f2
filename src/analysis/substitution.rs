//! Replace calls with known return types by sample literals.

use crate::analysis::declarations::FunctionDeclaration;
use crate::analysis::return_types::ReturnTypeTable;
use crate::analysis::samples::sample_value;
use crate::python::ast::{Expr, ExprKind};
use crate::python::visit::{rebuild_expr, rebuild_function_def, Transformer};

/// A rewritten copy of a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub declaration: FunctionDeclaration,
    pub replaced: usize,
}

pub struct SampleValueSubstitutor<'t> {
    table: &'t ReturnTypeTable,
    replaced: usize,
}

impl<'t> SampleValueSubstitutor<'t> {
    pub fn new(table: &'t ReturnTypeTable) -> Self {
        Self { table, replaced: 0 }
    }

    /// Rewrite `declaration`, leaving the input untouched.
    pub fn substitute(table: &'t ReturnTypeTable, declaration: &FunctionDeclaration) -> Substitution {
        let mut substitutor = Self::new(table);
        let def = rebuild_function_def(&mut substitutor, &declaration.def);
        Substitution {
            declaration: declaration.with_def(def),
            replaced: substitutor.replaced,
        }
    }

    fn replacement(&self, expr: &Expr) -> Option<&'static Expr> {
        let ExprKind::Call { func, .. } = &expr.kind else {
            return None;
        };
        let name = func.call_target_name();
        self.table.lookup(&name).known_name().and_then(sample_value)
    }
}

impl Transformer for SampleValueSubstitutor<'_> {
    fn transform_expr(&mut self, expr: &Expr) -> Expr {
        match self.replacement(expr) {
            Some(sample) => {
                self.replaced += 1;
                sample.with_span(expr.span)
            }
            None => rebuild_expr(self, expr),
        }
    }
}
