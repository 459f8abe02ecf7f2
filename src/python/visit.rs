//! Generic traversal over [`crate::python::ast`].
//!
//! [`Visitor`] walks a tree by reference in syntactic order. [`Transformer`]
//! rebuilds a tree from a borrowed one, so a rewrite never touches its input.
//! Both follow the shape of `syn::visit`: every hook has a default that
//! delegates to a free `walk_*` / `rebuild_*` function, and overriding a hook
//! while still calling the free function keeps the recursion going.

use super::ast::*;

pub trait Visitor<'a> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        walk_expr(self, expr);
    }

    fn visit_function_def(&mut self, def: &'a FunctionDef) {
        walk_function_def(self, def);
    }

    /// Called for opaque statements and expressions. There is nothing to
    /// descend into.
    fn visit_opaque(&mut self, _opaque: &'a Opaque, _span: Span) {}
}

pub fn walk_body<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, body: &'a [Stmt]) {
    for stmt in body {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, stmt: &'a Stmt) {
    match &stmt.kind {
        StmtKind::Expr(expr) => visitor.visit_expr(expr),
        StmtKind::Assign { targets, value } => {
            for target in targets {
                visitor.visit_expr(target);
            }
            visitor.visit_expr(value);
        }
        StmtKind::AnnAssign { target, value, .. } => {
            visitor.visit_expr(target);
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        StmtKind::AugAssign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => {
            visitor.visit_expr(test);
            walk_body(visitor, body);
            walk_body(visitor, orelse);
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        } => {
            visitor.visit_expr(target);
            visitor.visit_expr(iter);
            walk_body(visitor, body);
            walk_body(visitor, orelse);
        }
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            walk_body(visitor, body);
            for handler in handlers {
                if let Some(kind) = &handler.kind {
                    visitor.visit_expr(kind);
                }
                walk_body(visitor, &handler.body);
            }
            walk_body(visitor, orelse);
            walk_body(visitor, finalbody);
        }
        StmtKind::FunctionDef(def) => visitor.visit_function_def(def),
        StmtKind::Raise { exc, cause } => {
            if let Some(exc) = exc {
                visitor.visit_expr(exc);
            }
            if let Some(cause) = cause {
                visitor.visit_expr(cause);
            }
        }
        StmtKind::Assert { test, msg } => {
            visitor.visit_expr(test);
            if let Some(msg) = msg {
                visitor.visit_expr(msg);
            }
        }
        StmtKind::Opaque(opaque) => visitor.visit_opaque(opaque, stmt.span),
        StmtKind::Global(_)
        | StmtKind::Nonlocal(_)
        | StmtKind::Pass
        | StmtKind::Break
        | StmtKind::Continue => {}
    }
}

/// Decorators, then parameter defaults, then the body.
pub fn walk_function_def<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, def: &'a FunctionDef) {
    for decorator in &def.decorators {
        visitor.visit_expr(decorator);
    }
    walk_parameters(visitor, &def.params);
    walk_body(visitor, &def.body);
}

fn walk_parameters<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, params: &'a [Parameter]) {
    for param in params {
        if let Some(default) = &param.default {
            visitor.visit_expr(default);
        }
    }
}

pub fn walk_expr<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, expr: &'a Expr) {
    match &expr.kind {
        ExprKind::Name(_) | ExprKind::Constant(_) => {}
        ExprKind::FString(parts) => {
            for part in parts {
                if let FStringPart::Formatted { value, .. } = part {
                    visitor.visit_expr(value);
                }
            }
        }
        ExprKind::List(elts) | ExprKind::Tuple(elts) | ExprKind::Set(elts) => {
            for elt in elts {
                visitor.visit_expr(elt);
            }
        }
        ExprKind::Dict(items) => {
            for item in items {
                match item {
                    DictItem::Pair(key, value) => {
                        visitor.visit_expr(key);
                        visitor.visit_expr(value);
                    }
                    DictItem::Splat(value) => visitor.visit_expr(value),
                }
            }
        }
        ExprKind::Attribute { value, .. } => visitor.visit_expr(value),
        ExprKind::Subscript { value, index } => {
            visitor.visit_expr(value);
            visitor.visit_expr(index);
        }
        ExprKind::Slice { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                visitor.visit_expr(part);
            }
        }
        ExprKind::Call { func, args } => {
            visitor.visit_expr(func);
            for arg in args {
                visitor.visit_expr(arg.value());
            }
        }
        ExprKind::BinOp { left, right, .. } | ExprKind::BoolOp { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::UnaryOp { operand, .. } => visitor.visit_expr(operand),
        ExprKind::Compare { left, comparisons } => {
            visitor.visit_expr(left);
            for (_, right) in comparisons {
                visitor.visit_expr(right);
            }
        }
        ExprKind::IfExp { test, body, orelse } => {
            // Source order is `body if test else orelse`.
            visitor.visit_expr(body);
            visitor.visit_expr(test);
            visitor.visit_expr(orelse);
        }
        ExprKind::Lambda { params, body } => {
            walk_parameters(visitor, params);
            visitor.visit_expr(body);
        }
        ExprKind::Comprehension {
            element,
            value,
            clauses,
            ..
        } => {
            visitor.visit_expr(element);
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
            for clause in clauses {
                match clause {
                    ComprehensionClause::For { target, iter } => {
                        visitor.visit_expr(target);
                        visitor.visit_expr(iter);
                    }
                    ComprehensionClause::If(test) => visitor.visit_expr(test),
                }
            }
        }
        ExprKind::NamedExpr { value, .. } => visitor.visit_expr(value),
        ExprKind::Starred(value) => visitor.visit_expr(value),
        ExprKind::Opaque(opaque) => visitor.visit_opaque(opaque, expr.span),
    }
}

/// Copy-on-rewrite transformation. The default hooks rebuild each node from
/// its transformed children; override `transform_expr` to replace nodes.
pub trait Transformer {
    fn transform_expr(&mut self, expr: &Expr) -> Expr {
        rebuild_expr(self, expr)
    }

    fn transform_stmt(&mut self, stmt: &Stmt) -> Stmt {
        rebuild_stmt(self, stmt)
    }

    fn transform_function_def(&mut self, def: &FunctionDef) -> FunctionDef {
        rebuild_function_def(self, def)
    }
}

pub fn rebuild_body<T: Transformer + ?Sized>(t: &mut T, body: &[Stmt]) -> Vec<Stmt> {
    body.iter().map(|stmt| t.transform_stmt(stmt)).collect()
}

fn rebuild_opt<T: Transformer + ?Sized>(t: &mut T, expr: &Option<Expr>) -> Option<Expr> {
    expr.as_ref().map(|e| t.transform_expr(e))
}

fn rebuild_boxed<T: Transformer + ?Sized>(t: &mut T, expr: &Expr) -> Box<Expr> {
    Box::new(t.transform_expr(expr))
}

fn rebuild_opt_boxed<T: Transformer + ?Sized>(
    t: &mut T,
    expr: &Option<Box<Expr>>,
) -> Option<Box<Expr>> {
    expr.as_ref().map(|e| rebuild_boxed(t, e))
}

fn rebuild_parameters<T: Transformer + ?Sized>(t: &mut T, params: &[Parameter]) -> Vec<Parameter> {
    params
        .iter()
        .map(|param| Parameter {
            default: rebuild_opt(t, &param.default),
            ..param.clone()
        })
        .collect()
}

pub fn rebuild_function_def<T: Transformer + ?Sized>(t: &mut T, def: &FunctionDef) -> FunctionDef {
    FunctionDef {
        name: def.name.clone(),
        decorators: def.decorators.iter().map(|d| t.transform_expr(d)).collect(),
        params: rebuild_parameters(t, &def.params),
        returns: def.returns.clone(),
        body: rebuild_body(t, &def.body),
        is_async: def.is_async,
        span: def.span,
    }
}

pub fn rebuild_stmt<T: Transformer + ?Sized>(t: &mut T, stmt: &Stmt) -> Stmt {
    let kind = match &stmt.kind {
        StmtKind::Expr(expr) => StmtKind::Expr(t.transform_expr(expr)),
        StmtKind::Assign { targets, value } => StmtKind::Assign {
            targets: targets.iter().map(|e| t.transform_expr(e)).collect(),
            value: t.transform_expr(value),
        },
        StmtKind::AnnAssign {
            target,
            annotation,
            value,
        } => StmtKind::AnnAssign {
            target: t.transform_expr(target),
            annotation: annotation.clone(),
            value: rebuild_opt(t, value),
        },
        StmtKind::AugAssign { target, op, value } => StmtKind::AugAssign {
            target: t.transform_expr(target),
            op: *op,
            value: t.transform_expr(value),
        },
        StmtKind::Return(value) => StmtKind::Return(rebuild_opt(t, value)),
        StmtKind::If { test, body, orelse } => StmtKind::If {
            test: t.transform_expr(test),
            body: rebuild_body(t, body),
            orelse: rebuild_body(t, orelse),
        },
        StmtKind::While { test, body, orelse } => StmtKind::While {
            test: t.transform_expr(test),
            body: rebuild_body(t, body),
            orelse: rebuild_body(t, orelse),
        },
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        } => StmtKind::For {
            target: t.transform_expr(target),
            iter: t.transform_expr(iter),
            body: rebuild_body(t, body),
            orelse: rebuild_body(t, orelse),
        },
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => StmtKind::Try {
            body: rebuild_body(t, body),
            handlers: handlers
                .iter()
                .map(|h| ExceptHandler {
                    kind: rebuild_opt(t, &h.kind),
                    name: h.name.clone(),
                    body: rebuild_body(t, &h.body),
                    span: h.span,
                })
                .collect(),
            orelse: rebuild_body(t, orelse),
            finalbody: rebuild_body(t, finalbody),
        },
        StmtKind::FunctionDef(def) => StmtKind::FunctionDef(Box::new(t.transform_function_def(def))),
        StmtKind::Raise { exc, cause } => StmtKind::Raise {
            exc: rebuild_opt(t, exc),
            cause: rebuild_opt(t, cause),
        },
        StmtKind::Assert { test, msg } => StmtKind::Assert {
            test: t.transform_expr(test),
            msg: rebuild_opt(t, msg),
        },
        other => other.clone(),
    };
    Stmt::new(kind, stmt.span)
}

pub fn rebuild_expr<T: Transformer + ?Sized>(t: &mut T, expr: &Expr) -> Expr {
    let kind = match &expr.kind {
        ExprKind::FString(parts) => ExprKind::FString(
            parts
                .iter()
                .map(|part| match part {
                    FStringPart::Formatted {
                        value,
                        conversion,
                        spec,
                    } => FStringPart::Formatted {
                        value: rebuild_boxed(t, value),
                        conversion: *conversion,
                        spec: spec.clone(),
                    },
                    literal => literal.clone(),
                })
                .collect(),
        ),
        ExprKind::List(elts) => ExprKind::List(elts.iter().map(|e| t.transform_expr(e)).collect()),
        ExprKind::Tuple(elts) => ExprKind::Tuple(elts.iter().map(|e| t.transform_expr(e)).collect()),
        ExprKind::Set(elts) => ExprKind::Set(elts.iter().map(|e| t.transform_expr(e)).collect()),
        ExprKind::Dict(items) => ExprKind::Dict(
            items
                .iter()
                .map(|item| match item {
                    DictItem::Pair(k, v) => DictItem::Pair(t.transform_expr(k), t.transform_expr(v)),
                    DictItem::Splat(v) => DictItem::Splat(t.transform_expr(v)),
                })
                .collect(),
        ),
        ExprKind::Attribute { value, attr } => ExprKind::Attribute {
            value: rebuild_boxed(t, value),
            attr: attr.clone(),
        },
        ExprKind::Subscript { value, index } => ExprKind::Subscript {
            value: rebuild_boxed(t, value),
            index: rebuild_boxed(t, index),
        },
        ExprKind::Slice { lower, upper, step } => ExprKind::Slice {
            lower: rebuild_opt_boxed(t, lower),
            upper: rebuild_opt_boxed(t, upper),
            step: rebuild_opt_boxed(t, step),
        },
        ExprKind::Call { func, args } => ExprKind::Call {
            func: rebuild_boxed(t, func),
            args: args
                .iter()
                .map(|arg| match arg {
                    Argument::Positional(e) => Argument::Positional(t.transform_expr(e)),
                    Argument::Starred(e) => Argument::Starred(t.transform_expr(e)),
                    Argument::DoubleStarred(e) => Argument::DoubleStarred(t.transform_expr(e)),
                    Argument::Keyword { name, value } => Argument::Keyword {
                        name: name.clone(),
                        value: t.transform_expr(value),
                    },
                })
                .collect(),
        },
        ExprKind::BinOp { left, op, right } => ExprKind::BinOp {
            left: rebuild_boxed(t, left),
            op: *op,
            right: rebuild_boxed(t, right),
        },
        ExprKind::UnaryOp { op, operand } => ExprKind::UnaryOp {
            op: *op,
            operand: rebuild_boxed(t, operand),
        },
        ExprKind::BoolOp { op, left, right } => ExprKind::BoolOp {
            op: *op,
            left: rebuild_boxed(t, left),
            right: rebuild_boxed(t, right),
        },
        ExprKind::Compare { left, comparisons } => ExprKind::Compare {
            left: rebuild_boxed(t, left),
            comparisons: comparisons
                .iter()
                .map(|(op, right)| (*op, t.transform_expr(right)))
                .collect(),
        },
        ExprKind::IfExp { test, body, orelse } => {
            let body = rebuild_boxed(t, body);
            let test = rebuild_boxed(t, test);
            ExprKind::IfExp {
                test,
                body,
                orelse: rebuild_boxed(t, orelse),
            }
        }
        ExprKind::Lambda { params, body } => ExprKind::Lambda {
            params: rebuild_parameters(t, params),
            body: rebuild_boxed(t, body),
        },
        ExprKind::Comprehension {
            kind,
            element,
            value,
            clauses,
        } => ExprKind::Comprehension {
            kind: *kind,
            element: rebuild_boxed(t, element),
            value: rebuild_opt_boxed(t, value),
            clauses: clauses
                .iter()
                .map(|clause| match clause {
                    ComprehensionClause::For { target, iter } => ComprehensionClause::For {
                        target: t.transform_expr(target),
                        iter: t.transform_expr(iter),
                    },
                    ComprehensionClause::If(test) => ComprehensionClause::If(t.transform_expr(test)),
                })
                .collect(),
        },
        ExprKind::NamedExpr { target, value } => ExprKind::NamedExpr {
            target: target.clone(),
            value: rebuild_boxed(t, value),
        },
        ExprKind::Starred(value) => ExprKind::Starred(rebuild_boxed(t, value)),
        ExprKind::Name(_) | ExprKind::Constant(_) | ExprKind::Opaque(_) => expr.kind.clone(),
    };
    Expr::new(kind, expr.span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::parser::parse_module;
    use std::path::Path;

    struct NameCollector<'a> {
        names: Vec<&'a str>,
    }

    impl<'a> Visitor<'a> for NameCollector<'a> {
        fn visit_expr(&mut self, expr: &'a Expr) {
            if let ExprKind::Name(id) = &expr.kind {
                self.names.push(id);
            }
            walk_expr(self, expr);
        }
    }

    struct RenameX;

    impl Transformer for RenameX {
        fn transform_expr(&mut self, expr: &Expr) -> Expr {
            match &expr.kind {
                ExprKind::Name(id) if id == "x" => Expr::new(ExprKind::Name("y".into()), expr.span),
                _ => rebuild_expr(self, expr),
            }
        }
    }

    #[test]
    fn test_visitor_reports_names_in_source_order() {
        let module = parse_module("a = b + c(d, e=f)\n", Path::new("t.py")).unwrap();
        let mut collector = NameCollector { names: vec![] };
        walk_body(&mut collector, &module.body);
        assert_eq!(collector.names, vec!["a", "b", "c", "d", "f"]);
    }

    #[test]
    fn test_visitor_conditional_expression_order() {
        let module = parse_module("r = a if b else c\n", Path::new("t.py")).unwrap();
        let mut collector = NameCollector { names: vec![] };
        walk_body(&mut collector, &module.body);
        assert_eq!(collector.names, vec!["r", "a", "b", "c"]);
    }

    #[test]
    fn test_transformer_leaves_input_untouched() {
        let module = parse_module("def f(x):\n    return x + 1\n", Path::new("t.py")).unwrap();
        let before = module.clone();
        let rewritten = rebuild_body(&mut RenameX, &module.body);
        assert_eq!(module, before);
        assert_ne!(rewritten, module.body);

        let mut collector = NameCollector { names: vec![] };
        walk_body(&mut collector, &rewritten);
        assert_eq!(collector.names, vec!["y"]);
    }
}
