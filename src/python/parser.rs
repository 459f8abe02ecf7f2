//! Tree-sitter front end for Python sources.
//!
//! `parse_module` rejects any source whose concrete tree contains an `ERROR`
//! or `MISSING` node, nests deeper than [`MAX_NESTING_DEPTH`], or uses syntax
//! the grammar still accepts from Python 2. It then lowers the tree into
//! [`crate::python::ast`].

use crate::errors::{Error, Result};
use crate::python::ast::*;
use num_bigint::BigInt;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Parse Python source text into an owned syntax tree.
pub fn parse_module(source: &str, path: &Path) -> Result<Module> {
    let tree = parse_tree(source, path)?;
    let root = tree.root_node();

    if let Some((bad, message)) = first_syntax_error(root, source) {
        return Err(Error::syntax(path, node_line(&bad), node_column(&bad), message));
    }

    let lowerer = Lowerer { source };
    Ok(Module {
        body: lowerer.lower_block(root),
    })
}

fn parse_tree(source: &str, path: &Path) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| Error::syntax(path, 1, 1, format!("python grammar unavailable: {}", e)))?;

    parser
        .parse(source, None)
        .ok_or_else(|| Error::syntax(path, 1, 1, "parser produced no tree"))
}

/// Deepest concrete-tree nesting accepted. Lowering and evaluation recurse
/// along the tree, so deeper input is refused up front.
pub const MAX_NESTING_DEPTH: usize = 200;

/// Pre-order walk for the first node that makes the source invalid Python 3.
fn first_syntax_error<'t>(root: Node<'t>, source: &str) -> Option<(Node<'t>, String)> {
    let mut cursor = root.walk();
    let mut depth = 0usize;
    loop {
        let node = cursor.node();
        if depth > MAX_NESTING_DEPTH {
            return Some((node, "too many nested levels".to_string()));
        }
        if let Some(message) = invalid_construct(node, source) {
            return Some((node, message));
        }
        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
            depth -= 1;
        }
    }
}

fn invalid_construct(node: Node, source: &str) -> Option<String> {
    if node.is_error() || node.is_missing() {
        return Some(describe_error(&node, source));
    }
    match node.kind() {
        "print_statement" | "exec_statement" => {
            let keyword = if node.kind() == "print_statement" { "print" } else { "exec" };
            let rest = node_text(&node, source)
                .strip_prefix(keyword)
                .unwrap_or("")
                .trim_start();
            (!rest.starts_with('(')).then(|| {
                format!("Missing parentheses in call to '{}'", keyword)
            })
        }
        "comparison_operator" if has_token(node, "<>") => {
            Some("invalid syntax near `<>`".to_string())
        }
        "integer" => legacy_integer(node_text(&node, source)),
        "except_clause" if has_token(node, ",") => {
            Some("multiple exception types must be parenthesized".to_string())
        }
        "parameters" | "lambda_parameters" => misordered_default(node),
        "block" => inconsistent_indentation(node, source),
        _ => None,
    }
}

fn legacy_integer(text: &str) -> Option<String> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    if digits.ends_with(['j', 'J']) {
        return None;
    }
    if digits.ends_with(['l', 'L']) {
        return Some(format!("invalid decimal literal `{}`", text));
    }
    let leading_zero = digits.len() > 1
        && digits.starts_with('0')
        && digits.bytes().all(|b| b.is_ascii_digit())
        && digits.bytes().any(|b| b != b'0');
    leading_zero.then(|| {
        "leading zeros in decimal integer literals are not permitted; \
         use an 0o prefix for octal integers"
            .to_string()
    })
}

/// A plain parameter after one with a default, before any `*`.
fn misordered_default(params: Node) -> Option<String> {
    let mut seen_default = false;
    for child in named_children(params) {
        let splat = match child.kind() {
            "typed_parameter" => named_children(child).first().is_some_and(|inner| {
                matches!(inner.kind(), "list_splat_pattern" | "dictionary_splat_pattern")
            }),
            kind => matches!(
                kind,
                "list_splat_pattern" | "dictionary_splat_pattern" | "keyword_separator"
            ),
        };
        if splat {
            return None;
        }
        match child.kind() {
            "default_parameter" | "typed_default_parameter" => seen_default = true,
            "identifier" | "typed_parameter" if seen_default => {
                return Some("parameter without a default follows parameter with a default".to_string())
            }
            "tuple_pattern" => return Some("sublist parameters are not supported".to_string()),
            _ => {}
        }
    }
    None
}

/// Indentation width of the line holding `node`, with tabs counted as 8
/// columns and as 1. `None` when `node` is not the first token on its line.
fn line_indent(node: &Node, source: &str) -> Option<(usize, usize)> {
    let column = node.start_position().column;
    let line_start = node.start_byte().checked_sub(column)?;
    let leading = source.get(line_start..node.start_byte())?;
    if !leading.chars().all(|c| matches!(c, ' ' | '\t' | '\x0c')) {
        return None;
    }
    Some(indent_widths(leading))
}

fn header_indent(node: &Node, source: &str) -> (usize, usize) {
    let column = node.start_position().column;
    let line_start = node.start_byte().saturating_sub(column);
    let line = source.get(line_start..).unwrap_or("");
    let leading_len = line.len() - line.trim_start_matches([' ', '\t', '\x0c']).len();
    indent_widths(&line[..leading_len])
}

fn indent_widths(leading: &str) -> (usize, usize) {
    let (mut tab8, mut tab1) = (0, 0);
    for c in leading.chars() {
        match c {
            '\t' => {
                tab8 = (tab8 / 8 + 1) * 8;
                tab1 += 1;
            }
            '\x0c' => {
                tab8 = 0;
                tab1 = 0;
            }
            _ => {
                tab8 += 1;
                tab1 += 1;
            }
        }
    }
    (tab8, tab1)
}

/// Statements of one block must line up whether a tab is 8 columns or 1,
/// and must sit deeper than their header either way.
fn inconsistent_indentation(block: Node, source: &str) -> Option<String> {
    let parent = block.parent()?;
    if block.start_position().row == parent.start_position().row {
        return None;
    }
    let (outer8, outer1) = header_indent(&parent, source);
    let mut expected: Option<(usize, usize)> = None;
    for stmt in named_children(block) {
        let Some((tab8, tab1)) = line_indent(&stmt, source) else {
            continue;
        };
        let consistent = match expected {
            None => tab8 > outer8 && tab1 > outer1,
            Some((first8, first1)) => tab8 == first8 && tab1 == first1,
        };
        if !consistent {
            return Some("inconsistent use of tabs and spaces in indentation".to_string());
        }
        expected.get_or_insert((tab8, tab1));
    }
    None
}

fn describe_error(node: &Node, source: &str) -> String {
    if node.is_missing() {
        return format!("missing `{}`", node.kind());
    }
    let snippet: String = node_text(node, source)
        .lines()
        .next()
        .unwrap_or("")
        .chars()
        .take(24)
        .collect();
    if snippet.trim().is_empty() {
        "invalid syntax".to_string()
    } else {
        format!("invalid syntax near `{}`", snippet.trim())
    }
}

/// Get text for a tree-sitter node
pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Get the line number for a tree-sitter node (1-indexed)
pub fn node_line(node: &Node) -> usize {
    node.start_position().row + 1
}

/// Get the column number for a tree-sitter node (1-indexed)
pub fn node_column(node: &Node) -> usize {
    node.start_position().column + 1
}

fn span_of(node: &Node) -> Span {
    Span {
        start: node.start_byte(),
        end: node.end_byte(),
        line: node_line(node),
        column: node_column(node),
    }
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect();
    children
}

fn all_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node
        .children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect();
    children
}

fn fields<'t>(node: Node<'t>, name: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node.children_by_field_name(name, &mut cursor).collect();
    children
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

/// Callee name of a concrete `call` node, matching [`Expr::call_target_name`].
fn cst_callee_name(call: Node, source: &str) -> String {
    let Some(func) = call.child_by_field_name("function") else {
        return UNNAMED_CALLEE.to_string();
    };
    match func.kind() {
        "identifier" | "keyword_identifier" => node_text(&func, source).to_string(),
        "attribute" => {
            let attr = func
                .child_by_field_name("attribute")
                .map(|a| node_text(&a, source).to_string())
                .unwrap_or_default();
            match func.child_by_field_name("object") {
                Some(obj) if obj.kind() == "identifier" => {
                    format!("{}.{}", node_text(&obj, source), attr)
                }
                _ => attr,
            }
        }
        _ => UNNAMED_CALLEE.to_string(),
    }
}

fn collect_cst_calls(node: Node, source: &str, out: &mut Vec<String>) {
    if node.kind() == "call" {
        out.push(cst_callee_name(node, source));
    }
    for child in named_children(node) {
        collect_cst_calls(child, source, out);
    }
}

/// Strip the indentation the node's first line had from its continuation lines.
fn dedent(text: &str, column: usize) -> String {
    let indent = column.saturating_sub(1);
    let mut lines = text.lines();
    let mut out = lines.next().unwrap_or("").to_string();
    for line in lines {
        out.push('\n');
        let leading = line.len() - line.trim_start_matches([' ', '\t']).len();
        out.push_str(&line[leading.min(indent)..]);
    }
    out
}

struct Lowerer<'s> {
    source: &'s str,
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: &Node) -> &'s str {
        node_text(node, self.source)
    }

    fn opaque(&self, node: Node) -> Opaque {
        let mut calls = Vec::new();
        collect_cst_calls(node, self.source, &mut calls);
        Opaque {
            source: dedent(self.text(&node), node_column(&node)),
            calls,
        }
    }

    fn opaque_stmt(&self, node: Node) -> Stmt {
        Stmt::new(StmtKind::Opaque(self.opaque(node)), span_of(&node))
    }

    fn opaque_expr(&self, node: Node) -> Expr {
        Expr::new(ExprKind::Opaque(self.opaque(node)), span_of(&node))
    }

    // ---- statements ------------------------------------------------------

    fn lower_block(&self, node: Node) -> Vec<Stmt> {
        named_children(node)
            .into_iter()
            .map(|child| self.lower_stmt(child))
            .collect()
    }

    fn lower_body_field(&self, node: Node, field: &str) -> Vec<Stmt> {
        node.child_by_field_name(field)
            .map(|body| self.lower_block(body))
            .unwrap_or_default()
    }

    fn lower_stmt(&self, node: Node) -> Stmt {
        let span = span_of(&node);
        let kind = match node.kind() {
            "expression_statement" => return self.lower_expression_statement(node),
            "return_statement" => StmtKind::Return(
                named_children(node)
                    .first()
                    .map(|value| self.lower_expr(*value)),
            ),
            "if_statement" => return self.lower_if(node),
            "while_statement" => {
                let Some(condition) = node.child_by_field_name("condition") else {
                    return self.opaque_stmt(node);
                };
                StmtKind::While {
                    test: self.lower_expr(condition),
                    body: self.lower_body_field(node, "body"),
                    orelse: self.lower_else(node.child_by_field_name("alternative")),
                }
            }
            "for_statement" => {
                let (Some(left), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) else {
                    return self.opaque_stmt(node);
                };
                if has_token(node, "async") {
                    return self.opaque_stmt(node);
                }
                StmtKind::For {
                    target: self.lower_expr(left),
                    iter: self.lower_expr(right),
                    body: self.lower_body_field(node, "body"),
                    orelse: self.lower_else(node.child_by_field_name("alternative")),
                }
            }
            "try_statement" => return self.lower_try(node),
            "function_definition" => match self.lower_function(node, Vec::new()) {
                Some(def) => StmtKind::FunctionDef(Box::new(def)),
                None => return self.opaque_stmt(node),
            },
            "decorated_definition" => return self.lower_decorated(node),
            "raise_statement" => {
                let cause = node.child_by_field_name("cause");
                let exc = named_children(node)
                    .into_iter()
                    .find(|child| Some(child.id()) != cause.map(|c| c.id()));
                StmtKind::Raise {
                    exc: exc.map(|e| self.lower_expr(e)),
                    cause: cause.map(|c| self.lower_expr(c)),
                }
            }
            "assert_statement" => {
                let parts = named_children(node);
                let Some(test) = parts.first() else {
                    return self.opaque_stmt(node);
                };
                StmtKind::Assert {
                    test: self.lower_expr(*test),
                    msg: parts.get(1).map(|m| self.lower_expr(*m)),
                }
            }
            "global_statement" => StmtKind::Global(self.identifiers(node)),
            "nonlocal_statement" => StmtKind::Nonlocal(self.identifiers(node)),
            "pass_statement" => StmtKind::Pass,
            "break_statement" => StmtKind::Break,
            "continue_statement" => StmtKind::Continue,
            _ => return self.opaque_stmt(node),
        };
        Stmt::new(kind, span)
    }

    fn identifiers(&self, node: Node) -> Vec<String> {
        named_children(node)
            .iter()
            .map(|id| self.text(id).to_string())
            .collect()
    }

    fn lower_expression_statement(&self, node: Node) -> Stmt {
        let span = span_of(&node);
        let children = named_children(node);
        if children.len() != 1 {
            let elts = children.into_iter().map(|c| self.lower_expr(c)).collect();
            return Stmt::new(StmtKind::Expr(Expr::new(ExprKind::Tuple(elts), span)), span);
        }
        let inner = children[0];
        match inner.kind() {
            "assignment" => self.lower_assignment(node, inner),
            "augmented_assignment" => {
                let (Some(left), Some(op), Some(right)) = (
                    inner.child_by_field_name("left"),
                    inner.child_by_field_name("operator"),
                    inner.child_by_field_name("right"),
                ) else {
                    return self.opaque_stmt(node);
                };
                let symbol = self.text(&op).trim_end_matches('=');
                match BinOp::from_symbol(symbol) {
                    Some(op) if right.kind() != "yield" => Stmt::new(
                        StmtKind::AugAssign {
                            target: self.lower_expr(left),
                            op,
                            value: self.lower_expr(right),
                        },
                        span,
                    ),
                    _ => self.opaque_stmt(node),
                }
            }
            "yield" => self.opaque_stmt(node),
            _ => Stmt::new(StmtKind::Expr(self.lower_expr(inner)), span),
        }
    }

    fn lower_assignment(&self, stmt: Node, node: Node) -> Stmt {
        let span = span_of(&stmt);
        let Some(left) = node.child_by_field_name("left") else {
            return self.opaque_stmt(stmt);
        };

        if let Some(ty) = node.child_by_field_name("type") {
            let value = node.child_by_field_name("right");
            if value.is_some_and(|v| v.kind() == "assignment" || v.kind() == "yield") {
                return self.opaque_stmt(stmt);
            }
            return Stmt::new(
                StmtKind::AnnAssign {
                    target: self.lower_expr(left),
                    annotation: self.annotation(ty),
                    value: value.map(|v| self.lower_expr(v)),
                },
                span,
            );
        }

        let mut targets = vec![self.lower_expr(left)];
        let mut current = node.child_by_field_name("right");
        loop {
            match current {
                Some(next) if next.kind() == "assignment" => {
                    if next.child_by_field_name("type").is_some() {
                        return self.opaque_stmt(stmt);
                    }
                    let Some(left) = next.child_by_field_name("left") else {
                        return self.opaque_stmt(stmt);
                    };
                    targets.push(self.lower_expr(left));
                    current = next.child_by_field_name("right");
                }
                Some(value) if value.kind() != "augmented_assignment" && value.kind() != "yield" => {
                    return Stmt::new(
                        StmtKind::Assign {
                            targets,
                            value: self.lower_expr(value),
                        },
                        span,
                    );
                }
                _ => return self.opaque_stmt(stmt),
            }
        }
    }

    fn lower_if(&self, node: Node) -> Stmt {
        let Some(condition) = node.child_by_field_name("condition") else {
            return self.opaque_stmt(node);
        };

        let mut orelse = Vec::new();
        for clause in fields(node, "alternative").into_iter().rev() {
            match clause.kind() {
                "else_clause" => orelse = self.lower_body_field(clause, "body"),
                "elif_clause" => {
                    let Some(test) = clause.child_by_field_name("condition") else {
                        return self.opaque_stmt(node);
                    };
                    let nested = StmtKind::If {
                        test: self.lower_expr(test),
                        body: self.lower_body_field(clause, "consequence"),
                        orelse,
                    };
                    orelse = vec![Stmt::new(nested, span_of(&clause))];
                }
                _ => return self.opaque_stmt(node),
            }
        }

        Stmt::new(
            StmtKind::If {
                test: self.lower_expr(condition),
                body: self.lower_body_field(node, "consequence"),
                orelse,
            },
            span_of(&node),
        )
    }

    fn lower_else(&self, clause: Option<Node>) -> Vec<Stmt> {
        clause
            .map(|c| self.lower_body_field(c, "body"))
            .unwrap_or_default()
    }

    fn lower_try(&self, node: Node) -> Stmt {
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();

        for clause in named_children(node) {
            match clause.kind() {
                "block" => {}
                "except_clause" => {
                    let mut exprs = Vec::new();
                    let mut body = Vec::new();
                    for part in named_children(clause) {
                        if part.kind() == "block" {
                            body = self.lower_block(part);
                        } else {
                            exprs.push(part);
                        }
                    }
                    // `except E as name` arrives as one `as_pattern`
                    let (kind, name) = match exprs.as_slice() {
                        [] => (None, None),
                        [pattern] if pattern.kind() == "as_pattern" => {
                            let value = named_children(*pattern).first().copied();
                            let alias = pattern.child_by_field_name("alias");
                            match (value, alias.and_then(|a| self.alias_name(a))) {
                                (Some(value), Some(name)) => (Some(value), Some(name)),
                                _ => return self.opaque_stmt(node),
                            }
                        }
                        [kind] => (Some(*kind), None),
                        [kind, alias] => match self.alias_name(*alias) {
                            Some(name) => (Some(*kind), Some(name)),
                            None => return self.opaque_stmt(node),
                        },
                        _ => return self.opaque_stmt(node),
                    };
                    handlers.push(ExceptHandler {
                        kind: kind.map(|e| self.lower_expr(e)),
                        name,
                        body,
                        span: span_of(&clause),
                    });
                }
                "else_clause" => orelse = self.lower_body_field(clause, "body"),
                "finally_clause" => {
                    finalbody = named_children(clause)
                        .into_iter()
                        .find(|c| c.kind() == "block")
                        .map(|b| self.lower_block(b))
                        .unwrap_or_default();
                }
                _ => return self.opaque_stmt(node),
            }
        }

        Stmt::new(
            StmtKind::Try {
                body: self.lower_body_field(node, "body"),
                handlers,
                orelse,
                finalbody,
            },
            span_of(&node),
        )
    }

    /// Name bound by `as`, bare or wrapped in an `as_pattern_target`.
    fn alias_name(&self, alias: Node) -> Option<String> {
        let target = match (alias.kind(), named_children(alias).first()) {
            ("as_pattern_target", Some(inner)) => *inner,
            _ => alias,
        };
        let text = self.text(&target).trim();
        let is_name = target.kind() == "identifier"
            || (target.kind() == "as_pattern_target"
                && !text.is_empty()
                && text.chars().all(|c| c == '_' || c.is_alphanumeric())
                && !text.starts_with(|c: char| c.is_ascii_digit()));
        is_name.then(|| text.to_string())
    }

    fn lower_decorated(&self, node: Node) -> Stmt {
        let decorators: Vec<Expr> = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "decorator")
            .filter_map(|d| named_children(d).first().map(|e| self.lower_expr(*e)))
            .collect();

        match node.child_by_field_name("definition") {
            Some(def) if def.kind() == "function_definition" => {
                match self.lower_function(def, decorators) {
                    Some(lowered) => Stmt::new(
                        StmtKind::FunctionDef(Box::new(lowered)),
                        span_of(&node),
                    ),
                    None => self.opaque_stmt(node),
                }
            }
            _ => self.opaque_stmt(node),
        }
    }

    fn lower_function(&self, node: Node, decorators: Vec<Expr>) -> Option<FunctionDef> {
        let name = self.text(&node.child_by_field_name("name")?).to_string();
        let params = match node.child_by_field_name("parameters") {
            Some(params) => self.lower_parameters(params)?,
            None => Vec::new(),
        };
        Some(FunctionDef {
            name,
            decorators,
            params,
            returns: node
                .child_by_field_name("return_type")
                .map(|ty| self.annotation(ty)),
            body: self.lower_body_field(node, "body"),
            is_async: has_token(node, "async"),
            span: span_of(&node),
        })
    }

    fn annotation(&self, ty: Node) -> Annotation {
        let text = self.text(&ty).to_string();
        let inner = named_children(ty);
        let simple = match inner.as_slice() {
            [only] if only.kind() == "identifier" => true,
            [] => ty.kind() == "identifier",
            _ => false,
        };
        Annotation {
            simple_name: simple.then(|| text.clone()),
            text,
        }
    }

    /// `None` when the parameter list uses a form without a modern equivalent,
    /// such as Python 2 tuple parameters.
    fn lower_parameters(&self, node: Node) -> Option<Vec<Parameter>> {
        let mut params: Vec<Parameter> = Vec::new();
        let mut keyword_only = false;

        for child in named_children(node) {
            let positional = if keyword_only {
                ParamKind::KeywordOnly
            } else {
                ParamKind::Positional
            };
            let param = match child.kind() {
                "identifier" => Parameter {
                    name: self.text(&child).to_string(),
                    kind: positional,
                    annotation: None,
                    default: None,
                },
                "default_parameter" | "typed_default_parameter" => Parameter {
                    name: self.text(&child.child_by_field_name("name")?).to_string(),
                    kind: positional,
                    annotation: child.child_by_field_name("type").map(|t| self.annotation(t)),
                    default: child
                        .child_by_field_name("value")
                        .map(|v| self.lower_expr(v)),
                },
                "typed_parameter" => {
                    let ty = child.child_by_field_name("type");
                    let inner = named_children(child)
                        .into_iter()
                        .find(|c| Some(c.id()) != ty.map(|t| t.id()))?;
                    let (name, kind) = self.splat_or_name(inner, positional)?;
                    if kind == ParamKind::VarArgs {
                        keyword_only = true;
                    }
                    Parameter {
                        name,
                        kind,
                        annotation: ty.map(|t| self.annotation(t)),
                        default: None,
                    }
                }
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    let (name, kind) = self.splat_or_name(child, positional)?;
                    if kind == ParamKind::VarArgs {
                        keyword_only = true;
                    }
                    Parameter {
                        name,
                        kind,
                        annotation: None,
                        default: None,
                    }
                }
                "keyword_separator" => {
                    keyword_only = true;
                    continue;
                }
                "positional_separator" => {
                    for earlier in &mut params {
                        earlier.kind = ParamKind::PositionalOnly;
                    }
                    continue;
                }
                _ => return None,
            };
            params.push(param);
        }

        Some(params)
    }

    fn splat_or_name(&self, node: Node, positional: ParamKind) -> Option<(String, ParamKind)> {
        match node.kind() {
            "identifier" => Some((self.text(&node).to_string(), positional)),
            "list_splat_pattern" => {
                let id = named_children(node).into_iter().next()?;
                Some((self.text(&id).to_string(), ParamKind::VarArgs))
            }
            "dictionary_splat_pattern" => {
                let id = named_children(node).into_iter().next()?;
                Some((self.text(&id).to_string(), ParamKind::KwArgs))
            }
            _ => None,
        }
    }

    // ---- expressions -----------------------------------------------------

    fn lower_exprs(&self, nodes: Vec<Node>) -> Vec<Expr> {
        nodes.into_iter().map(|n| self.lower_expr(n)).collect()
    }

    fn lower_expr(&self, node: Node) -> Expr {
        let span = span_of(&node);
        let kind = match node.kind() {
            "identifier" | "keyword_identifier" => ExprKind::Name(self.text(&node).to_string()),
            "integer" | "float" if is_imaginary(self.text(&node)) => {
                match parse_imaginary_literal(self.text(&node)) {
                    Some(value) => ExprKind::Constant(Constant::Imaginary(value)),
                    None => return self.opaque_expr(node),
                }
            }
            "integer" => match parse_int_literal(self.text(&node)) {
                Some(value) => ExprKind::Constant(Constant::Int(value)),
                None => return self.opaque_expr(node),
            },
            "float" => match parse_float_literal(self.text(&node)) {
                Some(value) => ExprKind::Constant(Constant::Float(value)),
                None => return self.opaque_expr(node),
            },
            "true" => ExprKind::Constant(Constant::Bool(true)),
            "false" => ExprKind::Constant(Constant::Bool(false)),
            "none" => ExprKind::Constant(Constant::None),
            "ellipsis" => ExprKind::Constant(Constant::Ellipsis),
            "string" => match self.lower_strings(&[node]) {
                Some(kind) => kind,
                None => return self.opaque_expr(node),
            },
            "concatenated_string" => match self.lower_strings(&named_children(node)) {
                Some(kind) => kind,
                None => return self.opaque_expr(node),
            },
            "parenthesized_expression" => match named_children(node).as_slice() {
                [inner] if inner.kind() != "yield" => return self.lower_expr(*inner).with_span(span),
                _ => return self.opaque_expr(node),
            },
            "list" | "list_pattern" => ExprKind::List(self.lower_exprs(named_children(node))),
            "tuple" | "tuple_pattern" | "expression_list" | "pattern_list" => {
                ExprKind::Tuple(self.lower_exprs(named_children(node)))
            }
            "set" => ExprKind::Set(self.lower_exprs(named_children(node))),
            "dictionary" => {
                let mut items = Vec::new();
                for child in named_children(node) {
                    match child.kind() {
                        "pair" => {
                            let (Some(k), Some(v)) = (
                                child.child_by_field_name("key"),
                                child.child_by_field_name("value"),
                            ) else {
                                return self.opaque_expr(node);
                            };
                            items.push(DictItem::Pair(self.lower_expr(k), self.lower_expr(v)));
                        }
                        "dictionary_splat" => match named_children(child).first() {
                            Some(inner) => items.push(DictItem::Splat(self.lower_expr(*inner))),
                            None => return self.opaque_expr(node),
                        },
                        _ => return self.opaque_expr(node),
                    }
                }
                ExprKind::Dict(items)
            }
            "list_splat" | "list_splat_pattern" => match named_children(node).first() {
                Some(inner) => ExprKind::Starred(Box::new(self.lower_expr(*inner))),
                None => return self.opaque_expr(node),
            },
            "attribute" => {
                let (Some(object), Some(attr)) = (
                    node.child_by_field_name("object"),
                    node.child_by_field_name("attribute"),
                ) else {
                    return self.opaque_expr(node);
                };
                ExprKind::Attribute {
                    value: Box::new(self.lower_expr(object)),
                    attr: self.text(&attr).to_string(),
                }
            }
            "subscript" => {
                let Some(value) = node.child_by_field_name("value") else {
                    return self.opaque_expr(node);
                };
                let mut indices = self.lower_exprs(fields(node, "subscript"));
                let index = match indices.len() {
                    0 => return self.opaque_expr(node),
                    1 => indices.remove(0),
                    _ => Expr::new(ExprKind::Tuple(indices), span),
                };
                ExprKind::Subscript {
                    value: Box::new(self.lower_expr(value)),
                    index: Box::new(index),
                }
            }
            "slice" => {
                let mut parts: [Option<Box<Expr>>; 3] = [None, None, None];
                let mut position = 0;
                for child in all_children(node) {
                    if child.is_named() {
                        if position < 3 {
                            parts[position] = Some(Box::new(self.lower_expr(child)));
                        }
                    } else if child.kind() == ":" {
                        position += 1;
                    }
                }
                let [lower, upper, step] = parts;
                ExprKind::Slice { lower, upper, step }
            }
            "call" => return self.lower_call(node),
            "binary_operator" => {
                let (Some(left), Some(op), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("operator"),
                    node.child_by_field_name("right"),
                ) else {
                    return self.opaque_expr(node);
                };
                let Some(op) = BinOp::from_symbol(self.text(&op)) else {
                    return self.opaque_expr(node);
                };
                ExprKind::BinOp {
                    left: Box::new(self.lower_expr(left)),
                    op,
                    right: Box::new(self.lower_expr(right)),
                }
            }
            "unary_operator" => {
                let (Some(op), Some(arg)) = (
                    node.child_by_field_name("operator"),
                    node.child_by_field_name("argument"),
                ) else {
                    return self.opaque_expr(node);
                };
                let op = match self.text(&op) {
                    "-" => UnaryOp::USub,
                    "+" => UnaryOp::UAdd,
                    "~" => UnaryOp::Invert,
                    _ => return self.opaque_expr(node),
                };
                ExprKind::UnaryOp {
                    op,
                    operand: Box::new(self.lower_expr(arg)),
                }
            }
            "not_operator" => match node.child_by_field_name("argument") {
                Some(arg) => ExprKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(self.lower_expr(arg)),
                },
                None => return self.opaque_expr(node),
            },
            "boolean_operator" => {
                let (Some(left), Some(op), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("operator"),
                    node.child_by_field_name("right"),
                ) else {
                    return self.opaque_expr(node);
                };
                let op = match self.text(&op) {
                    "and" => BoolOp::And,
                    "or" => BoolOp::Or,
                    _ => return self.opaque_expr(node),
                };
                ExprKind::BoolOp {
                    op,
                    left: Box::new(self.lower_expr(left)),
                    right: Box::new(self.lower_expr(right)),
                }
            }
            "comparison_operator" => return self.lower_comparison(node),
            "conditional_expression" => match named_children(node).as_slice() {
                [body, test, orelse] => ExprKind::IfExp {
                    test: Box::new(self.lower_expr(*test)),
                    body: Box::new(self.lower_expr(*body)),
                    orelse: Box::new(self.lower_expr(*orelse)),
                },
                _ => return self.opaque_expr(node),
            },
            "named_expression" => {
                let (Some(name), Some(value)) = (
                    node.child_by_field_name("name"),
                    node.child_by_field_name("value"),
                ) else {
                    return self.opaque_expr(node);
                };
                ExprKind::NamedExpr {
                    target: self.text(&name).to_string(),
                    value: Box::new(self.lower_expr(value)),
                }
            }
            "lambda" => {
                let params = match node.child_by_field_name("parameters") {
                    Some(p) => match self.lower_parameters(p) {
                        Some(params) => params,
                        None => return self.opaque_expr(node),
                    },
                    None => Vec::new(),
                };
                let Some(body) = node.child_by_field_name("body") else {
                    return self.opaque_expr(node);
                };
                ExprKind::Lambda {
                    params,
                    body: Box::new(self.lower_expr(body)),
                }
            }
            "list_comprehension" => return self.lower_comprehension(node, ComprehensionKind::List),
            "set_comprehension" => return self.lower_comprehension(node, ComprehensionKind::Set),
            "generator_expression" => {
                return self.lower_comprehension(node, ComprehensionKind::Generator)
            }
            "dictionary_comprehension" => {
                return self.lower_comprehension(node, ComprehensionKind::Dict)
            }
            _ => return self.opaque_expr(node),
        };
        Expr::new(kind, span)
    }

    fn lower_call(&self, node: Node) -> Expr {
        let span = span_of(&node);
        let (Some(func), Some(arguments)) = (
            node.child_by_field_name("function"),
            node.child_by_field_name("arguments"),
        ) else {
            return self.opaque_expr(node);
        };

        let args = if arguments.kind() == "generator_expression" {
            vec![Argument::Positional(self.lower_expr(arguments))]
        } else {
            let mut args = Vec::new();
            for arg in named_children(arguments) {
                let lowered = match arg.kind() {
                    "keyword_argument" => {
                        let (Some(name), Some(value)) = (
                            arg.child_by_field_name("name"),
                            arg.child_by_field_name("value"),
                        ) else {
                            return self.opaque_expr(node);
                        };
                        Argument::Keyword {
                            name: self.text(&name).to_string(),
                            value: self.lower_expr(value),
                        }
                    }
                    "list_splat" => match named_children(arg).first() {
                        Some(inner) => Argument::Starred(self.lower_expr(*inner)),
                        None => return self.opaque_expr(node),
                    },
                    "dictionary_splat" => match named_children(arg).first() {
                        Some(inner) => Argument::DoubleStarred(self.lower_expr(*inner)),
                        None => return self.opaque_expr(node),
                    },
                    _ => Argument::Positional(self.lower_expr(arg)),
                };
                args.push(lowered);
            }
            args
        };

        Expr::new(
            ExprKind::Call {
                func: Box::new(self.lower_expr(func)),
                args,
            },
            span,
        )
    }

    fn lower_comparison(&self, node: Node) -> Expr {
        let mut operands = Vec::new();
        let mut ops = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for child in all_children(node) {
            if child.is_named() {
                if !operands.is_empty() {
                    let symbol = pending.join(" ");
                    match CmpOp::from_symbol(&symbol) {
                        Some(op) => ops.push(op),
                        None => return self.opaque_expr(node),
                    }
                    pending.clear();
                }
                operands.push(self.lower_expr(child));
            } else {
                pending.extend(self.text(&child).split_whitespace().map(str::to_string));
            }
        }

        let mut operands = operands.into_iter();
        let Some(left) = operands.next() else {
            return self.opaque_expr(node);
        };
        let comparisons: Vec<(CmpOp, Expr)> = ops.into_iter().zip(operands).collect();
        if comparisons.is_empty() {
            return self.opaque_expr(node);
        }
        Expr::new(
            ExprKind::Compare {
                left: Box::new(left),
                comparisons,
            },
            span_of(&node),
        )
    }

    fn lower_comprehension(&self, node: Node, kind: ComprehensionKind) -> Expr {
        let Some(body) = node.child_by_field_name("body") else {
            return self.opaque_expr(node);
        };
        let (element, value) = if kind == ComprehensionKind::Dict {
            let (Some(k), Some(v)) = (
                body.child_by_field_name("key"),
                body.child_by_field_name("value"),
            ) else {
                return self.opaque_expr(node);
            };
            (self.lower_expr(k), Some(Box::new(self.lower_expr(v))))
        } else {
            (self.lower_expr(body), None)
        };

        let mut clauses = Vec::new();
        for clause in named_children(node) {
            match clause.kind() {
                "for_in_clause" => {
                    if has_token(clause, "async") {
                        return self.opaque_expr(node);
                    }
                    let Some(left) = clause.child_by_field_name("left") else {
                        return self.opaque_expr(node);
                    };
                    let mut rights = self.lower_exprs(fields(clause, "right"));
                    let iter = match rights.len() {
                        0 => return self.opaque_expr(node),
                        1 => rights.remove(0),
                        _ => Expr::new(ExprKind::Tuple(rights), span_of(&clause)),
                    };
                    clauses.push(ComprehensionClause::For {
                        target: self.lower_expr(left),
                        iter,
                    });
                }
                "if_clause" => match named_children(clause).first() {
                    Some(test) => clauses.push(ComprehensionClause::If(self.lower_expr(*test))),
                    None => return self.opaque_expr(node),
                },
                _ if clause.id() == body.id() => {}
                _ => return self.opaque_expr(node),
            }
        }

        Expr::new(
            ExprKind::Comprehension {
                kind,
                element: Box::new(element),
                value,
                clauses,
            },
            span_of(&node),
        )
    }

    /// Lower one string or the pieces of an implicitly concatenated string.
    fn lower_strings(&self, pieces: &[Node]) -> Option<ExprKind> {
        let mut is_bytes = None;
        let mut formatted = false;
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut bytes: Vec<u8> = Vec::new();

        for piece in pieces {
            if piece.kind() != "string" {
                return None;
            }
            let children = all_children(*piece);
            let start = children.first().filter(|c| c.kind() == "string_start")?;
            let prefix: String = self
                .text(start)
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .map(|c| c.to_ascii_lowercase())
                .collect();
            if prefix.contains('t') {
                return None;
            }
            let piece_bytes = prefix.contains('b');
            if *is_bytes.get_or_insert(piece_bytes) != piece_bytes {
                return None;
            }
            let raw = prefix.contains('r');
            let fstring = prefix.contains('f');
            formatted |= fstring;

            for child in &children[1..] {
                match child.kind() {
                    "string_content" => {
                        let mut text = self.text(child).to_string();
                        if fstring {
                            text = text.replace("{{", "{").replace("}}", "}");
                        }
                        let decoded = if raw { text } else { decode_escapes(&text, piece_bytes)? };
                        if piece_bytes {
                            for ch in decoded.chars() {
                                bytes.push(u8::try_from(u32::from(ch)).ok()?);
                            }
                        } else {
                            push_literal(&mut parts, &decoded);
                        }
                    }
                    "interpolation" if fstring => parts.push(self.lower_interpolation(*child)?),
                    "escape_interpolation" if fstring => {
                        push_literal(&mut parts, self.text(child).get(..1).unwrap_or(""))
                    }
                    "escape_sequence" if !raw => {
                        let decoded = decode_escapes(self.text(child), piece_bytes)?;
                        if piece_bytes {
                            for ch in decoded.chars() {
                                bytes.push(u8::try_from(u32::from(ch)).ok()?);
                            }
                        } else {
                            push_literal(&mut parts, &decoded);
                        }
                    }
                    "string_end" => {}
                    _ => return None,
                }
            }
        }

        if is_bytes == Some(true) {
            return Some(ExprKind::Constant(Constant::Bytes(bytes)));
        }
        if formatted {
            return Some(ExprKind::FString(parts));
        }
        let text = parts
            .into_iter()
            .map(|p| match p {
                FStringPart::Literal(s) => s,
                FStringPart::Formatted { .. } => String::new(),
            })
            .collect();
        Some(ExprKind::Constant(Constant::Str(text)))
    }

    fn lower_interpolation(&self, node: Node) -> Option<FStringPart> {
        if has_token(node, "=") {
            return None;
        }
        let value = self.lower_expr(node.child_by_field_name("expression")?);
        let conversion = match node.child_by_field_name("type_conversion") {
            Some(conv) => Some(self.text(&conv).trim_start_matches('!').chars().next()?),
            None => None,
        };
        let spec = match node.child_by_field_name("format_specifier") {
            Some(spec) => {
                if !named_children(spec).is_empty() {
                    return None;
                }
                Some(self.text(&spec).trim_start_matches(':').to_string())
            }
            None => None,
        };
        Some(FStringPart::Formatted {
            value: Box::new(value),
            conversion,
            spec,
        })
    }
}

fn push_literal(parts: &mut Vec<FStringPart>, text: &str) {
    if let Some(FStringPart::Literal(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(FStringPart::Literal(text.to_string()));
    }
}

fn parse_int_literal(text: &str) -> Option<BigInt> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else {
        if lower.len() > 1 && lower.starts_with('0') && lower.bytes().any(|b| b != b'0') {
            return None;
        }
        (lower.as_str(), 10)
    };
    BigInt::parse_bytes(digits.as_bytes(), radix)
}

fn is_imaginary(text: &str) -> bool {
    text.ends_with(['j', 'J'])
}

fn parse_imaginary_literal(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    cleaned.strip_suffix(['j', 'J'])?.parse().ok()
}

fn parse_float_literal(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    if cleaned.ends_with(['j', 'J']) {
        return None;
    }
    cleaned.parse().ok()
}

/// Resolve backslash escapes. `None` for escapes that are not modelled
/// (`\N{...}`) or malformed.
fn decode_escapes(text: &str, bytes: bool) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(esc) = chars.next() else {
            out.push('\\');
            break;
        };
        match esc {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut value = esc.to_digit(8)?;
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value)?);
            }
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' if !bytes => out.push(hex_escape(&mut chars, 4)?),
            'U' if !bytes => out.push(hex_escape(&mut chars, 8)?),
            'N' if !bytes => return None,
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    Some(out)
}

fn hex_escape(chars: &mut std::iter::Peekable<std::str::Chars>, width: usize) -> Option<char> {
    let mut value = 0u32;
    for _ in 0..width {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> Module {
        parse_module(src, Path::new("test.py")).expect("source should parse")
    }

    fn only_function(module: &Module) -> &FunctionDef {
        match &module.body[0].kind {
            StmtKind::FunctionDef(def) => def,
            other => panic!("expected function, got {:?}", other),
        }
    }

    fn return_expr(def: &FunctionDef) -> &Expr {
        match &def.body.last().expect("body").kind {
            StmtKind::Return(Some(e)) => e,
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_function() {
        let module = parse("def add(a: int, b: int) -> int:\n    return a + b\n");
        let def = only_function(&module);
        assert_eq!(def.name, "add");
        assert_eq!(def.line(), 1);
        assert_eq!(def.params.len(), 2);
        assert!(def.params[0].annotation.as_ref().unwrap().names("int"));
        assert!(def.returns.as_ref().unwrap().names("int"));
        assert!(matches!(
            return_expr(def).kind,
            ExprKind::BinOp { op: BinOp::Add, .. }
        ));
    }

    #[test]
    fn test_parse_syntax_error_reports_location() {
        let err = parse_module("def broken(:\n    pass\n", Path::new("bad.py")).unwrap_err();
        match err {
            Error::Syntax { file, line, .. } => {
                assert_eq!(file, Path::new("bad.py"));
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    fn syntax_message(src: &str) -> String {
        match parse_module(src, Path::new("legacy.py")) {
            Err(Error::Syntax { message, .. }) => message,
            other => panic!("expected syntax error for {:?}, got {:?}", src, other),
        }
    }

    #[test]
    fn test_python2_statements_are_rejected() {
        assert_eq!(
            syntax_message("def f(a):\n    print \"x\"\n    return a\n"),
            "Missing parentheses in call to 'print'"
        );
        assert_eq!(
            syntax_message("def f(a):\n    exec \"a = 1\"\n    return a\n"),
            "Missing parentheses in call to 'exec'"
        );
        parse("def f(a):\n    print(a)\n    return a\n");
    }

    #[test]
    fn test_python2_operators_and_literals_are_rejected() {
        syntax_message("def f(a):\n    return a <> 1\n");
        syntax_message("def f(a):\n    return 10L\n");
        syntax_message("try:\n    pass\nexcept ValueError, exc:\n    pass\n");
        assert!(syntax_message("def f(a):\n    return a + 0777\n").starts_with("leading zeros"));
        parse("x = 0o777 + 0 + 00 + 0x1F + 0777j\n");
    }

    #[test]
    fn test_non_default_after_default_is_rejected() {
        let expected = "parameter without a default follows parameter with a default";
        assert_eq!(syntax_message("def f(a=1, b):\n    return b\n"), expected);
        assert_eq!(syntax_message("def f(a: int = 1, b: int):\n    return b\n"), expected);
        assert_eq!(syntax_message("g = lambda a=1, b: b\n"), expected);
        parse("def f(a, b=1, *args, c, d=2, **kw):\n    return a\n");
        parse("def f(a=1, *, b):\n    return b\n");
    }

    #[test]
    fn test_inconsistent_tabs_are_rejected() {
        syntax_message("def f(a):\n\tx = a\n        return x\n");
        syntax_message("def f(a):\n    if a:\n\treturn a\n    return 0\n");
        parse("def f(a):\n\tx = a\n\tif x:\n\t\treturn x\n\treturn 0\n");
        parse("def f(a):\n    x = a\n    return x\n");
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let depth = 1000;
        let source = format!("x = {}1{}\n", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(syntax_message(&source), "too many nested levels");

        let source = format!("x = {}1{}\n", "(".repeat(20), ")".repeat(20));
        parse(&source);
    }

    #[test]
    fn test_parameter_kinds() {
        let module = parse("def f(a, /, b, *args, c, d=1, **kw):\n    pass\n");
        let kinds: Vec<ParamKind> = only_function(&module).params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParamKind::PositionalOnly,
                ParamKind::Positional,
                ParamKind::VarArgs,
                ParamKind::KeywordOnly,
                ParamKind::KeywordOnly,
                ParamKind::KwArgs,
            ]
        );
    }

    #[test]
    fn test_bare_star_makes_keyword_only() {
        let module = parse("def f(a, *, b: int = 2):\n    pass\n");
        let params = &only_function(&module).params;
        assert_eq!(params[1].kind, ParamKind::KeywordOnly);
        assert!(params[1].annotation.as_ref().unwrap().names("int"));
        assert!(params[1].default.is_some());
    }

    #[test]
    fn test_generic_annotation_is_not_simple() {
        let module = parse("def f(xs: List[int]) -> Optional[int]:\n    pass\n");
        let def = only_function(&module);
        assert_eq!(def.params[0].annotation.as_ref().unwrap().text, "List[int]");
        assert_eq!(def.params[0].annotation.as_ref().unwrap().simple_name, None);
        assert_eq!(def.returns.as_ref().unwrap().simple_name, None);
    }

    #[test]
    fn test_elif_chain_nests() {
        let module = parse(indoc! {"
            def sign(x):
                if x > 0:
                    return 1
                elif x < 0:
                    return -1
                else:
                    return 0
        "});
        let def = only_function(&module);
        let StmtKind::If { orelse, .. } = &def.body[0].kind else {
            panic!("expected if");
        };
        assert_eq!(orelse.len(), 1);
        let StmtKind::If { orelse: inner, .. } = &orelse[0].kind else {
            panic!("expected nested if");
        };
        assert!(matches!(inner[0].kind, StmtKind::Return(Some(_))));
    }

    #[test]
    fn test_chained_comparison() {
        let module = parse("def f(a, b, c):\n    return a < b <= c not in d\n");
        let ExprKind::Compare { comparisons, .. } = &return_expr(only_function(&module)).kind
        else {
            panic!("expected comparison");
        };
        let ops: Vec<CmpOp> = comparisons.iter().map(|(op, _)| *op).collect();
        assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE, CmpOp::NotIn]);
    }

    #[test]
    fn test_integer_literals() {
        assert_eq!(parse_int_literal("1_000"), Some(BigInt::from(1000)));
        assert_eq!(parse_int_literal("0xff"), Some(BigInt::from(255)));
        assert_eq!(parse_int_literal("0o17"), Some(BigInt::from(15)));
        assert_eq!(parse_int_literal("0b101"), Some(BigInt::from(5)));
        assert_eq!(parse_int_literal("000"), Some(BigInt::from(0)));
        assert_eq!(parse_int_literal("0777"), None);
        assert_eq!(parse_float_literal("1e3"), Some(1000.0));
        assert_eq!(parse_float_literal("2j"), None);
    }

    #[test]
    fn test_string_escapes_and_prefixes() {
        let module = parse("x = 'a\\tb'\ny = r'a\\tb'\nz = b'\\x41B'\nw = 'ab' 'cd'\n");
        let values: Vec<&ExprKind> = module
            .body
            .iter()
            .map(|s| match &s.kind {
                StmtKind::Assign { value, .. } => &value.kind,
                other => panic!("expected assignment, got {:?}", other),
            })
            .collect();
        assert_eq!(values[0], &ExprKind::Constant(Constant::Str("a\tb".into())));
        assert_eq!(values[1], &ExprKind::Constant(Constant::Str("a\\tb".into())));
        assert_eq!(values[2], &ExprKind::Constant(Constant::Bytes(b"AB".to_vec())));
        assert_eq!(values[3], &ExprKind::Constant(Constant::Str("abcd".into())));
    }

    #[test]
    fn test_fstring_parts() {
        let module = parse("s = f'n={n!r:>4} {{x}}'\n");
        let StmtKind::Assign { value, .. } = &module.body[0].kind else {
            panic!("expected assignment");
        };
        let ExprKind::FString(parts) = &value.kind else {
            panic!("expected f-string, got {:?}", value.kind);
        };
        assert_eq!(parts[0], FStringPart::Literal("n=".into()));
        match &parts[1] {
            FStringPart::Formatted { conversion, spec, .. } => {
                assert_eq!(*conversion, Some('r'));
                assert_eq!(spec.as_deref(), Some(">4"));
            }
            other => panic!("unexpected part {:?}", other),
        }
        assert_eq!(parts[2], FStringPart::Literal(" {x}".into()));
    }

    #[test]
    fn test_unsupported_constructs_are_opaque_with_calls() {
        let module = parse(indoc! {"
            def f(path):
                with open(path) as fh:
                    return helper(fh.read())
        "});
        let def = only_function(&module);
        let StmtKind::Opaque(opaque) = &def.body[0].kind else {
            panic!("expected opaque statement");
        };
        assert_eq!(opaque.calls, vec!["open", "helper", "fh.read"]);
        assert!(opaque.source.starts_with("with open(path) as fh:\n    return"));
    }

    #[test]
    fn test_decorated_function_keeps_decorators() {
        let module = parse("@cache\n@wraps(g)\ndef f(x):\n    return x\n");
        let def = only_function(&module);
        assert_eq!(def.decorators.len(), 2);
        assert_eq!(def.line(), 3);
    }

    #[test]
    fn test_async_def_is_flagged() {
        let module = parse("async def f(x):\n    return x\n");
        assert!(only_function(&module).is_async);
    }

    #[test]
    fn test_try_statement_handlers() {
        let module = parse(indoc! {"
            try:
                x = 1
            except ValueError as err:
                x = 2
            except:
                x = 3
            else:
                x = 4
            finally:
                x = 5
        "});
        let StmtKind::Try {
            handlers,
            orelse,
            finalbody,
            ..
        } = &module.body[0].kind
        else {
            panic!("expected try");
        };
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].name.as_deref(), Some("err"));
        assert!(handlers[1].kind.is_none());
        assert_eq!(orelse.len(), 1);
        assert_eq!(finalbody.len(), 1);
    }

    #[test]
    fn test_except_alias_with_tuple_of_types() {
        let module = parse("try:\n    pass\nexcept (TypeError, ValueError) as exc:\n    pass\n");
        let StmtKind::Try { handlers, .. } = &module.body[0].kind else {
            panic!("expected try");
        };
        assert_eq!(handlers[0].name.as_deref(), Some("exc"));
        assert!(matches!(
            handlers[0].kind.as_ref().map(|k| &k.kind),
            Some(ExprKind::Tuple(types)) if types.len() == 2
        ));
    }

    #[test]
    fn test_comments_are_ignored() {
        let module = parse("def f(a):  # note\n    # inside\n    return a  # end\n");
        assert_eq!(only_function(&module).body.len(), 1);
    }
}
