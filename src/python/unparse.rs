//! Render syntax trees back to Python source.
//!
//! Output is normalised: 4-space indentation, one statement per line and the
//! minimum parentheses the operator precedence requires. Literals use the same
//! spelling as Python's `repr`.

use crate::python::ast::*;
use std::fmt::Write as _;

/// Operator precedence, lowest binding first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    NamedExpr,
    Tuple,
    Test,
    Or,
    And,
    Not,
    Cmp,
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Arith,
    Term,
    Factor,
    Power,
    Atom,
}

impl Prec {
    fn next(self) -> Prec {
        match self {
            Prec::NamedExpr => Prec::Tuple,
            Prec::Tuple => Prec::Test,
            Prec::Test => Prec::Or,
            Prec::Or => Prec::And,
            Prec::And => Prec::Not,
            Prec::Not => Prec::Cmp,
            Prec::Cmp => Prec::BitOr,
            Prec::BitOr => Prec::BitXor,
            Prec::BitXor => Prec::BitAnd,
            Prec::BitAnd => Prec::Shift,
            Prec::Shift => Prec::Arith,
            Prec::Arith => Prec::Term,
            Prec::Term => Prec::Factor,
            Prec::Factor => Prec::Power,
            Prec::Power | Prec::Atom => Prec::Atom,
        }
    }

    fn of_binop(op: BinOp) -> Prec {
        match op {
            BinOp::BitOr => Prec::BitOr,
            BinOp::BitXor => Prec::BitXor,
            BinOp::BitAnd => Prec::BitAnd,
            BinOp::LShift | BinOp::RShift => Prec::Shift,
            BinOp::Add | BinOp::Sub => Prec::Arith,
            BinOp::Mult | BinOp::MatMult | BinOp::Div | BinOp::FloorDiv | BinOp::Mod => Prec::Term,
            BinOp::Pow => Prec::Power,
        }
    }
}

pub fn unparse_module(module: &Module) -> String {
    unparse_stmts(&module.body)
}

pub fn unparse_stmts(body: &[Stmt]) -> String {
    let mut unparser = Unparser::default();
    for stmt in body {
        unparser.stmt(stmt);
    }
    unparser.out
}

pub fn unparse_function(def: &FunctionDef) -> String {
    let mut unparser = Unparser::default();
    unparser.function_def(def);
    unparser.out
}

/// Render a single expression. Tuples are parenthesised.
pub fn unparse_expr(expr: &Expr) -> String {
    let mut unparser = Unparser::default();
    unparser.expr(expr, Prec::Test);
    unparser.out
}

#[derive(Default)]
struct Unparser {
    out: String,
    indent: usize,
}

impl Unparser {
    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn line(&mut self, text: &str) {
        self.line_start();
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn block(&mut self, body: &[Stmt]) {
        self.indent += 1;
        if body.is_empty() {
            self.line("pass");
        }
        for stmt in body {
            self.stmt(stmt);
        }
        self.indent -= 1;
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::FunctionDef(def) => self.function_def(def),
            StmtKind::If { test, body, orelse } => self.if_chain("if", test, body, orelse),
            StmtKind::While { test, body, orelse } => {
                self.line_start();
                self.out.push_str("while ");
                self.expr(test, Prec::Test);
                self.out.push_str(":\n");
                self.block(body);
                self.else_block(orelse);
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                self.line_start();
                self.out.push_str("for ");
                self.expr(target, Prec::Tuple);
                self.out.push_str(" in ");
                self.expr(iter, Prec::Test);
                self.out.push_str(":\n");
                self.block(body);
                self.else_block(orelse);
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.line("try:");
                self.block(body);
                for handler in handlers {
                    self.line_start();
                    self.out.push_str("except");
                    if let Some(kind) = &handler.kind {
                        self.out.push(' ');
                        self.expr(kind, Prec::Test);
                    }
                    if let Some(name) = &handler.name {
                        let _ = write!(self.out, " as {}", name);
                    }
                    self.out.push_str(":\n");
                    self.block(&handler.body);
                }
                self.else_block(orelse);
                if !finalbody.is_empty() {
                    self.line("finally:");
                    self.block(finalbody);
                }
            }
            StmtKind::Opaque(opaque) => {
                for text in opaque.source.lines() {
                    self.line(text);
                }
            }
            _ => {
                self.line_start();
                self.simple_stmt(&stmt.kind);
                self.out.push('\n');
            }
        }
    }

    fn simple_stmt(&mut self, kind: &StmtKind) {
        match kind {
            StmtKind::Expr(expr) => self.expr(expr, Prec::Tuple),
            StmtKind::Assign { targets, value } => {
                for target in targets {
                    self.expr(target, Prec::Tuple);
                    self.out.push_str(" = ");
                }
                self.expr(value, Prec::Test);
            }
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                self.expr(target, Prec::Test);
                let _ = write!(self.out, ": {}", annotation.text);
                if let Some(value) = value {
                    self.out.push_str(" = ");
                    self.expr(value, Prec::Test);
                }
            }
            StmtKind::AugAssign { target, op, value } => {
                self.expr(target, Prec::Tuple);
                let _ = write!(self.out, " {}= ", op.symbol());
                self.expr(value, Prec::Test);
            }
            StmtKind::Return(value) => {
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.expr(value, Prec::Test);
                }
            }
            StmtKind::Raise { exc, cause } => {
                self.out.push_str("raise");
                if let Some(exc) = exc {
                    self.out.push(' ');
                    self.expr(exc, Prec::Test);
                }
                if let Some(cause) = cause {
                    self.out.push_str(" from ");
                    self.expr(cause, Prec::Test);
                }
            }
            StmtKind::Assert { test, msg } => {
                self.out.push_str("assert ");
                self.expr(test, Prec::Test);
                if let Some(msg) = msg {
                    self.out.push_str(", ");
                    self.expr(msg, Prec::Test);
                }
            }
            StmtKind::Global(names) => {
                let _ = write!(self.out, "global {}", names.join(", "));
            }
            StmtKind::Nonlocal(names) => {
                let _ = write!(self.out, "nonlocal {}", names.join(", "));
            }
            StmtKind::Pass => self.out.push_str("pass"),
            StmtKind::Break => self.out.push_str("break"),
            StmtKind::Continue => self.out.push_str("continue"),
            // Compound statements are handled by `stmt`.
            _ => {}
        }
    }

    fn if_chain(&mut self, keyword: &str, test: &Expr, body: &[Stmt], orelse: &[Stmt]) {
        self.line_start();
        let _ = write!(self.out, "{} ", keyword);
        self.expr(test, Prec::Test);
        self.out.push_str(":\n");
        self.block(body);

        match orelse {
            [Stmt {
                kind:
                    StmtKind::If {
                        test,
                        body,
                        orelse,
                    },
                ..
            }] => self.if_chain("elif", test, body, orelse),
            _ => self.else_block(orelse),
        }
    }

    fn else_block(&mut self, orelse: &[Stmt]) {
        if !orelse.is_empty() {
            self.line("else:");
            self.block(orelse);
        }
    }

    fn function_def(&mut self, def: &FunctionDef) {
        for decorator in &def.decorators {
            self.line_start();
            self.out.push('@');
            self.expr(decorator, Prec::Test);
            self.out.push('\n');
        }
        self.line_start();
        if def.is_async {
            self.out.push_str("async ");
        }
        let _ = write!(self.out, "def {}(", def.name);
        self.parameters(&def.params, true);
        self.out.push(')');
        if let Some(returns) = &def.returns {
            let _ = write!(self.out, " -> {}", returns.text);
        }
        self.out.push_str(":\n");
        self.block(&def.body);
    }

    fn parameters(&mut self, params: &[Parameter], annotated: bool) {
        let mut first = true;
        let mut separator = |out: &mut String| {
            if !first {
                out.push_str(", ");
            }
            first = false;
        };
        let has_varargs = params.iter().any(|p| p.kind == ParamKind::VarArgs);
        let mut star_written = has_varargs;

        for (i, param) in params.iter().enumerate() {
            if param.kind == ParamKind::KeywordOnly && !star_written {
                separator(&mut self.out);
                self.out.push('*');
                star_written = true;
            }
            separator(&mut self.out);
            match param.kind {
                ParamKind::VarArgs => self.out.push('*'),
                ParamKind::KwArgs => self.out.push_str("**"),
                _ => {}
            }
            self.out.push_str(&param.name);
            let annotation = param.annotation.as_ref().filter(|_| annotated);
            if let Some(annotation) = annotation {
                let _ = write!(self.out, ": {}", annotation.text);
            }
            if let Some(default) = &param.default {
                self.out.push_str(if annotation.is_some() { " = " } else { "=" });
                self.expr(default, Prec::Test);
            }
            let next_is_positional_only = params
                .get(i + 1)
                .is_some_and(|p| p.kind == ParamKind::PositionalOnly);
            if param.kind == ParamKind::PositionalOnly && !next_is_positional_only {
                separator(&mut self.out);
                self.out.push('/');
            }
        }
    }

    fn wrap_open(&mut self, needed: bool) {
        if needed {
            self.out.push('(');
        }
    }

    fn wrap_close(&mut self, needed: bool) {
        if needed {
            self.out.push(')');
        }
    }

    fn comma_separated(&mut self, items: &[Expr], prec: Prec) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(item, prec);
        }
    }

    fn expr(&mut self, expr: &Expr, prec: Prec) {
        match &expr.kind {
            ExprKind::Name(id) => self.out.push_str(id),
            ExprKind::Constant(value) => self.constant(value),
            ExprKind::FString(parts) => self.fstring(parts),
            ExprKind::List(elts) => {
                self.out.push('[');
                self.comma_separated(elts, Prec::Test);
                self.out.push(']');
            }
            ExprKind::Tuple(elts) => {
                let wrap = elts.is_empty() || prec > Prec::Tuple;
                self.wrap_open(wrap);
                self.comma_separated(elts, Prec::Test);
                if elts.len() == 1 {
                    self.out.push(',');
                }
                self.wrap_close(wrap);
            }
            ExprKind::Set(elts) => {
                if elts.is_empty() {
                    self.out.push_str("set()");
                } else {
                    self.out.push('{');
                    self.comma_separated(elts, Prec::Test);
                    self.out.push('}');
                }
            }
            ExprKind::Dict(items) => {
                self.out.push('{');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    match item {
                        DictItem::Pair(key, value) => {
                            self.expr(key, Prec::Test);
                            self.out.push_str(": ");
                            self.expr(value, Prec::Test);
                        }
                        DictItem::Splat(value) => {
                            self.out.push_str("**");
                            self.expr(value, Prec::BitOr);
                        }
                    }
                }
                self.out.push('}');
            }
            ExprKind::Attribute { value, attr } => {
                let int_receiver = matches!(value.kind, ExprKind::Constant(Constant::Int(_)));
                self.wrap_open(int_receiver);
                self.expr(value, Prec::Atom);
                self.wrap_close(int_receiver);
                let _ = write!(self.out, ".{}", attr);
            }
            ExprKind::Subscript { value, index } => {
                self.expr(value, Prec::Atom);
                self.out.push('[');
                match &index.kind {
                    ExprKind::Tuple(elts) if !elts.is_empty() => {
                        self.comma_separated(elts, Prec::Test);
                        if elts.len() == 1 {
                            self.out.push(',');
                        }
                    }
                    _ => self.expr(index, Prec::Tuple),
                }
                self.out.push(']');
            }
            ExprKind::Slice { lower, upper, step } => {
                if let Some(lower) = lower {
                    self.expr(lower, Prec::Test);
                }
                self.out.push(':');
                if let Some(upper) = upper {
                    self.expr(upper, Prec::Test);
                }
                if let Some(step) = step {
                    self.out.push(':');
                    self.expr(step, Prec::Test);
                }
            }
            ExprKind::Call { func, args } => {
                self.expr(func, Prec::Atom);
                self.out.push('(');
                match args.as_slice() {
                    [Argument::Positional(only)]
                        if matches!(
                            only.kind,
                            ExprKind::Comprehension {
                                kind: ComprehensionKind::Generator,
                                ..
                            }
                        ) =>
                    {
                        self.comprehension_body(only)
                    }
                    _ => {
                        for (i, arg) in args.iter().enumerate() {
                            if i > 0 {
                                self.out.push_str(", ");
                            }
                            match arg {
                                Argument::Positional(e) => self.expr(e, Prec::Test),
                                Argument::Starred(e) => {
                                    self.out.push('*');
                                    self.expr(e, Prec::BitOr);
                                }
                                Argument::Keyword { name, value } => {
                                    let _ = write!(self.out, "{}=", name);
                                    self.expr(value, Prec::Test);
                                }
                                Argument::DoubleStarred(e) => {
                                    self.out.push_str("**");
                                    self.expr(e, Prec::BitOr);
                                }
                            }
                        }
                    }
                }
                self.out.push(')');
            }
            ExprKind::BinOp { left, op, right } => {
                let own = Prec::of_binop(*op);
                let (left_prec, right_prec) = if *op == BinOp::Pow {
                    (own.next(), own)
                } else {
                    (own, own.next())
                };
                let wrap = prec > own;
                self.wrap_open(wrap);
                self.expr(left, left_prec);
                let _ = write!(self.out, " {} ", op.symbol());
                self.expr(right, right_prec);
                self.wrap_close(wrap);
            }
            ExprKind::UnaryOp { op, operand } => {
                let (own, symbol) = match op {
                    UnaryOp::Not => (Prec::Not, "not "),
                    UnaryOp::Invert => (Prec::Factor, "~"),
                    UnaryOp::UAdd => (Prec::Factor, "+"),
                    UnaryOp::USub => (Prec::Factor, "-"),
                };
                let wrap = prec > own;
                self.wrap_open(wrap);
                self.out.push_str(symbol);
                self.expr(operand, own);
                self.wrap_close(wrap);
            }
            ExprKind::BoolOp { op, left, right } => {
                let (own, word) = match op {
                    BoolOp::And => (Prec::And, "and"),
                    BoolOp::Or => (Prec::Or, "or"),
                };
                let wrap = prec > own;
                self.wrap_open(wrap);
                self.expr(left, own);
                let _ = write!(self.out, " {} ", word);
                self.expr(right, own.next());
                self.wrap_close(wrap);
            }
            ExprKind::Compare { left, comparisons } => {
                let wrap = prec > Prec::Cmp;
                self.wrap_open(wrap);
                self.expr(left, Prec::Cmp.next());
                for (op, right) in comparisons {
                    let _ = write!(self.out, " {} ", op.symbol());
                    self.expr(right, Prec::Cmp.next());
                }
                self.wrap_close(wrap);
            }
            ExprKind::IfExp { test, body, orelse } => {
                let wrap = prec > Prec::Test;
                self.wrap_open(wrap);
                self.expr(body, Prec::Test.next());
                self.out.push_str(" if ");
                self.expr(test, Prec::Test.next());
                self.out.push_str(" else ");
                self.expr(orelse, Prec::Test);
                self.wrap_close(wrap);
            }
            ExprKind::Lambda { params, body } => {
                let wrap = prec > Prec::Test;
                self.wrap_open(wrap);
                self.out.push_str("lambda");
                if !params.is_empty() {
                    self.out.push(' ');
                    self.parameters(params, false);
                }
                self.out.push_str(": ");
                self.expr(body, Prec::Test);
                self.wrap_close(wrap);
            }
            ExprKind::Comprehension { kind, .. } => {
                let (open, close) = match kind {
                    ComprehensionKind::List => ('[', ']'),
                    ComprehensionKind::Set | ComprehensionKind::Dict => ('{', '}'),
                    ComprehensionKind::Generator => ('(', ')'),
                };
                self.out.push(open);
                self.comprehension_body(expr);
                self.out.push(close);
            }
            ExprKind::NamedExpr { target, value } => {
                let wrap = prec > Prec::NamedExpr;
                self.wrap_open(wrap);
                let _ = write!(self.out, "{} := ", target);
                self.expr(value, Prec::Test);
                self.wrap_close(wrap);
            }
            ExprKind::Starred(value) => {
                self.out.push('*');
                self.expr(value, Prec::BitOr);
            }
            ExprKind::Opaque(opaque) => {
                let atomic = !opaque.source.contains(char::is_whitespace);
                let wrap = !atomic && prec > Prec::Test;
                self.wrap_open(wrap);
                self.out.push_str(&opaque.source);
                self.wrap_close(wrap);
            }
        }
    }

    fn comprehension_body(&mut self, expr: &Expr) {
        let ExprKind::Comprehension {
            element,
            value,
            clauses,
            ..
        } = &expr.kind
        else {
            return;
        };
        self.expr(element, Prec::Test);
        if let Some(value) = value {
            self.out.push_str(": ");
            self.expr(value, Prec::Test);
        }
        for clause in clauses {
            match clause {
                ComprehensionClause::For { target, iter } => {
                    self.out.push_str(" for ");
                    self.expr(target, Prec::Tuple);
                    self.out.push_str(" in ");
                    self.expr(iter, Prec::Test.next());
                }
                ComprehensionClause::If(test) => {
                    self.out.push_str(" if ");
                    self.expr(test, Prec::Test.next());
                }
            }
        }
    }

    fn constant(&mut self, value: &Constant) {
        match value {
            Constant::None => self.out.push_str("None"),
            Constant::Bool(true) => self.out.push_str("True"),
            Constant::Bool(false) => self.out.push_str("False"),
            Constant::Int(n) => {
                let _ = write!(self.out, "{}", n);
            }
            Constant::Float(f) if f.is_infinite() => {
                self.out.push_str(if *f > 0.0 { "1e309" } else { "-1e309" })
            }
            Constant::Float(f) => self.out.push_str(&float_repr(*f)),
            Constant::Imaginary(f) if f.is_infinite() => self.out.push_str("1e309j"),
            Constant::Imaginary(f) => {
                let text = float_repr(*f);
                self.out.push_str(text.strip_suffix(".0").unwrap_or(&text));
                self.out.push('j');
            }
            Constant::Str(s) => self.out.push_str(&str_repr(s)),
            Constant::Bytes(b) => self.out.push_str(&bytes_repr(b)),
            Constant::Ellipsis => self.out.push_str("..."),
        }
    }

    fn fstring(&mut self, parts: &[FStringPart]) {
        let mut body = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => {
                    let escaped = escape_str_body(text, '\'');
                    body.push_str(&escaped.replace('{', "{{").replace('}', "}}"));
                }
                FStringPart::Formatted {
                    value,
                    conversion,
                    spec,
                } => {
                    let inner = {
                        let mut nested = Unparser::default();
                        nested.expr(value, Prec::Test.next());
                        nested.out
                    };
                    body.push('{');
                    if inner.starts_with('{') {
                        body.push(' ');
                    }
                    body.push_str(&inner.replace('\'', "\""));
                    if let Some(conversion) = conversion {
                        body.push('!');
                        body.push(*conversion);
                    }
                    if let Some(spec) = spec {
                        body.push(':');
                        body.push_str(spec);
                    }
                    body.push('}');
                }
            }
        }
        let _ = write!(self.out, "f'{}'", body);
    }
}

/// Python `repr` of a float.
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    // Shortest round-trip digits in scientific form, e.g. "-1.25e-7".
    let sci = format!("{:e}", value);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    let mut out = String::new();
    if negative {
        out.push('-');
    }

    if (-4..16).contains(&exponent) {
        if exponent >= 0 {
            let int_len = exponent as usize + 1;
            if digits.len() <= int_len {
                out.push_str(&digits);
                out.push_str(&"0".repeat(int_len - digits.len()));
                out.push_str(".0");
            } else {
                out.push_str(&digits[..int_len]);
                out.push('.');
                out.push_str(&digits[int_len..]);
            }
        } else {
            out.push_str("0.");
            out.push_str(&"0".repeat((-exponent - 1) as usize));
            out.push_str(&digits);
        }
    } else {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(out, "e{}{:02}", sign, exponent.abs());
    }
    out
}

fn escape_str_body(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if c.is_control() => {
                let code = c as u32;
                if code <= 0xff {
                    let _ = write!(out, "\\x{:02x}", code);
                } else {
                    let _ = write!(out, "\\u{:04x}", code);
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Python `repr` of a `str`.
pub fn str_repr(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    format!("{}{}{}", quote, escape_str_body(text, quote), quote)
}

/// Python `repr` of a `bytes` value.
pub fn bytes_repr(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::from("b");
    out.push(quote as char);
    for &byte in bytes {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", byte);
            }
        }
    }
    out.push(quote as char);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::parser::parse_module;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn normalise(src: &str) -> String {
        unparse_module(&parse_module(src, Path::new("t.py")).unwrap())
    }

    #[test]
    fn test_function_roundtrip_is_normalised() {
        let src = "def add(a:int,b:int)->int:\n  return a+b\n";
        assert_eq!(normalise(src), "def add(a: int, b: int) -> int:\n    return a + b\n");
    }

    #[test]
    fn test_normalised_output_is_stable() {
        let src = indoc! {"
            @decorate(1)
            def f(a, /, b=2, *, c: int = 3, **kw):
                total = 0
                for i in range(a):
                    if i % 2 == 0:
                        total += i
                    elif i > 10:
                        break
                    else:
                        continue
                try:
                    x = {k: v for k, v in kw.items() if v}
                except (KeyError, ValueError) as err:
                    raise RuntimeError('bad') from err
                finally:
                    pass
                return total if total else -1
        "};
        let once = normalise(src);
        assert_eq!(once, src);
        assert_eq!(normalise(&once), once);
    }

    #[test]
    fn test_precedence_parentheses() {
        assert_eq!(normalise("x = (a + b) * c\n"), "x = (a + b) * c\n");
        assert_eq!(normalise("x = a - (b - c)\n"), "x = a - (b - c)\n");
        assert_eq!(normalise("x = -x ** 2\n"), "x = -x ** 2\n");
        assert_eq!(normalise("x = (-x) ** 2\n"), "x = (-x) ** 2\n");
        assert_eq!(normalise("x = 2 ** 3 ** 2\n"), "x = 2 ** 3 ** 2\n");
        assert_eq!(normalise("x = (2 ** 3) ** 2\n"), "x = (2 ** 3) ** 2\n");
        assert_eq!(normalise("x = not (a and b)\n"), "x = not (a and b)\n");
        assert_eq!(normalise("x = (lambda: 1)()\n"), "x = (lambda: 1)()\n");
    }

    #[test]
    fn test_tuples_and_walrus() {
        assert_eq!(normalise("a, b = b, a\n"), "a, b = (b, a)\n");
        assert_eq!(normalise("x = (1,)\n"), "x = (1,)\n");
        assert_eq!(normalise("x = 1,\n"), "x = (1,)\n");
        assert_eq!(normalise("x += 1, 2\n"), "x += (1, 2)\n");
        assert_eq!(normalise("def f():\n    return 1, 2\n"), "def f():\n    return (1, 2)\n");
        assert_eq!(
            normalise("for a, b in 1, 2:\n    pass\n"),
            "for a, b in (1, 2):\n    pass\n"
        );
        assert_eq!(normalise("1, 2\n"), "1, 2\n");
        assert_eq!(normalise("x = ()\n"), "x = ()\n");
        assert_eq!(normalise("if (n := 10) > 5:\n    pass\n"), "if (n := 10) > 5:\n    pass\n");
        assert_eq!(normalise("f(x for x in y)\n"), "f(x for x in y)\n");
    }

    #[test]
    fn test_float_repr_matches_python() {
        assert_eq!(float_repr(3.14), "3.14");
        assert_eq!(float_repr(1.0), "1.0");
        assert_eq!(float_repr(-2.5), "-2.5");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1.5e-7), "1.5e-07");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(123456789012345.6), "123456789012345.6");
        assert_eq!(float_repr(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(float_repr(f64::NAN), "nan");
    }

    #[test]
    fn test_string_reprs() {
        assert_eq!(str_repr("example string"), "'example string'");
        assert_eq!(str_repr("it's"), "\"it's\"");
        assert_eq!(str_repr("a\nb\\"), "'a\\nb\\\\'");
        assert_eq!(bytes_repr(b"example bytes"), "b'example bytes'");
        assert_eq!(bytes_repr(&[0, 255]), "b'\\x00\\xff'");
    }

    #[test]
    fn test_opaque_statement_is_reindented() {
        let src = indoc! {"
            def f(path):
                with open(path) as fh:
                    return fh.read()
        "};
        assert_eq!(normalise(src), src);
    }

    #[test]
    fn test_fstring_rendering() {
        assert_eq!(normalise("s = f'{a!r:>4} and {{b}}'\n"), "s = f'{a!r:>4} and {{b}}'\n");
    }
}
