//! Owned Python syntax tree.
//!
//! The tree is produced once by lowering the tree-sitter concrete syntax tree
//! (see [`crate::python::parser`]) and is never mutated afterwards. Rewrites go
//! through [`crate::python::visit::Transformer`], which builds a new tree.
//!
//! Only the constructs the catalog needs to reason about are modelled
//! precisely. Anything else is kept as an [`Opaque`] node that remembers its
//! source text and the callee names of the calls nested inside it.

use num_bigint::BigInt;

/// Byte range plus 1-based line/column of a node in its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    /// `a = b = value`; targets are listed left to right.
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    AnnAssign {
        target: Expr,
        annotation: Annotation,
        value: Option<Expr>,
    },
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    Return(Option<Expr>),
    /// `elif` chains are lowered to a nested `If` as the sole `orelse` statement.
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    FunctionDef(Box<FunctionDef>),
    Raise {
        exc: Option<Expr>,
        cause: Option<Expr>,
    },
    Assert {
        test: Expr,
        msg: Option<Expr>,
    },
    Global(Vec<String>),
    Nonlocal(Vec<String>),
    Pass,
    Break,
    Continue,
    Opaque(Opaque),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptHandler {
    pub kind: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A construct kept as raw source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Opaque {
    pub source: String,
    /// Callee names of every call found inside the construct, in source order.
    pub calls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub decorators: Vec<Expr>,
    pub params: Vec<Parameter>,
    pub returns: Option<Annotation>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub span: Span,
}

impl FunctionDef {
    pub fn line(&self) -> usize {
        self.span.line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    PositionalOnly,
    Positional,
    VarArgs,
    KeywordOnly,
    KwArgs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    pub annotation: Option<Annotation>,
    pub default: Option<Expr>,
}

/// A type annotation as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Source text of the type expression, e.g. `int` or `List[int]`.
    pub text: String,
    /// Set when the annotation is a bare identifier.
    pub simple_name: Option<String>,
}

impl Annotation {
    pub fn simple(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            text: name.clone(),
            simple_name: Some(name),
        }
    }

    /// True when the annotation is exactly the bare name `ty`.
    pub fn names(&self, ty: &str) -> bool {
        self.simple_name.as_deref() == Some(ty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Name(String),
    Constant(Constant),
    FString(Vec<FStringPart>),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Set(Vec<Expr>),
    Dict(Vec<DictItem>),
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Argument>,
    },
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    BoolOp {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CmpOp, Expr)>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Lambda {
        params: Vec<Parameter>,
        body: Box<Expr>,
    },
    /// List, set and generator comprehensions use `element` only; dict
    /// comprehensions put the key in `element` and the value in `value`.
    Comprehension {
        kind: ComprehensionKind,
        element: Box<Expr>,
        value: Option<Box<Expr>>,
        clauses: Vec<ComprehensionClause>,
    },
    NamedExpr {
        target: String,
        value: Box<Expr>,
    },
    Starred(Box<Expr>),
    Opaque(Opaque),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    /// Imaginary literal such as `2j`, holding the imaginary part.
    Imaginary(f64),
    Str(String),
    Bytes(Vec<u8>),
    Ellipsis,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Literal(String),
    Formatted {
        value: Box<Expr>,
        conversion: Option<char>,
        spec: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DictItem {
    Pair(Expr, Expr),
    Splat(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Positional(Expr),
    Starred(Expr),
    Keyword { name: String, value: Expr },
    DoubleStarred(Expr),
}

impl Argument {
    pub fn value(&self) -> &Expr {
        match self {
            Argument::Positional(e)
            | Argument::Starred(e)
            | Argument::DoubleStarred(e)
            | Argument::Keyword { value: e, .. } => e,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionKind {
    List,
    Set,
    Dict,
    Generator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComprehensionClause {
    For { target: Expr, iter: Expr },
    If(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mult => "*",
            BinOp::MatMult => "@",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mult,
            "@" => BinOp::MatMult,
            "/" => BinOp::Div,
            "//" => BinOp::FloorDiv,
            "%" => BinOp::Mod,
            "**" => BinOp::Pow,
            "<<" => BinOp::LShift,
            ">>" => BinOp::RShift,
            "|" => BinOp::BitOr,
            "^" => BinOp::BitXor,
            "&" => BinOp::BitAnd,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Invert,
    UAdd,
    USub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => CmpOp::Eq,
            "!=" => CmpOp::NotEq,
            "<" => CmpOp::Lt,
            "<=" => CmpOp::LtE,
            ">" => CmpOp::Gt,
            ">=" => CmpOp::GtE,
            "is" => CmpOp::Is,
            "is not" => CmpOp::IsNot,
            "in" => CmpOp::In,
            "not in" => CmpOp::NotIn,
            _ => return None,
        })
    }
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn name(id: impl Into<String>) -> Self {
        Self::new(ExprKind::Name(id.into()), Span::default())
    }

    pub fn constant(value: Constant) -> Self {
        Self::new(ExprKind::Constant(value), Span::default())
    }

    pub fn int(value: i64) -> Self {
        Self::constant(Constant::Int(BigInt::from(value)))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::constant(Constant::Str(value.into()))
    }

    /// Same node, moved to `span`. Used when a replacement inherits the
    /// location of the node it stands in for.
    pub fn with_span(&self, span: Span) -> Self {
        Self {
            kind: self.kind.clone(),
            span,
        }
    }

    /// Name under which a call to this callee expression is looked up.
    ///
    /// * `f(...)` gives `f`
    /// * `obj.m(...)` gives `obj.m` when `obj` is a plain name
    /// * `<anything>.m(...)` gives `m`; the receiver is dropped
    /// * any other callee gives `<expr>`, which never resolves
    pub fn call_target_name(&self) -> String {
        match &self.kind {
            ExprKind::Name(id) => id.clone(),
            ExprKind::Attribute { value, attr } => match &value.kind {
                ExprKind::Name(receiver) => format!("{}.{}", receiver, attr),
                _ => attr.clone(),
            },
            _ => UNNAMED_CALLEE.to_string(),
        }
    }
}

/// Callee name recorded for calls whose target is neither a name nor an
/// attribute access.
pub const UNNAMED_CALLEE: &str = "<expr>";

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(value: Expr, attr: &str) -> Expr {
        Expr::new(
            ExprKind::Attribute {
                value: Box::new(value),
                attr: attr.to_string(),
            },
            Span::default(),
        )
    }

    #[test]
    fn test_call_target_name_plain_name() {
        assert_eq!(Expr::name("helper").call_target_name(), "helper");
    }

    #[test]
    fn test_call_target_name_attribute_on_name() {
        assert_eq!(attr(Expr::name("math"), "floor").call_target_name(), "math.floor");
    }

    #[test]
    fn test_call_target_name_drops_complex_receiver() {
        let receiver = attr(Expr::name("a"), "b");
        assert_eq!(attr(receiver, "c").call_target_name(), "c");
        assert_eq!(attr(Expr::str("x"), "join").call_target_name(), "join");
    }

    #[test]
    fn test_call_target_name_unnamed() {
        let call = Expr::new(
            ExprKind::Call {
                func: Box::new(Expr::name("f")),
                args: vec![],
            },
            Span::default(),
        );
        assert_eq!(call.call_target_name(), UNNAMED_CALLEE);
    }

    #[test]
    fn test_annotation_names() {
        assert!(Annotation::simple("int").names("int"));
        let generic = Annotation {
            text: "List[int]".to_string(),
            simple_name: None,
        };
        assert!(!generic.names("int"));
    }

    #[test]
    fn test_operator_symbols_roundtrip() {
        for op in [BinOp::Add, BinOp::FloorDiv, BinOp::Pow, BinOp::BitXor] {
            assert_eq!(BinOp::from_symbol(op.symbol()), Some(op));
        }
        for op in [CmpOp::IsNot, CmpOp::NotIn, CmpOp::LtE] {
            assert_eq!(CmpOp::from_symbol(op.symbol()), Some(op));
        }
    }
}
