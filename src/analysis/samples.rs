//! Constant tables: canonical sample literals per type name, and the names
//! exported by Python's `builtins` module.

use crate::python::ast::{Argument, BinOp, Constant, DictItem, Expr, ExprKind, Span};
use num_bigint::BigInt;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

fn mixed_elements() -> Vec<Expr> {
    vec![
        Expr::int(1),
        Expr::int(2),
        Expr::int(3),
        Expr::str("a"),
        Expr::str("b"),
        Expr::str("c"),
    ]
}

fn literal(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::default())
}

/// `name(arg)`, for types whose only literal form is a constructor call.
fn builtin_call(name: &str, arg: Expr) -> Expr {
    literal(ExprKind::Call {
        func: Box::new(Expr::name(name)),
        args: vec![Argument::Positional(arg)],
    })
}

static SAMPLE_VALUES: Lazy<HashMap<&'static str, Expr>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("int", Expr::constant(Constant::Int(BigInt::from(42))));
    map.insert("float", Expr::constant(Constant::Float(3.14)));
    map.insert("str", Expr::str("example string"));
    map.insert("bool", Expr::constant(Constant::Bool(true)));
    map.insert("NoneType", Expr::constant(Constant::None));
    map.insert("list", literal(ExprKind::List(mixed_elements())));
    map.insert(
        "dict",
        literal(ExprKind::Dict(vec![
            DictItem::Pair(Expr::str("key1"), Expr::str("value1")),
            DictItem::Pair(Expr::str("key2"), Expr::int(42)),
        ])),
    );
    map.insert("set", literal(ExprKind::Set(mixed_elements())));
    map.insert("tuple", literal(ExprKind::Tuple(mixed_elements())));
    map.insert(
        "bytes",
        Expr::constant(Constant::Bytes(b"example bytes".to_vec())),
    );
    map.insert("range", builtin_call("range", Expr::int(5)));
    map.insert(
        "frozenset",
        builtin_call("frozenset", literal(ExprKind::List(mixed_elements()))),
    );
    map.insert(
        "bytearray",
        builtin_call(
            "bytearray",
            Expr::constant(Constant::Bytes(b"example bytearray".to_vec())),
        ),
    );
    map.insert(
        "complex",
        literal(ExprKind::BinOp {
            left: Box::new(Expr::int(1)),
            op: BinOp::Add,
            right: Box::new(Expr::constant(Constant::Imaginary(2.0))),
        }),
    );
    map
});

/// Sample literal standing in for a value of type `type_name`.
pub fn sample_value(type_name: &str) -> Option<&'static Expr> {
    SAMPLE_VALUES.get(type_name)
}

pub fn has_sample(type_name: &str) -> bool {
    SAMPLE_VALUES.contains_key(type_name)
}

static BUILTIN_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // constants and dunders
        "False", "None", "True", "Ellipsis", "NotImplemented", "__build_class__",
        "__debug__", "__doc__", "__import__", "__loader__", "__name__", "__package__",
        "__spec__",
        // functions
        "abs", "aiter", "all", "anext", "any", "ascii", "bin", "breakpoint", "callable",
        "chr", "compile", "copyright", "credits", "delattr", "dir", "divmod", "eval", "exec",
        "exit", "format", "getattr", "globals", "hasattr", "hash", "help", "hex", "id",
        "input", "isinstance", "issubclass", "iter", "len", "license", "locals", "max", "min",
        "next", "oct", "open", "ord", "pow", "print", "quit", "repr", "round", "setattr",
        "sorted", "sum", "vars",
        // types
        "bool", "bytearray", "bytes", "classmethod", "complex", "dict", "enumerate",
        "filter", "float", "frozenset", "int", "list", "map", "memoryview", "object",
        "property", "range", "reversed", "set", "slice", "staticmethod", "str", "super",
        "tuple", "type", "zip",
        // exceptions and warnings
        "ArithmeticError", "AssertionError", "AttributeError", "BaseException",
        "BaseExceptionGroup", "BlockingIOError", "BrokenPipeError", "BufferError",
        "BytesWarning", "ChildProcessError", "ConnectionAbortedError", "ConnectionError",
        "ConnectionRefusedError", "ConnectionResetError", "DeprecationWarning", "EOFError",
        "EncodingWarning", "EnvironmentError", "Exception", "ExceptionGroup",
        "FileExistsError", "FileNotFoundError", "FloatingPointError", "FutureWarning",
        "GeneratorExit", "IOError", "ImportError", "ImportWarning", "IndentationError",
        "IndexError", "InterruptedError", "IsADirectoryError", "KeyError",
        "KeyboardInterrupt", "LookupError", "MemoryError", "ModuleNotFoundError",
        "NameError", "NotADirectoryError", "NotImplementedError", "OSError",
        "OverflowError", "PendingDeprecationWarning", "PermissionError", "ProcessLookupError",
        "RecursionError", "ReferenceError", "ResourceWarning", "RuntimeError",
        "RuntimeWarning", "StopAsyncIteration", "StopIteration", "SyntaxError",
        "SyntaxWarning", "SystemError", "SystemExit", "TabError", "TimeoutError",
        "TypeError", "UnboundLocalError", "UnicodeDecodeError", "UnicodeEncodeError",
        "UnicodeError", "UnicodeTranslateError", "UnicodeWarning", "UserWarning",
        "ValueError", "Warning", "ZeroDivisionError",
    ]
    .into_iter()
    .collect()
});

/// True when `name` is exported by Python's `builtins` module. Dotted names
/// such as `math.floor` never are.
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::unparse_expr;

    #[test]
    fn test_sample_literals_render_as_python() {
        let rendered: Vec<(&str, String)> = [
            "int", "float", "str", "bool", "NoneType", "list", "dict", "set", "tuple", "bytes",
            "range", "frozenset", "bytearray", "complex",
        ]
        .into_iter()
        .map(|ty| (ty, unparse_expr(sample_value(ty).unwrap())))
        .collect();

        assert_eq!(
            rendered,
            vec![
                ("int", "42".to_string()),
                ("float", "3.14".to_string()),
                ("str", "'example string'".to_string()),
                ("bool", "True".to_string()),
                ("NoneType", "None".to_string()),
                ("list", "[1, 2, 3, 'a', 'b', 'c']".to_string()),
                ("dict", "{'key1': 'value1', 'key2': 42}".to_string()),
                ("set", "{1, 2, 3, 'a', 'b', 'c'}".to_string()),
                ("tuple", "(1, 2, 3, 'a', 'b', 'c')".to_string()),
                ("bytes", "b'example bytes'".to_string()),
                ("range", "range(5)".to_string()),
                ("frozenset", "frozenset([1, 2, 3, 'a', 'b', 'c'])".to_string()),
                ("bytearray", "bytearray(b'example bytearray')".to_string()),
                ("complex", "1 + 2j".to_string()),
            ]
        );
    }

    #[test]
    fn test_types_without_literal_form_have_no_sample() {
        for ty in ["datetime", "deque", "Path", "memoryview", "Unknown", "MyClass"] {
            assert!(!has_sample(ty), "{}", ty);
        }
    }

    #[test]
    fn test_builtin_membership() {
        assert!(is_builtin("len"));
        assert!(is_builtin("ValueError"));
        assert!(is_builtin("print"));
        assert!(!is_builtin("math.floor"));
        assert!(!is_builtin("helper"));
        assert!(!is_builtin("<expr>"));
    }
}
