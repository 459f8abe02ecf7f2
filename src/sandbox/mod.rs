//! Isolated execution of probe calls.
//!
//! A probe runs one function definition, and nothing else from its file,
//! inside a fresh [`eval::Interpreter`]. The interpreter only understands a
//! pure subset of Python: there is no I/O, no imports and no access to the
//! host. Every probe is bounded by [`SandboxLimits`]; hitting a limit or an
//! unsupported construct ends the probe with a [`Fault`].

pub mod budget;
pub mod builtins;
pub mod eval;
pub mod fault;
pub mod format;
pub mod ops;
pub mod rng;
pub mod value;

pub use budget::SandboxLimits;
pub use fault::Fault;
pub use rng::ProbeRng;

use crate::analysis::{ProbeCall, ProbeEvaluator, ProbeObservation};
use crate::python::ast::FunctionDef;
use eval::{exception_fault, Interpreter};
use log::trace;
use value::{Signal, Value};

/// [`ProbeEvaluator`] backed by the built-in interpreter.
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    limits: SandboxLimits,
}

impl Sandbox {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }
}

impl ProbeEvaluator for Sandbox {
    fn probe(&mut self, def: &FunctionDef, call: &ProbeCall) -> Result<ProbeObservation, Fault> {
        let mut interp = Interpreter::new(self.limits);
        let outcome = run_probe(&mut interp, def, call);
        trace!(
            "probe {} finished after {} steps",
            call.source(),
            interp.budget().steps()
        );
        outcome
    }
}

fn run_probe<'a>(
    interp: &mut Interpreter<'a>,
    def: &'a FunctionDef,
    call: &ProbeCall,
) -> Result<ProbeObservation, Fault> {
    let positional = call.positional.iter().cloned().map(Value::Int).collect();
    let keywords = call
        .keywords
        .iter()
        .map(|(name, value)| (name.clone(), Value::Int(value.clone())))
        .collect();
    let outcome = interp
        .define_function(def)
        .and_then(|function| interp.call(&function, positional, keywords));
    match outcome {
        Ok(value) => Ok(ProbeObservation {
            type_name: value.type_name().to_string(),
            repr: value.repr(),
        }),
        Err(Signal::Raise(exc)) => Err(exception_fault(&exc)),
        Err(Signal::Abort(fault)) => Err(fault),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::ast::StmtKind;
    use crate::python::parser::parse_module;
    use num_bigint::BigInt;
    use std::path::Path;

    fn run_first(source: &str, positional: &[i64]) -> Result<ProbeObservation, Fault> {
        let module = parse_module(source, Path::new("probe.py")).unwrap();
        let def = module
            .body
            .iter()
            .find_map(|stmt| match &stmt.kind {
                StmtKind::FunctionDef(def) => Some(def),
                _ => None,
            })
            .unwrap();
        let call = ProbeCall {
            function: def.name.clone(),
            positional: positional.iter().map(|&n| BigInt::from(n)).collect(),
            keywords: Vec::new(),
        };
        Sandbox::default().probe(def, &call)
    }

    #[test]
    fn test_probe_reports_type_and_repr() {
        let observed = run_first("def f(a, b):\n    return a * b\n", &[6, 7]).unwrap();
        assert_eq!(observed.type_name, "int");
        assert_eq!(observed.repr, "42");

        let observed = run_first("def g(a):\n    return a / 2\n", &[3]).unwrap();
        assert_eq!(observed.type_name, "float");
        assert_eq!(observed.repr, "1.5");

        let observed = run_first("def h(a):\n    return a > 1\n", &[3]).unwrap();
        assert_eq!(observed.type_name, "bool");
    }

    #[test]
    fn test_implicit_none() {
        let observed = run_first("def f(a):\n    a += 1\n", &[1]).unwrap();
        assert_eq!(observed.type_name, "NoneType");
        assert_eq!(observed.repr, "None");
    }

    #[test]
    fn test_escaping_exception_is_a_fault() {
        let fault = run_first("def f(a):\n    return 1 // (a - a)\n", &[4]).unwrap_err();
        assert_eq!(
            fault,
            Fault::exception("ZeroDivisionError", "integer division or modulo by zero")
        );
        assert!(!fault.is_limit());
    }

    #[test]
    fn test_other_module_functions_are_not_visible() {
        let source = "def f(a):\n    return helper(a)\n\ndef helper(a):\n    return a\n";
        let fault = run_first(source, &[1]).unwrap_err();
        assert_eq!(
            fault,
            Fault::exception("NameError", "name 'helper' is not defined")
        );
    }

    #[test]
    fn test_integer_limit() {
        let fault = run_first("def f(a):\n    return a ** 100000\n", &[7]).unwrap_err();
        assert!(matches!(fault, Fault::IntegerLimit(_)));
        assert!(fault.is_limit());
    }

    #[test]
    fn test_sample_container_types_evaluate() {
        let cases = [
            ("def f(a):\n    return len(range(5)) + a\n", "6"),
            (
                "def f(a):\n    s = frozenset([1, 2, 3, 'a', 'b', 'c'])\n    return len(s | {a}) + (2 in s)\n",
                "7",
            ),
            (
                "def f(a):\n    b = bytearray(b'example bytearray')\n    b.append(a)\n    return len(b) + b[0]\n",
                "119",
            ),
            ("def f(a):\n    return {frozenset([a]): 3}[frozenset([a])]\n", "3"),
            ("def f(a):\n    return bytearray(b'ab') == b'ab'\n", "True"),
        ];
        for (source, expected) in cases {
            let observed = run_first(source, &[1]).unwrap();
            assert_eq!(observed.repr, expected, "{}", source);
        }
    }

    #[test]
    fn test_frozenset_has_no_mutators() {
        let fault = run_first("def f(a):\n    frozenset().add(a)\n", &[1]).unwrap_err();
        assert!(matches!(fault, Fault::Exception { .. }), "{:?}", fault);
    }

    #[test]
    fn test_huge_format_width_is_a_memory_fault() {
        for source in [
            "def f(a):\n    return len('%*d' % (10 ** 18, a))\n",
            "def f(a):\n    return len(format(a, '0999999999d'))\n",
            "def f(a):\n    return len(f'{a:>999999999}')\n",
        ] {
            let fault = run_first(source, &[1]).unwrap_err();
            assert!(matches!(fault, Fault::MemoryLimit(_)), "{}: {:?}", source, fault);
        }
    }
}
