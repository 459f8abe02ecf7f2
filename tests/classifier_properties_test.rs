//! Property tests for classification, substitution and the call-graph gate.

use intcatalog::analysis::{
    check_call_graph, declarations_from_source, CallSiteAnalyzer, IntegerSignatureClassifier,
    ProbeCall, ProbeEvaluator, ProbeObservation, ReturnTypeTable, SampleValueSubstitutor,
    SignatureState, Strictness, Substitution,
};
use intcatalog::python::ast::FunctionDef;
use intcatalog::sandbox::{Fault, ProbeRng};
use proptest::prelude::*;
use std::path::Path;

/// Counts probes and always observes an int.
#[derive(Default)]
struct Recorder {
    calls: Vec<ProbeCall>,
}

impl ProbeEvaluator for Recorder {
    fn probe(&mut self, _def: &FunctionDef, call: &ProbeCall) -> Result<ProbeObservation, Fault> {
        self.calls.push(call.clone());
        Ok(ProbeObservation {
            type_name: "int".into(),
            repr: "1".into(),
        })
    }
}

fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}".prop_filter("not a keyword", |s| {
        !matches!(
            s.as_str(),
            "if" | "in" | "is" | "or" | "and" | "as" | "def" | "del" | "for" | "not" | "try"
                | "with" | "elif" | "else" | "from" | "pass" | "while" | "break" | "class"
                | "raise" | "yield" | "async" | "await" | "global" | "import" | "lambda"
                | "return" | "assert" | "except" | "finally" | "continue" | "nonlocal"
                | "match" | "case" | "type"
        )
    })
}

fn distinct_params(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(identifier(), 0..max).prop_map(|set| set.into_iter().collect())
}

fn classify(source: &str, strictness: Strictness) -> (SignatureState, Vec<ProbeCall>) {
    let declarations = declarations_from_source(source, Path::new("p.py")).unwrap();
    let declaration = declarations.last().unwrap();
    let mut recorder = Recorder::default();
    let state = IntegerSignatureClassifier::new(strictness, &mut recorder, ProbeRng::new(5))
        .classify(&Substitution {
            declaration: declaration.clone(),
            replaced: 0,
        });
    (state, recorder.calls)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn all_int_annotations_accept_statically_without_probe(params in distinct_params(6)) {
        let signature: Vec<String> = params.iter().map(|p| format!("{}: int", p)).collect();
        let source = format!("def f({}) -> int:\n    return 0\n", signature.join(", "));
        let (state, calls) = classify(&source, Strictness::Strict);
        prop_assert_eq!(state, SignatureState::StaticallyAccepted);
        prop_assert!(calls.is_empty());
    }

    #[test]
    fn missing_return_annotation_probes_once_per_function(params in distinct_params(6)) {
        let source = format!("def f({}):\n    return 0\n", params.join(", "));
        let (state, calls) = classify(&source, Strictness::Relaxed);
        prop_assert_eq!(state, SignatureState::DynamicallyAccepted);
        prop_assert_eq!(calls.len(), 1);
        prop_assert_eq!(calls[0].arg_count(), params.len());
    }

    #[test]
    fn probe_arguments_stay_in_range(params in distinct_params(6), seed in any::<u64>()) {
        let source = format!("def f({}):\n    return 0\n", params.join(", "));
        let declaration = declarations_from_source(&source, Path::new("p.py")).unwrap().remove(0);
        let mut recorder = Recorder::default();
        let mut classifier =
            IntegerSignatureClassifier::new(Strictness::Relaxed, &mut recorder, ProbeRng::new(seed))
                .with_arg_range(-3, 3);
        let call = classifier.synthesize_call(&declaration.def);
        for value in &call.positional {
            prop_assert!(*value >= (-3).into() && *value <= 3.into());
        }
    }

    #[test]
    fn substitution_is_idempotent(
        helper_type in prop::sample::select(vec!["int", "str", "float", "list", "Widget"]),
        nested in any::<bool>(),
    ) {
        let call = if nested { "helper(helper(a))" } else { "helper(a) + 1" };
        let source = format!(
            "def helper(a) -> {}:\n    return a\n\ndef user(a):\n    return [{c} for _ in range(2)], lambda: {c}\n",
            helper_type,
            c = call
        );
        let declarations = declarations_from_source(&source, Path::new("p.py")).unwrap();
        let table = ReturnTypeTable::from_declarations(&declarations);
        let once = SampleValueSubstitutor::substitute(&table, &declarations[1]);
        let twice = SampleValueSubstitutor::substitute(&table, &once.declaration);
        prop_assert_eq!(&once.declaration, &twice.declaration);
        prop_assert_eq!(twice.replaced, 0);
    }

    #[test]
    fn unresolvable_callee_is_vetoed(
        name in identifier().prop_filter("not a builtin or defined", |n| {
            !intcatalog::analysis::samples::is_builtin(n) && n != "f"
        }),
        annotated in any::<bool>(),
    ) {
        let signature = if annotated { "(a: int) -> int" } else { "(a)" };
        let source = format!("def f{}:\n    return {}(a)\n", signature, name);
        let declarations = declarations_from_source(&source, Path::new("p.py")).unwrap();
        let table = ReturnTypeTable::from_declarations(&declarations);
        let sites = CallSiteAnalyzer::new(&table).analyze(&declarations[0].def);
        prop_assert!(check_call_graph(&sites).is_err());
    }
}
