//! End-to-end classification of the reference examples.

mod common;

use common::{relaxed, run_source, strict};
use indoc::indoc;
use intcatalog::Acceptance;
use pretty_assertions::assert_eq;

#[test]
fn test_fully_annotated_add_is_accepted_statically() {
    let report = run_source("def add(a: int, b: int) -> int:\n    return a + b\n", strict());
    let entry = report.catalog.get("add").unwrap();
    assert_eq!(entry.acceptance, Acceptance::Static);
    assert_eq!(report.stats.probes_run, 0);
    assert_eq!(
        entry
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.annotation.as_deref()))
            .collect::<Vec<_>>(),
        vec![("a", Some("int")), ("b", Some("int"))]
    );
}

#[test]
fn test_string_return_is_rejected() {
    for config in [strict(), relaxed()] {
        let report = run_source("def to_text(a: int) -> str:\n    return str(a)\n", config);
        assert!(report.catalog.is_empty());
        assert_eq!(report.stats.rejected, 1);
    }
}

#[test]
fn test_unannotated_double_is_accepted_dynamically_when_relaxed() {
    let source = "def double(a):\n    return a * 2\n";

    let report = run_source(source, relaxed());
    assert_eq!(report.catalog.get("double").unwrap().acceptance, Acceptance::Dynamic);
    assert_eq!(report.stats.probes_run, 1);

    let report = run_source(source, strict());
    assert!(report.catalog.is_empty());
    assert_eq!(report.stats.probes_run, 0);
}

#[test]
fn test_substituted_string_helper_rejects_wrapper() {
    let source = indoc! {"
        def helper(a) -> str:
            return str(a)

        def wrap(a: int) -> int:
            return helper(a)
    "};
    for config in [strict(), relaxed()] {
        let report = run_source(source, config);
        assert!(report.catalog.get("wrap").is_none());
        assert_eq!(report.stats.probes_run, 1);
    }
}

#[test]
fn test_unknown_callee_vetoes_in_both_modes() {
    let source = "def wrap2(a: int) -> int:\n    return unknown_fn(a)\n";
    for config in [strict(), relaxed()] {
        let report = run_source(source, config);
        assert!(report.catalog.is_empty());
        assert_eq!(report.stats.vetoed, 1);
        assert_eq!(report.stats.probes_run, 0);
    }
}

#[test]
fn test_substituted_int_helper_source_is_rewritten() {
    let source = indoc! {"
        def base() -> int:
            return 7

        def scaled(a: int) -> int:
            return base() * a + abs(a)
    "};
    let report = run_source(source, strict());
    assert_eq!(report.catalog.names(), vec!["base", "scaled"]);
    assert_eq!(
        report.catalog.get("scaled").unwrap().source,
        "def scaled(a: int) -> int:\n    return 42 * a + abs(a)\n"
    );
}

#[test]
fn test_faulting_probe_excludes_function() {
    let source = indoc! {"
        def divide(a):
            return a // 0

        def spin(a):
            while True:
                a += 1

        def parity(a):
            return a % 2 == 0
    "};
    let report = run_source(source, relaxed());
    assert!(report.catalog.is_empty());
    assert_eq!(report.stats.rejected, 3);
    assert_eq!(report.stats.probes_run, 3);
}

#[test]
fn test_class_methods_and_async_functions_are_not_cataloged() {
    let source = indoc! {"
        class Box:
            def get(self) -> int:
                return 1

        async def fetch(a: int) -> int:
            return a

        def plain(a: int) -> int:
            return a
    "};
    let report = run_source(source, strict());
    assert_eq!(report.catalog.names(), vec!["plain"]);
    assert_eq!(report.stats.declarations, 1);
}

#[test]
fn test_container_helpers_substitute_constructor_samples() {
    let source = indoc! {"
        def span(a) -> range:
            return range(a)

        def frozen(a) -> frozenset:
            return frozenset([a])

        def raw(a) -> bytearray:
            return bytearray(a)

        def count(a):
            return len(span(a)) + len(frozen(a)) + len(raw(a))
    "};
    let report = run_source(source, relaxed());
    let entry = report.catalog.get("count").unwrap();
    assert_eq!(entry.acceptance, Acceptance::Dynamic);
}

#[test]
fn test_complex_helper_is_substituted_then_rejected() {
    let source = indoc! {"
        def rotate(a) -> complex:
            return a * 1j

        def real_part(a):
            return rotate(a)
    "};
    let report = run_source(source, relaxed());
    assert!(report.catalog.is_empty());
    assert_eq!(report.stats.probes_run, 1);
}

#[test]
fn test_named_exception_handler_is_evaluated() {
    let source = indoc! {"
        def safe_div(a):
            try:
                return 10 // (a - a)
            except ZeroDivisionError as exc:
                return len(str(exc))
    "};
    let report = run_source(source, relaxed());
    assert_eq!(report.catalog.get("safe_div").unwrap().acceptance, Acceptance::Dynamic);
}
