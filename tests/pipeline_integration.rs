//! Corpus-level runs over temporary directories.

mod common;

use common::{relaxed, run, strict, Corpus};
use indoc::indoc;
use intcatalog::{Acceptance, CatalogConfig, Error, Pipeline};

#[test]
fn test_catalog_follows_file_then_declaration_order() {
    let corpus = Corpus::new(&[
        (
            "b.py",
            indoc! {"
                def outer(a: int) -> int:
                    def inner(b: int) -> int:
                        return b
                    return a

                if True:
                    def guarded(c: int) -> int:
                        return c
            "},
        ),
        ("a.py", "def first(a: int) -> int:\n    return a\n"),
        ("pkg/c.py", "def last(a: int) -> int:\n    return a\n"),
    ]);
    let report = run(&corpus, strict());
    assert_eq!(
        report.catalog.names(),
        vec!["first", "outer", "inner", "guarded", "last"]
    );
    assert_eq!(report.stats.files_scanned, 3);
}

#[test]
fn test_entries_carry_location() {
    let corpus = Corpus::new(&[(
        "m.py",
        "import math\n\n\ndef area(r: int) -> int:\n    return r * r\n",
    )]);
    let report = run(&corpus, strict());
    let entry = report.catalog.get("area").unwrap();
    assert_eq!(entry.path, corpus.path("m.py"));
    assert_eq!(entry.line, 4);
}

#[test]
fn test_parse_failure_is_collected_and_run_continues() {
    let corpus = Corpus::new(&[
        ("broken.py", "def nope(a:\n    return\n"),
        ("fine.py", "def yes(a: int) -> int:\n    return a\n"),
    ]);
    let report = run(&corpus, strict());
    assert_eq!(report.catalog.names(), vec!["yes"]);
    assert_eq!(report.stats.files_skipped, 1);
    match &report.failures[..] {
        [Error::Syntax { file, .. }] => assert_eq!(file, &corpus.path("broken.py")),
        other => panic!("unexpected failures: {:?}", other),
    }
}

#[test]
fn test_last_definition_wins_across_files() {
    let corpus = Corpus::new(&[
        ("a.py", "def pick(a) -> int:\n    return 1\n"),
        ("b.py", "def pick(a) -> str:\n    return 'x'\n"),
        ("c.py", "def use(a: int) -> int:\n    return pick(a)\n"),
    ]);
    let report = run(&corpus, relaxed());
    // `pick` resolves to `str` everywhere, so the rewritten `use` returns a string.
    assert!(report.catalog.get("use").is_none());
    assert_eq!(report.catalog.names(), vec!["pick"]);
}

#[test]
fn test_ignore_patterns_from_config() {
    let corpus = Corpus::new(&[
        ("keep.py", "def keep(a: int) -> int:\n    return a\n"),
        ("build/gen.py", "def gen(a: int) -> int:\n    return a\n"),
    ]);
    let mut config = strict();
    config.walk.ignore = vec!["**/build/**".to_string()];
    let report = run(&corpus, config);
    assert_eq!(report.catalog.names(), vec!["keep"]);
}

#[test]
fn test_probe_limits_come_from_config() {
    let corpus = Corpus::new(&[(
        "m.py",
        indoc! {"
            def slow(a):
                total = 0
                for i in range(2000):
                    total += i
                return total
        "},
    )]);

    let report = run(&corpus, relaxed());
    assert_eq!(report.catalog.get("slow").unwrap().acceptance, Acceptance::Dynamic);

    let mut tight = relaxed();
    tight.probe.limits.max_steps = 1_000;
    let report = run(&corpus, tight);
    assert!(report.catalog.is_empty());
    assert_eq!(report.stats.rejected, 1);
}

#[test]
fn test_missing_root_is_an_error() {
    let corpus = Corpus::new(&[]);
    let result = Pipeline::new(CatalogConfig::default()).run(&corpus.path("absent"));
    assert!(matches!(result, Err(Error::Io { .. })));
}
