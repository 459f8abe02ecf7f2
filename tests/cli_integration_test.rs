//! Command-line behaviour of the `intcatalog` binary.

mod common;

use assert_cmd::Command;
use common::Corpus;
use indoc::indoc;
use std::fs;

fn corpus() -> Corpus {
    Corpus::new(&[
        (
            "math_utils.py",
            indoc! {"
                def add(a: int, b: int) -> int:
                    return a + b

                def double(a):
                    return a * 2

                def label(a: int) -> str:
                    return str(a)
            "},
        ),
        ("broken.py", "def oops(:\n"),
    ])
}

fn intcatalog() -> Command {
    let mut cmd = Command::cargo_bin("intcatalog").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("INTCATALOG_RELAXED");
    cmd
}

#[test]
fn test_prints_names_and_warns_about_parse_failures() {
    let corpus = corpus();
    let output = intcatalog()
        .current_dir(corpus.root())
        .args(["-p", "."])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "add\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.py"), "{}", stderr);
}

#[test]
fn test_relaxed_flag_enables_dynamic_acceptance() {
    let corpus = corpus();
    for flag in ["-e", "--relaxed"] {
        let output = intcatalog()
            .current_dir(corpus.root())
            .args(["--path", ".", flag, "--seed", "3"])
            .output()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "add\ndouble\n");
    }
}

#[test]
fn test_json_output_to_file() {
    let corpus = corpus();
    let target = corpus.path("out/catalog.json");
    intcatalog()
        .current_dir(corpus.root())
        .args(["-p", ".", "-f", "json", "-o"])
        .arg(&target)
        .assert()
        .success();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(json[0]["name"], "add");
    assert_eq!(json[0]["acceptance"], "static");
    assert_eq!(json[0]["parameters"][0]["annotation"], "int");
}

#[test]
fn test_records_output_includes_source() {
    let corpus = corpus();
    let output = intcatalog()
        .current_dir(corpus.root())
        .args(["-p", ".", "--format", "records"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("add ("), "{}", stdout);
    assert!(stdout.contains("    def add(a: int, b: int) -> int:\n        return a + b\n"));
}

#[test]
fn test_config_file_is_discovered() {
    let corpus = corpus();
    corpus.write(".intcatalog.toml", "strict = false\n\n[probe]\nseed = 8\n");
    let output = intcatalog()
        .current_dir(corpus.root())
        .args(["-p", "."])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "add\ndouble\n");
}

#[test]
fn test_invalid_config_fails() {
    let corpus = corpus();
    corpus.write("bad.toml", "[probe]\nmin_arg = 10\nmax_arg = 0\n");
    intcatalog()
        .current_dir(corpus.root())
        .args(["-p", ".", "--config", "bad.toml"])
        .assert()
        .failure();
}

#[test]
fn test_missing_root_fails() {
    let corpus = corpus();
    intcatalog()
        .current_dir(corpus.root())
        .args(["-p", "does-not-exist"])
        .assert()
        .failure();
}

#[test]
fn test_path_is_required() {
    intcatalog().assert().failure();
}
