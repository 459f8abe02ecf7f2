//! Benchmarks for cataloging a generated corpus
//!
//! Covers parsing, cross-file substitution and sandboxed probing.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use intcatalog::analysis::declarations_from_source;
use intcatalog::{CatalogConfig, Pipeline};
use std::hint::black_box;
use std::path::{Path, PathBuf};

fn create_module(index: usize, functions: usize) -> String {
    let mut source = String::from("import math\n\n");
    for i in 0..functions {
        match i % 4 {
            0 => source.push_str(&format!(
                "def add_{index}_{i}(a: int, b: int) -> int:\n    return a + b\n\n"
            )),
            1 => source.push_str(&format!(
                "def loop_{index}_{i}(n):\n    total = 0\n    for k in range(n):\n        total += k * k\n    return total\n\n"
            )),
            2 => source.push_str(&format!(
                "def wrap_{index}_{i}(a: int) -> int:\n    return add_{index}_{prev}(a, a) + abs(a)\n\n",
                prev = i - 2
            )),
            _ => source.push_str(&format!(
                "def text_{index}_{i}(a) -> str:\n    return str(a)\n\n"
            )),
        }
    }
    source
}

fn create_corpus(files: usize, functions: usize) -> Vec<(PathBuf, String)> {
    (0..files)
        .map(|f| (PathBuf::from(format!("pkg/mod_{}.py", f)), create_module(f, functions)))
        .collect()
}

fn relaxed() -> CatalogConfig {
    let mut config = CatalogConfig {
        strict: false,
        ..CatalogConfig::default()
    };
    config.probe.seed = Some(7);
    config
}

fn bench_parse(c: &mut Criterion) {
    let source = create_module(0, 200);
    c.bench_function("declarations_from_source_200", |b| {
        b.iter(|| declarations_from_source(black_box(&source), Path::new("bench.py")))
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    for files in [1usize, 10, 50] {
        let corpus = create_corpus(files, 40);
        group.bench_with_input(BenchmarkId::new("relaxed", files), &corpus, |b, corpus| {
            b.iter(|| {
                let sources = corpus
                    .iter()
                    .map(|(path, text)| (path.clone(), Ok::<_, intcatalog::Error>(text.clone())));
                Pipeline::new(relaxed()).run_sources(black_box(sources))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_pipeline);
criterion_main!(benches);
