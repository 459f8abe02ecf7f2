// Shared fixtures for intcatalog integration tests
#![allow(dead_code)]

use intcatalog::{CatalogConfig, Pipeline, PipelineReport};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary corpus directory populated with Python files.
pub struct Corpus {
    dir: TempDir,
}

impl Corpus {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().expect("create corpus dir");
        for (relative, text) in files {
            let path = dir.path().join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create package dir");
            }
            fs::write(&path, text).expect("write corpus file");
        }
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, text: &str) {
        fs::write(self.path(relative), text).expect("write corpus file");
    }
}

pub fn strict() -> CatalogConfig {
    let mut config = CatalogConfig::default();
    config.probe.seed = Some(1234);
    config
}

pub fn relaxed() -> CatalogConfig {
    CatalogConfig {
        strict: false,
        ..strict()
    }
}

pub fn run(corpus: &Corpus, config: CatalogConfig) -> PipelineReport {
    Pipeline::new(config)
        .run(corpus.root())
        .expect("corpus root is readable")
}

/// Catalog a single in-memory module.
pub fn run_source(source: &str, config: CatalogConfig) -> PipelineReport {
    Pipeline::new(config).run_sources(vec![(PathBuf::from("module.py"), Ok(source.to_string()))])
}
