//! Corpus-level orchestration.
//!
//! Files are read and parsed one at a time. Their declarations are pooled so
//! the return-type table sees the whole corpus before any function is
//! classified. Each declaration then goes through call-site analysis, the
//! call-graph gate, sample substitution and classification, in that order.

pub mod catalog;

pub use catalog::{Acceptance, CatalogEntry, FunctionCatalog, ParameterEntry};

use crate::analysis::{
    check_call_graph, collect_declarations, CallSiteAnalyzer, FunctionDeclaration,
    IntegerSignatureClassifier, ProbeEvaluator, ReturnTypeTable, SampleValueSubstitutor,
    SignatureState, Strictness, Substitution,
};
use crate::config::CatalogConfig;
use crate::errors::{Error, Result};
use crate::io::walker::CorpusWalker;
use crate::python::parse_module;
use crate::sandbox::{ProbeRng, Sandbox};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub declarations: usize,
    pub vetoed: usize,
    pub rejected: usize,
    pub statically_accepted: usize,
    pub dynamically_accepted: usize,
    pub probes_run: usize,
}

impl PipelineStats {
    pub fn accepted(&self) -> usize {
        self.statically_accepted + self.dynamically_accepted
    }
}

#[derive(Debug)]
pub struct PipelineReport {
    pub catalog: FunctionCatalog,
    pub stats: PipelineStats,
    /// Files that could not be read or parsed.
    pub failures: Vec<Error>,
}

/// Runs the extraction over a corpus with one probe evaluator.
pub struct Pipeline<E> {
    config: CatalogConfig,
    evaluator: E,
}

impl Pipeline<Sandbox> {
    pub fn new(config: CatalogConfig) -> Self {
        let sandbox = Sandbox::new(config.probe.limits);
        Self::with_evaluator(config, sandbox)
    }
}

impl<E: ProbeEvaluator> Pipeline<E> {
    pub fn with_evaluator(config: CatalogConfig, evaluator: E) -> Self {
        Self { config, evaluator }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn strictness(&self) -> Strictness {
        self.config.strictness()
    }

    /// Discover the corpus under `root` and build its catalog.
    pub fn run(&mut self, root: &Path) -> Result<PipelineReport> {
        let files = CorpusWalker::new(root)
            .with_ignore_patterns(&self.config.walk.ignore)?
            .respect_gitignore(self.config.walk.respect_gitignore)
            .walk()?;
        info!("scanning {} files under {}", files.len(), root.display());

        let sources = files.into_iter().map(|path| {
            let text = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e));
            (path, text)
        });
        Ok(self.run_sources(sources))
    }

    /// Build a catalog from already-read files. A file whose text is an
    /// error is counted as skipped.
    pub fn run_sources<I>(&mut self, sources: I) -> PipelineReport
    where
        I: IntoIterator<Item = (PathBuf, Result<String>)>,
    {
        let mut stats = PipelineStats::default();
        let mut failures = Vec::new();
        let mut declarations = Vec::new();

        for (path, text) in sources {
            stats.files_scanned += 1;
            let parsed = text.and_then(|text| parse_module(&text, &path));
            match parsed {
                Ok(module) => {
                    let found = collect_declarations(&module, Arc::new(path));
                    declarations.extend(found);
                }
                Err(err) => {
                    warn!("skipping {}: {}", path.display(), err);
                    stats.files_skipped += 1;
                    failures.push(err);
                }
            }
        }

        let catalog = self.build_catalog(&declarations, &mut stats);
        info!(
            "{} of {} functions accepted ({} static, {} dynamic)",
            stats.accepted(),
            stats.declarations,
            stats.statically_accepted,
            stats.dynamically_accepted
        );
        PipelineReport {
            catalog,
            stats,
            failures,
        }
    }

    /// Classify pooled declarations, in order, against a table built from
    /// all of them.
    pub fn build_catalog(
        &mut self,
        declarations: &[FunctionDeclaration],
        stats: &mut PipelineStats,
    ) -> FunctionCatalog {
        let table = ReturnTypeTable::from_declarations(declarations);
        let analyzer = CallSiteAnalyzer::new(&table);
        let probe = &self.config.probe;
        let mut classifier = IntegerSignatureClassifier::new(
            self.config.strictness(),
            &mut self.evaluator,
            ProbeRng::seeded(probe.seed),
        )
        .with_arg_range(probe.min_arg, probe.max_arg);

        let mut catalog = FunctionCatalog::new();
        stats.declarations += declarations.len();

        for declaration in declarations {
            let sites = analyzer.analyze(&declaration.def);
            if let Err(veto) = check_call_graph(&sites) {
                debug!("{} vetoed: {}", declaration.name(), veto);
                stats.vetoed += 1;
                continue;
            }

            let substitution = if sites.iter().any(|s| s.has_sample()) {
                SampleValueSubstitutor::substitute(&table, declaration)
            } else {
                Substitution {
                    declaration: declaration.clone(),
                    replaced: 0,
                }
            };

            let acceptance = match classifier.classify(&substitution) {
                SignatureState::StaticallyAccepted => {
                    stats.statically_accepted += 1;
                    Acceptance::Static
                }
                SignatureState::DynamicallyAccepted => {
                    stats.dynamically_accepted += 1;
                    Acceptance::Dynamic
                }
                SignatureState::Rejected(reason) => {
                    debug!("{} rejected: {}", declaration.name(), reason);
                    stats.rejected += 1;
                    continue;
                }
                SignatureState::PendingDynamicProbe => {
                    stats.rejected += 1;
                    continue;
                }
            };
            catalog.push(CatalogEntry::from_declaration(
                &substitution.declaration,
                acceptance,
            ));
        }

        stats.probes_run += classifier.probes_run();
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ProbeCall, ProbeObservation};
    use crate::python::ast::FunctionDef;
    use crate::sandbox::Fault;
    use indoc::indoc;

    struct CountingEvaluator {
        calls: Vec<ProbeCall>,
    }

    impl ProbeEvaluator for CountingEvaluator {
        fn probe(&mut self, _def: &FunctionDef, call: &ProbeCall) -> std::result::Result<ProbeObservation, Fault> {
            self.calls.push(call.clone());
            Ok(ProbeObservation {
                type_name: "int".into(),
                repr: "0".into(),
            })
        }
    }

    fn relaxed() -> CatalogConfig {
        CatalogConfig {
            strict: false,
            ..CatalogConfig::default()
        }
    }

    fn run(config: CatalogConfig, files: &[(&str, &str)]) -> PipelineReport {
        let mut pipeline = Pipeline::new(config);
        pipeline.run_sources(
            files
                .iter()
                .map(|(path, text)| (PathBuf::from(path), Ok(text.to_string()))),
        )
    }

    #[test]
    fn test_catalog_keeps_discovery_order() {
        let report = run(
            relaxed(),
            &[
                ("a.py", "def first(a):\n    return a\n\ndef second(b: int) -> int:\n    return b\n"),
                ("b.py", "def third(c):\n    def inner(d) -> int:\n        return d\n    return inner(c)\n"),
            ],
        );
        assert_eq!(report.catalog.names(), vec!["first", "second", "third", "inner"]);
        assert_eq!(report.stats.statically_accepted, 2);
        assert_eq!(report.stats.dynamically_accepted, 2);
    }

    #[test]
    fn test_syntax_error_skips_only_that_file() {
        let report = run(
            CatalogConfig::default(),
            &[
                ("bad.py", "def broken(:\n"),
                ("good.py", "def ok(a: int) -> int:\n    return a\n"),
            ],
        );
        assert_eq!(report.catalog.names(), vec!["ok"]);
        assert_eq!(report.stats.files_scanned, 2);
        assert_eq!(report.stats.files_skipped, 1);
        assert!(matches!(report.failures[0], Error::Syntax { .. }));
    }

    #[test]
    fn test_read_failure_is_reported() {
        let mut pipeline = Pipeline::new(CatalogConfig::default());
        let missing = PathBuf::from("gone.py");
        let err = Error::io(
            &missing,
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let report = pipeline.run_sources(vec![(missing, Err(err))]);
        assert!(report.catalog.is_empty());
        assert_eq!(report.stats.files_skipped, 1);
    }

    #[test]
    fn test_return_types_span_files() {
        let report = run(
            relaxed(),
            &[
                ("a.py", "def wrap(a: int) -> int:\n    return helper(a)\n"),
                ("b.py", "def helper(a) -> int:\n    return a + 1\n"),
            ],
        );
        let wrap = report.catalog.get("wrap").unwrap();
        assert_eq!(wrap.source, "def wrap(a: int) -> int:\n    return 42\n");
        assert_eq!(wrap.acceptance, Acceptance::Static);
    }

    #[test]
    fn test_vetoed_function_is_never_probed() {
        let config = relaxed();
        let mut pipeline = Pipeline::with_evaluator(config, CountingEvaluator { calls: vec![] });
        let source = indoc! {"
            def uses_unknown(a):
                return unknown_fn(a)

            def probed(a, b):
                return a
        "};
        let report = pipeline.run_sources(vec![(PathBuf::from("m.py"), Ok(source.to_string()))]);
        assert_eq!(report.catalog.names(), vec!["probed"]);
        assert_eq!(report.stats.vetoed, 1);
        assert_eq!(report.stats.probes_run, 1);
        assert_eq!(pipeline.evaluator.calls.len(), 1);
        assert_eq!(pipeline.evaluator.calls[0].arg_count(), 2);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mut config = relaxed();
        config.probe.seed = Some(11);
        let source = "def f(a, b):\n    return a - b\n";
        let mut first = Pipeline::with_evaluator(config.clone(), CountingEvaluator { calls: vec![] });
        let mut second = Pipeline::with_evaluator(config, CountingEvaluator { calls: vec![] });
        first.run_sources(vec![(PathBuf::from("m.py"), Ok(source.to_string()))]);
        second.run_sources(vec![(PathBuf::from("m.py"), Ok(source.to_string()))]);
        assert_eq!(first.evaluator.calls, second.evaluator.calls);
    }
}
