use crate::errors::{Error, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Finds the Python files of a corpus.
pub struct CorpusWalker {
    root: PathBuf,
    ignore_patterns: Vec<glob::Pattern>,
    respect_gitignore: bool,
}

impl CorpusWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore_patterns: vec![],
            respect_gitignore: true,
        }
    }

    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.ignore_patterns = patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<_, _>>()?;
        Ok(self)
    }

    pub fn respect_gitignore(mut self, yes: bool) -> Self {
        self.respect_gitignore = yes;
        self
    }

    /// Every `.py` file under the root, sorted by path. Siblings are visited
    /// in path order, so the depth-first walk is already sorted.
    pub fn walk(&self) -> Result<Vec<PathBuf>> {
        if let Err(e) = std::fs::metadata(&self.root) {
            return Err(Error::io(&self.root, e));
        }

        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && self.should_process(path) {
                files.push(path.to_path_buf());
            }
        }

        log::debug!("found {} python files under {}", files.len(), self.root.display());
        Ok(files)
    }

    fn should_process(&self, path: &Path) -> bool {
        if path.extension().is_none_or(|ext| ext != "py") {
            return false;
        }
        let path_str = path.to_string_lossy();
        !self.ignore_patterns.iter().any(|p| p.matches(&path_str))
    }
}
