//! Shared error types for the catalog extractor.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for intcatalog operations
#[derive(Debug, Error)]
pub enum Error {
    /// Reading a source or config file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source file is not valid Python
    #[error("Syntax error in {file}:{line}:{column}: {message}")]
    Syntax {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corpus discovery errors
    #[error("Walk error: {0}")]
    Walk(String),

    /// Writing the catalog failed
    #[error("Output error: {0}")]
    Output(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn syntax(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Syntax {
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// True for faults scoped to a single source file.
    pub fn is_per_file(&self) -> bool {
        matches!(self, Error::Io { .. } | Error::Syntax { .. })
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        Error::Walk(err.to_string())
    }
}

impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::Config(format!("invalid ignore pattern: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = Error::syntax("pkg/mod.py", 3, 7, "unexpected token");
        assert_eq!(
            err.to_string(),
            "Syntax error in pkg/mod.py:3:7: unexpected token"
        );
        assert!(err.is_per_file());
    }

    #[test]
    fn test_config_error_is_not_per_file() {
        let err = Error::Config("min_arg exceeds max_arg".into());
        assert!(!err.is_per_file());
        assert_eq!(
            err.to_string(),
            "Configuration error: min_arg exceeds max_arg"
        );
    }
}
