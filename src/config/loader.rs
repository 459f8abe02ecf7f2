use std::fs;
use std::path::{Path, PathBuf};

use super::CatalogConfig;
use crate::errors::{Error, Result};

pub const CONFIG_FILE_NAME: &str = ".intcatalog.toml";

/// How many directories, starting with the current one, are searched.
const MAX_TRAVERSAL_DEPTH: usize = 10;

pub(crate) fn read_config_file(path: &Path) -> std::result::Result<String, std::io::Error> {
    fs::read_to_string(path)
}

/// Parse a TOML document and validate the result.
pub fn parse_and_validate_config(contents: &str) -> Result<CatalogConfig> {
    let config = toml::from_str::<CatalogConfig>(contents)?;
    config.validate()?;
    Ok(config)
}

/// `start` followed by its ancestors, at most `max_depth` entries.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Nearest `.intcatalog.toml` in `start` or one of its ancestors.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

fn load_from_path(path: &Path) -> Result<CatalogConfig> {
    let contents = read_config_file(path).map_err(|e| Error::io(path, e))?;
    let config = parse_and_validate_config(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Load the configuration for a run.
///
/// An explicit path must exist. Otherwise the directory hierarchy above the
/// current directory is searched and defaults are used when nothing is found.
/// A file that is found but invalid is an error either way.
pub fn load_config(explicit: Option<&Path>) -> Result<CatalogConfig> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }

    let current = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            return Ok(CatalogConfig::default());
        }
    };

    match find_config_file(&current) {
        Some(path) => load_from_path(&path),
        None => {
            log::debug!(
                "No {} found after checking {} directories. Using default config.",
                CONFIG_FILE_NAME,
                MAX_TRAVERSAL_DEPTH
            );
            Ok(CatalogConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::TempDir;

    #[test]
    fn test_parse_partial_document_keeps_defaults() {
        let config = parse_and_validate_config(indoc! {"
            strict = false

            [probe]
            max_arg = 9
            timeout_ms = 50
            seed = 3
        "})
        .unwrap();
        assert!(!config.strict);
        assert_eq!(config.probe.min_arg, 0);
        assert_eq!(config.probe.max_arg, 9);
        assert_eq!(config.probe.seed, Some(3));
        assert_eq!(config.probe.limits.timeout_ms, 50);
        assert_eq!(config.probe.limits.max_call_depth, 64);
        assert!(config.walk.ignore.is_empty());
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        assert!(matches!(
            parse_and_validate_config("strict = \"yes\""),
            Err(Error::Config(_))
        ));
        assert!(parse_and_validate_config("[probe]\nmin_arg = 5\nmax_arg = 4\n").is_err());
    }

    #[test]
    fn test_directory_ancestors_is_bounded() {
        let dirs: Vec<PathBuf> =
            directory_ancestors(PathBuf::from("/a/b/c/d"), 3).collect();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/a/b/c/d"),
                PathBuf::from("/a/b/c"),
                PathBuf::from("/a/b")
            ]
        );
    }

    #[test]
    fn test_find_config_file_searches_upwards() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("pkg").join("sub");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.path().join(CONFIG_FILE_NAME), "strict = false\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, root.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("nope.toml");
        assert!(matches!(
            load_config(Some(&missing)),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_explicit_invalid_file_names_the_path() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("bad.toml");
        fs::write(&path, "[probe]\ntimeout_ms = 0\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
