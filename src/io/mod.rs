pub mod output;
pub mod walker;

pub use output::{create_writer, OutputFormat, OutputWriter};
pub use walker::CorpusWalker;

use crate::errors::{Error, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Buffered sink for the catalog: the given file, or stdout.
pub fn open_destination(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                ensure_dir(parent)?;
            }
            let file = fs::File::create(path).map_err(|e| Error::io(path, e))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(std::io::stdout().lock()))),
    }
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_destination_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out/nested/catalog.txt");
        {
            let mut sink = open_destination(Some(&target)).unwrap();
            writeln!(sink, "add").unwrap();
        }
        assert_eq!(fs::read_to_string(&target).unwrap(), "add\n");
    }
}
