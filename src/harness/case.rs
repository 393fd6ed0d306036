//! Test cases and corpus discovery

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::common::{Error, Result};

/// One corpus entry: an input file fed to the program under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// File name without its extension
    pub name: String,
    pub path: PathBuf,
}

impl TestCase {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    /// Whether the input is present as a regular file right now
    pub fn input_exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Find every file under `root` with the given extension, sorted by path
///
/// The extension is matched case-sensitively and given without the dot.
/// Sorting makes repeated runs over an unchanged corpus report in the same
/// order.
pub fn discover(root: &Path, extension: &str) -> Result<Vec<TestCase>> {
    let extension = extension.trim_start_matches('.');
    let mut found = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(Error::discovery(root, e)),
            Err(e) => {
                tracing::warn!("Skipping unreadable corpus entry: {}", e);
                continue;
            }
        };

        // Symlinks are not followed; a dangling one is still a corpus entry
        // and is reported as a missing input.
        let file_type = entry.file_type();
        if !(file_type.is_file() || file_type.is_symlink()) {
            continue;
        }
        if entry.path().extension().is_some_and(|ext| ext == extension) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    tracing::debug!("Discovered {} inputs under {}", found.len(), root.display());
    Ok(found.into_iter().map(TestCase::from_path).collect())
}
