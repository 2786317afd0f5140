//! Source file discovery shared by every language analyzer

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::AnalysisError;

/// Which files a language owns and which it ignores.
#[derive(Debug, Clone, Copy)]
pub struct FileFilter<'a> {
    /// Extensions without the leading dot
    pub extensions: &'a [&'a str],
    /// Raw substrings of the root-relative path that mark a file as skipped
    pub skip_patterns: &'a [&'a str],
    /// Filename suffixes that mark a file as skipped (`_test.go`)
    pub skip_suffixes: &'a [&'a str],
}

impl FileFilter<'_> {
    /// Whether `path` belongs to the language and is not a skipped test file.
    pub fn accepts(&self, path: &Path, root: &Path) -> bool {
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext));
        if !ext_ok {
            return false;
        }

        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        if self.skip_suffixes.iter().any(|s| name.ends_with(s)) {
            return false;
        }

        let rel = relative_slash_path(path, root);
        !self.skip_patterns.iter().any(|p| rel.contains(p))
    }
}

/// Walk `root` and collect the files accepted by `filter`.
///
/// A directory is pruned when its basename equals any entry of `exclude`,
/// at any depth. Ignore files (`.gitignore` and friends) are not consulted.
/// Results are ordered by path so repeated runs see the same sequence.
pub fn walk_files(
    root: &Path,
    exclude: &[String],
    filter: FileFilter<'_>,
) -> Result<Vec<PathBuf>, AnalysisError> {
    if !root.is_dir() {
        return Err(AnalysisError::RootNotFound(root.to_path_buf()));
    }

    let excluded: Vec<String> = exclude.to_vec();
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !excluded.iter().any(|e| e.as_str() == name.as_ref())
        });

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if filter.accepts(path, root) {
            files.push(path.to_path_buf());
        }
    }

    debug!("Discovered {} files under {}", files.len(), root.display());
    Ok(files)
}

/// `path` relative to `root`, with forward slashes.
pub fn relative_slash_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

/// Directory of `path` relative to `root` with forward slashes; `.` for the root itself.
pub fn relative_dir(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    match rel.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.to_string_lossy().replace('\\', "/")
        }
        _ => ".".to_string(),
    }
}
