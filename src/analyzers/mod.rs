//! Language analyzers
//!
//! One [`LanguageAnalyzer`] per [`Language`], selected by [`analyzer_for`].
//! Go is analyzed from a tree-sitter parse tree ([`go`]); every other
//! language runs through the text heuristics in [`heuristic`].
//!
//! Every operation is total over its inputs: files that cannot be read or
//! parsed are skipped, never fatal. Only file discovery can fail a run.

pub mod detect;
pub mod discovery;
pub mod go;
pub mod heuristic;

mod csharp;
mod java;
mod php;
mod python;
mod ruby;
mod rust;
mod typescript;

pub use detect::detect_language;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::boundaries::BoundaryRule;
use crate::deps::{DependencyResolver, DependencySpec};
use crate::models::{BoundaryViolation, DeadFunctionRecord, DependencyRecord, FunctionRecord, Language};

/// File discovery failures. These abort the run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("analysis root {} is not a readable directory", .0.display())]
    RootNotFound(PathBuf),
}

/// Manifest problems. These only empty the dependency list.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("no {0} found")]
    Absent(&'static str),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl ManifestError {
    pub fn parse(path: &Path, message: impl ToString) -> Self {
        ManifestError::Parse {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Read a manifest, mapping I/O failures.
pub(crate) fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Per-language analysis strategy.
pub trait LanguageAnalyzer: Send + Sync {
    fn language(&self) -> Language;

    /// Extensions owned by this language, without the dot
    fn extensions(&self) -> &'static [&'static str];

    /// Whether a single changed file belongs to this language and is not a skipped test file
    fn accepts_file(&self, path: &Path, root: &Path) -> bool;

    fn find_files(&self, root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>, AnalysisError>;

    /// Function records in discovery order, plus the number of functions found
    fn analyze_complexity(&self, files: &[PathBuf]) -> (Vec<FunctionRecord>, usize);

    /// Declared dependencies from the project manifest
    fn manifest_dependencies(&self, root: &Path) -> Result<Vec<DependencySpec>, ManifestError>;

    /// Declared dependencies classified against their registry
    fn analyze_deps(
        &self,
        root: &Path,
        resolver: &DependencyResolver,
    ) -> Result<Vec<DependencyRecord>, ManifestError> {
        let specs = self.manifest_dependencies(root)?;
        debug!("{}: {} declared dependencies", self.language(), specs.len());
        Ok(resolver.resolve(&specs))
    }

    fn analyze_imports(
        &self,
        files: &[PathBuf],
        rules: &[BoundaryRule],
        root: &Path,
    ) -> Vec<BoundaryViolation>;

    fn analyze_dead_code(&self, files: &[PathBuf]) -> Vec<DeadFunctionRecord>;
}

/// Analyzer for `language`.
pub fn analyzer_for(language: Language) -> Box<dyn LanguageAnalyzer> {
    match language {
        Language::Go => Box::new(go::GoAnalyzer),
        Language::TypeScript => Box::new(heuristic::HeuristicAnalyzer::new(typescript::profile())),
        Language::Python => Box::new(heuristic::HeuristicAnalyzer::new(python::profile())),
        Language::Rust => Box::new(heuristic::HeuristicAnalyzer::new(rust::profile())),
        Language::Java => Box::new(heuristic::HeuristicAnalyzer::new(java::profile())),
        Language::Ruby => Box::new(heuristic::HeuristicAnalyzer::new(ruby::profile())),
        Language::Php => Box::new(heuristic::HeuristicAnalyzer::new(php::profile())),
        Language::CSharp => Box::new(heuristic::HeuristicAnalyzer::new(csharp::profile())),
    }
}

/// Source text of `path`, or `None` (logged) when it cannot be read.
/// Invalid UTF-8 is replaced rather than rejected.
pub(crate) fn read_source(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }),
        Err(e) => {
            debug!("Skipping unreadable file {}: {}", path.display(), e);
            None
        }
    }
}
