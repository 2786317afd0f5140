//! Core data models for Drift
//!
//! These records flow from the language analyzers through the pipeline into
//! the scorer and out as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages the engine knows how to analyze.
///
/// Go is the default when nothing in the project root identifies a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Go,
    TypeScript,
    Python,
    Rust,
    Java,
    Ruby,
    Php,
    CSharp,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::Go,
        Language::TypeScript,
        Language::Python,
        Language::Rust,
        Language::Java,
        Language::Ruby,
        Language::Php,
        Language::CSharp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::CSharp => "csharp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "go" | "golang" => Ok(Language::Go),
            "typescript" | "ts" | "javascript" | "js" => Ok(Language::TypeScript),
            "python" | "py" => Ok(Language::Python),
            "rust" | "rs" => Ok(Language::Rust),
            "java" => Ok(Language::Java),
            "ruby" | "rb" => Ok(Language::Ruby),
            "php" => Ok(Language::Php),
            "csharp" | "c#" | "cs" => Ok(Language::CSharp),
            other => Err(format!("unknown language '{}'", other)),
        }
    }
}

/// Complexity of a single function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// File basename
    pub file: String,
    /// Qualified name (`Receiver.Method`, `self.name`, or `anonymous`)
    pub name: String,
    pub line: u32,
    /// Always >= 1
    pub complexity: u32,
}

/// Freshness classification of a declared dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepStatus {
    Current,
    Stale,
    Outdated,
    Unknown,
}

impl DepStatus {
    /// Whether the status carries a staleness penalty when scoring.
    pub fn is_behind(&self) -> bool {
        matches!(self, DepStatus::Stale | DepStatus::Outdated)
    }
}

impl fmt::Display for DepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepStatus::Current => write!(f, "current"),
            DepStatus::Stale => write!(f, "stale"),
            DepStatus::Outdated => write!(f, "outdated"),
            DepStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub module: String,
    pub current_version: String,
    pub latest_version: String,
    pub stale_days: i64,
    pub status: DepStatus,
}

/// An import that crosses a denied boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryViolation {
    pub file: String,
    pub line: u32,
    pub from: String,
    pub to: String,
    pub import: String,
}

/// A public function with no detected reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeadFunctionRecord {
    pub file: String,
    pub name: String,
    pub line: u32,
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub language: Language,
    pub file_count: usize,
    pub function_count: usize,
    /// Sorted by complexity, highest first
    pub complexity: Vec<FunctionRecord>,
    pub dependencies: Vec<DependencyRecord>,
    pub violations: Vec<BoundaryViolation>,
    pub dead_code: Vec<DeadFunctionRecord>,
}

impl AnalysisResults {
    pub fn empty(language: Language) -> Self {
        Self {
            language,
            ..Default::default()
        }
    }

    /// Stable descending sort, ties keep discovery order.
    pub fn sort_by_complexity(&mut self) {
        self.complexity.sort_by(|a, b| b.complexity.cmp(&a.complexity));
    }

    /// Fold a single-file partial result (complexity only) into a full one.
    ///
    /// Records labelled `file` are replaced by the partial records; every
    /// other aggregate is kept. Records are keyed by basename, so files that
    /// share a name in different directories are replaced together.
    pub fn merge_file(&mut self, file: &str, partial: AnalysisResults) {
        let before = self.complexity.len();
        self.complexity.retain(|f| f.file != file);
        let removed = before - self.complexity.len();

        self.function_count = self.function_count.saturating_sub(removed) + partial.function_count;
        self.complexity.extend(partial.complexity);
        self.sort_by_complexity();
    }
}

/// Basename of a path as a display string.
pub fn file_label(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
