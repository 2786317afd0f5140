//! Drift - codebase health engine
//!
//! Measures per-function complexity, dependency freshness, import-boundary
//! violations and dead code, then folds them into one weighted health score.
//! Go is analyzed from a tree-sitter parse tree; Python, TypeScript, Rust,
//! Java, C#, Ruby and PHP are approximated from source text.

pub mod analyzers;
pub mod boundaries;
pub mod cli;
pub mod config;
pub mod dead_code;
pub mod deps;
pub mod models;
pub mod pipeline;
pub mod scoring;

pub use analyzers::{analyzer_for, detect_language, LanguageAnalyzer};
pub use config::{load_project_config, ProjectConfig};
pub use models::{AnalysisResults, Language};
pub use pipeline::{AnalysisPipeline, RerunMode};
pub use scoring::{HealthScore, Scorer};
