//! Project-level configuration support
//!
//! Loads per-project configuration from `drift.toml`, `.drift.toml` or
//! `.drift.json` in the repository root, or from an explicit path.
//!
//! # Configuration Format
//!
//! ```toml
//! # drift.toml
//! language = "python"
//! exclude = ["vendor", "node_modules"]
//!
//! [weights]
//! complexity = 0.30
//! deps = 0.20
//!
//! [[boundaries]]
//! deny = "pkg/api -> internal/db"
//!
//! [thresholds]
//! max_complexity = 15
//! max_stale_days = 90
//! min_score = 70.0
//!
//! [registry]
//! timeout_secs = 5
//! workers = 8
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::Language;

/// Config file names probed in the repository root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["drift.toml", ".drift.toml", ".drift.json"];

/// Project-level configuration loaded from drift.toml or similar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Root of the analyzed tree
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Language override (auto-detected if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,

    /// Directory basenames excluded at any depth
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub weights: Weights,

    /// Denied import directions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boundaries: Vec<BoundaryConfig>,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub registry: RegistryConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            language: None,
            exclude: default_exclude(),
            weights: Weights::default(),
            boundaries: Vec::new(),
            thresholds: Thresholds::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Raw `from -> to` rule strings, in declaration order.
    pub fn boundary_rules(&self) -> Vec<String> {
        self.boundaries.iter().map(|b| b.deny.clone()).collect()
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_exclude() -> Vec<String> {
    [
        "vendor",
        "node_modules",
        ".git",
        "testdata",
        "__pycache__",
        ".venv",
        "target",
        "dist",
        "build",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Weights for the five sub-scores. Not required to sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    #[serde(default = "default_complexity_weight")]
    pub complexity: f64,
    #[serde(default = "default_deps_weight")]
    pub deps: f64,
    #[serde(default = "default_boundaries_weight")]
    pub boundaries: f64,
    #[serde(default = "default_dead_code_weight")]
    pub dead_code: f64,
    #[serde(default = "default_coverage_weight")]
    pub coverage: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            complexity: default_complexity_weight(),
            deps: default_deps_weight(),
            boundaries: default_boundaries_weight(),
            dead_code: default_dead_code_weight(),
            coverage: default_coverage_weight(),
        }
    }
}

fn default_complexity_weight() -> f64 {
    0.30
}
fn default_deps_weight() -> f64 {
    0.20
}
fn default_boundaries_weight() -> f64 {
    0.20
}
fn default_dead_code_weight() -> f64 {
    0.15
}
fn default_coverage_weight() -> f64 {
    0.15
}

/// One `[[boundaries]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// `"from -> to"`
    pub deny: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Complexity above which a function is penalized (0 means 15)
    #[serde(default = "default_max_complexity")]
    pub max_complexity: u32,
    /// Days behind latest at which a dependency becomes outdated (0 means 90)
    #[serde(default = "default_max_stale_days")]
    pub max_stale_days: i64,
    /// Default `--fail-under` for `drift check`
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_complexity: default_max_complexity(),
            max_stale_days: default_max_stale_days(),
            min_score: default_min_score(),
        }
    }
}

fn default_max_complexity() -> u32 {
    15
}
fn default_max_stale_days() -> i64 {
    90
}
fn default_min_score() -> f64 {
    70.0
}

/// Package registry lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Concurrent lookups
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Skip lookups entirely; every dependency is reported as unknown
    #[serde(default)]
    pub offline: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            workers: default_workers(),
            offline: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    5
}
fn default_workers() -> usize {
    8
}

/// Load project configuration for the repository at `repo_path`.
///
/// An explicit config path must exist and parse. Otherwise the repository
/// root is searched for [`CONFIG_FILE_NAMES`] in order; a discovered file
/// that fails to parse is logged and skipped. The configured `root` is
/// resolved against `repo_path`.
pub fn load_project_config(
    repo_path: &Path,
    explicit: Option<&Path>,
) -> anyhow::Result<ProjectConfig> {
    let mut config = match explicit {
        Some(path) => load_config_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => discover_config(repo_path),
    };
    config.root = repo_path.join(&config.root);
    Ok(config)
}

fn discover_config(repo_path: &Path) -> ProjectConfig {
    for name in CONFIG_FILE_NAMES {
        let path = repo_path.join(name);
        if !path.exists() {
            continue;
        }
        match load_config_file(&path) {
            Ok(config) => {
                debug!("Loaded project config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

/// Load configuration from a TOML or JSON file, chosen by extension
fn load_config_file(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let config = if is_json {
        serde_json::from_str(&content)?
    } else {
        toml::from_str(&content)?
    };
    Ok(config)
}

/// Starter `drift.toml` written by `drift init`.
pub fn default_config_toml() -> String {
    let defaults = ProjectConfig::default();
    let body = toml::to_string_pretty(&defaults).unwrap_or_default();
    format!(
        "# Drift configuration\n\
         # language = \"go\"  # override auto-detection\n\n\
         {}\n\
         # Deny imports from one directory prefix into another:\n\
         # [[boundaries]]\n\
         # deny = \"pkg/api -> internal/db\"\n",
        body.trim_end()
    )
}
