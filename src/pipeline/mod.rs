//! Analysis orchestration
//!
//! One run walks the tree once and then runs, in order:
//! 1. Complexity of every function
//! 2. Dependency freshness from the manifest
//! 3. Import boundary checks
//! 4. Dead-code cross-referencing
//!
//! Full runs and the single-file incremental path share one lock, so a
//! watcher can trigger either without them overlapping.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::analyzers::{analyzer_for, detect_language, AnalysisError, LanguageAnalyzer, ManifestError};
use crate::boundaries::{parse_rules, BoundaryRule};
use crate::config::ProjectConfig;
use crate::deps::{DependencyResolver, HttpRegistry, OfflineRegistry, Registry};
use crate::models::{AnalysisResults, Language};

/// How to react to a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RerunMode {
    /// Re-analyze the whole tree
    #[default]
    Full,
    /// Recompute complexity of the changed file only
    Incremental,
}

/// The analysis engine for one project root.
pub struct AnalysisPipeline {
    config: ProjectConfig,
    analyzer: Box<dyn LanguageAnalyzer>,
    resolver: DependencyResolver,
    rules: Vec<BoundaryRule>,
    lock: Mutex<()>,
}

impl AnalysisPipeline {
    /// Pipeline with the registry chosen by `registry.offline`.
    pub fn new(config: ProjectConfig) -> Self {
        let registry: Arc<dyn Registry> = if config.registry.offline {
            Arc::new(OfflineRegistry)
        } else {
            Arc::new(HttpRegistry::new(Duration::from_secs(config.registry.timeout_secs)))
        };
        Self::with_registry(config, registry)
    }

    /// Pipeline with an explicit registry.
    pub fn with_registry(config: ProjectConfig, registry: Arc<dyn Registry>) -> Self {
        let language = resolve_language(&config);
        let rules = parse_rules(&config.boundary_rules());
        let resolver = DependencyResolver::new(
            registry,
            config.thresholds.max_stale_days,
            config.registry.workers,
        );

        info!(
            "Analyzing {} as {} ({} boundary rules)",
            config.root.display(),
            language,
            rules.len()
        );

        Self {
            analyzer: analyzer_for(language),
            config,
            resolver,
            rules,
            lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn language(&self) -> Language {
        self.analyzer.language()
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Whether a changed path should trigger a re-run.
    pub fn is_relevant(&self, path: &Path) -> bool {
        self.analyzer.accepts_file(path, &self.config.root)
    }

    /// Full analysis of the configured root.
    pub fn run(&self) -> Result<AnalysisResults, AnalysisError> {
        let _guard = self.acquire();
        self.run_unlocked()
    }

    /// Complexity of one file only. Files the analyzer does not own give an
    /// empty result.
    pub fn run_single(&self, path: &Path) -> AnalysisResults {
        let _guard = self.acquire();
        self.run_single_unlocked(path)
    }

    /// Re-run after `path` changed. The caller has already filtered the event.
    pub fn rerun(&self, path: &Path, mode: RerunMode) -> Result<AnalysisResults, AnalysisError> {
        debug!("Re-running ({:?}) after change to {}", mode, path.display());
        let _guard = self.acquire();
        match mode {
            RerunMode::Full => self.run_unlocked(),
            RerunMode::Incremental => Ok(self.run_single_unlocked(path)),
        }
    }

    fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_unlocked(&self) -> Result<AnalysisResults, AnalysisError> {
        let started = Instant::now();
        let root = &self.config.root;
        let analyzer = &self.analyzer;

        let files = analyzer.find_files(root, &self.config.exclude)?;
        debug!("Found {} {} files", files.len(), analyzer.language());

        let (complexity, function_count) = analyzer.analyze_complexity(&files);

        let dependencies = match analyzer.analyze_deps(root, &self.resolver) {
            Ok(deps) => deps,
            Err(ManifestError::Absent(what)) => {
                debug!("No dependency manifest: {}", what);
                Vec::new()
            }
            Err(e) => {
                warn!("Dependency analysis skipped: {}", e);
                Vec::new()
            }
        };

        let violations = analyzer.analyze_imports(&files, &self.rules, root);
        let dead_code = analyzer.analyze_dead_code(&files);

        let mut results = AnalysisResults {
            language: analyzer.language(),
            file_count: files.len(),
            function_count,
            complexity,
            dependencies,
            violations,
            dead_code,
        };
        results.sort_by_complexity();

        info!(
            "Analyzed {} files, {} functions in {:?}",
            results.file_count,
            results.function_count,
            started.elapsed()
        );
        Ok(results)
    }

    fn run_single_unlocked(&self, path: &Path) -> AnalysisResults {
        let mut results = AnalysisResults::empty(self.analyzer.language());
        if !self.analyzer.accepts_file(path, &self.config.root) {
            debug!("Ignoring {}: not a {} source file", path.display(), self.analyzer.language());
            return results;
        }

        let (complexity, function_count) = self.analyzer.analyze_complexity(&[path.to_path_buf()]);
        results.file_count = 1;
        results.function_count = function_count;
        results.complexity = complexity;
        results.sort_by_complexity();
        results
    }
}

/// Configured language, else detected from manifests, else the default.
fn resolve_language(config: &ProjectConfig) -> Language {
    if let Some(language) = config.language {
        return language;
    }
    match detect_language(&config.root) {
        Some(language) => language,
        None => {
            debug!("No manifest found under {}, assuming {}", config.root.display(), Language::default());
            Language::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoundaryConfig;
    use crate::deps::testing::FakeRegistry;
    use crate::deps::Release;
    use crate::models::DepStatus;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("has parent")).expect("should create dirs");
        fs::write(path, content).expect("should write file");
    }

    fn go_project(root: &Path) {
        write(
            root,
            "go.mod",
            "module example.com/app\n\ngo 1.22\n\nrequire github.com/google/uuid v1.6.0\n",
        );
        write(
            root,
            "internal/db/db.go",
            "package db\n\nfunc Find(id int) int {\n\tfor i := 0; i < id; i++ {\n\t\tif i == 42 {\n\t\t\treturn i\n\t\t}\n\t}\n\treturn 0\n}\n",
        );
        write(
            root,
            "main.go",
            "package main\n\nimport \"example.com/app/pkg/api\"\n\nfunc main() {\n\tapi.Handle(1)\n}\n",
        );
        write(
            root,
            "pkg/api/handler.go",
            "package api\n\nimport (\n\t\"fmt\"\n\n\t\"example.com/app/internal/db\"\n)\n\nfunc Handle(id int) string {\n\tif id > 0 && id < 100 {\n\t\treturn fmt.Sprint(db.Find(id))\n\t}\n\treturn \"\"\n}\n\nfunc Unused() {}\n",
        );
        write(root, "pkg/api/handler_test.go", "package api\n\nfunc TestHandle() {}\n");
    }

    fn config_for(root: &Path) -> ProjectConfig {
        ProjectConfig {
            root: root.to_path_buf(),
            boundaries: vec![BoundaryConfig {
                deny: "pkg/api -> internal/db".to_string(),
            }],
            ..ProjectConfig::default()
        }
    }

    fn pipeline_for(root: &Path) -> AnalysisPipeline {
        let registry = FakeRegistry::default().with("github.com/google/uuid", Release::undated("v1.6.0"));
        AnalysisPipeline::with_registry(config_for(root), Arc::new(registry))
    }

    #[test]
    fn test_full_run_on_go_project() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        go_project(dir.path());

        let results = pipeline_for(dir.path()).run().expect("should analyze");
        assert_eq!(results.language, Language::Go);
        assert_eq!(results.file_count, 3);
        assert_eq!(results.function_count, 4);

        let ranked: Vec<_> = results
            .complexity
            .iter()
            .map(|f| (f.name.as_str(), f.complexity))
            .collect();
        assert_eq!(
            ranked,
            vec![("Find", 3), ("Handle", 3), ("main", 1), ("Unused", 1)]
        );

        assert_eq!(results.dependencies.len(), 1);
        assert_eq!(results.dependencies[0].module, "uuid");
        assert_eq!(results.dependencies[0].status, DepStatus::Current);

        assert_eq!(results.violations.len(), 1);
        assert_eq!(results.violations[0].file, "handler.go");
        assert_eq!(results.violations[0].line, 6);
        assert_eq!(results.violations[0].import, "example.com/app/internal/db");

        let dead: Vec<_> = results.dead_code.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(dead, vec!["Unused"]);
    }

    #[test]
    fn test_reruns_are_deterministic() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        go_project(dir.path());

        let pipeline = pipeline_for(dir.path());
        let first = pipeline.run().expect("should analyze");
        let second = pipeline
            .rerun(&dir.path().join("main.go"), RerunMode::Full)
            .expect("should analyze");
        assert_eq!(first, second);
    }

    #[test]
    fn test_incremental_rerun_only_recomputes_complexity() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        go_project(dir.path());
        let pipeline = pipeline_for(dir.path());

        let changed = dir.path().join("pkg/api/handler.go");
        let partial = pipeline
            .rerun(&changed, RerunMode::Incremental)
            .expect("incremental never fails");
        assert_eq!(partial.file_count, 1);
        assert_eq!(partial.function_count, 2);
        assert!(partial.dependencies.is_empty());
        assert!(partial.violations.is_empty());
        assert!(partial.dead_code.is_empty());

        let foreign = pipeline.run_single(&dir.path().join("go.mod"));
        assert_eq!(foreign, AnalysisResults::empty(Language::Go));
        let test_file = pipeline.run_single(&dir.path().join("pkg/api/handler_test.go"));
        assert!(test_file.complexity.is_empty());
    }

    #[test]
    fn test_missing_manifest_leaves_other_steps_running() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        go_project(dir.path());
        fs::remove_file(dir.path().join("go.mod")).expect("should remove go.mod");

        let mut config = config_for(dir.path());
        config.language = Some(Language::Go);
        let pipeline = AnalysisPipeline::with_registry(config, Arc::new(FakeRegistry::default()));
        let results = pipeline.run().expect("should analyze");
        assert!(results.dependencies.is_empty());
        assert_eq!(results.function_count, 4);
    }

    #[test]
    fn test_unreachable_registry_marks_dependencies_unknown() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        go_project(dir.path());

        let mut config = config_for(dir.path());
        config.registry.offline = true;
        let results = AnalysisPipeline::new(config).run().expect("should analyze");
        assert_eq!(results.dependencies[0].status, DepStatus::Unknown);
        assert_eq!(results.dependencies[0].latest_version, "?");
    }

    #[test]
    fn test_language_detection_and_override() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        write(dir.path(), "requirements.txt", "requests==2.31.0\n");
        write(dir.path(), "app/service.py", "def handle(x):\n    if x:\n        return 1\n    return 0\n");

        let mut config = config_for(dir.path());
        config.registry.offline = true;
        let detected = AnalysisPipeline::new(config.clone());
        assert_eq!(detected.language(), Language::Python);
        let results = detected.run().expect("should analyze");
        assert_eq!(results.complexity[0].name, "handle");
        assert_eq!(results.complexity[0].complexity, 2);

        config.language = Some(Language::Ruby);
        assert_eq!(AnalysisPipeline::new(config).language(), Language::Ruby);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let config = ProjectConfig {
            root: dir.path().join("nope"),
            language: Some(Language::Go),
            ..ProjectConfig::default()
        };
        let pipeline = AnalysisPipeline::with_registry(config, Arc::new(FakeRegistry::default()));
        assert!(matches!(pipeline.run(), Err(AnalysisError::RootNotFound(_))));
    }
}
