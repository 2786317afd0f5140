//! Text-based analysis for languages without a bundled grammar
//!
//! A [`HeuristicProfile`] describes one language: which files it owns, how
//! to spot a function declaration, how its bodies are delimited, and which
//! per-line patterns count as decision points. [`HeuristicAnalyzer`] runs any
//! profile through the [`LanguageAnalyzer`] contract.
//!
//! Spans are purely textual, so a closure or nested function defined inside
//! another function is counted in both. The Go analyzer does not do this.

pub mod span;

pub use span::{find_span, BlockStyle, KeywordBlocks, Span, RUBY_BLOCKS};

use rayon::prelude::*;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::discovery::{walk_files, FileFilter};
use super::{read_source, AnalysisError, LanguageAnalyzer, ManifestError};
use crate::boundaries::{check_violations, BoundaryRule, ImportRef};
use crate::dead_code::{cross_reference, DeadCodePatterns};
use crate::deps::DependencySpec;
use crate::models::{file_label, BoundaryViolation, DeadFunctionRecord, FunctionRecord, Language};

/// Name given to a declaration whose pattern captured no name.
pub const ANONYMOUS: &str = "anonymous";

/// Words that signature patterns can capture from control-flow lines.
const RESERVED_NAMES: &[&str] = &[
    "if", "else", "elseif", "for", "foreach", "while", "do", "switch", "case", "catch", "try",
    "return", "new", "throw", "function", "using", "lock", "synchronized", "match", "await",
    "typeof", "sizeof", "when",
];

/// Statements whose lines are never declarations, whatever the pattern says.
const STATEMENT_KEYWORDS: &[&str] = &["return", "new", "throw", "else", "await", "yield", "echo"];

/// A decision-point pattern and what it adds per matching line.
pub struct WeightedPattern {
    pub regex: Regex,
    pub weight: u32,
}

/// Everything the heuristic analyzer needs to know about one language.
pub struct HeuristicProfile {
    pub language: Language,
    pub extensions: &'static [&'static str],
    /// Directory basenames added to the configured exclude list
    pub excludes: &'static [&'static str],
    /// Path substrings marking test files
    pub skip_patterns: &'static [&'static str],
    pub signature: Regex,
    /// Function name from a signature match
    pub function_name: fn(&Captures<'_>) -> Option<String>,
    /// Names that are detected but not reported (private helpers)
    pub hide_function: fn(&str) -> bool,
    pub block_style: BlockStyle,
    /// Report declarations with no body (`void run();`) as one-line functions
    pub keep_bodyless: bool,
    pub complexity: Vec<WeightedPattern>,
    /// Lines starting with this prefix are not scanned for complexity
    pub comment_prefix: Option<&'static str>,
    /// Capture group 1 is the imported path
    pub imports: Vec<Regex>,
    /// Capture group 1 is the exported name
    pub export: Regex,
    pub calls: Vec<Regex>,
    /// Names never reported as dead
    pub entry_points: &'static [&'static str],
    pub manifest: fn(&Path) -> Result<Vec<DependencySpec>, ManifestError>,
}

impl HeuristicProfile {
    pub fn file_filter(&self) -> FileFilter<'static> {
        FileFilter {
            extensions: self.extensions,
            skip_patterns: self.skip_patterns,
            skip_suffixes: &[],
        }
    }

    /// Detect every function declared in `lines`, in source order.
    pub fn detect_functions(&self, lines: &[&str]) -> Vec<DetectedFunction> {
        let mut found = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let first_word = line
                .trim_start()
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .next()
                .unwrap_or("");
            if STATEMENT_KEYWORDS.contains(&first_word) {
                continue;
            }

            let Some(caps) = self.signature.captures(line) else {
                continue;
            };
            let name = (self.function_name)(&caps)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| ANONYMOUS.to_string());
            if RESERVED_NAMES.contains(&name.as_str()) || (self.hide_function)(&name) {
                continue;
            }

            let span = find_span(lines, i, self.block_style);
            if !span.has_body && !self.keep_bodyless {
                continue;
            }

            found.push(DetectedFunction {
                name,
                line: i as u32 + 1,
                span,
            });
        }

        found
    }

    /// Decision points on one body line.
    pub fn line_weight(&self, line: &str) -> u32 {
        if let Some(prefix) = self.comment_prefix {
            if line.trim_start().starts_with(prefix) {
                return 0;
            }
        }
        self.complexity
            .iter()
            .filter(|p| p.regex.is_match(line))
            .map(|p| p.weight)
            .sum()
    }

    /// Complexity of every function in one source text.
    pub fn function_complexity(&self, file: &str, source: &str) -> Vec<FunctionRecord> {
        let lines: Vec<&str> = source.lines().collect();
        self.detect_functions(&lines)
            .into_iter()
            .map(|func| {
                let complexity = 1 + lines[func.span.body.clone()]
                    .iter()
                    .map(|l| self.line_weight(l))
                    .sum::<u32>();
                FunctionRecord {
                    file: file.to_string(),
                    name: func.name,
                    line: func.line,
                    complexity,
                }
            })
            .collect()
    }

    /// Import paths with their 1-based line numbers.
    pub fn extract_imports(&self, source: &str) -> Vec<ImportRef> {
        let mut imports = Vec::new();
        for (i, line) in source.lines().enumerate() {
            for pattern in &self.imports {
                if let Some(path) = pattern.captures(line).and_then(|c| c.get(1)) {
                    imports.push(ImportRef {
                        path: path.as_str().to_string(),
                        line: i as u32 + 1,
                    });
                }
            }
        }
        imports
    }

    fn dead_code_patterns(&self) -> DeadCodePatterns<'_> {
        DeadCodePatterns {
            export: &self.export,
            calls: &self.calls,
            entry_points: self.entry_points,
        }
    }
}

/// A declaration found by [`HeuristicProfile::detect_functions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFunction {
    pub name: String,
    pub line: u32,
    pub span: Span,
}

/// [`LanguageAnalyzer`] over a static [`HeuristicProfile`].
pub struct HeuristicAnalyzer {
    profile: &'static HeuristicProfile,
}

impl HeuristicAnalyzer {
    pub fn new(profile: &'static HeuristicProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &'static HeuristicProfile {
        self.profile
    }
}

impl LanguageAnalyzer for HeuristicAnalyzer {
    fn language(&self) -> Language {
        self.profile.language
    }

    fn extensions(&self) -> &'static [&'static str] {
        self.profile.extensions
    }

    fn accepts_file(&self, path: &Path, root: &Path) -> bool {
        self.profile.file_filter().accepts(path, root)
    }

    fn find_files(&self, root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>, AnalysisError> {
        let mut excluded = exclude.to_vec();
        excluded.extend(self.profile.excludes.iter().map(|s| s.to_string()));
        walk_files(root, &excluded, self.profile.file_filter())
    }

    fn analyze_complexity(&self, files: &[PathBuf]) -> (Vec<FunctionRecord>, usize) {
        let per_file: Vec<Vec<FunctionRecord>> = files
            .par_iter()
            .map(|path| match read_source(path) {
                Some(source) => self.profile.function_complexity(&file_label(path), &source),
                None => Vec::new(),
            })
            .collect();

        let functions: Vec<FunctionRecord> = per_file.into_iter().flatten().collect();
        debug!(
            "{} complexity: {} functions in {} files",
            self.profile.language,
            functions.len(),
            files.len()
        );
        let total = functions.len();
        (functions, total)
    }

    fn manifest_dependencies(&self, root: &Path) -> Result<Vec<DependencySpec>, ManifestError> {
        (self.profile.manifest)(root)
    }

    fn analyze_imports(
        &self,
        files: &[PathBuf],
        rules: &[BoundaryRule],
        root: &Path,
    ) -> Vec<BoundaryViolation> {
        if rules.is_empty() {
            return Vec::new();
        }
        files
            .iter()
            .filter_map(|path| read_source(path).map(|source| (path, source)))
            .flat_map(|(path, source)| {
                let imports = self.profile.extract_imports(&source);
                check_violations(path, &imports, rules, root)
            })
            .collect()
    }

    fn analyze_dead_code(&self, files: &[PathBuf]) -> Vec<DeadFunctionRecord> {
        cross_reference(files, &self.profile.dead_code_patterns())
    }
}

/// Compile a pattern that is a literal in this crate.
pub(crate) fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// Weight-1 decision patterns.
pub(crate) fn unit_weights(patterns: &[&str]) -> Vec<WeightedPattern> {
    patterns
        .iter()
        .map(|p| WeightedPattern {
            regex: re(p),
            weight: 1,
        })
        .collect()
}

/// Capture group 1, the common case.
pub(crate) fn group_one(caps: &Captures<'_>) -> Option<String> {
    caps.get(1).map(|m| m.as_str().to_string())
}

pub(crate) fn hide_nothing(_name: &str) -> bool {
    false
}
