//! TypeScript and JavaScript: brace-delimited functions, package.json

use regex::Captures;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use super::heuristic::{hide_nothing, re, unit_weights, BlockStyle, HeuristicProfile};
use super::{read_manifest, ManifestError};
use crate::deps::{DependencySpec, Ecosystem};
use crate::models::Language;

pub(super) fn profile() -> &'static HeuristicProfile {
    static PROFILE: OnceLock<HeuristicProfile> = OnceLock::new();
    PROFILE.get_or_init(|| HeuristicProfile {
        language: Language::TypeScript,
        extensions: &["ts", "tsx", "js", "jsx"],
        excludes: &["node_modules", "dist", "build", ".next", "coverage"],
        skip_patterns: &[".test.", ".spec.", "__tests__", "__mocks__", ".d.ts"],
        signature: re(concat!(
            r"(?:^|\s)(?:export\s+)?(?:async\s+)?",
            r"(?:function\s+(\w+)",
            r"|(\w+)\s*(?::\s*\w+)?\s*=\s*(?:async\s*)?\(",
            r"|(\w+)\s*\([^)]*\)\s*(?::\s*\w+)?\s*\{)",
        )),
        function_name,
        hide_function: hide_nothing,
        block_style: BlockStyle::Braces,
        keep_bodyless: true,
        complexity: unit_weights(&[
            r"\bif\s*\(",
            r"\belse\s+if\b",
            r"\bfor\s*\(",
            r"\bwhile\s*\(",
            r"\bdo\s*\{",
            r"\bcase\s+[^:]+:",
            r"\bcatch\s*\(",
            r"&&",
            r"\|\|",
            r"\?\?",
            r"\?\.\w",
        ]),
        comment_prefix: None,
        imports: vec![
            re(r#"import\s+.*\s+from\s+['"]([^'"]+)['"]"#),
            re(r#"import\s+['"]([^'"]+)['"]"#),
            re(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#),
        ],
        export: re(r"export\s+(?:async\s+)?(?:function|const|let|var|class)\s+(\w+)"),
        calls: vec![re(r"\b\w+\(")],
        entry_points: &["main", "constructor", "default", "handler"],
        manifest,
    })
}

/// First non-empty alternative: `function name`, `name = (`, or `name(...) {`.
fn function_name(caps: &Captures<'_>) -> Option<String> {
    (1..=3)
        .filter_map(|i| caps.get(i))
        .map(|m| m.as_str())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

fn manifest(root: &Path) -> Result<Vec<DependencySpec>, ManifestError> {
    let path = root.join("package.json");
    if !path.is_file() {
        return Err(ManifestError::Absent("package.json"));
    }
    let content = read_manifest(&path)?;
    parse_package_json(&content).map_err(|e| ManifestError::parse(&path, e))
}

/// `dependencies` of a package.json, sorted by name.
pub(crate) fn parse_package_json(content: &str) -> Result<Vec<DependencySpec>, serde_json::Error> {
    let pkg: PackageJson = serde_json::from_str(content)?;
    Ok(pkg
        .dependencies
        .into_iter()
        .map(|(name, range)| DependencySpec::new(name, clean_version(&range), Ecosystem::Npm))
        .collect())
}

/// Strip range operators: `^1.2.3` -> `1.2.3`, `>=2` -> `2`.
fn clean_version(range: &str) -> String {
    range
        .trim()
        .trim_start_matches(['^', '~', '>', '<', '='])
        .trim()
        .to_string()
}
