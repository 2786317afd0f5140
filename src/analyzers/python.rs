//! Python: indentation-delimited functions, requirements.txt / pyproject.toml

use regex::Captures;
use std::path::Path;
use std::sync::OnceLock;

use super::heuristic::{re, unit_weights, BlockStyle, HeuristicProfile};
use super::{read_manifest, ManifestError};
use crate::deps::{DependencySpec, Ecosystem};
use crate::models::Language;

pub(super) fn profile() -> &'static HeuristicProfile {
    static PROFILE: OnceLock<HeuristicProfile> = OnceLock::new();
    PROFILE.get_or_init(|| HeuristicProfile {
        language: Language::Python,
        extensions: &["py"],
        excludes: &["__pycache__", ".venv", "venv", "env", ".tox", ".eggs", ".mypy_cache"],
        skip_patterns: &["test_", "_test.py", "conftest.py"],
        signature: re(r"^(\s*)(?:async\s+)?def\s+(\w+)\s*\("),
        function_name,
        hide_function: is_private,
        block_style: BlockStyle::Indentation,
        keep_bodyless: true,
        complexity: unit_weights(&[
            r"^\s*if\b",
            r"^\s*elif\b",
            r"^\s*for\b",
            r"^\s*while\b",
            r"^\s*except\b",
            r"^\s*with\b",
            r"\band\b",
            r"\bor\b",
            r"\bif\b.+\belse\b",
        ]),
        comment_prefix: None,
        imports: vec![re(r"^import\s+(\S+)"), re(r"^from\s+(\S+)\s+import")],
        export: re(r"^def\s+(\w+)\s*\("),
        calls: vec![re(r"\b\w+\(")],
        entry_points: &["main", "__init__", "__main__", "setup", "teardown"],
        manifest,
    })
}

fn function_name(caps: &Captures<'_>) -> Option<String> {
    caps.get(2).map(|m| m.as_str().to_string())
}

/// `_helper` is private; dunder methods are not.
fn is_private(name: &str) -> bool {
    name.starts_with('_') && !name.starts_with("__")
}

fn manifest(root: &Path) -> Result<Vec<DependencySpec>, ManifestError> {
    let requirements = root.join("requirements.txt");
    if requirements.is_file() {
        return Ok(parse_requirements(&read_manifest(&requirements)?));
    }

    let pyproject = root.join("pyproject.toml");
    if pyproject.is_file() {
        return Ok(parse_pyproject(&read_manifest(&pyproject)?));
    }

    Err(ManifestError::Absent("requirements.txt or pyproject.toml"))
}

const REQUIREMENT_SEPARATORS: &[&str] = &["==", ">=", "<=", "~=", "!="];

/// `requirements.txt`: one requirement per line, options and comments skipped.
pub(crate) fn parse_requirements(content: &str) -> Vec<DependencySpec> {
    let mut deps = Vec::new();

    for raw in content.lines() {
        let line = raw.split('#').next().unwrap_or("").trim();
        let line = line.split(';').next().unwrap_or("").trim();
        if line.is_empty() || line.starts_with('-') {
            continue;
        }

        let mut version = "";
        for sep in REQUIREMENT_SEPARATORS {
            if let Some(idx) = line.find(sep).filter(|&i| i > 0) {
                version = line[idx + sep.len()..].split(',').next().unwrap_or("").trim();
                break;
            }
        }

        let name = requirement_name(line);
        if name.is_empty() {
            continue;
        }
        deps.push(DependencySpec::new(name, version, Ecosystem::PyPI));
    }

    deps
}

/// `pyproject.toml`: names from a PEP 621 `dependencies = [` array or the
/// `[tool.poetry.dependencies]` table. Versions are not recorded.
pub(crate) fn parse_pyproject(content: &str) -> Vec<DependencySpec> {
    let mut deps = Vec::new();
    let mut in_deps = false;

    for raw in content.lines() {
        let line = raw.trim();

        if line == "dependencies = [" || line == "[tool.poetry.dependencies]" {
            in_deps = true;
            continue;
        }
        if in_deps && (line.starts_with('[') || line == "]") {
            in_deps = false;
            continue;
        }
        if !in_deps {
            continue;
        }

        let entry = line.trim_matches(|c: char| c == '"' || c == '\'' || c == ',');
        let name = requirement_name(entry);
        if name.is_empty() || name == "python" {
            continue;
        }
        deps.push(DependencySpec::new(name, "", Ecosystem::PyPI));
    }

    deps
}

/// Leading distribution name, without extras or constraints.
fn requirement_name(entry: &str) -> &str {
    let end = entry
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .unwrap_or(entry.len());
    &entry[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complexity_of(src: &str) -> Vec<(String, u32)> {
        profile()
            .function_complexity("mod.py", src)
            .into_iter()
            .map(|f| (f.name, f.complexity))
            .collect()
    }

    #[test]
    fn test_empty_function_is_one() {
        assert_eq!(complexity_of("def f():\n    pass\n"), vec![("f".to_string(), 1)]);
    }

    #[test]
    fn test_branches_and_boolean_operators() {
        let src = "\
def classify(x, y):
    if x and y:
        return 1
    elif x or y:
        return 2
    for i in range(3):
        while i:
            i -= 1
    try:
        pass
    except ValueError:
        pass
    return 0
";
        // if, and, elif, or, for, while, except
        assert_eq!(complexity_of(src), vec![("classify".to_string(), 8)]);
    }

    #[test]
    fn test_private_functions_hidden_dunder_kept() {
        let src = "class A:\n    def __init__(self):\n        pass\n    def _hidden(self):\n        if x:\n            pass\n\ndef public():\n    pass\n";
        let names: Vec<_> = complexity_of(src).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["__init__", "public"]);
    }

    #[test]
    fn test_nested_function_lines_count_toward_outer() {
        let src = "def outer():\n    def inner():\n        if a:\n            pass\n    return inner\n";
        assert_eq!(
            complexity_of(src),
            vec![("outer".to_string(), 2), ("inner".to_string(), 2)]
        );
    }

    #[test]
    fn test_async_def_and_line_numbers() {
        let recs = profile().function_complexity("svc.py", "\n\nasync def fetch(url):\n    return url\n");
        assert_eq!(recs[0].name, "fetch");
        assert_eq!(recs[0].line, 3);
        assert_eq!(recs[0].file, "svc.py");
    }

    #[test]
    fn test_imports_are_top_level_only() {
        let src = "import os\nfrom app.db import session\ndef f():\n    import json\n";
        let imports = profile().extract_imports(src);
        let paths: Vec<_> = imports.iter().map(|i| (i.path.as_str(), i.line)).collect();
        assert_eq!(paths, vec![("os", 1), ("app.db", 2)]);
    }

    #[test]
    fn test_parse_requirements() {
        let deps = parse_requirements(
            "# pinned\nrequests==2.31.0\nflask>=2.0,<3\n-r other.txt\nrich\nhttpx[http2]~=0.27 ; python_version > '3.8'\n",
        );
        let got: Vec<_> = deps.iter().map(|d| (d.name.as_str(), d.version.as_str())).collect();
        assert_eq!(
            got,
            vec![
                ("requests", "2.31.0"),
                ("flask", "2.0"),
                ("rich", ""),
                ("httpx", "0.27"),
            ]
        );
        assert!(deps.iter().all(|d| d.ecosystem == Ecosystem::PyPI));
    }

    #[test]
    fn test_parse_pyproject_pep621_and_poetry() {
        let pep621 = "[project]\nname = \"x\"\ndependencies = [\n    \"requests>=2.0\",\n    'click',\n]\n";
        let names: Vec<_> = parse_pyproject(pep621).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["requests", "click"]);

        let poetry = "[tool.poetry.dependencies]\npython = \"^3.11\"\nfastapi = \"^0.110\"\n\n[tool.poetry.group.dev.dependencies]\npytest = \"*\"\n";
        let deps = parse_pyproject(poetry);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "fastapi");
        assert_eq!(deps[0].version, "");
    }

    #[test]
    fn test_manifest_absent() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        assert!(matches!(manifest(dir.path()), Err(ManifestError::Absent(_))));
    }
}
