//! Java: brace-delimited methods, pom.xml or build.gradle(.kts)

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use super::heuristic::{group_one, hide_nothing, re, unit_weights, BlockStyle, HeuristicProfile};
use super::{read_manifest, ManifestError};
use crate::deps::{DependencySpec, Ecosystem};
use crate::models::Language;

pub(super) fn profile() -> &'static HeuristicProfile {
    static PROFILE: OnceLock<HeuristicProfile> = OnceLock::new();
    PROFILE.get_or_init(|| HeuristicProfile {
        language: Language::Java,
        extensions: &["java"],
        excludes: &["target", "build", ".gradle", ".idea", "bin", "out"],
        skip_patterns: &["Test.java", "Tests.java", "IT.java"],
        signature: re(r"(?:public|private|protected|static|\s)+[\w<>\[\]]+\s+(\w+)\s*\("),
        function_name: group_one,
        hide_function: hide_nothing,
        block_style: BlockStyle::Braces,
        // interface and abstract methods, and `x = new Foo(..);` lookalikes
        keep_bodyless: false,
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
            r"\?\s*[^:]+\s*:",
        ]),
        comment_prefix: None,
        imports: vec![re(r"^import\s+(?:static\s+)?(\S+);")],
        export: re(r"public\s+(?:static\s+)?(?:final\s+)?(?:[\w<>\[\]]+\s+)?(\w+)\s*\("),
        calls: vec![re(r"\b\w+\(")],
        entry_points: &["main", "toString", "equals", "hashCode"],
        manifest,
    })
}

fn manifest(root: &Path) -> Result<Vec<DependencySpec>, ManifestError> {
    let pom = root.join("pom.xml");
    if pom.is_file() {
        let content = read_manifest(&pom)?;
        return parse_pom(&content).map_err(|e| ManifestError::parse(&pom, e));
    }

    for name in ["build.gradle", "build.gradle.kts"] {
        let gradle = root.join(name);
        if gradle.is_file() {
            return Ok(parse_gradle(&read_manifest(&gradle)?));
        }
    }

    Err(ManifestError::Absent("pom.xml or build.gradle"))
}

/// Direct `<project><dependencies><dependency>` entries with a literal version.
pub(crate) fn parse_pom(content: &str) -> Result<Vec<DependencySpec>, roxmltree::Error> {
    let doc = roxmltree::Document::parse(content)?;
    let project = doc.root_element();

    let mut specs = Vec::new();
    let dependencies = project
        .children()
        .filter(|n| n.tag_name().name() == "dependencies")
        .flat_map(|n| n.children())
        .filter(|n| n.tag_name().name() == "dependency");

    for dep in dependencies {
        let group = child_text(dep, "groupId");
        let artifact = child_text(dep, "artifactId");
        let version = child_text(dep, "version");
        if group.is_empty() || artifact.is_empty() || version.is_empty() || version.starts_with("${") {
            continue;
        }
        let coordinate = format!("{}:{}", group, artifact);
        specs.push(DependencySpec::new(coordinate, version, Ecosystem::Maven));
    }

    Ok(specs)
}

/// Trimmed text of the first child element named `tag` (namespace ignored), or "".
pub(super) fn child_text<'a>(node: roxmltree::Node<'a, '_>, tag: &str) -> &'a str {
    node.children()
        .find(|n| n.tag_name().name() == tag)
        .and_then(|n| n.text())
        .map(str::trim)
        .unwrap_or("")
}

fn gradle_dependency() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        re(r#"(?:implementation|api|compile|testImplementation)\s*\(?\s*['"]([^:'"]+):([^:'"]+):([^'"]+)['"]"#)
    })
}

/// `implementation 'g:a:v'` (Groovy) and `implementation("g:a:v")` (Kotlin DSL) lines.
pub(crate) fn parse_gradle(content: &str) -> Vec<DependencySpec> {
    content
        .lines()
        .filter_map(|line| gradle_dependency().captures(line))
        .map(|caps| {
            let coordinate = format!("{}:{}", &caps[1], &caps[2]);
            DependencySpec::new(coordinate, &caps[3], Ecosystem::Maven)
        })
        .collect()
}
