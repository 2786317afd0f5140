//! C#: brace-delimited methods, `PackageReference` items of *.csproj

use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

use super::detect::find_csproj_files;
use super::heuristic::{group_one, hide_nothing, re, unit_weights, BlockStyle, HeuristicProfile};
use super::java::child_text;
use super::{read_manifest, ManifestError};
use crate::deps::{DependencySpec, Ecosystem};
use crate::models::Language;

pub(super) fn profile() -> &'static HeuristicProfile {
    static PROFILE: OnceLock<HeuristicProfile> = OnceLock::new();
    PROFILE.get_or_init(|| HeuristicProfile {
        language: Language::CSharp,
        extensions: &["cs"],
        excludes: &["bin", "obj", ".vs", "packages", "TestResults"],
        skip_patterns: &["Tests.cs", "Test.cs", ".Tests/", ".Test/"],
        signature: re(concat!(
            r"(?:public|private|protected|internal|static|async|virtual|override|abstract|\s)+",
            r"[\w<>\[\]?]+\s+(\w+)\s*\(",
        )),
        function_name: group_one,
        hide_function: hide_nothing,
        block_style: BlockStyle::Braces,
        keep_bodyless: false,
        complexity: unit_weights(&[
            r"\bif\s*\(",
            r"\belse\s+if\b",
            r"\bfor\s*\(",
            r"\bforeach\s*\(",
            r"\bwhile\s*\(",
            r"\bdo\s*\{",
            r"\bswitch\s*\(",
            r"\bcase\s+[^:]+:",
            r"\bcatch\s*\(",
            r"&&",
            r"\|\|",
            r"\?\?",
            r"\?\s*[^:]+\s*:",
        ]),
        comment_prefix: None,
        imports: vec![re(r"^using\s+(\S+);"), re(r"^using\s+static\s+(\S+);")],
        export: re(concat!(
            r"public\s+(?:static\s+)?(?:async\s+)?(?:virtual\s+)?(?:override\s+)?",
            r"(?:[\w<>\[\]?]+\s+)?(\w+)\s*\(",
        )),
        calls: vec![re(r"\b\w+\("), re(r"\.\w+\(")],
        entry_points: &["Main"],
        manifest,
    })
}

/// Package references of every project file at the root, or one level down.
/// A project file that cannot be read or parsed is skipped.
fn manifest(root: &Path) -> Result<Vec<DependencySpec>, ManifestError> {
    let projects = find_csproj_files(root);
    if projects.is_empty() {
        return Err(ManifestError::Absent("*.csproj"));
    }

    let mut specs = Vec::new();
    for path in &projects {
        let content = match read_manifest(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping unreadable {}: {}", path.display(), e);
                continue;
            }
        };
        match parse_csproj(&content) {
            Ok(found) => specs.extend(found),
            Err(e) => warn!("Skipping malformed {}: {}", path.display(), e),
        }
    }
    Ok(specs)
}

/// `<PackageReference Include=".." Version=".."/>`, with the version given
/// as an attribute or a child element. References without a version are skipped.
pub(crate) fn parse_csproj(content: &str) -> Result<Vec<DependencySpec>, roxmltree::Error> {
    let doc = roxmltree::Document::parse(content)?;

    Ok(doc
        .descendants()
        .filter(|n| n.tag_name().name() == "PackageReference")
        .filter_map(|n| {
            let name = n.attribute("Include")?.trim();
            let version = n
                .attribute("Version")
                .map(str::trim)
                .unwrap_or_else(|| child_text(n, "Version"));
            if name.is_empty() || version.is_empty() {
                return None;
            }
            Some(DependencySpec::new(name, version, Ecosystem::NuGet))
        })
        .collect())
}
