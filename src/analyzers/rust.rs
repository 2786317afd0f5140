//! Rust: brace-delimited `fn` items, Cargo.toml `[dependencies]`

use std::path::Path;
use std::sync::OnceLock;

use super::heuristic::{group_one, hide_nothing, re, unit_weights, BlockStyle, HeuristicProfile};
use super::{read_manifest, ManifestError};
use crate::deps::{DependencySpec, Ecosystem};
use crate::models::Language;

pub(super) fn profile() -> &'static HeuristicProfile {
    static PROFILE: OnceLock<HeuristicProfile> = OnceLock::new();
    PROFILE.get_or_init(|| HeuristicProfile {
        language: Language::Rust,
        extensions: &["rs"],
        excludes: &["target"],
        skip_patterns: &[],
        signature: re(r"(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+(\w+)"),
        function_name: group_one,
        hide_function: hide_nothing,
        block_style: BlockStyle::Braces,
        // trait method declarations without a default body
        keep_bodyless: false,
        complexity: unit_weights(&[
            r"\bif\b",
            r"\belse\s+if\b",
            r"\bfor\b",
            r"\bwhile\b",
            r"\bloop\b",
            r"\bmatch\b",
            r"=>\s*\{",
            r"&&",
            r"\|\|",
            r"\?;",
        ]),
        comment_prefix: None,
        imports: vec![
            re(r"^use\s+(\S+);"),
            re(r"^pub\s+use\s+(\S+);"),
            re(r"^extern\s+crate\s+(\w+);"),
        ],
        export: re(r"^pub\s+(?:async\s+)?fn\s+(\w+)"),
        calls: vec![re(r"\b\w+\(")],
        entry_points: &["main", "new", "default"],
        manifest,
    })
}

fn manifest(root: &Path) -> Result<Vec<DependencySpec>, ManifestError> {
    let path = root.join("Cargo.toml");
    if !path.is_file() {
        return Err(ManifestError::Absent("Cargo.toml"));
    }
    let content = read_manifest(&path)?;
    parse_cargo_toml(&content).map_err(|e| ManifestError::parse(&path, e))
}

/// `[dependencies]` entries with a version, as plain strings or `{ version = .. }` tables.
/// Path and git dependencies without a version are skipped.
pub(crate) fn parse_cargo_toml(content: &str) -> Result<Vec<DependencySpec>, toml::de::Error> {
    let manifest: toml::Table = content.parse()?;
    let Some(deps) = manifest.get("dependencies").and_then(|d| d.as_table()) else {
        return Ok(Vec::new());
    };

    let mut specs: Vec<DependencySpec> = deps
        .iter()
        .filter_map(|(name, value)| {
            let version = match value {
                toml::Value::String(v) => v.as_str(),
                toml::Value::Table(t) => t.get("version")?.as_str()?,
                _ => return None,
            };
            let version = version.trim_start_matches(['^', '~', '=', '>', '<']).trim();
            let package = match value {
                toml::Value::Table(t) => t
                    .get("package")
                    .and_then(|p| p.as_str())
                    .unwrap_or(name.as_str()),
                _ => name.as_str(),
            };
            Some(DependencySpec::new(name.as_str(), version, Ecosystem::CratesIo).with_package(package))
        })
        .collect();
    specs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(specs)
}
