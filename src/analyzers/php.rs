//! PHP: brace-delimited `function` declarations, composer.json `require`

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use super::heuristic::{group_one, hide_nothing, re, unit_weights, BlockStyle, HeuristicProfile};
use super::{read_manifest, ManifestError};
use crate::deps::{DependencySpec, Ecosystem};
use crate::models::Language;

pub(super) fn profile() -> &'static HeuristicProfile {
    static PROFILE: OnceLock<HeuristicProfile> = OnceLock::new();
    PROFILE.get_or_init(|| HeuristicProfile {
        language: Language::Php,
        extensions: &["php"],
        excludes: &["vendor", "cache", ".phpunit.cache", "storage"],
        skip_patterns: &["Test.php", "Tests.php", "test/", "tests/"],
        signature: re(r"(?:public|private|protected|static|\s)*function\s+(\w+)\s*\("),
        function_name: group_one,
        hide_function: hide_nothing,
        block_style: BlockStyle::Braces,
        // abstract and interface methods
        keep_bodyless: false,
        complexity: unit_weights(&[
            r"\bif\s*\(",
            r"\belse\s*if\b",
            r"\belseif\s*\(",
            r"\bfor\s*\(",
            r"\bforeach\s*\(",
            r"\bwhile\s*\(",
            r"\bdo\s*\{",
            r"\bcase\s+[^:]+:",
            r"\bcatch\s*\(",
            r"&&",
            r"\|\|",
            r"\?\s*[^:]+\s*:",
        ]),
        comment_prefix: None,
        imports: vec![
            re(r"^use\s+(\S+);"),
            re(r#"require_once\s+['"]([^'"]+)['"]"#),
            re(r#"include\s+['"]([^'"]+)['"]"#),
        ],
        export: re(r"public\s+(?:static\s+)?function\s+(\w+)"),
        calls: vec![re(r"\b\w+\("), re(r"->\w+\("), re(r"::\w+\(")],
        entry_points: &["__construct", "__invoke", "__toString", "handle"],
        manifest,
    })
}

#[derive(Deserialize)]
struct ComposerJson {
    #[serde(default)]
    require: BTreeMap<String, String>,
}

fn manifest(root: &Path) -> Result<Vec<DependencySpec>, ManifestError> {
    let path = root.join("composer.json");
    if !path.is_file() {
        return Err(ManifestError::Absent("composer.json"));
    }
    let content = read_manifest(&path)?;
    parse_composer_json(&content).map_err(|e| ManifestError::parse(&path, e))
}

/// Packages under `require`, minus the platform entries (`php`, `ext-*`).
pub(crate) fn parse_composer_json(content: &str) -> Result<Vec<DependencySpec>, serde_json::Error> {
    let composer: ComposerJson = serde_json::from_str(content)?;
    Ok(composer
        .require
        .into_iter()
        .filter(|(name, _)| name != "php" && !name.starts_with("ext-"))
        .map(|(name, constraint)| {
            let version = constraint.trim_start_matches(['^', '~', '>', '=', '<', '!', ' ']);
            DependencySpec::new(name.as_str(), version, Ecosystem::Packagist)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complexity_of(src: &str) -> Vec<(String, u32)> {
        profile()
            .function_complexity("Cart.php", src)
            .into_iter()
            .map(|f| (f.name, f.complexity))
            .collect()
    }

    #[test]
    fn test_method_complexity() {
        let src = "\
<?php
namespace App;

abstract class Cart
{
    public function total(array $items): float
    {
        $sum = 0;
        foreach ($items as $item) {
            if ($item->qty > 0 && $item->price > 0) {
                $sum += $item->price;
            } elseif ($item->free) {
                continue;
            }
        }
        return $sum > 100 ? $sum * 0.9 : $sum;
    }

    abstract protected function hook();
}
";
        // foreach, if, &&, elseif (both else-if patterns), ternary
        assert_eq!(complexity_of(src), vec![("total".to_string(), 7)]);
    }

    #[test]
    fn test_closures_are_not_named_functions() {
        let src = "function apply($xs) {\n    return array_map(function ($x) { return $x * 2; }, $xs);\n}\n";
        assert_eq!(complexity_of(src), vec![("apply".to_string(), 1)]);
    }

    #[test]
    fn test_extract_imports() {
        let src = "<?php\nuse App\\Models\\User;\nrequire_once 'lib/db.php';\ninclude \"views/header.php\";\n";
        let paths: Vec<_> = profile().extract_imports(src).into_iter().map(|i| i.path).collect();
        assert_eq!(paths, vec!["App\\Models\\User", "lib/db.php", "views/header.php"]);
    }

    #[test]
    fn test_parse_composer_json_skips_platform_packages() {
        let deps = parse_composer_json(
            r#"{"require": {"php": ">=8.1", "ext-json": "*", "laravel/framework": "^10.0", "guzzlehttp/guzzle": "~7.5"}}"#,
        )
        .expect("should parse");
        let got: Vec<_> = deps.iter().map(|d| (d.name.as_str(), d.version.as_str())).collect();
        assert_eq!(got, vec![("guzzlehttp/guzzle", "7.5"), ("laravel/framework", "10.0")]);
        assert!(deps.iter().all(|d| d.ecosystem == Ecosystem::Packagist));
    }
}
