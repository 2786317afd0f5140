//! Project language detection from root manifest files

use std::path::Path;

use crate::models::Language;

/// Marker files checked in priority order. The first hit wins.
const MARKERS: &[(&str, Language)] = &[
    ("go.mod", Language::Go),
    ("package.json", Language::TypeScript),
    ("pyproject.toml", Language::Python),
    ("requirements.txt", Language::Python),
    ("Cargo.toml", Language::Rust),
    ("pom.xml", Language::Java),
    ("build.gradle", Language::Java),
    ("build.gradle.kts", Language::Java),
    ("Gemfile", Language::Ruby),
    ("composer.json", Language::Php),
];

/// Identify the project language from files in `root`.
///
/// Falls through to a `*.csproj` probe (root, then one directory deep)
/// after the fixed markers. `None` when nothing matches.
pub fn detect_language(root: &Path) -> Option<Language> {
    for (marker, language) in MARKERS {
        if root.join(marker).is_file() {
            return Some(*language);
        }
    }

    if !find_csproj_files(root).is_empty() {
        return Some(Language::CSharp);
    }

    None
}

/// `*.csproj` files at the root, or one level below when the root has none.
pub(crate) fn find_csproj_files(root: &Path) -> Vec<std::path::PathBuf> {
    let at_root = csproj_in(root);
    if !at_root.is_empty() {
        return at_root;
    }

    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut dirs: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs.iter().flat_map(|d| csproj_in(d)).collect()
}

fn csproj_in(dir: &Path) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csproj"))
        })
        .collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_detect_each_marker() {
        let cases = [
            ("go.mod", Language::Go),
            ("package.json", Language::TypeScript),
            ("pyproject.toml", Language::Python),
            ("requirements.txt", Language::Python),
            ("Cargo.toml", Language::Rust),
            ("pom.xml", Language::Java),
            ("build.gradle.kts", Language::Java),
            ("Gemfile", Language::Ruby),
            ("composer.json", Language::Php),
        ];
        for (marker, expected) in cases {
            let dir = tempdir().expect("should create temp dir");
            std::fs::write(dir.path().join(marker), "").unwrap();
            assert_eq!(detect_language(dir.path()), Some(expected), "marker {}", marker);
        }
    }

    #[test]
    fn test_priority_order() {
        let dir = tempdir().expect("should create temp dir");
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(detect_language(dir.path()), Some(Language::TypeScript));

        std::fs::write(dir.path().join("go.mod"), "module x").unwrap();
        assert_eq!(detect_language(dir.path()), Some(Language::Go));
    }

    #[test]
    fn test_csproj_one_level_deep() {
        let dir = tempdir().expect("should create temp dir");
        std::fs::create_dir(dir.path().join("App")).unwrap();
        std::fs::write(dir.path().join("App/App.csproj"), "<Project/>").unwrap();
        assert_eq!(detect_language(dir.path()), Some(Language::CSharp));
    }

    #[test]
    fn test_nothing_detected() {
        let dir = tempdir().expect("should create temp dir");
        std::fs::write(dir.path().join("README.md"), "# hi").unwrap();
        assert_eq!(detect_language(dir.path()), None);
    }
}
