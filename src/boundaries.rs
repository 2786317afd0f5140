//! Import boundary rules
//!
//! A rule `from -> to` denies files whose directory starts with `from` from
//! importing anything whose path contains `to`. Matching is raw text: the
//! prefix test is not segment aware, so `pkg/api` also covers `pkg/apiv2`.

use std::path::Path;

use crate::analyzers::discovery::relative_dir;
use crate::models::{file_label, BoundaryViolation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryRule {
    pub from: String,
    pub to: String,
}

impl BoundaryRule {
    /// Parse `"from -> to"`. Anything that is not exactly two non-empty
    /// halves around one `->` yields `None`.
    pub fn parse(rule: &str) -> Option<Self> {
        let parts: Vec<&str> = rule.split("->").map(str::trim).collect();
        match parts.as_slice() {
            [from, to] if !from.is_empty() && !to.is_empty() => Some(Self {
                from: from.replace('\\', "/"),
                to: to.to_string(),
            }),
            _ => None,
        }
    }

    /// Whether a root-relative directory falls under `from`.
    pub fn matches_path(&self, dir: &str) -> bool {
        let dir = dir.replace('\\', "/");
        dir == self.from || dir.starts_with(&self.from)
    }

    pub fn matches_import(&self, import: &str) -> bool {
        import.contains(&self.to)
    }
}

/// Parse every rule string, silently dropping malformed ones.
pub fn parse_rules<S: AsRef<str>>(rules: &[S]) -> Vec<BoundaryRule> {
    rules
        .iter()
        .filter_map(|r| {
            let parsed = BoundaryRule::parse(r.as_ref());
            if parsed.is_none() {
                tracing::debug!("Ignoring malformed boundary rule '{}'", r.as_ref());
            }
            parsed
        })
        .collect()
}

/// An import statement found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub path: String,
    pub line: u32,
}

/// Check one file's imports against every rule. One import may break several rules.
pub fn check_violations(
    file: &Path,
    imports: &[ImportRef],
    rules: &[BoundaryRule],
    root: &Path,
) -> Vec<BoundaryViolation> {
    if rules.is_empty() || imports.is_empty() {
        return Vec::new();
    }

    let dir = relative_dir(file, root);
    let label = file_label(file);
    let mut violations = Vec::new();

    for import in imports {
        for rule in rules {
            if rule.matches_path(&dir) && rule.matches_import(&import.path) {
                violations.push(BoundaryViolation {
                    file: label.clone(),
                    line: import.line,
                    from: rule.from.clone(),
                    to: rule.to.clone(),
                    import: import.path.clone(),
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imp(path: &str, line: u32) -> ImportRef {
        ImportRef {
            path: path.to_string(),
            line,
        }
    }

    #[test]
    fn test_parse_rule() {
        let rule = BoundaryRule::parse("  pkg/api ->  internal/db ").expect("should parse");
        assert_eq!(rule.from, "pkg/api");
        assert_eq!(rule.to, "internal/db");

        assert!(BoundaryRule::parse("pkg/api internal/db").is_none());
        assert!(BoundaryRule::parse("a -> b -> c").is_none());
        assert!(BoundaryRule::parse(" -> b").is_none());
        assert!(BoundaryRule::parse("a -> ").is_none());
    }

    #[test]
    fn test_parse_rules_drops_malformed() {
        let rules = parse_rules(&["a -> b", "nonsense", "c->d"]);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].from, "c");
    }

    #[test]
    fn test_path_prefix_is_raw_text() {
        let rule = BoundaryRule::parse("pkg/api -> db").unwrap();
        assert!(rule.matches_path("pkg/api"));
        assert!(rule.matches_path("pkg/api/handlers"));
        assert!(rule.matches_path("pkg/apiv2"));
        assert!(!rule.matches_path("pkg/other"));
        assert!(!rule.matches_path("."));
    }

    #[test]
    fn test_violation_fires_once_per_matching_import() {
        let root = Path::new("/repo");
        let rules = parse_rules(&["pkg/api -> internal/db"]);
        let imports = vec![
            imp("example.com/app/internal/db", 3),
            imp("fmt", 4),
            imp("example.com/app/internal/db/query", 5),
        ];

        let hits = check_violations(Path::new("/repo/pkg/api/handler.go"), &imports, &rules, root);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].file, "handler.go");
        assert_eq!(hits[0].line, 3);
        assert_eq!(hits[0].from, "pkg/api");
        assert_eq!(hits[1].import, "example.com/app/internal/db/query");

        let none = check_violations(Path::new("/repo/pkg/other/x.go"), &imports, &rules, root);
        assert!(none.is_empty());
    }

    #[test]
    fn test_one_import_can_break_several_rules() {
        let root = Path::new("/repo");
        let rules = parse_rules(&["web -> db", "web -> internal"]);
        let imports = vec![imp("app/internal/db", 1)];
        let hits = check_violations(Path::new("/repo/web/a.ts"), &imports, &rules, root);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_no_rules_no_work() {
        let imports = vec![imp("anything", 1)];
        let hits = check_violations(Path::new("/repo/a.py"), &imports, &[], Path::new("/repo"));
        assert!(hits.is_empty());
    }
}
