//! Dead-code cross-referencing for text-analyzed languages
//!
//! Public symbols are found with a per-language export pattern and call
//! sites with per-language call patterns. A symbol is dead when no call site
//! names it and its raw text appears at most once across all files. The
//! substring check is a low-precision safety net: comments and strings count
//! as references, and reflection or dynamic dispatch go unseen.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::debug;

use crate::analyzers::read_source;
use crate::models::{file_label, DeadFunctionRecord};

/// Patterns driving one language's cross-reference.
pub struct DeadCodePatterns<'a> {
    /// Capture group 1 is the declared name
    pub export: &'a Regex,
    /// Each match contains one called identifier
    pub calls: &'a [Regex],
    pub entry_points: &'a [&'a str],
}

impl DeadCodePatterns<'_> {
    fn is_exempt(&self, name: &str) -> bool {
        self.entry_points.contains(&name) || is_test_name(name)
    }
}

/// `test`, `test_x`, `testX`, `Test`, `TestX`, `Test_x`; not `testimony`.
fn is_test_name(name: &str) -> bool {
    let rest = match name.strip_prefix("test").or_else(|| name.strip_prefix("Test")) {
        Some(rest) => rest,
        None => return false,
    };
    match rest.chars().next() {
        None => true,
        Some(c) => c == '_' || c.is_uppercase() || c.is_ascii_digit(),
    }
}

/// Read `files` and report public symbols with no detected reference.
pub fn cross_reference(files: &[PathBuf], patterns: &DeadCodePatterns<'_>) -> Vec<DeadFunctionRecord> {
    let sources: Vec<(String, String)> = files
        .iter()
        .filter_map(|path| read_source(path).map(|src| (file_label(path), src)))
        .collect();
    cross_reference_sources(&sources, patterns)
}

/// Cross-reference `(file label, source)` pairs. Output is ordered by file, line, name.
pub fn cross_reference_sources(
    sources: &[(String, String)],
    patterns: &DeadCodePatterns<'_>,
) -> Vec<DeadFunctionRecord> {
    let mut exported: HashMap<String, DeadFunctionRecord> = HashMap::new();
    let mut called: HashSet<String> = HashSet::new();

    for (file, source) in sources {
        for (i, line) in source.lines().enumerate() {
            let declared = patterns
                .export
                .captures(line)
                .and_then(|c| c.get(1))
                .filter(|m| !m.as_str().is_empty());

            if let Some(m) = declared {
                let name = m.as_str();
                if !patterns.is_exempt(name) {
                    exported.insert(
                        name.to_string(),
                        DeadFunctionRecord {
                            file: file.clone(),
                            name: name.to_string(),
                            line: i as u32 + 1,
                        },
                    );
                }
            }

            for pattern in patterns.calls {
                for call in pattern.find_iter(line) {
                    let (offset, ident) = call_identifier(call.as_str());
                    if ident.is_empty() {
                        continue;
                    }
                    // The declaration itself is not a call site
                    if declared.is_some_and(|d| d.start() == call.start() + offset) {
                        continue;
                    }
                    called.insert(ident.to_string());
                }
            }
        }
    }

    let unreferenced: Vec<&String> = exported.keys().filter(|n| !called.contains(*n)).collect();
    if !unreferenced.is_empty() {
        let corpus: String = sources
            .iter()
            .map(|(_, src)| src.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let mentioned: Vec<String> = unreferenced
            .into_iter()
            .filter(|name| corpus.matches(name.as_str()).count() > 1)
            .cloned()
            .collect();
        called.extend(mentioned);
    }

    let mut dead: Vec<DeadFunctionRecord> = exported
        .into_values()
        .filter(|rec| !called.contains(&rec.name))
        .collect();
    dead.sort_by(|a, b| (&a.file, a.line, &a.name).cmp(&(&b.file, b.line, &b.name)));

    debug!("Dead code: {} unreferenced symbols", dead.len());
    dead
}

/// Identifier inside a call-pattern match, with its byte offset in the match.
///
/// Leading punctuation (`.`, `->`, `::`) and a trailing `(` are dropped;
/// Ruby's `?`/`!` suffixes are kept.
fn call_identifier(matched: &str) -> (usize, &str) {
    let start = matched
        .find(|c: char| c.is_alphanumeric() || c == '_')
        .unwrap_or(matched.len());
    let ident = matched[start..].trim_end_matches('(').trim_end();
    (start, ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python_patterns() -> (Regex, Vec<Regex>) {
        (
            Regex::new(r"^def\s+(\w+)\s*\(").unwrap(),
            vec![Regex::new(r"\b\w+\(").unwrap()],
        )
    }

    fn src(file: &str, text: &str) -> (String, String) {
        (file.to_string(), text.to_string())
    }

    #[test]
    fn test_unreferenced_public_function_is_dead() {
        let (export, calls) = python_patterns();
        let patterns = DeadCodePatterns {
            export: &export,
            calls: &calls,
            entry_points: &["main"],
        };
        let sources = vec![src(
            "lib.py",
            "def used():\n    return 1\n\ndef orphan():\n    return 2\n\ndef main():\n    used()\n",
        )];

        let dead = cross_reference_sources(&sources, &patterns);
        assert_eq!(
            dead,
            vec![DeadFunctionRecord {
                file: "lib.py".into(),
                name: "orphan".into(),
                line: 4,
            }]
        );
    }

    #[test]
    fn test_one_call_site_in_another_file_keeps_it_alive() {
        let (export, calls) = python_patterns();
        let patterns = DeadCodePatterns {
            export: &export,
            calls: &calls,
            entry_points: &[],
        };
        let sources = vec![
            src("a.py", "def helper():\n    pass\n"),
            src("b.py", "from a import helper\nhelper()\n"),
        ];
        assert!(cross_reference_sources(&sources, &patterns).is_empty());
    }

    #[test]
    fn test_declaration_is_not_its_own_call_site() {
        let export = Regex::new(r"public\s+(?:static\s+)?function\s+(\w+)").unwrap();
        let calls = vec![
            Regex::new(r"\b\w+\(").unwrap(),
            Regex::new(r"->\w+\(").unwrap(),
        ];
        let patterns = DeadCodePatterns {
            export: &export,
            calls: &calls,
            entry_points: &[],
        };
        let sources = vec![src(
            "Svc.php",
            "<?php\nclass Svc {\n    public function run() {\n        return $this->load();\n    }\n    public function load() {}\n}\n",
        )];

        let dead = cross_reference_sources(&sources, &patterns);
        let names: Vec<_> = dead.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["run"]);
    }

    #[test]
    fn test_substring_fallback_counts_any_second_mention() {
        let (export, _) = python_patterns();
        let patterns = DeadCodePatterns {
            export: &export,
            calls: &[],
            entry_points: &[],
        };
        let sources = vec![
            src("a.py", "def handler():\n    pass\n"),
            src("b.py", "ROUTES = {'x': handler}\n"),
        ];
        assert!(cross_reference_sources(&sources, &patterns).is_empty());
    }

    #[test]
    fn test_entry_points_and_test_names_are_exempt() {
        let (export, calls) = python_patterns();
        let patterns = DeadCodePatterns {
            export: &export,
            calls: &calls,
            entry_points: &["main"],
        };
        let sources = vec![src("t.py", "def main():\n    pass\ndef test_it():\n    pass\n")];
        assert!(cross_reference_sources(&sources, &patterns).is_empty());
    }

    #[test]
    fn test_words_starting_with_test_are_not_exempt() {
        let (export, calls) = python_patterns();
        let patterns = DeadCodePatterns {
            export: &export,
            calls: &calls,
            entry_points: &[],
        };
        let sources = vec![src(
            "t.py",
            "def testimony():\n    pass\ndef testify_input():\n    pass\ndef test():\n    pass\n",
        )];
        let dead: Vec<_> = cross_reference_sources(&sources, &patterns)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(dead, vec!["testimony", "testify_input"]);
    }

    #[test]
    fn test_is_test_name() {
        for name in ["test", "test_parse", "testParse", "Test", "TestParse", "Test_parse", "test2"] {
            assert!(is_test_name(name), "{name}");
        }
        for name in ["testimony", "testify_input", "Testament", "latest_test", "contest"] {
            assert!(!is_test_name(name), "{name}");
        }
    }

    #[test]
    fn test_call_identifier() {
        assert_eq!(call_identifier("foo("), (0, "foo"));
        assert_eq!(call_identifier(".bar("), (1, "bar"));
        assert_eq!(call_identifier("->baz("), (2, "baz"));
        assert_eq!(call_identifier("::qux("), (2, "qux"));
        assert_eq!(call_identifier(".save!"), (1, "save!"));
    }
}
