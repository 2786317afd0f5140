//! Go analysis from a tree-sitter parse tree
//!
//! Complexity, imports and dead code all come from the real syntax tree, so
//! closures, strings and comments never confuse the counts. Files that do not
//! parse cleanly are skipped entirely.

use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

use super::discovery::{walk_files, FileFilter};
use super::{read_manifest, read_source, AnalysisError, LanguageAnalyzer, ManifestError};
use crate::boundaries::{check_violations, BoundaryRule, ImportRef};
use crate::deps::{DependencySpec, Ecosystem};
use crate::models::{file_label, BoundaryViolation, DeadFunctionRecord, FunctionRecord, Language};

const GO_FILES: FileFilter<'static> = FileFilter {
    extensions: &["go"],
    skip_patterns: &[],
    skip_suffixes: &["_test.go"],
};

/// Exported names the toolchain calls on our behalf.
const RUNTIME_ENTRY_POINTS: &[&str] = &["main", "init"];
const TEST_PREFIXES: &[&str] = &["Test", "Benchmark", "Example"];

/// Parse Go source, or `None` when the grammar cannot load or the tree has errors.
fn parse_source(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&tree_sitter_go::LANGUAGE.into()) {
        debug!("Go grammar unavailable: {}", e);
        return None;
    }
    let tree = parser.parse(source, None)?;
    if tree.root_node().has_error() {
        return None;
    }
    Some(tree)
}

fn parse_file(path: &Path) -> Option<(String, Tree)> {
    let source = read_source(path)?;
    match parse_source(&source) {
        Some(tree) => Some((source, tree)),
        None => {
            debug!("Skipping {}: syntax errors", path.display());
            None
        }
    }
}

fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn line_of(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

/// Visit `root` and every node below it, parents first.
fn for_each_node<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Top-level function and method declarations.
fn declarations(tree: &Tree) -> Vec<Node<'_>> {
    let root = tree.root_node();
    let mut cursor = root.walk();
    root.children(&mut cursor)
        .filter(|n| matches!(n.kind(), "function_declaration" | "method_declaration"))
        .collect()
}

/// Receiver type name: `T`, `*T` and `T[K]` all give `T`; anything else `?`.
fn receiver_type(node: Node<'_>, source: &str) -> String {
    match node.kind() {
        "type_identifier" => text(node, source).to_string(),
        "pointer_type" => match node.named_child(0) {
            Some(inner) => receiver_type(inner, source),
            None => "?".to_string(),
        },
        "generic_type" => match node.child_by_field_name("type") {
            Some(inner) => receiver_type(inner, source),
            None => "?".to_string(),
        },
        _ => "?".to_string(),
    }
}

/// `Receiver.Method` for methods, the bare name for functions.
fn qualified_name(decl: Node<'_>, source: &str) -> String {
    let name = decl
        .child_by_field_name("name")
        .map(|n| text(n, source))
        .unwrap_or("");

    if decl.kind() != "method_declaration" {
        return name.to_string();
    }

    let receiver = decl
        .child_by_field_name("receiver")
        .and_then(|list| {
            let mut cursor = list.walk();
            let param = list
                .named_children(&mut cursor)
                .find(|n| n.kind() == "parameter_declaration");
            param
        })
        .and_then(|param| param.child_by_field_name("type"))
        .map(|ty| receiver_type(ty, source))
        .unwrap_or_else(|| "?".to_string());

    format!("{}.{}", receiver, name)
}

/// Decision points in `node`'s subtree. Function literals are opaque.
fn decision_points(node: Node<'_>) -> u32 {
    let own = match node.kind() {
        "func_literal" => return 0,
        "if_statement"
        | "for_statement"
        | "expression_case"
        | "type_case"
        | "communication_case"
        | "type_switch_statement"
        | "select_statement" => 1,
        "binary_expression" => match node.child_by_field_name("operator").map(|op| op.kind()) {
            Some("&&") | Some("||") => 1,
            _ => 0,
        },
        _ => 0,
    };

    let mut cursor = node.walk();
    let nested: u32 = node.children(&mut cursor).map(decision_points).sum();
    own + nested
}

/// Complexity of every function and method in one Go source text.
pub fn function_complexity(file: &str, source: &str) -> Vec<FunctionRecord> {
    let Some(tree) = parse_source(source) else {
        return Vec::new();
    };

    let records = declarations(&tree)
        .into_iter()
        .map(|decl| {
            let complexity = match decl.child_by_field_name("body") {
                Some(body) => 1 + decision_points(body),
                None => 1,
            };
            FunctionRecord {
                file: file.to_string(),
                name: qualified_name(decl, source),
                line: line_of(decl),
                complexity,
            }
        })
        .collect();
    records
}

/// Import paths with quotes removed, at the line of their import spec.
pub fn extract_imports(source: &str, tree: &Tree) -> Vec<ImportRef> {
    let mut imports = Vec::new();
    for_each_node(tree.root_node(), |node| {
        if node.kind() != "import_spec" {
            return;
        }
        if let Some(path) = node.child_by_field_name("path") {
            imports.push(ImportRef {
                path: text(path, source).trim_matches(|c: char| c == '"' || c == '`').to_string(),
                line: line_of(node),
            });
        }
    });
    imports
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn is_exempt(name: &str) -> bool {
    RUNTIME_ENTRY_POINTS.contains(&name) || TEST_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Exported declarations and call sites gathered across a set of Go files.
#[derive(Debug, Default)]
pub struct CallIndex {
    exported: BTreeMap<String, DeadFunctionRecord>,
    called: HashSet<String>,
}

impl CallIndex {
    /// Record one parsed file. Later declarations of a key replace earlier ones.
    pub fn add(&mut self, file: &str, source: &str, tree: &Tree) {
        for decl in declarations(tree) {
            let name = decl
                .child_by_field_name("name")
                .map(|n| text(n, source))
                .unwrap_or("");
            if is_exempt(name) || !is_exported(name) {
                continue;
            }
            let key = qualified_name(decl, source);
            self.exported.insert(
                key.clone(),
                DeadFunctionRecord {
                    file: file.to_string(),
                    name: key,
                    line: line_of(decl),
                },
            );
        }

        for_each_node(tree.root_node(), |node| {
            if node.kind() != "call_expression" {
                return;
            }
            let Some(function) = node.child_by_field_name("function") else {
                return;
            };
            match function.kind() {
                "identifier" => {
                    self.called.insert(text(function, source).to_string());
                }
                "selector_expression" => {
                    let Some(field) = function.child_by_field_name("field") else {
                        return;
                    };
                    let field = text(field, source);
                    self.called.insert(field.to_string());
                    if let Some(operand) = function
                        .child_by_field_name("operand")
                        .filter(|o| o.kind() == "identifier")
                    {
                        self.called.insert(format!("{}.{}", text(operand, source), field));
                    }
                }
                _ => {}
            }
        });
    }

    /// Exported keys never called by key or by their final segment, by file then line.
    pub fn dead(&self) -> Vec<DeadFunctionRecord> {
        let mut dead: Vec<DeadFunctionRecord> = self
            .exported
            .iter()
            .filter(|(key, _)| {
                let simple = key.rsplit('.').next().unwrap_or(key.as_str());
                !self.called.contains(key.as_str()) && !self.called.contains(simple)
            })
            .map(|(_, record)| record.clone())
            .collect();
        dead.sort_by(|a, b| (&a.file, a.line, &a.name).cmp(&(&b.file, b.line, &b.name)));
        dead
    }
}

/// `require` directives of a go.mod, single-line and block form, minus `// indirect`.
pub(crate) fn parse_go_mod(content: &str) -> Vec<DependencySpec> {
    let mut specs = Vec::new();
    let mut in_block = false;

    for raw in content.lines() {
        let line = raw.trim();
        if in_block {
            if line == ")" {
                in_block = false;
            } else if let Some(spec) = require_entry(line) {
                specs.push(spec);
            }
            continue;
        }

        let Some(rest) = line.strip_prefix("require") else {
            continue;
        };
        if rest.trim() == "(" {
            in_block = true;
        } else if rest.starts_with(char::is_whitespace) {
            specs.extend(require_entry(rest.trim()));
        }
    }

    specs
}

fn require_entry(entry: &str) -> Option<DependencySpec> {
    if entry.contains("// indirect") {
        return None;
    }
    let entry = entry.split("//").next().unwrap_or("");
    let mut fields = entry.split_whitespace();
    let module = fields.next()?;
    let version = fields.next()?;
    Some(DependencySpec::new(short_module_name(module), version, Ecosystem::GoProxy).with_package(module))
}

/// Last path segment: `github.com/spf13/cobra` -> `cobra`.
fn short_module_name(module: &str) -> &str {
    module.rsplit('/').next().unwrap_or(module)
}

/// [`LanguageAnalyzer`] for Go.
pub struct GoAnalyzer;

impl LanguageAnalyzer for GoAnalyzer {
    fn language(&self) -> Language {
        Language::Go
    }

    fn extensions(&self) -> &'static [&'static str] {
        GO_FILES.extensions
    }

    fn accepts_file(&self, path: &Path, root: &Path) -> bool {
        GO_FILES.accepts(path, root)
    }

    fn find_files(&self, root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>, AnalysisError> {
        walk_files(root, exclude, GO_FILES)
    }

    fn analyze_complexity(&self, files: &[PathBuf]) -> (Vec<FunctionRecord>, usize) {
        let per_file: Vec<Vec<FunctionRecord>> = files
            .par_iter()
            .map(|path| match read_source(path) {
                Some(source) => function_complexity(&file_label(path), &source),
                None => Vec::new(),
            })
            .collect();

        let functions: Vec<FunctionRecord> = per_file.into_iter().flatten().collect();
        debug!("go complexity: {} functions in {} files", functions.len(), files.len());
        let total = functions.len();
        (functions, total)
    }

    fn manifest_dependencies(&self, root: &Path) -> Result<Vec<DependencySpec>, ManifestError> {
        let path = root.join("go.mod");
        if !path.is_file() {
            return Err(ManifestError::Absent("go.mod"));
        }
        Ok(parse_go_mod(&read_manifest(&path)?))
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
            .filter_map(|path| parse_file(path).map(|parsed| (path, parsed)))
            .flat_map(|(path, (source, tree))| {
                let imports = extract_imports(&source, &tree);
                check_violations(path, &imports, rules, root)
            })
            .collect()
    }

    fn analyze_dead_code(&self, files: &[PathBuf]) -> Vec<DeadFunctionRecord> {
        let mut index = CallIndex::default();
        for path in files {
            if let Some((source, tree)) = parse_file(path) {
                index.add(&file_label(path), &source, &tree);
            }
        }
        index.dead()
    }
}
