//! Ruby: `def ... end` methods, Gemfile

use regex::{Captures, Regex};
use std::path::Path;
use std::sync::OnceLock;

use super::heuristic::{re, unit_weights, BlockStyle, HeuristicProfile, RUBY_BLOCKS};
use super::{read_manifest, ManifestError};
use crate::deps::{DependencySpec, Ecosystem};
use crate::models::Language;

pub(super) fn profile() -> &'static HeuristicProfile {
    static PROFILE: OnceLock<HeuristicProfile> = OnceLock::new();
    PROFILE.get_or_init(|| HeuristicProfile {
        language: Language::Ruby,
        extensions: &["rb"],
        excludes: &[".bundle", "vendor", "tmp", ".ruby-lsp"],
        skip_patterns: &["_test.rb", "_spec.rb", "spec/", "test/"],
        signature: re(r"^(\s*)def\s+(self\.)?(\w+[?!=]?)"),
        function_name,
        hide_function: is_private,
        block_style: BlockStyle::Keywords(&RUBY_BLOCKS),
        keep_bodyless: true,
        complexity: unit_weights(&[
            r"\bif\b",
            r"\belsif\b",
            r"\bunless\b",
            r"\bfor\b",
            r"\bwhile\b",
            r"\buntil\b",
            r"\bwhen\b",
            r"\brescue\b",
            r"&&",
            r"\|\|",
        ]),
        comment_prefix: Some("#"),
        imports: vec![
            re(r#"require\s+['"]([^'"]+)['"]"#),
            re(r#"require_relative\s+['"]([^'"]+)['"]"#),
        ],
        export: re(r"^\s*def\s+(?:self\.)?(\w+[?!=]?)"),
        calls: vec![re(r"\b\w+[?!]?\("), re(r"\.\w+[?!]?")],
        entry_points: &["initialize", "call", "to_s", "method_missing", "respond_to_missing?"],
        manifest,
    })
}

/// Class methods keep their `self.` prefix.
fn function_name(caps: &Captures<'_>) -> Option<String> {
    let name = caps.get(3)?.as_str();
    Some(match caps.get(2) {
        Some(_) => format!("self.{}", name),
        None => name.to_string(),
    })
}

fn is_private(name: &str) -> bool {
    name.starts_with('_')
}

fn manifest(root: &Path) -> Result<Vec<DependencySpec>, ManifestError> {
    let path = root.join("Gemfile");
    if !path.is_file() {
        return Err(ManifestError::Absent("Gemfile"));
    }
    Ok(parse_gemfile(&read_manifest(&path)?))
}

fn gem_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| re(r#"gem\s+['"]([^'"]+)['"](?:\s*,\s*['"]([^'"]+)['"])?"#))
}

/// `gem 'name'` and `gem 'name', '~> 1.2'` lines; the first constraint is the version.
pub(crate) fn parse_gemfile(content: &str) -> Vec<DependencySpec> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| gem_line().captures(line))
        .map(|caps| {
            let version = caps
                .get(2)
                .map(|m| m.as_str().trim_start_matches(['~', '>', '=', ' ']))
                .unwrap_or("");
            DependencySpec::new(&caps[1], version, Ecosystem::RubyGems)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complexity_of(src: &str) -> Vec<(String, u32)> {
        profile()
            .function_complexity("order.rb", src)
            .into_iter()
            .map(|f| (f.name, f.complexity))
            .collect()
    }

    #[test]
    fn test_methods_blocks_and_rescue() {
        let src = "\
class Order
  def total(items)
    sum = 0
    items.each do |i|
      if i.price > 0 && i.qty > 0
        sum += i.price
      elsif i.free?
        next
      end
    end
    sum
  rescue StandardError
    0
  end

  def self.build(attrs)
    new(attrs)
  end

  def _internal
  end
end
";
        assert_eq!(
            complexity_of(src),
            vec![("total".to_string(), 5), ("self.build".to_string(), 1)]
        );
    }

    #[test]
    fn test_comment_lines_do_not_count() {
        let src = "def check(x)\n  # if x is nil we bail\n  return 0 unless x\n  x\nend\n";
        assert_eq!(complexity_of(src), vec![("check".to_string(), 2)]);
    }

    #[test]
    fn test_predicate_method_names() {
        let src = "def valid?\n  true\nend\ndef save!\n  persist\nend\n";
        let names: Vec<_> = complexity_of(src).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["valid?", "save!"]);
    }

    #[test]
    fn test_extract_imports() {
        let src = "require 'json'\nrequire_relative \"lib/billing/invoice\"\n";
        let paths: Vec<_> = profile().extract_imports(src).into_iter().map(|i| i.path).collect();
        assert_eq!(paths, vec!["json", "lib/billing/invoice"]);
    }

    #[test]
    fn test_parse_gemfile() {
        let gemfile = "source 'https://rubygems.org'\n\n# gem 'commented', '1.0'\ngem 'rails', '~> 7.1.2'\ngem \"pg\"\ngem 'puma', '>= 6.0'\n";
        let deps = parse_gemfile(gemfile);
        let got: Vec<_> = deps.iter().map(|d| (d.name.as_str(), d.version.as_str())).collect();
        assert_eq!(got, vec![("rails", "7.1.2"), ("pg", ""), ("puma", "6.0")]);
        assert!(deps.iter().all(|d| d.ecosystem == Ecosystem::RubyGems));
    }
}
