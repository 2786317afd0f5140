//! Function span detection for languages analyzed from raw text
//!
//! Each style is a small depth-tracking state machine over whole lines.
//! No regex is involved once the declaration line is known.

use std::ops::Range;

/// How a language delimits function bodies.
#[derive(Debug, Clone, Copy)]
pub enum BlockStyle {
    /// `{` / `}` depth counting
    Braces,
    /// Body ends at the first non-blank line indented no deeper than the declaration
    Indentation,
    /// Block-opening keywords closed by a terminator keyword
    Keywords(&'static KeywordBlocks),
}

/// Keyword table for terminator-delimited blocks.
#[derive(Debug)]
pub struct KeywordBlocks {
    /// Open a block wherever they appear as a word
    pub openers: &'static [&'static str],
    /// Open a block only as the first word of a line (statement form)
    pub leading_openers: &'static [&'static str],
    /// Closes the innermost block
    pub terminator: &'static str,
    /// Lines starting with this are ignored
    pub comment: &'static str,
}

pub const RUBY_BLOCKS: KeywordBlocks = KeywordBlocks {
    openers: &["def", "class", "module", "do", "begin"],
    leading_openers: &["if", "unless", "while", "for", "until", "case"],
    terminator: "end",
    comment: "#",
};

/// Lines of a function, as computed from its declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Lines scanned for complexity (0-based, end exclusive)
    pub body: Range<usize>,
    /// False when a brace-style declaration ended in `;` before any `{`
    pub has_body: bool,
}

/// Compute the span of the function declared on line `start`.
pub fn find_span(lines: &[&str], start: usize, style: BlockStyle) -> Span {
    match style {
        BlockStyle::Braces => brace_span(lines, start),
        BlockStyle::Indentation => indentation_span(lines, start),
        BlockStyle::Keywords(blocks) => keyword_span(lines, start, blocks),
    }
}

/// Declaration line included. A span that never closes runs to end of file.
fn brace_span(lines: &[&str], start: usize) -> Span {
    let mut depth: i64 = 0;
    let mut started = false;

    for (i, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    started = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }

        if started && depth <= 0 {
            return Span {
                body: start..i + 1,
                has_body: true,
            };
        }
        if !started && line.trim_end().ends_with(';') {
            return Span {
                body: start..i + 1,
                has_body: false,
            };
        }
    }

    Span {
        body: start..lines.len(),
        has_body: true,
    }
}

/// Body starts on the line after the declaration.
fn indentation_span(lines: &[&str], start: usize) -> Span {
    let decl_indent = indent_of(lines[start]);
    let mut end = lines.len();

    for (j, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= decl_indent {
            end = j;
            break;
        }
    }

    Span {
        body: (start + 1).min(end)..end,
        has_body: true,
    }
}

/// Body starts on the line after the declaration and stops before the terminator.
fn keyword_span(lines: &[&str], start: usize, blocks: &KeywordBlocks) -> Span {
    let decl_indent = indent_of(lines[start]);
    let mut depth: i64 = 1;
    let mut end = lines.len();

    for (j, line) in lines.iter().enumerate().skip(start + 1) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(blocks.comment) {
            continue;
        }
        let indent = indent_of(line);

        if is_terminator(trimmed, blocks.terminator) {
            depth -= 1;
            if indent <= decl_indent && depth <= 0 {
                end = j;
                break;
            }
            continue;
        }

        if indent > decl_indent && opens_block(trimmed, blocks) {
            depth += 1;
        }
    }

    Span {
        body: (start + 1).min(end)..end,
        has_body: true,
    }
}

fn is_terminator(trimmed: &str, terminator: &str) -> bool {
    match trimmed.strip_prefix(terminator) {
        Some(rest) => rest.is_empty() || rest.starts_with(' ') || rest.starts_with('#'),
        None => false,
    }
}

fn opens_block(trimmed: &str, blocks: &KeywordBlocks) -> bool {
    let inline_close = format!(" {}", blocks.terminator);
    if blocks.openers.iter().any(|kw| contains_word(trimmed, kw)) {
        return !trimmed.contains(&inline_close);
    }

    let first = words(trimmed).next().unwrap_or("");
    blocks.leading_openers.contains(&first)
        && !trimmed.ends_with(blocks.terminator)
        && !trimmed.contains(" then ")
}

fn words(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

/// Whole-word containment, identifier characters being alphanumerics and `_`.
pub fn contains_word(line: &str, word: &str) -> bool {
    words(line).any(|w| w == word)
}

/// Count of leading spaces and tabs.
pub fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<&str> {
        src.lines().collect()
    }

    #[test]
    fn test_brace_span_closes_at_matching_brace() {
        let src = lines("function a() {\n  if (x) {\n    y();\n  }\n}\nfunction b() {}\n");
        let span = find_span(&src, 0, BlockStyle::Braces);
        assert_eq!(span.body, 0..5);
        assert!(span.has_body);

        let one_line = find_span(&src, 5, BlockStyle::Braces);
        assert_eq!(one_line.body, 5..6);
    }

    #[test]
    fn test_brace_span_signature_on_several_lines() {
        let src = lines("public int sum(int a,\n               int b)\n{\n  return a + b;\n}\n");
        let span = find_span(&src, 0, BlockStyle::Braces);
        assert_eq!(span.body, 0..5);
    }

    #[test]
    fn test_brace_span_bodyless_declaration() {
        let src = lines("    void run();\n    void stop() {\n    }\n");
        let span = find_span(&src, 0, BlockStyle::Braces);
        assert_eq!(span.body, 0..1);
        assert!(!span.has_body);
    }

    #[test]
    fn test_brace_span_unclosed_runs_to_eof() {
        let src = lines("fn broken() {\n    let x = 1;\n");
        let span = find_span(&src, 0, BlockStyle::Braces);
        assert_eq!(span.body, 0..2);
    }

    #[test]
    fn test_indentation_span() {
        let src = lines("def outer(x):\n    if x:\n\n        return 1\n    return 2\n\ndef other():\n    pass\n");
        let span = find_span(&src, 0, BlockStyle::Indentation);
        assert_eq!(span.body, 1..6);
        let last = find_span(&src, 6, BlockStyle::Indentation);
        assert_eq!(last.body, 7..8);
    }

    #[test]
    fn test_indentation_span_method() {
        let src = lines("class A:\n    def m(self):\n        return 1\n    def n(self):\n        pass\n");
        let span = find_span(&src, 1, BlockStyle::Indentation);
        assert_eq!(span.body, 2..3);
    }

    #[test]
    fn test_keyword_span_with_nested_blocks() {
        let src = lines(
            "  def process(items)\n    items.each do |i|\n      if i > 1\n        puts i\n      end\n    end\n  end\n  def other\n  end\n",
        );
        let span = find_span(&src, 0, BlockStyle::Keywords(&RUBY_BLOCKS));
        assert_eq!(span.body, 1..6);
    }

    #[test]
    fn test_keyword_span_ignores_modifiers_and_inline_blocks() {
        let src = lines(
            "def check(x)\n  return 0 if x.nil?\n  # if commented\n  y = x ? 1 : 2\n  if x then y else 0 end\n  y\nend\n",
        );
        let span = find_span(&src, 0, BlockStyle::Keywords(&RUBY_BLOCKS));
        assert_eq!(span.body, 1..6);
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("items.each do |x|", "do"));
        assert!(!contains_word("done = true", "do"));
        assert!(!contains_word("undo()", "do"));
    }

    #[test]
    fn test_terminator_forms() {
        assert!(is_terminator("end", "end"));
        assert!(is_terminator("end # loop", "end"));
        assert!(is_terminator("end#x", "end"));
        assert!(!is_terminator("ending = 1", "end"));
        assert!(!is_terminator("end.freeze", "end"));
    }
}
