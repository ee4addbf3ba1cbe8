/// Language-agnostic line-range analyzer.
///
/// Finds a definition by its name on a line, then takes the brace-balanced
/// block (or, for `:`-terminated headers, the indented block) that follows.
/// Used for languages without a dedicated analyzer and as the fallback when
/// a dedicated analyzer fails.
use std::sync::LazyLock;

use regex::Regex;

use crate::analysis::{collapse_whitespace, Analyzer};
use crate::errors::Result;
use crate::types::Language;

static CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_]\w*)\s*\(").expect("valid call regex"));

static KEYWORD_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:def|fn|class|struct|enum|union|trait|interface|func|function|fun|proc)\s+([A-Za-z_]\w*)")
        .expect("valid definition regex")
});

static C_LIKE_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][\w\s\*&:<>,]*?[\s\*&]([A-Za-z_]\w*)\s*\(").expect("valid c-like regex")
});

/// Words that look like calls when followed by `(` but are not.
const NOT_CALLS: &[&str] = &[
    "if", "for", "while", "switch", "return", "sizeof", "elif", "match", "catch", "with",
    "assert", "typeof", "alignof", "defined", "else", "do", "case", "not", "and", "or", "in",
];

const CONTROL_WORDS: &[&str] = &[
    "if", "else", "elif", "for", "while", "do", "switch", "case", "default", "break",
    "continue", "goto", "match", "loop", "try", "except", "catch", "finally", "with",
];

/// Drops blank lines, lone braces and comment-only lines; trims the rest.
pub fn filter_statements<'a, I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !matches!(*line, "{" | "}" | "};" | "})" | "]" | "*/" | "\"\"\"" | "'''")
                && !line.starts_with("//")
                && !line.starts_with("/*")
                && !line.starts_with("* ")
                && *line != "*"
                && !line.starts_with("# ")
                && *line != "#"
        })
        .map(str::to_string)
        .collect()
}

/// [`filter_statements`] for Python bodies: also drops every `#` comment
/// and docstring lines, including the inner lines of multi-line docstrings.
pub fn filter_python_statements<'a, I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut open_quote: Option<&str> = None;
    let kept: Vec<&str> = lines
        .into_iter()
        .filter(|line| {
            let line = line.trim();
            if let Some(quote) = open_quote {
                if line.contains(quote) {
                    open_quote = None;
                }
                return false;
            }
            if line.starts_with('#') {
                return false;
            }
            let unprefixed = line.strip_prefix(['r', 'u', 'b']).unwrap_or(line);
            let Some(quote) = ["\"\"\"", "'''"].into_iter().find(|q| unprefixed.starts_with(q)) else {
                return true;
            };
            if !unprefixed[quote.len()..].contains(quote) {
                open_quote = Some(quote);
            }
            false
        })
        .collect();
    filter_statements(kept)
}

/// Classifies a statement line the way a reader skimming the body would.
pub(crate) fn describe_statement(line: &str) -> Option<String> {
    let first_word: String = line
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if first_word == "return" {
        return Some(format!("Returns: {line}"));
    }
    if CONTROL_WORDS.contains(&first_word.as_str()) {
        return Some(format!("Control flow: {line}"));
    }
    if is_assignment(line) {
        return Some(format!("Assignment: {line}"));
    }
    if line.contains('(') && line.contains(')') {
        return Some(format!("Call: {line}"));
    }
    None
}

fn is_assignment(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        if b != b'=' {
            return false;
        }
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(i + 1).copied();
        !matches!(prev, Some(b'=' | b'!' | b'<' | b'>'))
            && !matches!(next, Some(b'=' | b'>'))
    })
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Line-range analyzer over raw text.
pub struct GenericAnalyzer {
    lines: Vec<String>,
    python: bool,
}

impl GenericAnalyzer {
    pub fn new(source: &str) -> Self {
        Self {
            lines: source.lines().map(str::to_string).collect(),
            python: false,
        }
    }

    /// Analyzer for a unit of a known language; Python bodies drop
    /// comments and docstrings.
    pub fn for_language(language: &Language, source: &str) -> Self {
        Self {
            python: *language == Language::Python,
            ..Self::new(source)
        }
    }

    /// Returns `true` if `line` looks like it defines `name`.
    fn defines(line: &str, name: &str) -> bool {
        let trimmed = line.trim_start();
        if name.is_empty()
            || trimmed.starts_with("//")
            || trimmed.starts_with('#')
            || trimmed.starts_with('*')
            || trimmed.starts_with("return")
        {
            return false;
        }
        let bytes = line.as_bytes();
        let mut from = 0;
        while let Some(pos) = line[from..].find(name) {
            let start = from + pos;
            let end = start + name.len();
            from = end;
            let bounded_left = start == 0 || !is_identifier_byte(bytes[start - 1]);
            let bounded_right = end == bytes.len() || !is_identifier_byte(bytes[end]);
            if !bounded_left || !bounded_right {
                continue;
            }
            let before = line[..start].trim_end();
            if before.ends_with('.') || before.ends_with("->") || before.ends_with('=') {
                continue;
            }
            let after = line[end..].trim_start();
            if after.is_empty() || after.starts_with(['(', ':', '{', '=']) {
                return true;
            }
        }
        false
    }

    /// Start line of the definition of `name`. Lines that are not
    /// `;`-terminated declarations are preferred.
    fn find_start(&self, name: &str) -> Option<usize> {
        let candidates: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| Self::defines(line, name))
            .map(|(i, _)| i)
            .collect();
        candidates
            .iter()
            .copied()
            .find(|&i| !self.lines[i].trim_end().ends_with(';'))
            .or_else(|| candidates.first().copied())
    }

    /// Last line of the block that starts at `start`.
    fn block_end(&self, start: usize) -> usize {
        if self.lines[start].trim_end().ends_with(':') {
            return self.indented_end(start);
        }
        let mut depth = 0i32;
        let mut opened = false;
        for (j, line) in self.lines.iter().enumerate().skip(start) {
            let code = line.split("//").next().unwrap_or(line);
            for c in code.chars() {
                match c {
                    '{' => {
                        depth += 1;
                        opened = true;
                    }
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            if opened && depth <= 0 {
                return j;
            }
            if !opened {
                if code.trim_end().ends_with(';') {
                    return j;
                }
                if j > start {
                    return self.indented_end(start);
                }
            }
        }
        if opened {
            self.lines.len() - 1
        } else {
            start
        }
    }

    fn indented_end(&self, start: usize) -> usize {
        let base = indent_of(&self.lines[start]);
        let mut end = start;
        for (j, line) in self.lines.iter().enumerate().skip(start + 1) {
            if line.trim().is_empty() {
                continue;
            }
            if indent_of(line) <= base {
                break;
            }
            end = j;
        }
        end
    }

    fn range(&self, name: &str) -> Option<(usize, usize)> {
        let start = self.find_start(name)?;
        Some((start, self.block_end(start)))
    }

    fn body(&self, name: &str) -> Vec<String> {
        match self.range(name) {
            Some((start, end)) if end > start => {
                let body = self.lines[start + 1..=end].iter().map(String::as_str);
                if self.python {
                    filter_python_statements(body)
                } else {
                    filter_statements(body)
                }
            }
            _ => Vec::new(),
        }
    }
}

impl Analyzer for GenericAnalyzer {
    fn extract_signature(&self, name: &str) -> Result<Option<String>> {
        Ok(self.find_start(name).map(|i| {
            let line = self.lines[i].trim().trim_end_matches(['{', ':', ';']);
            collapse_whitespace(line)
        }))
    }

    fn extract_implementation(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.body(name))
    }

    fn extract_behavior(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .body(name)
            .iter()
            .filter_map(|line| describe_statement(line))
            .collect())
    }

    fn extract_callchain(&self, name: &str) -> Result<Vec<String>> {
        let mut calls: Vec<String> = Vec::new();
        for line in self.body(name) {
            for caps in CALL.captures_iter(&line) {
                let callee = &caps[1];
                if NOT_CALLS.contains(&callee) || calls.iter().any(|c| c == callee) {
                    continue;
                }
                calls.push(callee.to_string());
            }
        }
        Ok(calls)
    }

    fn extract_definition(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .range(name)
            .map(|(start, end)| self.lines[start..=end].join("\n")))
    }

    fn locate(&self, name: &str) -> Result<Option<u32>> {
        Ok(self.find_start(name).map(|i| i as u32 + 1))
    }

    fn header_symbols(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for line in &self.lines {
            if line.starts_with(char::is_whitespace) {
                continue;
            }
            let found = KEYWORD_DEF
                .captures(line)
                .or_else(|| C_LIKE_DEF.captures(line))
                .map(|caps| caps[1].to_string());
            if let Some(name) = found {
                if !names.contains(&name) && !NOT_CALLS.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C_SOURCE: &str = "\
#include <stdio.h>

int helper(int x);

int helper(int x)
{
    // double it
    int y = x * 2;
    if (y > 10) {
        return 10;
    }
    log_value(y);
    return y;
}
";

    #[test]
    fn test_brace_block_prefers_definition_over_prototype() {
        let a = GenericAnalyzer::new(C_SOURCE);
        assert_eq!(a.locate("helper").unwrap(), Some(5));
        assert_eq!(
            a.extract_signature("helper").unwrap().as_deref(),
            Some("int helper(int x)")
        );
        let body = a.extract_implementation("helper").unwrap();
        assert_eq!(body.first().map(String::as_str), Some("int y = x * 2;"));
        assert!(body.iter().all(|l| !l.starts_with("//")));
        assert_eq!(body.last().map(String::as_str), Some("return y;"));
    }

    #[test]
    fn test_indented_block_and_calls() {
        let src = "def run(args):\n    data = load(args)\n    return process(data)\n\ndef other():\n    pass\n";
        let a = GenericAnalyzer::new(src);
        assert_eq!(
            a.extract_callchain("run").unwrap(),
            vec!["load".to_string(), "process".to_string()]
        );
        let behavior = a.extract_behavior("run").unwrap();
        assert_eq!(behavior[0], "Assignment: data = load(args)");
        assert_eq!(behavior[1], "Returns: return process(data)");
    }

    #[test]
    fn test_filter_statements() {
        let lines = ["  {", "", "  // note", "x = 1;", "}"];
        assert_eq!(filter_statements(lines), vec!["x = 1;".to_string()]);
    }
}
