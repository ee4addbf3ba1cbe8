use std::sync::LazyLock;

use regex::Regex;

use crate::analysis::{collapse_whitespace, filter_statements, Analyzer};
use crate::errors::Result;
use crate::extraction::strip_ld_comments;

static SYMBOL_ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:PROVIDE\s*\(\s*)?(?P<name>[A-Za-z_][\w$]*)\s*=\s*(?P<value>[^;=]+?)\s*\)?\s*;")
        .expect("valid assignment regex")
});

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<name>\.[A-Za-z_][\w.]*)\s*(?P<address>[^:{]*?)\s*:").expect("valid section regex")
});

static REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<name>[A-Za-z_]\w*)\s*(?:\((?P<attrs>[^)]*)\))?\s*:\s*ORIGIN\s*=\s*(?P<origin>[^,\s]+)\s*,\s*LENGTH\s*=\s*(?P<length>[^\s,;]+)",
    )
    .expect("valid region regex")
});

static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ENTRY\s*\(\s*(?P<name>[A-Za-z_][\w.$]*)\s*\)").expect("valid entry regex")
});

/// Regex-based analyzer for linker scripts.
///
/// Answers for symbol assignments (`name = value;`), output sections
/// (`.text : { ... }`), memory regions and the `ENTRY(...)` symbol.
pub struct LdAnalyzer {
    lines: Vec<String>,
}

impl LdAnalyzer {
    pub fn new(source: &str) -> Self {
        Self {
            lines: strip_ld_comments(source)
                .lines()
                .map(str::to_string)
                .collect(),
        }
    }

    fn assignment(&self, name: &str) -> Option<(usize, String)> {
        self.lines.iter().enumerate().find_map(|(i, line)| {
            let caps = SYMBOL_ASSIGN.captures(line)?;
            (&caps["name"] == name).then(|| (i, caps["value"].trim().to_string()))
        })
    }

    fn section_start(&self, name: &str) -> Option<usize> {
        self.lines.iter().position(|line| {
            SECTION_HEADER
                .captures(line)
                .is_some_and(|caps| &caps["name"] == name)
        })
    }

    /// Lines `[start, end]` of the brace block opened at or after `start`.
    fn block(&self, start: usize) -> (usize, usize) {
        let mut depth = 0i32;
        let mut opened = false;
        for (j, line) in self.lines.iter().enumerate().skip(start) {
            for c in line.chars() {
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
                return (start, j);
            }
        }
        (start, start)
    }

    fn region(&self, name: &str) -> Option<(usize, String, String)> {
        self.lines.iter().enumerate().find_map(|(i, line)| {
            let caps = REGION.captures(line)?;
            (&caps["name"] == name).then(|| (i, caps["origin"].to_string(), caps["length"].to_string()))
        })
    }

    fn entry_line(&self, name: &str) -> Option<usize> {
        self.lines.iter().position(|line| {
            ENTRY
                .captures(line)
                .is_some_and(|caps| &caps["name"] == name)
        })
    }
}

impl Analyzer for LdAnalyzer {
    fn extract_signature(&self, name: &str) -> Result<Option<String>> {
        if let Some((_, value)) = self.assignment(name) {
            return Ok(Some(format!("{name} = {value}")));
        }
        if let Some(start) = self.section_start(name) {
            let header = self.lines[start].trim().trim_end_matches('{').trim();
            return Ok(Some(collapse_whitespace(header)));
        }
        Ok(self
            .entry_line(name)
            .map(|_| format!("ENTRY({name})")))
    }

    fn extract_implementation(&self, name: &str) -> Result<Vec<String>> {
        if let Some(start) = self.section_start(name) {
            let (start, end) = self.block(start);
            if end > start {
                return Ok(filter_statements(
                    self.lines[start + 1..=end].iter().map(String::as_str),
                ));
            }
        }
        Ok(self
            .assignment(name)
            .map(|(_, value)| vec![format!("{name} = {value};")])
            .unwrap_or_default())
    }

    fn extract_behavior(&self, name: &str) -> Result<Vec<String>> {
        let mut behavior = Vec::new();
        if self.entry_line(name).is_some() {
            behavior.push("program entry point".to_string());
        }
        if let Some((_, value)) = self.assignment(name) {
            behavior.push(format!("defines symbol {name} = {value}"));
        }
        if let Some(start) = self.section_start(name) {
            let address = SECTION_HEADER
                .captures(&self.lines[start])
                .map(|caps| caps["address"].trim().to_string())
                .filter(|a| !a.is_empty());
            match address {
                Some(address) => behavior.push(format!("places section {name} at {address}")),
                None => behavior.push(format!("places section {name}")),
            }
        }
        if let Some((_, origin, length)) = self.region(name) {
            behavior.push(format!("memory region origin={origin} length={length}"));
        }
        Ok(behavior)
    }

    /// Linker scripts call nothing.
    fn extract_callchain(&self, _name: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn extract_definition(&self, name: &str) -> Result<Option<String>> {
        if let Some(start) = self.section_start(name) {
            let (start, end) = self.block(start);
            return Ok(Some(self.lines[start..=end].join("\n")));
        }
        let line = self
            .assignment(name)
            .map(|(i, _)| i)
            .or_else(|| self.region(name).map(|(i, _, _)| i))
            .or_else(|| self.entry_line(name));
        Ok(line.map(|i| self.lines[i].trim().to_string()))
    }

    fn locate(&self, name: &str) -> Result<Option<u32>> {
        let line = self
            .entry_line(name)
            .or_else(|| self.assignment(name).map(|(i, _)| i))
            .or_else(|| self.section_start(name))
            .or_else(|| self.region(name).map(|(i, _, _)| i));
        Ok(line.map(|i| i as u32 + 1))
    }

    fn header_symbols(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for line in &self.lines {
            let name = SYMBOL_ASSIGN
                .captures(line)
                .map(|caps| caps["name"].to_string());
            if let Some(name) = name {
                if !names.contains(&name) {
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

    const SCRIPT: &str = "\
ENTRY(_start)
/* layout */
SECTIONS
{
    . = 0x80000000;
    .text : {
        *(.text.boot)
        *(.text*)
    }
    _end = .;
}
";

    #[test]
    fn test_section_and_symbol_queries() {
        let a = LdAnalyzer::new(SCRIPT);
        assert_eq!(a.locate("_start").unwrap(), Some(1));
        assert_eq!(a.locate("_end").unwrap(), Some(10));
        assert_eq!(
            a.extract_implementation(".text").unwrap(),
            vec!["*(.text.boot)", "*(.text*)"]
        );
        assert_eq!(
            a.extract_signature("_end").unwrap().as_deref(),
            Some("_end = .")
        );
        assert_eq!(
            a.extract_behavior("_start").unwrap(),
            vec!["program entry point"]
        );
    }
}
