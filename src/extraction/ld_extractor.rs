/// Line-pattern based linker-script forward extractor.
///
/// Besides symbols, linker scripts contribute the project's `<layout>`
/// records: the entry symbol, the base address, memory regions and the
/// placement of output sections.
use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;

use crate::types::{ExtractionResult, Language, LayoutEntry, ScannedSymbol};

static LD_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ENTRY\s*\(\s*([A-Za-z_][\w.$]*)\s*\)").expect("valid entry regex"));

static LD_BASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\.\s*=\s*(0[xX][0-9A-Fa-f]+|\d+)\s*;").expect("valid base regex"));

static LD_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_]\w*)\s*(?:\([^)]*\))?\s*:\s*ORIGIN\s*=\s*([^,\s]+)\s*,\s*LENGTH\s*=\s*([^\s,;]+)")
        .expect("valid region regex")
});

static LD_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\.[A-Za-z_][\w.]*)\s*(0[xX][0-9A-Fa-f]+)?\s*(?:\([^)]*\))?\s*:")
        .expect("valid section regex")
});

static LD_ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:PROVIDE\s*\(\s*)?([A-Za-z_][\w$]*)\s*=\s*[^;=]+;").expect("valid assign regex")
});

/// Strips `/* ... */` and `//` comments.
pub(crate) fn strip_ld_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => {
                // Keep line numbering stable.
                let comment = &rest[start..start + 2 + end + 2];
                out.extend(comment.chars().filter(|&c| c == '\n'));
                rest = &rest[start + 2 + end + 2..];
            }
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out.lines()
        .map(|l| l.split("//").next().unwrap_or(l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracts layout records and symbols from linker scripts.
pub struct LdExtractor;

impl LdExtractor {
    pub fn extract(_file_path: &str, source: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut result = ExtractionResult::default();
        let code = strip_ld_comments(source);
        let mut base_seen = false;

        for (i, line) in code.lines().enumerate() {
            let lineno = i as u32 + 1;

            if let Some(caps) = LD_ENTRY.captures(line) {
                let name = &caps[1];
                result.layout.push(layout("ENTRY", name));
                result
                    .symbols
                    .push(ScannedSymbol::new(name, "ld_entry", lineno));
                continue;
            }
            if let Some(caps) = LD_BASE.captures(line) {
                if !base_seen {
                    result.layout.push(layout("BASE", &caps[1]));
                    base_seen = true;
                }
                continue;
            }
            if let Some(caps) = LD_REGION.captures(line) {
                result.layout.push(layout(
                    &caps[1],
                    &format!("start={} size={}", &caps[2], &caps[3]),
                ));
                continue;
            }
            if let Some(caps) = LD_SECTION.captures(line) {
                let start = caps.get(2).map_or("unknown", |m| m.as_str());
                let mut value = format!("start={start}");
                if let Some(region) = line.split('>').nth(1) {
                    let region = region.trim().trim_end_matches(';').trim();
                    if !region.is_empty() {
                        value.push_str(&format!(" region={region}"));
                    }
                }
                result.layout.push(layout(&caps[1], &value));
                continue;
            }
            if let Some(caps) = LD_ASSIGN.captures(line) {
                result
                    .symbols
                    .push(ScannedSymbol::new(&caps[1], "var", lineno));
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }
}

fn layout(key: &str, value: &str) -> LayoutEntry {
    LayoutEntry {
        key: key.to_string(),
        value: value.to_string(),
    }
}

impl crate::extraction::LanguageExtractor for LdExtractor {
    fn extensions(&self) -> &[&str] {
        &["ld", "lds"]
    }

    fn language(&self) -> Language {
        Language::Ld
    }

    fn extract(&self, file_path: &str, source: &str) -> ExtractionResult {
        LdExtractor::extract(file_path, source)
    }
}
