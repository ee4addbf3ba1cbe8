/// Line-pattern based assembly forward extractor.
use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;

use crate::types::{ExtractionResult, Language, RawDependency, ScannedSymbol};

/// `name:` at the start of a line. Local labels (`.L1:`, `1:`) are excluded.
pub(crate) static ASM_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][\w$]*):").expect("valid label regex"));

/// `.globl name` / `.global name`.
static ASM_GLOBAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\.globa?l\s+([A-Za-z_][\w$]*)").expect("valid global regex")
});

/// Optional label, then opcode and operands.
pub(crate) static ASM_INSTRUCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[A-Za-z_][\w$]*:\s*)?(?P<opcode>[A-Za-z][\w.]*)(?:\s+(?P<operands>.*))?$")
        .expect("valid instruction regex")
});

/// Opcodes whose last operand names a called routine.
pub(crate) const CALL_OPCODES: &[&str] = &["call", "bl", "b", "jal", "tail"];

/// Entry symbols recognised across toolchains.
const ENTRY_LABELS: &[&str] = &["_start", "main", "_reset", "reset_handler", "Reset_Handler"];

/// Removes `;`, `#` and `//` comments from an assembly line.
pub(crate) fn strip_asm_comment(line: &str) -> &str {
    let mut end = line.len();
    for marker in [";", "#", "//", "@"] {
        if let Some(pos) = line.find(marker) {
            // `#1` immediates are operands, not comments, on ARM.
            if marker == "#" && line[pos + 1..].starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            end = end.min(pos);
        }
    }
    &line[..end]
}

/// Returns the called symbol of a call-like instruction, if any.
pub(crate) fn call_target(opcode: &str, operands: &str) -> Option<String> {
    if !CALL_OPCODES.contains(&opcode.to_ascii_lowercase().as_str()) {
        return None;
    }
    let target = operands.rsplit(',').next()?.trim();
    let is_symbol = target
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && target.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.');
    is_symbol.then(|| target.to_string())
}

/// Extracts labels and call edges from assembly sources.
pub struct AsmExtractor;

impl AsmExtractor {
    pub fn extract(_file_path: &str, source: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut result = ExtractionResult::default();
        let mut globals = Vec::new();

        for (i, raw) in source.lines().enumerate() {
            let line = strip_asm_comment(raw);
            if let Some(caps) = ASM_GLOBAL.captures(line) {
                globals.push(caps[1].to_string());
                continue;
            }
            if let Some(caps) = ASM_LABEL.captures(line) {
                let name = &caps[1];
                let mut symbol = ScannedSymbol::new(name, "label", i as u32 + 1);
                if ENTRY_LABELS.contains(&name) {
                    symbol = symbol.entry();
                }
                result.symbols.push(symbol);
            }
            if let Some(caps) = ASM_INSTRUCTION.captures(line) {
                let opcode = caps.name("opcode").map_or("", |m| m.as_str());
                let operands = caps.name("operands").map_or("", |m| m.as_str());
                if let Some(target) = call_target(opcode, operands) {
                    result
                        .dependencies
                        .push(RawDependency::bracketed("call", &target));
                }
            }
        }

        for symbol in &mut result.symbols {
            if globals.contains(&symbol.name) {
                symbol.attrs.insert("global".to_string(), "true".to_string());
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }
}

impl crate::extraction::LanguageExtractor for AsmExtractor {
    fn extensions(&self) -> &[&str] {
        &["s", "S", "asm"]
    }

    fn language(&self) -> Language {
        Language::Asm
    }

    fn extract(&self, file_path: &str, source: &str) -> ExtractionResult {
        AsmExtractor::extract(file_path, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comment_keeps_immediates() {
        assert_eq!(strip_asm_comment("mov r0, #1 ; set"), "mov r0, #1 ");
        assert_eq!(strip_asm_comment("  li a0, 0  # zero"), "  li a0, 0  ");
    }

    #[test]
    fn test_call_target_takes_last_operand() {
        assert_eq!(call_target("jal", "ra, kmain"), Some("kmain".to_string()));
        assert_eq!(call_target("call", "printf"), Some("printf".to_string()));
        assert_eq!(call_target("bl", "0x1000"), None);
        assert_eq!(call_target("mov", "eax, 1"), None);
    }
}
