use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::analysis::Analyzer;
use crate::errors::Result;
use crate::extraction::{call_target, strip_asm_comment, ASM_INSTRUCTION, ASM_LABEL};
use crate::types::AsmInfo;

/// `.L1:`, `1:` and other labels local to a routine.
static LOCAL_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\.[\w$.]+|\d+):").expect("valid local label regex"));

/// Instructions that transfer control.
const CONTROL_FLOW: &[&str] = &[
    // x86
    "jmp", "je", "jne", "jz", "jnz", "jg", "jl", "jge", "jle", "ja", "jb", "jae", "jbe", "call",
    "ret", "loop", "iret", // RISC-V
    "beq", "bne", "blt", "bge", "bltu", "bgeu", "beqz", "bnez", "j", "jal", "jalr", "jr", "tail",
    // ARM
    "b", "bl", "bx", "blx", "cbz", "cbnz", "br", "bra",
];

const SYSCALLS: &[&str] = &["syscall", "int", "svc", "ecall", "ebreak", "eret", "mret", "sret"];

/// Maps an opcode to a short description of its effect.
fn describe_opcode(opcode: &str) -> Option<&'static str> {
    let description = match opcode {
        "push" | "pop" | "pusha" | "popa" | "pushf" | "popf" => "manipulates stack",
        "mov" | "lea" | "movsx" | "movzx" | "movsxd" | "cmov" | "li" | "la" | "mv" => "moves data",
        "add" | "addi" | "sub" | "mul" | "div" | "imul" | "idiv" | "neg" | "inc" | "dec" | "adc"
        | "sbb" => "performs arithmetic",
        "and" | "andi" | "or" | "ori" | "xor" | "xori" | "not" | "shl" | "shr" | "sar" | "rol"
        | "ror" | "sll" | "srl" | "sra" => "performs logic operation",
        "cmp" | "test" => "compares values",
        "jmp" | "je" | "jne" | "jz" | "jnz" | "jg" | "jl" | "jge" | "jle" | "ja" | "jb" | "jae"
        | "jbe" | "loop" | "beq" | "bne" | "blt" | "bge" | "bltu" | "bgeu" | "beqz" | "bnez"
        | "j" | "cbz" | "cbnz" => "branches",
        "jal" | "jalr" | "b" | "bl" | "bx" | "blx" => "branches or calls",
        "call" | "tail" => "calls function",
        "ret" | "iret" | "eret" | "mret" | "sret" => "returns",
        "lock" | "xadd" | "cmpxchg" | "lr" | "sc" | "amoswap" | "amoadd" => "atomic operation",
        "ldr" | "str" | "ld" | "st" | "lw" | "sw" | "lb" | "sb" | "lh" | "sh" | "sd" | "load"
        | "store" => "accesses memory",
        "clc" | "stc" | "cmc" | "cld" | "std" | "cli" | "sti" => "manipulates flags",
        op if SYSCALLS.contains(&op) => "system call",
        op if op.starts_with("csr") => "accesses control register",
        op if op.starts_with("sse") || op.starts_with("avx") || op.starts_with("mmx") => {
            "performs SIMD operation"
        }
        _ => return None,
    };
    Some(description)
}

/// Branch target of a control-flow instruction, when it names one.
fn branch_target(opcode: &str, operands: &str) -> Option<String> {
    let parts: Vec<&str> = operands
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let min_parts = match opcode {
        "beq" | "bne" | "blt" | "bge" | "bltu" | "bgeu" => 3,
        "jal" | "jalr" | "beqz" | "bnez" | "cbz" | "cbnz" => 2,
        _ => 1,
    };
    if parts.len() < min_parts {
        return None;
    }
    parts.last().map(|p| p.to_string())
}

/// One decoded instruction line.
struct Instruction {
    opcode: String,
    operands: String,
    text: String,
}

/// Regex-based analyzer for assembly sources.
///
/// A routine spans from its label to the next non-local label.
pub struct AsmAnalyzer {
    lines: Vec<String>,
    labels: HashMap<String, usize>,
}

impl AsmAnalyzer {
    pub fn new(source: &str) -> Self {
        let lines: Vec<String> = source
            .lines()
            .map(|l| strip_asm_comment(l).trim_end().to_string())
            .collect();
        let mut labels = HashMap::new();
        for (i, line) in lines.iter().enumerate() {
            if let Some(caps) = ASM_LABEL.captures(line) {
                labels.entry(caps[1].to_string()).or_insert(i);
            }
        }
        Self { lines, labels }
    }

    /// Line range `[start, end)` of the routine labelled `name`.
    fn routine(&self, name: &str) -> Option<(usize, usize)> {
        let start = *self.labels.get(name)?;
        let end = self
            .lines
            .iter()
            .enumerate()
            .skip(start + 1)
            .find(|(_, line)| ASM_LABEL.is_match(line))
            .map_or(self.lines.len(), |(i, _)| i);
        Some((start, end))
    }

    fn instructions(&self, name: &str) -> Vec<Instruction> {
        let Some((start, end)) = self.routine(name) else {
            return Vec::new();
        };
        self.lines[start..end]
            .iter()
            .filter_map(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('.') {
                    return None;
                }
                let caps = ASM_INSTRUCTION.captures(trimmed)?;
                let opcode = caps.name("opcode")?.as_str().to_ascii_lowercase();
                let operands = caps
                    .name("operands")
                    .map_or("", |m| m.as_str())
                    .trim()
                    .to_string();
                let text = format!("{opcode} {operands}").trim().to_string();
                Some(Instruction {
                    opcode,
                    operands,
                    text,
                })
            })
            .collect()
    }
}

impl Analyzer for AsmAnalyzer {
    /// Assembly routines have no declared signature.
    fn extract_signature(&self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn extract_implementation(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.instructions(name).into_iter().map(|i| i.text).collect())
    }

    fn extract_behavior(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .instructions(name)
            .iter()
            .filter_map(|i| describe_opcode(&i.opcode))
            .map(str::to_string)
            .collect())
    }

    fn extract_callchain(&self, name: &str) -> Result<Vec<String>> {
        let mut calls: Vec<String> = Vec::new();
        for instruction in self.instructions(name) {
            if let Some(target) = call_target(&instruction.opcode, &instruction.operands) {
                if !calls.contains(&target) {
                    calls.push(target);
                }
            }
        }
        Ok(calls)
    }

    fn extract_asm_info(&self, name: &str) -> Result<AsmInfo> {
        let Some((start, end)) = self.routine(name) else {
            return Ok(AsmInfo::default());
        };
        let mut labels = vec![name.to_string()];
        labels.extend(
            self.lines[start + 1..end]
                .iter()
                .filter_map(|line| LOCAL_LABEL.captures(line))
                .map(|caps| caps[1].to_string()),
        );
        let flow = self
            .instructions(name)
            .into_iter()
            .filter(|i| CONTROL_FLOW.contains(&i.opcode.as_str()))
            .map(|i| match branch_target(&i.opcode, &i.operands) {
                Some(target) => format!("{} {}", i.opcode, target),
                None => i.text,
            })
            .collect();
        Ok(AsmInfo { labels, flow })
    }

    fn extract_definition(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .routine(name)
            .map(|(start, end)| self.lines[start..end].join("\n").trim_end().to_string()))
    }

    fn locate(&self, name: &str) -> Result<Option<u32>> {
        Ok(self.labels.get(name).map(|&i| i as u32 + 1))
    }

    fn header_symbols(&self) -> Result<Vec<String>> {
        let mut names: Vec<(usize, String)> =
            self.labels.iter().map(|(n, &i)| (i, n.clone())).collect();
        names.sort();
        Ok(names.into_iter().map(|(_, n)| n).collect())
    }
}
