use air::extraction::{LanguageExtractor, LanguageRegistry};
use air::types::*;

fn scan(path: &str, source: &str) -> ExtractionResult {
    let registry = LanguageRegistry::new();
    let extractor = registry
        .extractor_for_file(path)
        .unwrap_or_else(|| panic!("no extractor for {path}"));
    extractor.extract(path, source)
}

fn find<'r>(result: &'r ExtractionResult, name: &str) -> &'r ScannedSymbol {
    result
        .symbols
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("symbol {name} not found"))
}

fn deps(result: &ExtractionResult) -> Vec<String> {
    result
        .dependencies
        .iter()
        .map(|d| format!("{}:{}", d.verb, d.target))
        .collect()
}

#[test]
fn test_registry_dispatch() {
    let registry = LanguageRegistry::new();
    let lang = |p: &str| registry.extractor_for_file(p).map(|e| e.language());
    assert_eq!(lang("pkg/app.py"), Some(Language::Python));
    assert_eq!(lang("drv/uart.h"), Some(Language::C));
    assert_eq!(lang("gui/widget.hpp"), Some(Language::Cpp));
    assert_eq!(lang("src/lib.rs"), Some(Language::Rust));
    assert_eq!(lang("App.java"), Some(Language::Java));
    assert_eq!(lang("boot/start.S"), Some(Language::Asm));
    assert_eq!(lang("link.ld"), Some(Language::Ld));
    assert_eq!(lang("README.md"), None);
    assert_eq!(lang("Makefile"), None);

    let extensions = registry.supported_extensions();
    for ext in ["py", "c", "hpp", "rs", "java", "S", "lds"] {
        assert!(extensions.contains(&ext), "{ext}");
    }
}

#[test]
fn test_python_symbols_and_imports() {
    let source = "\
import os, numpy as np
from collections import OrderedDict
from . import sibling

class Engine:
    def start(self):
        pass

def main():
    Engine().start()
";
    let result = scan("app/engine.py", source);
    assert!(result.errors.is_empty());

    let engine = find(&result, "Engine");
    assert_eq!(engine.kind, "class");
    assert_eq!(engine.attrs.get("line").map(String::as_str), Some("5"));

    let start = find(&result, "start");
    assert_eq!(start.kind, "func");
    assert_eq!(start.attrs.get("class").map(String::as_str), Some("Engine"));

    assert!(find(&result, "main").is_entry());
    assert_eq!(
        deps(&result),
        ["import:[os]", "import:[numpy]", "import:[collections]"]
    );
}

#[test]
fn test_c_symbols_and_includes() {
    let source = "\
#include <stdio.h>
#include \"uart.h\"

struct packet { int len; };
static int counter = 0;

int main(void)
{
    return uart_send(counter);
}
";
    let result = scan("drv/main.c", source);
    assert_eq!(deps(&result), ["include:[stdio.h]", "include:[uart.h]"]);
    assert_eq!(find(&result, "packet").kind, "struct");
    assert_eq!(find(&result, "counter").kind, "var");
    let main = find(&result, "main");
    assert!(main.is_entry());
    assert_eq!(main.attrs.get("line").map(String::as_str), Some("7"));
}

#[test]
fn test_c_header_prototypes() {
    let result = scan("drv/uart.h", "int uart_send(int value);\n");
    let proto = find(&result, "uart_send");
    assert_eq!(proto.kind, "func");
    assert_eq!(proto.attrs.get("decl").map(String::as_str), Some("true"));

    // Prototypes in source files are not definitions.
    let result = scan("drv/uart.c", "int uart_send(int value);\n");
    assert!(result.symbols.is_empty());
}

#[test]
fn test_rust_items_and_uses() {
    let source = "\
#![no_std]
use core::fmt;
use crate::hal::{Pin, Port};

pub struct Led { pin: u8 }

impl Led {
    pub fn on(&self) {}
}

async fn poll() {}

fn main() {}
";
    let result = scan("src/main.rs", source);
    assert_eq!(find(&result, "Led").kind, "struct");
    assert!(find(&result, "main").is_entry());
    assert_eq!(find(&result, "poll").attrs.get("async").map(String::as_str), Some("true"));
    assert!(!find(&result, "on").is_entry());

    let deps = deps(&result);
    assert!(deps.contains(&"attr:[no_std]".to_string()));
    assert!(deps.contains(&"use:[core::fmt]".to_string()));
    assert!(deps.contains(&"use:[crate::hal::{Pin, Port}]".to_string()));
}

#[test]
fn test_java_classes_and_entry() {
    let source = "\
package demo;

import java.util.List;
import org.example.util.*;

public class App {
    public static void main(String[] args) {}
    void helper() {}
}
";
    let result = scan("src/App.java", source);
    assert_eq!(find(&result, "App").kind, "class");
    assert!(find(&result, "main").is_entry());
    let helper = find(&result, "helper");
    assert!(!helper.is_entry());
    assert_eq!(helper.attrs.get("class").map(String::as_str), Some("App"));
    assert_eq!(
        deps(&result),
        ["import:[java.util.List]", "import:[org.example.util]"]
    );
}

#[test]
fn test_asm_labels_and_calls() {
    let source = "\
    .globl _start
_start:
    ldr sp, =stack_top   @ set up the stack
    bl kmain
hang:
    b hang
";
    let result = scan("boot/start.S", source);
    let start = find(&result, "_start");
    assert_eq!(start.kind, "label");
    assert!(start.is_entry());
    assert_eq!(start.attrs.get("global").map(String::as_str), Some("true"));
    assert_eq!(start.attrs.get("line").map(String::as_str), Some("2"));
    assert!(!find(&result, "hang").is_entry());
    assert_eq!(deps(&result), ["call:[kmain]", "call:[hang]"]);
}

#[test]
fn test_linker_script_layout() {
    let source = "\
/* Board memory map */
ENTRY(_start)

MEMORY
{
    RAM (rwx) : ORIGIN = 0x80000000, LENGTH = 128M
}

SECTIONS
{
    . = 0x80000000;
    .text : { *(.text) } > RAM
    _stack_top = ORIGIN(RAM) + LENGTH(RAM);
}
";
    let result = scan("link.ld", source);
    let layout: Vec<(&str, &str)> = result
        .layout
        .iter()
        .map(|e| (e.key.as_str(), e.value.as_str()))
        .collect();
    assert_eq!(
        layout,
        [
            ("ENTRY", "_start"),
            ("RAM", "start=0x80000000 size=128M"),
            ("BASE", "0x80000000"),
            (".text", "start=unknown region=RAM"),
        ]
    );
    assert_eq!(find(&result, "_start").kind, "ld_entry");
    assert_eq!(find(&result, "_stack_top").kind, "var");
    assert_eq!(
        find(&result, "_stack_top").attrs.get("line").map(String::as_str),
        Some("13")
    );
}
