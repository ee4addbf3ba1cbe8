use air::errors::AirError;
use air::ir::{parse_pir, parse_pir_from, write_pir};
use air::types::*;

const VALID: &str = "\
<pir>
<meta>
name: kernel
root: /work/kernel
profile: auto
lang: ASM,C
</meta>
<units>
u0: boot/start.S type=ASM role=entry module=boot
u1: kernel/main.c type=C role=lib module=kernel
</units>
<dependency-pool>
d0: call:[u1#kmain]
d1: include:[stdlib:c]
</dependency-pool>
<dependencies>
u0->refs:[d0]
u1->refs:[d1]
</dependencies>
<symbols>
_start:u0 label entry=true line=3
kmain:u1 func line=5
</symbols>
<layout>
ENTRY: _start
RAM: start=0x80000000 size=128M
</layout>
<code-snippets>
<snippet unit=\"u1\">
<![CDATA[
void kmain(void) {
    for (;;) {}
}
]]>
</snippet>
</code-snippets>
</pir>
";

fn parse_error_line(text: &str) -> Option<u32> {
    match parse_pir(text) {
        Err(AirError::Parse { line, .. }) => line,
        other => panic!("expected parse error, got {:?}", other.map(|m| m.units().len())),
    }
}

#[test]
fn test_parse_valid_document() {
    let model = parse_pir(VALID).unwrap();
    assert_eq!(model.meta().name, "kernel");
    assert_eq!(model.units().len(), 2);
    assert_eq!(model.units()[0].language, Language::Asm);
    assert_eq!(model.symbols()[0].attrs.get("entry").map(String::as_str), Some("true"));
    assert_eq!(model.dependencies().refs(UnitId(0)), [0]);
    assert_eq!(model.layout()[1].value, "start=0x80000000 size=128M");
    assert_eq!(model.snippets()[0].content, "void kmain(void) {\n    for (;;) {}\n}");
    assert!(model.is_finalized());
}

#[test]
fn test_valid_document_round_trips() {
    let model = parse_pir(VALID).unwrap();
    assert_eq!(write_pir(&model).unwrap(), VALID);
}

#[test]
fn test_missing_envelope() {
    assert_eq!(parse_error_line("<meta>\n</meta>\n"), Some(1));
    assert_eq!(parse_error_line("<pir>\n<meta>\nname: x\n</meta>\n"), Some(4));
}

#[test]
fn test_unknown_and_unbalanced_blocks() {
    assert_eq!(parse_error_line("<pir>\n<bogus>\n</bogus>\n</pir>\n"), Some(2));
    assert_eq!(parse_error_line("<pir>\n</units>\n</pir>\n"), Some(2));
    assert_eq!(parse_error_line("<pir>\n<units>\n</pir>\n"), Some(2));
}

#[test]
fn test_content_outside_block() {
    assert_eq!(parse_error_line("<pir>\nname: x\n</pir>\n"), Some(2));
}

#[test]
fn test_non_positional_unit_id() {
    let text = "<pir>\n<units>\nu1: a.py type=PY role=lib module=root\n</units>\n</pir>\n";
    assert_eq!(parse_error_line(text), Some(3));
}

#[test]
fn test_symbol_with_unknown_unit() {
    let text = "\
<pir>
<units>
u0: a.py type=PY role=lib module=root
</units>
<symbols>
run:u3 func line=1
</symbols>
</pir>
";
    assert_eq!(parse_error_line(text), Some(6));
}

#[test]
fn test_dependency_naming_unknown_pool_id() {
    let text = "\
<pir>
<units>
u0: a.py type=PY role=lib module=root
</units>
<dependency-pool>
d0: import:[os]
</dependency-pool>
<dependencies>
u0->refs:[d0 d4]
</dependencies>
</pir>
";
    assert!(matches!(parse_pir(text), Err(AirError::Parse { .. })));
}

#[test]
fn test_unterminated_cdata() {
    let text = "\
<pir>
<units>
u0: a.py type=PY role=lib module=root
</units>
<code-snippets>
<snippet unit=\"u0\">
<![CDATA[
x = 1
</code-snippets>
</pir>
";
    assert_eq!(parse_error_line(text), Some(7));
}

#[test]
fn test_error_names_origin() {
    match parse_pir_from("<units>", "out/kernel.pir") {
        Err(AirError::Parse { path, .. }) => assert_eq!(path, "out/kernel.pir"),
        _ => panic!("expected parse error"),
    }
}
