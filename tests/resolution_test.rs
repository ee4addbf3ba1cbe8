use air::ir::ProjectIr;
use air::resolution::Resolver;
use air::types::*;

const PIR: &str = "\
<pir>
<meta>
name: mixed
</meta>
<units>
u0: app/a.py type=PY role=entry module=app
u1: lib/b.c type=C role=lib module=lib
u2: lib/c.c type=C role=lib module=lib
u3: tools/d.py type=PY role=entry module=tools
</units>
<symbols>
run:u0 func entry=true line=3
f:u0 func line=9
helper:u1 func line=2
g:u2 func line=4
helper:u3 func line=6
main:u0 func entry=true line=12
main:u3 func entry=true line=1
</symbols>
<layout>
RAM: start=0x20000000 size=64K
</layout>
</pir>
";

fn resolve(need_type: NeedType, reference: &str) -> ResolvedRef {
    let ir = ProjectIr::parse(PIR).unwrap();
    Resolver::new(&ir).resolve(&Need::new(need_type, reference, View::Exist))
}

#[test]
fn test_unit_qualified_ref_wins_over_unique_name() {
    // `g` is unique in u2, but the qualified form must decide first.
    let r = resolve(NeedType::Symbol, "u2#g");
    assert_eq!(r.kind, RefKind::Symbol);
    assert_eq!(r.unit, Some(UnitId(2)));

    let r = resolve(NeedType::Symbol, "u0#g");
    assert!(r.is_missing());
}

#[test]
fn test_unit_ref() {
    let r = resolve(NeedType::Unit, "u3");
    assert_eq!(r.kind, RefKind::Unit);
    assert_eq!(r.path.as_deref(), Some("tools/d.py"));

    assert!(resolve(NeedType::Unit, "u9").is_missing());
}

#[test]
fn test_layout_need() {
    let r = resolve(NeedType::Layout, "RAM");
    assert_eq!(r.kind, RefKind::Layout);
    assert_eq!(r.symbol.as_deref(), Some("RAM"));

    assert!(resolve(NeedType::Layout, "FLASH").is_missing());
}

#[test]
fn test_single_entry() {
    let r = resolve(NeedType::Entry, "run");
    assert_eq!(r.kind, RefKind::Symbol);
    assert_eq!(r.unit, Some(UnitId(0)));
    assert_eq!(r.path.as_deref(), Some("app/a.py"));
}

#[test]
fn test_ambiguous_entries() {
    let r = resolve(NeedType::Entry, "main");
    assert!(r.is_ambiguous());
    let refs: Vec<&str> = r.suggestions.iter().map(|s| s.reference.as_str()).collect();
    assert_eq!(refs, ["u0#main", "u3#main"]);
    assert!(r.suggestions.iter().all(|s| s.entry));
}

#[test]
fn test_ambiguity_completeness() {
    let r = resolve(NeedType::Symbol, "helper");
    assert!(r.is_ambiguous());
    assert_eq!(r.suggestions.len(), 2);
    assert_eq!(r.suggestions[0].reference, "u1#helper");
    assert_eq!(r.suggestions[0].desc, "func in C");
    assert_eq!(r.suggestions[1].reference, "u3#helper");
    assert_eq!(r.suggestions[1].desc, "func in PY");
    assert_eq!(r.suggestions[1].kind, "func");
}

#[test]
fn test_unique_name() {
    let r = resolve(NeedType::Symbol, "f");
    assert_eq!(r.kind, RefKind::Symbol);
    assert_eq!(r.unit, Some(UnitId(0)));
    assert_eq!(r.symbol.as_deref(), Some("f"));
}

#[test]
fn test_unknown_name_is_missing() {
    let r = resolve(NeedType::Symbol, "nonexistent");
    assert!(r.is_missing());
    assert!(r.suggestions.is_empty());
}
