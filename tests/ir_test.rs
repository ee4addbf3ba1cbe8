use air::errors::AirError;
use air::ir::{parse_pir, write_pir, ProjectIr, ProjectMeta, ProjectModel};
use air::types::*;

fn two_unit_model() -> ProjectModel {
    let mut model = ProjectModel::new(ProjectMeta::new("demo", "/src/demo", "auto"));
    let a = model.add_unit("app/main.py", Language::Python, "entry", "app");
    let b = model.add_unit("lib/util.c", Language::C, "lib", "lib");
    model
        .add_symbol(Symbol::new("main", a, "func").with_attr("entry", "true").with_attr("line", "4"))
        .unwrap();
    model
        .add_symbol(Symbol::new("checksum", b, "func").with_attr("line", "12"))
        .unwrap();
    model.add_dependency(a, "import", "[os]").unwrap();
    model.add_dependency(a, "call", "[checksum]").unwrap();
    model.add_dependency(b, "include", "[stdio.h]").unwrap();
    model.add_dependency(b, "include", "[util.h]").unwrap();
    model
}

#[test]
fn test_pipeline_canonicalizes_and_interns() {
    let mut model = two_unit_model();
    model.canonicalize_dependencies().unwrap();
    model.resolve_symbol_dependencies().unwrap();
    model.finalize_dependencies().unwrap();

    let pool = model.dependencies().pool().unwrap();
    assert_eq!(
        pool,
        [
            "call:[u1#checksum]",
            "import:[stdlib:py]",
            "include:[stdlib:c]",
            "include:[util.h]",
        ]
    );
    // Per-unit order is insertion order, not pool order.
    assert_eq!(model.dependencies().refs(UnitId(0)), [1, 0]);
    assert_eq!(model.dependencies().refs(UnitId(1)), [2, 3]);
}

#[test]
fn test_finalize_guard() {
    let mut model = two_unit_model();
    model.finalize_dependencies().unwrap();
    let before = model.dependencies().pool().unwrap().to_vec();

    assert!(matches!(
        model.finalize_dependencies(),
        Err(AirError::DependenciesFinalized { .. })
    ));
    assert!(matches!(
        model.add_dependency(UnitId(0), "import", "[json]"),
        Err(AirError::DependenciesFinalized { .. })
    ));
    assert!(matches!(
        model.canonicalize_dependencies(),
        Err(AirError::DependenciesFinalized { .. })
    ));
    assert_eq!(model.dependencies().pool().unwrap(), before.as_slice());
}

#[test]
fn test_write_before_finalize_fails() {
    let model = two_unit_model();
    assert!(matches!(
        write_pir(&model),
        Err(AirError::DependenciesNotFinalized { .. })
    ));
    assert!(matches!(
        model.freeze(),
        Err(AirError::DependenciesNotFinalized { .. })
    ));
}

#[test]
fn test_unknown_unit_is_rejected() {
    let mut model = two_unit_model();
    assert!(matches!(
        model.add_symbol(Symbol::new("ghost", UnitId(9), "func")),
        Err(AirError::UnknownUnit { .. })
    ));
    assert!(matches!(
        model.add_dependency(UnitId(9), "import", "[x]"),
        Err(AirError::UnknownUnit { .. })
    ));
}

#[test]
fn test_duplicate_path_reuses_unit() {
    let mut model = ProjectModel::new(ProjectMeta::new("d", ".", "auto"));
    let first = model.add_unit("a.py", Language::Python, "lib", "root");
    let again = model.add_unit("a.py", Language::Python, "entry", "root");
    assert_eq!(first, again);
    assert_eq!(model.units().len(), 1);
}

#[test]
fn test_written_document_shape() {
    let mut model = two_unit_model();
    model.canonicalize_dependencies().unwrap();
    model.resolve_symbol_dependencies().unwrap();
    model.finalize_dependencies().unwrap();
    let text = write_pir(&model).unwrap();

    assert!(text.starts_with("<pir>\n<meta>\nname: demo\nroot: /src/demo\nprofile: auto\n"));
    assert!(text.contains("lang: C,PY\n"));
    assert!(text.contains("u0: app/main.py type=PY role=entry module=app\n"));
    assert!(text.contains("<dependencies>\nu0->refs:[d1 d0]\nu1->refs:[d2 d3]\n</dependencies>\n"));
    assert!(text.contains("main:u0 func entry=true line=4\n"));
    assert!(!text.contains("<layout>"));
    assert!(text.ends_with("</pir>\n"));
}

#[test]
fn test_round_trip_is_stable() {
    let mut model = two_unit_model();
    model.add_layout("ENTRY", "main");
    model.add_snippet(UnitId(1), "int checksum(void) {\n    return 0;\n}").unwrap();
    model.canonicalize_dependencies().unwrap();
    model.finalize_dependencies().unwrap();
    let text = write_pir(&model).unwrap();

    let parsed = parse_pir(&text).unwrap();
    assert_eq!(write_pir(&parsed).unwrap(), text);

    let ir = ProjectIr::parse(&text).unwrap();
    assert_eq!(ir.to_pir_string().unwrap(), text);
    assert_eq!(ir.snippets_of(UnitId(1)), vec!["int checksum(void) {\n    return 0;\n}"]);
    assert_eq!(ir.layout_value("ENTRY"), Some("main"));
}

#[test]
fn test_index_lookups() {
    let mut model = two_unit_model();
    model
        .add_symbol(Symbol::new("main", UnitId(1), "func").with_attr("line", "1"))
        .unwrap();
    model.finalize_dependencies().unwrap();
    let ir = model.freeze().unwrap();

    assert_eq!(ir.units_defining("main"), vec![UnitId(0), UnitId(1)]);
    assert_eq!(ir.entries_named("main").len(), 1);
    assert_eq!(ir.symbols_of(UnitId(1)).len(), 2);
    assert!(ir.symbol_in_unit(UnitId(1), "checksum").is_some());
    assert!(ir.unit_by_ref("u01").is_none());
    assert_eq!(ir.unit_by_ref("u1").map(|u| u.path.as_str()), Some("lib/util.c"));
}

#[test]
fn test_stats() {
    let mut model = two_unit_model();
    model.finalize_dependencies().unwrap();
    let stats = model.stats();
    assert_eq!(stats.name, "demo");
    assert_eq!(stats.unit_count, 2);
    assert_eq!(stats.symbol_count, 2);
    assert_eq!(stats.dependency_count, 4);
    assert_eq!(stats.units_by_language.get("PY"), Some(&1));
    assert_eq!(stats.symbols_by_kind.get("func"), Some(&2));
}

#[test]
fn test_writer_rejects_spaced_attribute() {
    let mut model = ProjectModel::new(ProjectMeta::new("d", ".", "auto"));
    let uid = model.add_unit("a.rs", Language::Rust, "lib", "root");
    let mut symbol = Symbol::new("show", uid, "func");
    symbol.attrs.insert("impl".to_string(), "(u8, u16)".to_string());
    model.add_symbol(symbol).unwrap();
    model.finalize_dependencies().unwrap();
    assert!(matches!(
        write_pir(&model),
        Err(AirError::InvalidSymbol { .. })
    ));
}
