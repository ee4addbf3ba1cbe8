use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use air::analysis::Analyzer;
use air::errors::Result;
use air::evidence::{
    answer, format_evidence_as_pces, peek, EvidenceBuilder, Extractor, SourceMap,
};
use air::ir::ProjectIr;
use air::resolution::Resolver;
use air::types::*;

const RUN_PIR: &str = "\
<pir>
<meta>
name: scenario
</meta>
<units>
u0: a.py type=PY role=entry module=root
</units>
<symbols>
run:u0 func entry=true line=4
</symbols>
<layout>
RAM: start=0x20000000 size=64K
</layout>
</pir>
";

const RUN_SOURCE: &str = "import os\n\n\ndef run():\n    return os.getcwd()\n";

fn run_ir() -> ProjectIr {
    ProjectIr::parse(RUN_PIR).unwrap()
}

fn sources(pairs: &[(u32, &str)]) -> SourceMap {
    pairs
        .iter()
        .map(|(uid, text)| (UnitId(*uid), text.to_string()))
        .collect()
}

fn pcr(needs: &[&str]) -> String {
    let body: Vec<String> = needs.iter().map(|n| format!("<need> {n} </need>")).collect();
    format!("<pcr>\n{}\n</pcr>\n", body.join("\n"))
}

#[test]
fn test_entry_exist_reports_location() {
    let ir = run_ir();
    let evidence = answer(
        &ir,
        sources(&[(0, RUN_SOURCE)]),
        &pcr(&["type:entry ref:run view:exist"]),
    )
    .unwrap();

    assert_eq!(evidence.len(), 1);
    let e = &evidence[0];
    assert_eq!(e.reference, "run");
    assert_eq!(e.view, View::Exist);
    assert_eq!(e.source, EvidenceSource::Unit(UnitId(0)));
    assert_eq!(e.content.text("status"), Some("yes"));
    assert_eq!(e.content.text("location"), Some("a.py:4"));
}

#[test]
fn test_exist_without_source_uses_recorded_line() {
    let ir = run_ir();
    let evidence = answer(&ir, SourceMap::new(), &pcr(&["type:entry ref:run view:exist"])).unwrap();
    assert_eq!(evidence[0].content.text("location"), Some("a.py:4"));
}

#[test]
fn test_ambiguous_definition() {
    let text = "\
<pir>
<meta>
name: dup
</meta>
<units>
u0: a.py type=PY role=lib module=root
u1: other.py type=PY role=lib module=root
u2: b.c type=C role=lib module=root
</units>
<symbols>
helper:u0 func line=1
other:u1 func line=1
helper:u2 func line=3
</symbols>
</pir>
";
    let ir = ProjectIr::parse(text).unwrap();
    let evidence = answer(&ir, SourceMap::new(), &pcr(&["type:symbol ref:helper view:definition"])).unwrap();

    let e = &evidence[0];
    assert_eq!(e.source, EvidenceSource::Unknown);
    assert_eq!(e.content.text("status"), Some("ambiguous"));
    let Some(ContentValue::Suggestions(suggestions)) = e.content.get("suggestions") else {
        panic!("expected suggestions");
    };
    let pairs: Vec<(&str, &str)> = suggestions
        .iter()
        .map(|s| (s.reference.as_str(), s.desc.as_str()))
        .collect();
    assert_eq!(pairs, [("u0#helper", "func in PY"), ("u2#helper", "func in C")]);

    let pces = format_evidence_as_pces(&evidence);
    assert!(pces.contains("source: unknown\n"));
    assert!(pces.contains("  suggestions:\n    - u0#helper: func in PY\n    - u2#helper: func in C\n"));
}

#[test]
fn test_missing_ref() {
    let ir = run_ir();
    let evidence = answer(&ir, SourceMap::new(), &pcr(&["type:symbol ref:nonexistent view:impl"])).unwrap();
    let e = &evidence[0];
    assert_eq!(e.source, EvidenceSource::Unknown);
    assert_eq!(e.content.text("status"), Some("missing"));
    assert_eq!(e.content.len(), 1);
}

#[test]
fn test_evidence_follows_request_order() {
    let ir = run_ir();
    let out = peek(
        &ir,
        sources(&[(0, RUN_SOURCE)]),
        &pcr(&[
            "type:symbol ref:run view:api",
            "type:layout ref:RAM view:summary",
            "type:unit ref:u0 view:summary",
        ]),
    )
    .unwrap();

    let api = out.find("view: api").unwrap();
    let layout = out.find("ref: RAM").unwrap();
    let unit = out.find("ref: u0").unwrap();
    assert!(api < layout && layout < unit);
    assert!(out.contains("  signatures:\n    - def run()\n"));
    assert!(out.contains("source: layout\ncontent:\n  start: 0x20000000\n  size: 64K\n"));
    assert!(out.contains("  type: PY\n  module: root\n  role: entry\n  path: a.py\n  symbol_count: 1\n"));
    assert!(out.starts_with("<pcir>\n") && out.ends_with("</pcir>\n"));
}

#[test]
fn test_layout_views() {
    let ir = run_ir();
    let evidence = answer(
        &ir,
        SourceMap::new(),
        &pcr(&["type:layout ref:RAM view:exist", "type:layout ref:RAM view:definition"]),
    )
    .unwrap();
    assert_eq!(evidence[0].source, EvidenceSource::Layout);
    assert_eq!(evidence[0].content.text("status"), Some("yes"));
    assert_eq!(evidence[1].content.text("kind"), Some("layout"));
    assert_eq!(
        evidence[1].content.text("definition"),
        Some("start=0x20000000 size=64K")
    );
}

#[test]
fn test_asm_view_falls_back_to_symbol_label() {
    let ir = run_ir();
    let evidence = answer(&ir, sources(&[(0, RUN_SOURCE)]), &pcr(&["type:symbol ref:run view:asm"])).unwrap();
    assert_eq!(
        evidence[0].content.get("labels"),
        Some(&ContentValue::List(vec!["run".to_string()]))
    );
    assert_eq!(evidence[0].content.get("flow"), Some(&ContentValue::List(Vec::new())));
}

// ---------------------------------------------------------------------------
// View isolation
// ---------------------------------------------------------------------------

struct CountingAnalyzer {
    implementation_calls: Rc<Cell<usize>>,
}

impl Analyzer for CountingAnalyzer {
    fn extract_signature(&self, _name: &str) -> Result<Option<String>> {
        Ok(Some("def run()".to_string()))
    }

    fn extract_implementation(&self, _name: &str) -> Result<Vec<String>> {
        self.implementation_calls.set(self.implementation_calls.get() + 1);
        Ok(vec!["secret = compute()".to_string()])
    }

    fn extract_behavior(&self, _name: &str) -> Result<Vec<String>> {
        Ok(vec!["Call: compute()".to_string()])
    }

    fn extract_callchain(&self, _name: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[test]
fn test_view_isolation() {
    let ir = run_ir();
    let calls = Rc::new(Cell::new(0));
    let extractor = Extractor::new(&ir, SourceMap::new()).with_analyzer(
        UnitId(0),
        Box::new(CountingAnalyzer {
            implementation_calls: Rc::clone(&calls),
        }),
    );
    let builder = EvidenceBuilder::new(&extractor);
    let resolver = Resolver::new(&ir);

    let build = |view: View| {
        let need = Need::new(NeedType::Symbol, "run", view);
        builder.build(&need, &resolver.resolve(&need))
    };

    let exist = build(View::Exist);
    assert_eq!(exist.content.text("location"), Some("a.py:4"));
    let api = build(View::Api);
    let summary = build(View::Summary);
    assert_eq!(calls.get(), 0);
    assert!(!api.content.contains_key("implementation"));
    assert!(!summary.content.contains_key("implementation"));
    assert_eq!(
        api.content.get("signatures"),
        Some(&ContentValue::List(vec!["def run()".to_string()]))
    );

    let imp = build(View::Impl);
    assert_eq!(calls.get(), 1);
    assert_eq!(
        imp.content.get("implementation"),
        Some(&ContentValue::List(vec!["secret = compute()".to_string()]))
    );
}

#[test]
fn test_missing_ref_never_queries_analyzer() {
    let ir = run_ir();
    let calls = Rc::new(Cell::new(0));
    let extractor = Extractor::new(&ir, SourceMap::new()).with_analyzer(
        UnitId(0),
        Box::new(CountingAnalyzer {
            implementation_calls: Rc::clone(&calls),
        }),
    );
    let builder = EvidenceBuilder::new(&extractor);
    let need = Need::new(NeedType::Symbol, "ghost", View::Impl);
    let evidence = builder.build(&need, &Resolver::new(&ir).resolve(&need));
    assert_eq!(evidence.content.text("status"), Some("missing"));
    assert_eq!(calls.get(), 0);
}

// ---------------------------------------------------------------------------
// Call chains
// ---------------------------------------------------------------------------

const CHAIN_PIR: &str = "\
<pir>
<meta>
name: chain
</meta>
<units>
u0: main.py type=PY role=entry module=root
u1: one.py type=PY role=lib module=root
u2: two.py type=PY role=lib module=root
</units>
<symbols>
main:u0 func entry=true line=1
a:u0 func line=4
b:u0 func line=7
helper:u1 func line=1
helper:u2 func line=1
</symbols>
</pir>
";

const CHAIN_MAIN: &str = "def main():\n    helper()\n\ndef a():\n    b()\n\ndef b():\n    a()\n";

fn chain_sources() -> SourceMap {
    sources(&[
        (0, CHAIN_MAIN),
        (1, "def helper():\n    pass\n"),
        (2, "def helper():\n    log()\n"),
    ])
}

#[test]
fn test_cross_unit_choice_is_low_confidence() {
    let ir = ProjectIr::parse(CHAIN_PIR).unwrap();
    let evidence = answer(&ir, chain_sources(), &pcr(&["type:entry ref:main view:callchain"])).unwrap();
    let content = &evidence[0].content;
    assert_eq!(
        content.get("path"),
        Some(&ContentValue::List(vec!["u0#main".to_string(), "u1#helper".to_string()]))
    );
    assert_eq!(
        content.get("low_confidence"),
        Some(&ContentValue::List(vec!["u1#helper".to_string()]))
    );
}

#[test]
fn test_recursive_calls_terminate() {
    let ir = ProjectIr::parse(CHAIN_PIR).unwrap();
    let extractor = Extractor::new(&ir, chain_sources());
    let mut visited = HashSet::new();
    let chain = extractor.extract_callchain(UnitId(0), "a", &mut visited, 10);
    assert_eq!(chain.path, ["u0#a", "u0#b"]);
    assert!(chain.low_confidence.is_empty());
}

#[test]
fn test_depth_limit_returns_partial_chain() {
    let ir = ProjectIr::parse(CHAIN_PIR).unwrap();
    let extractor = Extractor::new(&ir, chain_sources());
    let mut visited = HashSet::new();
    assert_eq!(extractor.extract_callchain(UnitId(0), "a", &mut visited, 0).path, ["u0#a"]);

    let builder = EvidenceBuilder::new(&extractor).with_max_depth(1);
    let need = Need::new(NeedType::Symbol, "u0#main", View::Callchain);
    let evidence = builder.build(&need, &Resolver::new(&ir).resolve(&need));
    assert_eq!(
        evidence.content.get("path"),
        Some(&ContentValue::List(vec!["u0#main".to_string(), "u1#helper".to_string()]))
    );
}

#[test]
fn test_unit_impl_groups_symbols() {
    let ir = ProjectIr::parse(CHAIN_PIR).unwrap();
    let evidence = answer(&ir, chain_sources(), &pcr(&["type:unit ref:u0 view:impl"])).unwrap();
    let Some(ContentValue::Groups(groups)) = evidence[0].content.get("implementation") else {
        panic!("expected implementation groups");
    };
    let titles: Vec<&str> = groups.iter().map(|g| g.title.as_str()).collect();
    assert_eq!(titles, ["main (func)", "a (func)", "b (func)"]);
    assert_eq!(groups[1].lines, ["b()"]);
}

#[test]
fn test_low_confidence_lists_each_guess_once() {
    let ir = ProjectIr::parse(
        "<pir>\n<units>\nu0: main.py type=PY role=entry module=root\n\
         u1: one.py type=PY role=lib module=root\nu2: two.py type=PY role=lib module=root\n</units>\n\
         <symbols>\nmain:u0 func entry=true line=1\na:u0 func line=5\n\
         helper:u1 func line=1\nhelper:u2 func line=1\n</symbols>\n</pir>\n",
    )
    .unwrap();
    let sources = sources(&[
        (0, "def main():\n    a()\n    helper()\n\ndef a():\n    helper()\n"),
        (1, "def helper():\n    pass\n"),
        (2, "def helper():\n    pass\n"),
    ]);
    let extractor = Extractor::new(&ir, sources);
    let mut visited = HashSet::new();
    let chain = extractor.extract_callchain(UnitId(0), "main", &mut visited, 10);
    assert_eq!(chain.path, ["u0#main", "u0#a", "u1#helper"]);
    assert_eq!(chain.low_confidence, ["u1#helper"]);
}
