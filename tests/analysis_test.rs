use air::analysis::{analyzer_for, Analyzer, GenericAnalyzer, SyntaxAnalyzer};
use air::errors::{AirError, Result};
use air::evidence::{Extractor, SourceMap};
use air::ir::ProjectIr;
use air::types::*;

#[test]
fn test_java_method_queries() {
    let source = "\
public class App {
    public static int add(int a, int b) {
        return a + b;
    }
}
";
    let a = analyzer_for(&Language::Java, source);
    assert_eq!(a.locate("add").unwrap(), Some(2));
    assert_eq!(
        a.extract_signature("add").unwrap().as_deref(),
        Some("public static int add(int a, int b)")
    );
    assert_eq!(a.extract_implementation("add").unwrap(), vec!["return a + b;"]);
    assert_eq!(
        a.extract_behavior("add").unwrap(),
        vec!["Returns: return a + b;"]
    );
}

#[test]
fn test_unknown_language_gets_generic_analyzer() {
    let source = "func add(a int) int {\n\treturn a\n}\n";
    let a = analyzer_for(&Language::Other("GO".to_string()), source);
    assert_eq!(
        a.extract_signature("add").unwrap().as_deref(),
        Some("func add(a int) int")
    );
    assert_eq!(a.extract_implementation("add").unwrap(), vec!["return a"]);
    assert_eq!(a.locate("add").unwrap(), Some(1));
}

#[test]
fn test_asm_and_linker_dispatch() {
    let asm = analyzer_for(&Language::Asm, "_start:\n    call kmain\n    ret\n");
    assert_eq!(asm.extract_callchain("_start").unwrap(), vec!["kmain"]);

    let ld = analyzer_for(&Language::Ld, "ENTRY(_start)\n_end = .;\n");
    assert_eq!(ld.locate("_end").unwrap(), Some(2));
    assert_eq!(
        ld.extract_signature("_start").unwrap().as_deref(),
        Some("ENTRY(_start)")
    );
}

#[test]
fn test_syntax_errors_surface_for_unknown_names() {
    let source = "def ok():\n    pass\n\nvalue = = 3\n";
    let a = SyntaxAnalyzer::new(Language::Python, source).unwrap();
    assert!(matches!(
        a.extract_signature("missing"),
        Err(AirError::Analyzer { .. })
    ));
}

struct FailingAnalyzer;

impl FailingAnalyzer {
    fn fail<T>() -> Result<T> {
        Err(AirError::Analyzer {
            message: "grammar exploded".to_string(),
            language: "PY".to_string(),
        })
    }
}

impl Analyzer for FailingAnalyzer {
    fn extract_signature(&self, _name: &str) -> Result<Option<String>> {
        Self::fail()
    }

    fn extract_implementation(&self, _name: &str) -> Result<Vec<String>> {
        Self::fail()
    }

    fn extract_behavior(&self, _name: &str) -> Result<Vec<String>> {
        Self::fail()
    }

    fn extract_callchain(&self, _name: &str) -> Result<Vec<String>> {
        Self::fail()
    }
}

#[test]
fn test_failing_analyzer_falls_back_to_generic() {
    let ir = ProjectIr::parse(
        "<pir>\n<units>\nu0: run.py type=PY role=entry module=root\n</units>\n\
         <symbols>\nrun:u0 func entry=true line=1\n</symbols>\n</pir>\n",
    )
    .unwrap();
    let mut sources = SourceMap::new();
    sources.insert(UnitId(0), "def run():\n    helper()\n".to_string());
    let extractor = Extractor::new(&ir, sources).with_analyzer(UnitId(0), Box::new(FailingAnalyzer));

    assert_eq!(
        extractor.extract_signature(UnitId(0), "run").as_deref(),
        Some("def run()")
    );
    assert_eq!(extractor.extract_implementation(UnitId(0), "run"), vec!["helper()"]);
}

#[test]
fn test_python_implementation_skips_comments_and_docstrings() {
    let source = "\
def run():
    \"\"\"Docs here.\"\"\"
    #TODO remove this
    x = 1
    return x
";
    let a = SyntaxAnalyzer::new(Language::Python, source).unwrap();
    assert_eq!(a.extract_implementation("run").unwrap(), vec!["x = 1", "return x"]);
}

#[test]
fn test_generic_python_body_skips_multiline_docstring() {
    let source = "\
def run():
    \"\"\"
    Long docs.
    \"\"\"
    #note
    return 1
";
    let a = GenericAnalyzer::for_language(&Language::Python, source);
    assert_eq!(a.extract_implementation("run").unwrap(), vec!["return 1"]);
}

struct EmptyAnalyzer;

impl Analyzer for EmptyAnalyzer {
    fn extract_signature(&self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn extract_implementation(&self, _name: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn extract_behavior(&self, _name: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn extract_callchain(&self, _name: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[test]
fn test_empty_answer_retries_generic_for_grammar_languages() {
    let ir = ProjectIr::parse(
        "<pir>\n<units>\nu0: run.py type=PY role=entry module=root\n\
         u1: boot.S type=ASM role=entry module=root\n</units>\n\
         <symbols>\nrun:u0 func entry=true line=1\n_start:u1 label entry=true line=1\n</symbols>\n</pir>\n",
    )
    .unwrap();
    let mut sources = SourceMap::new();
    sources.insert(UnitId(0), "def run():\n    helper()\n".to_string());
    sources.insert(UnitId(1), "_start:\n    call kmain\n".to_string());
    let extractor = Extractor::new(&ir, sources)
        .with_analyzer(UnitId(0), Box::new(EmptyAnalyzer))
        .with_analyzer(UnitId(1), Box::new(EmptyAnalyzer));

    assert_eq!(
        extractor.extract_signature(UnitId(0), "run").as_deref(),
        Some("def run()")
    );
    assert_eq!(extractor.extract_implementation(UnitId(0), "run"), vec!["helper()"]);
    // Assembly has no grammar; an empty answer is final.
    assert!(extractor.extract_implementation(UnitId(1), "_start").is_empty());
}
