/// Tree-sitter based Python forward extractor.
use std::time::Instant;

use tree_sitter::Node as TsNode;

use crate::extraction::{line_of, node_text, parse_source};
use crate::types::{ExtractionResult, Language, RawDependency, ScannedSymbol};

/// Extracts functions, classes and imports from Python source files.
pub struct PythonExtractor;

/// Internal state used during AST traversal.
struct ExtractionState<'s> {
    result: ExtractionResult,
    /// Enclosing class names, innermost last.
    class_stack: Vec<String>,
    source: &'s [u8],
}

impl PythonExtractor {
    pub fn extract(file_path: &str, source: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut state = ExtractionState {
            result: ExtractionResult::default(),
            class_stack: Vec::new(),
            source: source.as_bytes(),
        };

        match parse_source(&Language::Python, source) {
            Ok(tree) => Self::visit_children(&mut state, tree.root_node()),
            Err(msg) => state.result.errors.push(format!("{file_path}: {msg}")),
        }

        let mut result = state.result;
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    fn visit_children(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                Self::visit_node(state, cursor.node());
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }

    fn visit_node(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        match node.kind() {
            "function_definition" => Self::visit_function(state, node),
            "class_definition" => Self::visit_class(state, node),
            "import_statement" => Self::visit_import(state, node),
            "import_from_statement" => Self::visit_import_from(state, node),
            _ => Self::visit_children(state, node),
        }
    }

    fn visit_function(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        if let Some(name) = node.child_by_field_name("name") {
            let name = node_text(name, state.source);
            let mut symbol = ScannedSymbol::new(name, "func", line_of(node));
            if let Some(class) = state.class_stack.last() {
                symbol = symbol.with_attr("class", class);
            }
            if name == "main" {
                symbol = symbol.entry();
            }
            state.result.symbols.push(symbol);
        }
        // Nested definitions are symbols too.
        if let Some(body) = node.child_by_field_name("body") {
            Self::visit_children(state, body);
        }
    }

    fn visit_class(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name, state.source).to_string();
        state
            .result
            .symbols
            .push(ScannedSymbol::new(&name, "class", line_of(node)));

        state.class_stack.push(name);
        if let Some(body) = node.child_by_field_name("body") {
            Self::visit_children(state, body);
        }
        state.class_stack.pop();
    }

    /// `import a.b, c as d` records `import:[a.b]` and `import:[c]`.
    fn visit_import(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let module = match child.kind() {
                "dotted_name" => Some(child),
                "aliased_import" => child.child_by_field_name("name"),
                _ => None,
            };
            if let Some(module) = module {
                let name = node_text(module, state.source);
                state
                    .result
                    .dependencies
                    .push(RawDependency::bracketed("import", name));
            }
        }
    }

    /// `from a.b import c` records `import:[a.b]`; purely relative imports
    /// (`from . import x`) carry no module name and are skipped.
    fn visit_import_from(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let Some(module) = node.child_by_field_name("module_name") else {
            return;
        };
        let name = node_text(module, state.source).trim_start_matches('.');
        if !name.is_empty() {
            state
                .result
                .dependencies
                .push(RawDependency::bracketed("import", name));
        }
    }
}

impl crate::extraction::LanguageExtractor for PythonExtractor {
    fn extensions(&self) -> &[&str] {
        &["py"]
    }

    fn language(&self) -> Language {
        Language::Python
    }

    fn extract(&self, file_path: &str, source: &str) -> ExtractionResult {
        PythonExtractor::extract(file_path, source)
    }
}
