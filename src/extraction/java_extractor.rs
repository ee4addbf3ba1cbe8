/// Tree-sitter based Java forward extractor.
use std::time::Instant;

use tree_sitter::Node as TsNode;

use crate::extraction::{line_of, node_text, parse_source};
use crate::types::{ExtractionResult, Language, RawDependency, ScannedSymbol};

/// Extracts types, methods and imports from Java source files.
pub struct JavaExtractor;

struct ExtractionState<'s> {
    result: ExtractionResult,
    class_stack: Vec<String>,
    source: &'s [u8],
}

impl JavaExtractor {
    pub fn extract(file_path: &str, source: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut state = ExtractionState {
            result: ExtractionResult::default(),
            class_stack: Vec::new(),
            source: source.as_bytes(),
        };

        match parse_source(&Language::Java, source) {
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
            "class_declaration" | "record_declaration" => Self::visit_type(state, node, "class"),
            "interface_declaration" => Self::visit_type(state, node, "interface"),
            "enum_declaration" => Self::visit_type(state, node, "enum"),
            "method_declaration" => Self::visit_method(state, node),
            "import_declaration" => Self::visit_import(state, node),
            // Method bodies hold no declarations we record.
            "block" | "constructor_body" => {}
            _ => Self::visit_children(state, node),
        }
    }

    fn visit_type(state: &mut ExtractionState<'_>, node: TsNode<'_>, kind: &str) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name, state.source).to_string();
        let mut symbol = ScannedSymbol::new(&name, kind, line_of(node));
        if let Some(outer) = state.class_stack.last() {
            symbol = symbol.with_attr("class", outer);
        }
        state.result.symbols.push(symbol);

        state.class_stack.push(name);
        if let Some(body) = node.child_by_field_name("body") {
            Self::visit_children(state, body);
        }
        state.class_stack.pop();
    }

    /// Methods become `func`; `static void main(...)` is an entry point.
    fn visit_method(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name, state.source);
        let mut symbol = ScannedSymbol::new(name, "func", line_of(node));
        if let Some(class) = state.class_stack.last() {
            symbol = symbol.with_attr("class", class);
        }
        if name == "main" && Self::is_static(state, node) {
            symbol = symbol.entry();
        }
        state.result.symbols.push(symbol);
    }

    fn is_static(state: &ExtractionState<'_>, node: TsNode<'_>) -> bool {
        let mut cursor = node.walk();
        let found = node
            .children(&mut cursor)
            .filter(|c| c.kind() == "modifiers")
            .any(|c| {
                node_text(c, state.source)
                    .split_whitespace()
                    .any(|m| m == "static")
            });
        found
    }

    /// `import java.util.List;` records `import:[java.util.List]`; wildcard
    /// imports record the package.
    fn visit_import(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let text = node_text(node, state.source);
        let path = text
            .trim()
            .trim_start_matches("import")
            .trim_end_matches(';')
            .trim();
        let path = path.strip_prefix("static ").unwrap_or(path).trim();
        let path = path.strip_suffix(".*").unwrap_or(path);
        let path: String = path.split_whitespace().collect();
        if !path.is_empty() {
            state
                .result
                .dependencies
                .push(RawDependency::bracketed("import", &path));
        }
    }
}

impl crate::extraction::LanguageExtractor for JavaExtractor {
    fn extensions(&self) -> &[&str] {
        &["java"]
    }

    fn language(&self) -> Language {
        Language::Java
    }

    fn extract(&self, file_path: &str, source: &str) -> ExtractionResult {
        JavaExtractor::extract(file_path, source)
    }
}
