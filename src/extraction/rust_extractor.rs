/// Tree-sitter based Rust forward extractor.
///
/// Walks items the same way at every nesting level (modules, impls and
/// traits), so functions inside `impl` blocks are recorded alongside free
/// functions with an `impl=` attribute naming their self type.
use std::time::Instant;

use tree_sitter::Node as TsNode;

use crate::extraction::{line_of, node_text, parse_source};
use crate::types::{ExtractionResult, Language, RawDependency, ScannedSymbol};

/// Extracts items and `use` paths from Rust source files using tree-sitter.
pub struct RustExtractor;

/// Internal state used during AST traversal.
struct ExtractionState<'s> {
    result: ExtractionResult,
    /// Self type of the enclosing `impl`, or name of the enclosing trait.
    owner_stack: Vec<(&'static str, String)>,
    source: &'s [u8],
}

impl ExtractionState<'_> {
    fn text(&self, node: TsNode<'_>) -> String {
        node_text(node, self.source).to_string()
    }
}

impl RustExtractor {
    /// Extract symbols and dependencies from a Rust source file.
    ///
    /// `file_path` is used for error messages only (not for I/O).
    pub fn extract(file_path: &str, source: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut state = ExtractionState {
            result: ExtractionResult::default(),
            owner_stack: Vec::new(),
            source: source.as_bytes(),
        };

        match parse_source(&Language::Rust, source) {
            Ok(tree) => Self::visit_children(&mut state, tree.root_node()),
            Err(msg) => state.result.errors.push(format!("{file_path}: {msg}")),
        }

        let mut result = state.result;
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    /// Visit all children of a node.
    fn visit_children(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                Self::visit_node(state, child);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }

    /// Visit a single AST node, dispatching on its type.
    fn visit_node(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        match node.kind() {
            "function_item" => Self::visit_function(state, node),
            "struct_item" => Self::visit_named(state, node, "struct"),
            "union_item" => Self::visit_named(state, node, "struct"),
            "enum_item" => Self::visit_named(state, node, "enum"),
            "trait_item" => Self::visit_trait(state, node),
            "impl_item" => Self::visit_impl(state, node),
            "use_declaration" => Self::visit_use(state, node),
            "extern_crate_declaration" => Self::visit_extern_crate(state, node),
            "const_item" => Self::visit_named(state, node, "const"),
            "static_item" => Self::visit_named(state, node, "var"),
            "type_item" => Self::visit_named(state, node, "type"),
            "mod_item" => Self::visit_module(state, node),
            "inner_attribute_item" => Self::visit_inner_attribute(state, node),
            // Function bodies are not scanned for items.
            "block" => {}
            _ => Self::visit_children(state, node),
        }
    }

    /// Functions with a body; trait method declarations without one are
    /// part of the trait's signature, not definitions.
    fn visit_function(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        if node.child_by_field_name("body").is_none() {
            return;
        }
        let Some(name) = Self::extract_name(state, node) else {
            return;
        };
        let mut symbol = ScannedSymbol::new(&name, "func", line_of(node));
        if let Some((key, owner)) = state.owner_stack.last() {
            symbol = symbol.with_attr(key, owner);
        } else if name == "main" {
            symbol = symbol.entry();
        }
        if Self::is_async(state, node) {
            symbol = symbol.with_attr("async", "true");
        }
        state.result.symbols.push(symbol);
    }

    fn visit_named(state: &mut ExtractionState<'_>, node: TsNode<'_>, kind: &str) {
        if let Some(name) = Self::extract_name(state, node) {
            state
                .result
                .symbols
                .push(ScannedSymbol::new(&name, kind, line_of(node)));
        }
    }

    /// Extract a trait and the default methods it defines.
    fn visit_trait(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let Some(name) = Self::extract_name(state, node) else {
            return;
        };
        state
            .result
            .symbols
            .push(ScannedSymbol::new(&name, "trait", line_of(node)));

        state.owner_stack.push(("trait", name));
        if let Some(body) = node.child_by_field_name("body") {
            Self::visit_children(state, body);
        }
        state.owner_stack.pop();
    }

    /// Visit impl body: functions become symbols tagged with the self type.
    fn visit_impl(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let type_name = node
            .child_by_field_name("type")
            .map(|n| state.text(n))
            .unwrap_or_else(|| "<unknown>".to_string());
        // `Vec<T>` is tagged as `Vec`.
        let type_name = type_name
            .split('<')
            .next()
            .unwrap_or(&type_name)
            .trim()
            .to_string();

        state.owner_stack.push(("impl", type_name));
        if let Some(body) = node.child_by_field_name("body") {
            Self::visit_children(state, body);
        }
        state.owner_stack.pop();
    }

    /// `use a::b::{c, d};` records `use:[a::b::{c, d}]`.
    fn visit_use(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let Some(argument) = node.child_by_field_name("argument") else {
            return;
        };
        let path: String = state
            .text(argument)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !path.is_empty() {
            state
                .result
                .dependencies
                .push(RawDependency::bracketed("use", &path));
        }
    }

    fn visit_extern_crate(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        if let Some(name) = Self::extract_name(state, node) {
            state
                .result
                .dependencies
                .push(RawDependency::bracketed("use", &name));
        }
    }

    /// Crate-level attributes such as `#![no_std]` record `attr:[no_std]`.
    fn visit_inner_attribute(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let text = state.text(node);
        let inner = text
            .trim()
            .trim_start_matches("#![")
            .trim_end_matches(']')
            .trim();
        let name = inner.split('(').next().unwrap_or(inner).trim();
        if matches!(name, "no_std" | "no_main") {
            state
                .result
                .dependencies
                .push(RawDependency::bracketed("attr", name));
        }
    }

    /// Inline modules are walked in place; their items belong to this unit.
    fn visit_module(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        if let Some(body) = node.child_by_field_name("body") {
            Self::visit_children(state, body);
        }
    }

    /// Extract the name of a node by looking for a "name" field child.
    fn extract_name(state: &ExtractionState<'_>, node: TsNode<'_>) -> Option<String> {
        node.child_by_field_name("name").map(|n| state.text(n))
    }

    /// Detect the `async` keyword among the function modifiers.
    fn is_async(state: &ExtractionState<'_>, node: TsNode<'_>) -> bool {
        let mut cursor = node.walk();
        let found = node
            .children(&mut cursor)
            .filter(|c| c.kind() == "function_modifiers")
            .any(|c| state.text(c).contains("async"));
        found
    }
}

impl crate::extraction::LanguageExtractor for RustExtractor {
    fn extensions(&self) -> &[&str] {
        &["rs"]
    }

    fn language(&self) -> Language {
        Language::Rust
    }

    fn extract(&self, file_path: &str, source: &str) -> ExtractionResult {
        RustExtractor::extract(file_path, source)
    }
}
