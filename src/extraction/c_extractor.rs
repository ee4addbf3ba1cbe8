/// Tree-sitter based C and C++ forward extractor.
use std::time::Instant;

use tree_sitter::Node as TsNode;

use crate::extraction::{line_of, node_text, parse_source};
use crate::types::{ExtractionResult, Language, RawDependency, ScannedSymbol};

/// Which grammar a [`CFamilyExtractor`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CDialect {
    C,
    Cpp,
}

/// Extracts functions, aggregates, globals and includes from C or C++ files.
///
/// Prototypes are only recorded for header files, where they are the
/// definitions a reader is looking for; they carry `decl=true`.
pub struct CFamilyExtractor {
    dialect: CDialect,
}

struct ExtractionState<'s> {
    result: ExtractionResult,
    is_header: bool,
    /// Enclosing namespace / class names, innermost last.
    scope: Vec<String>,
    source: &'s [u8],
}

impl ExtractionState<'_> {
    fn push(&mut self, mut symbol: ScannedSymbol) {
        if !self.scope.is_empty() && !symbol.attrs.contains_key("scope") {
            symbol = symbol.with_attr("scope", &self.scope.join("::"));
        }
        self.result.symbols.push(symbol);
    }
}

impl CFamilyExtractor {
    pub fn new(dialect: CDialect) -> Self {
        Self { dialect }
    }

    fn language_of(dialect: CDialect) -> Language {
        match dialect {
            CDialect::C => Language::C,
            CDialect::Cpp => Language::Cpp,
        }
    }

    pub fn extract_with(dialect: CDialect, file_path: &str, source: &str) -> ExtractionResult {
        let start = Instant::now();
        let is_header = matches!(
            file_path.rsplit_once('.').map(|(_, ext)| ext),
            Some("h" | "hpp" | "hh" | "hxx")
        );
        let mut state = ExtractionState {
            result: ExtractionResult::default(),
            is_header,
            scope: Vec::new(),
            source: source.as_bytes(),
        };

        match parse_source(&Self::language_of(dialect), source) {
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
            "preproc_include" => Self::visit_include(state, node),
            "function_definition" => Self::visit_function(state, node),
            "declaration" => Self::visit_declaration(state, node),
            "struct_specifier" => Self::visit_aggregate(state, node, "struct"),
            "union_specifier" => Self::visit_aggregate(state, node, "struct"),
            "enum_specifier" => Self::visit_aggregate(state, node, "enum"),
            "class_specifier" => Self::visit_aggregate(state, node, "class"),
            "namespace_definition" => Self::visit_namespace(state, node),
            "type_definition" => Self::visit_typedef(state, node),
            // Bodies of functions hold no top-level symbols.
            "compound_statement" => {}
            _ => Self::visit_children(state, node),
        }
    }

    fn visit_include(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let Some(path) = node.child_by_field_name("path") else {
            return;
        };
        let header = node_text(path, state.source)
            .trim_matches(|c| c == '"' || c == '<' || c == '>')
            .trim();
        if !header.is_empty() {
            state
                .result
                .dependencies
                .push(RawDependency::bracketed("include", header));
        }
    }

    fn visit_function(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let Some(name) = node
            .child_by_field_name("declarator")
            .and_then(|d| Self::declarator_name(state, d))
        else {
            return;
        };
        Self::push_function(state, &name, node, false);
    }

    /// Top-level declarations: prototypes (headers only) and global variables.
    fn visit_declaration(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let mut cursor = node.walk();
        let declarators: Vec<TsNode<'_>> = node
            .children_by_field_name("declarator", &mut cursor)
            .collect();
        for declarator in declarators {
            let is_function = Self::find_function_declarator(declarator).is_some();
            let Some(name) = Self::declarator_name(state, declarator) else {
                continue;
            };
            if is_function {
                if state.is_header {
                    Self::push_function(state, &name, node, true);
                }
            } else {
                state.push(ScannedSymbol::new(&name, "var", line_of(node)));
            }
        }
        // `struct point { ... } origin;` defines the struct as well.
        if let Some(ty) = node.child_by_field_name("type") {
            Self::visit_node(state, ty);
        }
    }

    /// `typedef struct { ... } name;` names an otherwise anonymous aggregate.
    fn visit_typedef(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let Some(ty) = node.child_by_field_name("type") else {
            return;
        };
        let kind = match ty.kind() {
            "struct_specifier" | "union_specifier" => "struct",
            "enum_specifier" => "enum",
            _ => return,
        };
        if ty.child_by_field_name("name").is_some() {
            Self::visit_node(state, ty);
            return;
        }
        if ty.child_by_field_name("body").is_none() {
            return;
        }
        if let Some(name) = node
            .child_by_field_name("declarator")
            .and_then(|d| Self::declarator_name(state, d))
        {
            state.push(ScannedSymbol::new(&name, kind, line_of(node)));
        }
    }

    fn push_function(state: &mut ExtractionState<'_>, qualified: &str, node: TsNode<'_>, decl: bool) {
        // `Widget::draw` is recorded as `draw` scoped to `Widget`.
        let (owner, name) = match qualified.rsplit_once("::") {
            Some((owner, name)) => (Some(owner), name),
            None => (None, qualified),
        };
        let mut symbol = ScannedSymbol::new(name, "func", line_of(node));
        if let Some(owner) = owner {
            symbol = symbol.with_attr("scope", owner);
        }
        if decl {
            symbol = symbol.with_attr("decl", "true");
        }
        if name == "main" && owner.is_none() && !decl {
            symbol = symbol.entry();
        }
        state.push(symbol);
    }

    fn visit_aggregate(state: &mut ExtractionState<'_>, node: TsNode<'_>, kind: &str) {
        let body = node.child_by_field_name("body");
        let name = node.child_by_field_name("name");
        // Only definitions count, not `struct foo *p` references.
        let (Some(name), Some(body)) = (name, body) else {
            return;
        };
        let name = node_text(name, state.source).to_string();
        state.push(ScannedSymbol::new(&name, kind, line_of(node)));

        if kind == "class" || kind == "struct" {
            state.scope.push(name);
            Self::visit_members(state, body);
            state.scope.pop();
        }
    }

    /// Inline member function definitions of C++ classes.
    fn visit_members(state: &mut ExtractionState<'_>, body: TsNode<'_>) {
        let mut cursor = body.walk();
        let members: Vec<TsNode<'_>> = body.named_children(&mut cursor).collect();
        for member in members {
            match member.kind() {
                "function_definition" => Self::visit_function(state, member),
                "struct_specifier" | "class_specifier" | "enum_specifier" => {
                    Self::visit_node(state, member)
                }
                "field_declaration" => {
                    if let Some(ty) = member.child_by_field_name("type") {
                        Self::visit_node(state, ty);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit_namespace(state: &mut ExtractionState<'_>, node: TsNode<'_>) {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(n, state.source).to_string());
        let pushed = name.is_some();
        if let Some(name) = name {
            state.scope.push(name);
        }
        if let Some(body) = node.child_by_field_name("body") {
            Self::visit_children(state, body);
        }
        if pushed {
            state.scope.pop();
        }
    }

    /// Finds the function declarator under pointer / reference wrappers.
    fn find_function_declarator(node: TsNode<'_>) -> Option<TsNode<'_>> {
        match node.kind() {
            "function_declarator" => Some(node),
            "pointer_declarator" | "reference_declarator" | "init_declarator"
            | "parenthesized_declarator" => node
                .child_by_field_name("declarator")
                .or_else(|| node.named_child(0))
                .and_then(Self::find_function_declarator),
            _ => None,
        }
    }

    /// Resolves the declared identifier of a (possibly nested) declarator.
    fn declarator_name(state: &ExtractionState<'_>, node: TsNode<'_>) -> Option<String> {
        match node.kind() {
            "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name"
            | "operator_name" => Some(node_text(node, state.source).to_string()),
            _ => {
                let inner = node
                    .child_by_field_name("declarator")
                    .or_else(|| node.named_child(0))?;
                Self::declarator_name(state, inner)
            }
        }
    }
}

impl crate::extraction::LanguageExtractor for CFamilyExtractor {
    fn extensions(&self) -> &[&str] {
        match self.dialect {
            CDialect::C => &["c", "h"],
            CDialect::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        }
    }

    fn language(&self) -> Language {
        Self::language_of(self.dialect)
    }

    fn extract(&self, file_path: &str, source: &str) -> ExtractionResult {
        Self::extract_with(self.dialect, file_path, source)
    }
}
