/// Tree-sitter analyzer for Python, C, C++, Rust and Java.
///
/// The source is parsed once at construction. Each query finds the
/// definition node of a name and reads the answer off the tree.
use tree_sitter::{Node as TsNode, Tree};

use crate::analysis::{collapse_whitespace, filter_python_statements, filter_statements, Analyzer};
use crate::errors::{AirError, Result};
use crate::extraction::parse_source;
use crate::types::Language;

/// Node kinds that introduce a named definition.
const DEFINITIONS: &[&str] = &[
    // Python
    "function_definition",
    "class_definition",
    // C / C++
    "struct_specifier",
    "union_specifier",
    "enum_specifier",
    "class_specifier",
    "type_definition",
    "declaration",
    // Rust
    "function_item",
    "function_signature_item",
    "struct_item",
    "enum_item",
    "union_item",
    "trait_item",
    "const_item",
    "static_item",
    "type_item",
    "mod_item",
    "macro_definition",
    // Java
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "method_declaration",
    "constructor_declaration",
];

/// Definitions whose body lists members rather than statements.
const AGGREGATES: &[&str] = &[
    "class_definition",
    "struct_specifier",
    "union_specifier",
    "enum_specifier",
    "class_specifier",
    "type_definition",
    "struct_item",
    "enum_item",
    "union_item",
    "trait_item",
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

const CALLS: &[&str] = &["call", "call_expression", "method_invocation"];

const CONTROL: &[&str] = &[
    "if_statement",
    "for_statement",
    "while_statement",
    "do_statement",
    "switch_statement",
    "try_statement",
    "with_statement",
    "match_statement",
    "enhanced_for_statement",
    "if_expression",
    "match_expression",
    "for_expression",
    "while_expression",
    "loop_expression",
];

const RETURNS: &[&str] = &["return_statement", "return_expression"];

const ASSIGNMENTS: &[&str] = &[
    "assignment",
    "augmented_assignment",
    "assignment_expression",
    "compound_assignment_expr",
    "let_declaration",
    "local_variable_declaration",
    "declaration",
];

/// Upper bound on behavior lines for one definition.
const MAX_BEHAVIOR: usize = 32;

/// All nodes of a tree in pre-order.
fn preorder(root: TsNode<'_>) -> Vec<TsNode<'_>> {
    let mut nodes = Vec::new();
    let mut cursor = root.walk();
    loop {
        nodes.push(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return nodes;
            }
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

pub struct SyntaxAnalyzer {
    language: Language,
    source: String,
    tree: Tree,
}

impl SyntaxAnalyzer {
    pub fn new(language: Language, source: &str) -> Result<Self> {
        let tree = parse_source(&language, source).map_err(|message| AirError::Analyzer {
            message,
            language: language.to_string(),
        })?;
        Ok(Self {
            language,
            source: source.to_string(),
            tree,
        })
    }

    fn text<'t>(&'t self, node: TsNode<'_>) -> &'t str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Identifier declared by a C declarator, with pointer, array and
    /// function wrappers peeled off.
    fn declarator_name(&self, node: TsNode<'_>) -> Option<String> {
        match node.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
            | "operator_name" => Some(self.text(node).to_string()),
            "qualified_identifier" => self
                .text(node)
                .rsplit("::")
                .next()
                .map(str::to_string),
            _ => {
                let inner = node
                    .child_by_field_name("declarator")
                    .or_else(|| node.named_child(0))?;
                self.declarator_name(inner)
            }
        }
    }

    /// Names a definition node introduces.
    fn defined_names(&self, node: TsNode<'_>) -> Vec<String> {
        match node.kind() {
            "function_definition" if self.language.is_c_family() => node
                .child_by_field_name("declarator")
                .and_then(|d| self.declarator_name(d))
                .into_iter()
                .collect(),
            "declaration" | "type_definition" => {
                let mut cursor = node.walk();
                let declarators: Vec<TsNode<'_>> = node
                    .children_by_field_name("declarator", &mut cursor)
                    .collect();
                declarators
                    .into_iter()
                    .filter_map(|d| self.declarator_name(d))
                    .collect()
            }
            "struct_specifier" | "union_specifier" | "enum_specifier" | "class_specifier" => {
                // `struct foo *p;` mentions a type, it does not define one.
                if node.child_by_field_name("body").is_none() {
                    return Vec::new();
                }
                node.child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .into_iter()
                    .collect()
            }
            _ => node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .into_iter()
                .collect(),
        }
    }

    /// Finds the definition of `name`, preferring nodes with a body over
    /// bare declarations.
    fn find(&self, name: &str) -> Result<Option<TsNode<'_>>> {
        let root = self.tree.root_node();
        let candidates: Vec<TsNode<'_>> = preorder(root)
            .into_iter()
            .filter(|n| DEFINITIONS.contains(&n.kind()))
            .filter(|n| self.defined_names(*n).iter().any(|d| d == name))
            .collect();
        let found = candidates
            .iter()
            .copied()
            .find(|n| n.child_by_field_name("body").is_some())
            .or_else(|| candidates.first().copied());
        if found.is_none() && root.has_error() {
            return Err(AirError::Analyzer {
                message: format!("'{name}' not found and the source has syntax errors"),
                language: self.language.to_string(),
            });
        }
        Ok(found)
    }

    /// Aggregate body of a definition; typedefs carry it on their type.
    fn body<'t>(&self, node: TsNode<'t>) -> Option<TsNode<'t>> {
        node.child_by_field_name("body").or_else(|| {
            node.child_by_field_name("type")
                .and_then(|t| t.child_by_field_name("body"))
        })
    }

    fn signature_of(&self, node: TsNode<'_>) -> String {
        let text = match self.body(node) {
            Some(body) if node.kind() == "type_definition" => {
                let head = &self.source[node.start_byte()..body.start_byte()];
                let tail = &self.source[body.end_byte()..node.end_byte()];
                format!("{head} {tail}")
            }
            Some(body) => self.source[node.start_byte()..body.start_byte()].to_string(),
            None => self.text(node).to_string(),
        };
        collapse_whitespace(&text)
            .trim_end_matches([':', '{', ';', ' '])
            .to_string()
    }

    fn callee_name(&self, call: TsNode<'_>) -> Option<String> {
        if call.kind() == "method_invocation" {
            return call
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string());
        }
        self.simple_name(call.child_by_field_name("function")?)
    }

    fn simple_name(&self, node: TsNode<'_>) -> Option<String> {
        match node.kind() {
            "identifier" | "field_identifier" | "property_identifier" | "type_identifier" => {
                Some(self.text(node).to_string())
            }
            "attribute" => self.simple_name(node.child_by_field_name("attribute")?),
            "field_expression" => self.simple_name(node.child_by_field_name("field")?),
            "scoped_identifier" => self.simple_name(node.child_by_field_name("name")?),
            "qualified_identifier" => self
                .text(node)
                .rsplit("::")
                .next()
                .map(|s| s.trim().to_string()),
            "generic_function" => self.simple_name(node.child_by_field_name("function")?),
            "template_function" => self.simple_name(node.child_by_field_name("name")?),
            _ => None,
        }
    }

    fn describe(&self, node: TsNode<'_>, out: &mut Vec<String>) {
        if out.len() >= MAX_BEHAVIOR {
            return;
        }
        let inner = if node.kind() == "expression_statement" {
            node.named_child(0).unwrap_or(node)
        } else {
            node
        };
        let kind = inner.kind();
        let line = first_line(self.text(inner));

        if RETURNS.contains(&kind) {
            out.push(format!("Returns: {line}"));
            return;
        }
        if ASSIGNMENTS.contains(&kind) {
            if kind != "declaration" || line.contains('=') {
                out.push(format!("Assignment: {line}"));
            }
            return;
        }
        if CALLS.contains(&kind) || kind == "macro_invocation" {
            out.push(format!("Call: {line}"));
            return;
        }
        let condition = if CONTROL.contains(&kind) {
            out.push(format!("Control flow: {line}"));
            inner.child_by_field_name("condition").map(|c| c.id())
        } else {
            None
        };

        let mut cursor = inner.walk();
        let children: Vec<TsNode<'_>> = inner.named_children(&mut cursor).collect();
        for child in children {
            if Some(child.id()) != condition {
                self.describe(child, out);
            }
        }
    }

    fn aggregate_behavior(&self, node: TsNode<'_>, name: &str) -> Vec<String> {
        let kind_word = match node.kind() {
            "type_definition" => "typedef",
            other => other.split('_').next().unwrap_or(other),
        };
        let mut behavior = vec![format!("{kind_word} {name} definition")];
        if let Some(body) = self.body(node) {
            let mut cursor = body.walk();
            let members: Vec<TsNode<'_>> = body
                .named_children(&mut cursor)
                .filter(|m| !m.kind().contains("comment"))
                .collect();
            behavior.extend(
                members
                    .into_iter()
                    .take(MAX_BEHAVIOR)
                    .map(|m| format!("member: {}", first_line(self.text(m)))),
            );
        }
        behavior
    }
}

impl Analyzer for SyntaxAnalyzer {
    fn extract_signature(&self, name: &str) -> Result<Option<String>> {
        Ok(self.find(name)?.map(|node| self.signature_of(node)))
    }

    fn extract_implementation(&self, name: &str) -> Result<Vec<String>> {
        let Some(node) = self.find(name)? else {
            return Ok(Vec::new());
        };
        let text = match self.body(node) {
            Some(body) => self.text(body),
            None => self.text(node),
        };
        if self.language == Language::Python {
            return Ok(filter_python_statements(text.lines()));
        }
        Ok(filter_statements(text.lines()))
    }

    fn extract_behavior(&self, name: &str) -> Result<Vec<String>> {
        let Some(node) = self.find(name)? else {
            return Ok(Vec::new());
        };
        if AGGREGATES.contains(&node.kind()) {
            return Ok(self.aggregate_behavior(node, name));
        }
        let mut behavior = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            let statements: Vec<TsNode<'_>> = body.named_children(&mut cursor).collect();
            for statement in statements {
                self.describe(statement, &mut behavior);
            }
        }
        Ok(behavior)
    }

    fn extract_callchain(&self, name: &str) -> Result<Vec<String>> {
        let Some(node) = self.find(name)? else {
            return Ok(Vec::new());
        };
        let scope = node.child_by_field_name("body").unwrap_or(node);
        let mut calls: Vec<String> = Vec::new();
        for call in preorder(scope)
            .into_iter()
            .filter(|n| CALLS.contains(&n.kind()))
        {
            if let Some(callee) = self.callee_name(call) {
                if !calls.contains(&callee) {
                    calls.push(callee);
                }
            }
        }
        Ok(calls)
    }

    fn extract_definition(&self, name: &str) -> Result<Option<String>> {
        Ok(self.find(name)?.map(|node| self.text(node).to_string()))
    }

    fn locate(&self, name: &str) -> Result<Option<u32>> {
        Ok(self
            .find(name)?
            .map(|node| node.start_position().row as u32 + 1))
    }

    fn header_symbols(&self) -> Result<Vec<String>> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let top: Vec<TsNode<'_>> = root.named_children(&mut cursor).collect();
        let mut names: Vec<String> = Vec::new();
        for node in top {
            if !DEFINITIONS.contains(&node.kind()) {
                continue;
            }
            for name in self.defined_names(node) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}
