//! Forward scanning of source files.
//!
//! Each extractor turns one file into the symbols, raw dependencies and
//! layout records that the forward pipeline feeds into a project model.
//! Structured languages are parsed with tree-sitter; assembly and linker
//! scripts use line patterns.

mod asm_extractor;
mod c_extractor;
mod java_extractor;
mod ld_extractor;
mod python_extractor;
mod rust_extractor;

pub use asm_extractor::AsmExtractor;
pub use c_extractor::{CDialect, CFamilyExtractor};
pub use java_extractor::JavaExtractor;
pub use ld_extractor::LdExtractor;
pub use python_extractor::PythonExtractor;
pub use rust_extractor::RustExtractor;

pub(crate) use asm_extractor::{call_target, strip_asm_comment, ASM_INSTRUCTION, ASM_LABEL};
pub(crate) use ld_extractor::strip_ld_comments;

use tree_sitter::{Node as TsNode, Parser, Tree};

use crate::types::{ExtractionResult, Language};

/// Trait for language-specific forward extractors.
pub trait LanguageExtractor: Send + Sync {
    /// File extensions this extractor handles (without leading dot).
    fn extensions(&self) -> &[&str];

    /// Language assigned to units scanned by this extractor.
    fn language(&self) -> Language;

    /// Extract symbols, dependencies and layout from source code.
    ///
    /// `file_path` is the project-relative path, used only for messages.
    fn extract(&self, file_path: &str, source: &str) -> ExtractionResult;
}

/// Registry of all available forward extractors.
///
/// Dispatches to the correct extractor based on file extension.
pub struct LanguageRegistry {
    extractors: Vec<Box<dyn LanguageExtractor>>,
}

impl LanguageRegistry {
    /// Creates a new registry with all built-in extractors.
    pub fn new() -> Self {
        Self {
            extractors: vec![
                Box::new(PythonExtractor),
                Box::new(CFamilyExtractor::new(CDialect::C)),
                Box::new(CFamilyExtractor::new(CDialect::Cpp)),
                Box::new(RustExtractor),
                Box::new(JavaExtractor),
                Box::new(AsmExtractor),
                Box::new(LdExtractor),
            ],
        }
    }

    /// Returns the extractor for a file path based on its extension.
    pub fn extractor_for_file(&self, path: &str) -> Option<&dyn LanguageExtractor> {
        let file_name = path.rsplit('/').next()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        self.extractors
            .iter()
            .find(|e| e.extensions().contains(&ext))
            .map(|e| e.as_ref())
    }

    /// Returns all supported file extensions across all extractors.
    pub fn supported_extensions(&self) -> Vec<&str> {
        self.extractors
            .iter()
            .flat_map(|e| e.extensions().iter().copied())
            .collect()
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the tree-sitter grammar for a language, if one is bundled.
pub(crate) fn grammar_for(language: &Language) -> Option<tree_sitter::Language> {
    match language {
        Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
        Language::C => Some(tree_sitter_c::LANGUAGE.into()),
        Language::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
        Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
        Language::Java => Some(tree_sitter_java::LANGUAGE.into()),
        Language::Asm | Language::Ld | Language::Other(_) => None,
    }
}

/// Parse source code into a tree-sitter AST.
pub(crate) fn parse_source(language: &Language, source: &str) -> Result<Tree, String> {
    let grammar =
        grammar_for(language).ok_or_else(|| format!("no grammar bundled for {language}"))?;
    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| format!("failed to load {language} grammar: {e}"))?;
    parser
        .parse(source, None)
        .ok_or_else(|| "tree-sitter parse returned None".to_string())
}

/// 1-based line of a node's first character.
pub(crate) fn line_of(node: TsNode<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

/// Text of a node, or an empty string for invalid UTF-8.
pub(crate) fn node_text<'s>(node: TsNode<'_>, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}
