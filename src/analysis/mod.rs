//! Peek-side source analyzers.
//!
//! An [`Analyzer`] answers questions about one already-loaded source file:
//! where a symbol is defined, its signature, its statements, what it calls.
//! One analyzer is built per unit and queried by symbol name. Every method
//! returns a `Result` so that callers can catch a failing analyzer and fall
//! back to [`GenericAnalyzer`].

mod asm;
mod generic;
mod ld;
mod syntax;

pub use asm::AsmAnalyzer;
pub use generic::{filter_python_statements, filter_statements, GenericAnalyzer};
pub use ld::LdAnalyzer;
pub use syntax::SyntaxAnalyzer;

use tracing::warn;

use crate::errors::Result;
use crate::types::{AsmInfo, Language};

/// Per-unit source analysis capability.
pub trait Analyzer {
    /// One-line declaration of `name`, without its body.
    fn extract_signature(&self, name: &str) -> Result<Option<String>>;

    /// Significant statements of the body of `name`.
    fn extract_implementation(&self, name: &str) -> Result<Vec<String>>;

    /// Short descriptions of what `name` does, one per line.
    fn extract_behavior(&self, name: &str) -> Result<Vec<String>>;

    /// Names called directly by `name`, in first-call order.
    fn extract_callchain(&self, name: &str) -> Result<Vec<String>>;

    /// Labels and control flow of an assembly routine.
    fn extract_asm_info(&self, _name: &str) -> Result<AsmInfo> {
        Ok(AsmInfo::default())
    }

    /// Full source text of the definition of `name`.
    fn extract_definition(&self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    /// 1-based line on which `name` is defined.
    fn locate(&self, _name: &str) -> Result<Option<u32>> {
        Ok(None)
    }

    /// Names declared at the top level of the file.
    fn header_symbols(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Builds the analyzer for a unit of the given language.
///
/// Languages without a dedicated analyzer, and sources a tree-sitter grammar
/// cannot be loaded for, get the generic line-based analyzer.
pub fn analyzer_for(language: &Language, source: &str) -> Box<dyn Analyzer> {
    match language {
        Language::Python | Language::C | Language::Cpp | Language::Rust | Language::Java => {
            match SyntaxAnalyzer::new(language.clone(), source) {
                Ok(analyzer) => Box::new(analyzer),
                Err(e) => {
                    warn!(language = %language, "syntax analyzer unavailable: {e}");
                    Box::new(GenericAnalyzer::for_language(language, source))
                }
            }
        }
        Language::Asm => Box::new(AsmAnalyzer::new(source)),
        Language::Ld => Box::new(LdAnalyzer::new(source)),
        Language::Other(_) => Box::new(GenericAnalyzer::new(source)),
    }
}

/// Collapses runs of whitespace into single spaces.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
