use std::cell::OnceCell;
use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::analysis::{analyzer_for, Analyzer, GenericAnalyzer};
use crate::errors::Result;
use crate::extraction::grammar_for;
use crate::ir::ProjectIr;
use crate::types::*;

/// Default recursion limit for call chains.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Source text of units, keyed by unit id.
pub type SourceMap = BTreeMap<UnitId, String>;

/// Where a resolved reference is defined.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub unit: UnitId,
    pub path: String,
    pub kind: String,
    pub line: Option<u32>,
}

/// A call chain rooted at one symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallChain {
    /// `uN#name` entries in discovery order, starting with the root.
    pub path: Vec<String>,
    /// Entries whose unit was picked among several defining units.
    pub low_confidence: Vec<String>,
}

/// Per-unit access to analyzers over loaded sources.
///
/// Analyzers are built lazily, at most once per unit. A failing analyzer
/// call is logged and answered by the generic line-range analyzer instead.
pub struct Extractor<'a> {
    ir: &'a ProjectIr,
    sources: SourceMap,
    analyzers: Vec<OnceCell<Box<dyn Analyzer>>>,
    fallbacks: Vec<OnceCell<GenericAnalyzer>>,
}

impl<'a> Extractor<'a> {
    pub fn new(ir: &'a ProjectIr, sources: SourceMap) -> Self {
        let count = ir.units().len();
        Self {
            ir,
            sources,
            analyzers: (0..count).map(|_| OnceCell::new()).collect(),
            fallbacks: (0..count).map(|_| OnceCell::new()).collect(),
        }
    }

    /// Installs `analyzer` for `unit` in place of the language default.
    /// Has no effect once the unit's analyzer has been built.
    pub fn with_analyzer(self, unit: UnitId, analyzer: Box<dyn Analyzer>) -> Self {
        if let Some(cell) = self.analyzers.get(unit.index()) {
            let _ = cell.set(analyzer);
        }
        self
    }

    pub fn ir(&self) -> &'a ProjectIr {
        self.ir
    }

    fn source(&self, unit: UnitId) -> &str {
        self.sources.get(&unit).map(String::as_str).unwrap_or("")
    }

    fn analyzer(&self, unit: UnitId) -> Option<&dyn Analyzer> {
        let cell = self.analyzers.get(unit.index())?;
        let language = &self.ir.unit(unit)?.language;
        Some(
            cell.get_or_init(|| {
                debug!(%unit, %language, "building analyzer");
                analyzer_for(language, self.source(unit))
            })
            .as_ref(),
        )
    }

    fn fallback(&self, unit: UnitId) -> Option<&GenericAnalyzer> {
        let cell = self.fallbacks.get(unit.index())?;
        let language = &self.ir.unit(unit)?.language;
        Some(cell.get_or_init(|| GenericAnalyzer::for_language(language, self.source(unit))))
    }

    /// Runs `op` against the unit's analyzer, retrying with the generic
    /// analyzer if it fails. Units parsed with a grammar also retry on an
    /// empty answer.
    fn query<T: Default + PartialEq>(
        &self,
        unit: UnitId,
        name: &str,
        op: impl Fn(&dyn Analyzer) -> Result<T>,
    ) -> T {
        let Some(analyzer) = self.analyzer(unit) else {
            return T::default();
        };
        let retry = || {
            self.fallback(unit)
                .and_then(|generic| op(generic as &dyn Analyzer).ok())
                .unwrap_or_default()
        };
        match op(analyzer) {
            Ok(value) if value != T::default() || !self.has_grammar(unit) => value,
            Ok(_) => {
                debug!(%unit, symbol = name, "empty answer, trying generic analyzer");
                retry()
            }
            Err(e) => {
                warn!(%unit, symbol = name, "analyzer failed, using generic fallback: {e}");
                retry()
            }
        }
    }

    fn has_grammar(&self, unit: UnitId) -> bool {
        self.ir
            .unit(unit)
            .is_some_and(|u| grammar_for(&u.language).is_some())
    }

    /// Locates the definition behind a resolved reference.
    pub fn extract(&self, resolved: &ResolvedRef) -> Option<Location> {
        let uid = resolved.unit?;
        let unit = self.ir.unit(uid)?;
        match (&resolved.kind, &resolved.symbol) {
            (RefKind::Symbol, Some(name)) => {
                let kind = self
                    .ir
                    .symbol_in_unit(uid, name)
                    .map(|s| s.kind.clone())
                    .unwrap_or_default();
                Some(Location {
                    unit: uid,
                    path: unit.path.clone(),
                    kind,
                    line: self.locate(uid, name),
                })
            }
            _ => Some(Location {
                unit: uid,
                path: unit.path.clone(),
                kind: "unit".to_string(),
                line: None,
            }),
        }
    }

    /// 1-based definition line, from the analyzer or the line recorded at
    /// scan time.
    pub fn locate(&self, unit: UnitId, name: &str) -> Option<u32> {
        self.query(unit, name, |a| a.locate(name))
            .or_else(|| self.ir.symbol_in_unit(unit, name).and_then(Symbol::line))
    }

    pub fn extract_definition(&self, unit: UnitId, name: &str) -> Option<String> {
        self.query(unit, name, |a| a.extract_definition(name))
    }

    pub fn extract_signature(&self, unit: UnitId, name: &str) -> Option<String> {
        self.query(unit, name, |a| a.extract_signature(name))
    }

    /// Signatures of a symbol, or of every symbol of a unit. Units the IR
    /// has no symbols for are asked for their top-level declarations.
    pub fn extract_signatures(&self, resolved: &ResolvedRef) -> Vec<String> {
        let Some(uid) = resolved.unit else {
            return Vec::new();
        };
        if let (RefKind::Symbol, Some(name)) = (&resolved.kind, &resolved.symbol) {
            return self.extract_signature(uid, name).into_iter().collect();
        }
        let mut names: Vec<String> = self
            .ir
            .symbols_of(uid)
            .iter()
            .map(|s| s.name.clone())
            .collect();
        if names.is_empty() {
            names = self.query(uid, "", |a| a.header_symbols());
        }
        names
            .iter()
            .filter_map(|name| self.extract_signature(uid, name))
            .collect()
    }

    pub fn extract_implementation(&self, unit: UnitId, name: &str) -> Vec<String> {
        self.query(unit, name, |a| a.extract_implementation(name))
    }

    pub fn extract_behavior(&self, unit: UnitId, name: &str) -> Vec<String> {
        self.query(unit, name, |a| a.extract_behavior(name))
    }

    pub fn extract_asm_info(&self, unit: UnitId, name: &str) -> AsmInfo {
        self.query(unit, name, |a| a.extract_asm_info(name))
    }

    /// Summary facts of a unit, symbol or layout target.
    pub fn extract_summary(&self, resolved: &ResolvedRef) -> Content {
        let mut content = Content::new();
        match (resolved.kind, resolved.unit, resolved.symbol.as_deref()) {
            (RefKind::Layout, _, Some(key)) => {
                let value = self.ir.layout_value(key).unwrap_or("");
                content.insert("start", layout_token(value, "start"));
                content.insert("size", layout_token(value, "size"));
                content.insert("value", value);
            }
            (RefKind::Unit, Some(uid), _) => {
                if let Some(unit) = self.ir.unit(uid) {
                    content.insert("type", unit.language.as_tag());
                    content.insert("module", unit.module.as_str());
                    content.insert("role", unit.role.as_str());
                    content.insert("path", unit.path.as_str());
                    content.insert("symbol_count", self.ir.symbols_of(uid).len().to_string());
                }
            }
            (RefKind::Symbol, Some(uid), Some(name)) => {
                let kind = self
                    .ir
                    .symbol_in_unit(uid, name)
                    .map(|s| s.kind.clone())
                    .unwrap_or_default();
                content.insert("type", kind);
                content.insert("unit", uid.to_string());
                if let Some(signature) = self.extract_signature(uid, name) {
                    content.insert("signature", signature);
                }
                let behavior = self.extract_behavior(uid, name);
                if !behavior.is_empty() {
                    content.insert("behavior", behavior);
                }
            }
            _ => {}
        }
        content
    }

    /// Follows calls from `name` in `unit`.
    ///
    /// A called name resolves to the current unit when it defines it, and
    /// otherwise to the lowest-numbered unit that does; the latter choice is
    /// reported in `low_confidence` when several units qualify. `visited`
    /// stops cycles and is shared across calls. Recursion stops after
    /// `max_depth` levels and the chain found so far is returned.
    pub fn extract_callchain(
        &self,
        unit: UnitId,
        name: &str,
        visited: &mut HashSet<(UnitId, String)>,
        max_depth: usize,
    ) -> CallChain {
        let mut chain = CallChain::default();
        self.follow(unit, name, visited, max_depth, &mut chain);
        chain
    }

    fn follow(
        &self,
        unit: UnitId,
        name: &str,
        visited: &mut HashSet<(UnitId, String)>,
        depth_left: usize,
        chain: &mut CallChain,
    ) {
        if !visited.insert((unit, name.to_string())) {
            return;
        }
        chain.path.push(format!("{unit}#{name}"));
        if depth_left == 0 {
            debug!(%unit, symbol = name, "call chain depth exhausted");
            return;
        }
        let callees: Vec<String> = self.query(unit, name, |a| a.extract_callchain(name));
        for callee in callees {
            let candidates = self.ir.units_defining(&callee);
            let target = if candidates.contains(&unit) {
                unit
            } else {
                match candidates.first() {
                    Some(first) => {
                        let guessed = format!("{first}#{callee}");
                        if candidates.len() > 1
                            && !visited.contains(&(*first, callee.clone()))
                            && !chain.low_confidence.contains(&guessed)
                        {
                            chain.low_confidence.push(guessed);
                        }
                        *first
                    }
                    None => continue,
                }
            };
            self.follow(target, &callee, visited, depth_left - 1, chain);
        }
    }
}

/// Value of a `key=value` token inside a layout value, or `unknown`.
fn layout_token(value: &str, key: &str) -> String {
    value
        .split_whitespace()
        .find_map(|token| token.strip_prefix(key)?.strip_prefix('='))
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_token() {
        assert_eq!(layout_token("start=0x8000 size=64K", "size"), "64K");
        assert_eq!(layout_token("0x80000000", "start"), "unknown");
    }
}
