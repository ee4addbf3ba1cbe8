use tracing::trace;

use crate::ir::ProjectIr;
use crate::types::*;

/// Resolves the reference of a [`Need`] against a frozen project IR.
///
/// Rules are tried in a fixed order and the first one that produces a result
/// wins:
/// 1. `uN#name`: a symbol of a known unit (`uN#` alone names the unit).
/// 2. `uN`: a known unit.
/// 3. Layout needs, or refs that are layout keys, when the key exists.
/// 4. Entry needs, or refs naming an entry symbol, when an entry matches.
/// 5. A name defined in exactly one unit.
/// 6. A name defined in several units, which is ambiguous.
/// 7. Anything else is missing.
///
/// The resolver borrows the IR's index and keeps no state of its own, so
/// one instance can serve any number of needs.
pub struct Resolver<'a> {
    ir: &'a ProjectIr,
}

impl<'a> Resolver<'a> {
    pub fn new(ir: &'a ProjectIr) -> Self {
        Self { ir }
    }

    pub fn resolve(&self, need: &Need) -> ResolvedRef {
        let reference = need.reference.as_str();
        let resolved = self
            .resolve_unit_symbol(reference)
            .or_else(|| self.resolve_unit(reference))
            .or_else(|| self.resolve_layout(need))
            .or_else(|| self.resolve_entry(need))
            .or_else(|| self.resolve_by_name(reference))
            .unwrap_or_else(ResolvedRef::missing);
        trace!(reference, kind = ?resolved.kind, "resolved");
        resolved
    }

    /// Rule 1. Once the unit part names a known unit the rule always
    /// decides, even when the symbol part is not found.
    fn resolve_unit_symbol(&self, reference: &str) -> Option<ResolvedRef> {
        let (unit_part, symbol_part) = reference.split_once('#')?;
        let unit = self.ir.unit_by_ref(unit_part)?;
        if symbol_part.is_empty() {
            return Some(ResolvedRef::unit(unit.uid, &unit.path));
        }
        Some(match self.ir.symbol_in_unit(unit.uid, symbol_part) {
            Some(symbol) => ResolvedRef::symbol(unit.uid, &symbol.name, &unit.path),
            None => ResolvedRef::missing(),
        })
    }

    /// Rule 2.
    fn resolve_unit(&self, reference: &str) -> Option<ResolvedRef> {
        let unit = self.ir.unit_by_ref(reference)?;
        Some(ResolvedRef::unit(unit.uid, &unit.path))
    }

    /// Rule 3. A layout need for an unknown key falls through.
    fn resolve_layout(&self, need: &Need) -> Option<ResolvedRef> {
        let known = self.ir.has_layout_key(&need.reference);
        if need.need_type != NeedType::Layout && !known {
            return None;
        }
        known.then(|| ResolvedRef::layout(&need.reference))
    }

    /// Rule 4.
    fn resolve_entry(&self, need: &Need) -> Option<ResolvedRef> {
        let entries = self.ir.entries_named(&need.reference);
        if need.need_type != NeedType::Entry && entries.is_empty() {
            return None;
        }
        match entries.as_slice() {
            [] => None,
            [symbol] => {
                let path = self.unit_path(symbol.unit);
                Some(ResolvedRef::symbol(symbol.unit, &symbol.name, &path))
            }
            many => {
                let suggestions = many
                    .iter()
                    .filter_map(|symbol| {
                        let unit = self.ir.unit(symbol.unit)?;
                        Some(Suggestion {
                            reference: format!("{}#{}", unit.uid, symbol.name),
                            desc: format!("entry in {} ({})", unit.language, unit.path),
                            kind: symbol.kind.clone(),
                            entry: true,
                            language: unit.language.clone(),
                            path: unit.path.clone(),
                        })
                    })
                    .collect();
                Some(ResolvedRef::ambiguous(&need.reference, suggestions))
            }
        }
    }

    /// Rules 5 and 6: plain name lookup across all units.
    fn resolve_by_name(&self, reference: &str) -> Option<ResolvedRef> {
        let units = self.ir.units_defining(reference);
        match units.as_slice() {
            [] => None,
            [uid] => {
                let symbol = self.ir.symbol_in_unit(*uid, reference)?;
                let path = self.unit_path(*uid);
                Some(ResolvedRef::symbol(*uid, &symbol.name, &path))
            }
            many => {
                let suggestions = many
                    .iter()
                    .filter_map(|uid| self.suggestion_for(*uid, reference))
                    .collect();
                Some(ResolvedRef::ambiguous(reference, suggestions))
            }
        }
    }

    fn suggestion_for(&self, uid: UnitId, name: &str) -> Option<Suggestion> {
        let unit = self.ir.unit(uid)?;
        let symbol = self.ir.symbol_in_unit(uid, name)?;
        let entry = symbol.is_entry();
        let desc = if entry {
            format!("{} entry in {}", symbol.kind, unit.language)
        } else {
            format!("{} in {}", symbol.kind, unit.language)
        };
        Some(Suggestion {
            reference: format!("{}#{}", uid, name),
            desc,
            kind: symbol.kind.clone(),
            entry,
            language: unit.language.clone(),
            path: unit.path.clone(),
        })
    }

    fn unit_path(&self, uid: UnitId) -> String {
        self.ir
            .unit(uid)
            .map(|u| u.path.clone())
            .unwrap_or_default()
    }
}
