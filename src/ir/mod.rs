/// Project intermediate representation.
///
/// [`ProjectModel`] is the mutable builder used during scanning; once its
/// dependencies are finalized it is frozen into a [`ProjectIr`], which owns a
/// single [`IrIndex`] and is shared by reference with every query component.
pub mod canon;
pub mod index;
pub mod model;
pub mod parser;
pub mod profile;
pub mod writer;

pub use index::IrIndex;
pub use model::{DependencyInterner, ProjectMeta, ProjectModel};
pub use parser::{parse_pir, parse_pir_from};
pub use profile::ProfileDetector;
pub use writer::write_pir;

use std::collections::BTreeSet;

use crate::errors::Result;
use crate::types::*;

/// A finalized, read-only project IR with its lookup index.
#[derive(Debug, Clone)]
pub struct ProjectIr {
    model: ProjectModel,
    index: IrIndex,
}

impl ProjectIr {
    /// Parses PIR text and freezes the result.
    pub fn parse(text: &str) -> Result<ProjectIr> {
        parse_pir(text)?.freeze()
    }

    /// Serializes back to PIR text.
    pub fn to_pir_string(&self) -> Result<String> {
        write_pir(&self.model)
    }

    pub fn model(&self) -> &ProjectModel {
        &self.model
    }

    pub fn index(&self) -> &IrIndex {
        &self.index
    }

    pub fn units(&self) -> &[Unit] {
        self.model.units()
    }

    pub fn unit(&self, uid: UnitId) -> Option<&Unit> {
        self.model.unit(uid)
    }

    /// Looks up a unit from its textual id.
    pub fn unit_by_ref(&self, text: &str) -> Option<&Unit> {
        UnitId::parse(text).and_then(|uid| self.unit(uid))
    }

    fn symbol_at(&self, pos: usize) -> &Symbol {
        &self.model.symbols()[pos]
    }

    pub fn symbols_named(&self, name: &str) -> Vec<&Symbol> {
        self.index
            .symbols_named(name)
            .iter()
            .map(|&p| self.symbol_at(p))
            .collect()
    }

    pub fn symbols_of(&self, unit: UnitId) -> Vec<&Symbol> {
        self.index
            .symbols_of(unit)
            .iter()
            .map(|&p| self.symbol_at(p))
            .collect()
    }

    /// First symbol named `name` defined in `unit`.
    pub fn symbol_in_unit(&self, unit: UnitId, name: &str) -> Option<&Symbol> {
        self.symbols_named(name).into_iter().find(|s| s.unit == unit)
    }

    pub fn entries_named(&self, name: &str) -> Vec<&Symbol> {
        self.index
            .entries_named(name)
            .iter()
            .map(|&p| self.symbol_at(p))
            .collect()
    }

    /// Distinct units that define `name`, in ascending id order.
    pub fn units_defining(&self, name: &str) -> Vec<UnitId> {
        let set: BTreeSet<UnitId> = self.symbols_named(name).iter().map(|s| s.unit).collect();
        set.into_iter().collect()
    }

    pub fn layout_value(&self, key: &str) -> Option<&str> {
        self.index
            .layout_position(key)
            .map(|p| self.model.layout()[p].value.as_str())
    }

    pub fn has_layout_key(&self, key: &str) -> bool {
        self.index.layout_position(key).is_some()
    }

    pub fn snippets_of(&self, unit: UnitId) -> Vec<&str> {
        self.index
            .snippets_of(unit)
            .iter()
            .map(|&p| self.model.snippets()[p].content.as_str())
            .collect()
    }
}
