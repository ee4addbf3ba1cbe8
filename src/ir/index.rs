use std::collections::HashMap;

use crate::ir::model::ProjectModel;
use crate::types::UnitId;

/// Read-only lookup tables over a finalized model.
///
/// Built once when the model is frozen; every query component borrows it
/// through [`crate::ir::ProjectIr`] instead of scanning the model itself.
/// All lists hold symbol positions in model order.
#[derive(Debug, Clone, Default)]
pub struct IrIndex {
    by_name: HashMap<String, Vec<usize>>,
    by_unit: Vec<Vec<usize>>,
    entries: HashMap<String, Vec<usize>>,
    layout: HashMap<String, usize>,
    snippets: HashMap<UnitId, Vec<usize>>,
}

impl IrIndex {
    pub fn build(model: &ProjectModel) -> Self {
        let mut index = IrIndex {
            by_unit: vec![Vec::new(); model.units().len()],
            ..IrIndex::default()
        };

        for (pos, symbol) in model.symbols().iter().enumerate() {
            index.by_name.entry(symbol.name.clone()).or_default().push(pos);
            if let Some(list) = index.by_unit.get_mut(symbol.unit.index()) {
                list.push(pos);
            }
            if symbol.is_entry() {
                index.entries.entry(symbol.name.clone()).or_default().push(pos);
            }
        }

        for (pos, entry) in model.layout().iter().enumerate() {
            index.layout.entry(entry.key.clone()).or_insert(pos);
        }

        for (pos, snippet) in model.snippets().iter().enumerate() {
            index.snippets.entry(snippet.unit).or_default().push(pos);
        }

        index
    }

    pub fn symbols_named(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn symbols_of(&self, unit: UnitId) -> &[usize] {
        self.by_unit.get(unit.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entries_named(&self, name: &str) -> &[usize] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn layout_position(&self, key: &str) -> Option<usize> {
        self.layout.get(key).copied()
    }

    pub fn snippets_of(&self, unit: UnitId) -> &[usize] {
        self.snippets.get(&unit).map(Vec::as_slice).unwrap_or(&[])
    }
}
