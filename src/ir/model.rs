use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::errors::{AirError, Result};
use crate::ir::canon;
use crate::ir::index::IrIndex;
use crate::ir::ProjectIr;
use crate::types::*;

/// Project-level metadata written to the `<meta>` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectMeta {
    pub name: String,
    pub root: String,
    pub profile: String,
    /// Unrecognized `<meta>` keys, kept in document order.
    pub extra: Vec<(String, String)>,
}

impl ProjectMeta {
    pub fn new(name: &str, root: &str, profile: &str) -> Self {
        Self {
            name: name.to_string(),
            root: root.to_string(),
            profile: profile.to_string(),
            extra: Vec::new(),
        }
    }
}

/// Splits a dependency key into `(verb, target)` at the first `:`.
pub fn split_key(key: &str) -> (&str, &str) {
    key.split_once(':').unwrap_or((key, ""))
}

// ---------------------------------------------------------------------------
// Dependency interner
// ---------------------------------------------------------------------------

/// Two-phase dependency store.
///
/// Keys are recorded per unit while scanning, may be rewritten freely, and
/// are only assigned `dN` identifiers by [`DependencyInterner::finalize`],
/// which numbers the lexicographically sorted set of distinct keys. The
/// resulting pool therefore never depends on the order units were scanned.
#[derive(Debug, Clone, Default)]
pub struct DependencyInterner {
    unit_keys: BTreeMap<UnitId, Vec<String>>,
    all_keys: BTreeSet<String>,
    pool: Vec<String>,
    refs: BTreeMap<UnitId, Vec<usize>>,
    finalized: bool,
}

impl DependencyInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds an already-interned store, as read back from a PIR document.
    pub fn from_pool(pool: Vec<String>, refs: BTreeMap<UnitId, Vec<usize>>) -> Self {
        let all_keys = pool.iter().cloned().collect();
        let unit_keys = refs
            .iter()
            .map(|(uid, ids)| (*uid, ids.iter().map(|&i| pool[i].clone()).collect()))
            .collect();
        Self {
            unit_keys,
            all_keys,
            pool,
            refs,
            finalized: true,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn guard(&self, operation: &str) -> Result<()> {
        if self.finalized {
            return Err(AirError::DependenciesFinalized {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// Records `verb:target` for `unit`. Returns `false` when the unit already
    /// had that key.
    pub fn add(&mut self, unit: UnitId, verb: &str, target: &str) -> Result<bool> {
        self.guard("add dependency")?;
        validate(verb, target)?;

        let key = format!("{verb}:{target}");
        let keys = self.unit_keys.entry(unit).or_default();
        if keys.contains(&key) {
            return Ok(false);
        }
        keys.push(key.clone());
        self.all_keys.insert(key);
        Ok(true)
    }

    /// Rewrites every target through `f(unit, verb, target)`.
    ///
    /// Each unit's list is re-deduplicated keeping first occurrences, and the
    /// global key set is rebuilt so replaced keys do not linger in the pool.
    pub fn rewrite_targets<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(UnitId, &str, &str) -> String,
    {
        self.guard("rewrite dependencies")?;

        let mut all_keys = BTreeSet::new();
        for (uid, keys) in self.unit_keys.iter_mut() {
            let mut seen = BTreeSet::new();
            let mut rewritten = Vec::with_capacity(keys.len());
            for key in keys.iter() {
                let (verb, target) = split_key(key);
                let new_key = format!("{verb}:{}", f(*uid, verb, target));
                if seen.insert(new_key.clone()) {
                    rewritten.push(new_key);
                }
            }
            all_keys.extend(rewritten.iter().cloned());
            *keys = rewritten;
        }
        self.all_keys = all_keys;
        Ok(())
    }

    /// Assigns `d0, d1, ...` to the sorted key set and converts every unit's
    /// key list into an ID list, preserving per-unit insertion order.
    pub fn finalize(&mut self) -> Result<()> {
        self.guard("finalize")?;

        self.pool = self.all_keys.iter().cloned().collect();
        let ids: HashMap<&str, usize> = self
            .pool
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_str(), i))
            .collect();

        self.refs = self
            .unit_keys
            .iter()
            .map(|(uid, keys)| (*uid, keys.iter().map(|k| ids[k.as_str()]).collect()))
            .collect();
        self.finalized = true;

        debug!(pool = self.pool.len(), units = self.refs.len(), "dependencies finalized");
        Ok(())
    }

    /// Sorted pool of distinct keys; index `i` is `d<i>`.
    pub fn pool(&self) -> Result<&[String]> {
        if !self.finalized {
            return Err(AirError::DependenciesNotFinalized {
                operation: "read dependency pool".to_string(),
            });
        }
        Ok(&self.pool)
    }

    /// Pool indices referenced by `unit`, in insertion order.
    pub fn refs(&self, unit: UnitId) -> &[usize] {
        self.refs.get(&unit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys recorded for `unit`, in insertion order.
    pub fn keys(&self, unit: UnitId) -> &[String] {
        self.unit_keys.get(&unit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All distinct keys currently registered.
    pub fn all_keys(&self) -> impl Iterator<Item = &str> {
        self.all_keys.iter().map(String::as_str)
    }
}

fn validate(verb: &str, target: &str) -> Result<()> {
    if verb.is_empty() || verb.contains(':') || verb.chars().any(char::is_whitespace) {
        return Err(AirError::InvalidDependency {
            message: format!("bad verb '{verb}'"),
        });
    }
    if target.is_empty() || target.contains('\n') {
        return Err(AirError::InvalidDependency {
            message: format!("bad target for verb '{verb}'"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Project model
// ---------------------------------------------------------------------------

/// Mutable IR under construction.
///
/// Units are numbered in first-seen order and deduplicated by path. Once the
/// dependencies are finalized the model can be frozen into a [`ProjectIr`]
/// for querying.
#[derive(Debug, Clone, Default)]
pub struct ProjectModel {
    meta: ProjectMeta,
    units: Vec<Unit>,
    path_index: HashMap<String, UnitId>,
    symbols: Vec<Symbol>,
    deps: DependencyInterner,
    layout: Vec<LayoutEntry>,
    snippets: Vec<Snippet>,
    profiles: Vec<ProfileMatch>,
    active_profile: Option<String>,
}

impl ProjectModel {
    pub fn new(meta: ProjectMeta) -> Self {
        Self {
            meta,
            ..Self::default()
        }
    }

    pub(crate) fn set_dependencies(&mut self, deps: DependencyInterner) {
        self.deps = deps;
    }

    // -- units and symbols --------------------------------------------------

    /// Adds a unit, or returns the existing id if `path` is already known.
    pub fn add_unit(&mut self, path: &str, language: Language, role: &str, module: &str) -> UnitId {
        if let Some(uid) = self.path_index.get(path) {
            return *uid;
        }
        let uid = UnitId(self.units.len() as u32);
        self.units.push(Unit {
            uid,
            path: path.to_string(),
            language,
            role: role.to_string(),
            module: module.to_string(),
        });
        self.path_index.insert(path.to_string(), uid);
        uid
    }

    pub fn add_symbol(&mut self, symbol: Symbol) -> Result<()> {
        self.require_unit(symbol.unit)?;
        self.symbols.push(symbol);
        Ok(())
    }

    fn require_unit(&self, uid: UnitId) -> Result<&Unit> {
        self.units.get(uid.index()).ok_or_else(|| AirError::UnknownUnit {
            uid: uid.to_string(),
        })
    }

    pub fn add_layout(&mut self, key: &str, value: &str) {
        self.layout.push(LayoutEntry {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub fn add_snippet(&mut self, unit: UnitId, content: &str) -> Result<()> {
        self.require_unit(unit)?;
        self.snippets.push(Snippet {
            unit,
            content: content.trim().to_string(),
        });
        Ok(())
    }

    /// Replaces the detected profiles. The active profile is the one with the
    /// highest confidence; the earliest wins a tie.
    pub fn set_profiles(&mut self, profiles: Vec<ProfileMatch>) {
        let mut active: Option<&ProfileMatch> = None;
        for p in &profiles {
            if active.map_or(true, |a| p.confidence > a.confidence) {
                active = Some(p);
            }
        }
        self.active_profile = active.map(|p| p.name.clone());
        self.profiles = profiles;
    }

    pub(crate) fn set_active_profile(&mut self, name: Option<String>) {
        self.active_profile = name;
    }

    // -- dependencies -------------------------------------------------------

    pub fn add_dependency(&mut self, unit: UnitId, verb: &str, target: &str) -> Result<bool> {
        self.require_unit(unit)?;
        self.deps.add(unit, verb, target)
    }

    /// Rewrites bracketed targets naming a standard-library module of the
    /// owning unit's language into their `[stdlib:*]` bucket.
    pub fn canonicalize_dependencies(&mut self) -> Result<()> {
        let languages: Vec<Language> = self.units.iter().map(|u| u.language.clone()).collect();
        self.deps.rewrite_targets(|uid, _verb, target| {
            match languages.get(uid.index()) {
                Some(lang) => canon::canonicalize_target(target, lang),
                None => target.to_string(),
            }
        })
    }

    /// Rewrites `[name]` into `[uN#name]` when exactly one symbol in the
    /// project is called `name`.
    pub fn resolve_symbol_dependencies(&mut self) -> Result<()> {
        let unique = canon::unique_symbol_owners(&self.symbols);
        self.deps
            .rewrite_targets(|_uid, _verb, target| canon::resolve_symbol_target(target, &unique))
    }

    pub fn finalize_dependencies(&mut self) -> Result<()> {
        self.deps.finalize()
    }

    pub fn is_finalized(&self) -> bool {
        self.deps.is_finalized()
    }

    pub fn dependencies(&self) -> &DependencyInterner {
        &self.deps
    }

    // -- accessors ----------------------------------------------------------

    pub fn meta(&self) -> &ProjectMeta {
        &self.meta
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, uid: UnitId) -> Option<&Unit> {
        self.units.get(uid.index())
    }

    pub fn unit_by_path(&self, path: &str) -> Option<&Unit> {
        self.path_index.get(path).and_then(|uid| self.unit(*uid))
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn layout(&self) -> &[LayoutEntry] {
        &self.layout
    }

    pub fn snippets(&self) -> &[Snippet] {
        &self.snippets
    }

    pub fn profiles(&self) -> &[ProfileMatch] {
        &self.profiles
    }

    pub fn active_profile(&self) -> Option<&str> {
        self.active_profile.as_deref()
    }

    /// Sorted, distinct language tags of all units.
    pub fn languages(&self) -> Vec<String> {
        let tags: BTreeSet<&str> = self.units.iter().map(|u| u.language.as_tag()).collect();
        tags.into_iter().map(str::to_string).collect()
    }

    pub fn stats(&self) -> IrStats {
        let mut units_by_language = BTreeMap::new();
        for u in &self.units {
            *units_by_language
                .entry(u.language.as_tag().to_string())
                .or_insert(0) += 1;
        }
        let mut symbols_by_kind = BTreeMap::new();
        for s in &self.symbols {
            *symbols_by_kind.entry(s.kind.clone()).or_insert(0) += 1;
        }
        IrStats {
            name: self.meta.name.clone(),
            unit_count: self.units.len(),
            symbol_count: self.symbols.len(),
            dependency_count: self.deps.pool().map(|p| p.len()).unwrap_or(0),
            layout_count: self.layout.len(),
            snippet_count: self.snippets.len(),
            units_by_language,
            symbols_by_kind,
            active_profile: self.active_profile.clone(),
        }
    }

    /// Freezes the model for querying. Fails if dependencies are not finalized.
    pub fn freeze(self) -> Result<ProjectIr> {
        if !self.is_finalized() {
            return Err(AirError::DependenciesNotFinalized {
                operation: "freeze".to_string(),
            });
        }
        let index = IrIndex::build(&self);
        Ok(ProjectIr { model: self, index })
    }
}
