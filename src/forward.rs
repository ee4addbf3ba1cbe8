//! Forward pipeline: scanned sources in, finalized project model out.
//!
//! The pipeline is pure over already-loaded text. Files are processed in
//! path order so that unit ids, and therefore the whole PIR document, do not
//! depend on the order in which a directory walk happened to return them.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::extraction::LanguageRegistry;
use crate::ir::{ProfileDetector, ProjectMeta, ProjectModel};
use crate::types::{ExtractionResult, Language, Symbol};

/// A source file handed to the forward pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Project-relative path with `/` separators.
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: &str, content: &str) -> Self {
        Self {
            path: path.to_string(),
            content: content.to_string(),
        }
    }
}

/// Module name of a unit: its parent directory, or `root`.
pub fn module_of(path: &str) -> String {
    let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    parts.pop();
    parts
        .last()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "root".to_string())
}

/// Scans `files` and builds a finalized model with detected profiles.
///
/// Files without a registered extractor are ignored. Scan errors of a
/// single file are logged and do not abort the build.
pub fn build_project(
    meta: ProjectMeta,
    files: &[SourceFile],
    registry: &LanguageRegistry,
) -> Result<ProjectModel> {
    let start = Instant::now();
    let mut ordered: Vec<&SourceFile> = files.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));
    ordered.dedup_by(|a, b| a.path == b.path);

    let mut model = ProjectModel::new(meta);

    for file in ordered {
        let Some(extractor) = registry.extractor_for_file(&file.path) else {
            debug!(path = %file.path, "no extractor, skipping");
            continue;
        };
        let result = extractor.extract(&file.path, &file.content);
        for err in &result.errors {
            warn!(path = %file.path, "scan error: {err}");
        }
        add_scanned_unit(&mut model, &file.path, extractor.language(), result)?;
    }

    model.canonicalize_dependencies()?;
    model.resolve_symbol_dependencies()?;
    model.finalize_dependencies()?;
    ProfileDetector::new().apply(&mut model)?;

    info!(
        units = model.units().len(),
        symbols = model.symbols().len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "forward pass complete"
    );
    Ok(model)
}

/// Adds one scanned file as a unit together with its symbols, raw
/// dependencies and layout records.
fn add_scanned_unit(
    model: &mut ProjectModel,
    path: &str,
    language: Language,
    result: ExtractionResult,
) -> Result<()> {
    let role = if result.symbols.iter().any(|s| s.is_entry()) {
        "entry"
    } else {
        "lib"
    };
    let uid = model.add_unit(path, language, role, &module_of(path));

    for scanned in result.symbols {
        let mut symbol = Symbol::new(&scanned.name, uid, &scanned.kind);
        symbol.attrs = scanned.attrs;
        model.add_symbol(symbol)?;
    }
    for dep in result.dependencies {
        model.add_dependency(uid, &dep.verb, &dep.target)?;
    }
    for entry in result.layout {
        model.add_layout(&entry.key, &entry.value);
    }
    Ok(())
}
