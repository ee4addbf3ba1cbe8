use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{load_config, save_config, should_include_file, AirConfig};
use crate::errors::{AirError, Result};
use crate::evidence::{self, SourceMap};
use crate::extraction::LanguageRegistry;
use crate::forward::{build_project, SourceFile};
use crate::ir::{parse_pir_from, ProjectIr, ProjectMeta};
use crate::types::*;

/// Orchestrates file access around the pure forward and peek pipelines.
pub struct Air {
    config: AirConfig,
    project_root: PathBuf,
}

/// Result of a forward pass.
pub struct ForwardResult {
    /// The frozen IR.
    pub ir: ProjectIr,
    /// PIR text of `ir`.
    pub pir: String,
    /// Aggregate counts over `ir`.
    pub stats: IrStats,
    /// Number of source files read.
    pub file_count: usize,
    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

impl Air {
    /// Writes a default configuration under `<root>/.air/` and opens it.
    pub fn init(project_root: &Path) -> Result<Self> {
        let config = AirConfig {
            root_dir: project_root.to_string_lossy().to_string(),
            ..AirConfig::default()
        };
        save_config(project_root, &config)?;
        Ok(Self {
            config,
            project_root: project_root.to_path_buf(),
        })
    }

    /// Opens the project at `project_root`. A project without a saved
    /// configuration uses the defaults.
    pub fn open(project_root: &Path) -> Result<Self> {
        if !project_root.is_dir() {
            return Err(AirError::File {
                message: "not a directory".to_string(),
                path: project_root.display().to_string(),
            });
        }
        let config = load_config(project_root)?;
        Ok(Self {
            config,
            project_root: project_root.to_path_buf(),
        })
    }

    pub fn config(&self) -> &AirConfig {
        &self.config
    }

    /// Mutable access, e.g. to override the name before a forward pass.
    pub fn config_mut(&mut self) -> &mut AirConfig {
        &mut self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

// ---------------------------------------------------------------------------
// Forward
// ---------------------------------------------------------------------------

impl Air {
    /// Scans the project, builds the IR and serializes it.
    pub fn forward(&self) -> Result<ForwardResult> {
        let start = Instant::now();
        let files = self.load_sources()?;
        let model = build_project(self.meta(), &files, &LanguageRegistry::new())?;
        let ir = model.freeze()?;
        let pir = ir.to_pir_string()?;
        let stats = ir.model().stats();

        Ok(ForwardResult {
            ir,
            pir,
            stats,
            file_count: files.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// The recorded root is the canonical project path, so the same tree
    /// yields the same `root:` however it was named on the command line.
    fn meta(&self) -> ProjectMeta {
        let root = self
            .project_root
            .canonicalize()
            .unwrap_or_else(|_| self.project_root.clone());
        let name = if self.config.name.is_empty() {
            root.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "project".to_string())
        } else {
            self.config.name.clone()
        };
        ProjectMeta::new(&name, &root.to_string_lossy(), &self.config.profile)
    }

    /// Reads every scanned file. Files that are not valid UTF-8 or cannot
    /// be read are skipped with a warning.
    pub fn load_sources(&self) -> Result<Vec<SourceFile>> {
        let mut sources = Vec::new();
        for path in self.scan_files()? {
            match std::fs::read_to_string(self.project_root.join(&path)) {
                Ok(content) => sources.push(SourceFile { path, content }),
                Err(e) => warn!(%path, "skipping unreadable file: {e}"),
            }
        }
        Ok(sources)
    }

    /// Lists project-relative paths to scan, sorted, respecting the
    /// include/exclude patterns and the size limit.
    pub fn scan_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.project_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Skip hidden directories and build output
                let name = e.file_name().to_string_lossy();
                e.depth() == 0 || (!name.starts_with('.') && name != "target" && name != "build")
            })
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("walk error: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&self.project_root) else {
                continue;
            };
            let rel_str = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !should_include_file(&rel_str, &self.config) {
                continue;
            }
            match entry.metadata() {
                Ok(metadata) if metadata.len() <= self.config.max_file_size => files.push(rel_str),
                Ok(_) => debug!(path = %rel_str, "skipping oversized file"),
                Err(e) => debug!(path = %rel_str, "skipping file: {e}"),
            }
        }
        files.sort();
        Ok(files)
    }
}

// ---------------------------------------------------------------------------
// Peek
// ---------------------------------------------------------------------------

/// Reads and freezes a PIR file.
pub fn load_ir(path: &Path) -> Result<ProjectIr> {
    let text = std::fs::read_to_string(path).map_err(|e| AirError::File {
        message: format!("failed to read PIR: {e}"),
        path: path.display().to_string(),
    })?;
    parse_pir_from(&text, &path.display().to_string())?.freeze()
}

/// Reads the source of every unit from `source_dir`. A unit whose file
/// cannot be read falls back to its code snippets, if it has any.
pub fn load_unit_sources(ir: &ProjectIr, source_dir: &Path) -> SourceMap {
    let mut sources = SourceMap::new();
    for unit in ir.units() {
        match std::fs::read_to_string(source_dir.join(&unit.path)) {
            Ok(text) => {
                sources.insert(unit.uid, text);
            }
            Err(e) => {
                let snippets = ir.snippets_of(unit.uid);
                if snippets.is_empty() {
                    debug!(unit = %unit.uid, path = %unit.path, "no source available: {e}");
                } else {
                    sources.insert(unit.uid, snippets.join("\n"));
                }
            }
        }
    }
    sources
}

/// Answers a request file against a PIR file and returns the evidence.
pub fn peek_files(pir_path: &Path, request_path: &Path, source_dir: Option<&Path>) -> Result<Vec<Evidence>> {
    let ir = load_ir(pir_path)?;
    let request = std::fs::read_to_string(request_path).map_err(|e| AirError::File {
        message: format!("failed to read request: {e}"),
        path: request_path.display().to_string(),
    })?;
    let source_dir = match source_dir {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from(&ir.model().meta().root),
    };
    let sources = load_unit_sources(&ir, &source_dir);
    evidence::answer(&ir, sources, &request)
}
