//! Semantic profile detection.
//!
//! Profiles are derived, non-authoritative metadata: each rule inspects the
//! finalized dependency pool and the unit list and may report a confidence
//! with descriptive tags.

use std::collections::BTreeSet;

use tracing::debug;

use crate::errors::{AirError, Result};
use crate::ir::canon::bracket_inner;
use crate::ir::model::{split_key, ProjectModel};
use crate::types::ProfileMatch;

const ML_PYTHON_LIBS: &[&str] = &[
    "numpy", "torch", "tensorflow", "keras", "scikit-learn", "sklearn", "pandas", "matplotlib",
    "seaborn", "scipy", "jax", "flax", "pytorch_lightning", "transformers", "datasets",
    "accelerate", "optimum", "onnx", "xgboost",
];

const PYTHON_TOOL_LIBS: &[&str] = &[
    "argparse", "pathlib", "dataclasses", "typing", "collections", "os", "sys", "json", "re",
    "logging", "click", "typer", "rich",
];

const EMBEDDED_C_LIBS: &[&str] = &["newlib", "musl", "uclibc", "freertos", "zephyr"];

const KERNEL_C_SIGNALS: &[&str] = &["arch", "mm", "sched", "irq", "kernel"];

const RUST_EMBEDDED_LIBS: &[&str] = &["riscv-rt", "embedded-hal", "cortex-m-rt", "cortex-m", "no_std"];

const RUST_WEB_LIBS: &[&str] = &["actix-web", "axum", "rocket", "warp", "hyper"];

const JAVA_WEB_LIBS: &[&str] = &["jakarta.servlet", "spring-core", "spring-web", "spring-boot"];

type Rule = fn(&Signals, &ProjectModel) -> Option<ProfileMatch>;

/// Names extracted from the dependency pool, used by the rules.
#[derive(Debug, Default)]
struct Signals {
    targets: BTreeSet<String>,
}

impl Signals {
    fn collect(pool: &[String]) -> Self {
        let mut targets = BTreeSet::new();
        for key in pool {
            let (_, target) = split_key(key);
            let Some(name) = bracket_inner(target) else {
                continue;
            };
            targets.insert(name.to_string());
            if let Some(prefix) = name.strip_prefix("stdlib:") {
                targets.insert("stdlib".to_string());
                targets.insert(format!("stdlib:{prefix}"));
                continue;
            }
            // Rust paths: crate root, also in its hyphenated package spelling.
            if let Some((root, _)) = name.split_once("::") {
                targets.insert(root.to_string());
                targets.insert(root.replace('_', "-"));
            }
            // Dotted module paths: first one and two segments.
            let parts: Vec<&str> = name.split('.').collect();
            if parts.len() > 1 {
                targets.insert(parts[0].to_string());
                targets.insert(format!("{}.{}", parts[0], parts[1]));
            }
            if name.starts_with("org.springframework.") {
                let spring = match parts.get(2) {
                    Some(&"boot") => "spring-boot",
                    Some(&"web") => "spring-web",
                    _ => "spring-core",
                };
                targets.insert(spring.to_string());
            }
        }
        Self { targets }
    }

    fn found(&self, libs: &[&str]) -> Vec<String> {
        libs.iter()
            .filter(|lib| self.targets.contains(**lib))
            .map(|lib| lib.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn has(&self, name: &str) -> bool {
        self.targets.contains(name)
    }
}

/// Runs every profile rule over a finalized model.
pub struct ProfileDetector {
    rules: Vec<(&'static str, Rule)>,
}

impl ProfileDetector {
    pub fn new() -> Self {
        Self {
            rules: vec![
                ("ml-python", detect_ml_python),
                ("python-tool", detect_python_tool),
                ("system-c", detect_system_c),
                ("embedded-c", detect_embedded_c),
                ("rust-embedded", detect_rust_embedded),
                ("rust-web", detect_rust_web),
                ("java-web", detect_java_web),
                ("java-lib", detect_java_lib),
            ],
        }
    }

    /// Returns every matching profile in rule order.
    pub fn detect(&self, model: &ProjectModel) -> Result<Vec<ProfileMatch>> {
        let pool = model
            .dependencies()
            .pool()
            .map_err(|_| AirError::DependenciesNotFinalized {
                operation: "detect profiles".to_string(),
            })?;
        let signals = Signals::collect(pool);

        let mut found = Vec::new();
        for (name, rule) in &self.rules {
            if let Some(profile) = rule(&signals, model) {
                debug!(profile = *name, confidence = profile.confidence, "profile matched");
                found.push(profile);
            }
        }
        Ok(found)
    }

    /// Detects profiles and stores them on the model.
    pub fn apply(&self, model: &mut ProjectModel) -> Result<()> {
        let profiles = self.detect(model)?;
        model.set_profiles(profiles);
        Ok(())
    }
}

impl Default for ProfileDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn profile(name: &str, confidence: f64, tags: &[&str], libs: &[String], signals: Vec<String>) -> ProfileMatch {
    let mut all_tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    all_tags.extend(libs.iter().map(|lib| format!("lib:{lib}")));
    ProfileMatch {
        name: name.to_string(),
        confidence: round2(confidence),
        tags: all_tags,
        signals,
    }
}

fn has_language(model: &ProjectModel, tag: &str) -> bool {
    model.units().iter().any(|u| u.language.as_tag() == tag)
}

fn detect_ml_python(signals: &Signals, _model: &ProjectModel) -> Option<ProfileMatch> {
    let libs = signals.found(ML_PYTHON_LIBS);
    if libs.is_empty() {
        return None;
    }
    let confidence = (0.5 + libs.len() as f64 * 0.1).min(1.0);
    Some(profile(
        "ml-python",
        confidence,
        &["domain:ml", "runtime:cpython", "stack:ml-python"],
        &libs,
        Vec::new(),
    ))
}

fn detect_python_tool(signals: &Signals, model: &ProjectModel) -> Option<ProfileMatch> {
    if !has_language(model, "PY") {
        return None;
    }
    let stdlib = signals.has("stdlib:py");
    let extra = signals.found(PYTHON_TOOL_LIBS);
    if !stdlib && extra.is_empty() {
        return None;
    }

    let mut confidence = 0.0;
    let mut reasons = Vec::new();
    if stdlib {
        confidence += 0.4;
        reasons.push("stdlib".to_string());
    }
    confidence += (extra.len() as f64 * 0.05).min(0.15);
    if model.languages() == ["PY"] {
        confidence += 0.15;
        reasons.push("pure-python".to_string());
    }
    let has_entry = model.symbols().iter().any(|s| s.kind == "func" && s.is_entry());
    if has_entry {
        confidence += 0.1;
        reasons.push("entry-point".to_string());
    }
    if model.units().len() >= 5 {
        confidence += 0.1;
        reasons.push("multi-unit".to_string());
    }
    if !signals.found(ML_PYTHON_LIBS).is_empty() {
        confidence -= 0.25;
        reasons.push("ml-conflict".to_string());
    }

    let confidence = round2(confidence).clamp(0.0, 0.95);
    if confidence < 0.3 {
        return None;
    }
    let mut libs = extra;
    if stdlib {
        libs.insert(0, "stdlib".to_string());
    }
    Some(profile(
        "python-tool",
        confidence,
        &["domain:tooling", "runtime:cpython", "stack:python-tool"],
        &libs,
        reasons,
    ))
}

fn detect_system_c(signals: &Signals, model: &ProjectModel) -> Option<ProfileMatch> {
    if !has_language(model, "C") {
        return None;
    }
    if !signals.has("stdlib:c") && !signals.has("libc") {
        return None;
    }
    let mut confidence = 0.4;
    let mut reasons = Vec::new();
    if model.units().len() > 10 {
        confidence += 0.15;
        reasons.push("multi-unit".to_string());
    }
    let kernel_layout = model.units().iter().any(|u| {
        u.path
            .to_lowercase()
            .split('/')
            .any(|part| KERNEL_C_SIGNALS.contains(&part))
    });
    if kernel_layout {
        confidence += 0.25;
        reasons.push("kernel-layout".to_string());
    }
    Some(profile(
        "system-c",
        f64::min(confidence, 0.9),
        &["domain:system", "lang:c", "runtime:native"],
        &[],
        reasons,
    ))
}

fn detect_embedded_c(signals: &Signals, _model: &ProjectModel) -> Option<ProfileMatch> {
    let libs = signals.found(EMBEDDED_C_LIBS);
    if libs.is_empty() {
        return None;
    }
    Some(profile(
        "embedded-c",
        0.6 + (libs.len() as f64 * 0.1).min(0.3),
        &["domain:embedded", "lang:c", "runtime:baremetal"],
        &libs,
        Vec::new(),
    ))
}

fn detect_rust_embedded(signals: &Signals, model: &ProjectModel) -> Option<ProfileMatch> {
    if !has_language(model, "Rust") {
        return None;
    }
    let libs = signals.found(RUST_EMBEDDED_LIBS);
    if libs.is_empty() {
        return None;
    }
    Some(profile(
        "rust-embedded",
        0.65 + (libs.len() as f64 * 0.1).min(0.3),
        &["domain:embedded", "lang:rust", "runtime:no_std"],
        &libs,
        Vec::new(),
    ))
}

fn detect_rust_web(signals: &Signals, _model: &ProjectModel) -> Option<ProfileMatch> {
    let libs = signals.found(RUST_WEB_LIBS);
    if libs.is_empty() {
        return None;
    }
    Some(profile(
        "rust-web",
        0.6 + (libs.len() as f64 * 0.1).min(0.3),
        &["domain:web-backend", "lang:rust", "runtime:native"],
        &libs,
        Vec::new(),
    ))
}

fn detect_java_web(signals: &Signals, model: &ProjectModel) -> Option<ProfileMatch> {
    if !has_language(model, "JAVA") {
        return None;
    }
    let libs = signals.found(JAVA_WEB_LIBS);
    if libs.is_empty() {
        return None;
    }
    Some(profile(
        "java-web",
        0.6 + (libs.len() as f64 * 0.1).min(0.3),
        &["domain:web-backend", "lang:java", "runtime:jvm"],
        &libs,
        Vec::new(),
    ))
}

fn detect_java_lib(signals: &Signals, model: &ProjectModel) -> Option<ProfileMatch> {
    if !has_language(model, "JAVA") {
        return None;
    }
    if signals.has("stdlib:java") && model.units().len() > 5 {
        return Some(profile(
            "java-lib",
            0.45,
            &["domain:library", "lang:java", "runtime:jvm"],
            &[],
            Vec::new(),
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::model::ProjectMeta;
    use crate::types::{Language, ScannedSymbol, Symbol};

    fn finalized(units: &[(&str, Language)], deps: &[(usize, &str, &str)]) -> ProjectModel {
        let mut model = ProjectModel::new(ProjectMeta::new("p", ".", "default"));
        for (path, lang) in units {
            model.add_unit(path, lang.clone(), "lib", "root");
        }
        for (unit, verb, target) in deps {
            model
                .add_dependency(crate::types::UnitId(*unit as u32), verb, target)
                .unwrap();
        }
        model.canonicalize_dependencies().unwrap();
        model.finalize_dependencies().unwrap();
        model
    }

    #[test]
    fn test_requires_finalized_model() {
        let model = ProjectModel::new(ProjectMeta::new("p", ".", "default"));
        assert!(ProfileDetector::new().detect(&model).is_err());
    }

    #[test]
    fn test_ml_python_confidence_scales_with_libs() {
        let model = finalized(
            &[("train.py", Language::Python)],
            &[(0, "import", "[numpy]"), (0, "import", "[torch]"), (0, "import", "[os]")],
        );
        let profiles = ProfileDetector::new().detect(&model).unwrap();
        let ml = profiles.iter().find(|p| p.name == "ml-python").unwrap();
        assert_eq!(ml.confidence, 0.7);
        assert!(ml.tags.contains(&"lib:numpy".to_string()));
    }

    #[test]
    fn test_python_tool_with_entry_point() {
        let mut model = ProjectModel::new(ProjectMeta::new("p", ".", "default"));
        let u0 = model.add_unit("cli.py", Language::Python, "entry", "root");
        let sym = ScannedSymbol::new("main", "func", 1).entry();
        model
            .add_symbol(Symbol {
                name: sym.name,
                unit: u0,
                kind: sym.kind,
                attrs: sym.attrs,
            })
            .unwrap();
        model.add_dependency(u0, "import", "[argparse]").unwrap();
        model.canonicalize_dependencies().unwrap();
        model.finalize_dependencies().unwrap();

        ProfileDetector::new().apply(&mut model).unwrap();
        let tool = &model.profiles()[0];
        assert_eq!(tool.name, "python-tool");
        // stdlib 0.4 + pure-python 0.15 + entry 0.1
        assert_eq!(tool.confidence, 0.65);
        assert_eq!(model.active_profile(), Some("python-tool"));
    }

    #[test]
    fn test_no_profile_for_plain_project() {
        let model = finalized(&[("boot.S", Language::Asm)], &[(0, "call", "[kmain]")]);
        assert!(ProfileDetector::new().detect(&model).unwrap().is_empty());
    }
}
