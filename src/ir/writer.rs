use std::fmt::Write as _;

use crate::errors::{AirError, Result};
use crate::ir::model::ProjectModel;
use crate::types::{ProfileMatch, Symbol};

/// Serializes a finalized model into canonical PIR text.
///
/// Blocks other than `<meta>` and `<units>` are omitted when empty, so the
/// output of a given model is byte-for-byte deterministic.
pub fn write_pir(model: &ProjectModel) -> Result<String> {
    let pool = model
        .dependencies()
        .pool()
        .map_err(|_| AirError::DependenciesNotFinalized {
            operation: "build PIR".to_string(),
        })?;

    let mut out = String::new();
    out.push_str("<pir>\n");

    // Meta
    let meta = model.meta();
    out.push_str("<meta>\n");
    let _ = writeln!(out, "name: {}", meta.name);
    let _ = writeln!(out, "root: {}", meta.root);
    let _ = writeln!(out, "profile: {}", meta.profile);
    let _ = writeln!(out, "lang: {}", model.languages().join(","));
    for (key, value) in &meta.extra {
        let _ = writeln!(out, "{key}: {value}");
    }
    out.push_str("</meta>\n");

    // Units
    out.push_str("<units>\n");
    for u in model.units() {
        let _ = writeln!(
            out,
            "{}: {} type={} role={} module={}",
            u.uid, u.path, u.language, u.role, u.module
        );
    }
    out.push_str("</units>\n");

    // Dependency pool
    if !pool.is_empty() {
        out.push_str("<dependency-pool>\n");
        for (i, key) in pool.iter().enumerate() {
            let _ = writeln!(out, "d{i}: {key}");
        }
        out.push_str("</dependency-pool>\n");
    }

    // Dependencies, ascending unit id, non-empty lists only
    let dep_lines: Vec<String> = model
        .units()
        .iter()
        .filter_map(|u| {
            let refs = model.dependencies().refs(u.uid);
            if refs.is_empty() {
                return None;
            }
            let ids: Vec<String> = refs.iter().map(|i| format!("d{i}")).collect();
            Some(format!("{}->refs:[{}]", u.uid, ids.join(" ")))
        })
        .collect();
    if !dep_lines.is_empty() {
        out.push_str("<dependencies>\n");
        for line in dep_lines {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("</dependencies>\n");
    }

    // Symbols
    if !model.symbols().is_empty() {
        out.push_str("<symbols>\n");
        for s in model.symbols() {
            check_symbol_tokens(s)?;
            let _ = write!(out, "{}:{} {}", s.name, s.unit, s.kind);
            for (k, v) in &s.attrs {
                let _ = write!(out, " {k}={v}");
            }
            out.push('\n');
        }
        out.push_str("</symbols>\n");
    }

    // Profiles
    if !model.profiles().is_empty() {
        out.push_str("<profiles>\n");
        for p in model.profiles() {
            out.push_str(&profile_line(p));
            out.push('\n');
        }
        if let Some(active) = model.active_profile() {
            let _ = writeln!(out, "active: {active}");
        }
        out.push_str("</profiles>\n");
    }

    // Layout
    if !model.layout().is_empty() {
        out.push_str("<layout>\n");
        for entry in model.layout() {
            let _ = writeln!(out, "{}: {}", entry.key, entry.value);
        }
        out.push_str("</layout>\n");
    }

    // Snippets
    if !model.snippets().is_empty() {
        out.push_str("<code-snippets>\n");
        for snippet in model.snippets() {
            let _ = writeln!(out, "<snippet unit=\"{}\">", snippet.unit);
            out.push_str("<![CDATA[\n");
            if !snippet.content.is_empty() {
                out.push_str(&snippet.content);
                out.push('\n');
            }
            out.push_str("]]>\n");
            out.push_str("</snippet>\n");
        }
        out.push_str("</code-snippets>\n");
    }

    out.push_str("</pir>\n");
    Ok(out)
}

/// A symbol line is split on whitespace when read back, so no part of it
/// may contain any.
fn check_symbol_tokens(symbol: &Symbol) -> Result<()> {
    let spaced = |text: &str| text.is_empty() || text.contains(char::is_whitespace);
    let bad = if spaced(&symbol.name) {
        Some("name is empty or contains whitespace".to_string())
    } else if spaced(&symbol.kind) {
        Some(format!("kind '{}' is empty or contains whitespace", symbol.kind))
    } else {
        symbol
            .attrs
            .iter()
            .find(|(k, v)| spaced(k) || k.contains('=') || v.contains(char::is_whitespace))
            .map(|(k, v)| format!("attribute '{k}={v}' is not a single token"))
    };
    match bad {
        Some(message) => Err(AirError::InvalidSymbol {
            name: symbol.name.clone(),
            message,
        }),
        None => Ok(()),
    }
}

fn profile_line(p: &ProfileMatch) -> String {
    let mut line = format!("{}: confidence={:.2}", p.name, p.confidence);
    if !p.tags.is_empty() {
        let _ = write!(line, " tags={}", p.tags.join(","));
    }
    if !p.signals.is_empty() {
        let _ = write!(line, " signals={}", p.signals.join(","));
    }
    line
}
