use std::collections::HashSet;

use crate::evidence::extractor::{CallChain, Extractor, DEFAULT_MAX_DEPTH};
use crate::types::*;

/// Turns a need and its resolved reference into an evidence record.
///
/// Missing and ambiguous references short-circuit to a status record with
/// source `unknown`; no analyzer is consulted for them. Each view only asks
/// the extractor for what that view shows.
pub struct EvidenceBuilder<'e, 'a> {
    extractor: &'e Extractor<'a>,
    max_depth: usize,
}

impl<'e, 'a> EvidenceBuilder<'e, 'a> {
    pub fn new(extractor: &'e Extractor<'a>) -> Self {
        Self {
            extractor,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the call chain recursion limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn build(&self, need: &Need, resolved: &ResolvedRef) -> Evidence {
        let (source, content) = if resolved.is_missing() {
            (EvidenceSource::Unknown, Content::new().with("status", "missing"))
        } else if resolved.is_ambiguous() {
            let content = Content::new().with("status", "ambiguous").with(
                "suggestions",
                ContentValue::Suggestions(resolved.suggestions.clone()),
            );
            (EvidenceSource::Unknown, content)
        } else {
            match (resolved.kind, resolved.unit, resolved.symbol.as_deref()) {
                (RefKind::Layout, _, Some(key)) => {
                    (EvidenceSource::Layout, self.layout_view(need.view, resolved, key))
                }
                (RefKind::Unit, Some(uid), _) => {
                    (EvidenceSource::Unit(uid), self.unit_view(need.view, resolved, uid))
                }
                (RefKind::Symbol, Some(uid), Some(name)) => (
                    EvidenceSource::Unit(uid),
                    self.symbol_view(need.view, resolved, uid, name),
                ),
                _ => (EvidenceSource::Unknown, Content::new().with("status", "missing")),
            }
        };

        Evidence {
            reference: need.reference.clone(),
            view: need.view,
            source,
            content,
        }
    }

    fn layout_view(&self, view: View, resolved: &ResolvedRef, key: &str) -> Content {
        let value = self.extractor.ir().layout_value(key).unwrap_or("");
        match view {
            View::Exist => Content::new().with("status", "yes"),
            View::Definition => Content::new()
                .with("kind", "layout")
                .with("definition", value),
            View::Summary => self.extractor.extract_summary(resolved),
            View::Api | View::Impl | View::Asm | View::Callchain => Content::new()
                .with("kind", "layout")
                .with("value", value),
        }
    }

    fn unit_view(&self, view: View, resolved: &ResolvedRef, uid: UnitId) -> Content {
        let ir = self.extractor.ir();
        let Some(unit) = ir.unit(uid) else {
            return Content::new().with("status", "missing");
        };
        match view {
            View::Exist => Content::new()
                .with("status", "yes")
                .with("location", unit.path.as_str()),
            View::Definition => {
                let mut content = Content::new()
                    .with("kind", "unit")
                    .with("unit", uid.to_string());
                let snippets = ir.snippets_of(uid);
                if !snippets.is_empty() {
                    content.insert("definition", snippets.join("\n"));
                }
                content
            }
            View::Api => {
                Content::new().with("signatures", self.extractor.extract_signatures(resolved))
            }
            View::Impl => {
                let groups: Vec<ContentGroup> = ir
                    .symbols_of(uid)
                    .into_iter()
                    .map(|symbol| ContentGroup {
                        title: format!("{} ({})", symbol.name, symbol.kind),
                        lines: self.extractor.extract_implementation(uid, &symbol.name),
                    })
                    .collect();
                Content::new().with("implementation", ContentValue::Groups(groups))
            }
            View::Asm => {
                let mut labels = Vec::new();
                let mut flow = Vec::new();
                for symbol in ir.symbols_of(uid).into_iter().filter(|s| s.kind == "label") {
                    let info = self.extractor.extract_asm_info(uid, &symbol.name);
                    labels.push(symbol.name.clone());
                    flow.extend(info.flow);
                }
                Content::new().with("labels", labels).with("flow", flow)
            }
            View::Summary => self.extractor.extract_summary(resolved),
            View::Callchain => {
                let mut visited = HashSet::new();
                let mut chain = CallChain::default();
                for symbol in ir.symbols_of(uid).into_iter().filter(|s| s.is_entry()) {
                    let part = self.extractor.extract_callchain(
                        uid,
                        &symbol.name,
                        &mut visited,
                        self.max_depth,
                    );
                    chain.path.extend(part.path);
                    chain.low_confidence.extend(part.low_confidence);
                }
                callchain_content(chain)
            }
        }
    }

    fn symbol_view(&self, view: View, resolved: &ResolvedRef, uid: UnitId, name: &str) -> Content {
        match view {
            View::Exist => {
                let location = self.extractor.extract(resolved).map(|loc| match loc.line {
                    Some(line) => format!("{}:{}", loc.path, line),
                    None => loc.path,
                });
                let mut content = Content::new().with("status", "yes");
                if let Some(location) = location {
                    content.insert("location", location);
                }
                content
            }
            View::Definition => {
                let kind = self
                    .extractor
                    .extract(resolved)
                    .map(|loc| loc.kind)
                    .unwrap_or_default();
                let mut content = Content::new()
                    .with("kind", kind)
                    .with("unit", uid.to_string());
                if let Some(definition) = self.extractor.extract_definition(uid, name) {
                    content.insert("definition", definition);
                }
                content
            }
            View::Api => {
                Content::new().with("signatures", self.extractor.extract_signatures(resolved))
            }
            View::Impl => Content::new().with(
                "implementation",
                self.extractor.extract_implementation(uid, name),
            ),
            View::Asm => {
                let mut info = self.extractor.extract_asm_info(uid, name);
                if info.labels.is_empty() {
                    info = AsmInfo {
                        labels: vec![name.to_string()],
                        flow: Vec::new(),
                    };
                }
                Content::new()
                    .with("labels", info.labels)
                    .with("flow", info.flow)
            }
            View::Summary => self.extractor.extract_summary(resolved),
            View::Callchain => {
                let mut visited = HashSet::new();
                callchain_content(self.extractor.extract_callchain(
                    uid,
                    name,
                    &mut visited,
                    self.max_depth,
                ))
            }
        }
    }
}

fn callchain_content(chain: CallChain) -> Content {
    let mut content = Content::new().with("path", chain.path);
    if !chain.low_confidence.is_empty() {
        content.insert("low_confidence", chain.low_confidence);
    }
    content
}
