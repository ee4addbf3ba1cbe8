/// Turns resolved references into evidence records.
pub mod builder;

/// Per-unit analyzer access over loaded sources.
pub mod extractor;

/// Formats evidence as PCES or JSON.
pub mod formatter;

/// Parses PCR request documents.
pub mod request;

pub use builder::EvidenceBuilder;
pub use extractor::{CallChain, Extractor, Location, SourceMap, DEFAULT_MAX_DEPTH};
pub use formatter::{format_evidence_as_json, format_evidence_as_pces};
pub use request::{parse_request, parse_request_from};

use tracing::debug;

use crate::errors::Result;
use crate::ir::ProjectIr;
use crate::resolution::Resolver;
use crate::types::Evidence;

/// Answers every need of a request document, in document order.
pub fn answer(ir: &ProjectIr, sources: SourceMap, request: &str) -> Result<Vec<Evidence>> {
    let needs = parse_request(request)?;
    let resolver = Resolver::new(ir);
    let extractor = Extractor::new(ir, sources);
    let builder = EvidenceBuilder::new(&extractor);

    let evidence: Vec<Evidence> = needs
        .iter()
        .map(|need| {
            let resolved = resolver.resolve(need);
            debug!(reference = %need.reference, view = need.view.as_str(), kind = ?resolved.kind, "resolved need");
            builder.build(need, &resolved)
        })
        .collect();
    Ok(evidence)
}

/// Answers a request document and renders the result as PCES.
pub fn peek(ir: &ProjectIr, sources: SourceMap, request: &str) -> Result<String> {
    Ok(format_evidence_as_pces(&answer(ir, sources, request)?))
}
