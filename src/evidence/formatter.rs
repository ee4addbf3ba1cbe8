use crate::errors::Result;
use crate::types::{ContentValue, Evidence};

/// Content keys rendered as indented code blocks.
const CODE_FIELDS: &[&str] = &["definition", "implementation", "code"];

/// Formats evidence records as a PCES document.
///
/// Each record becomes an `<evidence>` block with `ref`, `view`, `source`
/// and a `content:` section. Code-shaped fields are written as an indented
/// block that keeps their line breaks; lists render as `- item` lines.
pub fn format_evidence_as_pces(evidence: &[Evidence]) -> String {
    let mut out = String::from("<pcir>\n");
    for record in evidence {
        out.push_str("<evidence>\n");
        out.push_str(&format!("ref: {}\n", record.reference));
        out.push_str(&format!("view: {}\n", record.view.as_str()));
        out.push_str(&format!("source: {}\n", record.source));
        out.push_str("content:\n");
        for (key, value) in record.content.iter() {
            format_entry(&mut out, key, value);
        }
        out.push_str("</evidence>\n");
    }
    out.push_str("</pcir>\n");
    out
}

fn format_entry(out: &mut String, key: &str, value: &ContentValue) {
    let code = CODE_FIELDS.contains(&key);
    match value {
        ContentValue::Text(text) if code => {
            out.push_str(&format!("  {key}:\n"));
            for line in text.lines() {
                out.push_str(&format!("    {line}\n"));
            }
        }
        ContentValue::Text(text) => out.push_str(&format!("  {key}: {text}\n")),
        ContentValue::List(items) => {
            out.push_str(&format!("  {key}:\n"));
            for item in items {
                if code {
                    out.push_str(&format!("    {item}\n"));
                } else {
                    out.push_str(&format!("    - {item}\n"));
                }
            }
        }
        ContentValue::Groups(groups) => {
            out.push_str(&format!("  {key}:\n"));
            for group in groups {
                out.push_str(&format!("    {}:\n", group.title));
                for line in &group.lines {
                    out.push_str(&format!("      {line}\n"));
                }
            }
        }
        ContentValue::Suggestions(suggestions) => {
            out.push_str(&format!("  {key}:\n"));
            for suggestion in suggestions {
                out.push_str(&format!("    - {suggestion}\n"));
            }
        }
    }
}

/// Formats evidence records as pretty-printed JSON.
pub fn format_evidence_as_json(evidence: &[Evidence]) -> Result<String> {
    Ok(serde_json::to_string_pretty(evidence)?)
}
