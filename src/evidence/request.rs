use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::errors::{AirError, Result};
use crate::types::{Need, NeedType, View};

static NEED_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?need>").expect("valid need tag regex"));

fn line_at(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

/// Parses a request document into its needs, in document order.
pub fn parse_request(text: &str) -> Result<Vec<Need>> {
    parse_request_from(text, "<pcr>")
}

/// Like [`parse_request`], naming `origin` in errors.
///
/// Needs with a missing field or an unknown `type` / `view` are skipped.
/// A document whose needs are all skipped is an error.
pub fn parse_request_from(text: &str, origin: &str) -> Result<Vec<Need>> {
    let open = text
        .find("<pcr>")
        .ok_or_else(|| AirError::parse_at(origin, 1, "missing <pcr>"))?;
    let body_start = open + "<pcr>".len();
    let close = text[body_start..]
        .find("</pcr>")
        .map(|i| body_start + i)
        .ok_or_else(|| AirError::parse_at(origin, line_at(text, text.len()), "missing </pcr>"))?;
    let trailing = close + "</pcr>".len();
    if !text[trailing..].trim().is_empty() {
        return Err(AirError::parse_at(
            origin,
            line_at(text, trailing),
            "content after </pcr>",
        ));
    }

    let mut needs = Vec::new();
    let mut opened: Option<usize> = None;
    for tag in NEED_TAG.find_iter(&text[body_start..close]) {
        let at = body_start + tag.start();
        match (tag.as_str(), opened) {
            ("<need>", None) => opened = Some(body_start + tag.end()),
            ("<need>", Some(_)) => {
                return Err(AirError::parse_at(origin, line_at(text, at), "nested <need>"));
            }
            (_, Some(start)) => {
                let line = line_at(text, start);
                match parse_need(&text[start..at]) {
                    Some(need) => needs.push(need),
                    None => debug!(line, "skipping need with missing or unknown fields"),
                }
                opened = None;
            }
            (_, None) => {
                return Err(AirError::parse_at(
                    origin,
                    line_at(text, at),
                    "</need> without <need>",
                ));
            }
        }
    }
    if let Some(start) = opened {
        return Err(AirError::parse_at(origin, line_at(text, start), "unclosed <need>"));
    }

    if needs.is_empty() {
        return Err(AirError::EmptyRequest);
    }
    Ok(needs)
}

/// Reads `type`, `ref` and `view` from a need body. Both `key:value` and
/// `key: value` are accepted; the first occurrence of a key wins.
fn parse_need(body: &str) -> Option<Need> {
    let mut need_type = None;
    let mut reference = None;
    let mut view = None;

    let mut tokens = body.split_whitespace();
    while let Some(token) = tokens.next() {
        let Some((key, value)) = token.split_once(':') else {
            continue;
        };
        let value = if value.is_empty() {
            match tokens.next() {
                Some(v) => v,
                None => break,
            }
        } else {
            value
        };
        match key.to_ascii_lowercase().as_str() {
            "type" if need_type.is_none() => need_type = Some(value.to_string()),
            "ref" if reference.is_none() => reference = Some(value.to_string()),
            "view" if view.is_none() => view = Some(value.to_string()),
            _ => {}
        }
    }

    Some(Need {
        need_type: NeedType::from_str(&need_type?)?,
        reference: reference?,
        view: View::from_str(&view?)?,
    })
}
