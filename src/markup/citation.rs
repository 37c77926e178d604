//! Inline citation markup: `[title](TYPE:artifactId)`.
//!
//! Citations never span a line break. When a line contains a citation, the
//! lines accumulated since the previous citation are emitted as one
//! plain-text part with the marker rewritten to `《title》`, followed by the
//! structured citation.
//!
//! ```text
//! 见[14 打家劫舍](COURSE:14-dp)说明
//! ```
//! becomes `见《14 打家劫舍》说明` followed by
//! `Citation { kind: Course, artifact_id: "14-dp", title: "14 打家劫舍" }`.
//!
//! This mode expects a settled buffer; a marker cut off mid-stream simply
//! doesn't match and passes through as prose.

use crate::error::Result;
use crate::message::{Citation, ReferenceType};

/// One piece of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPart {
    /// Prose with citation markers rewritten for display.
    PlainText(String),
    /// A structured citation.
    Citation(Citation),
}

/// Byte range and captures of one syntactic marker.
#[derive(Debug, Clone, Copy)]
struct Marker<'a> {
    start: usize,
    end: usize,
    title: &'a str,
    kind: &'a str,
    artifact_id: &'a str,
}

/// First `[title](TYPE:id)` in `line`, with every capture non-empty.
fn find_marker(line: &str) -> Option<Marker<'_>> {
    let mut from = 0;
    while let Some(rel) = line[from..].find('[') {
        let start = from + rel;
        from = start + 1;

        let title_start = start + 1;
        let Some(title_len) = line[title_start..].find(']') else {
            return None;
        };
        if title_len == 0 {
            continue;
        }
        let title_end = title_start + title_len;
        if !line[title_end + 1..].starts_with('(') {
            continue;
        }

        let kind_start = title_end + 2;
        let Some(kind_len) = line[kind_start..].find(':') else {
            continue;
        };
        if kind_len == 0 {
            continue;
        }
        let id_start = kind_start + kind_len + 1;
        let Some(id_len) = line[id_start..].find(')') else {
            continue;
        };
        if id_len == 0 {
            continue;
        }

        return Some(Marker {
            start,
            end: id_start + id_len + 1,
            title: &line[title_start..title_end],
            kind: &line[kind_start..kind_start + kind_len],
            artifact_id: &line[id_start..id_start + id_len],
        });
    }
    None
}

/// Parse the citation on one line, if any.
///
/// Returns the rewritten line alongside the citation. An unknown TYPE is an
/// error; callers treat the line as plain prose.
fn parse_line(line: &str) -> Result<Option<(String, Citation)>> {
    let Some(marker) = find_marker(line) else {
        return Ok(None);
    };
    let kind: ReferenceType = marker.kind.parse()?;

    let rewritten = format!(
        "{}《{}》{}",
        &line[..marker.start],
        marker.title,
        &line[marker.end..]
    );
    let citation = Citation {
        kind,
        artifact_id: marker.artifact_id.to_string(),
        title: marker.title.to_string(),
    };
    Ok(Some((rewritten, citation)))
}

/// Split settled text into prose and citations.
///
/// The empty string yields a single empty plain-text part.
pub fn parse_text_parts(text: &str) -> Vec<TextPart> {
    let mut result = Vec::new();
    let mut pending: Vec<String> = Vec::new();

    for line in text.split('\n') {
        match parse_line(line) {
            Ok(Some((rewritten, citation))) => {
                pending.push(rewritten);
                result.push(TextPart::PlainText(pending.join("\n")));
                result.push(TextPart::Citation(citation));
                pending.clear();
            }
            Ok(None) => pending.push(line.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "Citation marker left as prose");
                pending.push(line.to_string());
            }
        }
    }

    if !pending.is_empty() {
        result.push(TextPart::PlainText(pending.join("\n")));
    }
    result
}

/// Only the citations in `text`, in order.
pub fn parse_citations(text: &str) -> Vec<Citation> {
    parse_text_parts(text)
        .into_iter()
        .filter_map(|part| match part {
            TextPart::Citation(c) => Some(c),
            TextPart::PlainText(_) => None,
        })
        .collect()
}
