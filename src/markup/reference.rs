//! Block-mode reference markup.
//!
//! ```text
//! <references>
//!   <reference>
//!     <type>course</type>
//!     <artifactId>14-dynamic-programming-basics</artifactId>
//!     <title>动态规划的解题四步骤</title>
//!   </reference>
//! </references>
//! ```
//!
//! Inner tags may appear in any order. A block resolves only when both
//! `artifactId` and `title` are non-empty after trimming; anything else is
//! skipped without producing a record.

use super::scanner::{MarkerScanner, SpanKind};
use crate::message::{Reference, ReferenceType};

pub const REFERENCES_OPEN: &str = "<references>";
pub const REFERENCES_CLOSE: &str = "</references>";
pub const REFERENCE_OPEN: &str = "<reference>";
pub const REFERENCE_CLOSE: &str = "</reference>";

/// Content of the first `<name>...</name>` whose content holds no `<`.
fn tag_content<'a>(block: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");

    let mut from = 0;
    while let Some(rel) = block[from..].find(&open) {
        let content_start = from + rel + open.len();
        let rest = &block[content_start..];
        if let Some(lt) = rest.find('<') {
            if lt > 0 && rest[lt..].starts_with(&close) {
                return Some(&rest[..lt]);
            }
        }
        from = content_start;
    }
    None
}

/// Resolve the inner content of one `<reference>` block.
///
/// Returns `None` when a required field is missing or empty, or when a
/// `<type>` is present but not recognised.
pub fn resolve_block(block: &str) -> Option<Reference> {
    let artifact_id = tag_content(block, "artifactId").map(str::trim).unwrap_or_default();
    let title = tag_content(block, "title").map(str::trim).unwrap_or_default();
    if artifact_id.is_empty() || title.is_empty() {
        tracing::debug!(block_len = block.len(), "Reference block missing artifactId or title");
        return None;
    }

    let kind = match tag_content(block, "type").map(str::trim) {
        None | Some("") => ReferenceType::default(),
        Some(raw) => match raw.parse() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!(artifact_id, error = %e, "Reference block has unknown type");
                return None;
            }
        },
    };

    let description = tag_content(block, "description")
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(ToString::to_string);

    Some(Reference {
        kind,
        artifact_id: artifact_id.to_string(),
        title: title.to_string(),
        description,
    })
}

/// Extract every resolvable `<reference>` block in `text`, in order.
///
/// A trailing block whose close tag has not arrived yields nothing.
pub fn extract_references(text: &str) -> Vec<Reference> {
    MarkerScanner::new(text, REFERENCE_OPEN, REFERENCE_CLOSE)
        .filter_map(|span| span.inner(REFERENCE_OPEN, REFERENCE_CLOSE).and_then(resolve_block))
        .collect()
}

/// Strip `<references>` envelopes from display text.
///
/// Complete envelopes are removed; an envelope with no close tag is removed
/// together with everything after it. The result is a fixpoint, so applying
/// this twice gives the same text as applying it once.
pub fn clean_references(text: &str) -> String {
    let mut current = strip_envelopes(text);
    loop {
        let next = strip_envelopes(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_envelopes(text: &str) -> String {
    MarkerScanner::new(text, REFERENCES_OPEN, REFERENCES_CLOSE)
        .filter(|span| span.kind == SpanKind::Plain)
        .map(|span| span.text)
        .collect()
}
