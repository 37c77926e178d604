//! Grouping and materialization of message parts for display.
//!
//! Rendering a message happens in two steps:
//! 1. [`group_parts`] isolates each `reasoning` part into its own group and
//!    batches every run of other parts into a `normal` group.
//! 2. [`materialize_parts`] expands raw `text` parts of a normal group into
//!    `text`/`citation`/`reference` parts, in place.
//!
//! Both run over the accumulated message, not per event, because a marker
//! may be only partly present at any event boundary.

use crate::markup::reference::{REFERENCES_CLOSE, REFERENCES_OPEN};
use crate::markup::{MarkerScanner, SpanKind, TextPart, extract_references, parse_text_parts};
use crate::message::{ChatMessage, ChatStatus, MessagePart, MessageRole};

/// Group classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartGroupKind {
    /// A single reasoning part.
    Reasoning,
    /// A maximal run of non-reasoning parts.
    Normal,
}

/// An ordered run of parts rendered together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartGroup {
    pub kind: PartGroupKind,
    pub parts: Vec<MessagePart>,
}

/// How a message is rendered as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Prose, reasoning and markup.
    Normal,
    /// Holds at least one tool call; rendered as tool lines only.
    Tool,
}

/// Lifecycle stage of a message's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStage {
    /// Still receiving deltas; incomplete markers are withheld and inline
    /// citations are not parsed yet.
    Live,
    /// No more deltas will arrive.
    Settled,
}

impl TextStage {
    /// Stage of a message given the id of the text message still receiving
    /// deltas and the session status.
    ///
    /// Only that assistant message is live, and only while the session is
    /// streaming. Tool messages appended after it do not settle it.
    #[must_use]
    pub fn for_message(message: &ChatMessage, streaming_id: Option<&str>, status: ChatStatus) -> Self {
        let streaming = matches!(status, ChatStatus::Submitted | ChatStatus::Streaming);
        if streaming && message.role == MessageRole::Assistant && streaming_id == Some(message.id.as_str()) {
            Self::Live
        } else {
            Self::Settled
        }
    }
}

/// Classify a message by its parts.
#[must_use]
pub fn message_kind(message: &ChatMessage) -> MessageKind {
    if message
        .parts
        .iter()
        .any(|p| matches!(p, MessagePart::Tool { .. }))
    {
        MessageKind::Tool
    } else {
        MessageKind::Normal
    }
}

/// Split parts into reasoning singletons and normal runs, preserving order.
#[must_use]
pub fn group_parts(parts: &[MessagePart]) -> Vec<PartGroup> {
    let mut result = Vec::new();
    let mut current: Vec<MessagePart> = Vec::new();

    for part in parts {
        if matches!(part, MessagePart::Reasoning { .. }) {
            if !current.is_empty() {
                result.push(PartGroup {
                    kind: PartGroupKind::Normal,
                    parts: std::mem::take(&mut current),
                });
            }
            result.push(PartGroup {
                kind: PartGroupKind::Reasoning,
                parts: vec![part.clone()],
            });
        } else {
            current.push(part.clone());
        }
    }

    if !current.is_empty() {
        result.push(PartGroup {
            kind: PartGroupKind::Normal,
            parts: current,
        });
    }
    result
}

/// Expand raw text parts into text, citation and reference parts.
///
/// Non-text parts pass through unchanged; relative order is preserved.
#[must_use]
pub fn materialize_parts(parts: &[MessagePart], stage: TextStage) -> Vec<MessagePart> {
    let mut result = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            MessagePart::Text { text } => result.extend(expand_text(text, stage)),
            other => result.push(other.clone()),
        }
    }
    result
}

/// Expand one text buffer.
///
/// Complete `<references>` envelopes become a single `reference` part (or
/// nothing, when no block inside resolves). A trailing envelope without its
/// close tag is withheld from display. Empty prose is dropped.
#[must_use]
pub fn expand_text(text: &str, stage: TextStage) -> Vec<MessagePart> {
    let mut result = Vec::new();

    for span in MarkerScanner::new(text, REFERENCES_OPEN, REFERENCES_CLOSE) {
        match span.kind {
            SpanKind::Plain => match stage {
                TextStage::Live => result.push(MessagePart::text(span.text)),
                TextStage::Settled => {
                    for piece in parse_text_parts(span.text) {
                        match piece {
                            TextPart::PlainText(t) if t.is_empty() => {}
                            TextPart::PlainText(t) => result.push(MessagePart::Text { text: t }),
                            TextPart::Citation(citation) => {
                                result.push(MessagePart::Citation { citation });
                            }
                        }
                    }
                }
            },
            SpanKind::CompleteMarker => {
                let inner = span.inner(REFERENCES_OPEN, REFERENCES_CLOSE).unwrap_or_default();
                let references = extract_references(inner);
                if references.is_empty() {
                    tracing::debug!(offset = span.start, "References envelope resolved nothing");
                } else {
                    result.push(MessagePart::Reference { references });
                }
            }
            SpanKind::IncompleteMarker => {
                tracing::trace!(offset = span.start, "Withholding unclosed references envelope");
            }
        }
    }
    result
}

/// Groups of a message ready for display, with normal groups materialized.
#[must_use]
pub fn display_groups(message: &ChatMessage, stage: TextStage) -> Vec<PartGroup> {
    group_parts(&message.parts)
        .into_iter()
        .map(|group| match group.kind {
            PartGroupKind::Reasoning => group,
            PartGroupKind::Normal => PartGroup {
                kind: PartGroupKind::Normal,
                parts: materialize_parts(&group.parts, stage),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Citation, Reference, ReferenceType, ToolCall};
    use std::collections::BTreeMap;

    const ENVELOPE: &str = "<references><reference><artifactId>x1</artifactId><title>T1</title></reference></references>";

    fn x1() -> Reference {
        Reference {
            kind: ReferenceType::Course,
            artifact_id: "x1".into(),
            title: "T1".into(),
            description: None,
        }
    }

    #[test]
    fn test_group_parts_isolates_reasoning() {
        let parts = vec![
            MessagePart::text("a"),
            MessagePart::text("b"),
            MessagePart::reasoning("think"),
            MessagePart::reasoning("more"),
            MessagePart::text("c"),
        ];
        let groups = group_parts(&parts);
        let kinds: Vec<_> = groups.iter().map(|g| (g.kind, g.parts.len())).collect();
        assert_eq!(
            kinds,
            vec![
                (PartGroupKind::Normal, 2),
                (PartGroupKind::Reasoning, 1),
                (PartGroupKind::Reasoning, 1),
                (PartGroupKind::Normal, 1),
            ]
        );
    }

    #[test]
    fn test_group_parts_empty() {
        assert!(group_parts(&[]).is_empty());
    }

    #[test]
    fn test_live_text_withholds_incomplete_envelope() {
        let text = "答案如下 <references><reference><artifactId>x1";
        assert_eq!(expand_text(text, TextStage::Live), vec![MessagePart::text("答案如下 ")]);
    }

    #[test]
    fn test_live_text_does_not_parse_citations() {
        let text = "见[标题](COURSE:abc)";
        assert_eq!(expand_text(text, TextStage::Live), vec![MessagePart::text(text)]);
    }

    #[test]
    fn test_settled_text_splices_references_and_citations() {
        let text = format!("见[标题](COURSE:abc)说明\n{ENVELOPE}结尾");
        assert_eq!(
            expand_text(&text, TextStage::Settled),
            vec![
                MessagePart::text("见《标题》说明"),
                MessagePart::Citation {
                    citation: Citation {
                        kind: ReferenceType::Course,
                        artifact_id: "abc".into(),
                        title: "标题".into(),
                    },
                },
                MessagePart::Reference { references: vec![x1()] },
                MessagePart::text("结尾"),
            ]
        );
    }

    #[test]
    fn test_unresolvable_envelope_is_hidden() {
        let text = "a<references><reference><artifactId>x</artifactId></reference></references>b";
        assert_eq!(
            expand_text(text, TextStage::Settled),
            vec![MessagePart::text("a"), MessagePart::text("b")]
        );
    }

    #[test]
    fn test_materialize_preserves_order_of_other_parts() {
        let tool = MessagePart::Tool {
            tool_call: ToolCall::running("t1", "read_article", BTreeMap::new()),
        };
        let parts = vec![
            MessagePart::text(format!("前 {ENVELOPE}")),
            tool.clone(),
            MessagePart::SourceUrl { url: "https://example.com".into() },
        ];
        let out = materialize_parts(&parts, TextStage::Live);
        assert_eq!(
            out,
            vec![
                MessagePart::text("前 "),
                MessagePart::Reference { references: vec![x1()] },
                tool,
                MessagePart::SourceUrl { url: "https://example.com".into() },
            ]
        );
    }

    #[test]
    fn test_message_kind() {
        let tool = ChatMessage::tool(ToolCall::running("t1", "x", BTreeMap::new()));
        assert_eq!(message_kind(&tool), MessageKind::Tool);
        assert_eq!(message_kind(&ChatMessage::assistant("m1", "hi")), MessageKind::Normal);
    }

    #[test]
    fn test_stage_for_message() {
        let msg = ChatMessage::assistant("m1", "hi");
        assert_eq!(TextStage::for_message(&msg, Some("m1"), ChatStatus::Streaming), TextStage::Live);
        assert_eq!(TextStage::for_message(&msg, Some("m2"), ChatStatus::Streaming), TextStage::Settled);
        assert_eq!(TextStage::for_message(&msg, None, ChatStatus::Streaming), TextStage::Settled);
        assert_eq!(TextStage::for_message(&msg, Some("m1"), ChatStatus::Ready), TextStage::Settled);
        let user = ChatMessage::user("q");
        let user_id = user.id.clone();
        assert_eq!(
            TextStage::for_message(&user, Some(&user_id), ChatStatus::Streaming),
            TextStage::Settled
        );
    }

    #[test]
    fn test_display_groups_materializes_normal_groups_only() {
        let message = ChatMessage {
            id: "m1".into(),
            role: MessageRole::Assistant,
            parts: vec![
                MessagePart::reasoning("[not](COURSE:parsed)"),
                MessagePart::text("见[标题](COURSE:abc)"),
            ],
        };
        let groups = display_groups(&message, TextStage::Settled);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].parts, vec![MessagePart::reasoning("[not](COURSE:parsed)")]);
        assert_eq!(groups[1].parts.len(), 2);
        assert!(matches!(groups[1].parts[1], MessagePart::Citation { .. }));
    }
}
