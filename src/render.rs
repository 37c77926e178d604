//! Plain-text transcript rendering for terminals.

use std::fmt::Write as _;

use crate::artifacts::ArtifactData;
use crate::message::{ChatMessage, ChatStatus, MessagePart, MessageRole, ToolCall, ToolCallStatus};
use crate::parts::{MessageKind, PartGroupKind, TextStage, display_groups, message_kind};

/// Render the whole transcript.
///
/// `streaming_id` names the assistant text message still receiving deltas.
#[must_use]
pub fn render_transcript(messages: &[ChatMessage], status: ChatStatus, streaming_id: Option<&str>) -> String {
    let mut out = String::new();
    for message in messages {
        let stage = TextStage::for_message(message, streaming_id, status);
        out.push_str(&render_message(message, stage));
    }
    if status == ChatStatus::Error {
        out.push_str("[error] the last turn failed; send again to retry\n");
    }
    out
}

/// Render one message, ending with a newline.
#[must_use]
pub fn render_message(message: &ChatMessage, stage: TextStage) -> String {
    let mut out = String::new();

    if message.role == MessageRole::User {
        let _ = writeln!(out, "you> {}", message.text().unwrap_or_default());
        return out;
    }

    if message_kind(message) == MessageKind::Tool {
        for call in message.parts.iter().filter_map(MessagePart::tool_call) {
            let _ = writeln!(out, "  {}", render_tool_call(call));
        }
        return out;
    }

    out.push_str("agent> ");
    for group in display_groups(message, stage) {
        match group.kind {
            PartGroupKind::Reasoning => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                for line in group.parts.iter().filter_map(MessagePart::as_text).flat_map(str::lines) {
                    let _ = writeln!(out, "  | {line}");
                }
            }
            PartGroupKind::Normal => {
                for part in &group.parts {
                    render_part(part, &mut out);
                }
            }
        }
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// One status line for a tool call.
#[must_use]
pub fn render_tool_call(call: &ToolCall) -> String {
    let marker = match call.status {
        ToolCallStatus::Running => "…",
        ToolCallStatus::Completed => "✓",
    };
    match call.presentation() {
        (title, Some(description)) => format!("{marker} {title}: {description}"),
        (title, None) => format!("{marker} {title}"),
    }
}

fn render_part(part: &MessagePart, out: &mut String) {
    match part {
        MessagePart::Text { text } => out.push_str(text),
        MessagePart::Citation { citation } => {
            let _ = write!(out, " [{}:{}]", citation.kind, citation.artifact_id);
        }
        MessagePart::Reference { references } => {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            for reference in references {
                let _ = write!(
                    out,
                    "  ↳ 《{}》 ({}:{})",
                    reference.title, reference.kind, reference.artifact_id
                );
                if let Some(description) = &reference.description {
                    let _ = write!(out, " {description}");
                }
                out.push('\n');
            }
        }
        MessagePart::SourceUrl { url } => {
            let _ = write!(out, " <{url}>");
        }
        MessagePart::Tool { tool_call } => {
            let _ = writeln!(out, "\n  {}", render_tool_call(tool_call));
        }
        MessagePart::Reasoning { .. } => {}
    }
}

/// One line per artifact.
#[must_use]
pub fn render_artifacts(artifacts: &[ArtifactData]) -> String {
    if artifacts.is_empty() {
        return "(no artifacts)\n".to_string();
    }
    let mut out = String::new();
    for artifact in artifacts {
        let streaming = if artifact.is_streaming { " (streaming)" } else { "" };
        let _ = writeln!(
            out,
            "{} [{:?}] {}{} ({} chars)",
            artifact.id,
            artifact.kind,
            artifact.title,
            streaming,
            artifact.content.chars().count()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_settled_reply_with_references() {
        let messages = vec![
            ChatMessage::user("Q"),
            ChatMessage::assistant(
                "a1",
                "见[标题](COURSE:abc)说明\n<references><reference><artifactId>x1</artifactId><title>T1</title></reference></references>",
            ),
        ];
        let out = render_transcript(&messages, ChatStatus::Ready, None);
        assert_eq!(
            out,
            "you> Q\nagent> 见《标题》说明 [course:abc]\n  ↳ 《T1》 (course:x1)\n"
        );
    }

    #[test]
    fn test_render_live_reply_hides_partial_envelope() {
        let messages = vec![ChatMessage::assistant("a1", "答案 <references><ref")];
        let out = render_transcript(&messages, ChatStatus::Streaming, Some("a1"));
        assert_eq!(out, "agent> 答案 \n");
    }

    #[test]
    fn test_render_streaming_reply_stays_live_behind_tool_message() {
        let call = ToolCall::running(
            "t1",
            "read_article",
            BTreeMap::from([("title".into(), "DP".into())]),
        );
        let messages = vec![
            ChatMessage::user("Q"),
            ChatMessage::assistant("a1", "答案 <references><ref"),
            ChatMessage::tool(call),
        ];
        let out = render_transcript(&messages, ChatStatus::Streaming, Some("a1"));
        assert_eq!(out, "you> Q\nagent> 答案 \n  … 读取文章: DP\n");
    }

    #[test]
    fn test_render_tool_message() {
        let mut call = ToolCall::running(
            "t1",
            "read_article",
            BTreeMap::from([("title".into(), "DP".into())]),
        );
        assert_eq!(render_tool_call(&call), "… 读取文章: DP");
        call.complete(BTreeMap::new());
        let out = render_message(&ChatMessage::tool(call), TextStage::Settled);
        assert_eq!(out, "  ✓ 读取文章: DP\n");
    }

    #[test]
    fn test_render_error_status() {
        let out = render_transcript(&[ChatMessage::user("Q")], ChatStatus::Error, None);
        assert!(out.ends_with("send again to retry\n"));
    }

    #[test]
    fn test_render_reasoning_group() {
        let message = ChatMessage {
            id: "a1".into(),
            role: MessageRole::Assistant,
            parts: vec![MessagePart::reasoning("step one\nstep two"), MessagePart::text("done")],
        };
        assert_eq!(
            render_message(&message, TextStage::Settled),
            "agent> \n  | step one\n  | step two\ndone\n"
        );
    }
}
