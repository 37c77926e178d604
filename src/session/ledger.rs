//! Tool-call correlation.
//!
//! Each call id moves through `absent → running → completed`. A START gives
//! the call its own assistant message whose id is the call id; the matching
//! END merges attributes into that message's tool part in place.

use crate::events::ToolCallEvent;
use crate::message::{ChatMessage, MessagePart, MessageRole, ToolCall, ToolCallStatus};

fn find_call<'a>(messages: &'a [ChatMessage], call_id: &str) -> Option<&'a ToolCall> {
    messages
        .iter()
        .filter(|m| m.id == call_id && m.role == MessageRole::Assistant)
        .flat_map(|m| m.parts.iter())
        .filter_map(MessagePart::tool_call)
        .find(|call| call.id == call_id)
}

/// Status of a call id in the transcript, `None` when absent.
#[must_use]
pub fn status(messages: &[ChatMessage], call_id: &str) -> Option<ToolCallStatus> {
    find_call(messages, call_id).map(|call| call.status)
}

/// Apply `TOOL_CALL_START`. Returns `false` if the id is already known.
pub fn start(messages: &mut Vec<ChatMessage>, event: ToolCallEvent) -> bool {
    if let Some(existing) = status(messages, &event.tool_call_id) {
        tracing::debug!(
            tool_call_id = %event.tool_call_id,
            status = ?existing,
            "Ignoring TOOL_CALL_START for known call"
        );
        return false;
    }

    tracing::debug!(
        tool_call_id = %event.tool_call_id,
        tool_name = %event.tool_name,
        attribute_count = event.attributes.len(),
        "Tool call started"
    );
    messages.push(ChatMessage::tool(ToolCall::running(
        event.tool_call_id,
        event.tool_name,
        event.attributes,
    )));
    true
}

/// Apply `TOOL_CALL_END`. Returns `false` when no running call matches.
pub fn end(messages: &mut [ChatMessage], event: ToolCallEvent) -> bool {
    let call_id = event.tool_call_id.as_str();
    let call = messages
        .iter_mut()
        .filter(|m| m.id == call_id && m.role == MessageRole::Assistant)
        .flat_map(|m| m.parts.iter_mut())
        .find_map(|part| match part {
            MessagePart::Tool { tool_call }
                if tool_call.id == call_id && tool_call.status == ToolCallStatus::Running =>
            {
                Some(tool_call)
            }
            _ => None,
        });

    match call {
        Some(call) => {
            call.complete(event.attributes);
            tracing::debug!(tool_call_id = %call_id, "Tool call completed");
            true
        }
        None => {
            tracing::debug!(tool_call_id = %call_id, "Ignoring TOOL_CALL_END without running call");
            false
        }
    }
}
