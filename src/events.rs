//! Wire event model for the agent stream.
//!
//! Each SSE frame carries zero or one JSON object of the shape
//! `{"type": "<TAG>", "data": {...}}`. The [`AgentEvent`] enum covers the
//! closed set of tags the transcript understands:
//! - Run lifecycle (`RUN_STARTED`, `RUN_FINISHED`)
//! - Assistant text (`TEXT_MESSAGE`)
//! - Tool-call lifecycle (`TOOL_CALL_START`, `TOOL_CALL_END`)
//! - Artifact streaming (`ARTIFACT_CONTENT_*`, `ARTIFACT_LIST_UPDATED`)
//!
//! Unknown tags decode to [`AgentEvent::Unknown`] so newer servers don't
//! break older clients.
//!
//! # Example
//!
//! ```rust
//! use chat_transcript::events::{AgentEvent, decode_frame, sse_frame};
//!
//! let event = decode_frame(r#"{"type":"RUN_STARTED"}"#).unwrap();
//! assert_eq!(event, Some(AgentEvent::RunStarted));
//! assert!(sse_frame(&AgentEvent::RunFinished).starts_with("data: "));
//! ```

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `TEXT_MESSAGE` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextMessage {
    /// Assistant message this delta belongs to.
    pub message_id: String,
    /// Text delta to append.
    pub content: String,
}

/// `ARTIFACT_CONTENT_START` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactContentStart {
    pub artifact_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `ARTIFACT_CONTENT_CHUNK` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactContentChunk {
    pub artifact_id: String,
    /// Incremental delta to append.
    pub content: String,
}

/// `ARTIFACT_CONTENT_COMPLETE` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactContentComplete {
    pub artifact_id: String,
}

/// `TOOL_CALL_START` / `TOOL_CALL_END` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallEvent {
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Events delivered by the agent stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    // ─────────────────────────────────────────────────────────────────────
    // Run Lifecycle
    // ─────────────────────────────────────────────────────────────────────
    /// A new assistant turn begins.
    RunStarted,
    /// The turn is over.
    RunFinished,

    // ─────────────────────────────────────────────────────────────────────
    // Message Content
    // ─────────────────────────────────────────────────────────────────────
    /// Assistant text delta.
    TextMessage(TextMessage),

    // ─────────────────────────────────────────────────────────────────────
    // Tool Calls
    // ─────────────────────────────────────────────────────────────────────
    /// A tool call started.
    ToolCallStart(ToolCallEvent),
    /// A tool call finished.
    ToolCallEnd(ToolCallEvent),

    // ─────────────────────────────────────────────────────────────────────
    // Artifacts
    // ─────────────────────────────────────────────────────────────────────
    /// A generated document starts streaming.
    ArtifactContentStart(ArtifactContentStart),
    /// More content for a streaming document.
    ArtifactContentChunk(ArtifactContentChunk),
    /// A streaming document is complete.
    ArtifactContentComplete(ArtifactContentComplete),
    /// The authoritative artifact list changed.
    ArtifactListUpdated,

    /// A tag this client does not know.
    Unknown(String),
}

/// Envelope as it appears on the wire.
#[derive(Debug, Deserialize, Serialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    data: serde_json::Value,
}

impl AgentEvent {
    /// Wire tag for this event.
    pub fn tag(&self) -> &str {
        match self {
            Self::RunStarted => "RUN_STARTED",
            Self::RunFinished => "RUN_FINISHED",
            Self::TextMessage(_) => "TEXT_MESSAGE",
            Self::ToolCallStart(_) => "TOOL_CALL_START",
            Self::ToolCallEnd(_) => "TOOL_CALL_END",
            Self::ArtifactContentStart(_) => "ARTIFACT_CONTENT_START",
            Self::ArtifactContentChunk(_) => "ARTIFACT_CONTENT_CHUNK",
            Self::ArtifactContentComplete(_) => "ARTIFACT_CONTENT_COMPLETE",
            Self::ArtifactListUpdated => "ARTIFACT_LIST_UPDATED",
            Self::Unknown(tag) => tag,
        }
    }

    fn from_envelope(envelope: Envelope) -> Result<Self> {
        let Envelope { kind, data } = envelope;
        let event = match kind.as_str() {
            "RUN_STARTED" => Self::RunStarted,
            "RUN_FINISHED" => Self::RunFinished,
            "ARTIFACT_LIST_UPDATED" => Self::ArtifactListUpdated,
            "TEXT_MESSAGE" => Self::TextMessage(payload(&kind, data)?),
            "TOOL_CALL_START" => Self::ToolCallStart(payload(&kind, data)?),
            "TOOL_CALL_END" => Self::ToolCallEnd(payload(&kind, data)?),
            "ARTIFACT_CONTENT_START" => Self::ArtifactContentStart(payload(&kind, data)?),
            "ARTIFACT_CONTENT_CHUNK" => Self::ArtifactContentChunk(payload(&kind, data)?),
            "ARTIFACT_CONTENT_COMPLETE" => Self::ArtifactContentComplete(payload(&kind, data)?),
            _ => Self::Unknown(kind),
        };
        Ok(event)
    }

    fn to_envelope(&self) -> Envelope {
        let data = match self {
            Self::RunStarted | Self::RunFinished | Self::ArtifactListUpdated | Self::Unknown(_) => {
                serde_json::Value::Null
            }
            Self::TextMessage(d) => serde_json::to_value(d).unwrap_or_default(),
            Self::ToolCallStart(d) | Self::ToolCallEnd(d) => {
                serde_json::to_value(d).unwrap_or_default()
            }
            Self::ArtifactContentStart(d) => serde_json::to_value(d).unwrap_or_default(),
            Self::ArtifactContentChunk(d) => serde_json::to_value(d).unwrap_or_default(),
            Self::ArtifactContentComplete(d) => serde_json::to_value(d).unwrap_or_default(),
        };
        Envelope {
            kind: self.tag().to_string(),
            data,
        }
    }
}

fn payload<T: DeserializeOwned>(kind: &str, data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| Error::MalformedFrame(format!("{kind}: {e}")))
}

/// Decode the data of one SSE frame.
///
/// Returns `Ok(None)` for an empty frame (keep-alives, comments) and
/// [`Error::MalformedFrame`] for non-JSON data or a payload missing required
/// fields.
pub fn decode_frame(data: &str) -> Result<Option<AgentEvent>> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    let envelope: Envelope =
        serde_json::from_str(data).map_err(|e| Error::MalformedFrame(e.to_string()))?;
    AgentEvent::from_envelope(envelope).map(Some)
}

/// Encode an [`AgentEvent`] as an SSE frame.
///
/// # Example
///
/// ```rust
/// use chat_transcript::events::{AgentEvent, sse_frame};
///
/// let sse = sse_frame(&AgentEvent::RunStarted);
/// assert_eq!(sse, "data: {\"type\":\"RUN_STARTED\"}\n\n");
/// ```
pub fn sse_frame(evt: &AgentEvent) -> String {
    let json = serde_json::to_string(&evt.to_envelope()).unwrap_or_else(|e| {
        serde_json::json!({ "type": "ERROR", "data": { "message": e.to_string() } }).to_string()
    });

    format!("data: {json}\n\n")
}
