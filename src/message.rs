//! Transcript data model.
//!
//! A transcript is an ordered list of [`ChatMessage`]s. Each message owns an
//! ordered list of [`MessagePart`]s; insertion order is significant and parts
//! are never reordered.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Human input.
    User,
    /// Agent output, including tool-call messages.
    Assistant,
}

/// Session-level chat status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    /// The user message is sent and the connection is not open yet.
    Submitted,
    /// Events are arriving.
    Streaming,
    /// Idle; a new message may be sent.
    #[default]
    Ready,
    /// The last turn failed at the transport level.
    Error,
}

/// Kind of artifact a reference or citation points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    /// Course text. Default when a marker omits its type.
    #[default]
    Course,
    /// Generated mind map.
    MindMap,
    /// Generated solution code.
    SolutionCode,
}

impl ReferenceType {
    /// Wire token for this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::MindMap => "mind_map",
            Self::SolutionCode => "solution_code",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = Error;

    /// Case-insensitive; `COURSE`, `course` and `Course` are all accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "course" => Ok(Self::Course),
            "mind_map" => Ok(Self::MindMap),
            "solution_code" => Ok(Self::SolutionCode),
            other => Err(Error::UnknownMarkerType(other.to_string())),
        }
    }
}

/// Structured pointer extracted from a `<reference>` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    /// Artifact kind.
    #[serde(rename = "type", default)]
    pub kind: ReferenceType,
    /// Identifier in the external artifact store.
    pub artifact_id: String,
    /// Display title.
    pub title: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Structured pointer extracted from an inline `[title](TYPE:id)` marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Artifact kind.
    #[serde(rename = "type")]
    pub kind: ReferenceType,
    /// Identifier in the external artifact store.
    pub artifact_id: String,
    /// Display title.
    pub title: String,
}

/// Lifecycle of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    /// START seen, END pending.
    Running,
    /// END seen.
    Completed,
}

/// A tool invocation tracked in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation key, unique per call.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Union of start- and end-time attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Current status.
    pub status: ToolCallStatus,
}

impl ToolCall {
    /// A freshly started call.
    #[must_use]
    pub fn running(
        id: impl Into<String>,
        name: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes,
            status: ToolCallStatus::Running,
        }
    }

    /// Merge end-time attributes (end wins on collision) and complete the call.
    pub fn complete(&mut self, attributes: BTreeMap<String, String>) {
        self.attributes.extend(attributes);
        self.status = ToolCallStatus::Completed;
    }

    /// Human-facing title and description for known tools.
    #[must_use]
    pub fn presentation(&self) -> (String, Option<String>) {
        let (title, key) = match self.name.as_str() {
            "list_articles" => ("查询文章", "tag"),
            "read_article" => ("读取文章", "title"),
            "generate_mind_map" => ("生成思维导图", "title"),
            "report_solution_code" => ("生成题解代码", "title"),
            _ => return (self.name.clone(), None),
        };
        (title.to_string(), self.attributes.get(key).cloned())
    }
}

/// One ordered element of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    /// Prose, possibly still containing markers.
    Text {
        /// The text content.
        text: String,
    },
    /// Model reasoning, rendered apart from prose.
    Reasoning {
        /// The reasoning text.
        text: String,
    },
    /// A tool call record.
    Tool {
        /// The call, mutated in place when its END arrives.
        #[serde(rename = "toolCall")]
        tool_call: ToolCall,
    },
    /// A group of references extracted from one `<references>` envelope.
    Reference {
        /// Extracted references, in source order.
        references: Vec<Reference>,
    },
    /// A single inline citation.
    Citation {
        /// The citation.
        citation: Citation,
    },
    /// A source link.
    SourceUrl {
        /// Link target.
        url: String,
    },
}

impl MessagePart {
    /// Create a text part.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }

    /// Create a reasoning part.
    #[must_use]
    pub fn reasoning(s: impl Into<String>) -> Self {
        Self::Reasoning { text: s.into() }
    }

    /// Text carried by `text`/`reasoning` parts.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::Reasoning { text } => Some(text),
            _ => None,
        }
    }

    /// The tool call carried by a `tool` part.
    #[must_use]
    pub fn tool_call(&self) -> Option<&ToolCall> {
        match self {
            Self::Tool { tool_call } => Some(tool_call),
            _ => None,
        }
    }
}

/// A single message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Stable identifier.
    pub id: String,
    /// Author role.
    pub role: MessageRole,
    /// Ordered parts.
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    /// A user message with a fresh id.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::User,
            parts: vec![MessagePart::text(text)],
        }
    }

    /// An assistant message with one text part.
    #[must_use]
    pub fn assistant(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Assistant,
            parts: vec![MessagePart::text(text)],
        }
    }

    /// An assistant message holding one tool call, keyed by the call id.
    #[must_use]
    pub fn tool(call: ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            role: MessageRole::Assistant,
            parts: vec![MessagePart::Tool { tool_call: call }],
        }
    }

    /// Text of the first text part.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            MessagePart::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_type_parse_is_case_insensitive() {
        assert_eq!("COURSE".parse::<ReferenceType>().unwrap(), ReferenceType::Course);
        assert_eq!("Mind_Map".parse::<ReferenceType>().unwrap(), ReferenceType::MindMap);
        assert_eq!(
            "solution_code".parse::<ReferenceType>().unwrap(),
            ReferenceType::SolutionCode
        );
        assert!(matches!(
            "video".parse::<ReferenceType>(),
            Err(Error::UnknownMarkerType(t)) if t == "video"
        ));
    }

    #[test]
    fn test_tool_call_complete_end_wins() {
        let mut call = ToolCall::running(
            "t1",
            "read_article",
            BTreeMap::from([("a".into(), "1".into()), ("b".into(), "2".into())]),
        );
        call.complete(BTreeMap::from([("a".into(), "9".into())]));
        assert_eq!(call.status, ToolCallStatus::Completed);
        assert_eq!(call.attributes["a"], "9");
        assert_eq!(call.attributes["b"], "2");
    }

    #[test]
    fn test_tool_presentation() {
        let call = ToolCall::running(
            "t1",
            "list_articles",
            BTreeMap::from([("tag".into(), "dp".into())]),
        );
        assert_eq!(call.presentation(), ("查询文章".to_string(), Some("dp".to_string())));

        let unknown = ToolCall::running("t2", "web_search", BTreeMap::new());
        assert_eq!(unknown.presentation(), ("web_search".to_string(), None));
    }

    #[test]
    fn test_message_part_serialization() {
        let part = MessagePart::Citation {
            citation: Citation {
                kind: ReferenceType::MindMap,
                artifact_id: "m1".into(),
                title: "Map".into(),
            },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "citation");
        assert_eq!(json["citation"]["type"], "mind_map");
        assert_eq!(json["citation"]["artifactId"], "m1");

        let tool = MessagePart::Tool {
            tool_call: ToolCall::running("t1", "x", BTreeMap::new()),
        };
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["toolCall"]["status"], "running");
    }

    #[test]
    fn test_user_messages_get_distinct_ids() {
        let a = ChatMessage::user("Q");
        let b = ChatMessage::user("Q");
        assert_ne!(a.id, b.id);
        assert_eq!(a.text(), Some("Q"));
    }
}
