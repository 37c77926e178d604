//! Event-by-event transcript reduction.
//!
//! [`TranscriptReducer`] owns the message list and the two scratch registers
//! that track the assistant text message currently being streamed. Events are
//! applied one at a time, in delivery order.
//!
//! `TEXT_MESSAGE.content` is a delta: a repeated `message_id` appends to the
//! scratch content, and the message's last part is replaced with the running
//! total.

use crate::artifacts::ArtifactStreamBridge;
use crate::events::{AgentEvent, TextMessage};
use crate::message::{ChatMessage, MessagePart, MessageRole};

use super::ledger;

/// What the session should do after an event was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep reading the stream.
    Continue,
    /// `RUN_FINISHED` arrived; the turn is over.
    Finished,
}

/// Transcript state machine.
#[derive(Debug, Clone, Default)]
pub struct TranscriptReducer {
    messages: Vec<ChatMessage>,
    current_text_message_id: Option<String>,
    current_text_content: String,
}

impl TranscriptReducer {
    /// An empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A transcript seeded with existing messages.
    #[must_use]
    pub fn with_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// The transcript in order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Id of the assistant text message currently streaming.
    #[must_use]
    pub fn current_text_message_id(&self) -> Option<&str> {
        self.current_text_message_id.as_deref()
    }

    /// Clear the scratch registers.
    pub fn reset_scratch(&mut self) {
        self.current_text_message_id = None;
        self.current_text_content.clear();
    }

    /// Append a user message and return its id.
    pub fn push_user_message(&mut self, text: impl Into<String>) -> String {
        let message = ChatMessage::user(text);
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Append an arbitrary message.
    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Prepare a regenerate.
    ///
    /// When the transcript ends with a user message followed by an assistant
    /// message, the assistant message is removed and the user's text is
    /// returned for resubmission. Otherwise nothing changes and `None` is
    /// returned.
    pub fn take_regenerate_target(&mut self) -> Option<String> {
        let [.., user, assistant] = self.messages.as_slice() else {
            return None;
        };
        if user.role != MessageRole::User || assistant.role != MessageRole::Assistant {
            return None;
        }
        let text = user.text().unwrap_or_default().to_string();
        self.messages.pop();
        self.reset_scratch();
        Some(text)
    }

    /// Apply one event.
    pub fn apply(&mut self, event: AgentEvent, bridge: &mut dyn ArtifactStreamBridge) -> Step {
        match event {
            AgentEvent::RunStarted => self.reset_scratch(),
            AgentEvent::RunFinished => return Step::Finished,
            AgentEvent::TextMessage(text) => self.apply_text(text),
            AgentEvent::ToolCallStart(call) => {
                ledger::start(&mut self.messages, call);
            }
            AgentEvent::ToolCallEnd(call) => {
                ledger::end(&mut self.messages, call);
            }
            AgentEvent::ArtifactContentStart(start) => bridge.on_artifact_content_start(
                &start.artifact_id,
                &start.title,
                start.description.as_deref(),
            ),
            AgentEvent::ArtifactContentChunk(chunk) => {
                bridge.on_artifact_content_chunk(&chunk.artifact_id, &chunk.content);
            }
            AgentEvent::ArtifactContentComplete(done) => {
                bridge.on_artifact_content_complete(&done.artifact_id);
            }
            AgentEvent::ArtifactListUpdated => bridge.on_artifact_list_updated(),
            AgentEvent::Unknown(tag) => {
                tracing::debug!(tag = %tag, "Ignoring unknown event");
            }
        }
        Step::Continue
    }

    fn apply_text(&mut self, text: TextMessage) {
        let TextMessage {
            message_id,
            content,
        } = text;

        if self.current_text_message_id.as_deref() != Some(message_id.as_str()) {
            self.messages
                .push(ChatMessage::assistant(message_id.clone(), content.clone()));
            self.current_text_message_id = Some(message_id);
            self.current_text_content = content;
            return;
        }

        self.current_text_content.push_str(&content);
        let cumulative = self.current_text_content.clone();

        let target = self
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.id == message_id && m.role == MessageRole::Assistant);
        match target {
            Some(message) => match message.parts.last_mut() {
                Some(MessagePart::Text { text }) => *text = cumulative,
                _ => message.parts.push(MessagePart::text(cumulative)),
            },
            None => {
                tracing::debug!(message_id = %message_id, "Streaming message vanished; re-adding");
                self.messages
                    .push(ChatMessage::assistant(message_id, cumulative));
            }
        }
    }
}
