//! Conversation state and turn management.
//!
//! # Architecture
//!
//! - [`ledger`]: correlates `TOOL_CALL_START`/`TOOL_CALL_END` by call id
//! - [`TranscriptReducer`]: applies one wire event at a time to the message list
//! - [`ChatSession`]: runs turns against an [`AgentTransport`], with
//!   cancellation, regenerate and status tracking
//!
//! # Example
//!
//! ```rust
//! use chat_transcript::artifacts::ArtifactStore;
//! use chat_transcript::events::{AgentEvent, TextMessage};
//! use chat_transcript::session::TranscriptReducer;
//!
//! let mut reducer = TranscriptReducer::new();
//! let mut artifacts = ArtifactStore::new();
//! for delta in ["He", "llo"] {
//!     reducer.apply(
//!         AgentEvent::TextMessage(TextMessage {
//!             message_id: "m1".into(),
//!             content: delta.into(),
//!         }),
//!         &mut artifacts,
//!     );
//! }
//! assert_eq!(reducer.messages()[0].text(), Some("Hello"));
//! ```

mod chat;
pub mod ledger;
mod reducer;

pub use chat::{
    AgentTransport, ChatSession, FrameStream, SessionOptions, TranscriptSnapshot, Turn, TurnRequest,
};
pub use reducer::{Step, TranscriptReducer};
