//! Streaming chat transcript client
//!
//! Turns a server-sent stream of agent events into an ordered chat
//! transcript: assistant text assembled from deltas, tool calls tracked from
//! start to end, reference and citation markup lifted out of prose, and
//! generated artifacts forwarded to a local store.
//!
//! # Architecture
//!
//! - **Wire model**: tagged event envelopes decoded one SSE frame at a time
//! - **Reduction**: a single-owner state machine applying one event per step
//! - **Markup**: cursor-based scanning of `<references>` envelopes and inline
//!   `[title](TYPE:id)` citations
//! - **Session**: cancellable turns over an HTTP transport
//!
//! # Modules
//!
//! - [`events`]: Wire event model and frame codec
//! - [`message`]: Transcript data model
//! - [`markup`]: Reference and citation parsing
//! - [`parts`]: Part grouping and materialization for display
//! - [`session`]: Reducer, tool-call ledger and chat session
//! - [`artifacts`]: Artifact stream bridge and local store
//! - [`client`]: HTTP transport
//! - [`render`]: Plain-text rendering

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod artifacts;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod markup;
pub mod message;
pub mod parts;
pub mod render;
pub mod session;
pub mod telemetry;

pub use error::{Error, Result};
