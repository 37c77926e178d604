//! Chat session: sending turns, cancellation and regenerate.
//!
//! A [`ChatSession`] owns the transcript reducer, the local artifact store and
//! the session status behind one async mutex. Each turn runs on its own task
//! that reads frames from an [`AgentTransport`] and applies them one at a
//! time. Starting a new turn cancels the previous one; a generation counter
//! checked under the lock guarantees that no event from a superseded turn is
//! applied.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::artifacts::{ArtifactData, ArtifactSource, ArtifactStore};
use crate::error::{Error, Result};
use crate::events::decode_frame;
use crate::message::{ChatMessage, ChatStatus};

use super::reducer::{Step, TranscriptReducer};

/// Data strings of SSE frames, in delivery order.
pub type FrameStream = BoxStream<'static, Result<String>>;

/// Body of the request that opens a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub session_id: String,
    pub message: String,
    pub model_key: String,
}

/// Connection to the agent backend.
#[async_trait]
pub trait AgentTransport: ArtifactSource {
    /// Open the event stream for one turn.
    ///
    /// Fails when the server rejects the request or does not answer with an
    /// event stream.
    async fn open_turn(&self, request: &TurnRequest) -> Result<FrameStream>;
}

/// Transcript, status and live message id read under one lock.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSnapshot {
    pub messages: Vec<ChatMessage>,
    pub status: ChatStatus,
    /// Assistant text message still receiving deltas.
    pub streaming_message_id: Option<String>,
}

/// Session construction options.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Model key sent with every turn.
    pub model_key: String,
    /// Assistant message shown before the first turn.
    pub greeting: Option<String>,
}

/// Handle to a running turn.
#[derive(Debug)]
pub struct Turn {
    handle: JoinHandle<()>,
}

impl Turn {
    /// Wait for the turn to finish, fail or be cancelled.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Turn task panicked");
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    reducer: TranscriptReducer,
    artifacts: ArtifactStore,
    status: ChatStatus,
    generation: u64,
    cancel: Option<CancellationToken>,
}

impl SessionState {
    fn cancel_current(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.generation += 1;
        self.reducer.reset_scratch();
    }
}

/// A single conversation with the agent.
#[derive(Clone)]
pub struct ChatSession {
    id: String,
    model_key: String,
    transport: Arc<dyn AgentTransport>,
    state: Arc<Mutex<SessionState>>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("model_key", &self.model_key)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Create a session with a fresh id.
    pub fn new(transport: Arc<dyn AgentTransport>, options: SessionOptions) -> Self {
        let mut reducer = TranscriptReducer::new();
        if let Some(greeting) = options.greeting.filter(|g| !g.trim().is_empty()) {
            reducer.push_message(ChatMessage::assistant(Uuid::new_v4().to_string(), greeting));
        }

        let id = Uuid::new_v4().to_string();
        tracing::info!(session_id = %id, model_key = %options.model_key, "Session created");

        Self {
            id,
            model_key: options.model_key,
            transport,
            state: Arc::new(Mutex::new(SessionState {
                reducer,
                ..SessionState::default()
            })),
        }
    }

    /// Session id sent with every turn.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current status.
    pub async fn status(&self) -> ChatStatus {
        self.state.lock().await.status
    }

    /// Snapshot of the transcript.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().await.reducer.messages().to_vec()
    }

    /// Snapshot of the transcript together with the status.
    pub async fn snapshot(&self) -> TranscriptSnapshot {
        let state = self.state.lock().await;
        TranscriptSnapshot {
            messages: state.reducer.messages().to_vec(),
            status: state.status,
            streaming_message_id: state.reducer.current_text_message_id().map(ToString::to_string),
        }
    }

    /// Snapshot of the local artifact list.
    pub async fn artifacts(&self) -> Vec<ArtifactData> {
        self.state.lock().await.artifacts.list().to_vec()
    }

    /// The artifact most recently opened by a stream, if still listed.
    pub async fn current_artifact(&self) -> Option<ArtifactData> {
        self.state.lock().await.artifacts.current().cloned()
    }

    /// Refetch the artifact list from the backend.
    pub async fn refresh_artifacts(&self) -> Result<()> {
        refresh_artifacts(self.transport.as_ref(), &self.state, None).await
    }

    /// Append a user message and start a turn for it.
    ///
    /// Any turn still streaming is cancelled first.
    pub async fn send(&self, text: impl Into<String>) -> Turn {
        let text = text.into();
        let mut state = self.state.lock().await;
        state.reducer.push_user_message(text.clone());
        self.start_turn(&mut state, text)
    }

    /// Replace the last assistant reply with a new one.
    ///
    /// Returns `None` without touching the transcript unless it ends with a
    /// user message followed by an assistant message.
    pub async fn regenerate(&self) -> Option<Turn> {
        let mut state = self.state.lock().await;
        let Some(text) = state.reducer.take_regenerate_target() else {
            tracing::debug!(session_id = %self.id, "Nothing to regenerate");
            return None;
        };
        Some(self.start_turn(&mut state, text))
    }

    /// Abort the turn in flight, if any.
    pub async fn cancel(&self) {
        let mut state = self.state.lock().await;
        if state.cancel.is_some() {
            state.cancel_current();
            state.status = ChatStatus::Ready;
            tracing::info!(session_id = %self.id, "Turn cancelled");
        }
    }

    fn start_turn(&self, state: &mut SessionState, message: String) -> Turn {
        state.cancel_current();
        let token = CancellationToken::new();
        state.cancel = Some(token.clone());
        state.status = ChatStatus::Submitted;

        let request = TurnRequest {
            session_id: self.id.clone(),
            message,
            model_key: self.model_key.clone(),
        };
        let driver = TurnDriver {
            generation: state.generation,
            token,
            transport: Arc::clone(&self.transport),
            state: Arc::clone(&self.state),
        };
        tracing::info!(
            name: "turn.started",
            session_id = %self.id,
            generation = driver.generation,
            "Turn started"
        );

        Turn {
            handle: tokio::spawn(driver.run(request)),
        }
    }
}

/// Task state for one turn.
struct TurnDriver {
    generation: u64,
    token: CancellationToken,
    transport: Arc<dyn AgentTransport>,
    state: Arc<Mutex<SessionState>>,
}

impl TurnDriver {
    async fn run(self, request: TurnRequest) {
        let opened = tokio::select! {
            () = self.token.cancelled() => return,
            opened = self.transport.open_turn(&request) => opened,
        };
        let mut frames = match opened {
            Ok(frames) => frames,
            Err(e) => {
                self.fail(&e).await;
                return;
            }
        };
        if !self.set_status(ChatStatus::Streaming).await {
            return;
        }

        let mut finished = false;
        loop {
            let next = tokio::select! {
                () = self.token.cancelled() => {
                    tracing::debug!(generation = self.generation, "Turn stream dropped after cancel");
                    return;
                }
                next = frames.next() => next,
            };

            let data = match next {
                None => break,
                Some(Ok(data)) => data,
                Some(Err(e)) if finished => {
                    tracing::debug!(error = %e, "Stream error after RUN_FINISHED");
                    break;
                }
                Some(Err(e)) => {
                    self.fail(&e).await;
                    return;
                }
            };

            let event = match decode_frame(&data) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping malformed frame");
                    continue;
                }
            };

            let mut guard = self.state.lock().await;
            if guard.generation != self.generation {
                tracing::debug!(generation = self.generation, "Discarding event from superseded turn");
                return;
            }
            let state = &mut *guard;
            let step = state.reducer.apply(event, &mut state.artifacts);
            if step == Step::Finished {
                finished = true;
                state.status = ChatStatus::Ready;
            }
            let stale = state.artifacts.take_stale();
            drop(guard);

            if stale {
                let refreshed =
                    refresh_artifacts(self.transport.as_ref(), &self.state, Some(self.generation)).await;
                if let Err(e) = refreshed {
                    tracing::warn!(error = %e, "Artifact list refresh failed");
                }
            }
        }

        if !finished {
            self.set_status(ChatStatus::Ready).await;
        }
        let mut state = self.state.lock().await;
        if state.generation == self.generation {
            state.cancel = None;
        }
        tracing::info!(name: "turn.finished", generation = self.generation, "Turn finished");
    }

    /// Set the status if this turn is still current.
    async fn set_status(&self, status: ChatStatus) -> bool {
        let mut state = self.state.lock().await;
        if state.generation != self.generation {
            return false;
        }
        state.status = status;
        true
    }

    async fn fail(&self, error: &Error) {
        let mut state = self.state.lock().await;
        if state.generation != self.generation {
            return;
        }
        tracing::error!(
            name: "turn.failed",
            error = %error,
            transport = error.is_transport(),
            "Turn failed"
        );
        state.status = ChatStatus::Error;
        state.cancel = None;
        state.reducer.reset_scratch();
    }
}

/// Fetch the artifact list outside the lock, then install it.
///
/// With `Some(generation)` the list is dropped if a newer turn started while
/// the fetch was in flight.
async fn refresh_artifacts(
    transport: &dyn AgentTransport,
    state: &Mutex<SessionState>,
    generation: Option<u64>,
) -> Result<()> {
    let listed = transport.list_artifacts().await?;
    let mut state = state.lock().await;
    if generation.is_some_and(|g| g != state.generation) {
        tracing::debug!(?generation, "Discarding artifact list from superseded turn");
        return Ok(());
    }
    state.artifacts.replace(listed);
    Ok(())
}
