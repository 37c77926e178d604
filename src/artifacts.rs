//! Artifact streaming bridge and local artifact list.
//!
//! The transcript holds no artifact state. Artifact events are forwarded to
//! an [`ArtifactStreamBridge`]; [`ArtifactStore`] is the in-process
//! implementation, a mutable copy of the server's list that is refetched
//! through an [`ArtifactSource`] whenever the server says it changed.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::MessageRole;

/// Kind of a stored artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Problem,
    UserCode,
    SolutionCode,
    Course,
    MindMap,
    Explanation,
    #[default]
    #[serde(other)]
    Other,
}

/// A document in the artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactData {
    pub id: String,
    pub role: MessageRole,
    #[serde(rename = "type", default)]
    pub kind: ArtifactType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub content: String,
    /// RFC3339 timestamps as the server reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// True while content is still arriving over the event stream.
    #[serde(default)]
    pub is_streaming: bool,
}

/// Receiver for artifact events, called synchronously by the reducer.
pub trait ArtifactStreamBridge {
    /// Register a new streaming artifact placeholder.
    fn on_artifact_content_start(&mut self, artifact_id: &str, title: &str, description: Option<&str>);
    /// Append a chunk to an artifact's content.
    fn on_artifact_content_chunk(&mut self, artifact_id: &str, chunk: &str);
    /// Mark an artifact as no longer streaming.
    fn on_artifact_content_complete(&mut self, artifact_id: &str);
    /// The authoritative list changed and must be refetched.
    fn on_artifact_list_updated(&mut self);
}

/// Authoritative artifact listing.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Fetch the full artifact list.
    async fn list_artifacts(&self) -> Result<Vec<ArtifactData>>;
}

/// Local, mutable view of the artifact list.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    artifacts: Vec<ArtifactData>,
    current: Option<String>,
    stale: bool,
}

impl ArtifactStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All artifacts in list order.
    #[must_use]
    pub fn list(&self) -> &[ArtifactData] {
        &self.artifacts
    }

    /// Look up an artifact by id.
    #[must_use]
    pub fn get(&self, artifact_id: &str) -> Option<&ArtifactData> {
        self.artifacts.iter().find(|a| a.id == artifact_id)
    }

    /// The artifact most recently opened by a stream.
    #[must_use]
    pub fn current(&self) -> Option<&ArtifactData> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    /// Whether the server announced a list change not yet refetched.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Clear the stale flag, returning whether it was set.
    ///
    /// The caller owns exactly one refetch per list change; a failed refetch
    /// does not re-arm the flag.
    pub fn take_stale(&mut self) -> bool {
        std::mem::take(&mut self.stale)
    }

    /// Replace the list with the server's copy.
    pub fn replace(&mut self, artifacts: Vec<ArtifactData>) {
        tracing::debug!(count = artifacts.len(), "Artifact list replaced");
        self.artifacts = artifacts;
        self.stale = false;
        if self.current.as_deref().is_some_and(|id| self.get(id).is_none()) {
            self.current = None;
        }
    }

    fn get_mut(&mut self, artifact_id: &str) -> Option<&mut ArtifactData> {
        self.artifacts.iter_mut().find(|a| a.id == artifact_id)
    }
}

impl ArtifactStreamBridge for ArtifactStore {
    fn on_artifact_content_start(&mut self, artifact_id: &str, title: &str, description: Option<&str>) {
        if self.get(artifact_id).is_none() {
            let now = Utc::now().to_rfc3339();
            self.artifacts.push(ArtifactData {
                id: artifact_id.to_string(),
                role: MessageRole::Assistant,
                kind: ArtifactType::Other,
                title: title.to_string(),
                description: description.map(ToString::to_string),
                content: String::new(),
                created_at: Some(now.clone()),
                updated_at: Some(now),
                is_streaming: true,
            });
        } else {
            tracing::debug!(artifact_id, "Artifact already present; keeping existing entry");
        }
        self.current = Some(artifact_id.to_string());
    }

    fn on_artifact_content_chunk(&mut self, artifact_id: &str, chunk: &str) {
        match self.get_mut(artifact_id) {
            Some(artifact) => {
                artifact.content.push_str(chunk);
                artifact.updated_at = Some(Utc::now().to_rfc3339());
            }
            None => tracing::debug!(artifact_id, "Chunk for unknown artifact dropped"),
        }
    }

    fn on_artifact_content_complete(&mut self, artifact_id: &str) {
        if let Some(artifact) = self.get_mut(artifact_id) {
            artifact.is_streaming = false;
        }
    }

    fn on_artifact_list_updated(&mut self) {
        self.stale = true;
    }
}
