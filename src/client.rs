//! HTTP transport for the agent backend.
//!
//! A turn is opened with `POST {base_url}{turn_path}`; the response body is
//! an SSE stream whose frames are split on blank lines and reduced to their
//! `data:` payload. The artifact list is read from
//! `GET {base_url}{artifacts_path}`.
//!
//! # Example
//!
//! ```rust,no_run
//! use chat_transcript::client::AgentClient;
//! use chat_transcript::config::AgentConfig;
//!
//! # fn example() -> chat_transcript::Result<()> {
//! let client = AgentClient::new(&AgentConfig::default())?;
//! assert_eq!(client.base_url().as_str(), "http://127.0.0.1:8000/");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use crate::artifacts::{ArtifactData, ArtifactSource};
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::session::{AgentTransport, FrameStream, TurnRequest};

const EVENT_STREAM: &str = "text/event-stream";

/// HTTP client for the agent backend.
#[derive(Debug, Clone)]
pub struct AgentClient {
    base_url: Url,
    http: reqwest::Client,
    turn_path: String,
    artifacts_path: String,
}

impl AgentClient {
    /// Create a client from configuration.
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Self::with_client(config, http)
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(config: &AgentConfig, http: reqwest::Client) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(&config.base_url)?,
            http,
            turn_path: config.turn_path.clone(),
            artifacts_path: config.artifacts_path.clone(),
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(api_error(response).await)
        }
    }
}

async fn api_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".into());
    Error::Api { status, message }
}

#[async_trait]
impl ArtifactSource for AgentClient {
    async fn list_artifacts(&self) -> Result<Vec<ArtifactData>> {
        let response = self.http.get(self.url(&self.artifacts_path)?).send().await?;
        Self::handle_response(response).await
    }
}

#[async_trait]
impl AgentTransport for AgentClient {
    async fn open_turn(&self, request: &TurnRequest) -> Result<FrameStream> {
        let url = self.url(&self.turn_path)?;
        tracing::debug!(%url, session_id = %request.session_id, "Opening turn");

        let response = self
            .http
            .post(url)
            .header(ACCEPT, EVENT_STREAM)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with(EVENT_STREAM) {
            return Err(Error::UnexpectedContentType(content_type));
        }

        Ok(sse_data_stream(response.bytes_stream()))
    }
}

/// Reduce a byte stream to the `data:` payloads of its SSE frames.
///
/// Multi-line data is joined with `\n`. Frames without data lines (comments,
/// keep-alives) produce nothing.
pub fn sse_data_stream<S, B>(bytes: S) -> FrameStream
where
    S: futures::Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let out = async_stream::stream! {
        let mut buf = Vec::<u8>::new();

        futures::pin_mut!(bytes);
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(Error::from(e));
                    return;
                }
            };
            buf.extend(chunk.as_ref().iter().copied().filter(|b| *b != b'\r'));

            while let Some(pos) = find_double_newline(&buf) {
                let frame = buf.drain(..pos + 2).collect::<Vec<_>>();
                if let Some(data) = frame_data(&String::from_utf8_lossy(&frame)) {
                    yield Ok(data);
                }
            }
        }

        // A server may close without the final blank line.
        if let Some(data) = frame_data(&String::from_utf8_lossy(&buf)) {
            yield Ok(data);
        }
    };

    Box::pin(out)
}

fn frame_data(frame: &str) -> Option<String> {
    let lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Find the position of a double newline in the buffer.
fn find_double_newline(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> Vec<reqwest::Result<&'static [u8]>> {
        parts.iter().map(|p| Ok(p.as_bytes())).collect()
    }

    async fn collect(parts: &[&'static str]) -> Vec<String> {
        sse_data_stream(futures::stream::iter(chunks(parts)))
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    #[test]
    fn test_frame_data() {
        assert_eq!(frame_data("data: {\"a\":1}\n\n").as_deref(), Some("{\"a\":1}"));
        assert_eq!(frame_data("data: a\ndata: b\n").as_deref(), Some("a\nb"));
        assert_eq!(frame_data(": keep-alive\n\n"), None);
        assert_eq!(frame_data("event: message\ndata:x\n").as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_frames_split_across_chunks() {
        let frames = collect(&["data: {\"type\":\"RUN_", "STARTED\"}\n", "\ndata: b\n\n"]).await;
        assert_eq!(frames, vec!["{\"type\":\"RUN_STARTED\"}", "b"]);
    }

    #[tokio::test]
    async fn test_crlf_and_trailing_frame() {
        let frames = collect(&["data: a\r\n\r\n: ping\r\n\r\ndata: tail"]).await;
        assert_eq!(frames, vec!["a", "tail"]);
    }

    #[test]
    fn test_url_join() {
        let client = AgentClient::new(&AgentConfig {
            base_url: "http://localhost:8000/api/".into(),
            turn_path: "agent".into(),
            ..AgentConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.url(&client.turn_path).unwrap().as_str(),
            "http://localhost:8000/api/agent"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = AgentClient::new(&AgentConfig {
            base_url: "not a url".into(),
            ..AgentConfig::default()
        });
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
