//! End-to-end transcript scenarios over the public API.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;

use chat_transcript::Result;
use chat_transcript::artifacts::{ArtifactData, ArtifactSource, ArtifactStore};
use chat_transcript::events::{AgentEvent, TextMessage, ToolCallEvent};
use chat_transcript::markup::reference::{REFERENCES_CLOSE, REFERENCES_OPEN};
use chat_transcript::markup::{
    MarkerScanner, SpanKind, TextPart, clean_references, extract_references, parse_text_parts,
};
use chat_transcript::message::{
    ChatMessage, ChatStatus, Citation, MessageRole, Reference, ReferenceType, ToolCallStatus,
};
use chat_transcript::session::{
    AgentTransport, ChatSession, FrameStream, SessionOptions, TranscriptReducer, TurnRequest,
};

const BLOCK: &str = "<reference><artifactId>x1</artifactId><title>T1</title></reference>";

fn text_event(id: &str, content: &str) -> AgentEvent {
    AgentEvent::TextMessage(TextMessage {
        message_id: id.into(),
        content: content.into(),
    })
}

#[test]
fn test_scenario_a_block_references() {
    let text = format!("前 {REFERENCES_OPEN}{BLOCK}{REFERENCES_CLOSE}后");
    assert_eq!(
        extract_references(&text),
        vec![Reference {
            kind: ReferenceType::Course,
            artifact_id: "x1".into(),
            title: "T1".into(),
            description: None,
        }]
    );
    assert_eq!(clean_references(&text), "前 后");
}

#[test]
fn test_scenario_b_inline_citation() {
    assert_eq!(
        parse_text_parts("见[标题](COURSE:abc)说明"),
        vec![
            TextPart::PlainText("见《标题》说明".into()),
            TextPart::Citation(Citation {
                kind: ReferenceType::Course,
                artifact_id: "abc".into(),
                title: "标题".into(),
            }),
        ]
    );
}

#[test]
fn test_scenario_c_streaming_continuation() {
    let mut reducer = TranscriptReducer::new();
    let mut artifacts = ArtifactStore::new();
    reducer.apply(AgentEvent::RunStarted, &mut artifacts);
    reducer.apply(text_event("m1", "He"), &mut artifacts);
    reducer.apply(text_event("m1", "llo"), &mut artifacts);

    assert_eq!(reducer.messages(), &[ChatMessage::assistant("m1", "Hello")]);
}

#[test]
fn test_tool_call_merge_and_override() {
    let event = |attrs: &[(&str, &str)]| ToolCallEvent {
        tool_call_id: "t1".into(),
        tool_name: "generate_mind_map".into(),
        attributes: attrs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    };

    let mut reducer = TranscriptReducer::new();
    let mut artifacts = ArtifactStore::new();
    reducer.apply(AgentEvent::ToolCallStart(event(&[("a", "1"), ("c", "1")])), &mut artifacts);
    reducer.apply(AgentEvent::ToolCallEnd(event(&[("b", "2"), ("c", "9")])), &mut artifacts);
    // A stray END for an unknown call changes nothing.
    reducer.apply(
        AgentEvent::ToolCallEnd(ToolCallEvent {
            tool_call_id: "t2".into(),
            ..event(&[])
        }),
        &mut artifacts,
    );

    let messages = reducer.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "t1");
    let call = messages[0].parts[0].tool_call().unwrap();
    assert_eq!(call.status, ToolCallStatus::Completed);
    assert_eq!(
        call.attributes,
        BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
            ("c".to_string(), "9".to_string()),
        ])
    );
}

#[test]
fn test_cleanup_is_idempotent() {
    let samples = [
        String::new(),
        "plain prose".to_string(),
        format!("a{REFERENCES_OPEN}{BLOCK}{REFERENCES_CLOSE}b"),
        format!("a{REFERENCES_OPEN}{BLOCK}"),
        format!("<refer{REFERENCES_OPEN}x{REFERENCES_CLOSE}ences>tail{REFERENCES_CLOSE}"),
        format!("{REFERENCES_CLOSE}{REFERENCES_OPEN}{REFERENCES_OPEN}{REFERENCES_CLOSE}"),
    ];
    for text in &samples {
        let once = clean_references(text);
        assert_eq!(clean_references(&once), once, "input: {text:?}");
        assert!(!once.contains(REFERENCES_OPEN), "input: {text:?}");
    }
}

#[test]
fn test_incomplete_envelope_is_one_trailing_span() {
    let text = format!("intro {REFERENCES_OPEN}{BLOCK}<reference><artifactId>x2");
    let spans: Vec<_> = MarkerScanner::new(&text, REFERENCES_OPEN, REFERENCES_CLOSE).collect();

    assert_eq!(spans.len(), 2);
    assert_eq!(spans[1].kind, SpanKind::IncompleteMarker);
    assert_eq!(spans[1].end(), text.len());
    assert!(spans[1].inner(REFERENCES_OPEN, REFERENCES_CLOSE).is_none());
    assert_eq!(clean_references(&text), "intro ");
}

#[test]
fn test_scan_round_trip() {
    let envelope = format!("{REFERENCES_OPEN}{BLOCK}{REFERENCES_CLOSE}");
    let text = format!("plain1{envelope}plain2");
    let spans: Vec<_> = MarkerScanner::new(&text, REFERENCES_OPEN, REFERENCES_CLOSE)
        .map(|s| (s.kind, s.text))
        .collect();
    assert_eq!(
        spans,
        vec![
            (SpanKind::Plain, "plain1"),
            (SpanKind::CompleteMarker, envelope.as_str()),
            (SpanKind::Plain, "plain2"),
        ]
    );

    // Empty plains are omitted.
    let spans: Vec<_> = MarkerScanner::new(&envelope, REFERENCES_OPEN, REFERENCES_CLOSE).collect();
    assert_eq!(spans.len(), 1);
}

#[test]
fn test_block_without_title_resolves_nothing() {
    let text = "<reference><artifactId>x1</artifactId></reference>";
    assert!(extract_references(text).is_empty());
}

/// Replays one canned reply per turn.
#[derive(Default)]
struct Replay {
    replies: Mutex<VecDeque<Vec<AgentEvent>>>,
    requests: Mutex<Vec<TurnRequest>>,
}

#[async_trait]
impl ArtifactSource for Replay {
    async fn list_artifacts(&self) -> Result<Vec<ArtifactData>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl AgentTransport for Replay {
    async fn open_turn(&self, request: &TurnRequest) -> Result<FrameStream> {
        self.requests.lock().unwrap().push(request.clone());
        let events = self.replies.lock().unwrap().pop_front().unwrap_or_default();
        let frames: Vec<Result<String>> = events
            .iter()
            .map(|e| {
                Ok(chat_transcript::events::sse_frame(e)
                    .trim_start_matches("data: ")
                    .trim_end()
                    .to_string())
            })
            .collect();
        Ok(futures::stream::iter(frames).boxed())
    }
}

#[tokio::test]
async fn test_scenario_d_regenerate() {
    let reply = |id: &str, text: &str| {
        vec![AgentEvent::RunStarted, text_event(id, text), AgentEvent::RunFinished]
    };
    let transport = Arc::new(Replay {
        replies: Mutex::new(VecDeque::from([reply("a1", "A1"), reply("a2", "A2")])),
        ..Replay::default()
    });
    let session = ChatSession::new(
        Arc::clone(&transport) as Arc<dyn AgentTransport>,
        SessionOptions::default(),
    );

    session.send("Q").await.wait().await;
    let before = session.messages().await;
    assert_eq!(before[1].text(), Some("A1"));

    session.regenerate().await.expect("regenerate").wait().await;

    let after = session.messages().await;
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].role, MessageRole::User);
    assert_eq!(after[0].text(), Some("Q"));
    assert_eq!(after[0].id, before[0].id);
    assert_eq!(after[1].text(), Some("A2"));
    assert_ne!(after[1].id, before[1].id);
    assert_eq!(session.status().await, ChatStatus::Ready);

    let requests = transport.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].message, "Q");
}
