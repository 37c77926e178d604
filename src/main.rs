//! Terminal chat client for the agent backend.
//!
//! With a message argument, runs one turn and prints the transcript.
//! Otherwise reads lines from stdin; `/regenerate`, `/artifacts` and `/quit`
//! are commands, anything else is sent as a message.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use chat_transcript::client::AgentClient;
use chat_transcript::config::{AppConfig, Cli};
use chat_transcript::render::{render_artifacts, render_transcript};
use chat_transcript::session::{ChatSession, SessionOptions, Turn};
use chat_transcript::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let cli = Cli::parse();
    let config = AppConfig::from_cli(&cli).context("Failed to load configuration")?;
    telemetry::init(&config.log.filter);

    info!(
        name: "config.loaded",
        base_url = %config.agent.base_url,
        model_key = %config.agent.model_key,
        "Configuration loaded"
    );

    let client = Arc::new(AgentClient::new(&config.agent).context("Failed to build HTTP client")?);
    let session = ChatSession::new(
        client,
        SessionOptions {
            model_key: config.agent.model_key.clone(),
            greeting: config.session.greeting.clone(),
        },
    );

    if let Some(message) = cli.message {
        let turn = session.send(message).await;
        wait_or_interrupt(&session, turn).await;
        let snapshot = session.snapshot().await;
        print!(
            "{}",
            render_transcript(
                &snapshot.messages,
                snapshot.status,
                snapshot.streaming_message_id.as_deref()
            )
        );
        return Ok(());
    }

    repl(&session).await
}

/// Wait for a turn, cancelling it on Ctrl-C.
async fn wait_or_interrupt(session: &ChatSession, turn: Turn) {
    tokio::select! {
        () = turn.wait() => {}
        _ = tokio::signal::ctrl_c() => {
            session.cancel().await;
            eprintln!("(cancelled)");
        }
    }
}

/// Print messages from `start` on.
async fn print_from(session: &ChatSession, start: usize) -> anyhow::Result<()> {
    let snapshot = session.snapshot().await;
    let start = start.min(snapshot.messages.len());
    let rendered = render_transcript(
        &snapshot.messages[start..],
        snapshot.status,
        snapshot.streaming_message_id.as_deref(),
    );
    let mut stdout = tokio::io::stdout();
    stdout.write_all(rendered.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

async fn repl(session: &ChatSession) -> anyhow::Result<()> {
    print_from(session, 0).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "/quit" => break,
            "/artifacts" => {
                if let Err(e) = session.refresh_artifacts().await {
                    eprintln!("artifact list unavailable: {e}");
                }
                print!("{}", render_artifacts(&session.artifacts().await));
                if let Some(current) = session.current_artifact().await {
                    println!("current: {} {}", current.id, current.title);
                }
            }
            "/regenerate" => {
                let start = session.messages().await.len().saturating_sub(1);
                match session.regenerate().await {
                    Some(turn) => {
                        wait_or_interrupt(session, turn).await;
                        print_from(session, start).await?;
                    }
                    None => eprintln!("nothing to regenerate"),
                }
            }
            message => {
                // The user's own line is already on screen.
                let start = session.messages().await.len() + 1;
                let turn = session.send(message).await;
                wait_or_interrupt(session, turn).await;
                print_from(session, start).await?;
            }
        }
    }

    info!(name: "session.closed", session_id = %session.id(), "Session closed");
    Ok(())
}
