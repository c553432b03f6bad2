//! Console front end for the tutoring bot.
//!
//! Stands in for a chat platform: outbound messages print to stdout and
//! inbound events are read line by line from stdin. A bare option number is
//! translated into the same answer callback a real platform's buttons would
//! produce.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use channel::{ChannelAdapter, ChatTransport, TransportError};
use channel::command::answer_callback;
use services::{Clock, LessonService, OpenAiGenerator};
use storage::{EvictionPolicy, InMemorySessionStore};
use tutor_core::model::SessionId;

struct ConsoleTransport;

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send(&self, _session: SessionId, text: String) -> Result<(), TransportError> {
        println!("\n{text}");
        Ok(())
    }
}

fn eviction_policy_from_env() -> EvictionPolicy {
    if let Ok(raw) = std::env::var("TUTOR_SESSION_CAPACITY") {
        if let Ok(max) = raw.parse::<usize>() {
            return EvictionPolicy::Capacity(max);
        }
        warn!(%raw, "ignoring invalid TUTOR_SESSION_CAPACITY");
    }
    if let Ok(raw) = std::env::var("TUTOR_SESSION_TTL_MINUTES") {
        if let Ok(minutes) = raw.parse::<i64>() {
            return EvictionPolicy::IdleTtl(chrono::Duration::minutes(minutes));
        }
        warn!(%raw, "ignoring invalid TUTOR_SESSION_TTL_MINUTES");
    }
    EvictionPolicy::None
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let clock = Clock::default_clock();
    let store = Arc::new(
        InMemorySessionStore::new()
            .with_clock(clock)
            .with_policy(eviction_policy_from_env()),
    );

    let generator = OpenAiGenerator::from_env();
    if !generator.enabled() {
        eprintln!("TUTOR_AI_API_KEY is not set; lessons will fail until it is.");
    }

    let lessons = Arc::new(LessonService::new(clock, store, Arc::new(generator)));
    let adapter = ChannelAdapter::new(Arc::clone(&lessons), Arc::new(ConsoleTransport));

    // One console, one user.
    let user = SessionId::new(1);
    adapter.handle_message(user, "/start").await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        if let Ok(choice) = line.parse::<usize>() {
            // A bare number answers the current question, like pressing the
            // numbered option button would.
            if choice == 0 {
                println!("Options start at 1.");
                continue;
            }
            match lessons.state(user).await {
                Ok(state) => {
                    let payload = answer_callback(state.answer_pointer(), choice - 1);
                    adapter.handle_callback(user, &payload).await?;
                }
                Err(err) => {
                    println!("{err}");
                }
            }
            continue;
        }

        if line.starts_with("ans:") {
            adapter.handle_callback(user, line).await?;
        } else {
            adapter.handle_message(user, line).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
