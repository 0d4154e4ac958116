//! Stenolink CLI Viewer
//!
//! Tails live transcripts from a stenod server over WebSocket, replicating
//! the refresh splice client-side so corrections land in the local copy
//! exactly as they do on the server.
//!
//! # Usage
//!
//! ```bash
//! # Follow every session on a local server
//! stenolink
//!
//! # Follow one feed session on a remote server
//! stenolink --url ws://example.com:5501 --session "feed:10.0.0.7*"
//!
//! # Dump raw update JSON instead of rendered paragraphs
//! stenolink --raw
//! ```

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use stenolink_core::{
    paragraphs, splice, ReconcilePolicy, SessionId, TranscriptEvent, Update,
};

/// Stenolink CLI - live transcript viewer
#[derive(Parser, Debug)]
#[command(name = "stenolink")]
#[command(author, version, about = "Stenolink CLI - live transcript viewer")]
struct Args {
    /// Viewer WebSocket URL of the stenod server
    #[arg(long, default_value = "ws://127.0.0.1:5501", env = "STENO_URL")]
    url: String,

    /// Session pattern to follow (glob prefix/suffix, e.g. "feed:*")
    #[arg(short, long, default_value = "*", env = "STENO_SESSION")]
    session: String,

    /// Refresh matching tolerance in seconds, matching the server's
    #[arg(long, default_value = "5.0")]
    tolerance: f64,

    /// Print raw update JSON instead of rendered paragraphs
    #[arg(long)]
    raw: bool,

    /// Quiet mode (no banner)
    #[arg(short, long)]
    quiet: bool,
}

/// Client-side copy of one session's transcript.
#[derive(Default)]
struct LocalTranscript {
    events: Vec<TranscriptEvent>,
    printed_paragraphs: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (ws_stream, _) = connect_async(args.url.as_str())
        .await
        .with_context(|| format!("Failed to connect to {}", args.url))?;
    let (mut write, mut read) = ws_stream.split();

    // The first message selects which sessions we follow.
    write.send(Message::Text(args.session.clone())).await?;

    if !args.quiet {
        println!(
            "{}",
            format!(
                "Connected to {} (sessions: {})\n",
                args.url, args.session
            )
            .cyan()
        );
    }

    let policy = ReconcilePolicy {
        start_tolerance_secs: args.tolerance,
    };
    let mut transcripts: HashMap<SessionId, LocalTranscript> = HashMap::new();

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if args.raw {
                    println!("{}", text);
                    continue;
                }
                match serde_json::from_str::<Update>(&text) {
                    Ok(update) => apply_update(&mut transcripts, update, &policy),
                    Err(e) => eprintln!("{}", format!("Bad update: {}", e).red()),
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                if !args.quiet {
                    println!("{}", "Server closed the connection".yellow());
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}", format!("Connection error: {}", e).red());
                break;
            }
        }
    }

    Ok(())
}

fn apply_update(
    transcripts: &mut HashMap<SessionId, LocalTranscript>,
    update: Update,
    policy: &ReconcilePolicy,
) {
    match update {
        Update::Events { session, events } => {
            let local = transcripts.entry(session.clone()).or_default();
            local.events.extend(events);
            print_new_paragraphs(&session, local);
        }
        Update::Refresh {
            session,
            batch,
            outcome,
        } => {
            let local = transcripts.entry(session.clone()).or_default();
            // The identical windowed-match algorithm the server ran.
            let local_outcome = splice(&mut local.events, batch, policy);

            if local_outcome.is_unreconciled() {
                println!(
                    "{}",
                    format!("[{}] refresh could not be matched, appended", session).red()
                );
            } else {
                println!("{}", format!("[{}] refresh applied", session).yellow());
            }
            if local_outcome != outcome {
                println!(
                    "{}",
                    format!(
                        "[{}] local splice diverged from server ({:?} vs {:?})",
                        session, local_outcome, outcome
                    )
                    .red()
                );
            }

            // Corrections can touch already-printed paragraphs; re-render.
            local.printed_paragraphs = 0;
            print_new_paragraphs(&session, local);
        }
    }
}

/// Print finalized paragraphs we have not shown yet, holding back the
/// trailing open run until a Format command closes it.
fn print_new_paragraphs(session: &SessionId, local: &mut LocalTranscript) {
    let paras = paragraphs(&local.events);
    if paras.len() < 2 {
        return;
    }
    let finalized = paras.len() - 1;
    if finalized <= local.printed_paragraphs {
        return;
    }
    for para in &paras[local.printed_paragraphs..finalized] {
        let tag = format!(
            "[{} p{} l{} f{}{}]",
            session,
            para.page,
            para.line,
            para.format,
            para.timecode
                .map(|tc| format!(" {}", tc))
                .unwrap_or_default()
        );
        println!("{} {}", tag.dimmed(), para.text);
    }
    local.printed_paragraphs = finalized;
}
