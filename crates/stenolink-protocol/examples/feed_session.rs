//! Embedded feed-decoding example
//!
//! Decodes a short canned feed session, including a refresh correction,
//! without any network transport.
//!
//! Run with: cargo run -p stenolink-protocol --example feed_session

use stenolink_core::{ReconcilePolicy, SessionId, SessionManager};
use stenolink_protocol::{encode, Delimiters, FeedCommand, FeedItem, FeedParser, Timecode};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let manager = SessionManager::with_policy(ReconcilePolicy::default());
    let session = SessionId::new("demo:courtroom4").unwrap();
    let mut parser = FeedParser::new();

    println!("Stenolink Feed Session Example\n");

    // A vendor feed: page/line/format preamble, a question, an answer,
    // then a refresh correcting the answer span.
    let tc_q = Timecode::new(10, 15, 2, 0);
    let tc_a = Timecode::new(10, 15, 4, 12);

    let mut stream = Vec::new();
    stream.extend(encode(&FeedCommand::Page(14), Delimiters::Control));
    stream.extend(encode(&FeedCommand::Line(3), Delimiters::Control));
    stream.extend(encode(&FeedCommand::Format(1), Delimiters::Control));
    stream.extend(encode(&FeedCommand::Timecode(tc_q), Delimiters::Control));
    stream.extend_from_slice(b"Q. Where were you that evening?");
    stream.extend(encode(&FeedCommand::Format(2), Delimiters::Control));
    stream.extend(encode(&FeedCommand::Timecode(tc_a), Delimiters::Control));
    stream.extend_from_slice(b"A. At the ofice.");

    // The reporter corrects the answer: replace the span at tc_a.
    stream.extend(encode(
        &FeedCommand::RefreshStart {
            start: tc_a,
            end: Timecode::new(10, 15, 6, 0),
        },
        Delimiters::Control,
    ));
    stream.extend(encode(&FeedCommand::Format(2), Delimiters::Control));
    stream.extend(encode(&FeedCommand::Timecode(tc_a), Delimiters::Control));
    stream.extend_from_slice(b"A. At the office.");
    stream.extend(encode(&FeedCommand::RefreshEnd, Delimiters::Control));

    // Feed in small chunks, as a socket would deliver them.
    for chunk in stream.chunks(7) {
        for item in parser.feed(chunk) {
            match item {
                FeedItem::Event(event) => {
                    manager.apply_events(&session, vec![event]);
                }
                FeedItem::Refresh(batch) => {
                    let outcome = manager.apply_refresh(&session, batch);
                    println!("refresh applied: {:?}\n", outcome);
                }
            }
        }
    }

    let transcript = manager.get(&session).unwrap();
    println!("Transcript ({} events):", transcript.len());
    for para in transcript.paragraphs() {
        println!(
            "  [p{} l{} f{} {}] {}",
            para.page,
            para.line,
            para.format,
            para.timecode.map(|tc| tc.to_string()).unwrap_or_default(),
            para.text
        );
    }
}
