//! Follow a room and print its events until Ctrl-C.
//!
//! ```text
//! CHAT_URL=http://localhost:3006 CHAT_SENDER=watcher \
//!     RUST_LOG=agent_chat=debug cargo run --example follow_room -- general
//! ```

use agent_chat::sse::StreamEventKind;
use agent_chat::ChatClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let room = std::env::args().nth(1).unwrap_or_else(|| "general".to_string());
    let client = ChatClient::from_env();

    let mut events = client.open_resilient_stream(&room, client.stream_options());
    let token = events.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    while let Some(event) = events.next_event().await {
        match event.kind() {
            StreamEventKind::Message => println!(
                "[{}] {}: {}",
                event.seq().unwrap_or_default(),
                event.data["sender"].as_str().unwrap_or("?"),
                event.data["content"].as_str().unwrap_or("")
            ),
            StreamEventKind::Typing => {}
            kind => println!("({}) {}", kind.as_str(), event.raw),
        }
    }

    println!("stopped at seq {:?}", events.cursor());
}
