//! Console shell for the companion-server link.
//!
//! Connects to the companion server, prints every rendered effect to
//! stdout, and forwards stdin lines as outbound free-text messages. The
//! endpoint comes from `BUDDY_SOCKET_HOST` / `BUDDY_SOCKET_PORT`, backed by
//! an optional TOML config file given as the first argument.
//!
//! Diagnostic output goes to stderr so stdout stays readable.

use buddy_link::{
    Collaborator, DispatcherConfig, Endpoint, Expression, LinkConfig, Notice, Session,
};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Renders dispatcher effects as stdout lines.
struct ConsoleCollaborator;

#[async_trait::async_trait]
impl Collaborator for ConsoleCollaborator {
    async fn speak(&self, text: &str) {
        println!("[speak] {text}");
    }

    async fn speak_to_end(&self, text: &str) {
        println!("[narrate] {text}");
    }

    async fn set_expression(&self, expression: Expression) {
        println!("[face] {expression:?}");
    }

    async fn show_image(&self, bytes: Vec<u8>) {
        println!("[image] {} bytes", bytes.len());
    }

    async fn hide_image(&self) {
        println!("[image] hidden");
    }

    async fn set_status(&self, text: &str) {
        println!("[status] {text}");
    }

    async fn notify(&self, notice: Notice) {
        println!("[notice] {notice:?}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let defaults = match std::env::args().nth(1) {
        Some(path) => LinkConfig::load(Path::new(&path))?,
        None => LinkConfig::default(),
    };
    // A missing port is fatal here: without one there is nothing to dial.
    let endpoint = Endpoint::resolve(&defaults)?;
    tracing::info!(endpoint = %endpoint.authority(), "buddy-link-console starting");

    let session = Session::start(
        endpoint,
        Arc::new(ConsoleCollaborator),
        DispatcherConfig {
            undecided_reply: "I'm not sure what you mean".to_owned(),
        },
    );
    session.open().await?;

    // Every stdin line becomes one outbound message, like the app buttons
    // sending "Hello from Android!". A failed send is reported through the
    // collaborator and the line dropped; the next send retries the link.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "/quit" {
            break;
        }
        session.send(text).await?;
    }

    session.stop().await;
    tracing::info!("buddy-link-console shut down cleanly");
    Ok(())
}
