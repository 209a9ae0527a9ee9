//! Server command dispatcher.
//!
//! Takes raw command lines from the listener and turns them into
//! collaborator effects. Houses the sentiment-to-expression policy, payload
//! unescaping, the story meta-line filter, and base64 image decoding.

use crate::collaborator::{Collaborator, Notice};
use crate::protocol::{self, ServerCommand};
use crate::sentiment::{self, Expression, Mood};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::sync::Arc;

/// Reply spoken in place of a payload the server flagged as undecided.
pub const DEFAULT_UNDECIDED_REPLY: &str = "I'm undecided too. Let's think about it.";

/// Per-shell dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Fixed line spoken when a `SAY` payload carries the "undecided"
    /// marker. One fixed line per embedding; story-style shells typically
    /// configure "I'm not sure what you mean".
    pub undecided_reply: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            undecided_reply: DEFAULT_UNDECIDED_REPLY.to_owned(),
        }
    }
}

/// Maps parsed command lines to collaborator effects.
pub struct Dispatcher {
    collaborator: Arc<dyn Collaborator>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Dispatcher with the default configuration.
    #[must_use]
    pub fn new(collaborator: Arc<dyn Collaborator>) -> Self {
        Self::with_config(collaborator, DispatcherConfig::default())
    }

    /// Dispatcher with explicit per-shell tuning.
    #[must_use]
    pub fn with_config(collaborator: Arc<dyn Collaborator>, config: DispatcherConfig) -> Self {
        Self {
            collaborator,
            config,
        }
    }

    /// Handle one raw server line.
    ///
    /// Long-running effects (story narration) are spawned onto their own
    /// task so dispatch itself stays quick.
    pub async fn dispatch(&self, line: &str) {
        if line.is_empty() {
            return;
        }
        let (command, payload) = protocol::parse_line(line);
        match ServerCommand::from_token(command) {
            ServerCommand::Say => self.handle_say(payload).await,
            ServerCommand::SayStory => self.handle_story(payload).await,
            ServerCommand::ImageBase64 => self.handle_image(payload).await,
            ServerCommand::Other(token) => {
                tracing::debug!(command = %token, "unrecognized server command");
                self.collaborator
                    .notify(Notice::CommandReceived(token))
                    .await;
            }
        }
    }

    async fn handle_say(&self, payload: &str) {
        let text = protocol::unescape_newlines(payload);
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        // Meta-commentary from the server ("here is a story about...") is
        // not content to narrate. Applies to SAY only, never SAY_STORY.
        if is_meta_commentary(text) {
            tracing::debug!("discarding meta-commentary SAY line");
            return;
        }

        let mood = sentiment::classify(text);
        let spoken = match mood {
            Mood::Undecided => self.config.undecided_reply.as_str(),
            _ => text,
        };

        self.collaborator.set_expression(mood.expression()).await;
        self.collaborator.speak(spoken).await;
        self.collaborator.set_status(spoken).await;
        self.collaborator.notify(Notice::Responding).await;
    }

    async fn handle_story(&self, payload: &str) {
        let story = protocol::unescape_newlines(payload);
        let story = story.trim();
        if story.is_empty() {
            return;
        }

        self.collaborator.set_expression(Expression::Neutral).await;
        self.collaborator.notify(Notice::TellingStory).await;

        // Narration runs to completion on its own task; when it finishes
        // (success or error alike) the face and illustration are reset.
        let collaborator = Arc::clone(&self.collaborator);
        let story = story.to_owned();
        tokio::spawn(async move {
            collaborator.speak_to_end(&story).await;
            collaborator.hide_image().await;
            collaborator.set_expression(Expression::Neutral).await;
        });
    }

    async fn handle_image(&self, payload: &str) {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return;
        }
        let bytes = match BASE64.decode(trimmed) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "invalid IMAGE_BASE64 payload");
                self.collaborator.notify(Notice::InvalidImage).await;
                return;
            }
        };
        // Only hand over bytes that actually decode to a raster image.
        if image::load_from_memory(&bytes).is_err() {
            tracing::debug!(len = bytes.len(), "payload is not a renderable image");
            return;
        }
        self.collaborator.show_image(bytes).await;
    }
}

/// Lines the server prefixes with generic framing rather than content.
fn is_meta_commentary(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.starts_with("here is a") || lower.starts_with("story:")
}
