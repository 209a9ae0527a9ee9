//! Collaborator seam between the dispatcher and the embedding shell.
//!
//! The shell (GUI app, console harness, test double) renders the actual
//! effects: speech synthesis, facial expression, image display, status
//! text. Implementations must hand work off to whatever execution context
//! they need; dispatcher calls only enqueue and must never be blocked on
//! rendering. The one exception is [`Collaborator::speak_to_end`], whose
//! future intentionally resolves only once narration has finished — the
//! dispatcher runs it on its own task, off the listener path.

use crate::sentiment::Expression;
use async_trait::async_trait;

/// Ambient session/dispatch event surfaced to the shell.
///
/// These correspond to the short user-visible status blurbs of the original
/// apps; shells are free to display, log, or ignore them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Connection to the companion server established.
    Connected,
    /// A connect attempt failed; the session stays disconnected.
    ConnectFailed,
    /// An outbound send was dropped because no connection could be made.
    Unavailable,
    /// The listener hit an I/O error while the session was live.
    ListenError(String),
    /// An unrecognized command line arrived (token included).
    CommandReceived(String),
    /// An `IMAGE_BASE64` payload was not valid base64.
    InvalidImage,
    /// A `SAY` line is being answered.
    Responding,
    /// A `SAY_STORY` narration started.
    TellingStory,
}

/// External sink for dispatcher effects.
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Speak a line of text (fire-and-forget).
    async fn speak(&self, text: &str);

    /// Speak narration text; the future resolves once playback completes
    /// *or* fails, whichever comes first. Pause/resume during playback is
    /// internal to the implementation and not surfaced.
    async fn speak_to_end(&self, text: &str);

    /// Change the facial expression.
    async fn set_expression(&self, expression: Expression);

    /// Display a raster image (validated PNG/JPEG bytes).
    async fn show_image(&self, bytes: Vec<u8>);

    /// Hide the currently shown image, if any.
    async fn hide_image(&self) {}

    /// Update the status line with the most recent spoken text.
    async fn set_status(&self, _text: &str) {}

    /// Surface an ambient notice.
    async fn notify(&self, _notice: Notice) {}
}

/// Collaborator that ignores every effect. Useful for headless embeddings
/// and as a placeholder in tests.
#[derive(Debug, Default)]
pub struct NoopCollaborator;

#[async_trait]
impl Collaborator for NoopCollaborator {
    async fn speak(&self, _text: &str) {}

    async fn speak_to_end(&self, _text: &str) {}

    async fn set_expression(&self, _expression: Expression) {}

    async fn show_image(&self, _bytes: Vec<u8>) {}
}
