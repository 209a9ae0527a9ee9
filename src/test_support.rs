//! Shared test doubles for dispatcher and session tests.

use crate::collaborator::{Collaborator, Notice};
use crate::sentiment::Expression;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// One recorded collaborator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Speak(String),
    SpeakToEnd(String),
    SetExpression(Expression),
    ShowImage(Vec<u8>),
    HideImage,
    SetStatus(String),
    Notify(Notice),
}

/// Collaborator that forwards every invocation onto a channel, letting
/// tests assert on effect order without shared-state polling.
pub struct RecordingCollaborator {
    tx: mpsc::UnboundedSender<Effect>,
}

impl RecordingCollaborator {
    /// Build a recording collaborator plus the receiving end of its tape.
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Effect>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn record(&self, effect: Effect) {
        // Receiver dropped means the test is done collecting; ignore.
        let _ = self.tx.send(effect);
    }
}

#[async_trait]
impl Collaborator for RecordingCollaborator {
    async fn speak(&self, text: &str) {
        self.record(Effect::Speak(text.to_owned()));
    }

    async fn speak_to_end(&self, text: &str) {
        self.record(Effect::SpeakToEnd(text.to_owned()));
    }

    async fn set_expression(&self, expression: Expression) {
        self.record(Effect::SetExpression(expression));
    }

    async fn show_image(&self, bytes: Vec<u8>) {
        self.record(Effect::ShowImage(bytes));
    }

    async fn hide_image(&self) {
        self.record(Effect::HideImage);
    }

    async fn set_status(&self, text: &str) {
        self.record(Effect::SetStatus(text.to_owned()));
    }

    async fn notify(&self, notice: Notice) {
        self.record(Effect::Notify(notice));
    }
}

/// Receive the next recorded effect, failing the test after two seconds.
pub async fn next_effect(rx: &mut mpsc::UnboundedReceiver<Effect>) -> Effect {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a collaborator effect")
        .expect("effect channel closed unexpectedly")
}

/// Assert that no further effect arrives within a short settle window.
pub async fn no_more_effects(rx: &mut mpsc::UnboundedReceiver<Effect>) {
    let extra = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    if let Ok(Some(effect)) = extra {
        panic!("unexpected collaborator effect: {effect:?}");
    }
}
