//! buddy-link: socket protocol client for the Buddy companion server.
//!
//! The client opens a persistent TCP connection to a companion process,
//! announces its role, and listens on a background task for
//! newline-terminated `COMMAND:payload` messages, which it dispatches to a
//! pluggable [`Collaborator`] (speech, facial expression, image display,
//! status). Outbound lines from the embedding shell are serialized through
//! a single writer so concurrent sends never interleave.
//!
//! # Architecture
//!
//! - **Session** — actor owning the connection lifecycle and the single
//!   writer; a dropped connection is repaired lazily on the next send.
//! - **Listener** — one background task per open session, parked in
//!   `read_line`, feeding the dispatcher through a queue.
//! - **Dispatcher** — maps `SAY` / `SAY_STORY` / `IMAGE_BASE64` lines to
//!   collaborator effects; houses the sentiment-to-expression policy.
//! - **Collaborator** — the embedding shell's rendering seam.

pub mod collaborator;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod sentiment;
pub mod session;

#[cfg(test)]
mod test_support;

pub use collaborator::{Collaborator, NoopCollaborator, Notice};
pub use config::{Endpoint, LinkConfig};
pub use dispatch::{Dispatcher, DispatcherConfig};
pub use error::{LinkError, Result};
pub use sentiment::{Expression, Mood};
pub use session::{ConnState, Session};
