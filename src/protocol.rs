//! Wire protocol for the companion-server link.
//!
//! Lines are UTF-8 and newline-terminated. A server command line is
//! `COMMAND:payload` or a bare `COMMAND`. Only the *first* colon is
//! structurally significant, and a colon at index zero is not treated as a
//! delimiter. Payloads carry embedded newlines as the literal two-character
//! sequence `\n`, unescaped by the receiver before use.

/// Role handshake sent once, immediately after connecting.
///
/// Kept verbatim for wire compatibility with the existing companion server,
/// which routes command broadcasts to clients registered under this role.
pub const ROLE_HANDSHAKE: &str = "ROLE:android";

/// Command token for a simple speech line.
pub const CMD_SAY: &str = "SAY";

/// Command token for story narration with end-of-speech reset.
pub const CMD_SAY_STORY: &str = "SAY_STORY";

/// Command token for a base64-encoded raster image.
pub const CMD_IMAGE_BASE64: &str = "IMAGE_BASE64";

/// A server command token, parsed from the text before the first colon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    /// Speak a line, with sentiment-driven facial expression.
    Say,
    /// Narrate a story, resetting face and illustration when done.
    SayStory,
    /// Display a base64-encoded image.
    ImageBase64,
    /// Any other token; accepted but only produces a generic notification.
    Other(String),
}

impl ServerCommand {
    /// Map a raw command token onto a known command.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            CMD_SAY => Self::Say,
            CMD_SAY_STORY => Self::SayStory,
            CMD_IMAGE_BASE64 => Self::ImageBase64,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Split a raw line into `(command, payload)` at the first colon.
///
/// A leading colon is not a delimiter: the whole line becomes the command
/// with an empty payload, as does a line without any colon.
#[must_use]
pub fn parse_line(line: &str) -> (&str, &str) {
    match line.find(':') {
        Some(idx) if idx > 0 => (&line[..idx], &line[idx + 1..]),
        _ => (line, ""),
    }
}

/// Replace embedded newlines with the two-character wire escape so that a
/// payload never spans multiple transmitted lines.
#[must_use]
pub fn escape_newlines(text: &str) -> String {
    text.replace('\n', "\\n")
}

/// Reverse of [`escape_newlines`]: restore embedded newlines in a payload.
#[must_use]
pub fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    // ── parse_line ──────────────────────────────────────────────────────

    #[test]
    fn splits_at_first_colon() {
        assert_eq!(parse_line("SAY:hello"), ("SAY", "hello"));
    }

    #[test]
    fn bare_command_has_empty_payload() {
        assert_eq!(parse_line("SAY"), ("SAY", ""));
    }

    #[test]
    fn leading_colon_is_not_a_delimiter() {
        assert_eq!(parse_line(":oops"), (":oops", ""));
    }

    #[test]
    fn empty_line_parses_to_empty_pair() {
        assert_eq!(parse_line(""), ("", ""));
    }

    #[test]
    fn only_first_colon_is_structural() {
        assert_eq!(
            parse_line("SAY:it is 10:30 now"),
            ("SAY", "it is 10:30 now")
        );
    }

    #[test]
    fn image_payload_keeps_base64_padding() {
        assert_eq!(parse_line("IMAGE_BASE64:aGk="), ("IMAGE_BASE64", "aGk="));
    }

    // ── ServerCommand ───────────────────────────────────────────────────

    #[test]
    fn known_tokens_map_to_commands() {
        assert_eq!(ServerCommand::from_token("SAY"), ServerCommand::Say);
        assert_eq!(
            ServerCommand::from_token("SAY_STORY"),
            ServerCommand::SayStory
        );
        assert_eq!(
            ServerCommand::from_token("IMAGE_BASE64"),
            ServerCommand::ImageBase64
        );
    }

    #[test]
    fn unknown_token_is_preserved() {
        assert_eq!(
            ServerCommand::from_token("DANCE"),
            ServerCommand::Other("DANCE".to_owned())
        );
    }

    #[test]
    fn command_matching_is_case_sensitive() {
        assert_eq!(
            ServerCommand::from_token("say"),
            ServerCommand::Other("say".to_owned())
        );
    }

    // ── Escaping ────────────────────────────────────────────────────────

    #[test]
    fn escape_removes_real_newlines() {
        let escaped = escape_newlines("line one\nline two");
        assert!(!escaped.contains('\n'));
        assert_eq!(escaped, "line one\\nline two");
    }

    #[test]
    fn unescape_restores_newlines() {
        assert_eq!(unescape_newlines("line one\\nline two"), "line one\nline two");
    }

    #[test]
    fn escape_unescape_round_trips() {
        for text in [
            "",
            "plain",
            "one\ntwo",
            "\nleading",
            "trailing\n",
            "\n\n",
            "a\nb\nc",
        ] {
            assert_eq!(unescape_newlines(&escape_newlines(text)), text);
        }
    }

    #[test]
    fn handshake_is_a_parsable_line() {
        assert_eq!(parse_line(ROLE_HANDSHAKE), ("ROLE", "android"));
    }
}
