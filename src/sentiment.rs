//! Keyword mood scan for server speech lines.
//!
//! The companion server annotates its replies with sentiment words
//! ("positive", "negative", "undecided"); the scan maps them onto one of
//! the robot face's three expressions. An "undecided" marker wins over
//! either polarity when both appear in the same line.

/// Facial expression the robot face can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expression {
    /// Smiling face, shown for positive sentiment.
    Happy,
    /// Sad face, shown for negative sentiment.
    Sad,
    /// Resting face, shown otherwise.
    Neutral,
}

/// Detected mood of a speech line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Positive,
    Negative,
    /// The server flagged the reply as undecided; the client speaks a fixed
    /// fallback line instead of the payload.
    Undecided,
    /// No sentiment keyword present.
    Unclassified,
}

impl Mood {
    /// Expression shown for this mood.
    #[must_use]
    pub fn expression(self) -> Expression {
        match self {
            Self::Positive => Expression::Happy,
            Self::Negative => Expression::Sad,
            Self::Undecided | Self::Unclassified => Expression::Neutral,
        }
    }
}

/// Classify the mood of an unescaped, trimmed speech line.
///
/// Case-insensitive substring match, checked in precedence order:
/// undecided, then positive, then negative.
#[must_use]
pub fn classify(text: &str) -> Mood {
    let lower = text.to_lowercase();
    if lower.contains("undecided") {
        return Mood::Undecided;
    }
    if lower.contains("positive") {
        return Mood::Positive;
    }
    if lower.contains("negative") {
        return Mood::Negative;
    }
    Mood::Unclassified
}
