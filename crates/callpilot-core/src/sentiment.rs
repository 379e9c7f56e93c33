//! Coarse three-way sentiment classification shared by the LLM scorer,
//! the database layer, and the analytics rollups.

use serde::{Deserialize, Serialize};

/// Score at or above which a call is classified as positive.
pub const POSITIVE_THRESHOLD: i32 = 70;
/// Score at or above which a call is classified as neutral.
pub const NEUTRAL_THRESHOLD: i32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Derive a label from a 0–100 sentiment score.
    #[must_use]
    pub fn from_score(score: i32) -> Self {
        if score >= POSITIVE_THRESHOLD {
            Self::Positive
        } else if score >= NEUTRAL_THRESHOLD {
            Self::Neutral
        } else {
            Self::Negative
        }
    }

    /// Parse one of the three allowed labels, ignoring case and surrounding
    /// whitespace. Anything else yields `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_score_uses_thresholds() {
        assert_eq!(SentimentLabel::from_score(100), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(70), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(69), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(40), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(39), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(0), SentimentLabel::Negative);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(
            SentimentLabel::parse(" Positive "),
            Some(SentimentLabel::Positive)
        );
        assert_eq!(SentimentLabel::parse("NEGATIVE"), Some(SentimentLabel::Negative));
        assert_eq!(SentimentLabel::parse("mixed"), None);
        assert_eq!(SentimentLabel::parse(""), None);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&SentimentLabel::Neutral).unwrap();
        assert_eq!(json, "\"neutral\"");
    }
}
