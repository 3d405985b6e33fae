//! Feedback types - rating events and the per-topic learned signal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn from_rating(rating: i64) -> Self {
        match rating.signum() {
            1 => Sentiment::Positive,
            -1 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single rating event against a briefing or one of its cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub briefing_id: i64,
    /// `None` rates the whole briefing
    pub card_index: Option<i64>,
    pub rating: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn sentiment(&self) -> Sentiment {
        Sentiment::from_rating(self.rating)
    }
}

/// Payload for recording feedback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewFeedback {
    pub briefing_id: i64,
    #[serde(default)]
    pub card_index: Option<i64>,
    pub rating: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

impl NewFeedback {
    pub fn new(briefing_id: i64, rating: i64) -> Self {
        Self {
            briefing_id,
            rating,
            ..Default::default()
        }
    }

    pub fn for_card(mut self, card_index: i64) -> Self {
        self.card_index = Some(card_index);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Running tally of positive/negative feedback for one topic.
///
/// Counters never decay and are never capped; they only grow through
/// `Database::update_feedback_pattern` or go back to zero on an explicit reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackPattern {
    pub topic: String,
    pub positive_count: i64,
    pub negative_count: i64,
    pub last_updated: DateTime<Utc>,
}

impl FeedbackPattern {
    /// Total engagement, the primary sort key for pattern listings
    pub fn engagement(&self) -> i64 {
        self.positive_count + self.negative_count
    }

    /// Net favorability in [-1.0, 1.0]; 0.0 without engagement
    pub fn favorability(&self) -> f64 {
        let total = self.engagement();
        if total == 0 {
            return 0.0;
        }
        (self.positive_count - self.negative_count) as f64 / total as f64
    }
}

/// Aggregate counts across all feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total: i64,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
}

impl std::fmt::Display for FeedbackStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Feedback Statistics:")?;
        writeln!(f, "  Total: {}", self.total)?;
        writeln!(f, "  Positive: {}", self.positive)?;
        writeln!(f, "  Negative: {}", self.negative)?;
        writeln!(f, "  Neutral: {}", self.neutral)
    }
}

/// Outcome of `Database::record_feedback`: the stored row plus the patterns it touched.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedFeedback {
    pub feedback: Feedback,
    pub patterns: Vec<FeedbackPattern>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(positive: i64, negative: i64) -> FeedbackPattern {
        FeedbackPattern {
            topic: "rust".to_string(),
            positive_count: positive,
            negative_count: negative,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_sentiment_from_rating() {
        assert_eq!(Sentiment::from_rating(5), Sentiment::Positive);
        assert_eq!(Sentiment::from_rating(-2), Sentiment::Negative);
        assert_eq!(Sentiment::from_rating(0), Sentiment::Neutral);
    }

    #[test]
    fn test_favorability() {
        assert_eq!(pattern(0, 0).favorability(), 0.0);
        assert_eq!(pattern(3, 1).favorability(), 0.5);
        assert_eq!(pattern(0, 4).favorability(), -1.0);
        assert_eq!(pattern(3, 1).engagement(), 4);
    }
}
