//! Briefing types - generated research artifacts
//!
//! A briefing is made of:
//! - a header (title, topics, summary, run metadata)
//! - ordered `BriefingCard`s, one per topic/insight segment
//! - `Source` citations backing the briefing

use crate::{Error, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Type tag for a source citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// General web page
    #[default]
    Web,
    /// Academic paper or preprint
    Paper,
    /// News article
    News,
    /// Code repository
    Repository,
    /// Anything else
    Other,
}

impl SourceKind {
    /// Get the string representation of the source kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Web => "web",
            SourceKind::Paper => "paper",
            SourceKind::News => "news",
            SourceKind::Repository => "repository",
            SourceKind::Other => "other",
        }
    }

    /// Get all source kinds
    pub fn all() -> &'static [SourceKind] {
        &[
            SourceKind::Web,
            SourceKind::Paper,
            SourceKind::News,
            SourceKind::Repository,
            SourceKind::Other,
        ]
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "web" | "url" | "page" | "website" => Ok(SourceKind::Web),
            "paper" | "arxiv" | "journal" | "preprint" => Ok(SourceKind::Paper),
            "news" | "article" => Ok(SourceKind::News),
            "repository" | "repo" | "github" | "code" => Ok(SourceKind::Repository),
            "other" => Ok(SourceKind::Other),
            _ => Err(Error::Validation(format!("Unknown source kind: {}", s))),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One topic/insight segment of a briefing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingCard {
    pub id: i64,
    pub briefing_id: i64,
    /// Zero-based position within the parent briefing
    pub card_index: i64,
    pub title: String,
    pub topic: String,
    pub summary: String,
    pub detailed_content: Option<String>,
    pub relevance: Option<String>,
    pub suggested_next: Option<String>,
}

/// A citation attached to a briefing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub briefing_id: i64,
    pub kind: SourceKind,
    pub url: String,
    pub title: Option<String>,
}

/// A stored briefing with its cards and sources populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Briefing {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub topics: Vec<String>,
    pub summary: String,
    pub model_used: Option<String>,
    pub research_time_ms: Option<i64>,
    pub total_tokens: Option<i64>,
    /// Ordered by `card_index` ascending
    pub cards: Vec<BriefingCard>,
    pub sources: Vec<Source>,
}

/// Card payload for `CreateBriefing`. Its index is its position in the list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCard {
    pub title: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub detailed_content: Option<String>,
    #[serde(default)]
    pub relevance: Option<String>,
    #[serde(default)]
    pub suggested_next: Option<String>,
}

impl NewCard {
    pub fn new(title: impl Into<String>, topic: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            topic: topic.into(),
            summary: summary.into(),
            ..Default::default()
        }
    }
}

/// Source payload for `CreateBriefing`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSource {
    #[serde(default)]
    pub kind: SourceKind,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl NewSource {
    pub fn new(kind: SourceKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            title: None,
        }
    }
}

/// Everything needed to create a briefing in one call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBriefing {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub cards: Vec<NewCard>,
    #[serde(default)]
    pub sources: Vec<NewSource>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub research_time_ms: Option<i64>,
    #[serde(default)]
    pub total_tokens: Option<i64>,
    /// Defaults to the time of insertion
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl CreateBriefing {
    /// Create a payload with the required fields set
    pub fn new(topics: Vec<String>, summary: impl Into<String>) -> Self {
        Self {
            topics,
            summary: summary.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_card(mut self, card: NewCard) -> Self {
        self.cards.push(card);
        self
    }

    pub fn with_source(mut self, source: NewSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Topics with surrounding whitespace removed and blanks dropped
    pub fn normalized_topics(&self) -> Vec<String> {
        self.topics
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Check required fields before anything is written
    pub fn validate(&self) -> Result<()> {
        if self.normalized_topics().is_empty() {
            return Err(Error::Validation("briefing requires at least one topic".to_string()));
        }
        if self.summary.trim().is_empty() {
            return Err(Error::Validation("briefing requires a summary".to_string()));
        }
        for (index, card) in self.cards.iter().enumerate() {
            if card.title.trim().is_empty() {
                return Err(Error::Validation(format!("card {} requires a title", index)));
            }
        }
        for (index, source) in self.sources.iter().enumerate() {
            if source.url.trim().is_empty() {
                return Err(Error::Validation(format!("source {} requires a url", index)));
            }
        }
        // stored timestamps must keep a four-digit year to sort as text
        if let Some(created_at) = self.created_at {
            if !(0..=9999).contains(&created_at.year()) {
                return Err(Error::Validation(format!(
                    "created_at {} is outside years 0000-9999",
                    created_at
                )));
            }
        }
        Ok(())
    }
}
