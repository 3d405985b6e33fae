use tabled::{settings::Style, Table, Tabled};

use crate::briefing::Briefing;
use crate::feedback::{Feedback, FeedbackPattern};
use crate::storage::Bookmark;

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    fn new() -> Self {
        Self { rows: Vec::new() }
    }

    fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    fn build(&self) -> String {
        rows_table(&self.rows)
    }
}

pub fn stats_table(stats: &[(&str, String)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// Rounded table, or an empty string when there is nothing to show
pub fn rows_table<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}

#[derive(Tabled)]
pub struct BriefingRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Created")]
    pub created: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Topics")]
    pub topics: String,
    #[tabled(rename = "Cards")]
    pub cards: usize,
}

impl From<&Briefing> for BriefingRow {
    fn from(b: &Briefing) -> Self {
        Self {
            id: b.id,
            created: b.created_at.format("%Y-%m-%d %H:%M").to_string(),
            title: truncate(if b.title.is_empty() { &b.summary } else { &b.title }, 48),
            topics: truncate(&b.topics.join(", "), 32),
            cards: b.cards.len(),
        }
    }
}

#[derive(Tabled)]
pub struct FeedbackRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Card")]
    pub card: String,
    #[tabled(rename = "Rating")]
    pub rating: i64,
    #[tabled(rename = "Reason")]
    pub reason: String,
    #[tabled(rename = "When")]
    pub when: String,
}

impl From<&Feedback> for FeedbackRow {
    fn from(f: &Feedback) -> Self {
        Self {
            id: f.id,
            card: f.card_index.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
            rating: f.rating,
            reason: truncate(f.reason.as_deref().unwrap_or(""), 40),
            when: f.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct PatternRow {
    #[tabled(rename = "Topic")]
    pub topic: String,
    #[tabled(rename = "+")]
    pub positive: i64,
    #[tabled(rename = "-")]
    pub negative: i64,
    #[tabled(rename = "Favorability")]
    pub favorability: String,
    #[tabled(rename = "Updated")]
    pub updated: String,
}

impl From<&FeedbackPattern> for PatternRow {
    fn from(p: &FeedbackPattern) -> Self {
        Self {
            topic: p.topic.clone(),
            positive: p.positive_count,
            negative: p.negative_count,
            favorability: format!("{:+.2}", p.favorability()),
            updated: p.last_updated.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct BookmarkRow {
    #[tabled(rename = "Briefing")]
    pub briefing_id: i64,
    #[tabled(rename = "Card")]
    pub card_index: i64,
    #[tabled(rename = "Saved")]
    pub saved: String,
}

impl From<&Bookmark> for BookmarkRow {
    fn from(b: &Bookmark) -> Self {
        Self {
            briefing_id: b.briefing_id,
            card_index: b.card_index,
            saved: b.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}
