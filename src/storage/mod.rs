//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - briefings(id, created_at, title, topics, summary, ...)
//! - briefing_cards(briefing_id, card_index, title, topic, summary, ...)
//! - sources(briefing_id, kind, url, title)
//! - feedback(briefing_id, card_index, rating, reason, created_at)
//! - feedback_patterns(topic, positive_count, negative_count, last_updated)
//! - bookmarks(briefing_id, card_index, created_at)

pub mod schema;
pub mod sqlite;
mod briefings;
mod feedback;
mod bookmarks;

pub use bookmarks::Bookmark;
pub use sqlite::{Database, DbStats};
