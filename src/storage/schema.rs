//! Database schema definitions

/// SQL to create the briefings table
/// `topics` holds a JSON array of strings
pub const CREATE_BRIEFINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS briefings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    topics TEXT NOT NULL,
    summary TEXT NOT NULL,
    model_used TEXT,
    research_time_ms INTEGER,
    total_tokens INTEGER
)
"#;

/// SQL to create the briefing_cards table
pub const CREATE_BRIEFING_CARDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS briefing_cards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    briefing_id INTEGER NOT NULL REFERENCES briefings(id) ON DELETE CASCADE,
    card_index INTEGER NOT NULL,
    title TEXT NOT NULL,
    topic TEXT NOT NULL DEFAULT '',
    summary TEXT NOT NULL DEFAULT '',
    detailed_content TEXT,
    relevance TEXT,
    suggested_next TEXT,
    UNIQUE(briefing_id, card_index)
)
"#;

/// SQL to create the sources table
pub const CREATE_SOURCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    briefing_id INTEGER NOT NULL REFERENCES briefings(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT
)
"#;

/// SQL to create the feedback table
/// A NULL card_index rates the whole briefing
pub const CREATE_FEEDBACK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    briefing_id INTEGER NOT NULL REFERENCES briefings(id) ON DELETE CASCADE,
    card_index INTEGER,
    rating INTEGER NOT NULL,
    reason TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (briefing_id, card_index) REFERENCES briefing_cards(briefing_id, card_index) ON DELETE CASCADE
)
"#;

/// SQL to create the feedback_patterns table
pub const CREATE_FEEDBACK_PATTERNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS feedback_patterns (
    topic TEXT PRIMARY KEY,
    positive_count INTEGER NOT NULL DEFAULT 0 CHECK (positive_count >= 0),
    negative_count INTEGER NOT NULL DEFAULT 0 CHECK (negative_count >= 0),
    last_updated TEXT NOT NULL
)
"#;

/// SQL to create the bookmarks table
pub const CREATE_BOOKMARKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS bookmarks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    briefing_id INTEGER NOT NULL REFERENCES briefings(id) ON DELETE CASCADE,
    card_index INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(briefing_id, card_index)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_briefings_created_at ON briefings(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_cards_briefing ON briefing_cards(briefing_id)",
    "CREATE INDEX IF NOT EXISTS idx_sources_briefing ON sources(briefing_id)",
    "CREATE INDEX IF NOT EXISTS idx_feedback_briefing ON feedback(briefing_id)",
    "CREATE INDEX IF NOT EXISTS idx_feedback_patterns_topic ON feedback_patterns(topic)",
    "CREATE INDEX IF NOT EXISTS idx_bookmarks_briefing ON bookmarks(briefing_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_BRIEFINGS_TABLE,
        CREATE_BRIEFING_CARDS_TABLE,
        CREATE_SOURCES_TABLE,
        CREATE_FEEDBACK_TABLE,
        CREATE_FEEDBACK_PATTERNS_TABLE,
        CREATE_BOOKMARKS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
