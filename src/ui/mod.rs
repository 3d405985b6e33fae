pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    banner, dim, error, header, info, muted, section, sentiment_icon, status, success, summary_row,
    warn,
};
pub use table::{rows_table, stats_table, BookmarkRow, BriefingRow, FeedbackRow, PatternRow};
pub use theme::{theme, Theme};
