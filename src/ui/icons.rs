pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const SEARCH: &str = "🔍";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const BRAIN: &str = "🧠";
    pub const NEWS: &str = "📰";
    pub const DEL: &str = "🗑️";
    pub const DATABASE: &str = "🗄️";
    pub const GEAR: &str = "⚙️";
    pub const BOOKMARK: &str = "🔖";
    pub const BROOM: &str = "🧹";
    pub const THUMBS_UP: &str = "👍";
    pub const THUMBS_DOWN: &str = "👎";
    pub const NEUTRAL: &str = "➖";
}
