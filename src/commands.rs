use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use briefly::briefing::CreateBriefing;
use briefly::config::{self, BrieflyConfig};
use briefly::export::{self, ExportFormat};
use briefly::feedback::NewFeedback;
use briefly::housekeeping::{self, NEVER_DELETE_REASON};
use briefly::output::{OutputMode, emit_success};
use briefly::ui::{
    self, banner, dim, header, info, muted, section, sentiment_icon, stats_table, status, success,
    warn, BookmarkRow, BriefingRow, FeedbackRow, Icons, PatternRow,
};
use briefly::{store, Briefing, Database};
use owo_colors::OwoColorize;
use serde::Deserialize;

use crate::{BookmarkAction, BriefingAction, Commands, FeedbackAction, HousekeepingAction};

/// Resolved settings for one invocation
pub struct Context {
    pub mode: OutputMode,
    pub config: BrieflyConfig,
    pub config_path: PathBuf,
    pub database: PathBuf,
}

impl Context {
    pub fn load(
        mode: OutputMode,
        config_path: Option<PathBuf>,
        database_flag: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let config_path = config_path.unwrap_or_else(config::default_config_path);
        let config = config::load_config(Some(config_path.as_path()))?.unwrap_or_default();
        let base = std::env::current_dir()?;
        let database = config.resolve_database(database_flag.as_deref(), &base);

        Ok(Self {
            mode,
            config,
            config_path,
            database,
        })
    }

    /// Install the process-wide handle on the configured file and apply the
    /// configured retention. Cleanup failures are logged and do not stop the command.
    fn open(&self) -> anyhow::Result<()> {
        let db = self.open_without_cleanup()?;
        if let Some(result) = housekeeping::run_startup_cleanup(&db, self.config.retention_days) {
            if result.deleted_count > 0 && self.mode.is_human() {
                info(
                    "Housekeeping",
                    &format!("removed {} expired briefing(s)", result.deleted_count),
                );
            }
        }
        Ok(())
    }

    /// Install the handle only; `housekeeping` reports its own cleanup
    fn open_without_cleanup(&self) -> anyhow::Result<Arc<Database>> {
        config::ensure_db_dir(&self.database)?;
        let db = briefly::init_database(Some(self.database.as_path()))
            .with_context(|| format!("opening {}", self.database.display()))?;
        Ok(db)
    }
}

pub fn dispatch(ctx: &Context, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init {
            force,
            retention_days,
        } => run_init(ctx, force, retention_days),
        Commands::Version => run_version(ctx.mode),
        Commands::Briefings { action } => {
            ctx.open()?;
            run_briefings(ctx, action)
        }
        Commands::Feedback { action } => {
            ctx.open()?;
            run_feedback(ctx, action)
        }
        Commands::Bookmarks { action } => {
            ctx.open()?;
            run_bookmarks(ctx, action)
        }
        Commands::Housekeeping { action } => {
            ctx.open_without_cleanup()?;
            run_housekeeping(ctx, action)
        }
        Commands::Stats => {
            ctx.open()?;
            run_stats(ctx)
        }
    }
}

pub fn run_version(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        banner(
            &format!("{}", "Briefly".bold().style(ui::theme().info.clone())),
            &format!("Version {}", env!("CARGO_PKG_VERSION").bold()),
        );
    } else {
        let data = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        });
        emit_success(output_mode, "version", data)?;
    }
    Ok(())
}

pub fn run_init(ctx: &Context, force: bool, retention_days: Option<i64>) -> anyhow::Result<()> {
    if let Some(days) = retention_days {
        if days < 1 {
            anyhow::bail!("--retention-days must be at least 1");
        }
    }

    let config = BrieflyConfig {
        database: Some(ctx.database.display().to_string()),
        retention_days: retention_days.or(ctx.config.retention_days),
    };
    config::write_config(&ctx.config_path, &config, force)?;
    ctx.open_without_cleanup()?;

    if ctx.mode.is_human() {
        banner(
            &format!("{}", "Briefly".bold().style(ui::theme().info.clone())),
            "Initialized briefing store",
        );
        status(Icons::GEAR, "Config", &ctx.config_path.display().to_string());
        status(Icons::DATABASE, "Database", &ctx.database.display().to_string());
        status(Icons::BROOM, "Retention", &describe_retention(config.retention_days));
    } else {
        emit_success(
            ctx.mode,
            "init",
            serde_json::json!({
                "config": ctx.config_path,
                "database": ctx.database,
                "retention_days": config.retention_days,
            }),
        )?;
    }
    Ok(())
}

fn describe_retention(days: Option<i64>) -> String {
    match days {
        Some(days) => format!("{} days", days),
        None => "never delete".to_string(),
    }
}

// ========== Briefings ==========

/// A single briefing or a batch, as accepted by `briefings import`
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Many(Vec<CreateBriefing>),
    One(CreateBriefing),
}

pub fn run_briefings(ctx: &Context, action: BriefingAction) -> anyhow::Result<()> {
    match action {
        BriefingAction::List { days } => {
            let briefings = match days {
                Some(days) => store::get_briefings_by_date(days)?,
                None => store::get_all_briefings()?,
            };
            if ctx.mode.is_human() {
                header(&format!("{} briefing(s)", briefings.len()));
                print_briefing_table(&briefings);
            } else {
                emit_success(ctx.mode, "briefings.list", &briefings)?;
            }
        }

        BriefingAction::Show { id } => {
            let briefing = require_briefing(id)?;
            if ctx.mode.is_human() {
                print_briefing(&briefing);
            } else {
                emit_success(ctx.mode, "briefings.show", &briefing)?;
            }
        }

        BriefingAction::Search { query } => {
            let results = store::search_briefings(&query)?;
            if ctx.mode.is_human() {
                header(&format!("{} Search: '{}'", Icons::SEARCH, query));
                print_briefing_table(&results);
            } else {
                emit_success(ctx.mode, "briefings.search", &results)?;
            }
        }

        BriefingAction::Delete { id } => {
            let deleted = store::delete_briefing(id)?;
            if ctx.mode.is_human() {
                if deleted > 0 {
                    success(&format!("Deleted briefing {}", id));
                } else {
                    warn(&format!("Briefing {} not found", id));
                }
            } else {
                emit_success(ctx.mode, "briefings.delete", serde_json::json!({ "id": id, "deleted": deleted }))?;
            }
        }

        BriefingAction::Import { file } => {
            let imported = import_briefings(&file)?;
            if ctx.mode.is_human() {
                success(&format!("Imported {} briefing(s) from {}", imported.len(), file.display()));
                print_briefing_table(&imported);
            } else {
                emit_success(ctx.mode, "briefings.import", &imported)?;
            }
        }

        BriefingAction::Export { id, format } => {
            let format: ExportFormat = format.parse()?;
            let briefing = require_briefing(id)?;
            let rendered = export::render(&briefing, format)?;
            if ctx.mode.is_human() {
                println!("{}", rendered);
            } else {
                emit_success(
                    ctx.mode,
                    "briefings.export",
                    serde_json::json!({ "id": id, "content": rendered }),
                )?;
            }
        }
    }
    Ok(())
}

fn require_briefing(id: i64) -> anyhow::Result<Briefing> {
    match store::get_briefing(id)? {
        Some(briefing) => Ok(briefing),
        None => anyhow::bail!("Briefing {} not found", id),
    }
}

fn import_briefings(file: &Path) -> anyhow::Result<Vec<Briefing>> {
    let raw = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let payload: ImportPayload =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;
    let batch = match payload {
        ImportPayload::Many(batch) => batch,
        ImportPayload::One(single) => vec![single],
    };

    // one transaction: a bad entry or a failed write imports nothing
    let imported = store::create_briefings(&batch)
        .with_context(|| format!("importing {}", file.display()))?;
    Ok(imported)
}

fn print_briefing_table(briefings: &[Briefing]) {
    if briefings.is_empty() {
        println!("{}", muted("No briefings found."));
        return;
    }
    let rows: Vec<BriefingRow> = briefings.iter().map(BriefingRow::from).collect();
    println!("{}", ui::rows_table(&rows));
}

fn print_briefing(briefing: &Briefing) {
    let title = if briefing.title.is_empty() { "(untitled)" } else { briefing.title.as_str() };
    header(&format!("{} #{} {}", Icons::NEWS, briefing.id, title));
    info("Created", &briefing.created_at.format("%Y-%m-%d %H:%M UTC").to_string());
    let topics: Vec<String> = briefing
        .topics
        .iter()
        .map(|t| t.style(ui::theme().topic.clone()).to_string())
        .collect();
    info("Topics", &topics.join(", "));
    if let Some(model) = &briefing.model_used {
        info("Model", model);
    }
    println!();
    println!("{}", briefing.summary);

    for card in &briefing.cards {
        section(&format!(" {}. {} ", card.card_index, card.title));
        if !card.topic.is_empty() {
            println!("{}", dim(&card.topic));
        }
        println!("{}", card.summary);
        if let Some(next) = &card.suggested_next {
            println!("{} {}", Icons::BRAIN, next);
        }
    }

    if !briefing.sources.is_empty() {
        section(" Sources ");
        for source in &briefing.sources {
            let label = source.title.as_deref().unwrap_or(&source.url);
            println!("  - {} {}", label, muted(&format!("[{}] {}", source.kind, source.url)));
        }
    }
}

// ========== Feedback ==========

pub fn run_feedback(ctx: &Context, action: FeedbackAction) -> anyhow::Result<()> {
    match action {
        FeedbackAction::Add {
            briefing,
            card,
            rating,
            reason,
        } => {
            let mut data = NewFeedback::new(briefing, rating);
            data.card_index = card;
            data.reason = reason;

            let recorded = store::record_feedback(&data)?;
            if ctx.mode.is_human() {
                let target = match recorded.feedback.card_index {
                    Some(card) => format!("card {} of briefing {}", card, briefing),
                    None => format!("briefing {}", briefing),
                };
                success(&format!(
                    "{} Recorded rating {} for {}",
                    sentiment_icon(recorded.feedback.sentiment()),
                    rating,
                    target
                ));
                for pattern in &recorded.patterns {
                    ui::summary_row(
                        &pattern.topic,
                        &format!("+{} / -{}", pattern.positive_count, pattern.negative_count),
                    );
                }
            } else {
                emit_success(ctx.mode, "feedback.add", &recorded)?;
            }
        }

        FeedbackAction::List { briefing_id } => {
            let feedback = store::get_feedback_for_briefing(briefing_id)?;
            if ctx.mode.is_human() {
                header(&format!("Feedback for briefing {}", briefing_id));
                if feedback.is_empty() {
                    println!("{}", muted("No feedback yet."));
                } else {
                    let rows: Vec<FeedbackRow> = feedback.iter().map(FeedbackRow::from).collect();
                    println!("{}", ui::rows_table(&rows));
                }
            } else {
                emit_success(ctx.mode, "feedback.list", &feedback)?;
            }
        }

        FeedbackAction::Clear { briefing_id } => {
            let deleted = store::delete_feedback_for_briefing(briefing_id)?;
            if ctx.mode.is_human() {
                success(&format!("Deleted {} feedback row(s) for briefing {}", deleted, briefing_id));
            } else {
                emit_success(
                    ctx.mode,
                    "feedback.clear",
                    serde_json::json!({ "briefing_id": briefing_id, "deleted": deleted }),
                )?;
            }
        }

        FeedbackAction::Stats => {
            let stats = store::get_feedback_stats()?;
            if ctx.mode.is_human() {
                header(&format!("{} Feedback", Icons::STATS));
                println!(
                    "{}",
                    stats_table(&[
                        ("Total", stats.total.to_string()),
                        ("Positive", stats.positive.to_string()),
                        ("Negative", stats.negative.to_string()),
                        ("Neutral", stats.neutral.to_string()),
                    ])
                );
            } else {
                emit_success(ctx.mode, "feedback.stats", stats)?;
            }
        }

        FeedbackAction::Patterns => {
            let patterns = store::get_feedback_patterns()?;
            if ctx.mode.is_human() {
                header(&format!("{} Topic patterns", Icons::BRAIN));
                if patterns.is_empty() {
                    println!("{}", muted("No patterns learned yet."));
                } else {
                    let rows: Vec<PatternRow> = patterns.iter().map(PatternRow::from).collect();
                    println!("{}", ui::rows_table(&rows));
                }
            } else {
                emit_success(ctx.mode, "feedback.patterns", &patterns)?;
            }
        }

        FeedbackAction::Pattern { topic } => {
            let pattern = store::get_feedback_pattern(&topic)?;
            if ctx.mode.is_human() {
                match &pattern {
                    Some(p) => {
                        header(&format!("Pattern '{}'", p.topic));
                        ui::summary_row("Positive", &p.positive_count.to_string());
                        ui::summary_row("Negative", &p.negative_count.to_string());
                        ui::summary_row("Favorability", &format!("{:+.2}", p.favorability()));
                        ui::summary_row("Updated", &p.last_updated.to_rfc3339());
                    }
                    None => warn(&format!("No pattern for topic '{}'", topic)),
                }
            } else {
                emit_success(ctx.mode, "feedback.pattern", &pattern)?;
            }
        }

        FeedbackAction::Reset { topic } => {
            let reset = store::reset_feedback_pattern(&topic)?;
            if ctx.mode.is_human() {
                if reset {
                    success(&format!("Reset pattern '{}'", topic.trim()));
                } else {
                    warn(&format!("No pattern for topic '{}'", topic.trim()));
                }
            } else {
                emit_success(ctx.mode, "feedback.reset", serde_json::json!({ "topic": topic.trim(), "reset": reset }))?;
            }
        }
    }
    Ok(())
}

// ========== Bookmarks ==========

pub fn run_bookmarks(ctx: &Context, action: BookmarkAction) -> anyhow::Result<()> {
    match action {
        BookmarkAction::Toggle { briefing, card } => {
            let bookmarked = store::toggle_bookmark(briefing, card)?;
            if ctx.mode.is_human() {
                let verb = if bookmarked { "Bookmarked" } else { "Removed bookmark on" };
                success(&format!("{} {} card {} of briefing {}", Icons::BOOKMARK, verb, card, briefing));
            } else {
                emit_success(
                    ctx.mode,
                    "bookmarks.toggle",
                    serde_json::json!({ "briefing_id": briefing, "card_index": card, "bookmarked": bookmarked }),
                )?;
            }
        }

        BookmarkAction::List => {
            let bookmarks = store::get_all_bookmarks()?;
            if ctx.mode.is_human() {
                header(&format!("{} {} bookmark(s)", Icons::BOOKMARK, bookmarks.len()));
                let rows: Vec<BookmarkRow> = bookmarks.iter().map(BookmarkRow::from).collect();
                if rows.is_empty() {
                    println!("{}", muted("No bookmarks yet."));
                } else {
                    println!("{}", ui::rows_table(&rows));
                }
            } else {
                emit_success(ctx.mode, "bookmarks.list", &bookmarks)?;
            }
        }
    }
    Ok(())
}

// ========== Housekeeping ==========

pub fn run_housekeeping(ctx: &Context, action: HousekeepingAction) -> anyhow::Result<()> {
    let db = briefly::get_database()?;

    match action {
        HousekeepingAction::Run { days, dry_run } => {
            let retention = days.or(ctx.config.retention_days);

            if dry_run {
                let candidates = match retention {
                    Some(days) => Some(housekeeping::count_cleanup_candidates(&db, days)?),
                    None => None,
                };
                if ctx.mode.is_human() {
                    match candidates {
                        Some(n) => info("Would delete", &format!("{} briefing(s)", n)),
                        None => info("Skipped", NEVER_DELETE_REASON),
                    }
                } else {
                    emit_success(
                        ctx.mode,
                        "housekeeping.run",
                        serde_json::json!({ "dry_run": true, "retention_days": retention, "candidates": candidates }),
                    )?;
                }
                return Ok(());
            }

            let result = housekeeping::run_cleanup(&db, retention)?;
            if ctx.mode.is_human() {
                match &result.skipped_reason {
                    Some(reason) => info("Skipped", reason),
                    None => success(&format!(
                        "{} Deleted {} briefing(s), {} remaining",
                        Icons::BROOM,
                        result.deleted_count,
                        result.remaining_count
                    )),
                }
            } else {
                emit_success(ctx.mode, "housekeeping.run", &result)?;
            }
        }

        HousekeepingAction::Status => {
            let retention = ctx.config.retention_days;
            let candidates = match retention {
                Some(days) => Some(housekeeping::count_cleanup_candidates(&db, days)?),
                None => None,
            };
            let total = db.count_briefings()?;

            if ctx.mode.is_human() {
                header(&format!("{} Housekeeping", Icons::BROOM));
                ui::summary_row("Retention", &describe_retention(retention));
                ui::summary_row("Briefings", &total.to_string());
                if let Some(n) = candidates {
                    ui::summary_row("Due for cleanup", &n.to_string());
                }
            } else {
                emit_success(
                    ctx.mode,
                    "housekeeping.status",
                    serde_json::json!({ "retention_days": retention, "briefings": total, "candidates": candidates }),
                )?;
            }
        }
    }
    Ok(())
}

// ========== Stats ==========

pub fn run_stats(ctx: &Context) -> anyhow::Result<()> {
    let db = briefly::get_database()?;
    let stats = db.stats()?;
    let feedback = store::get_feedback_stats()?;

    if ctx.mode.is_human() {
        header(&format!("{} Briefly Statistics", Icons::STATS));
        status(Icons::DATABASE, "Database", &ctx.database.display().to_string());
        println!(
            "{}",
            stats_table(&[
                ("Briefings", stats.briefings.to_string()),
                ("Cards", stats.cards.to_string()),
                ("Sources", stats.sources.to_string()),
                ("Feedback", stats.feedback.to_string()),
                ("Topic patterns", stats.patterns.to_string()),
                ("Bookmarks", stats.bookmarks.to_string()),
            ])
        );
        ui::summary_row(
            "Ratings",
            &format!(
                "{} {}  {} {}  {} {}",
                Icons::THUMBS_UP,
                feedback.positive,
                Icons::THUMBS_DOWN,
                feedback.negative,
                Icons::NEUTRAL,
                feedback.neutral
            ),
        );
    } else {
        emit_success(
            ctx.mode,
            "stats",
            serde_json::json!({ "database": ctx.database, "store": stats, "feedback": feedback }),
        )?;
    }
    Ok(())
}
