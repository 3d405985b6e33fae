//! Rendering a stored briefing for export

use std::fmt::Write as _;
use std::str::FromStr;

use crate::briefing::Briefing;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Markdown,
    Json,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            _ => Err(Error::Validation(format!(
                "Unknown export format: {} (expected markdown or json)",
                s
            ))),
        }
    }
}

pub fn render(briefing: &Briefing, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Markdown => Ok(to_markdown(briefing)),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(briefing)?),
    }
}

pub fn to_markdown(briefing: &Briefing) -> String {
    let mut out = String::new();
    let title = if briefing.title.trim().is_empty() {
        briefing.topics.join(", ")
    } else {
        briefing.title.clone()
    };

    // writing into a String cannot fail
    let _ = writeln!(out, "# {}\n", title);
    let _ = writeln!(out, "*{}*\n", briefing.created_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "{}\n", briefing.summary);

    for card in &briefing.cards {
        let _ = writeln!(out, "## {}\n", card.title);
        if !card.topic.is_empty() {
            let _ = writeln!(out, "**Topic:** {}\n", card.topic);
        }
        if !card.summary.is_empty() {
            let _ = writeln!(out, "{}\n", card.summary);
        }
        if let Some(details) = card.detailed_content.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "### Details\n\n{}\n", details);
        }
        if let Some(relevance) = card.relevance.as_deref().filter(|r| !r.is_empty()) {
            let _ = writeln!(out, "**Why it matters:** {}\n", relevance);
        }
        if let Some(next) = card.suggested_next.as_deref().filter(|n| !n.is_empty()) {
            let _ = writeln!(out, "**Next:** {}\n", next);
        }
        out.push_str("---\n\n");
    }

    if !briefing.sources.is_empty() {
        out.push_str("## Sources\n\n");
        for source in &briefing.sources {
            match &source.title {
                Some(title) => {
                    let _ = writeln!(out, "- [{}]({}) ({})", title, source.url, source.kind);
                }
                None => {
                    let _ = writeln!(out, "- {} ({})", source.url, source.kind);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefing::{BriefingCard, Source, SourceKind};
    use chrono::{TimeZone, Utc};

    fn briefing() -> Briefing {
        Briefing {
            id: 3,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
            title: String::new(),
            topics: vec!["rust".to_string(), "databases".to_string()],
            summary: "Embedded stores this week".to_string(),
            model_used: None,
            research_time_ms: None,
            total_tokens: None,
            cards: vec![BriefingCard {
                id: 1,
                briefing_id: 3,
                card_index: 0,
                title: "SQLite 3.50".to_string(),
                topic: "databases".to_string(),
                summary: "New JSON functions".to_string(),
                detailed_content: Some("jsonb everywhere".to_string()),
                relevance: None,
                suggested_next: Some("Try it in briefly".to_string()),
            }],
            sources: vec![Source {
                id: 1,
                briefing_id: 3,
                kind: SourceKind::News,
                url: "https://sqlite.org/news.html".to_string(),
                title: Some("SQLite News".to_string()),
            }],
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_markdown_layout() {
        let md = to_markdown(&briefing());
        assert!(md.starts_with("# rust, databases\n"));
        assert!(md.contains("*2026-03-01 09:30 UTC*"));
        assert!(md.contains("## SQLite 3.50"));
        assert!(md.contains("**Topic:** databases"));
        assert!(md.contains("### Details\n\njsonb everywhere"));
        assert!(!md.contains("Why it matters"));
        assert!(md.contains("- [SQLite News](https://sqlite.org/news.html) (news)"));
    }

    #[test]
    fn test_json_export_parses_back() {
        let raw = render(&briefing(), ExportFormat::Json).unwrap();
        let parsed: Briefing = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, briefing());
    }
}
