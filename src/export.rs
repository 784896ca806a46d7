//! Human-readable health report
//!
//! Pure formatter over sessions and the cached health snapshot. The output is
//! Markdown meant for people, not a stable interchange format.

use crate::insights::HealthSnapshot;
use crate::session::ChatSession;
use chrono::{DateTime, Utc};
use std::fmt::Write;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";
const PREVIEW_CHARS: usize = 120;

/// Render a Markdown report of the health snapshot and every session
pub fn render_report(
    sessions: &[ChatSession],
    snapshot: Option<&HealthSnapshot>,
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Health Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated: {}", generated_at.format(DATETIME_FORMAT));
    let _ = writeln!(out);

    match snapshot {
        Some(snapshot) => render_snapshot(&mut out, snapshot),
        None => {
            let _ = writeln!(out, "_No health insights have been generated yet._");
            let _ = writeln!(out);
        }
    }

    let _ = writeln!(out, "## Sessions ({})", sessions.len());
    let _ = writeln!(out);
    if sessions.is_empty() {
        let _ = writeln!(out, "_No saved sessions._");
    }
    for session in sessions {
        render_session(&mut out, session);
    }

    out
}

fn render_snapshot(out: &mut String, snapshot: &HealthSnapshot) {
    let _ = writeln!(out, "## Health Score: {}/100", snapshot.health_score);
    let _ = writeln!(
        out,
        "_Source: {}, computed {}_",
        snapshot.source,
        snapshot.generated_at.format(DATETIME_FORMAT)
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "### Symptoms");
    if snapshot.symptoms.is_empty() {
        let _ = writeln!(out, "- none recorded");
    }
    for symptom in &snapshot.symptoms {
        let _ = writeln!(
            out,
            "- {}: {} occurrence(s), average severity {:.1}/10",
            symptom.name,
            symptom.occurrences(),
            symptom.average_severity()
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "### Medications");
    if snapshot.medications.is_empty() {
        let _ = writeln!(out, "- none recorded");
    }
    for medication in &snapshot.medications {
        let _ = writeln!(
            out,
            "- {} ({}), since {}",
            medication.name,
            medication.frequency,
            medication.start_date.format(DATE_FORMAT)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "### Insights");
    if snapshot.insights.is_empty() {
        let _ = writeln!(out, "- none");
    }
    for insight in &snapshot.insights {
        let _ = writeln!(
            out,
            "- [{}] {}: {} (confidence {:.0}%)",
            insight.category,
            insight.pattern,
            insight.recommendation,
            insight.confidence * 100.0
        );
    }
    let _ = writeln!(out);
}

fn render_session(out: &mut String, session: &ChatSession) {
    let mut heading = format!("### {}", session.topic);
    if session.pinned {
        heading.push_str(" (pinned)");
    }
    let _ = writeln!(out, "{}", heading);

    let mut meta = format!(
        "_{}, {} message(s)",
        session.created_at.format(DATE_FORMAT),
        session.messages.len()
    );
    if let Some(rating) = session.rating {
        let _ = write!(meta, ", rated {}/5", rating);
    }
    meta.push('_');
    let _ = writeln!(out, "{}", meta);
    let _ = writeln!(out);

    for message in &session.messages {
        let speaker = if message.is_user { "You" } else { "Assistant" };
        let _ = writeln!(out, "- **{}**: {}", speaker, preview(&message.content));
    }
    let _ = writeln!(out);
}

/// First line of a message, shortened to `PREVIEW_CHARS`
fn preview(content: &str) -> String {
    let line = content.lines().next().unwrap_or("").trim();
    if line.chars().count() <= PREVIEW_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut.trim_end())
}
