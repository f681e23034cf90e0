//! Digest rendering: full summary and the short reminder nudge.
//!
//! Both renderers are total; an empty digest yields a "nothing to
//! report" message, never an empty string.

use crate::digest::Digest;
use crate::staleness::Severity;

/// Max completed-task titles listed per project.
const MAX_TASKS_PER_PROJECT: usize = 5;
/// Max projects listed in the attention section (total, not per project).
const MAX_ATTENTION_PROJECTS: usize = 5;

fn count_noun(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Render the full daily summary.
pub fn render_summary(digest: &Digest) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("📊 Daily summary\n".to_owned());

    if digest.completed_today.is_empty() {
        lines.push("No tasks completed today.\n".to_owned());
    } else {
        lines.push("✅ Completed today:".to_owned());
        for entry in &digest.completed_today {
            lines.push(format!(
                "\n{} ({})",
                entry.project.name,
                count_noun(entry.tasks.len(), "task")
            ));
            for task in entry.tasks.iter().take(MAX_TASKS_PER_PROJECT) {
                lines.push(format!("  • {}", task.title));
            }
            if entry.tasks.len() > MAX_TASKS_PER_PROJECT {
                lines.push(format!(
                    "  • +{} more",
                    entry.tasks.len() - MAX_TASKS_PER_PROJECT
                ));
            }
        }
        lines.push(String::new());
    }

    if !digest.pending.is_empty() {
        lines.push("📝 Projects with pending tasks:".to_owned());
        for entry in &digest.pending {
            lines.push(format!(
                "  • {}: {}",
                entry.project.name,
                count_noun(entry.pending_count, "task")
            ));
        }
        lines.push(String::new());
    }

    if !digest.attention.is_empty() {
        lines.push("⚠️ Needs attention:".to_owned());
        for entry in digest.attention.iter().take(MAX_ATTENTION_PROJECTS) {
            lines.push(format!(
                "  {} {} (last activity {} ago)",
                Severity::for_ratio(entry.ratio).marker(),
                entry.project.name,
                count_noun(entry.days_since_activity.max(0) as usize, "day")
            ));
        }
        lines.push(String::new());
    }

    lines.push("📈 Stats:".to_owned());
    lines.push(format!("  • Projects: {}", digest.total_projects));
    lines.push(format!(
        "  • Completed today: {}",
        digest.total_completed_today()
    ));
    lines.push(format!("  • Tasks remaining: {}", digest.total_pending()));

    lines.join("\n")
}

/// Render the short reminder nudge delivered by the scheduler.
///
/// When there is nothing to report, short-circuits to a single friendly
/// nudge instead of a content-free stats dump.
pub fn render_reminder(digest: &Digest) -> String {
    if digest.is_empty() {
        return "👋 Time to wrap up the day!\n\nOpen the app and review your projects.".to_owned();
    }

    let mut lines: Vec<String> = Vec::new();
    lines.push("👋 Time to wrap up the day!\n".to_owned());

    let completed = digest.total_completed_today();
    if completed > 0 {
        lines.push(format!(
            "You completed {} today!",
            count_noun(completed, "task")
        ));
    }

    if !digest.attention.is_empty() {
        lines.push(format!(
            "\n⚠️ {} your attention",
            if digest.attention.len() == 1 {
                "1 project needs".to_owned()
            } else {
                format!("{} projects need", digest.attention.len())
            }
        ));
    }

    let pending = digest.total_pending();
    if pending > 0 {
        lines.push(format!("\n📝 {} still pending", count_noun(pending, "task")));
    }

    lines.push("\nOpen the app for the details!".to_owned());
    lines.join("\n")
}
