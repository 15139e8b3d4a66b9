// Output formatting utilities

use crate::models::{BuildResult, BuildStatus, Task, TaskStatus};
use chrono::{Local, TimeZone};
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_FG_RED: &str = "\x1b[31m";
const ANSI_FG_GREEN: &str = "\x1b[32m";
const ANSI_FG_YELLOW: &str = "\x1b[33m";
const ANSI_FG_BRIGHT_BLACK: &str = "\x1b[90m";

/// Narrowest commit column before other columns stop fitting
const MIN_COMMIT_WIDTH: usize = 7;

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

/// Format timestamp for display
pub fn format_timestamp(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

fn colorize(text: &str, color: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", color, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

fn status_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Succeeded => ANSI_FG_GREEN,
        TaskStatus::Failed => ANSI_FG_RED,
        TaskStatus::Skipped => ANSI_FG_YELLOW,
        TaskStatus::New | TaskStatus::InProgress => ANSI_FG_BRIGHT_BLACK,
    }
}

fn result_color(result: BuildResult) -> &'static str {
    match result {
        BuildResult::Succeeded => ANSI_FG_GREEN,
        BuildResult::WillFail => ANSI_FG_RED,
        BuildResult::New => ANSI_FG_YELLOW,
    }
}

/// Truncate to `width` characters, marking the cut with ".."
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 2 {
        return text.chars().take(width).collect();
    }
    let mut truncated: String = text.chars().take(width - 2).collect();
    truncated.push_str("..");
    truncated
}

/// One-line anticipated status
pub fn format_anticipated_status(result: BuildResult, is_tty: bool) -> String {
    let value = colorize(result.as_str(), result_color(result), is_tty);
    if is_tty {
        format!("{}Anticipated build status:{} {}", ANSI_BOLD, ANSI_RESET, value)
    } else {
        format!("Anticipated build status: {}", value)
    }
}

/// Build history table, one row per build
pub fn format_build_list(builds: &[BuildStatus], width: usize, is_tty: bool) -> String {
    if builds.is_empty() {
        return "No builds recorded.".to_string();
    }

    let branch_width = builds.iter()
        .map(|b| b.branch.chars().count())
        .max()
        .unwrap_or(0)
        .max("Branch".len());

    // ID(6) Created(19) Branch Tasks(5) Passed(6) Failed(6) Pending(7) + gaps
    let fixed = 6 + 19 + branch_width + 5 + 6 + 6 + 7 + 7 * 2;
    let commit_width = width.saturating_sub(fixed).clamp(MIN_COMMIT_WIDTH, 40);

    let mut output = String::new();
    let header = format!(
        "{:<6}  {:<commit_width$}  {:<branch_width$}  {:<19}  {:>5}  {:>6}  {:>6}  {:>7}",
        "ID", "Commit", "Branch", "Created", "Tasks", "Passed", "Failed", "Pending",
    );
    if is_tty {
        output.push_str(&format!("{}{}{}\n", ANSI_BOLD, header, ANSI_RESET));
    } else {
        output.push_str(&header);
        output.push('\n');
    }

    for build in builds {
        let passed = build.count_status(TaskStatus::Succeeded);
        let failed = build.count_status(TaskStatus::Failed) + build.count_status(TaskStatus::Skipped);
        let pending = build.count_status(TaskStatus::New) + build.count_status(TaskStatus::InProgress);
        let id = build.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string());

        output.push_str(&format!(
            "{:<6}  {:<commit_width$}  {:<branch_width$}  {:<19}  {:>5}  {:>6}  {:>6}  {:>7}\n",
            id,
            truncate(&build.commit, commit_width),
            build.branch,
            format_timestamp(build.created_ts),
            build.task_count(),
            passed,
            failed,
            pending,
        ));
    }

    output.trim_end().to_string()
}

fn format_task_line(task: &Task, is_tty: bool) -> String {
    let status = colorize(
        &format!("{:<11}", task.status.as_str()),
        status_color(task.status),
        is_tty,
    );
    let mut line = format!("    {} {}", status, task.name);
    if task.flaky {
        line.push_str(" [flaky]");
    }
    if task.attempts > 1 {
        line.push_str(&format!(" (attempt {})", task.attempts));
    }
    if let (Some(start), Some(end)) = (task.start_ts, task.end_ts) {
        line.push_str(&format!(" {}s", (end - start).max(0)));
    }
    line
}

/// Detailed view of one build: checklist then stages and tasks
pub fn format_build_detail(build: &BuildStatus, is_tty: bool) -> String {
    let mut output = String::new();

    let header = format!(
        "Build {}: {}@{}",
        build.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
        build.branch,
        build.commit,
    );
    output.push_str(&header);
    output.push('\n');
    output.push_str(&"=".repeat(header.chars().count().max(40)));
    output.push('\n');
    output.push_str(&format!("UUID:    {}\n", build.uuid));
    output.push_str(&format!("Created: {}\n", format_timestamp(build.created_ts)));

    if build.stages.is_empty() {
        output.push_str("\nNo stages recorded.");
        return output;
    }

    for stage in &build.stages {
        output.push('\n');
        output.push_str(&format!("  {} ({} tasks)\n", stage.name, stage.tasks.len()));
        for entry in &stage.tasks {
            output.push_str(&format_task_line(&entry.task, is_tty));
            output.push('\n');
        }
    }

    output.trim_end().to_string()
}
