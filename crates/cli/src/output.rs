//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "running" | "completed" | "complete" => status.green().to_string(),
        "no_action_needed" => status.blue().to_string(),
        "degraded" | "pending" | "completed_with_errors_still_present" => {
            status.yellow().to_string()
        }
        "unhealthy" | "failed" | "cancelled" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color an error count: zero is good news
pub fn color_count(count: u64) -> String {
    if count == 0 {
        count.to_string().green().to_string()
    } else {
        count.to_string().red().bold().to_string()
    }
}

/// Render an optional count, "n/a" when evidence was unavailable
pub fn format_optional_count(count: Option<u64>) -> String {
    match count {
        Some(n) => color_count(n),
        None => "n/a".yellow().to_string(),
    }
}

/// Shorten a log line for table display
pub fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("  short  ", 10), "short");
        assert_eq!(truncate("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn test_format_optional_count_marks_missing() {
        colored::control::set_override(false);
        assert_eq!(format_optional_count(None), "n/a");
        assert_eq!(format_optional_count(Some(3)), "3");
    }
}
