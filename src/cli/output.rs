//! CLI output formatting utilities.

use crate::models::{CaptionItem, QaPair};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one caption line with its timestamp.
    pub fn caption(item: &CaptionItem) {
        println!("  {} {}", style(format_timestamp(item.start)).cyan(), item.text);
    }

    pub fn qa_pair(pair: &QaPair) {
        println!("  {} {}", style("Q:").bold(), pair.question);
        println!("  {} {}", style("A:").dim(), pair.answer);
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format seconds as `m:ss` or `h:mm:ss`.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Truncate content with ellipsis, on a character boundary.
pub fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(75.4), "1:15");
        assert_eq!(format_timestamp(3725.0), "1:02:05");
    }

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short", 10), "short");
        assert_eq!(content_preview("línea\nuno", 5), "línea...");
    }
}
