//! Human and JSON renderings of command output
//!
//! Human output goes to stdout with status glyphs; errors and warnings go
//! to stderr. JSON output keeps stdout to one document per command so
//! scripts can pipe `relist --json` into `jq`; job progress is streamed
//! to stderr as one JSON object per line.

use relist_core::domain::job::{ProgressLevel, ProgressMessage};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    /// Detail lines; suppressed in JSON mode
    fn info(&self, message: &str);
    /// One entry of a backend job's progress log
    fn progress(&self, message: &ProgressMessage);
    fn print_json(&self, value: &serde_json::Value);
}

fn level_glyph(level: ProgressLevel) -> char {
    match level {
        ProgressLevel::Info => '\u{2022}',
        ProgressLevel::Success => '\u{2713}',
        ProgressLevel::Warning => '\u{26a0}',
        ProgressLevel::Error => '\u{2717}',
    }
}

/// Renders a progress entry as `  <glyph> [HH:MM:SS] text`
///
/// The time is shown in UTC, as the backend records it; entries without
/// a timestamp omit it.
pub fn progress_line(message: &ProgressMessage) -> String {
    let glyph = level_glyph(message.level);
    match message.timestamp {
        Some(ts) => format!("  {glyph} [{}] {}", ts.format("%H:%M:%S"), message.message),
        None => format!("  {glyph} {}", message.message),
    }
}

pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn progress(&self, message: &ProgressMessage) {
        println!("{}", progress_line(message));
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn progress(&self, message: &ProgressMessage) {
        eprintln!(
            "{}",
            serde_json::json!({
                "event": "progress",
                "level": message.level,
                "message": message.message,
                "timestamp": message.timestamp,
            })
        );
    }
    fn print_json(&self, value: &serde_json::Value) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{value}"),
        }
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}
