//! Line formats for the `env_logger` backend

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::config::LogFormat;

/// One record, detached from `log::Record` so formatting is testable
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: log::Level,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn from_record(record: &log::Record<'_>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        }
    }
}

impl LogFormat {
    pub fn format_entry(&self, entry: &LogEntry) -> String {
        match self {
            LogFormat::Json => format_json(entry),
            LogFormat::Human => format_human(entry),
        }
    }
}

fn format_json(entry: &LogEntry) -> String {
    let mut json = Map::new();
    json.insert("timestamp".to_string(), Value::String(entry.timestamp.to_rfc3339()));
    json.insert("level".to_string(), Value::String(entry.level.to_string()));
    json.insert("target".to_string(), Value::String(entry.target.clone()));
    json.insert("message".to_string(), Value::String(entry.message.clone()));

    serde_json::to_string(&json).unwrap_or_else(|_| "Failed to serialize log entry".to_string())
}

fn format_human(entry: &LogEntry) -> String {
    let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
    format!("{} {:5} [{}] {}", timestamp, entry.level, entry.target, entry.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> LogEntry {
        LogEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            level: log::Level::Warn,
            target: "strata_core::cascade".to_string(),
            message: "delete cascade failed".to_string(),
        }
    }

    #[test]
    fn test_json_format() {
        let line = LogFormat::Json.format_entry(&entry());
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["level"], "WARN");
        assert_eq!(parsed["target"], "strata_core::cascade");
        assert_eq!(parsed["message"], "delete cascade failed");
        assert!(parsed["timestamp"].as_str().unwrap().starts_with("2024-01-15T10:30:00"));
    }

    #[test]
    fn test_human_format() {
        let line = LogFormat::Human.format_entry(&entry());
        assert_eq!(line, "2024-01-15 10:30:00.000 WARN  [strata_core::cascade] delete cascade failed");
    }
}
