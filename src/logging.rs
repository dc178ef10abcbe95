use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Serialize)]
pub struct StructuredLogLine {
    #[serde(rename = "timestampIso")]
    pub timestamp_iso: String,
    pub level: String,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    pub details: Value,
}

impl StructuredLogLine {
    pub fn new(
        level: &str,
        event: &str,
        session: Option<&str>,
        seed: Option<u64>,
        tick: Option<u64>,
        details: Value,
    ) -> Self {
        Self {
            timestamp_iso: now_iso(),
            level: level.to_string(),
            event: event.to_string(),
            session: session.map(|value| value.to_string()),
            seed,
            tick,
            details,
        }
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Writes one JSON object per line to stderr.
pub fn emit_log(
    level: &str,
    event: &str,
    session: Option<&str>,
    seed: Option<u64>,
    tick: Option<u64>,
    details: Value,
) {
    let line = StructuredLogLine::new(level, event, session, seed, tick, details);
    eprintln!(
        "{}",
        serde_json::to_string(&line).expect("structured log should serialize")
    );
}
