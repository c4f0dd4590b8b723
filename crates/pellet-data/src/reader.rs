//! Snapshot loading for the chart pipeline.
//!
//! A snapshot is one JSON document holding whatever the API (or the local
//! cache) returned: measurement records, sessions, users and per-day stats.
//! Elements are kept as raw [`Value`]s and converted lazily through the
//! tolerant `from_value` constructors.

use std::path::Path;

use pellet_core::error::{PelletError, Result};
use pellet_core::models::{MeasurementRecord, SessionSummary, UserSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Raw upstream arrays for one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub records: Vec<Value>,
    #[serde(default)]
    pub sessions: Vec<Value>,
    #[serde(default)]
    pub users: Vec<Value>,
    /// Per-day rows such as `{ "date", "count", "avg_size" }`.
    #[serde(default)]
    pub daily_stats: Vec<Value>,
}

impl Snapshot {
    /// Interpret any JSON document as a snapshot.
    ///
    /// A bare array is taken as the record list. Object keys that are
    /// missing or not arrays yield empty lists.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(records) => Self {
                records,
                ..Default::default()
            },
            Value::Object(_) => Self {
                records: array_at(&value, &["records", "measurements"]),
                sessions: array_at(&value, &["sessions"]),
                users: array_at(&value, &["users"]),
                daily_stats: array_at(&value, &["daily_stats", "dailyStats", "stats"]),
            },
            other => {
                debug!(kind = ?other, "snapshot is neither an object nor an array");
                Self::default()
            }
        }
    }

    pub fn measurement_records(&self) -> Vec<MeasurementRecord> {
        self.records.iter().map(MeasurementRecord::from_value).collect()
    }

    pub fn session_summaries(&self) -> Vec<SessionSummary> {
        self.sessions.iter().map(SessionSummary::from_value).collect()
    }

    pub fn user_summaries(&self) -> Vec<UserSummary> {
        self.users.iter().map(UserSummary::from_value).collect()
    }

    /// Raw size values of every record, for the size distribution.
    pub fn size_values(&self) -> Vec<Value> {
        self.records
            .iter()
            .filter_map(|r| r.get("avg_size").or_else(|| r.get("avgSize")))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
            && self.sessions.is_empty()
            && self.users.is_empty()
            && self.daily_stats.is_empty()
    }
}

fn array_at(value: &Value, keys: &[&str]) -> Vec<Value> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

/// Read and parse a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path).map_err(|source| PelletError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content)?;
    let snapshot = Snapshot::from_value(value);

    debug!(
        path = %path.display(),
        records = snapshot.records.len(),
        sessions = snapshot.sessions.len(),
        users = snapshot.users.len(),
        daily_stats = snapshot.daily_stats.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn test_from_value_object_with_aliases() {
        let snapshot = Snapshot::from_value(json!({
            "measurements": [{ "avg_size": 3 }],
            "sessions": [{}],
            "users": "not a list",
            "dailyStats": [{ "date": "2024-01-01" }, { "date": "2024-01-02" }]
        }));
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.sessions.len(), 1);
        assert!(snapshot.users.is_empty());
        assert_eq!(snapshot.daily_stats.len(), 2);
    }

    #[test]
    fn test_from_value_bare_array_is_records() {
        let snapshot = Snapshot::from_value(json!([{ "avg_size": 1 }, { "avg_size": 2 }]));
        assert_eq!(snapshot.records.len(), 2);
        assert!(snapshot.users.is_empty());
    }

    #[test]
    fn test_from_value_scalar_is_empty() {
        assert!(Snapshot::from_value(json!(42)).is_empty());
        assert!(Snapshot::from_value(json!(null)).is_empty());
    }

    #[test]
    fn test_size_values_and_typed_views() {
        let snapshot = Snapshot::from_value(json!({
            "records": [
                { "avg_size": 3.5, "operator": "ann" },
                { "avgSize": "4" },
                { "count": 2 }
            ],
            "users": [{ "username": "ann", "role": "admin" }]
        }));
        assert_eq!(snapshot.size_values(), vec![json!(3.5), json!("4")]);
        assert_eq!(snapshot.measurement_records().len(), 3);
        assert_eq!(snapshot.user_summaries()[0].username.as_deref(), Some("ann"));
        assert!(snapshot.session_summaries().is_empty());
    }

    #[test]
    fn test_load_snapshot_from_file() {
        let file = write_temp(r#"{ "records": [{ "avg_size": 2.5 }], "users": [] }"#);
        let snapshot = load_snapshot(file.path()).expect("load");
        assert_eq!(snapshot.records.len(), 1);
    }

    #[test]
    fn test_load_snapshot_missing_file() {
        let err = load_snapshot(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, PelletError::FileRead { .. }));
    }

    #[test]
    fn test_load_snapshot_invalid_json() {
        let file = write_temp("{ records: ");
        let err = load_snapshot(file.path()).unwrap_err();
        assert!(matches!(err, PelletError::JsonParse(_)));
    }
}
