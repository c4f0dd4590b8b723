use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coercion::{
    embedded_object, first_present, safe_date_key, safe_number, safe_string,
};
use crate::error::{PelletError, Result};

// ── DayWindow ─────────────────────────────────────────────────────────────────

/// Trailing window of calendar days shown on daily charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayWindow {
    /// The last 7 days, today included.
    Week,
    /// The last 30 days, today included.
    Month,
}

impl DayWindow {
    /// Number of day buckets in the window.
    pub fn days(self) -> u32 {
        match self {
            DayWindow::Week => 7,
            DayWindow::Month => 30,
        }
    }
}

impl TryFrom<u32> for DayWindow {
    type Error = PelletError;

    fn try_from(days: u32) -> Result<Self> {
        match days {
            7 => Ok(DayWindow::Week),
            30 => Ok(DayWindow::Month),
            other => Err(PelletError::InvalidWindow(other)),
        }
    }
}

// ── SizeBins ──────────────────────────────────────────────────────────────────

/// Default pellet size partition used by the size distribution chart.
pub const DEFAULT_SIZE_BINS: [f64; 11] = [0.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0, 12.0, 15.0];

/// Ascending histogram boundaries. Bin `i` is `[bounds[i], bounds[i + 1])`;
/// the last bin also takes every value at or above the top boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeBins {
    bounds: Vec<f64>,
}

impl SizeBins {
    /// Validate a boundary list: at least two finite, strictly ascending values.
    pub fn new(bounds: Vec<f64>) -> Result<Self> {
        if bounds.len() < 2 {
            return Err(PelletError::InvalidBins(
                "need at least two boundaries".to_string(),
            ));
        }
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(PelletError::InvalidBins(
                "boundaries must be finite".to_string(),
            ));
        }
        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PelletError::InvalidBins(
                "boundaries must be strictly ascending".to_string(),
            ));
        }
        Ok(Self { bounds })
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Number of bins (one fewer than the number of boundaries).
    pub fn len(&self) -> usize {
        self.bounds.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SizeBins {
    fn default() -> Self {
        Self {
            bounds: DEFAULT_SIZE_BINS.to_vec(),
        }
    }
}

// ── MeasurementRecord ─────────────────────────────────────────────────────────

/// Optional size spread attached to a measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeMetadata {
    pub min_size: Option<f64>,
    pub max_size: Option<f64>,
}

/// A single pellet measurement as delivered by the API or the session buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Calendar day of the measurement, from `timestamp`, `date` or
    /// `created_at`.
    pub day: Option<NaiveDate>,
    /// Average pellet size for the measurement.
    pub avg_size: Option<f64>,
    /// Number of pellets counted.
    #[serde(default)]
    pub count: f64,
    /// Operator identifier (username, id or display name).
    pub operator: Option<String>,
    pub metadata: Option<SizeMetadata>,
}

impl MeasurementRecord {
    /// Build a record from an arbitrary JSON object. Never fails; unreadable
    /// fields are left empty.
    pub fn from_value(value: &Value) -> Self {
        let day =
            first_present(value, &["timestamp", "date", "created_at"]).and_then(safe_date_key);

        let avg_size = first_present(value, &["avg_size", "avgSize"]).and_then(safe_number);
        let count = value.get("count").and_then(safe_number).unwrap_or(0.0);
        let operator = first_present(value, &["operator", "user_id", "userId"]).and_then(safe_string);

        let embedded = value.get("metadata").and_then(embedded_object);
        let min_size = embedded
            .as_ref()
            .and_then(|m| first_present(m, &["minSize", "min_size"]))
            .or_else(|| first_present(value, &["min_size", "minSize"]))
            .and_then(safe_number);
        let max_size = embedded
            .as_ref()
            .and_then(|m| first_present(m, &["maxSize", "max_size"]))
            .or_else(|| first_present(value, &["max_size", "maxSize"]))
            .and_then(safe_number);
        let metadata = (min_size.is_some() || max_size.is_some())
            .then_some(SizeMetadata { min_size, max_size });

        Self {
            day,
            avg_size,
            count,
            operator,
            metadata,
        }
    }
}

// ── SessionSummary ────────────────────────────────────────────────────────────

/// A measuring session, used to count completed versus active sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub day: Option<NaiveDate>,
    pub operator: Option<String>,
    /// Raw end marker; a session without one is still running.
    pub end_time: Option<String>,
}

impl SessionSummary {
    pub fn from_value(value: &Value) -> Self {
        Self {
            day: first_present(value, &["date", "start_time", "startTime"]).and_then(safe_date_key),
            operator: first_present(value, &["operator", "user_id", "userId"]).and_then(safe_string),
            end_time: first_present(value, &["end_time", "endTime"]).and_then(safe_string),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.end_time.is_some()
    }
}

// ── UserSummary ───────────────────────────────────────────────────────────────

/// Account role as reported by the user API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Anything other than `"admin"` (case-insensitive) is a regular user.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// A dashboard account with its location assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Option<String>,
    pub username: Option<String>,
    /// Display name.
    pub name: Option<String>,
    pub role: Role,
    pub location: Option<String>,
    /// Number of sessions the user ran, as reported by the stats endpoint.
    #[serde(default)]
    pub session_count: Value,
}

impl UserSummary {
    pub fn from_value(value: &Value) -> Self {
        let role = value
            .get("role")
            .and_then(|v| v.as_str())
            .map(Role::parse)
            .unwrap_or(Role::User);

        Self {
            id: value.get("id").and_then(safe_string),
            username: value.get("username").and_then(safe_string),
            name: first_present(value, &["name", "display_name", "full_name"]).and_then(safe_string),
            role,
            location: value.get("location").and_then(safe_string),
            session_count: first_present(value, &["session_count", "sessions", "sessionCount"])
                .cloned()
                .unwrap_or(Value::Null),
        }
    }

    /// Name shown on charts: display name, then username, then id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("Unknown")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
