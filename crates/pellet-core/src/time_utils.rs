use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::warn;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Decides which calendar day "today" is for the dashboard's day windows.
pub struct TimezoneHandler {
    default_tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    ///
    /// Unrecognised names fall back to UTC with a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { default_tz: tz }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    /// The calendar day `instant` falls on in this handler's timezone.
    pub fn local_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.default_tz).date_naive()
    }

    /// Today's date in this handler's timezone.
    pub fn today(&self) -> NaiveDate {
        self.local_day(Utc::now())
    }

    pub fn default_tz(&self) -> Tz {
        self.default_tz
    }
}

// ── Day windows ───────────────────────────────────────────────────────────────

/// The `days` consecutive calendar days ending on `today`, oldest first.
pub fn trailing_days(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..i64::from(days))
        .rev()
        .map(|offset| today - Duration::days(offset))
        .collect()
}

/// Short axis label for a day, e.g. `"Jan 5"`.
pub fn day_label(day: NaiveDate) -> String {
    day.format("%b %-d").to_string()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
