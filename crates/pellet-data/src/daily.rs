//! Day-aligned series over a fixed trailing window.
//!
//! Every series produced here has exactly one slot per day of the window,
//! oldest first and ending today, so chart axes keep a fixed width no matter
//! how sparse the data is.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use pellet_core::coercion::{format_date_key, safe_date_key, safe_number};
use pellet_core::models::{DayWindow, MeasurementRecord};
use pellet_core::time_utils::{day_label, trailing_days};
use serde_json::Value;

use crate::chart::{ChartData, Series};

// ── SeriesKind / SeriesField ──────────────────────────────────────────────────

/// How a day without data is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Counts: a missing day is a real zero.
    Count,
    /// Values and trends: a missing day is `null` so nothing is plotted.
    Trend,
}

impl SeriesKind {
    fn empty_slot(self) -> Option<f64> {
        match self {
            SeriesKind::Count => Some(0.0),
            SeriesKind::Trend => None,
        }
    }
}

/// One output series: its display name, the source field and its fill rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesField {
    pub name: String,
    pub field: String,
    pub kind: SeriesKind,
}

impl SeriesField {
    pub fn count(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            kind: SeriesKind::Count,
        }
    }

    pub fn trend(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            kind: SeriesKind::Trend,
        }
    }
}

// ── DailySeries ───────────────────────────────────────────────────────────────

/// Day-aligned output: the day buckets, their labels and the series in the
/// order they were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    pub days: Vec<NaiveDate>,
    /// Human-readable labels, e.g. `"Jan 5"`.
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

impl DailySeries {
    fn empty(window: DayWindow, today: NaiveDate) -> Self {
        let days = trailing_days(today, window.days());
        let labels = days.iter().copied().map(day_label).collect();
        Self {
            days,
            labels,
            series: Vec::new(),
        }
    }

    /// `YYYY-MM-DD` keys of the day buckets.
    pub fn keys(&self) -> Vec<String> {
        self.days.iter().copied().map(format_date_key).collect()
    }

    /// Data of the series called `name`.
    pub fn get(&self, name: &str) -> Option<&[Option<f64>]> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.data.as_slice())
    }

    pub fn into_chart(self) -> ChartData {
        ChartData {
            categories: self.labels,
            series: self.series,
            colors: Vec::new(),
        }
    }
}

// ── build_daily_series ────────────────────────────────────────────────────────

/// Align loosely-shaped per-day rows (e.g. the API's daily stats) to the
/// trailing `window` ending `today`.
///
/// Each day takes the first record whose `date_field` normalises to that day.
/// A field that is missing or unparseable on the matching record is treated
/// the same as a day without a record.
pub fn build_daily_series(
    records: &[Value],
    window: DayWindow,
    date_field: &str,
    fields: &[SeriesField],
    today: NaiveDate,
) -> DailySeries {
    let mut by_day: HashMap<NaiveDate, &Value> = HashMap::new();
    for record in records {
        if let Some(day) = record.get(date_field).and_then(safe_date_key) {
            by_day.entry(day).or_insert(record);
        }
    }

    let mut out = DailySeries::empty(window, today);
    out.series = fields
        .iter()
        .map(|field| {
            let data = out
                .days
                .iter()
                .map(|day| {
                    by_day
                        .get(day)
                        .and_then(|record| record.get(&field.field))
                        .and_then(safe_number)
                        .or(field.kind.empty_slot())
                })
                .collect();
            Series::new(field.name.clone(), data)
        })
        .collect();

    tracing::trace!(
        days = window.days(),
        matched = by_day.len(),
        "built daily series"
    );
    out
}

// ── daily_from_records ────────────────────────────────────────────────────────

pub const MEASUREMENTS_SERIES: &str = "Measurements";
pub const AVG_SIZE_SERIES: &str = "Avg size";
pub const MIN_SIZE_SERIES: &str = "Min size";
pub const MAX_SIZE_SERIES: &str = "Max size";

/// Running per-day totals for individual measurements.
#[derive(Debug, Clone, Default)]
struct DayTotals {
    measurements: u32,
    size_sum: f64,
    size_count: u32,
    min_size: Option<f64>,
    max_size: Option<f64>,
}

impl DayTotals {
    fn add(&mut self, record: &MeasurementRecord) {
        self.measurements += 1;
        if let Some(size) = record.avg_size.filter(|s| *s > 0.0) {
            self.size_sum += size;
            self.size_count += 1;
        }
        if let Some(meta) = &record.metadata {
            if let Some(lo) = meta.min_size {
                self.min_size = Some(self.min_size.map_or(lo, |cur| cur.min(lo)));
            }
            if let Some(hi) = meta.max_size {
                self.max_size = Some(self.max_size.map_or(hi, |cur| cur.max(hi)));
            }
        }
    }

    fn avg_size(&self) -> Option<f64> {
        (self.size_count > 0).then(|| self.size_sum / f64::from(self.size_count))
    }
}

/// Build day-aligned series from individual measurements, as held in the
/// local session buffer when no per-day stats are available.
///
/// Produces a `Measurements` count series and `Avg size`, `Min size` and
/// `Max size` trend series. Records outside the window or without a
/// readable day are ignored.
pub fn daily_from_records(
    records: &[MeasurementRecord],
    window: DayWindow,
    today: NaiveDate,
) -> DailySeries {
    let mut out = DailySeries::empty(window, today);
    let Some(first_day) = out.days.first().copied() else {
        return out;
    };

    let mut totals: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for record in records {
        let Some(day) = record.day else { continue };
        if day < first_day || day > today {
            continue;
        }
        totals.entry(day).or_default().add(record);
    }

    let days = &out.days;
    let series = vec![
        Series::new(
            MEASUREMENTS_SERIES,
            column(days, &totals, SeriesKind::Count, |t| {
                Some(f64::from(t.measurements))
            }),
        ),
        Series::new(
            AVG_SIZE_SERIES,
            column(days, &totals, SeriesKind::Trend, DayTotals::avg_size),
        ),
        Series::new(
            MIN_SIZE_SERIES,
            column(days, &totals, SeriesKind::Trend, |t| t.min_size),
        ),
        Series::new(
            MAX_SIZE_SERIES,
            column(days, &totals, SeriesKind::Trend, |t| t.max_size),
        ),
    ];
    out.series = series;
    out
}

fn column(
    days: &[NaiveDate],
    totals: &BTreeMap<NaiveDate, DayTotals>,
    kind: SeriesKind,
    value: impl Fn(&DayTotals) -> Option<f64>,
) -> Vec<Option<f64>> {
    days.iter()
        .map(|day| totals.get(day).and_then(|t| value(t)).or(kind.empty_slot()))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
