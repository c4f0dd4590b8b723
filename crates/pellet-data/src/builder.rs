//! Chart dispatch: turns a [`Snapshot`] into the payload of one named chart.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use pellet_core::coercion::format_date_key;
use pellet_core::error::PelletError;
use pellet_core::models::{DayWindow, SizeBins};
use serde_json::{json, Value};

use crate::activity::aggregate_user_activity;
use crate::chart::{ChartData, ChartOutcome};
use crate::daily::{
    build_daily_series, daily_from_records, SeriesField, AVG_SIZE_SERIES, MAX_SIZE_SERIES,
    MIN_SIZE_SERIES,
};
use crate::histogram::build_histogram;
use crate::locations::{aggregate_location_stats, locations_chart, resolve_operator_index};
use crate::reader::Snapshot;

pub const SESSIONS_PER_DAY_SERIES: &str = "Sessions";

// ── ChartKind ─────────────────────────────────────────────────────────────────

/// Every chart the dashboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartKind {
    DailySessions,
    SizeTrend,
    SizeDistribution,
    UserActivity,
    LocationOverview,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::DailySessions,
        ChartKind::SizeTrend,
        ChartKind::SizeDistribution,
        ChartKind::UserActivity,
        ChartKind::LocationOverview,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChartKind::DailySessions => "daily_sessions",
            ChartKind::SizeTrend => "size_trend",
            ChartKind::SizeDistribution => "size_distribution",
            ChartKind::UserActivity => "user_activity",
            ChartKind::LocationOverview => "location_overview",
        }
    }

    /// Parse `--chart`; `"all"` expands to every kind.
    pub fn parse_selection(raw: &str) -> Result<Vec<ChartKind>, PelletError> {
        if raw == "all" {
            Ok(Self::ALL.to_vec())
        } else {
            raw.parse().map(|kind| vec![kind])
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartKind {
    type Err = PelletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| PelletError::UnknownChart(s.to_string()))
    }
}

// ── ChartContext ──────────────────────────────────────────────────────────────

/// Everything besides the data that decides a chart's shape.
#[derive(Debug, Clone)]
pub struct ChartContext {
    pub window: DayWindow,
    /// Last day of every daily window.
    pub today: NaiveDate,
    pub bins: SizeBins,
}

impl ChartContext {
    pub fn new(window: DayWindow, today: NaiveDate) -> Self {
        Self {
            window,
            today,
            bins: SizeBins::default(),
        }
    }
}

// ── build_chart ───────────────────────────────────────────────────────────────

/// Build one chart from a snapshot.
///
/// Daily charts always cover the full window and are never empty. The size
/// distribution, activity and location charts report
/// [`ChartOutcome::NoData`] when there is nothing to show.
pub fn build_chart(kind: ChartKind, snapshot: &Snapshot, ctx: &ChartContext) -> ChartOutcome {
    match kind {
        ChartKind::DailySessions => ChartOutcome::Ready(daily_sessions(snapshot, ctx)),
        ChartKind::SizeTrend => ChartOutcome::Ready(size_trend(snapshot, ctx)),
        ChartKind::SizeDistribution => build_histogram(&snapshot.size_values(), &ctx.bins)
            .map(|h| h.into_chart())
            .into(),
        ChartKind::UserActivity => user_activity(snapshot),
        ChartKind::LocationOverview => {
            let stats = aggregate_location_stats(
                &snapshot.user_summaries(),
                &snapshot.measurement_records(),
                &snapshot.session_summaries(),
            );
            if stats.is_empty() {
                ChartOutcome::NoData
            } else {
                ChartOutcome::Ready(locations_chart(&stats))
            }
        }
    }
}

/// Sessions per day, from the per-day stats when the API provided them and
/// from the raw session list otherwise.
fn daily_sessions(snapshot: &Snapshot, ctx: &ChartContext) -> ChartData {
    let fields = [SeriesField::count(SESSIONS_PER_DAY_SERIES, "count")];

    let rows: Vec<Value> = if snapshot.daily_stats.is_empty() {
        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for session in snapshot.session_summaries() {
            if let Some(day) = session.day {
                *per_day.entry(day).or_default() += 1;
            }
        }
        per_day
            .into_iter()
            .map(|(day, count)| json!({ "date": format_date_key(day), "count": count }))
            .collect()
    } else {
        snapshot.daily_stats.clone()
    };

    build_daily_series(&rows, ctx.window, "date", &fields, ctx.today).into_chart()
}

/// Average, minimum and maximum size per day.
fn size_trend(snapshot: &Snapshot, ctx: &ChartContext) -> ChartData {
    let mut daily = if snapshot.daily_stats.is_empty() {
        daily_from_records(&snapshot.measurement_records(), ctx.window, ctx.today)
    } else {
        let fields = [
            SeriesField::trend(AVG_SIZE_SERIES, "avg_size"),
            SeriesField::trend(MIN_SIZE_SERIES, "min_size"),
            SeriesField::trend(MAX_SIZE_SERIES, "max_size"),
        ];
        build_daily_series(&snapshot.daily_stats, ctx.window, "date", &fields, ctx.today)
    };

    daily
        .series
        .retain(|s| [AVG_SIZE_SERIES, MIN_SIZE_SERIES, MAX_SIZE_SERIES].contains(&s.name.as_str()));
    daily.into_chart()
}

/// Sessions per user. Users without a reported session count get the number
/// of sessions attributed to them in the snapshot.
fn user_activity(snapshot: &Snapshot) -> ChartOutcome {
    let users = snapshot.user_summaries();
    if users.is_empty() {
        return ChartOutcome::NoData;
    }

    let sessions = snapshot.session_summaries();
    let mut attributed: BTreeMap<usize, u64> = BTreeMap::new();
    for session in &sessions {
        let Some(op) = session.operator.as_deref() else {
            continue;
        };
        if let Some(index) = resolve_operator_index(&users, op) {
            *attributed.entry(index).or_default() += 1;
        }
    }

    let pairs: Vec<(&str, Value)> = users
        .iter()
        .enumerate()
        .map(|(i, u)| {
            let count = if u.session_count.is_null() {
                json!(attributed.get(&i).copied().unwrap_or(0))
            } else {
                u.session_count.clone()
            };
            (u.display_name(), count)
        })
        .collect();

    ChartOutcome::Ready(aggregate_user_activity(&pairs).into_chart())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
