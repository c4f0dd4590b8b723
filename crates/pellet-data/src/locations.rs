//! Per-location rollup of users, measurements and sessions.

use std::collections::BTreeMap;

use pellet_core::models::{MeasurementRecord, Role, SessionSummary, UserSummary};

use crate::chart::{ChartData, Series};

/// Group used for users without a location.
pub const NO_LOCATION: &str = "No location set";

/// Totals for one location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationStats {
    pub location: String,
    pub record_count: u64,
    pub completed_sessions: u64,
    pub total_pellets: f64,
    /// Users with the regular `user` role.
    pub operator_count: u64,
    pub admin_count: u64,
}

impl LocationStats {
    fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }
}

/// Resolve an operator identifier to the index of a user.
///
/// Upstream data is keyed inconsistently, so the identifier is tried as a
/// username first, then as an id, then as a display name. Within each step
/// the first user in input order wins.
pub fn resolve_operator_index(users: &[UserSummary], operator: &str) -> Option<usize> {
    users
        .iter()
        .position(|u| u.username.as_deref() == Some(operator))
        .or_else(|| users.iter().position(|u| u.id.as_deref() == Some(operator)))
        .or_else(|| users.iter().position(|u| u.name.as_deref() == Some(operator)))
}

/// Resolve an operator identifier to a user; see [`resolve_operator_index`].
pub fn resolve_operator<'a>(users: &'a [UserSummary], operator: &str) -> Option<&'a UserSummary> {
    resolve_operator_index(users, operator).map(|i| &users[i])
}

fn location_key(user: &UserSummary) -> &str {
    user.location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(NO_LOCATION)
}

/// Roll users, records and sessions up by location, ordered by location name.
///
/// Records and sessions whose operator cannot be resolved to a user are not
/// attributed to any location.
pub fn aggregate_location_stats(
    users: &[UserSummary],
    records: &[MeasurementRecord],
    sessions: &[SessionSummary],
) -> Vec<LocationStats> {
    let mut groups: BTreeMap<String, LocationStats> = BTreeMap::new();

    for user in users {
        let key = location_key(user);
        let stats = groups
            .entry(key.to_string())
            .or_insert_with(|| LocationStats::new(key));
        match user.role {
            Role::Admin => stats.admin_count += 1,
            Role::User => stats.operator_count += 1,
        }
    }

    let mut unmatched = 0usize;
    for record in records {
        let Some(user) = record
            .operator
            .as_deref()
            .and_then(|op| resolve_operator(users, op))
        else {
            unmatched += 1;
            continue;
        };
        if let Some(stats) = groups.get_mut(location_key(user)) {
            stats.record_count += 1;
            stats.total_pellets += record.count;
        }
    }

    for session in sessions.iter().filter(|s| s.is_completed()) {
        let Some(user) = session
            .operator
            .as_deref()
            .and_then(|op| resolve_operator(users, op))
        else {
            unmatched += 1;
            continue;
        };
        if let Some(stats) = groups.get_mut(location_key(user)) {
            stats.completed_sessions += 1;
        }
    }

    if unmatched > 0 {
        tracing::debug!(unmatched, "records or sessions without a matching user");
    }

    groups.into_values().collect()
}

/// Chart with one category per location and one series per metric.
pub fn locations_chart(stats: &[LocationStats]) -> ChartData {
    let metric = |name: &str, f: fn(&LocationStats) -> f64| {
        Series::from_values(name, stats.iter().map(f))
    };

    ChartData {
        categories: stats.iter().map(|s| s.location.clone()).collect(),
        series: vec![
            metric("Records", |s| s.record_count as f64),
            metric("Completed sessions", |s| s.completed_sessions as f64),
            metric("Pellets", |s| s.total_pellets),
            metric("Operators", |s| s.operator_count as f64),
            metric("Admins", |s| s.admin_count as f64),
        ],
        colors: Vec::new(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
