//! Sessions-per-user bar chart.

use pellet_core::coercion::safe_count;
use pellet_core::formatting::{truncate_label, MAX_LABEL_CHARS};
use pellet_core::models::UserSummary;
use serde_json::Value;

use crate::chart::{ChartData, Series};

pub const SESSIONS_SERIES: &str = "Sessions";

/// Bar colors, assigned by position and repeated once exhausted.
pub const PALETTE: [&str; 8] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#06b6d4", "#ec4899", "#84cc16",
];

/// Parallel labels, session counts and colors, one entry per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserActivity {
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
    pub colors: Vec<String>,
}

impl UserActivity {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn into_chart(self) -> ChartData {
        ChartData {
            categories: self.labels,
            series: vec![Series::from_values(
                SESSIONS_SERIES,
                self.counts.into_iter().map(|c| c as f64),
            )],
            colors: self.colors,
        }
    }
}

/// Prepare `(display name, raw session count)` pairs for the activity chart.
///
/// Input order is preserved and decides colors. Long names are truncated and
/// unreadable or negative counts become `0`.
pub fn aggregate_user_activity<S: AsRef<str>>(users: &[(S, Value)]) -> UserActivity {
    let mut out = UserActivity {
        labels: Vec::with_capacity(users.len()),
        counts: Vec::with_capacity(users.len()),
        colors: Vec::with_capacity(users.len()),
    };

    for (index, (name, sessions)) in users.iter().enumerate() {
        out.labels.push(truncate_label(name.as_ref(), MAX_LABEL_CHARS));
        out.counts.push(safe_count(sessions));
        out.colors.push(PALETTE[index % PALETTE.len()].to_string());
    }

    out
}

/// Convenience wrapper over [`aggregate_user_activity`] for user summaries.
pub fn activity_from_users(users: &[UserSummary]) -> UserActivity {
    let pairs: Vec<(&str, Value)> = users
        .iter()
        .map(|u| (u.display_name(), u.session_count.clone()))
        .collect();
    aggregate_user_activity(&pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncates_long_names() {
        let out = aggregate_user_activity(&[
            ("Short", json!(1)),
            ("A Really Long Operator Name", json!(2)),
        ]);
        assert_eq!(out.labels, vec!["Short", "A Really Long O..."]);
    }

    #[test]
    fn test_coerces_counts() {
        let out = aggregate_user_activity(&[
            ("a", json!("7")),
            ("b", json!(-3)),
            ("c", json!(null)),
            ("d", json!(2.8)),
        ]);
        assert_eq!(out.counts, vec![7, 0, 0, 2]);
    }

    #[test]
    fn test_palette_cycles_by_position() {
        let users: Vec<(String, Value)> = (0..10).map(|i| (format!("u{i}"), json!(i))).collect();
        let out = aggregate_user_activity(&users);
        assert_eq!(out.colors[0], PALETTE[0]);
        assert_eq!(out.colors[7], PALETTE[7]);
        assert_eq!(out.colors[8], PALETTE[0]);
        assert_eq!(out.colors[9], PALETTE[1]);
    }

    #[test]
    fn test_empty_input() {
        let out = aggregate_user_activity::<&str>(&[]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_activity_from_users_and_chart() {
        let users = vec![
            UserSummary::from_value(&json!({ "username": "op1", "name": "Olga", "session_count": 4 })),
            UserSummary::from_value(&json!({ "username": "op2", "sessions": "2" })),
        ];
        let chart = activity_from_users(&users).into_chart();
        assert_eq!(chart.categories, vec!["Olga", "op2"]);
        assert_eq!(chart.series[0].data, vec![Some(4.0), Some(2.0)]);
        assert_eq!(chart.colors, vec![PALETTE[0], PALETTE[1]]);
    }
}
