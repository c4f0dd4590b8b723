//! Outbound chart contract shared by every chart-producing operation.
//!
//! Renderers receive `{ categories, series: [{ name, data }] }`, where a
//! `null` data point means "no data for this slot" rather than zero.

use serde::{Deserialize, Serialize};

/// One named line/bar series plotted against the shared categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub data: Vec<Option<f64>>,
}

impl Series {
    pub fn new(name: impl Into<String>, data: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Build a series where every slot holds a value.
    pub fn from_values<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self::new(name, values.into_iter().map(Some).collect())
    }
}

/// A complete chart payload ready for the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartData {
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    /// Per-category colors, only emitted by charts that assign them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
}

impl ChartData {
    pub fn series_named(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name)
    }
}

/// Result of building a chart: either a payload or the no-data signal that
/// tells the renderer to show an empty-state message.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Ready(ChartData),
    NoData,
}

impl ChartOutcome {
    pub fn is_no_data(&self) -> bool {
        matches!(self, ChartOutcome::NoData)
    }

    pub fn data(&self) -> Option<&ChartData> {
        match self {
            ChartOutcome::Ready(data) => Some(data),
            ChartOutcome::NoData => None,
        }
    }
}

impl From<Option<ChartData>> for ChartOutcome {
    fn from(value: Option<ChartData>) -> Self {
        value.map_or(ChartOutcome::NoData, ChartOutcome::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_data_serializes_nulls_and_skips_empty_colors() {
        let chart = ChartData {
            categories: vec!["Jan 1".to_string(), "Jan 2".to_string()],
            series: vec![Series::new("Avg size", vec![Some(4.5), None])],
            colors: vec![],
        };
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "categories": ["Jan 1", "Jan 2"],
                "series": [{ "name": "Avg size", "data": [4.5, null] }]
            })
        );
    }

    #[test]
    fn test_outcome_from_option() {
        assert!(ChartOutcome::from(None).is_no_data());
        let ready = ChartOutcome::from(Some(ChartData::default()));
        assert!(ready.data().is_some());
    }

    #[test]
    fn test_series_named() {
        let chart = ChartData {
            categories: vec!["a".to_string()],
            series: vec![Series::from_values("Count", [3.0])],
            colors: vec![],
        };
        assert_eq!(chart.series_named("Count").unwrap().data, vec![Some(3.0)]);
        assert!(chart.series_named("Other").is_none());
    }
}
