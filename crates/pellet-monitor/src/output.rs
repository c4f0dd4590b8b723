//! JSON lines written to stdout for the rendering side.

use pellet_data::chart::ChartOutcome;
use pellet_runtime::registry::ChartEntry;
use serde_json::{json, Value};

/// Payload for a built chart: the chart contract tagged with the chart name,
/// or the no-data marker.
pub fn chart_payload(chart: &str, outcome: &ChartOutcome) -> serde_json::Result<Value> {
    match outcome {
        ChartOutcome::NoData => Ok(json!({ "chart": chart, "status": "no_data" })),
        ChartOutcome::Ready(data) => {
            let mut payload = serde_json::to_value(data)?;
            if let Value::Object(map) = &mut payload {
                map.insert("chart".to_string(), json!(chart));
                map.insert("status".to_string(), json!("ready"));
            }
            Ok(payload)
        }
    }
}

/// Payload for a registry entry after an accepted update.
///
/// A failed refresh is reported inline; `stale` tells the renderer whether
/// it still holds an earlier chart to keep on screen.
pub fn entry_payload(chart: &str, entry: &ChartEntry) -> serde_json::Result<Value> {
    match (&entry.last_error, &entry.data) {
        (Some(message), data) => Ok(json!({
            "chart": chart,
            "status": "error",
            "message": message,
            "stale": data.is_some(),
        })),
        (None, Some(outcome)) => chart_payload(chart, outcome),
        (None, None) => Ok(json!({ "chart": chart, "status": "pending" })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pellet_data::builder::ChartKind;
    use pellet_data::chart::{ChartData, Series};
    use pellet_runtime::registry::ChartRegistry;

    fn sample() -> ChartOutcome {
        ChartOutcome::Ready(ChartData {
            categories: vec!["0-2".to_string(), "2-3".to_string()],
            series: vec![Series::new("Pellets", vec![Some(1.0), None])],
            colors: Vec::new(),
        })
    }

    #[test]
    fn test_no_data_payload() {
        let payload = chart_payload("size_distribution", &ChartOutcome::NoData).unwrap();
        assert_eq!(payload, json!({ "chart": "size_distribution", "status": "no_data" }));
    }

    #[test]
    fn test_ready_payload_keeps_chart_contract() {
        let payload = chart_payload("size_distribution", &sample()).unwrap();
        assert_eq!(payload["status"], "ready");
        assert_eq!(payload["categories"], json!(["0-2", "2-3"]));
        assert_eq!(payload["series"][0]["data"], json!([1.0, null]));
        assert!(payload.get("colors").is_none());
    }

    #[test]
    fn test_entry_payload_reports_failure_with_stale_flag() {
        let mut registry = ChartRegistry::new();
        let generation = registry.create("trend", ChartKind::SizeTrend);
        assert_eq!(
            entry_payload("trend", registry.get("trend").unwrap()).unwrap()["status"],
            "pending"
        );

        registry.replace("trend", generation, sample());
        registry.record_failure("trend", generation, "offline".to_string(), None);

        let payload = entry_payload("trend", registry.get("trend").unwrap()).unwrap();
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["message"], "offline");
        assert_eq!(payload["stale"], true);
    }
}
