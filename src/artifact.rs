//! Intake of chart specs from artifacts and free-form messages.

use serde_json::Value;

use crate::error::{ChartError, Result};
use crate::spec::ChartSpec;

pub const CHART_CONTENT_TYPE: &str = "application/vnd.mycelis.chart+json";
pub const MAX_CHART_ROWS: usize = 2000;

/// Check chart artifact content before it is stored. Returns the content
/// type to store it under.
pub fn validate_chart_content(content: &str) -> Result<&'static str> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Object(spec) = value else {
        return Err(ChartError::Artifact("chart content must be a JSON object".to_string()));
    };
    if !spec.contains_key("chart_type") {
        return Err(ChartError::Artifact(
            "chart spec missing required 'chart_type' field".to_string(),
        ));
    }
    match spec.get("data") {
        Some(Value::Array(rows)) if rows.len() > MAX_CHART_ROWS => Err(ChartError::TooManyRows {
            rows: rows.len(),
            limit: MAX_CHART_ROWS,
        }),
        Some(Value::Array(_)) => Ok(CHART_CONTENT_TYPE),
        _ => Err(ChartError::Artifact("chart spec missing required 'data' array".to_string())),
    }
}

/// Whether stored content should be shown as a chart.
pub fn is_chart_artifact(artifact_type: &str, content_type: &str) -> bool {
    artifact_type == "chart" || content_type.contains("vnd.mycelis.chart")
}

/// Recognize a chart spec in a message body: a JSON object with a non-empty
/// `chart_type` and an array `data`.
pub fn detect_chart_spec(message: &str) -> Option<ChartSpec> {
    let value: Value = serde_json::from_str(message.trim()).ok()?;
    let has_kind = match value.get("chart_type") {
        Some(Value::String(s)) => !s.is_empty(),
        _ => false,
    };
    let has_rows = matches!(value.get("data"), Some(Value::Array(_)));
    if !(has_kind && has_rows) {
        return None;
    }
    ChartSpec::from_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ChartKind;

    #[test]
    fn test_valid_chart_content() {
        let content = r#"{"version": "1", "chart_type": "bar", "data": [{"a": 1}]}"#;
        assert_eq!(validate_chart_content(content).unwrap(), CHART_CONTENT_TYPE);
    }

    #[test]
    fn test_invalid_chart_content() {
        assert!(matches!(validate_chart_content("{not json"), Err(ChartError::Json(_))));
        assert!(matches!(validate_chart_content("[1, 2]"), Err(ChartError::Artifact(_))));

        let err = validate_chart_content(r#"{"data": []}"#).unwrap_err();
        assert!(err.to_string().contains("chart_type"));

        let err = validate_chart_content(r#"{"chart_type": "bar", "data": {}}"#).unwrap_err();
        assert!(err.to_string().contains("'data' array"));
    }

    #[test]
    fn test_row_limit() {
        let rows: Vec<Value> = (0..=MAX_CHART_ROWS).map(|i| serde_json::json!({"i": i})).collect();
        let content = serde_json::json!({"chart_type": "table", "data": rows}).to_string();
        let err = validate_chart_content(&content).unwrap_err();
        assert!(matches!(err, ChartError::TooManyRows { rows: 2001, limit: 2000 }));
        assert!(err.to_string().contains("2000-row limit"));
    }

    #[test]
    fn test_detect_chart_spec() {
        let spec = detect_chart_spec(r#" {"chart_type": "dot", "data": []} "#).unwrap();
        assert_eq!(spec.chart_type, ChartKind::Dot);
        assert!(detect_chart_spec("mission complete").is_none());
        assert!(detect_chart_spec(r#"{"chart_type": "", "data": []}"#).is_none());
        assert!(detect_chart_spec(r#"{"chart_type": "bar", "data": "x"}"#).is_none());
    }

    #[test]
    fn test_is_chart_artifact() {
        assert!(is_chart_artifact("chart", "text/plain"));
        assert!(is_chart_artifact("data", CHART_CONTENT_TYPE));
        assert!(!is_chart_artifact("document", "text/markdown"));
    }
}
