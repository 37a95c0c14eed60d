//! Generated payload model.
//!
//! Field names follow the JSON contract handed to the generator. Decoding is
//! deliberately forgiving about *shape noise* that models commonly emit
//! (numbers as strings, years as bare integers, unknown zone tags), while the
//! structural gate (phase count, source digest) lives in the validator.

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Axis
// ============================================================================

/// How the value axis should be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AxisKind {
    /// 0–100 narrative intensity; values are clamped before charting.
    #[default]
    Subjective,
    /// Unbounded real-world metric; values pass through unclamped.
    Objective,
}

impl From<String> for AxisKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "objective" | "absolute" | "metric" | "quantitative" => Self::Objective,
            _ => Self::Subjective,
        }
    }
}

/// Value-axis descriptor; drives both clamping and range computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDescriptor {
    #[serde(default = "default_axis_label", deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub kind: AxisKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_axis_label() -> String {
    "Intensity".to_string()
}

impl Default for AxisDescriptor {
    fn default() -> Self {
        Self {
            label: default_axis_label(),
            unit: None,
            kind: AxisKind::Subjective,
            description: None,
        }
    }
}

impl AxisDescriptor {
    pub fn subjective(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Default::default()
        }
    }

    pub fn objective(label: &str, unit: Option<&str>) -> Self {
        Self {
            label: label.to_string(),
            unit: unit.map(str::to_string),
            kind: AxisKind::Objective,
            description: None,
        }
    }

    pub fn is_subjective(&self) -> bool {
        self.kind == AxisKind::Subjective
    }
}

// ============================================================================
// Phase
// ============================================================================

/// Realized (fact-backed) vs projected (extrapolated) phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Zone {
    #[default]
    Realized,
    Projected,
}

impl From<String> for Zone {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "projected" | "projection" | "forecast" | "predicted" | "future" => Self::Projected,
            _ => Self::Realized,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Impact {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl From<String> for Impact {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" | "up" | "bullish" | "+" => Self::Positive,
            "negative" | "down" | "bearish" | "-" => Self::Negative,
            _ => Self::Neutral,
        }
    }
}

/// A dated event inside a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    #[serde(default, alias = "date", deserialize_with = "lenient_string")]
    pub time: String,
    #[serde(default, alias = "event", deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default)]
    pub impact: Impact,
}

/// One interval of a narrative series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(alias = "start", deserialize_with = "lenient_string")]
    pub start_label: String,
    #[serde(alias = "end", deserialize_with = "lenient_string")]
    pub end_label: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub open: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub high: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub low: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub close: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default)]
    pub zone: Zone,
    #[serde(default)]
    pub key_events: Vec<KeyEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_note: Option<String>,
}

impl Phase {
    /// Convenience constructor used by tests and sample data.
    pub fn new(start: &str, end: &str, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            start_label: start.to_string(),
            end_label: end.to_string(),
            open,
            high,
            low,
            close,
            label: String::new(),
            zone: Zone::Realized,
            key_events: Vec::new(),
            relation_note: None,
        }
    }

    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// `[open, high, low, close]`.
    pub fn values(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }

    /// Copy with all four values clamped into `[0, 100]`.
    pub fn clamped(&self) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) };
        Self {
            open: clamp(self.open),
            high: clamp(self.high),
            low: clamp(self.low),
            close: clamp(self.close),
            ..self.clone()
        }
    }
}

// ============================================================================
// Payload
// ============================================================================

/// The counter-series drawn against its own axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondarySeries {
    #[serde(default, deserialize_with = "lenient_string")]
    pub subject: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub metric: String,
    #[serde(default)]
    pub y_axis: AxisDescriptor,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

/// Structured object recovered from generator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub subject: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub metric: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timeframe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_cutoff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlook: Option<String>,
    #[serde(default)]
    pub y_axis: AxisDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis_label: Option<String>,
    pub phases: Vec<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<SecondarySeries>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

// ============================================================================
// Lenient field decoding
// ============================================================================

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("number out of range")),
        serde_json::Value::String(s) => {
            let cleaned = s.trim().trim_end_matches('%').replace(',', "");
            cleaned
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("expected a number, got `{s}`")))
        }
        other => Err(D::Error::custom(format!("expected a number, got {other}"))),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected a string, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn phase_accepts_numeric_labels_and_string_values() {
        let phase: Phase = serde_json::from_value(json!({
            "start_label": 2019,
            "end_label": "2020",
            "open": "12.5",
            "high": 40,
            "low": "10%",
            "close": 33
        }))
        .unwrap();

        assert_eq!(phase.start_label, "2019");
        assert_eq!(phase.open, 12.5);
        assert_eq!(phase.low, 10.0);
        assert_eq!(phase.zone, Zone::Realized);
        assert!(phase.key_events.is_empty());
    }

    #[test]
    fn unknown_tags_fall_back_to_defaults() {
        let phase: Phase = serde_json::from_value(json!({
            "start": "Q1 2024", "end": "Q2 2024",
            "open": 1, "high": 2, "low": 0, "close": 1,
            "zone": "Forecast",
            "key_events": [{ "date": "2024-03", "event": "launch", "impact": "sideways" }]
        }))
        .unwrap();

        assert_eq!(phase.zone, Zone::Projected);
        assert_eq!(phase.key_events[0].impact, Impact::Neutral);
        assert_eq!(phase.key_events[0].description, "launch");
    }

    #[test]
    fn clamping_bounds_all_four_values() {
        let phase = Phase::new("a", "b", 150.0, 180.0, -20.0, 50.0).clamped();
        assert_eq!(phase.values(), [100.0, 100.0, 0.0, 50.0]);
    }

    #[test]
    fn zone_serializes_lowercase() {
        let v = serde_json::to_value(Zone::Projected).unwrap();
        assert_eq!(v, json!("projected"));
        let v = serde_json::to_value(AxisKind::Objective).unwrap();
        assert_eq!(v, json!("objective"));
    }

    #[test]
    fn missing_value_is_rejected() {
        let err = serde_json::from_value::<Phase>(json!({
            "start_label": "2019", "end_label": "2020", "open": 1, "high": 2, "low": 0
        }));
        assert!(err.is_err());
    }
}
