use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::domain::Control;

pub const CONTROLS_ROUTE: &str = "/api/controls";
pub const HEALTH_ROUTE: &str = "/health";

/// Largest magnitude an `f64` holds without losing integer precision.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Values submitted by the apply button.
///
/// Required fields are `None` when the page held text that does not parse as
/// an integer; they go out as JSON `null`. `exposure` is omitted entirely
/// unless the page exposes that input, and is `Some(None)` when it does but
/// the text is not a number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlsPayload {
    pub exposure_absolute: Option<i64>,
    pub gain: Option<i64>,
    pub brightness: Option<i64>,
    pub exposure_auto: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_exposure",
        deserialize_with = "deserialize_exposure"
    )]
    pub exposure: Option<Option<f64>>,
}

impl ControlsPayload {
    /// Slot of an integer control; `None` for the float `exposure`.
    pub fn required_mut(&mut self, control: Control) -> Option<&mut Option<i64>> {
        match control {
            Control::ExposureAbsolute => Some(&mut self.exposure_absolute),
            Control::Gain => Some(&mut self.gain),
            Control::Brightness => Some(&mut self.brightness),
            Control::ExposureAuto => Some(&mut self.exposure_auto),
            Control::Exposure => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// Integral values are written without a fraction so `2.0` goes out as `2`.
fn serialize_exposure<S>(value: &Option<Option<f64>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value.flatten() {
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER => {
            serializer.serialize_i64(v as i64)
        }
        Some(v) if v.is_finite() => serializer.serialize_f64(v),
        _ => serializer.serialize_none(),
    }
}

fn deserialize_exposure<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

/// Answer to `GET /api/controls`. Only `raw` is consumed; the rest is kept
/// so callers can show it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlsSnapshot {
    #[serde(default)]
    pub raw: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ControlsSnapshot {
    /// Splits an arbitrary response body. Non-object bodies carry no `raw`.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };
        let raw = map.remove("raw");
        let summary = match map.remove("summary") {
            Some(Value::Object(summary)) => Some(summary),
            Some(other) => {
                map.insert("summary".to_string(), other);
                None
            }
            None => None,
        };
        Self {
            raw,
            summary,
            extra: map,
        }
    }

    /// Text for the status element, or `None` when `raw` is falsy
    /// (missing, `null`, `false`, `0` or the empty string).
    pub fn display_text(&self) -> Option<String> {
        match self.raw.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::Bool(true) => Some("true".to_string()),
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => {
                if number.as_f64().is_some_and(|v| v == 0.0) {
                    None
                } else {
                    Some(number.to_string())
                }
            }
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlOutcome {
    pub ok: bool,
    #[serde(default)]
    pub out: String,
}

/// Per-control result of `POST /api/controls`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplyReport(pub BTreeMap<String, ControlOutcome>);

impl ApplyReport {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn all_ok(&self) -> bool {
        self.0.values().all(|outcome| outcome.ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ControlOutcome)> {
        self.0
            .iter()
            .filter(|(_, outcome)| !outcome.ok)
            .map(|(name, outcome)| (name.as_str(), outcome))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub camera_opened: bool,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
