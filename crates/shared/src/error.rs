use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body the backend answers with when the device tool itself fails,
/// e.g. `{"error": "[Errno 2] No such file or directory: 'v4l2-ctl'"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendError {
    pub error: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    /// Picks the error out of an otherwise opaque response body.
    pub fn from_value(value: &Value) -> Option<Self> {
        value
            .get("error")
            .and_then(Value::as_str)
            .map(|message| Self::new(message))
    }
}
