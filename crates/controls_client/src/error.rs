use shared::domain::Control;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlsError {
    #[error("invalid server url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode JSON: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("page has no element with id `{0}`")]
    MissingElement(String),
    #[error("{control} value `{input}` is not a number")]
    InvalidNumber { control: Control, input: String },
}

impl ControlsError {
    /// Whether the request never produced a response body.
    pub fn is_transport(&self) -> bool {
        matches!(self, ControlsError::Transport { .. })
    }
}
