use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde_json::Value;
use shared::{
    error::BackendError,
    protocol::{ControlsPayload, HealthReport, CONTROLS_ROUTE, HEALTH_ROUTE},
};
use tracing::{debug, warn};
use url::Url;

use crate::{config::ClientSettings, error::ControlsError};

#[async_trait]
pub trait ControlsApi: Send + Sync {
    /// `GET /api/controls`, decoded but otherwise untouched.
    async fn fetch_controls(&self) -> Result<Value, ControlsError>;
    /// `POST /api/controls`, returning whatever JSON the backend answered.
    async fn apply_controls(&self, payload: &ControlsPayload) -> Result<Value, ControlsError>;
    async fn health(&self) -> Result<HealthReport, ControlsError>;
}

pub struct HttpControlsApi {
    http: Client,
    base_url: Url,
}

impl HttpControlsApi {
    pub fn new(server_url: &str, timeout: Option<Duration>) -> Result<Self, ControlsError> {
        let mut base_url = Url::parse(server_url).map_err(|source| ControlsError::InvalidUrl {
            url: server_url.to_string(),
            source,
        })?;
        // Routes resolve below the base path, so `http://host/camera` keeps `/camera`.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|source| ControlsError::Transport {
                url: server_url.to_string(),
                source,
            })?;
        Ok(Self { http, base_url })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ControlsError> {
        Self::new(&settings.server_url, settings.request_timeout())
    }

    fn endpoint(&self, route: &str) -> Result<Url, ControlsError> {
        self.base_url
            .join(route.trim_start_matches('/'))
            .map_err(|source| ControlsError::InvalidUrl {
                url: format!("{}{route}", self.base_url),
                source,
            })
    }

    async fn send(
        &self,
        url: &Url,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, ControlsError> {
        let response = request
            .send()
            .await
            .map_err(|source| ControlsError::Transport {
                url: url.to_string(),
                source,
            })?;
        decode_json(url, response).await
    }
}

// The body is decoded whatever the status; error answers are JSON too and
// get displayed like any other.
async fn decode_json(url: &Url, response: Response) -> Result<Value, ControlsError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|source| ControlsError::Transport {
            url: url.to_string(),
            source,
        })?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| ControlsError::Decode {
        url: url.to_string(),
        source,
    })?;

    if status.is_success() {
        debug!(%url, %status, "controls backend answered");
    } else if let Some(backend) = BackendError::from_value(&value) {
        warn!(%url, %status, error = %backend.error, "controls backend reported a device failure");
    } else {
        warn!(%url, %status, "controls backend answered with an error status");
    }
    Ok(value)
}

#[async_trait]
impl ControlsApi for HttpControlsApi {
    async fn fetch_controls(&self) -> Result<Value, ControlsError> {
        let url = self.endpoint(CONTROLS_ROUTE)?;
        self.send(&url, self.http.get(url.clone())).await
    }

    async fn apply_controls(&self, payload: &ControlsPayload) -> Result<Value, ControlsError> {
        let url = self.endpoint(CONTROLS_ROUTE)?;
        let body = payload.to_json().map_err(ControlsError::Encode)?;
        let request = self
            .http
            .post(url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
        self.send(&url, request).await
    }

    async fn health(&self) -> Result<HealthReport, ControlsError> {
        let url = self.endpoint(HEALTH_ROUTE)?;
        let value = self.send(&url, self.http.get(url.clone())).await?;
        serde_json::from_value(value).map_err(|source| ControlsError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
