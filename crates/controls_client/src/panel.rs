use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use shared::{
    domain::Control,
    protocol::{ControlsPayload, ControlsSnapshot},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    error::ControlsError,
    numeric::{self, NumericPolicy},
    surface::{ControlSurface, ElementIds},
    transport::ControlsApi,
};

/// Shown when the backend snapshot has no usable `raw` text.
pub const NO_DATA_PLACEHOLDER: &str = "No data";

#[derive(Debug, Clone, Default)]
pub struct PanelOptions {
    pub ids: ElementIds,
    pub numeric_policy: NumericPolicy,
    /// `None` submits `exposure` only if the page has that input when the
    /// panel is built.
    pub include_exposure: Option<bool>,
}

/// What happened to the status element after a request finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Shown(String),
    /// A later submit was issued while this request was in flight, so its
    /// answer was not displayed.
    Superseded,
}

impl StatusUpdate {
    pub fn shown(&self) -> Option<&str> {
        match self {
            StatusUpdate::Shown(text) => Some(text),
            StatusUpdate::Superseded => None,
        }
    }
}

/// Camera controls panel mounted on a [`ControlSurface`].
///
/// Each submit takes a ticket; only the answer to the most recently issued
/// submit reaches the status element. A snapshot load is dropped the same
/// way once any submit has been issued after it started.
pub struct ControlsPanel<S: ControlSurface> {
    api: Arc<dyn ControlsApi>,
    surface: Mutex<S>,
    ids: ElementIds,
    numeric_policy: NumericPolicy,
    include_exposure: bool,
    live_labels: Mutex<HashMap<String, String>>,
    apply_armed: AtomicBool,
    latest_submit: AtomicU64,
}

impl<S: ControlSurface> ControlsPanel<S> {
    pub fn new(api: Arc<dyn ControlsApi>, surface: S, options: PanelOptions) -> Self {
        let include_exposure = options
            .include_exposure
            .unwrap_or_else(|| surface.contains(options.ids.control(Control::Exposure)));
        debug!(include_exposure, "controls panel created");
        Self {
            api,
            surface: Mutex::new(surface),
            ids: options.ids,
            numeric_policy: options.numeric_policy,
            include_exposure,
            live_labels: Mutex::new(HashMap::new()),
            apply_armed: AtomicBool::new(false),
            latest_submit: AtomicU64::new(0),
        }
    }

    pub fn ids(&self) -> &ElementIds {
        &self.ids
    }

    pub fn includes_exposure(&self) -> bool {
        self.include_exposure
    }

    /// Binds the sliders, arms the apply button, then loads the snapshot.
    pub async fn initialize(&self) -> Result<StatusUpdate, ControlsError> {
        for control in Control::SLIDERS {
            self.bind_live_label(self.ids.control(control)).await;
        }

        if !self.surface.lock().await.contains(&self.ids.apply) {
            return Err(ControlsError::MissingElement(self.ids.apply.clone()));
        }
        self.apply_armed.store(true, Ordering::SeqCst);

        self.load_status().await
    }

    /// Mirrors every input on `control_id` into its `<id>_val` label. Does
    /// nothing when either element is absent.
    pub async fn bind_live_label(&self, control_id: &str) {
        let label_id = self.ids.label_for(control_id);
        {
            let surface = self.surface.lock().await;
            if !surface.contains(control_id) || !surface.contains(&label_id) {
                debug!(control_id, %label_id, "live label not bound; element missing");
                return;
            }
        }
        self.live_labels
            .lock()
            .await
            .insert(control_id.to_string(), label_id);
    }

    /// An input event: the user moved `element_id` to `value`.
    pub async fn input(&self, element_id: &str, value: &str) {
        let label_id = self.live_labels.lock().await.get(element_id).cloned();
        let mut surface = self.surface.lock().await;
        if !surface.set_value(element_id, value) {
            debug!(element_id, "input on a missing element ignored");
            return;
        }
        if let Some(label_id) = label_id {
            let current = surface.value(element_id).unwrap_or_default();
            surface.set_text(&label_id, &current);
        }
    }

    /// A click event. Only the armed apply button does anything.
    pub async fn click(&self, element_id: &str) -> Option<Result<StatusUpdate, ControlsError>> {
        if element_id != self.ids.apply || !self.apply_armed.load(Ordering::SeqCst) {
            return None;
        }
        Some(self.submit_controls().await)
    }

    /// Fetches the backend snapshot and shows its `raw` text, or
    /// [`NO_DATA_PLACEHOLDER`] when there is none.
    pub async fn load_status(&self) -> Result<StatusUpdate, ControlsError> {
        let submits_before = self.latest_submit.load(Ordering::SeqCst);
        let result = self.api.fetch_controls().await;
        let superseded = self.latest_submit.load(Ordering::SeqCst) != submits_before;

        match result {
            Ok(body) => {
                let text = ControlsSnapshot::from_value(body)
                    .display_text()
                    .unwrap_or_else(|| NO_DATA_PLACEHOLDER.to_string());
                if superseded {
                    info!("controls snapshot arrived after a submit; not displayed");
                    return Ok(StatusUpdate::Superseded);
                }
                self.show_status(&text).await;
                Ok(StatusUpdate::Shown(text))
            }
            Err(err) => {
                if !superseded {
                    self.show_error(&err).await;
                }
                Err(err)
            }
        }
    }

    /// Reads the form into a payload without sending it.
    pub async fn build_payload(&self) -> Result<ControlsPayload, ControlsError> {
        let surface = self.surface.lock().await;
        let mut payload = ControlsPayload::default();

        for control in Control::REQUIRED {
            let id = self.ids.control(control);
            let text = surface
                .value(id)
                .ok_or_else(|| ControlsError::MissingElement(id.to_string()))?;
            let value = numeric::parse_int(&text);
            if value.is_none() && self.numeric_policy == NumericPolicy::Strict {
                return Err(ControlsError::InvalidNumber { control, input: text });
            }
            if let Some(slot) = payload.required_mut(control) {
                *slot = value;
            }
        }

        if self.include_exposure {
            let id = self.ids.control(Control::Exposure);
            let text = surface
                .value(id)
                .ok_or_else(|| ControlsError::MissingElement(id.to_string()))?;
            let value = numeric::parse_float(&text);
            if self.numeric_policy == NumericPolicy::Strict && !value.is_some_and(f64::is_finite) {
                return Err(ControlsError::InvalidNumber {
                    control: Control::Exposure,
                    input: text,
                });
            }
            payload.exposure = Some(value);
        }

        Ok(payload)
    }

    /// Sends the form to the backend and shows the pretty-printed answer.
    pub async fn submit_controls(&self) -> Result<StatusUpdate, ControlsError> {
        let ticket = self.latest_submit.fetch_add(1, Ordering::SeqCst) + 1;

        let payload = match self.build_payload().await {
            Ok(payload) => payload,
            Err(err) => {
                self.show_error(&err).await;
                return Err(err);
            }
        };
        debug!(ticket, ?payload, "submitting controls");

        let result = self.api.apply_controls(&payload).await;
        let superseded = self.latest_submit.load(Ordering::SeqCst) != ticket;

        match result {
            Ok(body) => {
                if superseded {
                    info!(ticket, "stale controls response discarded");
                    return Ok(StatusUpdate::Superseded);
                }
                let text = serde_json::to_string_pretty(&body).map_err(ControlsError::Encode)?;
                self.show_status(&text).await;
                Ok(StatusUpdate::Shown(text))
            }
            Err(err) => {
                if !superseded {
                    self.show_error(&err).await;
                }
                Err(err)
            }
        }
    }

    pub async fn status_text(&self) -> Option<String> {
        self.surface.lock().await.text(&self.ids.status)
    }

    pub async fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let surface = self.surface.lock().await;
        f(&surface)
    }

    async fn show_status(&self, text: &str) {
        if !self.surface.lock().await.set_text(&self.ids.status, text) {
            warn!(status_id = %self.ids.status, "status element missing; update dropped");
        }
    }

    async fn show_error(&self, err: &ControlsError) {
        warn!(error = %err, "controls request failed");
        self.show_status(&format!("Error: {err}")).await;
    }
}

#[cfg(test)]
#[path = "tests/panel_tests.rs"]
mod tests;
