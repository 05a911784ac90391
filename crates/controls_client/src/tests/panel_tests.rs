use super::*;
use std::sync::{atomic::AtomicUsize, Mutex as StdMutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::protocol::HealthReport;
use tokio::sync::Notify;

use crate::surface::MemorySurface;

#[derive(Default)]
struct RecordingApi {
    snapshot: Value,
    apply_body: Option<Value>,
    fail: bool,
    hold_first_apply: Option<Arc<Notify>>,
    hold_fetch: Option<Arc<Notify>>,
    apply_started: Notify,
    fetches: AtomicUsize,
    applied: StdMutex<Vec<ControlsPayload>>,
}

impl RecordingApi {
    fn with_snapshot(snapshot: Value) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    fn applied(&self) -> Vec<ControlsPayload> {
        self.applied.lock().expect("applied").clone()
    }

    fn decode_failure() -> ControlsError {
        ControlsError::Decode {
            url: "http://camera.local/api/controls".into(),
            source: serde_json::from_str::<Value>("<html>").expect_err("not json"),
        }
    }
}

#[async_trait]
impl ControlsApi for RecordingApi {
    async fn fetch_controls(&self) -> Result<Value, ControlsError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold_fetch {
            hold.notified().await;
        }
        if self.fail {
            return Err(Self::decode_failure());
        }
        Ok(self.snapshot.clone())
    }

    async fn apply_controls(&self, payload: &ControlsPayload) -> Result<Value, ControlsError> {
        let seq = {
            let mut applied = self.applied.lock().expect("applied");
            applied.push(payload.clone());
            applied.len()
        };
        self.apply_started.notify_one();
        if seq == 1 {
            if let Some(hold) = &self.hold_first_apply {
                hold.notified().await;
            }
        }
        if self.fail {
            return Err(Self::decode_failure());
        }
        Ok(self.apply_body.clone().unwrap_or_else(|| json!({ "seq": seq })))
    }

    async fn health(&self) -> Result<HealthReport, ControlsError> {
        Ok(HealthReport {
            camera_opened: true,
        })
    }
}

fn form_page(with_exposure: bool) -> MemorySurface {
    let mut page = MemorySurface::page_for(&ElementIds::default(), with_exposure);
    page.set_value("exposure_absolute", "100");
    page.set_value("gain", "50");
    page.set_value("brightness", "10");
    page.set_value("exposure_auto", "1");
    page
}

fn panel(api: &Arc<RecordingApi>, page: MemorySurface) -> ControlsPanel<MemorySurface> {
    ControlsPanel::new(api.clone(), page, PanelOptions::default())
}

#[tokio::test]
async fn initial_load_shows_raw_text() {
    let api = Arc::new(RecordingApi::with_snapshot(json!({ "raw": "exposure=100" })));
    let panel = panel(&api, MemorySurface::with_default_page());

    let update = panel.initialize().await.expect("initialize");

    assert_eq!(update, StatusUpdate::Shown("exposure=100".into()));
    assert_eq!(panel.status_text().await.as_deref(), Some("exposure=100"));
}

#[tokio::test]
async fn missing_raw_shows_placeholder() {
    let api = Arc::new(RecordingApi::with_snapshot(json!({})));
    let panel = panel(&api, MemorySurface::with_default_page());

    panel.load_status().await.expect("load");

    assert_eq!(panel.status_text().await.as_deref(), Some(NO_DATA_PLACEHOLDER));
}

#[tokio::test]
async fn backend_error_body_on_load_shows_placeholder() {
    let api = Arc::new(RecordingApi::with_snapshot(
        json!({ "error": "v4l2-ctl: not found" }),
    ));
    let panel = panel(&api, MemorySurface::with_default_page());

    panel.load_status().await.expect("load");

    assert_eq!(panel.status_text().await.as_deref(), Some("No data"));
}

#[tokio::test]
async fn slider_input_updates_label_without_network() {
    let api = Arc::new(RecordingApi::with_snapshot(json!({ "raw": "ok" })));
    let panel = panel(&api, MemorySurface::with_default_page());
    panel.initialize().await.expect("initialize");
    let fetches = api.fetches.load(Ordering::SeqCst);

    panel.input("exposure_absolute", "200").await;

    let label = panel
        .with_surface(|page| page.text("exposure_absolute_val"))
        .await;
    assert_eq!(label.as_deref(), Some("200"));
    assert_eq!(api.fetches.load(Ordering::SeqCst), fetches);
    assert!(api.applied().is_empty());
}

#[tokio::test]
async fn unbound_inputs_leave_labels_alone() {
    let api = Arc::new(RecordingApi::default());
    let page = MemorySurface::with_default_page()
        .without("gain_val")
        .with_element("brightness_val", "");
    let panel = panel(&api, page);
    panel.initialize().await.expect("initialize");

    panel.input("gain", "80").await;
    panel.input("brightness", "12").await;
    panel.input("no_such_slider", "1").await;

    panel
        .with_surface(|page| {
            assert_eq!(page.value("gain").as_deref(), Some("80"));
            assert_eq!(page.text("brightness_val").as_deref(), Some(""));
            assert!(!page.contains("no_such_slider"));
        })
        .await;
}

#[tokio::test]
async fn label_without_its_slider_keeps_its_text() {
    let api = Arc::new(RecordingApi::default());
    let panel = panel(&api, form_page(false).without("gain"));
    panel.initialize().await.expect("initialize");

    panel.input("gain", "80").await;

    panel
        .with_surface(|page| {
            assert!(!page.contains("gain"));
            assert_eq!(page.text("gain_val").as_deref(), Some("0"));
        })
        .await;
}

#[tokio::test]
async fn payload_without_exposure_input_has_four_fields() {
    let api = Arc::new(RecordingApi::default());
    let panel = panel(&api, form_page(false));
    assert!(!panel.includes_exposure());

    panel.submit_controls().await.expect("submit");

    let sent = api.applied();
    assert_eq!(
        sent[0].to_json().expect("encode"),
        r#"{"exposure_absolute":100,"gain":50,"brightness":10,"exposure_auto":1}"#
    );
}

#[tokio::test]
async fn payload_with_exposure_input_adds_float() {
    let api = Arc::new(RecordingApi::default());
    let mut page = form_page(true);
    page.set_value("exposure", "-3.5");
    let panel = panel(&api, page);

    panel.submit_controls().await.expect("submit");

    assert_eq!(
        api.applied()[0].to_json().expect("encode"),
        r#"{"exposure_absolute":100,"gain":50,"brightness":10,"exposure_auto":1,"exposure":-3.5}"#
    );
}

#[tokio::test]
async fn exposure_option_overrides_page_presence() {
    let api = Arc::new(RecordingApi::default());
    let panel = ControlsPanel::new(
        api.clone(),
        form_page(true),
        PanelOptions {
            include_exposure: Some(false),
            ..PanelOptions::default()
        },
    );

    panel.submit_controls().await.expect("submit");

    assert_eq!(api.applied()[0].exposure, None);
}

#[tokio::test]
async fn response_is_shown_pretty_printed_in_order() {
    let api = Arc::new(RecordingApi {
        apply_body: Some(json!({ "ok": true, "applied": { "gain": 50 } })),
        ..RecordingApi::default()
    });
    let panel = panel(&api, form_page(false));

    panel.submit_controls().await.expect("submit");

    assert_eq!(
        panel.status_text().await.as_deref(),
        Some("{\n  \"ok\": true,\n  \"applied\": {\n    \"gain\": 50\n  }\n}")
    );
}

#[tokio::test]
async fn repeated_submits_send_identical_bodies() {
    let api = Arc::new(RecordingApi::default());
    let panel = panel(&api, form_page(true));

    panel.submit_controls().await.expect("first");
    panel.submit_controls().await.expect("second");

    let sent = api.applied();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[0].to_json().expect("encode"),
        sent[1].to_json().expect("encode")
    );
}

#[tokio::test]
async fn lenient_policy_sends_unparseable_values_as_null() {
    let api = Arc::new(RecordingApi::default());
    let mut page = form_page(false);
    page.set_value("gain", "loud");
    let panel = panel(&api, page);

    panel.submit_controls().await.expect("submit");

    let body: Value = serde_json::from_str(&api.applied()[0].to_json().expect("encode"))
        .expect("json");
    assert_eq!(body["gain"], Value::Null);
    assert_eq!(body["exposure_absolute"], json!(100));
}

#[tokio::test]
async fn strict_policy_rejects_before_sending() {
    let api = Arc::new(RecordingApi::default());
    let mut page = form_page(false);
    page.set_value("brightness", "");
    let panel = ControlsPanel::new(
        api.clone(),
        page,
        PanelOptions {
            numeric_policy: NumericPolicy::Strict,
            ..PanelOptions::default()
        },
    );

    let err = panel.submit_controls().await.expect_err("invalid");

    assert!(matches!(
        err,
        ControlsError::InvalidNumber {
            control: Control::Brightness,
            ..
        }
    ));
    assert!(api.applied().is_empty());
    let status = panel.status_text().await.unwrap_or_default();
    assert!(status.starts_with("Error: brightness value"), "{status}");
}

#[tokio::test]
async fn missing_required_element_fails_submit() {
    let api = Arc::new(RecordingApi::default());
    let panel = panel(&api, form_page(false).without("exposure_auto"));

    let err = panel.submit_controls().await.expect_err("missing");

    assert!(matches!(err, ControlsError::MissingElement(id) if id == "exposure_auto"));
    assert!(api.applied().is_empty());
}

#[tokio::test]
async fn request_failures_are_shown_and_returned() {
    let api = Arc::new(RecordingApi {
        fail: true,
        ..RecordingApi::default()
    });
    let panel = panel(&api, form_page(false));

    assert!(panel.load_status().await.is_err());
    let err = panel.submit_controls().await.expect_err("failure");

    assert!(matches!(err, ControlsError::Decode { .. }));
    let status = panel.status_text().await.unwrap_or_default();
    assert!(status.starts_with("Error: response from"), "{status}");
}

#[tokio::test]
async fn clicks_only_submit_through_armed_apply_button() {
    let api = Arc::new(RecordingApi::default());
    let panel = panel(&api, form_page(false));

    assert!(panel.click("apply").await.is_none());
    panel.initialize().await.expect("initialize");
    assert!(panel.click("gain").await.is_none());
    let update = panel.click("apply").await.expect("armed").expect("submit");

    assert_eq!(update.shown(), Some("{\n  \"seq\": 1\n}"));
    assert_eq!(api.applied().len(), 1);
}

#[tokio::test]
async fn initialize_without_apply_button_skips_load() {
    let api = Arc::new(RecordingApi::default());
    let panel = panel(&api, form_page(false).without("apply"));

    let err = panel.initialize().await.expect_err("missing apply");

    assert!(matches!(err, ControlsError::MissingElement(id) if id == "apply"));
    assert_eq!(api.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_first_response_does_not_overwrite_newer_one() {
    let release = Arc::new(Notify::new());
    let api = Arc::new(RecordingApi {
        hold_first_apply: Some(release.clone()),
        ..RecordingApi::default()
    });
    let panel = Arc::new(panel(&api, form_page(false)));

    let first = tokio::spawn({
        let panel = panel.clone();
        async move { panel.submit_controls().await }
    });
    api.apply_started.notified().await;

    let second = panel.submit_controls().await.expect("second");
    release.notify_one();
    let first = first.await.expect("join").expect("first");

    assert_eq!(second.shown(), Some("{\n  \"seq\": 2\n}"));
    assert_eq!(first, StatusUpdate::Superseded);
    assert_eq!(
        panel.status_text().await.as_deref(),
        Some("{\n  \"seq\": 2\n}")
    );
}

#[tokio::test]
async fn snapshot_arriving_after_submit_is_dropped() {
    let release = Arc::new(Notify::new());
    let api = Arc::new(RecordingApi {
        snapshot: json!({ "raw": "old snapshot" }),
        hold_fetch: Some(release.clone()),
        ..RecordingApi::default()
    });
    let panel = Arc::new(panel(&api, form_page(false)));

    let load = tokio::spawn({
        let panel = panel.clone();
        async move { panel.load_status().await }
    });
    while api.fetches.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    panel.submit_controls().await.expect("submit");
    release.notify_one();
    let load = load.await.expect("join").expect("load");

    assert_eq!(load, StatusUpdate::Superseded);
    assert_eq!(
        panel.status_text().await.as_deref(),
        Some("{\n  \"seq\": 1\n}")
    );
}
