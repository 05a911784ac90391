use std::{collections::HashMap, fs, path::Path, time::Duration};

use toml::{Table, Value};
use tracing::warn;

use crate::{numeric::NumericPolicy, panel::PanelOptions, surface::ElementIds};

pub const DEFAULT_SETTINGS_FILE: &str = "camctl.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub server_url: String,
    pub request_timeout_secs: Option<u64>,
    pub numeric_policy: NumericPolicy,
    pub include_exposure: Option<bool>,
    pub elements: ElementIds,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            request_timeout_secs: None,
            numeric_policy: NumericPolicy::Lenient,
            include_exposure: None,
            elements: ElementIds::default(),
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn panel_options(&self) -> PanelOptions {
        PanelOptions {
            ids: self.elements.clone(),
            numeric_policy: self.numeric_policy,
            include_exposure: self.include_exposure,
        }
    }

    // Each key is read on its own; a bad value is logged and skipped.
    fn apply_file(&mut self, raw: &str) {
        let file_cfg = match raw.parse::<Table>() {
            Ok(file_cfg) => file_cfg,
            Err(error) => {
                warn!(%error, "ignoring unreadable settings file");
                return;
            }
        };

        if let Some(v) = file_cfg.get("server_url") {
            match v.as_str() {
                Some(url) => self.server_url = url.to_string(),
                None => warn!(value = %v, "ignoring server_url"),
            }
        }

        if let Some(v) = file_cfg.get("request_timeout_secs") {
            let parsed = match v {
                Value::Integer(secs) => u64::try_from(*secs).ok(),
                Value::String(secs) => secs.trim().parse::<u64>().ok(),
                _ => None,
            };
            match parsed {
                Some(secs) => self.request_timeout_secs = Some(secs),
                None => warn!(value = %v, "ignoring request_timeout_secs"),
            }
        }

        if let Some(v) = file_cfg.get("numeric_policy") {
            match v.as_str().map(str::parse::<NumericPolicy>) {
                Some(Ok(policy)) => self.numeric_policy = policy,
                _ => warn!(value = %v, "ignoring numeric_policy"),
            }
        }

        if let Some(v) = file_cfg.get("include_exposure") {
            let parsed = match v {
                Value::Boolean(include) => Some(Some(*include)),
                Value::String(include) => parse_include_exposure(include),
                _ => None,
            };
            match parsed {
                Some(include) => self.include_exposure = include,
                None => warn!(value = %v, "ignoring include_exposure"),
            }
        }

        if let Some(v) = file_cfg.get("elements") {
            let Some(table) = v.as_table() else {
                warn!(value = %v, "ignoring elements; expected a table");
                return;
            };
            let mut overrides = HashMap::new();
            for (name, id) in table {
                match id.as_str() {
                    Some(id) => {
                        overrides.insert(name.clone(), id.to_string());
                    }
                    None => warn!(%name, value = %id,"ignoring element mapping"),
                }
            }
            self.elements.apply_overrides(&overrides);
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("CAMCTL_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = var("APP__SERVER_URL") {
            self.server_url = v;
        }

        if let Some(v) = var("CAMCTL_REQUEST_TIMEOUT_SECS") {
            match v.trim().parse::<u64>() {
                Ok(parsed) => self.request_timeout_secs = Some(parsed),
                Err(_) => warn!(value = %v, "ignoring CAMCTL_REQUEST_TIMEOUT_SECS"),
            }
        }

        if let Some(v) = var("CAMCTL_NUMERIC_POLICY") {
            match v.parse() {
                Ok(policy) => self.numeric_policy = policy,
                Err(error) => warn!(%error, "ignoring CAMCTL_NUMERIC_POLICY"),
            }
        }

        if let Some(v) = var("CAMCTL_INCLUDE_EXPOSURE") {
            match parse_include_exposure(&v) {
                Some(include) => self.include_exposure = include,
                None => warn!(value = %v, "ignoring CAMCTL_INCLUDE_EXPOSURE"),
            }
        }
    }
}

// `Some(None)` is the explicit "auto" setting.
fn parse_include_exposure(raw: &str) -> Option<Option<bool>> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(Some(true)),
        "0" | "false" | "no" => Some(Some(false)),
        "auto" | "" => Some(None),
        _ => None,
    }
}

/// Defaults, then `./camctl.toml`, then environment variables.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

/// Like [`load_settings`] with an explicit settings file. A missing file is
/// not an error.
pub fn load_settings_from(path: &Path) -> ClientSettings {
    settings_with(path, |key| std::env::var(key).ok())
}

fn settings_with(path: &Path, var: impl Fn(&str) -> Option<String>) -> ClientSettings {
    let mut settings = ClientSettings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        settings.apply_file(&raw);
    }
    settings.apply_env(var);
    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
