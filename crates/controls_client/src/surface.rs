use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use shared::domain::Control;
use tracing::warn;

pub const DEFAULT_STATUS_ID: &str = "status";
pub const DEFAULT_APPLY_ID: &str = "apply";
pub const DEFAULT_LABEL_SUFFIX: &str = "_val";

/// Element ids the panel reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementIds {
    controls: BTreeMap<Control, String>,
    pub status: String,
    pub apply: String,
    pub label_suffix: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            controls: Control::ALL
                .into_iter()
                .map(|control| (control, control.as_str().to_string()))
                .collect(),
            status: DEFAULT_STATUS_ID.into(),
            apply: DEFAULT_APPLY_ID.into(),
            label_suffix: DEFAULT_LABEL_SUFFIX.into(),
        }
    }
}

impl ElementIds {
    pub fn control(&self, control: Control) -> &str {
        self.controls
            .get(&control)
            .map(String::as_str)
            .unwrap_or_else(|| control.as_str())
    }

    pub fn label_for(&self, element_id: &str) -> String {
        format!("{element_id}{}", self.label_suffix)
    }

    pub fn control_for_element(&self, element_id: &str) -> Option<Control> {
        self.controls
            .iter()
            .find(|(_, id)| id.as_str() == element_id)
            .map(|(control, _)| *control)
    }

    pub fn set_control(&mut self, control: Control, element_id: impl Into<String>) {
        self.controls.insert(control, element_id.into());
    }

    /// Applies a `name -> id` table, e.g. the `[elements]` section of the
    /// settings file. Returns the names that matched nothing.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut unknown = Vec::new();
        for (name, id) in overrides {
            match name.as_str() {
                "status" => self.status = id.clone(),
                "apply" => self.apply = id.clone(),
                "label_suffix" => self.label_suffix = id.clone(),
                other => match other.parse::<Control>() {
                    Ok(control) => self.set_control(control, id.clone()),
                    Err(_) => {
                        warn!(name = other, "ignoring unknown element mapping");
                        unknown.push(other.to_string());
                    }
                },
            }
        }
        unknown.sort();
        unknown
    }
}

/// The page the panel is mounted on.
pub trait ControlSurface: Send {
    fn contains(&self, id: &str) -> bool;
    /// Current value of an input element.
    fn value(&self, id: &str) -> Option<String>;
    /// Returns `false` when there is no such element.
    fn set_value(&mut self, id: &str, value: &str) -> bool;
    fn text(&self, id: &str) -> Option<String>;
    /// Replaces the text content. Returns `false` when there is no such element.
    fn set_text(&mut self, id: &str, text: &str) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Element {
    value: String,
    text: String,
}

/// A page held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    elements: BTreeMap<String, Element>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every element the panel knows about, labels included, with the
    /// optional exposure input present.
    pub fn with_default_page() -> Self {
        Self::page_for(&ElementIds::default(), true)
    }

    pub fn page_for(ids: &ElementIds, with_exposure: bool) -> Self {
        let mut page = Self::new()
            .with_element(&ids.status, "")
            .with_element(&ids.apply, "");
        for control in Control::ALL {
            if control == Control::Exposure && !with_exposure {
                continue;
            }
            let value = initial_value(control);
            let id = ids.control(control);
            page = page.with_element(id, value);
            if Control::SLIDERS.contains(&control) {
                let label = ids.label_for(id);
                page = page.with_element(&label, "");
                page.set_text(&label, value);
            }
        }
        page
    }

    pub fn with_element(mut self, id: &str, value: &str) -> Self {
        self.insert(id, value);
        self
    }

    pub fn without(mut self, id: &str) -> Self {
        self.elements.remove(id);
        self
    }

    pub fn insert(&mut self, id: &str, value: &str) {
        self.elements.insert(
            id.to_string(),
            Element {
                value: value.to_string(),
                text: String::new(),
            },
        );
    }
}

fn initial_value(control: Control) -> &'static str {
    match control {
        Control::ExposureAbsolute => "156",
        Control::Gain => "0",
        Control::Brightness => "0",
        Control::ExposureAuto => "3",
        Control::Exposure => "-6",
    }
}

impl ControlSurface for MemorySurface {
    fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    fn value(&self, id: &str) -> Option<String> {
        self.elements.get(id).map(|element| element.value.clone())
    }

    fn set_value(&mut self, id: &str, value: &str) -> bool {
        match self.elements.get_mut(id) {
            Some(element) => {
                element.value = value.to_string();
                true
            }
            None => false,
        }
    }

    fn text(&self, id: &str) -> Option<String> {
        self.elements.get(id).map(|element| element.text.clone())
    }

    fn set_text(&mut self, id: &str, text: &str) -> bool {
        match self.elements.get_mut(id) {
            Some(element) => {
                element.text = text.to_string();
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for MemorySurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, element) in &self.elements {
            match (element.value.is_empty(), element.text.is_empty()) {
                (true, true) => writeln!(f, "#{id}")?,
                (false, true) => writeln!(f, "#{id} value={}", element.value)?,
                (true, false) => writeln!(f, "#{id} text={:?}", element.text)?,
                (false, false) => writeln!(
                    f,
                    "#{id} value={} text={:?}",
                    element.value, element.text
                )?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/surface_tests.rs"]
mod tests;
