use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A camera parameter the backend can adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    ExposureAbsolute,
    Gain,
    Brightness,
    ExposureAuto,
    /// Signed exposure used by the OpenCV-style backend. Optional on the page.
    Exposure,
}

impl Control {
    /// Integer controls every submit carries, in wire order.
    pub const REQUIRED: [Control; 4] = [
        Control::ExposureAbsolute,
        Control::Gain,
        Control::Brightness,
        Control::ExposureAuto,
    ];

    /// Controls rendered as sliders with a live value label.
    pub const SLIDERS: [Control; 2] = [Control::ExposureAbsolute, Control::Gain];

    pub const ALL: [Control; 5] = [
        Control::ExposureAbsolute,
        Control::Gain,
        Control::Brightness,
        Control::ExposureAuto,
        Control::Exposure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Control::ExposureAbsolute => "exposure_absolute",
            Control::Gain => "gain",
            Control::Brightness => "brightness",
            Control::ExposureAuto => "exposure_auto",
            Control::Exposure => "exposure",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown control `{0}`")]
pub struct UnknownControl(pub String);

impl FromStr for Control {
    type Err = UnknownControl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Control::ALL
            .into_iter()
            .find(|control| control.as_str() == s)
            .ok_or_else(|| UnknownControl(s.to_string()))
    }
}
