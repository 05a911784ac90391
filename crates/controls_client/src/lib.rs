//! Client for a camera's `/api/controls` endpoint and the panel logic that
//! ties slider inputs, the apply button and the status display to it.

pub mod config;
pub mod error;
pub mod numeric;
pub mod panel;
pub mod surface;
pub mod transport;

pub use config::{load_settings, load_settings_from, ClientSettings};
pub use error::ControlsError;
pub use numeric::NumericPolicy;
pub use panel::{ControlsPanel, PanelOptions, StatusUpdate, NO_DATA_PLACEHOLDER};
pub use surface::{ControlSurface, ElementIds, MemorySurface};
pub use transport::{ControlsApi, HttpControlsApi};
