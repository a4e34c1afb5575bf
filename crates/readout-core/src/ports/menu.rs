//! Menu reflection surface (the host's context menu).

use thiserror::Error;

/// Menu item IDs.
pub mod ids {
    pub const SPEAK_SELECTION: &str = "speak_selection";
    pub const STOP_READING: &str = "stop_reading";
    pub const PAUSE_RESUME: &str = "pause_resume";
}

/// Failure to update a menu item.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Menu item '{item}' update failed: {message}")]
pub struct MenuSurfaceError {
    pub item: String,
    pub message: String,
}

/// A secondary control surface with enable-able, titled items.
pub trait MenuSurface: Send + Sync {
    /// Enable or disable an item.
    fn set_enabled(&self, item: &str, enabled: bool) -> Result<(), MenuSurfaceError>;

    /// Change an item's label.
    fn set_title(&self, item: &str, title: &str) -> Result<(), MenuSurfaceError>;
}
