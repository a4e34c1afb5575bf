//! Menu reflector.
//!
//! The menu surface mirrors session and selection state:
//!
//! - "Speak selection": enabled if a selection exists AND no session is active
//! - "Stop reading": enabled while a session is active
//! - "Pause/Resume": enabled while a session is active, labelled by pause state
//!
//! Every sync re-renders all items, so repeated syncs are harmless.

use std::sync::Arc;

use readout_core::ports::menu::ids;
use readout_core::{MenuSurface, SessionSnapshot};
use tracing::{debug, warn};

pub const PAUSE_LABEL: &str = "Pause Reading";
pub const RESUME_LABEL: &str = "Resume Reading";

/// Menu state derived from session and selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuState {
    pub speak_enabled: bool,
    pub stop_enabled: bool,
    pub pause_resume_enabled: bool,
    pub pause_resume_label: &'static str,
}

impl MenuState {
    pub const fn derive(session: &SessionSnapshot, selection_present: bool) -> Self {
        Self {
            speak_enabled: selection_present && !session.is_active,
            stop_enabled: session.is_active,
            pause_resume_enabled: session.is_active,
            pause_resume_label: if session.is_active && session.is_paused {
                RESUME_LABEL
            } else {
                PAUSE_LABEL
            },
        }
    }
}

/// Pushes [`MenuState`] to the host menu surface.
pub struct MenuReflector {
    surface: Arc<dyn MenuSurface>,
}

impl MenuReflector {
    pub fn new(surface: Arc<dyn MenuSurface>) -> Self {
        Self { surface }
    }

    /// Re-render every item. Item failures are logged and do not stop the
    /// remaining items from updating.
    pub fn sync(&self, session: &SessionSnapshot, selection_present: bool) -> MenuState {
        let state = MenuState::derive(session, selection_present);
        let results = [
            self.surface
                .set_enabled(ids::SPEAK_SELECTION, state.speak_enabled),
            self.surface.set_enabled(ids::STOP_READING, state.stop_enabled),
            self.surface
                .set_enabled(ids::PAUSE_RESUME, state.pause_resume_enabled),
            self.surface
                .set_title(ids::PAUSE_RESUME, state.pause_resume_label),
        ];
        for err in results.into_iter().filter_map(Result::err) {
            warn!(error = %err, "Failed to update menu item");
        }
        debug!(?state, "Menu synced");
        state
    }
}
