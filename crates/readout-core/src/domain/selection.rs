//! Text selection captured from a page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TabId, origin_of};

/// The most recent text selection reported by a tab.
///
/// Replaced wholesale on every selection event; never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub text: String,
    pub origin_url: Option<String>,
    pub title: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub tab_id: TabId,
}

impl Selection {
    /// Build a selection captured now.
    pub fn new(
        text: impl Into<String>,
        origin_url: Option<String>,
        title: Option<String>,
        tab_id: TabId,
    ) -> Self {
        Self {
            text: text.into(),
            origin_url,
            title,
            captured_at: Utc::now(),
            tab_id,
        }
    }

    /// Origin of the page the text came from.
    pub fn origin(&self) -> Option<String> {
        self.origin_url.as_deref().and_then(origin_of)
    }

    /// Whether the selection carries any speakable text.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
