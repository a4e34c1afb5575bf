//! Tab identity and origin helpers.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Host-assigned identifier of a browser tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

impl From<i64> for TabId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Result of one recovery attempt against a tab-side counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// The probe answered on the first try.
    Reconnected,

    /// The counterpart was reinstalled and answered the re-probe.
    Reinjected,

    /// Still unreachable; another attempt will follow on the next sweep.
    Retrying {
        /// Attempts used so far.
        attempt: u32,
    },

    /// Retry ceiling exceeded; the tab is no longer tracked.
    Abandoned {
        /// Attempts used before giving up.
        attempts: u32,
    },

    /// The tab cannot host a counterpart at all (restricted scheme).
    Unrecoverable {
        /// Why the tab was rejected.
        reason: String,
    },
}

impl RecoveryOutcome {
    /// Whether the counterpart is reachable after this outcome.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Reconnected | Self::Reinjected)
    }

    /// Whether the tab was dropped from tracking.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Abandoned { .. } | Self::Unrecoverable { .. })
    }
}

/// Serialized origin (`scheme://host[:port]`) of a URL.
///
/// Returns `None` for unparsable URLs and opaque origins (`about:`, `data:`,
/// browser-internal pages).
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(origin.ascii_serialization())
}

/// Check a URL against a list of restricted scheme prefixes.
///
/// Prefixes are matched case-insensitively against the raw URL, so both
/// `"chrome://"` and `"about:"` style entries work.
pub fn is_restricted_url(url: &str, restricted_schemes: &[String]) -> bool {
    let lowered = url.trim().to_ascii_lowercase();
    restricted_schemes
        .iter()
        .any(|scheme| lowered.starts_with(&scheme.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_of_http_url() {
        assert_eq!(
            origin_of("https://example.com/articles/1?x=2").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            origin_of("http://localhost:8080/page").as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn test_origin_of_opaque_url() {
        assert_eq!(origin_of("about:blank"), None);
        assert_eq!(origin_of("not a url"), None);
    }

    #[test]
    fn test_restricted_url() {
        let schemes = vec!["chrome://".to_string(), "about:".to_string()];
        assert!(is_restricted_url("chrome://extensions", &schemes));
        assert!(is_restricted_url("ABOUT:blank", &schemes));
        assert!(!is_restricted_url("https://example.com", &schemes));
    }

    #[test]
    fn test_recovery_outcome_classification() {
        assert!(RecoveryOutcome::Reinjected.is_connected());
        assert!(!RecoveryOutcome::Retrying { attempt: 1 }.is_connected());
        assert!(RecoveryOutcome::Abandoned { attempts: 3 }.is_terminal());
    }
}
