//! Message handlers.
//!
//! One handler per concern, each registered under every message type it
//! owns. Handlers only translate payloads into service calls and results
//! into typed response bodies; all policy lives in the services.

mod counterpart;
mod preferences;
mod selection;
mod session;
mod status;
mod tabs;

use std::sync::Arc;

use readout_core::{ReadoutError, SourceContext, TabId, origin_of};

use crate::dispatcher::{CommandHandler, HandlerRegistry};
use crate::orchestrator::SessionOrchestrator;
use crate::recovery::RecoveryMonitor;
use crate::selection::SelectionTracker;

pub use counterpart::CounterpartHandler;
pub use preferences::{SpeedHandler, VolumeHandler};
pub use selection::SelectionHandler;
pub use session::SessionHandler;
pub use status::StatusHandler;
pub use tabs::TabHandler;

/// Services the handlers call into.
#[derive(Clone)]
pub struct HandlerDeps {
    pub orchestrator: SessionOrchestrator,
    pub selection: Arc<SelectionTracker>,
    pub recovery: Arc<RecoveryMonitor>,
}

/// Registry with every inbound message type wired up.
pub fn build_registry(deps: &HandlerDeps) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    register_all(&mut registry, SessionHandler::KINDS, SessionHandler::new(deps));
    register_all(&mut registry, SpeedHandler::KINDS, SpeedHandler::new(deps));
    register_all(&mut registry, VolumeHandler::KINDS, VolumeHandler::new(deps));
    register_all(&mut registry, SelectionHandler::KINDS, SelectionHandler::new(deps));
    register_all(&mut registry, CounterpartHandler::KINDS, CounterpartHandler::new(deps));
    register_all(&mut registry, TabHandler::KINDS, TabHandler::new(deps));
    register_all(&mut registry, StatusHandler::KINDS, StatusHandler::new(deps));
    registry
}

fn register_all<H: CommandHandler + 'static>(
    registry: &mut HandlerRegistry,
    kinds: &[&str],
    handler: H,
) {
    let handler: Arc<dyn CommandHandler> = Arc::new(handler);
    for kind in kinds {
        registry.register(kind, Arc::clone(&handler));
    }
}

/// Tab a message is about: explicit in the payload, else the sender's.
fn target_tab(explicit: Option<TabId>, source: &SourceContext) -> Result<TabId, ReadoutError> {
    explicit
        .or(source.tab_id)
        .ok_or_else(|| ReadoutError::invalid("message does not name a tab"))
}

/// Site a per-origin preference applies to: explicit, else the sender's page.
fn site_origin(explicit: Option<String>, source: &SourceContext) -> Result<String, ReadoutError> {
    let raw = explicit
        .or_else(|| source.url.clone())
        .ok_or_else(|| ReadoutError::invalid("no site given and sender has no page"))?;
    origin_of(&raw).ok_or_else(|| ReadoutError::invalid(format!("'{raw}' is not a web origin")))
}

fn unexpected(kind: &str) -> ReadoutError {
    ReadoutError::NoHandler(kind.to_string())
}

#[cfg(test)]
mod tests {
    use readout_core::protocol::message_types;

    use super::*;

    #[test]
    fn test_site_origin_prefers_explicit() {
        let source = SourceContext::counterpart(TabId(1), Some("https://a.example/x".into()));
        assert_eq!(
            site_origin(Some("https://b.example/y".into()), &source).unwrap(),
            "https://b.example"
        );
        assert_eq!(site_origin(None, &source).unwrap(), "https://a.example");
    }

    #[test]
    fn test_site_origin_requires_some_page() {
        let err = site_origin(None, &SourceContext::control(None)).unwrap_err();
        assert_eq!(err.kind(), readout_core::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_target_tab_falls_back_to_sender() {
        let source = SourceContext::control(Some(TabId(4)));
        assert_eq!(target_tab(None, &source).unwrap(), TabId(4));
        assert_eq!(target_tab(Some(TabId(9)), &source).unwrap(), TabId(9));
    }

    #[test]
    fn test_every_kind_is_owned_once() {
        let all: Vec<&str> = [
            SessionHandler::KINDS,
            SpeedHandler::KINDS,
            VolumeHandler::KINDS,
            SelectionHandler::KINDS,
            CounterpartHandler::KINDS,
            TabHandler::KINDS,
            StatusHandler::KINDS,
        ]
        .concat();
        let mut unique = all.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), all.len());
        assert_eq!(all.len(), 32);
        assert!(all.contains(&message_types::GET_STATUS));
    }
}
