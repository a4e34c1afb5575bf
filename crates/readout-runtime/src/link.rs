//! Timeout-bounded adapter around the counterpart port.
//!
//! Every cross-boundary call in the runtime goes through [`CounterpartLink`],
//! so callers see one uniform shape: a future that resolves to `Ok(())` or a
//! [`ReadoutError`] within a fixed budget.

use std::sync::Arc;
use std::time::Duration;

use readout_core::{CounterpartPort, Instruction, ReadoutError, TabId};
use tracing::{debug, warn};

/// Shared handle to a tab counterpart with per-call timeouts.
#[derive(Clone)]
pub struct CounterpartLink {
    port: Arc<dyn CounterpartPort>,
    message_timeout: Duration,
}

impl CounterpartLink {
    pub fn new(port: Arc<dyn CounterpartPort>, message_timeout: Duration) -> Self {
        Self {
            port,
            message_timeout,
        }
    }

    /// Send an instruction and wait for the acknowledgement.
    pub async fn send(&self, tab_id: TabId, instruction: Instruction) -> Result<(), ReadoutError> {
        let name = instruction.name();
        debug!(%tab_id, instruction = name, "Sending instruction to counterpart");
        match tokio::time::timeout(self.message_timeout, self.port.send(tab_id, instruction)).await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(%tab_id, instruction = name, error = %e, "Counterpart rejected instruction");
                Err(e.into())
            }
            Err(_) => {
                warn!(%tab_id, instruction = name, "Counterpart did not acknowledge in time");
                Err(ReadoutError::timeout(name, self.message_timeout))
            }
        }
    }

    /// Reachability probe bounded by `budget`.
    pub async fn probe(&self, tab_id: TabId, budget: Duration) -> Result<(), ReadoutError> {
        match tokio::time::timeout(budget, self.port.probe(tab_id)).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(ReadoutError::timeout("probe", budget)),
        }
    }

    /// Reinstall the counterpart into a tab.
    pub async fn reinstall(&self, tab_id: TabId) -> Result<(), ReadoutError> {
        match tokio::time::timeout(self.message_timeout, self.port.reinstall(tab_id)).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(ReadoutError::timeout("reinstall", self.message_timeout)),
        }
    }
}

impl std::fmt::Debug for CounterpartLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterpartLink")
            .field("message_timeout", &self.message_timeout)
            .finish_non_exhaustive()
    }
}
