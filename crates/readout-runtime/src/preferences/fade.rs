//! Cancellable execution of volume fade ramps.

use std::sync::{Mutex, PoisonError};

use readout_core::{FadePlan, Instruction, TabId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::link::CounterpartLink;

/// Runs at most one fade ramp at a time.
///
/// Starting a ramp cancels the previous one; [`FadeRunner::cancel`] is called
/// on stop and on any direct volume change.
#[derive(Debug, Default)]
pub struct FadeRunner {
    current: Mutex<Option<CancellationToken>>,
}

impl FadeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the running ramp, if any.
    pub fn cancel(&self) {
        let current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = current {
            if !token.is_cancelled() {
                debug!("Cancelling volume fade");
                token.cancel();
            }
        }
    }

    /// Start sending the levels of `plan` to the counterpart of `tab_id`.
    pub fn start(&self, plan: FadePlan, link: CounterpartLink, tab_id: TabId) -> JoinHandle<()> {
        let token = CancellationToken::new();
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        debug!(%tab_id, from = plan.from, to = plan.to, steps = plan.steps, "Starting volume fade");
        tokio::spawn(async move {
            let levels = plan.levels();
            let last = levels.len().saturating_sub(1);
            for (i, volume) in levels.into_iter().enumerate() {
                if token.is_cancelled() {
                    return;
                }
                if let Err(e) = link.send(tab_id, Instruction::SetVolume { volume }).await {
                    warn!(%tab_id, error = %e, "Volume fade aborted");
                    return;
                }
                if i < last {
                    tokio::select! {
                        () = token.cancelled() => return,
                        () = tokio::time::sleep(plan.step_interval) => {}
                    }
                }
            }
        })
    }
}
