// src/supervisor/context.rs

//! Per-run state for the async model.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::errors::{Result, RunnerError};
use crate::supervisor::signals::{InterruptSource, SignalAction, SignalState};

/// State of one async run: the cancellation event, the token handed to the
/// entry point, and the interrupt listener registered for this run only.
///
/// Dropping the context releases the interrupt listener.
pub struct RunContext {
    /// Set-once event the supervisor waits on. Fired by the entry point
    /// finishing or by the first interrupt.
    stop: CancellationToken,
    /// Cancellation request for the in-flight entry point.
    cancel: CancellationToken,
    state: SignalState,
    interrupts: Box<dyn InterruptSource>,
}

impl RunContext {
    pub fn new(interrupts: Box<dyn InterruptSource>) -> Self {
        Self {
            stop: CancellationToken::new(),
            cancel: CancellationToken::new(),
            state: SignalState::Armed,
            interrupts,
        }
    }

    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn state(&self) -> SignalState {
        self.state
    }

    /// Apply one interrupt to the run.
    pub fn interrupt(&mut self) -> Result<()> {
        match self.state.on_interrupt(self.stop.is_cancelled()) {
            SignalAction::Cancel => {
                warn!("interrupt received; cancelling unit");
                self.stop.cancel();
                self.cancel.cancel();
                Ok(())
            }
            SignalAction::ForceExit => {
                error!("interrupt received while stopping; forcing exit");
                Err(RunnerError::ForcedExit)
            }
        }
    }

    /// Drive `fut` to completion while reacting to interrupts.
    ///
    /// Fails with [`RunnerError::ForcedExit`] as soon as an interrupt forces
    /// exit; `fut` is dropped in that case.
    pub async fn guard<F: Future>(&mut self, fut: F) -> Result<F::Output> {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                out = &mut fut => return Ok(out),
                Some(()) = self.interrupts.recv() => self.interrupt()?,
            }
        }
    }
}
