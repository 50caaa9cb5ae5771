// src/supervisor/signals.rs

//! Interrupt delivery and the interrupt state machine.
//!
//! ## Unix
//! [`OsInterrupts`] listens for **SIGINT** (Ctrl-C) and **SIGTERM** (sent by
//! the orchestrator when tearing replicas down).
//!
//! ## Windows
//! Only [`tokio::signal::ctrl_c`] is awaited.

use tokio::sync::mpsc;

use crate::unit::BoxFuture;

/// Where a run is in its interrupt handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalState {
    /// No interrupt seen yet.
    #[default]
    Armed,
    /// First interrupt seen; cancellation requested.
    Signaled,
    /// Interrupted while already stopping. Terminal.
    Terminating,
}

/// What the run must do in response to an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Set the cancellation event and cancel the in-flight task.
    Cancel,
    /// Leave immediately with a non-zero status, skipping after-stop hooks.
    ForceExit,
}

impl SignalState {
    /// Advance on an interrupt. `stop_set` is whether the run's cancellation
    /// event has already fired, either from an earlier interrupt or because
    /// the entry point finished.
    pub fn on_interrupt(&mut self, stop_set: bool) -> SignalAction {
        if stop_set || *self != SignalState::Armed {
            *self = SignalState::Terminating;
            SignalAction::ForceExit
        } else {
            *self = SignalState::Signaled;
            SignalAction::Cancel
        }
    }
}

/// A stream of interrupt notifications.
pub trait InterruptSource: Send {
    /// Resolve on the next interrupt, or `None` once no more can arrive.
    fn recv(&mut self) -> BoxFuture<'_, Option<()>>;
}

/// Interrupts coming from the operating system.
///
/// Listeners are registered on [`OsInterrupts::install`] and released when
/// the value is dropped. Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct OsInterrupts {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
}

impl OsInterrupts {
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }
}

impl InterruptSource for OsInterrupts {
    #[cfg(unix)]
    fn recv(&mut self) -> BoxFuture<'_, Option<()>> {
        Box::pin(async move {
            tokio::select! {
                got = self.sigint.recv() => got,
                got = self.sigterm.recv() => got,
            }
        })
    }

    #[cfg(not(unix))]
    fn recv(&mut self) -> BoxFuture<'_, Option<()>> {
        Box::pin(async { tokio::signal::ctrl_c().await.ok() })
    }
}

/// Each message on the channel counts as one interrupt.
impl InterruptSource for mpsc::Receiver<()> {
    fn recv(&mut self) -> BoxFuture<'_, Option<()>> {
        Box::pin(mpsc::Receiver::recv(self))
    }
}
