// src/orchestrator/mod.rs

//! N-way process fan-out.
//!
//! Replicas `1..=N` are started up front and polled round-robin, each for at
//! most one quantum. As soon as any replica is seen to have exited, every
//! replica is asked to terminate, given up to one quantum to do so, and
//! killed if it is still running. There is no restart and no distinction
//! between a crash and a clean exit.
//!
//! With an interrupt source attached, the first interrupt starts the same
//! teardown. An interrupt during teardown ends the run with
//! [`RunnerError::ForcedExit`]; replicas still running are killed when they
//! are dropped.

pub mod replica;

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, RunnerError};
use crate::supervisor::{InterruptSource, SignalState};
use crate::types::ReplicaInfo;

pub use replica::{ChildReplica, CommandSpawner, Replica, ReplicaSpawner};

/// Default polling quantum (also the per-replica termination grace period).
pub const DEFAULT_POLL_QUANTUM: Duration = Duration::from_secs(10);

/// How one replica ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaExit {
    pub replica: ReplicaInfo,
    /// Exit code, `None` when ended by a signal or when waiting failed.
    pub code: Option<i32>,
    /// Whether the replica had to be killed after ignoring termination.
    pub forced: bool,
}

#[derive(Debug, Clone)]
pub struct OrchestratorReport {
    /// The replica whose exit triggered the teardown. `None` when an
    /// interrupt triggered it.
    pub first_exit: Option<ReplicaInfo>,
    pub interrupted: bool,
    /// Every replica, in index order.
    pub exits: Vec<ReplicaExit>,
}

/// Result of one bounded wait on a replica.
enum Polled {
    Exited(Option<i32>),
    Lost(RunnerError),
    Running,
    Interrupted,
    InterruptsClosed,
}

pub struct Orchestrator<S> {
    spawner: S,
    quantum: Duration,
    interrupts: Option<Box<dyn InterruptSource>>,
    state: SignalState,
}

impl<S: ReplicaSpawner> Orchestrator<S> {
    pub fn new(spawner: S, quantum: Duration) -> Self {
        Self {
            spawner,
            quantum,
            interrupts: None,
            state: SignalState::Armed,
        }
    }

    /// Stop the replicas when `interrupts` fires.
    pub fn with_interrupts(mut self, interrupts: Box<dyn InterruptSource>) -> Self {
        self.interrupts = Some(interrupts);
        self
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Start `count` replicas of `module_name` and run them until the first
    /// one exits or an interrupt arrives, then tear all of them down.
    pub async fn run(
        &mut self,
        count: usize,
        module_name: &str,
        module_args: &[String],
    ) -> Result<OrchestratorReport> {
        info!(count, module = module_name, "starting replicas");

        let mut replicas: Vec<Box<dyn Replica>> = Vec::with_capacity(count);
        for index in 1..=count {
            let info = ReplicaInfo::new(index, count);
            match self.spawner.spawn(info, module_name, module_args) {
                Ok(replica) => replicas.push(replica),
                Err(err) => {
                    error!(replica = %info, error = %err, "failed to start replica; tearing down");
                    if let Err(shutdown_err) = self.shutdown(&mut replicas).await {
                        warn!(error = %shutdown_err, "teardown after failed start was cut short");
                    }
                    return Err(err);
                }
            }
        }

        let first_exit = self.supervise(&mut replicas).await;
        let exits = self.shutdown(&mut replicas).await?;

        info!(?first_exit, "all replicas stopped");
        Ok(OrchestratorReport {
            first_exit,
            interrupted: first_exit.is_none(),
            exits,
        })
    }

    /// Poll replicas round-robin until one is no longer alive (`Some`) or an
    /// interrupt arrives (`None`).
    async fn supervise(&mut self, replicas: &mut [Box<dyn Replica>]) -> Option<ReplicaInfo> {
        loop {
            for replica in replicas.iter_mut() {
                let info = replica.info();
                match self.wait_bounded(replica).await {
                    Polled::Exited(code) => {
                        info!(replica = %info, exit_code = ?code, "replica exited; stopping all replicas");
                        return Some(info);
                    }
                    Polled::Lost(err) => {
                        warn!(replica = %info, error = %err, "lost track of replica; stopping all replicas");
                        return Some(info);
                    }
                    Polled::Running => debug!(replica = %info, "replica still running"),
                    Polled::Interrupted => {
                        self.state.on_interrupt(false);
                        warn!("interrupt received; stopping all replicas");
                        return None;
                    }
                    Polled::InterruptsClosed => self.interrupts = None,
                }
            }
        }
    }

    /// Terminate every replica, wait up to one quantum for each, and kill
    /// whatever is left.
    async fn shutdown(&mut self, replicas: &mut [Box<dyn Replica>]) -> Result<Vec<ReplicaExit>> {
        for replica in replicas.iter_mut() {
            if let Err(err) = replica.terminate() {
                warn!(replica = %replica.info(), error = %err, "failed to send termination request");
            }
        }

        let mut exits = Vec::with_capacity(replicas.len());
        for replica in replicas.iter_mut() {
            let info = replica.info();
            let exit = loop {
                match self.wait_bounded(replica).await {
                    Polled::Exited(code) => {
                        break ReplicaExit {
                            replica: info,
                            code,
                            forced: false,
                        };
                    }
                    Polled::Lost(err) => {
                        warn!(replica = %info, error = %err, "failed waiting for replica to stop");
                        break ReplicaExit {
                            replica: info,
                            code: None,
                            forced: false,
                        };
                    }
                    Polled::Running => {
                        warn!(replica = %info, "replica ignored termination request; killing");
                        if let Err(err) = replica.kill().await {
                            error!(replica = %info, error = %err, "failed to kill replica");
                        }
                        break ReplicaExit {
                            replica: info,
                            code: None,
                            forced: true,
                        };
                    }
                    Polled::Interrupted => {
                        self.state.on_interrupt(true);
                        error!("interrupt received while stopping replicas; forcing exit");
                        return Err(RunnerError::ForcedExit);
                    }
                    Polled::InterruptsClosed => self.interrupts = None,
                }
            };
            debug!(?exit, "replica stopped");
            exits.push(exit);
        }
        Ok(exits)
    }

    /// Wait up to one quantum for `replica`, watching for interrupts.
    async fn wait_bounded(&mut self, replica: &mut Box<dyn Replica>) -> Polled {
        let quantum = self.quantum;
        tokio::select! {
            polled = timeout(quantum, replica.wait()) => match polled {
                Ok(Ok(code)) => Polled::Exited(code),
                Ok(Err(err)) => Polled::Lost(err),
                Err(_) => Polled::Running,
            },
            got = next_interrupt(&mut self.interrupts) => match got {
                Some(()) => Polled::Interrupted,
                None => Polled::InterruptsClosed,
            },
        }
    }
}

async fn next_interrupt(interrupts: &mut Option<Box<dyn InterruptSource>>) -> Option<()> {
    match interrupts {
        Some(source) => source.recv().await,
        None => std::future::pending().await,
    }
}
