// src/supervisor/mod.rs

//! Run supervision.
//!
//! [`Supervisor::start`] resolves a unit, runs the before-start hooks, the
//! entry point and the after-stop hooks, and logs the elapsed time.
//!
//! - Sync units are called directly. After-stop hooks run whether `main`
//!   returned, failed or panicked; the unit's failure is reported after them.
//! - Async units run on a fresh current-thread runtime. The entry point is the
//!   only spawned task and the supervisor waits on the run's cancellation
//!   event. The first interrupt sets that event and cancels the task; the
//!   supervisor still joins the task so the unit's own cleanup finishes
//!   before the after-stop hooks start. A second interrupt ends the run with
//!   [`RunnerError::ForcedExit`] without running after-stop hooks.

pub mod context;
pub mod signals;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::errors::{Result, RunnerError};
use crate::hooks::{HookPhase, HookRegistry};
use crate::pretty::pretty_time;
use crate::types::ReplicaInfo;
use crate::unit::{AsyncUnit, LoadedUnit, SyncUnit, UnitArgs, UnitInfo, UnitRegistry};

pub use context::RunContext;
pub use signals::{InterruptSource, OsInterrupts, SignalAction, SignalState};

/// Runs units from a registry with a fixed set of hooks.
#[derive(Debug, Clone, Copy)]
pub struct Supervisor<'a> {
    units: &'a UnitRegistry,
    hooks: &'a HookRegistry,
}

impl<'a> Supervisor<'a> {
    pub fn new(units: &'a UnitRegistry, hooks: &'a HookRegistry) -> Self {
        Self { units, hooks }
    }

    /// Run `unit_name` once with `module_args`.
    ///
    /// Blocks until the run is over. Must not be called from inside a Tokio
    /// runtime.
    pub fn start(
        &self,
        unit_name: &str,
        module_args: Vec<String>,
        replica: Option<ReplicaInfo>,
    ) -> Result<()> {
        let started = Instant::now();
        let description = describe(unit_name, &module_args);
        info!("Start {description}");

        let (info, unit) = self.units.load(unit_name, replica)?;
        if let Some(replica) = replica {
            info!(unit = %info.name, %replica, "running as replica");
        }

        let args = unit.prepare_args(module_args)?;

        match unit {
            LoadedUnit::Sync(unit) => self.run_sync_unit(&info, unit, args)?,
            LoadedUnit::Async(unit) => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;

                let result = runtime.block_on(async {
                    let interrupts = OsInterrupts::install()?;
                    self.run_async_unit(&info, unit, args, Box::new(interrupts))
                        .await
                });

                if matches!(result, Err(RunnerError::ForcedExit)) {
                    // The entry point may still be running; do not wait for it.
                    runtime.shutdown_background();
                }
                result?;
            }
        }

        let elapsed = started.elapsed();
        info!("Finish {description}");
        info!("elapsed {:.3}s", elapsed.as_secs_f64());
        info!("elapsed {}", pretty_time(elapsed.as_secs()));
        Ok(())
    }

    /// Sync model: before-start hooks, `main`, then after-stop hooks as
    /// guaranteed cleanup.
    pub fn run_sync_unit(
        &self,
        info: &UnitInfo,
        mut unit: Box<dyn SyncUnit>,
        args: UnitArgs,
    ) -> Result<()> {
        self.hooks.run_blocking(HookPhase::BeforeStart, info)?;

        info!(unit = %info.name, "entry point started");
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| unit.main(args))) {
            Ok(result) => result.map_err(RunnerError::Unit),
            Err(payload) => Err(RunnerError::UnitPanicked(panic_message(payload.as_ref()))),
        };
        debug!(unit = %info.name, ok = outcome.is_ok(), "entry point returned");

        let after = self.hooks.run_blocking(HookPhase::AfterStop, info);
        settle(outcome, after)
    }

    /// Async model. `interrupts` is listened to for the whole run and
    /// dropped when it ends.
    pub async fn run_async_unit(
        &self,
        info: &UnitInfo,
        unit: Box<dyn AsyncUnit>,
        args: UnitArgs,
        interrupts: Box<dyn InterruptSource>,
    ) -> Result<()> {
        let mut ctx = RunContext::new(interrupts);

        ctx.guard(self.hooks.run(HookPhase::BeforeStart, info))
            .await??;

        let outcome = if ctx.is_stopped() {
            warn!(unit = %info.name, "interrupted during before-start hooks; entry point skipped");
            Ok(())
        } else {
            let stop = ctx.stop_token();
            let entry = unit.main(args, ctx.cancel_token());
            let task = tokio::spawn(async move {
                // Fires the cancellation event however the entry point ends.
                let _stop = stop.drop_guard();
                entry.await
            });
            info!(unit = %info.name, "entry point started");

            let stopped = ctx.stop_token();
            ctx.guard(stopped.cancelled()).await?;
            debug!(unit = %info.name, state = ?ctx.state(), "cancellation event set; joining entry point");

            match ctx.guard(task).await? {
                Ok(result) => result.map_err(RunnerError::Unit),
                Err(join_err) if join_err.is_panic() => Err(RunnerError::UnitPanicked(
                    panic_message(join_err.into_panic().as_ref()),
                )),
                Err(join_err) => Err(RunnerError::Unit(anyhow::anyhow!(
                    "entry point task was aborted: {join_err}"
                ))),
            }
        };

        let after = ctx
            .guard(self.hooks.run(HookPhase::AfterStop, info))
            .await?;
        settle(outcome, after)
    }
}

/// Combine the entry point's outcome with the after-stop hooks' outcome.
/// A hook failure takes precedence; the unit failure is logged.
fn settle(outcome: Result<()>, after: Result<()>) -> Result<()> {
    match (outcome, after) {
        (outcome, Ok(())) => outcome,
        (Ok(()), Err(hook_err)) => Err(hook_err),
        (Err(unit_err), Err(hook_err)) => {
            error!(error = %unit_err, "unit failed before an after-stop hook also failed");
            Err(hook_err)
        }
    }
}

fn describe(unit_name: &str, args: &[String]) -> String {
    if args.is_empty() {
        format!("running module {unit_name}")
    } else {
        format!("running module {unit_name} {}", args.join(" "))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_prefers_hook_failure() {
        let unit = Err(RunnerError::Unit(anyhow::anyhow!("unit")));
        let hook = Err(RunnerError::Hook {
            phase: HookPhase::AfterStop,
            index: 0,
            source: anyhow::anyhow!("hook"),
        });
        assert!(matches!(settle(unit, hook), Err(RunnerError::Hook { .. })));

        let unit = Err(RunnerError::Unit(anyhow::anyhow!("unit")));
        assert!(matches!(settle(unit, Ok(())), Err(RunnerError::Unit(_))));
        assert!(settle(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn describe_joins_arguments() {
        assert_eq!(describe("echo", &[]), "running module echo");
        assert_eq!(
            describe("echo", &["a".into(), "b".into()]),
            "running module echo a b"
        );
    }

    #[test]
    fn panic_messages_are_extracted() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&7u8), "non-string panic payload");
    }
}
