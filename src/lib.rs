// src/lib.rs

pub mod argv;
pub mod builtin;
pub mod cli;
pub mod config;
pub mod errors;
pub mod hooks;
pub mod logging;
pub mod orchestrator;
pub mod pretty;
pub mod supervisor;
pub mod types;
pub mod unit;

use tracing::{info, warn};

use crate::cli::Invocation;
use crate::errors::{Result, RunnerError};
use crate::hooks::{Hook, HookRegistry};
use crate::orchestrator::{CommandSpawner, Orchestrator};
use crate::supervisor::{OsInterrupts, Supervisor};
use crate::types::ReplicaInfo;
use crate::unit::{LoadedUnit, UnitContext, UnitRegistry, resolve_unit_name};

/// Registered units and lifecycle hooks for this process.
///
/// Build one at startup, then hand it an [`Invocation`]:
///
/// ```no_run
/// use runner::{Launcher, cli::Invocation, hooks::Hook};
///
/// let launcher = Launcher::new()
///     .with_builtin_units()
///     .before_start(Hook::from_fn(|unit| {
///         println!("starting {}", unit.name);
///         Ok(())
///     }));
/// let invocation = Invocation::parse_from(["runner", "echo", "hi"]).unwrap();
/// launcher.run(&invocation).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Launcher {
    units: UnitRegistry,
    hooks: HookRegistry,
}

impl Launcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the units from [`builtin`].
    pub fn with_builtin_units(mut self) -> Self {
        builtin::register(&mut self.units);
        self
    }

    pub fn unit<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&UnitContext) -> anyhow::Result<LoadedUnit> + Send + Sync + 'static,
    {
        self.units.register(name, factory);
        self
    }

    pub fn before_start(mut self, hook: Hook) -> Self {
        self.hooks.before_start(hook);
        self
    }

    pub fn after_stop(mut self, hook: Hook) -> Self {
        self.hooks.after_stop(hook);
        self
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn supervisor(&self) -> Supervisor<'_> {
        Supervisor::new(&self.units, &self.hooks)
    }

    /// Run one unit in this process. See [`Supervisor::start`].
    pub fn start(
        &self,
        unit_name: &str,
        module_args: Vec<String>,
        replica: Option<ReplicaInfo>,
    ) -> Result<()> {
        self.supervisor().start(unit_name, module_args, replica)
    }

    /// High-level entry point used by `main.rs`.
    ///
    /// With one process the unit runs in-process, picking up a replica
    /// identity from the environment if this process is itself a replica.
    /// With more, the current executable is re-run once per replica; an
    /// interrupt to the launcher stops every replica and a second one forces
    /// exit.
    pub fn run(&self, invocation: &Invocation) -> Result<()> {
        let processes = invocation.processes();
        let module_name = invocation.module_name();

        if processes <= 1 {
            let replica = ReplicaInfo::from_env()?;
            return self.start(module_name, invocation.module_args.clone(), replica);
        }

        if !self.units.contains(module_name) {
            return Err(RunnerError::UnknownUnit {
                name: resolve_unit_name(module_name),
                known: self.units.names().collect::<Vec<_>>().join(", "),
            });
        }

        let spawner = CommandSpawner::current_exe()?.args(invocation.replica_args());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        runtime.block_on(async {
            let interrupts = OsInterrupts::install()?;
            let mut orchestrator = Orchestrator::new(spawner, invocation.poll_quantum())
                .with_interrupts(Box::new(interrupts));
            let report = orchestrator
                .run(processes, module_name, &invocation.module_args)
                .await?;

            if report.interrupted {
                warn!("replicas stopped on interrupt");
            }
            for exit in &report.exits {
                info!(
                    replica = %exit.replica,
                    exit_code = ?exit.code,
                    forced = exit.forced,
                    "replica finished"
                );
            }
            Ok::<(), RunnerError>(())
        })
    }
}
