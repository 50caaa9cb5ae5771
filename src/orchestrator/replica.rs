// src/orchestrator/replica.rs

//! Replica process abstraction.
//!
//! The orchestrator talks to [`Replica`] / [`ReplicaSpawner`] instead of
//! `tokio::process` directly, so tests can drive it with fake replicas while
//! production uses [`CommandSpawner`] and [`ChildReplica`].

use std::path::PathBuf;

use anyhow::Context;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::errors::Result;
use crate::types::ReplicaInfo;
use crate::unit::BoxFuture;

/// One running replica.
pub trait Replica: Send {
    fn info(&self) -> ReplicaInfo;

    /// Wait for the replica to exit and return its exit code (`None` when it
    /// was ended by a signal). Must be cancel safe and may be called again
    /// after the replica has exited.
    fn wait(&mut self) -> BoxFuture<'_, Result<Option<i32>>>;

    /// Ask the replica to shut down. A no-op once it has exited.
    fn terminate(&mut self) -> Result<()>;

    /// Force the replica down and reap it.
    fn kill(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Starts replicas.
pub trait ReplicaSpawner {
    fn spawn(
        &mut self,
        replica: ReplicaInfo,
        module_name: &str,
        module_args: &[String],
    ) -> Result<Box<dyn Replica>>;
}

/// A replica backed by an OS child process.
#[derive(Debug)]
pub struct ChildReplica {
    info: ReplicaInfo,
    child: Child,
}

impl ChildReplica {
    pub fn new(info: ReplicaInfo, child: Child) -> Self {
        Self { info, child }
    }
}

impl Replica for ChildReplica {
    fn info(&self) -> ReplicaInfo {
        self.info
    }

    fn wait(&mut self) -> BoxFuture<'_, Result<Option<i32>>> {
        Box::pin(async move {
            let status = self
                .child
                .wait()
                .await
                .with_context(|| format!("waiting for replica {}", self.info))?;
            Ok(status.code())
        })
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        // `id()` is `None` once the child has been reaped.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };

        debug!(replica = %self.info, pid, "sending SIGTERM");
        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(std::io::Error::from(errno).into()),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<()> {
        if self.child.id().is_some() {
            self.child.start_kill()?;
        }
        Ok(())
    }

    fn kill(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.child
                .kill()
                .await
                .with_context(|| format!("killing replica {}", self.info))?;
            Ok(())
        })
    }
}

/// Spawns each replica as `<program> <leading args> <module_name> <module_args>`
/// with the replica identity in its environment.
#[derive(Debug, Clone)]
pub struct CommandSpawner {
    program: PathBuf,
    leading_args: Vec<String>,
}

impl CommandSpawner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Re-execute the running binary.
    pub fn current_exe() -> Result<Self> {
        let exe = std::env::current_exe().context("locating the current executable")?;
        Ok(Self::new(exe))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.leading_args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl ReplicaSpawner for CommandSpawner {
    fn spawn(
        &mut self,
        replica: ReplicaInfo,
        module_name: &str,
        module_args: &[String],
    ) -> Result<Box<dyn Replica>> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg(module_name)
            .args(module_args)
            .kill_on_drop(true);

        // Terminal interrupts reach only the launcher, which forwards a single
        // termination request to each replica.
        #[cfg(unix)]
        cmd.process_group(0);

        for (key, value) in replica.env_pairs() {
            cmd.env(key, value);
        }

        let child = cmd.spawn().with_context(|| {
            format!("spawning replica {replica} with {:?}", self.program)
        })?;

        info!(%replica, pid = ?child.id(), "replica started");
        Ok(Box::new(ChildReplica::new(replica, child)))
    }
}
