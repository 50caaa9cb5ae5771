use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use runner::errors::{Result, RunnerError};
use runner::orchestrator::{Replica, ReplicaSpawner};
use runner::types::ReplicaInfo;
use runner::unit::BoxFuture;

/// Exit code a fake replica reports after honouring `terminate`.
pub const TERMINATED_CODE: i32 = 143;

/// How a fake replica behaves.
#[derive(Debug, Clone, Copy)]
pub struct FakePlan {
    /// Exit on its own after this long.
    pub exit_after: Option<Duration>,
    pub exit_code: i32,
    pub honors_terminate: bool,
}

impl FakePlan {
    pub fn runs_forever() -> Self {
        Self {
            exit_after: None,
            exit_code: 0,
            honors_terminate: true,
        }
    }

    pub fn exits_after(delay: Duration, exit_code: i32) -> Self {
        Self {
            exit_after: Some(delay),
            exit_code,
            honors_terminate: true,
        }
    }

    pub fn ignoring_terminate(mut self) -> Self {
        self.honors_terminate = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaEvent {
    Spawned {
        replica: ReplicaInfo,
        module: String,
        args: Vec<String>,
    },
    Terminated(usize),
    Killed(usize),
}

pub type Journal = Arc<Mutex<Vec<ReplicaEvent>>>;

/// Spawner producing [`FakeReplica`]s and journaling everything done to them.
#[derive(Debug, Clone)]
pub struct FakeSpawner {
    default_plan: FakePlan,
    plans: HashMap<usize, FakePlan>,
    fail_on: Option<usize>,
    journal: Journal,
}

impl FakeSpawner {
    pub fn new(default_plan: FakePlan) -> Self {
        Self {
            default_plan,
            plans: HashMap::new(),
            fail_on: None,
            journal: Journal::default(),
        }
    }

    /// Use `plan` for the replica with 1-based `index`.
    pub fn with_plan(mut self, index: usize, plan: FakePlan) -> Self {
        self.plans.insert(index, plan);
        self
    }

    /// Fail to spawn the replica with 1-based `index`.
    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    pub fn journal(&self) -> Vec<ReplicaEvent> {
        self.journal.lock().unwrap().clone()
    }
}

impl ReplicaSpawner for FakeSpawner {
    fn spawn(
        &mut self,
        replica: ReplicaInfo,
        module_name: &str,
        module_args: &[String],
    ) -> Result<Box<dyn Replica>> {
        if self.fail_on == Some(replica.index) {
            return Err(RunnerError::Config(format!("cannot spawn replica {replica}")));
        }

        self.journal.lock().unwrap().push(ReplicaEvent::Spawned {
            replica,
            module: module_name.to_string(),
            args: module_args.to_vec(),
        });

        let plan = self.plans.get(&replica.index).copied().unwrap_or(self.default_plan);
        let (exit_tx, exit_rx) = watch::channel(None);

        if let Some(delay) = plan.exit_after {
            let tx = exit_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                finish(&tx, plan.exit_code);
            });
        }

        Ok(Box::new(FakeReplica {
            info: replica,
            plan,
            exit_tx,
            exit_rx,
            journal: Arc::clone(&self.journal),
        }))
    }
}

/// Record an exit code unless the replica already exited.
fn finish(tx: &watch::Sender<Option<i32>>, code: i32) {
    tx.send_if_modified(|state| {
        if state.is_none() {
            *state = Some(code);
            true
        } else {
            false
        }
    });
}

pub struct FakeReplica {
    info: ReplicaInfo,
    plan: FakePlan,
    exit_tx: watch::Sender<Option<i32>>,
    exit_rx: watch::Receiver<Option<i32>>,
    journal: Journal,
}

impl Replica for FakeReplica {
    fn info(&self) -> ReplicaInfo {
        self.info
    }

    fn wait(&mut self) -> BoxFuture<'_, Result<Option<i32>>> {
        Box::pin(async move {
            let state = self
                .exit_rx
                .wait_for(Option::is_some)
                .await
                .map_err(anyhow::Error::from)?;
            Ok(*state)
        })
    }

    fn terminate(&mut self) -> Result<()> {
        if self.exit_rx.borrow().is_some() {
            return Ok(());
        }
        self.journal
            .lock()
            .unwrap()
            .push(ReplicaEvent::Terminated(self.info.index));
        if self.plan.honors_terminate {
            finish(&self.exit_tx, TERMINATED_CODE);
        }
        Ok(())
    }

    fn kill(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.journal
                .lock()
                .unwrap()
                .push(ReplicaEvent::Killed(self.info.index));
            finish(&self.exit_tx, -9);
            Ok(())
        })
    }
}
