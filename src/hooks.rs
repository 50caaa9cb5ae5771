// src/hooks.rs

//! Lifecycle hooks run around every unit.
//!
//! Two ordered lists exist for the life of the launcher: before-start hooks
//! and after-stop hooks. Registration order is invocation order. Hooks run
//! strictly one after another; an async hook is awaited to completion before
//! the next hook starts. The first failing hook aborts the rest of its phase.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use crate::errors::{Result, RunnerError};
use crate::unit::{BoxFuture, UnitInfo};

type SyncHookFn = dyn Fn(&UnitInfo) -> anyhow::Result<()> + Send + Sync;
type AsyncHookFn = dyn Fn(UnitInfo) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// A callback invoked before a unit starts or after it stops.
///
/// Hooks receive the unit's [`UnitInfo`] rather than the unit itself: an
/// async unit's `main` takes the unit by value, so nothing of it is left to
/// hand to the after-stop hooks.
#[derive(Clone)]
pub enum Hook {
    Sync(Arc<SyncHookFn>),
    Async(Arc<AsyncHookFn>),
}

impl Hook {
    /// Wrap a plain closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&UnitInfo) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Hook::Sync(Arc::new(f))
    }

    /// Wrap a closure returning a future. A fresh future is created per call.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(UnitInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Hook::Async(Arc::new(
            move |info: UnitInfo| -> BoxFuture<'static, anyhow::Result<()>> { Box::pin(f(info)) },
        ))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Hook::Async(_))
    }

    async fn call(&self, info: &UnitInfo) -> anyhow::Result<()> {
        match self {
            Hook::Sync(f) => f(info),
            Hook::Async(f) => f(info.clone()).await,
        }
    }

    /// Call the hook from synchronous code. Async hooks get their own
    /// short-lived current-thread runtime.
    fn call_blocking(&self, info: &UnitInfo) -> anyhow::Result<()> {
        match self {
            Hook::Sync(f) => f(info),
            Hook::Async(f) => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .context("building runtime for async hook")?;
                runtime.block_on(f(info.clone()))
            }
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Sync(_) => f.write_str("Hook::Sync(..)"),
            Hook::Async(_) => f.write_str("Hook::Async(..)"),
        }
    }
}

/// Which side of the entry point a hook runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    BeforeStart,
    AfterStop,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::BeforeStart => f.write_str("before-start"),
            HookPhase::AfterStop => f.write_str("after-stop"),
        }
    }
}

/// Append-only registry of lifecycle hooks.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    before: Vec<Hook>,
    after: Vec<Hook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_start(&mut self, hook: Hook) {
        self.before.push(hook);
    }

    pub fn after_stop(&mut self, hook: Hook) {
        self.after.push(hook);
    }

    pub fn hooks(&self, phase: HookPhase) -> &[Hook] {
        match phase {
            HookPhase::BeforeStart => &self.before,
            HookPhase::AfterStop => &self.after,
        }
    }

    /// Await every hook of `phase` in registration order.
    pub async fn run(&self, phase: HookPhase, info: &UnitInfo) -> Result<()> {
        for (index, hook) in self.hooks(phase).iter().enumerate() {
            debug!(unit = %info.name, %phase, index, is_async = hook.is_async(), "running hook");
            hook.call(info)
                .await
                .map_err(|source| RunnerError::Hook { phase, index, source })?;
        }
        Ok(())
    }

    /// Blocking counterpart of [`HookRegistry::run`] for the sync model.
    pub fn run_blocking(&self, phase: HookPhase, info: &UnitInfo) -> Result<()> {
        for (index, hook) in self.hooks(phase).iter().enumerate() {
            debug!(unit = %info.name, %phase, index, is_async = hook.is_async(), "running hook");
            hook.call_blocking(info)
                .map_err(|source| RunnerError::Hook { phase, index, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::types::ExecutionModel;

    fn info() -> UnitInfo {
        UnitInfo {
            name: "demo".to_string(),
            model: ExecutionModel::Sync,
            replica: None,
        }
    }

    fn recording(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> Hook {
        let log = Arc::clone(log);
        Hook::from_fn(move |_| {
            log.lock().unwrap().push(label.to_string());
            Ok(())
        })
    }

    #[test]
    fn phases_are_kept_apart_and_ordered() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookRegistry::new();
        hooks.before_start(recording(&log, "b1"));
        hooks.after_stop(recording(&log, "a1"));
        hooks.before_start(recording(&log, "b2"));

        hooks.run_blocking(HookPhase::BeforeStart, &info()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["b1", "b2"]);

        hooks.run_blocking(HookPhase::AfterStop, &info()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["b1", "b2", "a1"]);
    }

    #[test]
    fn async_hook_runs_to_completion_from_sync_code() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&log);
        let mut hooks = HookRegistry::new();
        hooks.before_start(Hook::from_async(move |info: UnitInfo| {
            let log = Arc::clone(&inner);
            async move {
                tokio::task::yield_now().await;
                log.lock().unwrap().push(format!("async:{}", info.name));
                Ok(())
            }
        }));
        hooks.before_start(recording(&log, "sync"));

        hooks.run_blocking(HookPhase::BeforeStart, &info()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["async:demo", "sync"]);
    }

    #[tokio::test]
    async fn failing_hook_aborts_its_phase() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookRegistry::new();
        hooks.after_stop(recording(&log, "first"));
        hooks.after_stop(Hook::from_fn(|_| anyhow::bail!("boom")));
        hooks.after_stop(recording(&log, "never"));

        let err = hooks.run(HookPhase::AfterStop, &info()).await.unwrap_err();
        match err {
            RunnerError::Hook { phase, index, .. } => {
                assert_eq!(phase, HookPhase::AfterStop);
                assert_eq!(index, 1);
            }
            other => panic!("expected hook error, got {other:?}"),
        }
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
    }
}
