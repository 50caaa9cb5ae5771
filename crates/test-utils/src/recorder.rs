use std::sync::{Arc, Mutex};

use runner::hooks::Hook;
use runner::unit::UnitInfo;

/// Shared, ordered log of what happened during a run.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Sync hook recording `label`.
    pub fn hook(&self, label: &'static str) -> Hook {
        let rec = self.clone();
        Hook::from_fn(move |_info: &UnitInfo| {
            rec.record(label);
            Ok(())
        })
    }

    /// Async hook that yields once and then records `label`.
    pub fn async_hook(&self, label: &'static str) -> Hook {
        let rec = self.clone();
        Hook::from_async(move |_info: UnitInfo| {
            let rec = rec.clone();
            async move {
                tokio::task::yield_now().await;
                rec.record(label);
                Ok(())
            }
        })
    }

    /// Sync hook recording `label` and then failing.
    pub fn failing_hook(&self, label: &'static str) -> Hook {
        let rec = self.clone();
        Hook::from_fn(move |_info: &UnitInfo| {
            rec.record(label);
            anyhow::bail!("{label} failed")
        })
    }
}
