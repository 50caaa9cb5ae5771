use std::fmt;

use tracing::warn;

use crate::errors::{Result, RunnerError};

/// Environment variable carrying the 1-based replica index.
pub const PROCESS_ID_ENV: &str = "PROCESS_ID";

/// Environment variable carrying the total number of replicas.
pub const PROCESS_COUNT_ENV: &str = "PROCESS_COUNT";

/// How a unit's entry point is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionModel {
    /// Called directly on the supervising thread.
    Sync,
    /// Spawned as a task on a single-threaded Tokio runtime with cooperative
    /// cancellation.
    Async,
}

impl fmt::Display for ExecutionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionModel::Sync => f.write_str("sync"),
            ExecutionModel::Async => f.write_str("async"),
        }
    }
}

/// Identity of one replica in an N-way fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplicaInfo {
    /// 1-based index, `1..=count`.
    pub index: usize,
    pub count: usize,
}

impl ReplicaInfo {
    pub fn new(index: usize, count: usize) -> Self {
        Self { index, count }
    }

    /// Read the replica identity published by the orchestrator.
    ///
    /// Returns `Ok(None)` for a standalone run: neither variable is set, or
    /// only one of them is (a leftover from the caller's environment, which
    /// is ignored with a warning). Malformed values are an error.
    pub fn from_env() -> Result<Option<Self>> {
        let index = std::env::var(PROCESS_ID_ENV).ok();
        let count = std::env::var(PROCESS_COUNT_ENV).ok();
        Self::from_values(index.as_deref(), count.as_deref())
    }

    fn from_values(index: Option<&str>, count: Option<&str>) -> Result<Option<Self>> {
        let (index, count) = match (index, count) {
            (None, None) => return Ok(None),
            (Some(i), Some(c)) => (i, c),
            _ => {
                warn!(
                    "only one of {PROCESS_ID_ENV} and {PROCESS_COUNT_ENV} is set; running standalone"
                );
                return Ok(None);
            }
        };

        let parse = |name: &str, value: &str| {
            value.trim().parse::<usize>().map_err(|_| {
                RunnerError::Config(format!("{name} must be a positive integer, got {value:?}"))
            })
        };
        let index = parse(PROCESS_ID_ENV, index)?;
        let count = parse(PROCESS_COUNT_ENV, count)?;

        if index == 0 || index > count {
            return Err(RunnerError::Config(format!(
                "{PROCESS_ID_ENV}={index} is outside 1..={count}"
            )));
        }

        Ok(Some(Self { index, count }))
    }

    /// Key/value pairs to publish into a replica's environment.
    pub fn env_pairs(&self) -> [(&'static str, String); 2] {
        [
            (PROCESS_ID_ENV, self.index.to_string()),
            (PROCESS_COUNT_ENV, self.count.to_string()),
        ]
    }
}

impl fmt::Display for ReplicaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_when_nothing_is_set() {
        assert_eq!(ReplicaInfo::from_values(None, None).unwrap(), None);
    }

    #[test]
    fn reads_both_values() {
        let info = ReplicaInfo::from_values(Some("2"), Some("4")).unwrap();
        assert_eq!(info, Some(ReplicaInfo::new(2, 4)));
    }

    #[test]
    fn partial_identity_means_standalone() {
        assert_eq!(ReplicaInfo::from_values(Some("1"), None).unwrap(), None);
        assert_eq!(ReplicaInfo::from_values(None, Some("4")).unwrap(), None);
    }

    #[test]
    fn rejects_malformed_identity() {
        assert!(ReplicaInfo::from_values(Some("x"), Some("2")).is_err());
        assert!(ReplicaInfo::from_values(Some("0"), Some("2")).is_err());
        assert!(ReplicaInfo::from_values(Some("3"), Some("2")).is_err());
    }

    #[test]
    fn env_pairs_are_stringified() {
        let pairs = ReplicaInfo::new(3, 5).env_pairs();
        assert_eq!(pairs[0], (PROCESS_ID_ENV, "3".to_string()));
        assert_eq!(pairs[1], (PROCESS_COUNT_ENV, "5".to_string()));
    }
}
