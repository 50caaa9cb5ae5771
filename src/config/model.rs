// src/config/model.rs

use serde::Deserialize;

use crate::cli::LogLevel;

/// Launcher configuration as read from a TOML file.
///
/// ```toml
/// [launcher]
/// processes = 4
/// poll_quantum_ms = 10000
///
/// [log]
/// level = "debug"
/// ```
///
/// Every section and key is optional. Command-line flags win over values
/// from this file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub launcher: LauncherSection,

    #[serde(default)]
    pub log: LogSection,
}

/// `[launcher]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LauncherSection {
    /// Number of replica processes; `1` or less runs the unit in-process.
    #[serde(default = "default_processes")]
    pub processes: usize,

    /// Replica polling quantum, also used as the termination grace period.
    #[serde(default = "default_poll_quantum_ms")]
    pub poll_quantum_ms: u64,
}

fn default_processes() -> usize {
    1
}

fn default_poll_quantum_ms() -> u64 {
    10_000
}

impl Default for LauncherSection {
    fn default() -> Self {
        Self {
            processes: default_processes(),
            poll_quantum_ms: default_poll_quantum_ms(),
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSection {
    /// `error`, `warn`, `info`, `debug` or `trace`.
    #[serde(default)]
    pub level: Option<String>,
}

impl LogSection {
    /// The configured level, if set and valid.
    pub fn level(&self) -> Option<LogLevel> {
        self.level.as_deref().and_then(|s| s.parse().ok())
    }
}
