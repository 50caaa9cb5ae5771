// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::hooks::HookPhase;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("unknown unit '{name}' (known units: {known})")]
    UnknownUnit { name: String, known: String },

    #[error("{phase} hook #{index} failed: {source}")]
    Hook {
        phase: HookPhase,
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("unit failed: {0}")]
    Unit(#[source] anyhow::Error),

    #[error("unit panicked: {0}")]
    UnitPanicked(String),

    /// A second interrupt arrived while shutdown was already in progress.
    #[error("interrupted twice, forcing exit")]
    ForcedExit,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunnerError {
    /// Process exit status the binary should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::Usage(e) => e.exit_code(),
            _ => 1,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunnerError>;
