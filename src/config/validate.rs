// src/config/validate.rs

use crate::cli::LogLevel;
use crate::config::model::ConfigFile;
use crate::errors::{Result, RunnerError};

pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    if cfg.launcher.poll_quantum_ms == 0 {
        return Err(RunnerError::Config(
            "launcher.poll_quantum_ms must be greater than 0".to_string(),
        ));
    }

    if let Some(level) = &cfg.log.level {
        level.parse::<LogLevel>().map_err(RunnerError::Config)?;
    }

    Ok(())
}
