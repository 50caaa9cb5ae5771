// src/cli.rs

//! Command-line parsing using `clap`.
//!
//! The raw argument vector is first cut in two by [`split_argv`]; only the
//! launcher half (plus the module name) is given to clap, so module
//! arguments pass through untouched even when they look like flags.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::argv::split_argv;
use crate::config::{ConfigFile, load_and_validate};
use crate::errors::Result;

/// Launcher flags.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runner",
    version,
    about = "Load a unit of work by name and run it, optionally replicated across processes.",
    long_about = None
)]
pub struct CliArgs {
    /// Number of replica processes. 1 (default) runs the unit in-process.
    #[arg(short, long, value_name = "N")]
    pub processes: Option<usize>,

    /// Path to a launcher config file (TOML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNNER_LOG`, the config file or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Replica polling quantum in milliseconds (default 10000).
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_quantum_ms: Option<u64>,

    /// Unit name or unit source file.
    pub module_name: String,
}

/// Log level as exposed on the CLI and in the config file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "invalid log level: {other} (expected error, warn, info, debug or trace)"
            )),
        }
    }
}

/// A fully parsed command line: launcher flags, the unit to run, its
/// arguments and the loaded config file.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub cli: CliArgs,
    pub module_args: Vec<String>,
    pub config: ConfigFile,
}

impl Invocation {
    /// Parse a full argument vector, program name first.
    pub fn parse_from<I, S>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next().unwrap_or_else(|| "runner".to_string());

        let (launcher_args, mut module_args) = split_argv(argv);
        let module_name = if module_args.is_empty() {
            None
        } else {
            Some(module_args.remove(0))
        };

        let cli = CliArgs::try_parse_from(
            std::iter::once(program)
                .chain(launcher_args)
                .chain(module_name),
        )?;

        let config = match &cli.config {
            Some(path) => load_and_validate(path)?,
            None => ConfigFile::default(),
        };

        Ok(Self {
            cli,
            module_args,
            config,
        })
    }

    pub fn module_name(&self) -> &str {
        &self.cli.module_name
    }

    pub fn processes(&self) -> usize {
        self.cli.processes.unwrap_or(self.config.launcher.processes)
    }

    pub fn poll_quantum(&self) -> Duration {
        Duration::from_millis(
            self.cli
                .poll_quantum_ms
                .unwrap_or(self.config.launcher.poll_quantum_ms),
        )
    }

    /// Level from the config file, used when neither the flag nor
    /// `RUNNER_LOG` is set.
    pub fn config_log_level(&self) -> Option<LogLevel> {
        self.config.log.level()
    }

    /// Launcher flags every replica is started with. Uses `--flag=value`
    /// forms so the replica's own argument split cannot swallow the module
    /// name.
    pub fn replica_args(&self) -> Vec<String> {
        let mut args = vec!["--processes=1".to_string()];
        if let Some(path) = &self.cli.config {
            args.push(format!("--config={}", path.display()));
        }
        if let Some(level) = self.cli.log_level {
            args.push(format!("--log-level={}", level.as_str()));
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_from_str() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(" trace ".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn as_str_round_trips_through_clap() {
        for level in LogLevel::value_variants() {
            let parsed = <LogLevel as std::str::FromStr>::from_str(level.as_str()).unwrap();
            assert_eq!(&parsed, level);
        }
    }
}
