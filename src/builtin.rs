// src/builtin.rs

//! Units shipped with the `runner` binary.
//!
//! - `echo`: print the arguments on stdout.
//! - `identity`: print the replica identity (`replica 2/4` or `standalone`).
//! - `sleep`: sleep for N seconds (default 1), stopping early on cancellation.
//! - `shell`: run a shell command, streaming its output into the log and
//!   killing it on cancellation.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::unit::{
    AsyncFnUnit, AsyncUnit, BoxFuture, FnUnit, LoadedUnit, UnitArgs, UnitContext, UnitRegistry,
};

/// Register every built-in unit.
pub fn register(units: &mut UnitRegistry) {
    units.register("echo", |_ctx: &UnitContext| {
        Ok(LoadedUnit::from_sync(FnUnit::new(echo)))
    });

    units.register("identity", |ctx: &UnitContext| {
        let replica = ctx.replica;
        Ok(LoadedUnit::from_sync(FnUnit::new(move |_args: UnitArgs| {
            match replica {
                Some(replica) => println!("replica {replica}"),
                None => println!("standalone"),
            }
            Ok(())
        })))
    });

    units.register("sleep", |_ctx: &UnitContext| {
        Ok(LoadedUnit::from_async(
            AsyncFnUnit::new(sleep).with_parser(parse_duration),
        ))
    });

    units.register("shell", |_ctx: &UnitContext| Ok(LoadedUnit::from_async(ShellUnit)));
}

fn echo(args: UnitArgs) -> anyhow::Result<()> {
    println!("{}", args.into_raw()?.join(" "));
    Ok(())
}

fn parse_duration(args: &[String]) -> anyhow::Result<Duration> {
    let Some(raw) = args.first() else {
        return Ok(Duration::from_secs(1));
    };
    let secs: f64 = raw
        .parse()
        .with_context(|| format!("sleep expects a number of seconds, got {raw:?}"))?;
    if !secs.is_finite() || secs < 0.0 {
        bail!("sleep expects a non-negative number of seconds, got {raw:?}");
    }
    Ok(Duration::from_secs_f64(secs))
}

async fn sleep(args: UnitArgs, cancel: CancellationToken) -> anyhow::Result<()> {
    let duration: Duration = args.into_parsed()?;
    info!(?duration, "sleeping");

    tokio::select! {
        _ = tokio::time::sleep(duration) => info!("sleep finished"),
        _ = cancel.cancelled() => info!("sleep cancelled"),
    }
    Ok(())
}

/// Runs its arguments as one shell command line.
struct ShellUnit;

impl AsyncUnit for ShellUnit {
    fn main(
        self: Box<Self>,
        args: UnitArgs,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async move {
            let command_line = args.into_raw()?.join(" ");
            if command_line.trim().is_empty() {
                bail!("shell unit needs a command to run");
            }
            run_shell(&command_line, cancel).await
        })
    }
}

async fn run_shell(command_line: &str, cancel: CancellationToken) -> anyhow::Result<()> {
    info!(cmd = %command_line, "starting shell command");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command_line);
        c
    };

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning shell command '{command_line}'"))?;

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!("stdout: {}", line);
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!("stderr: {}", line);
            }
        });
    }

    tokio::select! {
        status = child.wait() => {
            let status = status
                .with_context(|| format!("waiting for shell command '{command_line}'"))?;
            let code = status.code().unwrap_or(-1);
            info!(exit_code = code, success = status.success(), "shell command exited");
            if !status.success() {
                bail!("shell command '{command_line}' exited with code {code}");
            }
        }

        _ = cancel.cancelled() => {
            info!(cmd = %command_line, "cancellation requested; killing shell command");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill shell command on cancellation");
            } else {
                debug!("shell command killed");
            }
        }
    }

    Ok(())
}
