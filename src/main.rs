// src/main.rs

use runner::cli::Invocation;
use runner::errors::{Result, RunnerError};
use runner::{Launcher, logging};

fn main() {
    match run_main() {
        Ok(()) => {}
        Err(RunnerError::Usage(usage)) => usage.exit(),
        Err(err) => {
            eprintln!("runner error: {err:?}");
            std::process::exit(err.exit_code());
        }
    }
}

fn run_main() -> Result<()> {
    // Non-UTF-8 arguments are passed on lossily rather than aborting.
    let argv = std::env::args_os().map(|arg| arg.to_string_lossy().into_owned());
    let invocation = Invocation::parse_from(argv)?;
    logging::init_logging(invocation.cli.log_level, invocation.config_log_level())?;
    Launcher::new().with_builtin_units().run(&invocation)
}
