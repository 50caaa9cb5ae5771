use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use runner::cli::{Invocation, LogLevel};
use runner::errors::RunnerError;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn module_arguments_pass_through_untouched() {
    let inv = Invocation::parse_from(["runner", "-p", "3", "worker", "--verbose", "-p", "9"]).unwrap();

    assert_eq!(inv.module_name(), "worker");
    assert_eq!(inv.module_args, ["--verbose", "-p", "9"]);
    assert_eq!(inv.processes(), 3);
}

#[test]
fn defaults_without_flags_or_config() {
    let inv = Invocation::parse_from(["runner", "echo"]).unwrap();

    assert_eq!(inv.processes(), 1);
    assert_eq!(inv.poll_quantum(), Duration::from_secs(10));
    assert_eq!(inv.config_log_level(), None);
    assert!(inv.module_args.is_empty());
}

#[test]
fn missing_module_name_is_a_usage_error() {
    let err = Invocation::parse_from(["runner", "--processes", "2"]).unwrap_err();

    assert!(matches!(err, RunnerError::Usage(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn zero_poll_quantum_flag_is_rejected() {
    let err = Invocation::parse_from(["runner", "--poll-quantum-ms=0", "echo"]).unwrap_err();
    assert!(matches!(err, RunnerError::Usage(_)));
}

#[test]
fn config_file_supplies_defaults_and_flags_win() {
    let file = config_file(
        r#"
[launcher]
processes = 4
poll_quantum_ms = 250

[log]
level = "debug"
"#,
    );
    let path = file.path().to_str().unwrap();

    let inv = Invocation::parse_from(["runner", "--config", path, "echo"]).unwrap();
    assert_eq!(inv.processes(), 4);
    assert_eq!(inv.poll_quantum(), Duration::from_millis(250));
    assert_eq!(inv.config_log_level(), Some(LogLevel::Debug));

    let inv = Invocation::parse_from([
        "runner",
        "--config",
        path,
        "-p",
        "2",
        "--poll-quantum-ms=40",
        "echo",
    ])
    .unwrap();
    assert_eq!(inv.processes(), 2);
    assert_eq!(inv.poll_quantum(), Duration::from_millis(40));
}

#[test]
fn invalid_config_values_are_rejected() {
    let file = config_file("[launcher]\npoll_quantum_ms = 0\n");
    let err = Invocation::parse_from(["runner", "--config", file.path().to_str().unwrap(), "echo"])
        .unwrap_err();
    assert!(matches!(err, RunnerError::Config(_)));

    let file = config_file("[log]\nlevel = \"chatty\"\n");
    let err = Invocation::parse_from(["runner", "--config", file.path().to_str().unwrap(), "echo"])
        .unwrap_err();
    assert!(matches!(err, RunnerError::Config(ref msg) if msg.contains("chatty")));
}

#[test]
fn malformed_or_missing_config_is_an_error() {
    let file = config_file("[launcher\nprocesses = ");
    let err = Invocation::parse_from(["runner", "--config", file.path().to_str().unwrap(), "echo"])
        .unwrap_err();
    assert!(matches!(err, RunnerError::Toml(_)));

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    let err = Invocation::parse_from(["runner", "--config", missing.to_str().unwrap(), "echo"])
        .unwrap_err();
    assert!(matches!(err, RunnerError::Config(_)));
}

#[test]
fn replica_arguments_reparse_to_a_single_process_run() {
    let file = config_file("[launcher]\nprocesses = 5\n");
    let path = file.path().to_str().unwrap().to_string();
    let parent = Invocation::parse_from([
        "runner",
        "--config",
        &path,
        "--log-level",
        "debug",
        "worker",
        "input.txt",
    ])
    .unwrap();

    let replica_args = parent.replica_args();
    assert_eq!(
        replica_args,
        [
            "--processes=1".to_string(),
            format!("--config={path}"),
            "--log-level=debug".to_string(),
        ]
    );

    let argv = std::iter::once("runner".to_string())
        .chain(replica_args)
        .chain([parent.module_name().to_string()])
        .chain(parent.module_args.iter().cloned());
    let child = Invocation::parse_from(argv).unwrap();

    assert_eq!(child.processes(), 1);
    assert_eq!(child.module_name(), "worker");
    assert_eq!(child.module_args, ["input.txt"]);
    assert_eq!(child.cli.log_level, Some(LogLevel::Debug));
}
