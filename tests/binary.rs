//! End-to-end runs of the `runner` executable.

use std::process::{Command, Output};

fn runner() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_runner"));
    cmd.env_remove("RUNNER_LOG")
        .env_remove("PROCESS_ID")
        .env_remove("PROCESS_COUNT");
    cmd
}

fn run(args: &[&str]) -> Output {
    runner().args(args).output().expect("failed to run runner binary")
}

#[test]
fn echo_prints_module_arguments() {
    let out = run(&["echo", "hello", "--not-a-launcher-flag"]);

    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "hello --not-a-launcher-flag\n");

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Start running module echo hello --not-a-launcher-flag"));
    assert!(stderr.contains("Finish running module echo hello --not-a-launcher-flag"));
}

#[test]
fn replica_identity_comes_from_the_environment() {
    let out = runner()
        .args(["identity"])
        .env("PROCESS_ID", "2")
        .env("PROCESS_COUNT", "3")
        .output()
        .unwrap();

    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "replica 2/3\n");
}

#[test]
fn partial_identity_in_the_environment_runs_standalone() {
    let out = runner()
        .args(["identity"])
        .env("PROCESS_ID", "2")
        .output()
        .unwrap();

    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "standalone\n");
}

#[cfg(unix)]
#[test]
fn non_utf8_arguments_are_passed_on_lossily() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let out = runner()
        .arg("echo")
        .arg(OsStr::from_bytes(b"caf\xff"))
        .output()
        .unwrap();

    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "caf\u{FFFD}\n");
}

#[test]
fn unknown_unit_exits_with_failure() {
    let out = run(&["no-such-unit"]);

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no-such-unit"));
}

#[test]
fn missing_module_name_is_a_usage_error() {
    let out = run(&["--processes=2"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn failing_unit_exits_with_failure() {
    let out = run(&["sleep", "forever"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn replicated_run_stops_when_the_first_replica_exits() {
    let out = run(&["-p", "2", "--poll-quantum-ms=100", "sleep", "0.2"]);

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(out.status.success(), "stderr:\n{stderr}");
    assert!(stderr.contains("all replicas stopped"));
    assert!(stderr.contains("replica finished"));
}

#[cfg(unix)]
#[test]
fn single_interrupt_lets_the_unit_finish_cleanly() {
    use std::io::{BufRead, BufReader};
    use std::process::Stdio;

    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let mut child = runner()
        .args(["sleep", "30"])
        .stderr(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .unwrap();

    let stderr = child.stderr.take().unwrap();
    let mut lines = BufReader::new(stderr).lines();
    let mut seen = Vec::new();

    for line in lines.by_ref() {
        let line = line.unwrap();
        let started = line.contains("entry point started");
        seen.push(line);
        if started {
            break;
        }
    }

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();

    seen.extend(lines.map(|line| line.unwrap()));
    let status = child.wait().unwrap();
    let log = seen.join("\n");

    assert!(status.success(), "log:\n{log}");
    assert!(log.contains("sleep cancelled"));
    assert!(log.contains("Finish running module sleep 30"));
}

#[cfg(unix)]
#[test]
fn terminating_the_launcher_stops_every_replica() {
    use std::io::{BufRead, BufReader};
    use std::process::Stdio;

    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let mut child = runner()
        .args(["-p", "2", "--poll-quantum-ms=100", "sleep", "20"])
        .stderr(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .unwrap();

    // Replicas inherit the launcher's stderr, so their log lines show up here too.
    let stderr = child.stderr.take().unwrap();
    let mut lines = BufReader::new(stderr).lines();
    let mut seen = Vec::new();
    let mut started = 0;

    for line in lines.by_ref() {
        let line = line.unwrap();
        if line.contains("entry point started") {
            started += 1;
        }
        seen.push(line);
        if started == 2 {
            break;
        }
    }

    kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).unwrap();

    seen.extend(lines.map(|line| line.unwrap()));
    let status = child.wait().unwrap();
    let log = seen.join("\n");

    assert!(status.success(), "log:\n{log}");
    assert!(log.contains("replicas stopped on interrupt"), "log:\n{log}");
    assert_eq!(log.matches("sleep cancelled").count(), 2, "log:\n{log}");
}
