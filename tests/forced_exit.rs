//! Double interrupt through `Launcher::start`, with real signals.
//!
//! Kept in its own test binary: it signals the test process itself.

#![cfg(unix)]

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, raise};
use tokio_util::sync::CancellationToken;

use runner::Launcher;
use runner::errors::RunnerError;
use runner::unit::{AsyncFnUnit, LoadedUnit, UnitArgs, UnitContext};
use runner_test_utils::init_tracing;
use runner_test_utils::recorder::Recorder;

#[test]
fn second_signal_abandons_a_unit_that_ignores_cancellation() {
    init_tracing();
    let rec = Recorder::new();
    let (started_tx, started_rx) = mpsc::channel::<()>();

    let unit_rec = rec.clone();
    let launcher = Launcher::new()
        .unit("stubborn", move |_ctx: &UnitContext| {
            let rec = unit_rec.clone();
            let started = started_tx.clone();
            Ok(LoadedUnit::from_async(AsyncFnUnit::new(
                move |_args: UnitArgs, _cancel: CancellationToken| async move {
                    rec.record("main:start");
                    let _ = started.send(());
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    rec.record("main:end");
                    Ok(())
                },
            )))
        })
        .after_stop(rec.hook("after"));

    let signaller = thread::spawn(move || {
        started_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("unit never started");
        raise(Signal::SIGINT).unwrap();
        // Separate deliveries so they are not coalesced into one.
        thread::sleep(Duration::from_millis(200));
        raise(Signal::SIGINT).unwrap();
    });

    let begun = Instant::now();
    let err = launcher.start("stubborn", vec![], None).unwrap_err();
    signaller.join().unwrap();

    assert!(matches!(err, RunnerError::ForcedExit), "got {err:?}");
    assert_eq!(err.exit_code(), 1);
    assert!(begun.elapsed() < Duration::from_secs(10));
    assert_eq!(rec.events(), ["main:start"]);
}
