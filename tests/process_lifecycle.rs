//! Integration tests for the process lifecycle: start, liveness, wait, kill.

use std::time::{Duration, Instant};

use shrun::{KillOutcome, Process, ProcessConfig, ShellError};

#[test]
fn start_transitions_to_running_with_positive_pid() {
    let _ = shrun::utils::init_tracing("debug");
    let mut process = ProcessConfig::new(["sleep", "5"]).spawn().unwrap();

    assert!(process.is_running());
    let pid = process.pid().expect("running process must expose a pid");
    assert!(pid > 0);
    assert_eq!(process.exit_code(), None);

    assert_eq!(process.kill(), KillOutcome::Killed);
}

#[test]
fn natural_exit_reports_exit_code() {
    let mut process = ProcessConfig::new(["sh", "-c", "exit 7"]).spawn().unwrap();

    assert!(process.wait(Some(Duration::from_secs(10))));
    assert!(!process.is_running());
    assert_eq!(process.pid(), None);
    assert_eq!(process.exit_code(), Some(7));

    // Natural completion does not release the handle; kill still reports
    // success after reaping it.
    assert_eq!(process.kill(), KillOutcome::Killed);
    assert_eq!(process.kill(), KillOutcome::AlreadyFinished);
}

#[test]
fn kill_running_process_then_kill_again() {
    let mut process = ProcessConfig::new(["sleep", "30"]).spawn().unwrap();
    assert!(process.is_running());

    assert_eq!(process.kill(), KillOutcome::Killed);
    assert!(!process.is_running());
    assert_eq!(process.kill(), KillOutcome::AlreadyFinished);
}

#[test]
fn wait_with_timeout_respects_both_outcomes() {
    // Finishes well within the timeout.
    let quick = ProcessConfig::new(["sh", "-c", "exit 0"]).spawn().unwrap();
    let started = Instant::now();
    assert!(quick.wait(Some(Duration::from_secs(10))));
    assert!(started.elapsed() < Duration::from_secs(10));

    // Outlives the timeout and stays running.
    let mut slow = ProcessConfig::new(["sleep", "30"]).spawn().unwrap();
    assert!(!slow.wait(Some(Duration::from_millis(300))));
    assert!(slow.is_running());
    assert_eq!(slow.kill(), KillOutcome::Killed);
}

#[test]
fn wait_without_timeout_blocks_until_exit() {
    let process = ProcessConfig::new(["sh", "-c", "sleep 0.3"])
        .spawn()
        .unwrap();
    assert!(process.wait(None));
    assert!(!process.is_running());
    assert_eq!(process.exit_code(), Some(0));
}

#[test]
fn spawn_failure_surfaces_as_command_not_found() {
    let result = ProcessConfig::new(["/nonexistent/program-12345"]).spawn();
    match result {
        Err(ShellError::CommandNotFound { command }) => {
            assert_eq!(command, "/nonexistent/program-12345");
        }
        other => panic!("Expected CommandNotFound, got: {other:?}"),
    }
}

#[test]
fn write_to_unstarted_process_fails() {
    let mut process = Process::new(ProcessConfig::new(["cat"]));
    match process.write("hello") {
        Err(ShellError::NotRunning) => {}
        other => panic!("Expected NotRunning, got: {other:?}"),
    }
}

#[test]
fn write_and_read_through_cat() {
    let mut process = ProcessConfig::new(["cat"]).spawn().unwrap();

    process.write("hello").unwrap();

    // cat echoes asynchronously; poll until the line arrives.
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut collected = String::new();
    while Instant::now() < deadline && !collected.contains("hello\n") {
        collected.push_str(&process.read().unwrap());
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(collected, "hello\n");

    assert_eq!(process.kill(), KillOutcome::Killed);
    // Handle released by kill; stdin is gone too.
    match process.write("again") {
        Err(ShellError::NotRunning) => {}
        other => panic!("Expected NotRunning, got: {other:?}"),
    }
}

#[test]
fn signal_termination_yields_negative_exit_code() {
    let mut process = ProcessConfig::new(["sleep", "30"]).spawn().unwrap();
    assert_eq!(process.kill(), KillOutcome::Killed);
    assert_eq!(process.exit_code(), Some(-15));
}
