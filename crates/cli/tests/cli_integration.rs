//! End-to-end tests for the pollwatch binary

mod common;

use anyhow::Result;
use common::Pollwatch;
use std::fs;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn test_zero_interval_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let finished = Pollwatch::spawn(temp_dir.path(), &["--interval", "0"])?.finish(TIMEOUT)?;

    assert!(!finished.success);
    assert!(finished.stderr.contains("interval"));
    Ok(())
}

#[test]
fn test_missing_path_is_fatal() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let finished = Pollwatch::spawn(temp_dir.path(), &["does-not-exist"])?.finish(TIMEOUT)?;

    assert!(!finished.success);
    assert!(finished.stderr.contains("does-not-exist"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_failing_command_stops_watcher() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().join("project");
    fs::create_dir(&root)?;

    let process = Pollwatch::spawn(
        &root,
        &["--list", "--interval", "20ms", "--ops", "create", "--cmd", "false", "."],
    )?;
    thread::sleep(Duration::from_millis(300));
    fs::write(root.join("trigger.txt"), "x")?;

    let finished = process.finish(TIMEOUT)?;
    assert!(!finished.success);
    let mut lines = finished.stdout.lines();
    assert!(lines.next().is_some_and(|l| l.ends_with(": project")));
    assert_eq!(lines.next(), Some("Watching 1 files"));
    assert!(finished.stdout.contains(r#"FILE "trigger.txt" CREATE"#));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_startcmd_failure_is_fatal() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let finished = Pollwatch::spawn(
        temp_dir.path(),
        &["--interval", "20ms", "--cmd", "false", "--startcmd", "--list"],
    )?
    .finish(TIMEOUT)?;

    assert!(!finished.success);
    assert!(finished.stdout.contains("watcher closed"));
    assert!(finished.stderr.contains("Start command failed"));
    Ok(())
}
