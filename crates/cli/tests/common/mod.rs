//! Helpers for driving the `pollwatch` binary

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// A running `pollwatch` process
pub struct Pollwatch {
    child: Child,
}

/// Exit status and captured output
#[derive(Debug)]
pub struct Finished {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl Pollwatch {
    /// Spawn the binary in `working_dir` with captured output
    pub fn spawn(working_dir: impl AsRef<Path>, args: &[&str]) -> Result<Self> {
        let child = Command::new(binary_path())
            .args(args)
            .current_dir(working_dir)
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn pollwatch")?;
        Ok(Self { child })
    }

    /// Wait for exit, killing the process after `timeout`
    pub fn finish(mut self, timeout: Duration) -> Result<Finished> {
        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = self.child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                self.child.kill()?;
                anyhow::bail!("pollwatch did not exit within {:?}", timeout);
            }
            thread::sleep(Duration::from_millis(20));
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        if let Some(mut out) = self.child.stdout.take() {
            out.read_to_string(&mut stdout)?;
        }
        if let Some(mut err) = self.child.stderr.take() {
            err.read_to_string(&mut stderr)?;
        }

        Ok(Finished {
            success: status.success(),
            stdout,
            stderr,
        })
    }
}

impl Drop for Pollwatch {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pollwatch"))
}
