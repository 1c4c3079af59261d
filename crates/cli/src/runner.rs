//! Running the user command for events

use crate::settings::CommandSpec;
use crate::util::split_command;
use anyhow::{bail, Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Runs the configured command, once per event
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
    pipe: bool,
    keepalive: bool,
}

impl CommandRunner {
    pub fn new(spec: &CommandSpec) -> Result<Self> {
        let mut words = split_command(&spec.command)?;
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
            pipe: spec.pipe,
            keepalive: spec.keepalive,
        })
    }

    /// Run for one event, waiting for the command to finish
    ///
    /// With `pipe`, `input` is written to the command's stdin. A failure is
    /// logged and swallowed when `keepalive` is set.
    pub fn run(&self, input: &str) -> Result<()> {
        match self.execute(input) {
            Err(err) if self.keepalive => {
                warn!("Command failed: {:#}", err);
                Ok(())
            }
            result => result,
        }
    }

    fn execute(&self, input: &str) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if self.pipe {
            command.stdin(Stdio::piped());
        }

        debug!("Running {} {:?}", self.program, self.args);
        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to run '{}'", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A command that exits without reading closes the pipe early
            if let Err(err) = writeln!(stdin, "{}", input) {
                if err.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(err).context("Failed to write to command stdin");
                }
            }
        }

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for '{}'", self.program))?;
        if !status.success() {
            bail!("'{}' exited with {}", self.program, status);
        }
        Ok(())
    }
}
