//! External tool execution for the extraction path.
//!
//! The extractor is the only component on the acquisition path that shells
//! out, and it does so exclusively through this argument-array runner (no
//! shell interpolation). The trait exists so extraction logic can be tested
//! without real tools installed.

use std::io;
use std::process::Command;

/// Captured result of running an external tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit code (-1 if terminated by a signal).
    pub exit_code: i32,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool exited with code zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Argument-array process runner.
pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args`, capturing exit code and output.
    ///
    /// An `Err` means the process could not be spawned at all (tool missing,
    /// permission denied); a non-zero exit is reported through the returned
    /// [`ToolOutput`].
    fn run(&self, program: &str, args: &[&str]) -> io::Result<ToolOutput>;

    /// Probe whether a tool is installed by running it with a cheap argument.
    fn is_available(&self, program: &str, probe_arg: &str) -> bool {
        self.run(program, &[probe_arg])
            .map(|out| out.success())
            .unwrap_or(false)
    }
}

/// Runner backed by `std::process::Command`.
#[derive(Debug, Default, Clone)]
pub struct SystemToolRunner;

impl SystemToolRunner {
    /// Create a new system tool runner.
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for SystemToolRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<ToolOutput> {
        let output = Command::new(program).args(args).output()?;

        Ok(ToolOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
