use std::io;
use std::process::Command;

/// Captured result of one finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl RunReport {
    /// Whether either output stream mentions `marker`. Package manager exit
    /// codes are unreliable; several outcomes are only visible as text.
    pub fn mentions(&self, marker: &str) -> bool {
        self.stdout.contains(marker) || self.stderr.contains(marker)
    }
}

/// Runs a command to completion and captures both streams. Spawn failures
/// surface as the raw io error so callers can inspect the OS error code.
pub fn run_blocking(command: &mut Command) -> io::Result<RunReport> {
    let output = command.output()?;
    Ok(RunReport {
        success: output.status.success(),
        status: output.status.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
