use std::io::Write;

use anyhow::{Context, Result};
use clap_complete::Shell;

pub fn write_completions_script<W: Write>(
    shell: Shell,
    command: &mut clap::Command,
    writer: &mut W,
) -> Result<()> {
    let mut generated = Vec::new();
    clap_complete::generate(shell, command, "stagehand", &mut generated);
    writer
        .write_all(&generated)
        .context("failed writing generated completion script")
}
