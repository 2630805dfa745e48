use std::process::Command;

use anyhow::{anyhow, Context, Result};
use tracing::warn;

/// Registry keys holding per-application uninstall metadata, 64-bit view
/// first. The WOW6432Node key covers 32-bit applications on 64-bit hosts and
/// may be absent elsewhere.
pub const UNINSTALL_KEY_PATHS: [&str; 2] = [
    r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
    r"HKLM\SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
];

/// One subkey under an uninstall key: the advertised display name plus the
/// command that removes the application, when the vendor recorded one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallKeyEntry {
    pub display_name: String,
    pub uninstall_string: Option<String>,
}

/// Enumerates every uninstall entry under [`UNINSTALL_KEY_PATHS`] by running
/// `reg query <key> /s` and parsing its text output.
pub fn enumerate_uninstall_entries() -> Vec<UninstallKeyEntry> {
    enumerate_uninstall_entries_with_query(query_registry_key)
}

/// Enumeration over an injectable query so the parsing and matching paths
/// are exercisable without a live registry. A key that fails to query is
/// logged and skipped; a 32-bit host simply lacks the WOW6432Node view.
pub fn enumerate_uninstall_entries_with_query<Query>(mut query: Query) -> Vec<UninstallKeyEntry>
where
    Query: FnMut(&str) -> Result<String>,
{
    let mut entries = Vec::new();
    for key_path in UNINSTALL_KEY_PATHS {
        match query(key_path) {
            Ok(raw) => entries.extend(parse_reg_query_output(&raw)),
            Err(err) => warn!(key_path, "uninstall key enumeration failed: {err:#}"),
        }
    }
    entries
}

/// Finds the entry whose display name contains `display_name` (ignoring
/// case) and that carries an uninstall command.
pub fn find_uninstall_command<'a>(
    entries: &'a [UninstallKeyEntry],
    display_name: &str,
) -> Option<&'a UninstallKeyEntry> {
    let needle = display_name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    entries.iter().find(|entry| {
        entry.uninstall_string.is_some() && entry.display_name.to_lowercase().contains(&needle)
    })
}

/// Whether any uninstall entry advertises `display_name`, with or without an
/// uninstall command.
pub fn registry_reports_installed(entries: &[UninstallKeyEntry], display_name: &str) -> bool {
    let needle = display_name.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    entries
        .iter()
        .any(|entry| entry.display_name.to_lowercase().contains(&needle))
}

/// Parses `reg query <key> /s` output. Key header lines start at column zero
/// with the hive name; indented lines are `<name> <REG_TYPE> <data>` value
/// rows. Subkeys without a DisplayName are dropped.
pub fn parse_reg_query_output(raw: &str) -> Vec<UninstallKeyEntry> {
    let mut entries = Vec::new();
    let mut display_name: Option<String> = None;
    let mut uninstall_string: Option<String> = None;

    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            flush_entry(&mut entries, &mut display_name, &mut uninstall_string);
            continue;
        }

        let Some((name, data)) = parse_value_row(line) else {
            continue;
        };
        match name {
            "DisplayName" => display_name = Some(data.to_string()),
            "UninstallString" => uninstall_string = Some(data.to_string()),
            _ => {}
        }
    }
    flush_entry(&mut entries, &mut display_name, &mut uninstall_string);

    entries
}

fn flush_entry(
    entries: &mut Vec<UninstallKeyEntry>,
    display_name: &mut Option<String>,
    uninstall_string: &mut Option<String>,
) {
    if let Some(name) = display_name.take() {
        entries.push(UninstallKeyEntry {
            display_name: name,
            uninstall_string: uninstall_string.take(),
        });
    } else {
        *uninstall_string = None;
    }
}

/// Splits a value row into its name and data columns; the data itself may
/// contain spaces. Rows whose middle column is not a REG_* type are ignored.
fn parse_value_row(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    let (name, rest) = trimmed.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    let (value_type, data) = match rest.split_once(char::is_whitespace) {
        Some((value_type, data)) => (value_type, data.trim_start()),
        None => (rest, ""),
    };
    if !value_type.starts_with("REG_") {
        return None;
    }
    Some((name, data))
}

fn query_registry_key(key_path: &str) -> Result<String> {
    let output = Command::new("reg")
        .arg("query")
        .arg(key_path)
        .arg("/s")
        .output()
        .with_context(|| format!("failed to run 'reg query {key_path}'"))?;
    if !output.status.success() {
        return Err(anyhow!("'reg query {key_path}' reported {}", output.status));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
