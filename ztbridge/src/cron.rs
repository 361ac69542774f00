use host_ops_core::CommandRunner;

use crate::error::SetupError;
use crate::paths::{Paths, ATTACH_DELAY_SECS};

/// The boot task line: wait out the grace period, then run this tool's
/// `attach` subcommand, which resolves the overlay interface name at
/// execution time. The tool path is absolute because cron runs with a
/// minimal search path; all output lands in the attach log so boot failures
/// are diagnosable without a session.
pub fn boot_entry(paths: &Paths, bridge: &str) -> String {
    format!(
        "@reboot sleep {ATTACH_DELAY_SECS} && {} attach --bridge {bridge} >> {} 2>&1",
        paths.tool_path.display(),
        paths.attach_log.display()
    )
}

/// Install the deferred boot task in root's crontab.
///
/// Replace semantics: any previous attach entry for the same bridge is
/// dropped before the new one is appended, so re-running setup (possibly
/// with a different tool path) leaves exactly one entry. Installing an
/// already-present entry is a no-op. Returns whether the crontab was
/// rewritten.
pub fn install(
    runner: &dyn CommandRunner,
    paths: &Paths,
    bridge: &str,
) -> Result<bool, SetupError> {
    let entry = boot_entry(paths, bridge);
    let marker = format!("attach --bridge {bridge} ");

    // A missing crontab exits non-zero; that is an empty table, not a failure.
    let current = runner
        .run("crontab", &["-l"])
        .map_err(|err| SetupError::Scheduling(err.to_string()))?;
    let existing = if current.success {
        current.stdout
    } else {
        String::new()
    };

    if existing.lines().any(|line| line == entry) {
        return Ok(false);
    }

    let mut table = String::new();
    for line in existing.lines() {
        if line.contains(&marker) {
            continue;
        }
        table.push_str(line);
        table.push('\n');
    }
    table.push_str(&entry);
    table.push('\n');

    let written = runner
        .run_with_input("crontab", &["-"], &table)
        .map_err(|err| SetupError::Scheduling(err.to_string()))?;
    if !written.success {
        return Err(SetupError::Scheduling(format!(
            "crontab rejected the new table: {}",
            written.stderr.trim()
        )));
    }
    Ok(true)
}
