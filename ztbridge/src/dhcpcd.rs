use std::fs;

use host_ops_core::{atomic_write, backup_file, file_contains_line, service_active, CommandRunner};

use crate::config::BridgeConfig;
use crate::error::SetupError;
use crate::paths::{Paths, OVERLAY_PREFIX};

/// What conflict elimination actually did, for the run log.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EliminationReport {
    /// Exclusion directives newly written (already-present ones are skipped).
    pub directives_added: Vec<String>,
    /// Warning text when the dhcpcd restart failed; the persisted exclusions
    /// still take effect at next boot, so this never fails the run.
    pub restart_warning: Option<String>,
    /// NetworkManager was active and has been stopped and disabled.
    pub network_manager_disabled: bool,
}

/// Exclusion directives for every interface the bridge must own. The overlay
/// interface name is not known yet, so its naming pattern is excluded
/// wholesale.
pub fn exclusion_directives(config: &BridgeConfig) -> Vec<String> {
    vec![
        format!("denyinterfaces {}", config.bridge),
        format!("denyinterfaces {}", config.physical),
        format!("denyinterfaces {OVERLAY_PREFIX}*"),
    ]
}

/// Guarantee that no other address-assignment subsystem claims the bridged
/// interfaces at next boot, and drop any address they carry right now.
///
/// Order matters: the exclusions are persisted first (they survive even if
/// the later live actions fail), then the current address claim is flushed,
/// then dhcpcd is restarted so the exclusions apply without a reboot.
pub fn eliminate(
    runner: &dyn CommandRunner,
    paths: &Paths,
    config: &BridgeConfig,
    disable_network_manager: bool,
) -> Result<EliminationReport, SetupError> {
    let mut report = EliminationReport::default();

    report.network_manager_disabled =
        handle_network_manager(runner, disable_network_manager)?;

    report.directives_added = inject_exclusions(paths, config)?;

    // Flush tolerates "no address present"; `ip` only fails here when the
    // device itself is gone, which the orchestrator checked beforehand.
    let flush = runner.run("ip", &["addr", "flush", "dev", &config.physical])?;
    if !flush.success {
        return Err(SetupError::ConflictResolution(format!(
            "could not flush addresses on {}: {}",
            config.physical,
            flush.stderr.trim()
        )));
    }

    let restart = runner.run("systemctl", &["restart", "dhcpcd"])?;
    if !restart.success {
        report.restart_warning = Some(format!(
            "dhcpcd restart failed ({}); exclusions in {} still apply at next boot",
            restart.stderr.trim(),
            paths.dhcpcd_conf.display()
        ));
    }

    Ok(report)
}

/// Prepend missing `denyinterfaces` directives at the top of dhcpcd.conf,
/// ahead of any existing directives so later conflicting ones cannot
/// override them. Re-injecting a present directive is a no-op; a run that
/// adds nothing leaves the file byte-identical.
fn inject_exclusions(paths: &Paths, config: &BridgeConfig) -> Result<Vec<String>, SetupError> {
    let conf = &paths.dhcpcd_conf;

    if !conf.exists() {
        // No dhcpcd.conf on this host yet (NetworkManager-managed images);
        // create a minimal one so the exclusions have somewhere to live.
        atomic_write(conf, "# dhcpcd configuration created by ztbridge\n")?;
    }

    let mut missing = Vec::new();
    for directive in exclusion_directives(config) {
        if !file_contains_line(conf, &directive)? {
            missing.push(directive);
        }
    }

    if missing.is_empty() {
        return Ok(missing);
    }

    let current = fs::read_to_string(conf).map_err(|err| {
        SetupError::ConflictResolution(format!("failed to read {}: {err}", conf.display()))
    })?;

    backup_file(conf)?;
    let mut updated = missing.join("\n");
    updated.push('\n');
    updated.push_str(&current);
    atomic_write(conf, &updated)?;

    Ok(missing)
}

/// NetworkManager owns interface addressing wholesale and fights any manual
/// bridge configuration. Prompting is out of scope, so an active
/// NetworkManager is a hard conflict unless the caller explicitly authorized
/// disabling it.
fn handle_network_manager(
    runner: &dyn CommandRunner,
    authorized: bool,
) -> Result<bool, SetupError> {
    if !service_active(runner, "NetworkManager")? {
        return Ok(false);
    }

    if !authorized {
        return Err(SetupError::ConflictResolution(
            "NetworkManager is active and conflicts with the bridge configuration; \
             re-run with --disable-network-manager, or run \
             `systemctl stop NetworkManager && systemctl disable NetworkManager` yourself"
                .to_string(),
        ));
    }

    for action in ["stop", "disable"] {
        let out = runner.run("systemctl", &[action, "NetworkManager"])?;
        if !out.success {
            return Err(SetupError::ConflictResolution(format!(
                "failed to {action} NetworkManager: {}",
                out.stderr.trim()
            )));
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use host_ops_core::CmdOutput;
    use pretty_assertions::assert_eq;

    use super::{eliminate, exclusion_directives};
    use crate::config::{BridgeConfig, RawConfig};
    use crate::paths::Paths;
    use crate::testing::ScriptedRunner;

    fn test_config() -> BridgeConfig {
        BridgeConfig::from_raw(RawConfig {
            physical: Some("eth0".to_string()),
            bridge: Some("br0".to_string()),
            address: Some("192.168.1.100".to_string()),
            netmask: Some("255.255.255.0".to_string()),
            gateway: Some("192.168.1.1".to_string()),
            dns: None,
            network_id: Some("1234567890abcdef".to_string()),
        })
        .expect("config")
    }

    /// Unscripted commands succeed in the fake, which would read as an
    /// active NetworkManager; script it inactive for the common case.
    fn runner_without_nm() -> ScriptedRunner {
        ScriptedRunner::new().respond(
            "systemctl is-active --quiet NetworkManager",
            CmdOutput::failed("inactive"),
        )
    }

    fn test_paths(dir: &std::path::Path) -> Paths {
        Paths {
            dhcpcd_conf: dir.join("dhcpcd.conf"),
            interfaces_file: dir.join("interfaces"),
            sysfs_net: dir.join("net"),
            attach_log: dir.join("bridge-setup.log"),
            tool_path: dir.join("ztbridge"),
        }
    }

    #[test]
    fn prepends_exclusions_ahead_of_existing_directives() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = test_paths(dir.path());
        fs::write(&paths.dhcpcd_conf, "interface eth0\nstatic routers=10.0.0.1\n")
            .expect("seed conf");

        let runner = runner_without_nm();
        let report = eliminate(&runner, &paths, &test_config(), false).expect("eliminate");
        assert_eq!(report.directives_added.len(), 3);

        let content = fs::read_to_string(&paths.dhcpcd_conf).expect("read");
        let first_lines: Vec<&str> = content.lines().take(3).collect();
        assert_eq!(
            first_lines,
            vec![
                "denyinterfaces br0",
                "denyinterfaces eth0",
                "denyinterfaces zt*"
            ]
        );
        // Pre-existing directives survive below the exclusions.
        assert!(content.contains("static routers=10.0.0.1"));
    }

    #[test]
    fn reinjection_is_a_no_op_with_exactly_one_occurrence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = test_paths(dir.path());
        fs::write(&paths.dhcpcd_conf, "# stock\n").expect("seed conf");

        let runner = runner_without_nm();
        eliminate(&runner, &paths, &test_config(), false).expect("first run");
        let after_first = fs::read_to_string(&paths.dhcpcd_conf).expect("read");

        let report = eliminate(&runner, &paths, &test_config(), false).expect("second run");
        assert!(report.directives_added.is_empty());
        let after_second = fs::read_to_string(&paths.dhcpcd_conf).expect("read");
        assert_eq!(after_first, after_second);

        for directive in exclusion_directives(&test_config()) {
            let occurrences = after_second
                .lines()
                .filter(|line| line.trim() == directive)
                .count();
            assert_eq!(occurrences, 1, "{directive} duplicated");
        }
    }

    #[test]
    fn creates_minimal_conf_when_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = test_paths(dir.path());

        let runner = runner_without_nm();
        eliminate(&runner, &paths, &test_config(), false).expect("eliminate");
        let content = fs::read_to_string(&paths.dhcpcd_conf).expect("read");
        assert!(content.contains("denyinterfaces eth0"));
    }

    #[test]
    fn backs_up_before_first_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = test_paths(dir.path());
        fs::write(&paths.dhcpcd_conf, "# stock\n").expect("seed conf");

        let runner = runner_without_nm();
        eliminate(&runner, &paths, &test_config(), false).expect("eliminate");

        let backups: Vec<_> = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("dhcpcd.conf.backup.")
            })
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            fs::read_to_string(backups[0].path()).expect("read backup"),
            "# stock\n"
        );
    }

    #[test]
    fn restart_failure_is_reported_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = test_paths(dir.path());

        let runner = runner_without_nm().respond(
            "systemctl restart dhcpcd",
            CmdOutput::failed("unit not found"),
        );
        let report = eliminate(&runner, &paths, &test_config(), false).expect("non-fatal");
        assert!(report.restart_warning.is_some());
    }

    #[test]
    fn active_network_manager_without_authorization_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = test_paths(dir.path());

        let runner = ScriptedRunner::new()
            .respond("systemctl is-active --quiet NetworkManager", CmdOutput::ok(""));
        let err = eliminate(&runner, &paths, &test_config(), false).expect_err("conflict");
        assert!(err.to_string().contains("NetworkManager"));
        // Fatal before any file is touched.
        assert!(!paths.dhcpcd_conf.exists());
    }

    #[test]
    fn authorized_network_manager_disable_stops_and_disables() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = test_paths(dir.path());

        let runner = ScriptedRunner::new()
            .respond("systemctl is-active --quiet NetworkManager", CmdOutput::ok(""));
        let report = eliminate(&runner, &paths, &test_config(), true).expect("eliminate");
        assert!(report.network_manager_disabled);
        assert!(runner.ran("systemctl stop NetworkManager"));
        assert!(runner.ran("systemctl disable NetworkManager"));
    }

    #[test]
    fn flushes_physical_interface_addresses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = test_paths(dir.path());

        let runner = runner_without_nm();
        eliminate(&runner, &paths, &test_config(), false).expect("eliminate");
        assert!(runner.ran("ip addr flush dev eth0"));
    }
}
