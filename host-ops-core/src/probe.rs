use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use thiserror::Error;

use crate::runner::{CommandRunner, RunError};

/// Errors raised when an OS state query itself cannot be performed.
///
/// "Interface absent" or "file missing" are normal `false`/empty results,
/// never errors; only a query that could not be asked (privilege denied,
/// unreadable directory, unspawnable probe command) lands here.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Command(#[from] RunError),
    #[error("{command} failed: {detail}")]
    Query { command: String, detail: String },
    #[error("unparseable output from {command}: {detail}")]
    Parse { command: String, detail: String },
}

/// Whether an interface of the given name exists, per `/sys/class/net`.
pub fn interface_exists(sysfs_net: &Path, name: &str) -> bool {
    sysfs_net.join(name).is_dir()
}

/// Whether an existing interface is a bridge (carries a `bridge` subdirectory).
pub fn interface_is_bridge(sysfs_net: &Path, name: &str) -> bool {
    sysfs_net.join(name).join("bridge").is_dir()
}

/// Names of the ports currently enslaved to a bridge. An absent bridge or an
/// interface without a `brif` directory yields an empty set.
pub fn bridge_ports(sysfs_net: &Path, bridge: &str) -> Result<Vec<String>, ProbeError> {
    let brif = sysfs_net.join(bridge).join("brif");
    if !brif.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(&brif).map_err(|source| ProbeError::Read {
        path: brif.display().to_string(),
        source,
    })?;
    let mut ports = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ProbeError::Read {
            path: brif.display().to_string(),
            source,
        })?;
        ports.push(entry.file_name().to_string_lossy().into_owned());
    }
    ports.sort();
    Ok(ports)
}

/// First interface (sorted by name) whose name starts with `prefix`, or
/// `None` when no such interface exists yet. Names assigned by other daemons
/// are discovered here rather than stored.
pub fn resolve_by_prefix(sysfs_net: &Path, prefix: &str) -> Result<Option<String>, ProbeError> {
    if !sysfs_net.is_dir() {
        return Ok(None);
    }
    let entries = fs::read_dir(sysfs_net).map_err(|source| ProbeError::Read {
        path: sysfs_net.display().to_string(),
        source,
    })?;
    let mut matches: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ProbeError::Read {
            path: sysfs_net.display().to_string(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) {
            matches.push(name);
        }
    }
    matches.sort();
    Ok(matches.into_iter().next())
}

/// IPv4 addresses currently bound to an interface, via `ip -o -4 addr show`.
/// A missing interface reports no addresses; any other failed query (e.g.
/// privilege denied) is a probe error, never an empty answer.
pub fn addresses_of(runner: &dyn CommandRunner, name: &str) -> Result<Vec<Ipv4Addr>, ProbeError> {
    let out = runner.run("ip", &["-o", "-4", "addr", "show", "dev", name])?;
    if !out.success {
        // `ip` names an unknown device on stderr; that is a normal empty
        // answer. Anything else means the query itself could not be asked.
        if out.stderr.contains("does not exist") {
            return Ok(Vec::new());
        }
        return Err(ProbeError::Query {
            command: format!("ip -o -4 addr show dev {name}"),
            detail: out.stderr.trim().to_string(),
        });
    }

    let mut addresses = Vec::new();
    for line in out.stdout.lines() {
        // Line shape: "2: eth0    inet 192.168.1.7/24 brd ..."
        let Some(pos) = line.split_whitespace().position(|tok| tok == "inet") else {
            continue;
        };
        let Some(cidr) = line.split_whitespace().nth(pos + 1) else {
            return Err(ProbeError::Parse {
                command: format!("ip -o -4 addr show dev {name}"),
                detail: format!("inet token without address in line: {line}"),
            });
        };
        let addr_text = cidr.split('/').next().unwrap_or(cidr);
        let addr: Ipv4Addr = addr_text.parse().map_err(|_| ProbeError::Parse {
            command: format!("ip -o -4 addr show dev {name}"),
            detail: format!("invalid IPv4 address: {addr_text}"),
        })?;
        addresses.push(addr);
    }
    Ok(addresses)
}

/// Whether a systemd unit reports active. Any non-zero exit (inactive,
/// unknown unit) is a normal `false`.
pub fn service_active(runner: &dyn CommandRunner, name: &str) -> Result<bool, ProbeError> {
    let out = runner.run("systemctl", &["is-active", "--quiet", name])?;
    Ok(out.success)
}

/// Whether a configuration file contains the given line (whitespace-trimmed
/// exact match, so `denyinterfaces eth0` never matches a directive for
/// `eth01`). A missing file is `false`; an unreadable file is a probe
/// failure.
pub fn file_contains_line(path: &Path, line: &str) -> Result<bool, ProbeError> {
    if !path.exists() {
        return Ok(false);
    }
    let content = fs::read_to_string(path).map_err(|source| ProbeError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(content.lines().any(|candidate| candidate.trim() == line))
}
