use std::fmt::Write as _;

use host_ops_core::{atomic_write, backup_file};

use crate::config::BridgeConfig;
use crate::error::SetupError;
use crate::paths::Paths;

/// Render the complete declarative network configuration: loopback, the
/// physical uplink with no address of its own, and the bridge carrying the
/// static address and enslaving the physical port.
///
/// `bridge_stp off` and `bridge_fd 0` keep the bridge forwarding immediately;
/// `bridge_maxwait 0` keeps boot from stalling on link negotiation. Rendering
/// is deterministic so repeated runs produce byte-identical files.
pub fn render(config: &BridgeConfig) -> String {
    let dns = config
        .dns
        .iter()
        .map(|addr| addr.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    let mut out = String::new();
    let _ = writeln!(out, "# /etc/network/interfaces");
    let _ = writeln!(out, "# Managed by ztbridge; re-run setup to change.");
    let _ = writeln!(out);
    let _ = writeln!(out, "auto lo");
    let _ = writeln!(out, "iface lo inet loopback");
    let _ = writeln!(out);
    let _ = writeln!(out, "# Physical uplink carries no address of its own.");
    let _ = writeln!(out, "auto {}", config.physical);
    let _ = writeln!(out, "iface {} inet manual", config.physical);
    let _ = writeln!(out);
    let _ = writeln!(out, "auto {}", config.bridge);
    let _ = writeln!(out, "iface {} inet static", config.bridge);
    let _ = writeln!(out, "    address {}", config.address);
    let _ = writeln!(out, "    netmask {}", config.netmask);
    let _ = writeln!(out, "    gateway {}", config.gateway);
    let _ = writeln!(out, "    dns-nameservers {dns}");
    let _ = writeln!(out, "    bridge_ports {}", config.physical);
    let _ = writeln!(out, "    bridge_stp off");
    let _ = writeln!(out, "    bridge_fd 0");
    let _ = writeln!(out, "    bridge_maxwait 0");
    out
}

/// Back up any existing interfaces file, then persist the bridge definition
/// atomically. The write always proceeds, even when the bridge already
/// carries the target address: this is declarative convergence, not a diff,
/// and the path runs once per setup.
pub fn write(paths: &Paths, config: &BridgeConfig) -> Result<(), SetupError> {
    backup_file(&paths.interfaces_file)?;
    atomic_write(&paths.interfaces_file, &render(config))?;
    Ok(())
}
