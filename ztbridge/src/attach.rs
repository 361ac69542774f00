use host_ops_core::{
    bridge_ports, interface_exists, interface_is_bridge, resolve_by_prefix, CommandRunner,
};

use crate::error::SetupError;
use crate::paths::Paths;

/// Result of one deferred attach invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachOutcome {
    /// Overlay interface that ended up (or already was) enslaved.
    pub interface: String,
    /// The interface was already a bridge port; nothing was changed.
    pub already_enslaved: bool,
}

/// Attach the overlay interface to the bridge, resolving the interface name
/// now rather than at install time — the ZeroTier daemon only assigns it
/// when it creates the device.
///
/// This is the re-entrant command the boot task runs every boot; it must be
/// safe against every state it can encounter: interface not created yet
/// (fail cleanly, next boot retries), already enslaved (no-op success), or
/// attachable (one `brctl addif`).
pub fn attach(
    runner: &dyn CommandRunner,
    paths: &Paths,
    bridge: &str,
    prefix: &str,
) -> Result<AttachOutcome, SetupError> {
    let interface = resolve_by_prefix(&paths.sysfs_net, prefix)?.ok_or_else(|| {
        SetupError::Attach(format!(
            "no interface matching prefix {prefix:?} exists yet; \
             is the zerotier-one service running and the network joined?"
        ))
    })?;

    if !interface_exists(&paths.sysfs_net, bridge) {
        return Err(SetupError::Attach(format!(
            "bridge {bridge} does not exist; has the host been rebooted since setup?"
        )));
    }
    if !interface_is_bridge(&paths.sysfs_net, bridge) {
        return Err(SetupError::Attach(format!(
            "{bridge} exists but is not a bridge interface"
        )));
    }

    if bridge_ports(&paths.sysfs_net, bridge)?.contains(&interface) {
        return Ok(AttachOutcome {
            interface,
            already_enslaved: true,
        });
    }

    let out = runner.run("brctl", &["addif", bridge, &interface])?;
    // brctl races against a concurrent enslavement (or a repeated boot task);
    // "already a member" is the target state, not a failure.
    if !out.success && !out.stderr.contains("already a member") {
        return Err(SetupError::Attach(format!(
            "brctl addif {bridge} {interface} failed: {}",
            out.stderr.trim()
        )));
    }

    Ok(AttachOutcome {
        interface,
        already_enslaved: false,
    })
}
