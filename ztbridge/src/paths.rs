use std::path::PathBuf;

/// Fixed seconds the deferred boot task sleeps before attaching the ZeroTier
/// interface: long enough to cover zerotier-one startup, interface
/// enumeration, and dhcpcd settlement.
pub const ATTACH_DELAY_SECS: u32 = 45;

/// Naming prefix the ZeroTier daemon uses for the interfaces it creates.
pub const OVERLAY_PREFIX: &str = "zt";

/// Filesystem locations the tool reads and mutates. The defaults are part of
/// the external contract; tests point them into a tempdir.
#[derive(Debug, Clone)]
pub struct Paths {
    /// dhcpcd configuration receiving the `denyinterfaces` exclusions.
    pub dhcpcd_conf: PathBuf,
    /// Declarative ifupdown network configuration.
    pub interfaces_file: PathBuf,
    /// sysfs network class directory used for interface probes.
    pub sysfs_net: PathBuf,
    /// Append-only log the deferred boot task redirects into.
    pub attach_log: PathBuf,
    /// Absolute path of this tool, baked into the boot task entry because the
    /// cron execution environment has a minimal search path.
    pub tool_path: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            dhcpcd_conf: PathBuf::from("/etc/dhcpcd.conf"),
            interfaces_file: PathBuf::from("/etc/network/interfaces"),
            sysfs_net: PathBuf::from("/sys/class/net"),
            attach_log: PathBuf::from("/tmp/bridge-setup.log"),
            tool_path: std::env::current_exe()
                .unwrap_or_else(|_| PathBuf::from("/usr/local/bin/ztbridge")),
        }
    }
}
