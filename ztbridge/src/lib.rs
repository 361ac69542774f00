//! ZeroTier-to-LAN transparent bridge setup.
//!
//! Configures a host so one bridge interface (`br0` by default) carries a
//! static LAN address and enslaves both the physical uplink and the ZeroTier
//! virtual interface, and makes that configuration survive reboot despite the
//! boot-order race between the ZeroTier daemon's interface creation and the
//! OS network startup sequence.
//!
//! # Architecture
//!
//! Four independently-scheduled subsystems (dhcpcd, ifupdown, zerotier-one,
//! and a deferred boot task) must converge on one bridge state without any of
//! them knowing about the others. The crate therefore never caches interface
//! state, re-reads every file before mutating it, and makes every mutation
//! idempotent and safe to repeat after the target state is already reached:
//!
//! - [`config`] — validated target topology record
//! - [`dhcpcd`] — removes competing address-management claims
//! - [`interfaces`] — persists the declarative bridge definition
//! - [`overlay`] — drives the ZeroTier daemon (join, allowManaged=0)
//! - [`cron`] — installs the delayed boot task that closes the race
//! - [`attach`] — the idempotent re-entrant command that task runs
//! - [`setup`] — sequences the above end to end
//!
//! OS probes and file/command primitives come from `host-ops-core`.

pub mod attach;
pub mod config;
pub mod cron;
pub mod dhcpcd;
pub mod error;
pub mod interfaces;
pub mod overlay;
pub mod paths;
pub mod report;
pub mod setup;

#[cfg(test)]
pub(crate) mod testing;
