//! Generic host-mutation primitives used by higher-level setup tools.

pub mod persist;
pub mod probe;
pub mod runner;

pub use persist::{atomic_write, backup_file, PersistError};
pub use probe::{
    addresses_of, bridge_ports, file_contains_line, interface_exists, interface_is_bridge,
    resolve_by_prefix, service_active, ProbeError,
};
pub use runner::{CmdOutput, CommandRunner, RunError, SystemRunner};
