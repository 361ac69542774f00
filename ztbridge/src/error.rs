use host_ops_core::{PersistError, ProbeError, RunError};
use thiserror::Error;

/// Failure taxonomy for one setup run.
///
/// The variant decides how the orchestrator reacts: preconditions abort
/// before any mutation, persistence and scheduling failures abort the run,
/// and overlay failures abort but carry exact manual remediation commands.
/// Service-restart failures inside conflict elimination are reported inline
/// and never reach this type.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Invalid or missing configuration field, or a host state that makes the
    /// requested topology impossible. Raised before any file is touched.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A read-only OS state query could not be performed (typically privilege).
    #[error("state inspection failed: {0}")]
    Probe(#[from] ProbeError),

    /// The dhcpcd exclusion directives could not be persisted.
    #[error("conflict elimination failed: {0}")]
    ConflictResolution(String),

    /// A configuration file write, backup, or atomic rename failed; nothing
    /// was left partially written.
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistError),

    /// A required external command could not be executed at all.
    #[error("command execution failed: {0}")]
    Command(#[from] RunError),

    /// The ZeroTier daemon is unreachable or rejected the network join.
    #[error("overlay join failed: {0}")]
    Join(String),

    /// allowManaged could not be disabled within the bounded retry budget.
    #[error("managed assignment disable failed: {0}")]
    ManagedAssignment(String),

    /// The deferred boot task could not be installed; without it the
    /// boot-order race never closes.
    #[error("boot task installation failed: {0}")]
    Scheduling(String),

    /// The deferred attach could not complete this boot. Logged and retried
    /// at the next boot; never corrupts bridge state.
    #[error("deferred attach failed: {0}")]
    Attach(String),
}

impl SetupError {
    /// Manual commands that finish what the failed step could not, so an
    /// operator can recover without rerunning the whole tool.
    pub fn remediation(&self) -> Option<String> {
        match self {
            SetupError::Join(_) => Some(
                "start the daemon and join manually:\n  \
                 sudo systemctl start zerotier-one\n  \
                 sudo zerotier-cli join <network-id>"
                    .to_string(),
            ),
            SetupError::ManagedAssignment(_) => Some(
                "disable managed assignment manually once the daemon settles:\n  \
                 sudo zerotier-cli set <network-id> allowManaged=0"
                    .to_string(),
            ),
            SetupError::Scheduling(_) => Some(
                "add the boot task to root's crontab by hand:\n  \
                 sudo crontab -e\n  \
                 @reboot sleep 45 && <tool> attach --bridge <bridge> >> /tmp/bridge-setup.log 2>&1"
                    .to_string(),
            ),
            SetupError::Probe(_) => {
                Some("re-run with root privileges (sudo)".to_string())
            }
            _ => None,
        }
    }
}
