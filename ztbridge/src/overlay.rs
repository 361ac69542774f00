use std::time::Duration;

use host_ops_core::CommandRunner;

use crate::error::SetupError;

/// Identity of the local ZeroTier node, from `zerotier-cli info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub node_id: String,
    pub version: String,
    pub online: bool,
}

/// Bounded retry schedule for the join-then-configure race inside the
/// ZeroTier daemon: immediately after a join the daemon may not have
/// registered the membership yet, so `set` can transiently fail.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 5,
            initial_delay: Duration::from_millis(500),
        }
    }
}

/// Query the local node identity. `None` when the daemon answered with
/// something unparseable; an unreachable daemon is a `Join` error.
pub fn node_info(runner: &dyn CommandRunner) -> Result<Option<NodeInfo>, SetupError> {
    let out = runner.run("zerotier-cli", &["info"])?;
    if !out.success {
        return Err(SetupError::Join(format!(
            "zerotier daemon unreachable: {}",
            pick_detail(&out.stderr, &out.stdout)
        )));
    }

    // Shape: "200 info 1234567890 1.16.0 ONLINE"
    let parts: Vec<&str> = out.stdout.split_whitespace().collect();
    if parts.len() < 3 || parts[0] != "200" {
        return Ok(None);
    }
    Ok(Some(NodeInfo {
        node_id: parts[2].to_string(),
        version: parts.get(3).unwrap_or(&"unknown").to_string(),
        online: parts.get(4).is_some_and(|status| *status == "ONLINE"),
    }))
}

/// Request membership in the overlay network. Idempotent: joining a network
/// the node already belongs to succeeds. Fails with `Join` when the daemon
/// is not running or rejects the request.
pub fn join(runner: &dyn CommandRunner, network_id: &str) -> Result<(), SetupError> {
    // Probe the daemon first so "not running" is reported as such rather
    // than as a failed join.
    node_info(runner)?;

    let out = runner.run("zerotier-cli", &["join", network_id])?;
    if !out.success || !out.stdout.contains("200") {
        return Err(SetupError::Join(format!(
            "could not join network {network_id}: {}",
            pick_detail(&out.stderr, &out.stdout)
        )));
    }
    Ok(())
}

/// Disable the overlay's own managed route/address assignment for the
/// network, so the bridge's static configuration stays authoritative.
///
/// Retried on a bounded backoff because this runs immediately after `join`
/// and the daemon may not have registered the membership yet. Exhausting the
/// budget is fatal for the run; the error names the exact manual command.
pub fn disable_managed_assignment(
    runner: &dyn CommandRunner,
    network_id: &str,
    retry: RetryPolicy,
) -> Result<u32, SetupError> {
    let flag = "allowManaged=0";
    // A zero budget still means one attempt; clamp once so the sleep guard
    // and the exhaustion report agree with the loop.
    let attempts = retry.attempts.max(1);
    let mut delay = retry.initial_delay;
    let mut last_detail = String::new();

    for attempt in 1..=attempts {
        let out = runner.run("zerotier-cli", &["set", network_id, flag])?;
        if out.success {
            return Ok(attempt);
        }
        last_detail = pick_detail(&out.stderr, &out.stdout);
        if attempt < attempts {
            std::thread::sleep(delay);
            delay = delay.saturating_mul(2);
        }
    }

    Err(SetupError::ManagedAssignment(format!(
        "`zerotier-cli set {network_id} {flag}` still failing after {attempts} attempts: \
         {last_detail}"
    )))
}

fn pick_detail(stderr: &str, stdout: &str) -> String {
    let err = stderr.trim();
    if !err.is_empty() {
        return err.to_string();
    }
    let out = stdout.trim();
    if out.is_empty() {
        "no output".to_string()
    } else {
        out.to_string()
    }
}
