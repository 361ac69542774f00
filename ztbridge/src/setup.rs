use host_ops_core::{addresses_of, interface_exists, interface_is_bridge, CommandRunner};
use serde::Serialize;

use crate::config::BridgeConfig;
use crate::cron;
use crate::dhcpcd::{self, EliminationReport};
use crate::error::SetupError;
use crate::interfaces;
use crate::overlay::{self, RetryPolicy};
use crate::paths::Paths;
use crate::report;

/// Caller-tunable behavior for one setup run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetupOptions {
    /// Stop and disable an active NetworkManager instead of aborting.
    pub disable_network_manager: bool,
    /// Retry schedule for the overlay daemon's join-then-configure race.
    pub retry: RetryPolicyOption,
}

/// Wrapper so `SetupOptions` can derive `Default` with the production policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicyOption(pub RetryPolicy);

impl Default for RetryPolicyOption {
    fn default() -> Self {
        RetryPolicyOption(RetryPolicy::default())
    }
}

/// One planned action, for `--dry-run` and `--plan` output.
#[derive(Debug, Serialize)]
pub struct PlannedStep {
    pub name: String,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct SetupPlan {
    pub steps: Vec<PlannedStep>,
}

/// What one completed run actually did.
#[derive(Debug)]
pub struct SetupSummary {
    pub elimination: EliminationReport,
    pub disable_attempts: u32,
    pub boot_entry: String,
    pub crontab_rewritten: bool,
    pub node_id: Option<String>,
}

/// The fully resolved actions this configuration implies, in execution order.
pub fn plan(paths: &Paths, config: &BridgeConfig) -> SetupPlan {
    let mut steps = Vec::new();
    steps.push(PlannedStep {
        name: "eliminate-conflicts".to_string(),
        detail: format!(
            "prepend [{}] to {}; ip addr flush dev {}; systemctl restart dhcpcd",
            dhcpcd::exclusion_directives(config).join(", "),
            paths.dhcpcd_conf.display(),
            config.physical
        ),
    });
    steps.push(PlannedStep {
        name: "write-bridge-definition".to_string(),
        detail: format!(
            "back up and rewrite {} ({} static {}/{} via {}, ports {})",
            paths.interfaces_file.display(),
            config.bridge,
            config.address,
            config.prefix_len(),
            config.gateway,
            config.physical
        ),
    });
    steps.push(PlannedStep {
        name: "join-overlay".to_string(),
        detail: format!("zerotier-cli join {}", config.network_id),
    });
    steps.push(PlannedStep {
        name: "disable-managed-assignment".to_string(),
        detail: format!("zerotier-cli set {} allowManaged=0", config.network_id),
    });
    steps.push(PlannedStep {
        name: "install-boot-task".to_string(),
        detail: cron::boot_entry(paths, &config.bridge),
    });
    SetupPlan { steps }
}

pub fn render_plan(plan: &SetupPlan) -> String {
    let mut out = Vec::new();
    for step in &plan.steps {
        out.push(format!("{}: {}", step.name, step.detail));
    }
    out.join("\n")
}

/// Privilege and host-state preconditions, probed immediately before any
/// mutation. These are re-read on every run; nothing is trusted from a
/// previous invocation. The euid check goes through the runner so it stays
/// a read-only probe in tests.
pub fn check_preconditions(
    runner: &dyn CommandRunner,
    paths: &Paths,
    config: &BridgeConfig,
) -> Result<(), SetupError> {
    let euid = runner.run("id", &["-u"])?;
    if !euid.success || euid.stdout.trim() != "0" {
        return Err(SetupError::Precondition(
            "this tool rewrites system configuration files and must run as root; \
             re-run with sudo"
                .to_string(),
        ));
    }
    if !interface_exists(&paths.sysfs_net, &config.physical) {
        return Err(SetupError::Precondition(format!(
            "physical interface {} does not exist",
            config.physical
        )));
    }
    if interface_exists(&paths.sysfs_net, &config.bridge)
        && !interface_is_bridge(&paths.sysfs_net, &config.bridge)
    {
        return Err(SetupError::Precondition(format!(
            "{} already exists and is not a bridge; choose another bridge name",
            config.bridge
        )));
    }
    Ok(())
}

/// Run the full convergence sequence. Every step is idempotent and the whole
/// sequence is safe to re-run; a second run against a converged host changes
/// nothing.
pub fn run(
    runner: &dyn CommandRunner,
    paths: &Paths,
    config: &BridgeConfig,
    options: SetupOptions,
) -> Result<SetupSummary, SetupError> {
    check_preconditions(runner, paths, config)?;
    for warning in config.warnings() {
        println!("{}", report::warning(&warning));
    }

    let held = addresses_of(runner, &config.physical)?;
    if !held.is_empty() {
        let listed: Vec<String> = held.iter().map(|a| a.to_string()).collect();
        println!(
            "{}",
            report::info(&format!(
                "{} currently holds {}; these addresses will be flushed",
                config.physical,
                listed.join(", ")
            ))
        );
    }

    println!("{}", report::info("eliminating competing address managers"));
    let elimination = dhcpcd::eliminate(runner, paths, config, options.disable_network_manager)?;
    if let Some(warning) = &elimination.restart_warning {
        println!("{}", report::warning(warning));
    }

    println!(
        "{}",
        report::info(&format!(
            "writing bridge definition to {}",
            paths.interfaces_file.display()
        ))
    );
    interfaces::write(paths, config)?;

    println!(
        "{}",
        report::info(&format!("joining overlay network {}", config.network_id))
    );
    overlay::join(runner, &config.network_id)?;

    println!(
        "{}",
        report::info("disabling overlay-managed routes and addresses")
    );
    let disable_attempts =
        overlay::disable_managed_assignment(runner, &config.network_id, options.retry.0)?;

    let boot_entry = cron::boot_entry(paths, &config.bridge);
    println!(
        "{}",
        report::info(&format!("installing boot task: {boot_entry}"))
    );
    let crontab_rewritten = cron::install(runner, paths, &config.bridge)?;

    let node_id = overlay::node_info(runner)
        .ok()
        .flatten()
        .map(|info| info.node_id);

    Ok(SetupSummary {
        elimination,
        disable_attempts,
        boot_entry,
        crontab_rewritten,
        node_id,
    })
}
