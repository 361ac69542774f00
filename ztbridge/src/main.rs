use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use host_ops_core::SystemRunner;
use ztbridge::config::{BridgeConfig, RawConfig};
use ztbridge::paths::Paths;
use ztbridge::setup::{self, SetupOptions};
use ztbridge::{attach, report};

mod cli;

use cli::{AttachArgs, Cli, Command, SetupArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Setup(args) => run_setup(args),
        Command::Attach(args) => run_attach(args),
    }
}

fn run_setup(args: SetupArgs) -> Result<()> {
    let file_values = match &args.config {
        Some(path) => RawConfig::load(path)?,
        None => RawConfig::default(),
    };
    let config = BridgeConfig::from_raw(file_values.overridden_by(args.raw_overrides()))?;
    let paths = Paths::default();

    let plan = setup::plan(&paths, &config);
    if let Some(plan_path) = &args.plan {
        fs::write(plan_path, serde_json::to_string_pretty(&plan)?)
            .with_context(|| format!("failed to write plan file {}", plan_path.display()))?;
    }

    if args.dry_run {
        for warning in config.warnings() {
            println!("{}", report::warning(&warning));
        }
        println!("{}", setup::render_plan(&plan));
        println!("{}", report::info("dry run: nothing was changed"));
        return Ok(());
    }

    println!(
        "{}",
        report::header(&format!(
            "Bridging {} into overlay network {} via {}",
            config.physical, config.network_id, config.bridge
        ))
    );

    let options = SetupOptions {
        disable_network_manager: args.disable_network_manager,
        ..SetupOptions::default()
    };
    let runner = SystemRunner;

    match setup::run(&runner, &paths, &config, options) {
        Ok(summary) => {
            if summary.elimination.network_manager_disabled {
                println!("{}", report::success("NetworkManager stopped and disabled"));
            }
            println!(
                "{}",
                report::success(&format!("boot task installed: {}", summary.boot_entry))
            );
            println!("{}", report::success("setup complete; reboot to converge"));
            println!();
            println!(
                "{}",
                report::render_next_steps(
                    &config.bridge,
                    &config.physical,
                    &config.gateway.to_string(),
                    summary.node_id.as_deref(),
                )
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", report::failure(&err.to_string()));
            if let Some(remedy) = err.remediation() {
                eprintln!("{}", report::info(&remedy));
            }
            Err(err.into())
        }
    }
}

fn run_attach(args: AttachArgs) -> Result<()> {
    let paths = Paths::default();
    let runner = SystemRunner;

    match attach::attach(&runner, &paths, &args.bridge, &args.prefix) {
        Ok(outcome) if outcome.already_enslaved => {
            println!(
                "{}",
                report::success(&format!(
                    "{} is already a port of {}; nothing to do",
                    outcome.interface, args.bridge
                ))
            );
            Ok(())
        }
        Ok(outcome) => {
            println!(
                "{}",
                report::success(&format!("attached {} to {}", outcome.interface, args.bridge))
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", report::failure(&err.to_string()));
            Err(err.into())
        }
    }
}
