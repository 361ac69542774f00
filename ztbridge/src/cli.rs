use std::path::PathBuf;

use clap::Parser;

use ztbridge::config::RawConfig;

#[derive(Parser, Debug)]
#[command(name = "ztbridge")]
#[command(about = "Configure this host as a transparent ZeroTier-to-LAN bridge")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Converge the host onto the bridge topology and install the boot task.
    Setup(SetupArgs),
    /// Attach the overlay interface to the bridge (run by the boot task).
    Attach(AttachArgs),
}

#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// Optional TOML file supplying configuration values; flags override it.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Physical interface to bridge (e.g. eth0).
    #[arg(long)]
    pub physical: Option<String>,
    /// Bridge interface name.
    #[arg(long)]
    pub bridge: Option<String>,
    /// Static IPv4 address for the bridge; keep it outside the DHCP pool.
    #[arg(long)]
    pub address: Option<String>,
    /// IPv4 netmask.
    #[arg(long)]
    pub netmask: Option<String>,
    /// Gateway IPv4 address.
    #[arg(long)]
    pub gateway: Option<String>,
    /// Space-separated DNS servers.
    #[arg(long)]
    pub dns: Option<String>,
    /// 16-hex-digit ZeroTier network id to join.
    #[arg(long)]
    pub network: Option<String>,
    /// Print the resolved action plan without changing anything.
    #[arg(long)]
    pub dry_run: bool,
    /// Write the resolved action plan as JSON to this path.
    #[arg(long)]
    pub plan: Option<PathBuf>,
    /// Stop and disable an active NetworkManager instead of aborting.
    #[arg(long)]
    pub disable_network_manager: bool,
}

impl SetupArgs {
    /// Flag values as an unvalidated config layer.
    pub fn raw_overrides(&self) -> RawConfig {
        RawConfig {
            physical: self.physical.clone(),
            bridge: self.bridge.clone(),
            address: self.address.clone(),
            netmask: self.netmask.clone(),
            gateway: self.gateway.clone(),
            dns: self.dns.clone(),
            network_id: self.network.clone(),
        }
    }
}

#[derive(Parser, Debug)]
pub struct AttachArgs {
    /// Bridge to attach the overlay interface to.
    #[arg(long, default_value = "br0")]
    pub bridge: String,
    /// Overlay interface naming prefix to resolve at execution time.
    #[arg(long, default_value = "zt")]
    pub prefix: String,
}
