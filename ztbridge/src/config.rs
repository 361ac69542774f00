use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use serde::Deserialize;

use crate::error::SetupError;

pub const DEFAULT_BRIDGE: &str = "br0";
pub const DEFAULT_NETMASK: &str = "255.255.255.0";
pub const DEFAULT_DNS: &str = "8.8.8.8 8.8.4.4";

/// Validated target topology. Immutable once built; every field has been
/// syntactically checked, so downstream components never discover a missing
/// value mid-sequence. Host-state preconditions (does the physical interface
/// exist, is the bridge name free) are probed by the orchestrator, keeping
/// this constructor pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub physical: String,
    pub bridge: String,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns: Vec<Ipv4Addr>,
    pub network_id: String,
}

/// Unvalidated configuration values as collected from CLI flags and/or a
/// TOML file. Flags override file values; defaults fill the rest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub physical: Option<String>,
    pub bridge: Option<String>,
    pub address: Option<String>,
    pub netmask: Option<String>,
    pub gateway: Option<String>,
    pub dns: Option<String>,
    pub network_id: Option<String>,
}

impl RawConfig {
    /// Load raw values from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            SetupError::Precondition(format!(
                "failed to read config file {}: {err}",
                path.display()
            ))
        })?;
        toml::from_str(&raw).map_err(|err| {
            SetupError::Precondition(format!(
                "failed to parse config file {}: {err}",
                path.display()
            ))
        })
    }

    /// Overlay `flags` on top of `self` (flag values win).
    pub fn overridden_by(self, flags: RawConfig) -> RawConfig {
        RawConfig {
            physical: flags.physical.or(self.physical),
            bridge: flags.bridge.or(self.bridge),
            address: flags.address.or(self.address),
            netmask: flags.netmask.or(self.netmask),
            gateway: flags.gateway.or(self.gateway),
            dns: flags.dns.or(self.dns),
            network_id: flags.network_id.or(self.network_id),
        }
    }
}

impl BridgeConfig {
    /// Validate raw values into a usable topology record. Any missing or
    /// ill-formed field is a hard precondition failure raised before any
    /// mutating component runs.
    pub fn from_raw(raw: RawConfig) -> Result<Self, SetupError> {
        let physical = require_non_empty(raw.physical, "physical interface")?;
        let bridge = match raw.bridge {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            Some(_) => {
                return Err(SetupError::Precondition(
                    "bridge name must not be empty".to_string(),
                ))
            }
            None => DEFAULT_BRIDGE.to_string(),
        };
        if bridge == physical {
            return Err(SetupError::Precondition(format!(
                "bridge name {bridge} collides with the physical interface"
            )));
        }

        let address = parse_ipv4(raw.address, "static address")?;
        let netmask = parse_ipv4(
            Some(raw.netmask.unwrap_or_else(|| DEFAULT_NETMASK.to_string())),
            "netmask",
        )?;
        if !is_contiguous_mask(netmask) {
            return Err(SetupError::Precondition(format!(
                "netmask {netmask} is not a contiguous IPv4 mask"
            )));
        }
        let gateway = parse_ipv4(raw.gateway, "gateway")?;

        let dns = parse_dns(raw.dns.unwrap_or_else(|| DEFAULT_DNS.to_string()))?;
        let network_id = validate_network_id(raw.network_id)?;

        Ok(BridgeConfig {
            physical,
            bridge,
            address,
            netmask,
            gateway,
            dns,
            network_id,
        })
    }

    /// Prefix length of the netmask, for display.
    pub fn prefix_len(&self) -> u32 {
        u32::from(self.netmask).leading_ones()
    }

    /// Non-fatal sanity observations the operator should read. The static
    /// address landing inside the LAN's DHCP pool cannot be checked here (the
    /// pool lives on the router), so it stays a documented warning.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mask = u32::from(self.netmask);
        if u32::from(self.address) & mask != u32::from(self.gateway) & mask {
            out.push(format!(
                "gateway {} is outside the {}/{} subnet of the bridge address",
                self.gateway,
                self.address,
                self.prefix_len()
            ));
        }
        out.push(format!(
            "ensure {} lies outside your router's DHCP assignment range",
            self.address
        ));
        out
    }
}

fn require_non_empty(value: Option<String>, what: &str) -> Result<String, SetupError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(SetupError::Precondition(format!("{what} is required"))),
    }
}

fn parse_ipv4(value: Option<String>, what: &str) -> Result<Ipv4Addr, SetupError> {
    let text = require_non_empty(value, what)?;
    text.parse()
        .map_err(|_| SetupError::Precondition(format!("{what} is not a valid IPv4 address: {text}")))
}

fn parse_dns(value: String) -> Result<Vec<Ipv4Addr>, SetupError> {
    let mut servers = Vec::new();
    for token in value.split_whitespace() {
        servers.push(parse_ipv4(Some(token.to_string()), "dns server")?);
    }
    if servers.is_empty() {
        return Err(SetupError::Precondition(
            "at least one dns server is required".to_string(),
        ));
    }
    Ok(servers)
}

fn validate_network_id(value: Option<String>) -> Result<String, SetupError> {
    let id = require_non_empty(value, "network id")?.to_ascii_lowercase();
    if id.len() != 16 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SetupError::Precondition(format!(
            "network id must be a 16-hex-digit identifier, got {id:?}"
        )));
    }
    Ok(id)
}

fn is_contiguous_mask(mask: Ipv4Addr) -> bool {
    let bits = u32::from(mask);
    bits != 0 && bits.leading_ones() + bits.trailing_zeros() == 32
}
