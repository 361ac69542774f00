use colored::Colorize;

/// Render a banner for a setup phase.
pub fn header(text: &str) -> String {
    let rule = "=".repeat(70);
    format!("{}\n{}\n{}", rule.bold(), text.bold(), rule.bold())
}

pub fn success(text: &str) -> String {
    format!("{} {}", "✓".green(), text.green())
}

pub fn warning(text: &str) -> String {
    format!("{} {}", "⚠".yellow(), text.yellow())
}

pub fn failure(text: &str) -> String {
    format!("{} {}", "✗".red(), text.red())
}

pub fn info(text: &str) -> String {
    format!("{} {}", "ℹ".blue(), text)
}

/// Post-setup instructions the tool cannot perform itself: ZeroTier Central
/// settings and the reboot verification steps.
pub fn render_next_steps(
    bridge: &str,
    physical: &str,
    gateway: &str,
    node_id: Option<&str>,
) -> String {
    let mut out = Vec::new();
    out.push(header("Next Steps"));
    out.push(String::new());
    out.push("ZeroTier Central (https://my.zerotier.com):".to_string());
    match node_id {
        Some(id) => out.push(format!("- authorize node {id} on your network")),
        None => out.push("- authorize this node (see `zerotier-cli info` for the node id)".to_string()),
    }
    out.push("- enable 'Allow Ethernet Bridging' for this member".to_string());
    out.push("- enable 'Do Not Auto-Assign IPs' for this member".to_string());
    out.push("- do NOT assign a managed IP; the bridge already carries a static LAN address".to_string());
    out.push(String::new());
    out.push("After reboot, verify:".to_string());
    out.push(format!(
        "- `brctl show` lists {physical} and a zt* interface under {bridge}"
    ));
    out.push(format!(
        "- `ip addr show {bridge}` carries the static address; {physical} carries none"
    ));
    out.push(format!("- a ZeroTier client can ping the gateway {gateway}"));
    out.join("\n")
}
