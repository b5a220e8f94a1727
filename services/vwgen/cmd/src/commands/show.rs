//! `vwgen show [--json] <network>...`

use super::{missing_network, Status};
use anyhow::Result;
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::io::Write;
use vwgen_store::{ConfigStore, Document, Intent, Node};

const NORMAL: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// Print every network in `networks` to `out`, skipping missing ones.
pub fn run<R, W: Write>(
    store: &mut ConfigStore<R>,
    networks: &[String],
    as_json: bool,
    color: bool,
    out: &mut W,
) -> Result<Status> {
    let mut status = Status::OK;
    let mut rendered = Vec::new();

    for network in networks {
        if !store.load(network, Intent::Read)? {
            eprintln!("{}", missing_network(network));
            status = status.or(Status::ENOENT);
            continue;
        }
        let name = store.name().unwrap_or(network.as_str()).to_string();
        if as_json {
            rendered.push(to_json(&name, store.document()));
        } else {
            out.write_all(render(&name, store.document(), color).as_bytes())?;
        }
        store.close();
    }

    if as_json {
        serde_json::to_writer_pretty(&mut *out, &Value::Array(rendered))?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(status)
}

struct Style {
    color: bool,
}

impl Style {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", code, text, NORMAL)
        } else {
            text.to_string()
        }
    }

    fn label(&self, text: &str) -> String {
        self.paint(BOLD, &format!("{}:", text))
    }
}

fn public_key_text(node: &Node) -> String {
    node.public_key_base64()
        .unwrap_or_else(|| "(error)".to_string())
}

fn addresses(document: &Document, node: &Node) -> Vec<String> {
    let mut list = node.address.clone();
    if let Some(ipv6) = document.network().and_then(|network| node.overlay_ipv6(network)) {
        list.push(ipv6);
    }
    list
}

/// Human-readable listing of one network
pub fn render(name: &str, document: &Document, color: bool) -> String {
    let style = Style { color };
    let mut out = String::new();
    let network = document.network();

    let _ = writeln!(out, "{} {}", style.label("network"), style.paint(GREEN, name));
    let pool_ipv4 = network
        .and_then(|n| n.address_pool_ipv4)
        .map(|p| p.to_string())
        .unwrap_or_default();
    let pool_ipv6 = network
        .and_then(|n| n.address_pool_ipv6)
        .map(|p| p.to_string())
        .unwrap_or_default();
    let _ = writeln!(out, "  {} {}", style.label("address pool ipv4"), pool_ipv4);
    let _ = writeln!(out, "  {} {}", style.label("address pool ipv6"), pool_ipv6);
    if let Some(network) = network {
        let _ = writeln!(out, "  {} {}", style.label("vxlan address"), network.vxlan_address);
        let _ = writeln!(out, "  {} {}", style.label("vxlan port"), network.vxlan_port);
        let _ = writeln!(out, "  {} {}", style.label("vxlan mtu"), network.vxlan_mtu);
        let _ = writeln!(out, "  {} {}", style.label("vxlan id"), network.vxlan_id);
    }
    out.push('\n');

    for (node_name, node) in document.nodes() {
        let _ = writeln!(out, "{} {}", style.label("node"), style.paint(YELLOW, node_name));
        let _ = writeln!(out, "  {} {}", style.label("public key"), public_key_text(node));
        let _ = writeln!(out, "  {} {}", style.label("private key"), node.private_key);
        let _ = writeln!(
            out,
            "  {} {}",
            style.label("endpoint"),
            node.endpoint.as_deref().unwrap_or("")
        );
        let _ = writeln!(out, "  {} {}", style.label("listen port"), node.listen_port);
        let _ = writeln!(
            out,
            "  {} {}",
            style.label("address"),
            addresses(document, node).join(", ")
        );
        let _ = writeln!(
            out,
            "  {} {}",
            style.label("allowed ips"),
            node.allowed_ips.join(", ")
        );
        let _ = writeln!(
            out,
            "  {} {}",
            style.label("link-layer address"),
            node.link_layer_address.join(", ")
        );
        if node.fw_mark != 0 {
            let _ = writeln!(out, "  {} {:x}", style.label("fwmark"), node.fw_mark);
        }
        if node.persistent_keepalive != 0 {
            let unit = if node.persistent_keepalive == 1 { "second" } else { "seconds" };
            let _ = writeln!(
                out,
                "  {} {} {}",
                style.label("persistent keepalive"),
                node.persistent_keepalive,
                unit
            );
        }
        if node.save_config {
            let _ = writeln!(out, "  {} true", style.label("save config"));
        }
        if node.upnp {
            let _ = writeln!(out, "  {} true", style.label("upnp"));
        }
        let _ = writeln!(
            out,
            "  {} {}",
            style.label("hardware address"),
            node.hardware_address().unwrap_or_default()
        );
        let _ = writeln!(
            out,
            "  {} {}",
            style.label("blacklist"),
            document.blacklist().peers_of(node_name).join(", ")
        );
        let _ = writeln!(
            out,
            "  {} {}",
            style.label("whitelist"),
            document.whitelist_of(node_name).join(", ")
        );
        out.push('\n');
    }

    out
}

/// Same data as [`render`], as a JSON object
pub fn to_json(name: &str, document: &Document) -> Value {
    let nodes: serde_json::Map<String, Value> = document
        .nodes()
        .iter()
        .map(|(node_name, node)| {
            let value = json!({
                "public_key": node.public_key_base64(),
                "private_key": node.private_key,
                "endpoint": node.endpoint,
                "listen_port": node.listen_port,
                "address": addresses(document, node),
                "allowed_ips": node.allowed_ips,
                "link_layer_address": node.link_layer_address,
                "fwmark": node.fw_mark,
                "persistent_keepalive": node.persistent_keepalive,
                "save_config": node.save_config,
                "upnp": node.upnp,
                "hardware_address": node.hardware_address(),
                "blacklist": document.blacklist().peers_of(node_name),
                "whitelist": document.whitelist_of(node_name),
            });
            (node_name.clone(), value)
        })
        .collect();

    let network = document.network().map(|network| {
        json!({
            "address_pool_ipv4": network.address_pool_ipv4.map(|p| p.to_string()),
            "address_pool_ipv6": network.address_pool_ipv6.map(|p| p.to_string()),
            "vxlan_address": network.vxlan_address.to_string(),
            "vxlan_id": network.vxlan_id,
            "vxlan_mtu": network.vxlan_mtu,
            "vxlan_port": network.vxlan_port,
        })
    });

    json!({
        "name": name,
        "network": network,
        "nodes": nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::seeded;
    use tempfile::TempDir;

    const ALICE_SECRET: &str = "dwdtCnMYpX08FsFyUbJmRd9ML4frwJkqsXf7pR25LCo=";
    const ALICE_PUBLIC: &str = "hSDwCYkwp1R0i33ctD73Wg2/Og0mOBr066SpjqqbTmo=";

    fn populate(dir: &TempDir) {
        let mut store = seeded(dir, 40);
        store.load("mesh", Intent::Write).unwrap();
        store.network().set_pool_ipv6("fd00:1234:5678::/80").unwrap();
        store.add_node("alice").unwrap();
        store.add_node("bob").unwrap();
        store.add_node("carol").unwrap();
        {
            let alice = store.nodes().get_mut("alice").unwrap();
            alice.set_private_key(ALICE_SECRET).unwrap();
            alice.fw_mark = 255;
            alice.persistent_keepalive = 1;
        }
        store.nodes().get_mut("bob").unwrap().private_key = "garbage".to_string();
        store.blacklist().add("alice", "carol").unwrap();
        store.save().unwrap();
    }

    fn line<'a>(text: &'a str, block: &str, label: &str) -> &'a str {
        let start = text.find(block).unwrap();
        text[start..]
            .lines()
            .find(|l| l.trim_start().starts_with(label))
            .unwrap()
    }

    #[test]
    fn test_render_plain() {
        let dir = TempDir::new().unwrap();
        populate(&dir);

        let mut store = seeded(&dir, 1);
        let mut out = Vec::new();
        let status = run(&mut store, &["mesh".to_string()], false, false, &mut out).unwrap();
        assert!(status.is_ok());
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("network: mesh\n"));
        assert!(text.contains("  address pool ipv6: fd00:1234:5678::/80\n"));
        assert!(!text.contains('\x1b'));

        assert_eq!(
            line(&text, "node: alice", "public key:"),
            format!("  public key: {}", ALICE_PUBLIC)
        );
        assert!(line(&text, "node: alice", "address:").ends_with("fd00:1234:5678::a98e:aa9b:4e6a/80"));
        assert_eq!(line(&text, "node: alice", "fwmark:"), "  fwmark: ff");
        assert_eq!(
            line(&text, "node: alice", "persistent keepalive:"),
            "  persistent keepalive: 1 second"
        );
        assert_eq!(
            line(&text, "node: alice", "hardware address:"),
            "  hardware address: aa:8e:aa:9b:4e:6a"
        );
        assert_eq!(line(&text, "node: alice", "blacklist:"), "  blacklist: carol");
        assert_eq!(line(&text, "node: alice", "whitelist:"), "  whitelist: bob");
        assert_eq!(line(&text, "node: bob", "public key:"), "  public key: (error)");
        assert_eq!(line(&text, "node: carol", "whitelist:"), "  whitelist: bob");
    }

    #[test]
    fn test_render_color() {
        let document = Document::parse("[Node.alice]\n").unwrap();
        let text = render("mesh", &document, true);
        assert!(text.starts_with("\x1b[1mnetwork:\x1b[0m \x1b[32mmesh\x1b[0m\n"));
        assert!(text.contains("\x1b[1mnode:\x1b[0m \x1b[33malice\x1b[0m\n"));
    }

    #[test]
    fn test_json_output() {
        let dir = TempDir::new().unwrap();
        populate(&dir);

        let mut store = seeded(&dir, 2);
        let mut out = Vec::new();
        run(&mut store, &["mesh".to_string()], true, false, &mut out).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();

        let mesh = &value[0];
        assert_eq!(mesh["name"], "mesh");
        assert_eq!(mesh["network"]["address_pool_ipv6"], "fd00:1234:5678::/80");
        assert_eq!(mesh["nodes"]["alice"]["public_key"], ALICE_PUBLIC);
        assert_eq!(mesh["nodes"]["alice"]["blacklist"], json!(["carol"]));
        assert!(mesh["nodes"]["bob"]["public_key"].is_null());
    }

    #[test]
    fn test_missing_network_continues() {
        let dir = TempDir::new().unwrap();
        populate(&dir);

        let mut store = seeded(&dir, 3);
        let mut out = Vec::new();
        let networks = vec!["nowhere".to_string(), "mesh".to_string()];
        let status = run(&mut store, &networks, false, false, &mut out).unwrap();
        assert_eq!(status, Status::ENOENT);
        assert!(String::from_utf8(out).unwrap().contains("node: alice"));
    }
}
