//! `vwgen set <network> <directive>...`
//!
//! Directives are parsed and validated up front, then applied to copies of
//! the network and node table. The store only sees the result when every
//! directive succeeded.

use super::{missing_network, missing_node, Status};
use anyhow::Result;
use ipnet::{Ipv4Net, Ipv6Net};
use rand::{CryptoRng, Rng};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use vwgen_store::{parse_cidr_list, ConfigStore, Intent, StoreError, MAX_VXLAN_ID};

/// A directive that could not be parsed
#[derive(Error, Debug)]
pub enum SetError {
    #[error("Invalid directive '{0}'")]
    UnknownDirective(String),

    #[error("Argument not complete, '{0}' needs a value")]
    MissingValue(String),

    #[error("'{0}' must be used after 'node' directive")]
    NodeRequired(String),

    #[error("Invalid value '{value}' for '{directive}': {reason}")]
    InvalidValue {
        directive: String,
        value: String,
        reason: String,
    },

    #[error("Unable to read private key file {path:?}: {source}")]
    KeyFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One parsed `set` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Node(String),
    PoolIpv4(Ipv4Net),
    PoolIpv6(Ipv6Net),
    VxlanId(u32),
    VxlanMtu(u16),
    VxlanPort(u16),
    Address(Vec<String>),
    AllowedIps(Vec<String>),
    Endpoint(String),
    FwMark(u32),
    LinkLayerAddress(Vec<String>),
    ListenPort(u16),
    PersistentKeepalive(u16),
    PrivateKey(String),
    SaveConfig(bool),
    Upnp(bool),
}

fn invalid(directive: &str, value: &str, reason: impl ToString) -> SetError {
    SetError::InvalidValue {
        directive: directive.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse an integer the way C's `strtol(.., 0)` would, without octal by
/// leading zero: `0x`, `0o` and `0b` prefixes, decimal otherwise.
fn parse_int(text: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    let lower = text.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        u32::from_str_radix(oct, 8)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u32::from_str_radix(bin, 2)
    } else {
        lower.parse()
    }
}

fn parse_nonzero_u16(directive: &str, value: &str) -> Result<u16, SetError> {
    match value.parse::<u16>() {
        Ok(0) => Err(invalid(directive, value, "must be nonzero")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(directive, value, e)),
    }
}

fn parse_cidrs(directive: &str, value: &str) -> Result<Vec<String>, SetError> {
    parse_cidr_list(value).map_err(|e| invalid(directive, value, e))
}

fn read_private_key(value: &str) -> Result<String, SetError> {
    let path = PathBuf::from(value);
    let text = fs::read_to_string(&path).map_err(|source| SetError::KeyFile {
        path: path.clone(),
        source,
    })?;
    let key = vwgen_crypto::parse_key(&text).map_err(|e| invalid("private-key", value, e))?;
    Ok(vwgen_crypto::encode_key(&key))
}

/// Parse every directive, failing on the first malformed one
pub fn parse_directives(args: &[String]) -> Result<Vec<Directive>, SetError> {
    let mut directives = Vec::new();
    let mut node_selected = false;
    let mut args = args.iter().map(String::as_str);

    while let Some(name) = args.next() {
        let mut value = || args.next().ok_or_else(|| SetError::MissingValue(name.to_string()));

        let directive = match name {
            "node" => {
                node_selected = true;
                Directive::Node(value()?.to_string())
            }
            "pool-ipv4" => {
                let v = value()?;
                Directive::PoolIpv4(v.trim().parse().map_err(|e| invalid(name, v, e))?)
            }
            "pool-ipv6" => {
                let v = value()?;
                Directive::PoolIpv6(v.trim().parse().map_err(|e| invalid(name, v, e))?)
            }
            "vxlan-id" => {
                let v = value()?;
                let id: u32 = v.parse().map_err(|e| invalid(name, v, e))?;
                if !(1..=MAX_VXLAN_ID).contains(&id) {
                    return Err(invalid(name, v, format!("must be in 1..={}", MAX_VXLAN_ID)));
                }
                Directive::VxlanId(id)
            }
            "vxlan-mtu" => Directive::VxlanMtu(parse_nonzero_u16(name, value()?)?),
            "vxlan-port" => Directive::VxlanPort(parse_nonzero_u16(name, value()?)?),
            _ => {
                if !node_selected && is_node_directive(name) {
                    return Err(SetError::NodeRequired(name.to_string()));
                }
                match name {
                    "addr" => Directive::Address(parse_cidrs(name, value()?)?),
                    "allowed-ips" => Directive::AllowedIps(parse_cidrs(name, value()?)?),
                    "endpoint" => Directive::Endpoint(value()?.to_string()),
                    "fwmark" => {
                        let v = value()?;
                        if v == "off" {
                            Directive::FwMark(0)
                        } else {
                            Directive::FwMark(parse_int(v).map_err(|e| invalid(name, v, e))?)
                        }
                    }
                    "ll-addr" => Directive::LinkLayerAddress(parse_cidrs(name, value()?)?),
                    "listen-port" => Directive::ListenPort(parse_nonzero_u16(name, value()?)?),
                    "persistent-keepalive" => {
                        let v = value()?;
                        if v == "off" {
                            Directive::PersistentKeepalive(0)
                        } else {
                            Directive::PersistentKeepalive(
                                v.parse().map_err(|e| invalid(name, v, e))?,
                            )
                        }
                    }
                    "private-key" => Directive::PrivateKey(read_private_key(value()?)?),
                    "save-config" => Directive::SaveConfig(true),
                    "nosave-config" => Directive::SaveConfig(false),
                    "upnp" => Directive::Upnp(true),
                    "noupnp" => Directive::Upnp(false),
                    other => return Err(SetError::UnknownDirective(other.to_string())),
                }
            }
        };
        directives.push(directive);
    }

    Ok(directives)
}

fn is_node_directive(name: &str) -> bool {
    matches!(
        name,
        "addr"
            | "allowed-ips"
            | "endpoint"
            | "fwmark"
            | "ll-addr"
            | "listen-port"
            | "persistent-keepalive"
            | "private-key"
            | "save-config"
            | "nosave-config"
            | "upnp"
            | "noupnp"
    )
}

pub fn run<R: Rng + CryptoRng>(
    store: &mut ConfigStore<R>,
    network: &str,
    args: &[String],
) -> Result<Status> {
    let directives = match parse_directives(args) {
        Ok(directives) => directives,
        Err(e) => {
            eprintln!("vwgen: {}", e);
            return Ok(Status::EINVAL);
        }
    };

    if !store.load(network, Intent::Modify)? {
        eprintln!("{}", missing_network(network));
        return Ok(Status::ENOENT);
    }

    let mut settings = store.network().clone();
    let mut nodes = store.document().nodes().clone();
    let mut current: Option<String> = None;

    for directive in directives {
        if let Directive::Node(name) = &directive {
            if !nodes.contains_key(name) {
                eprintln!("{}", missing_node(network, name));
                store.close();
                return Ok(Status::ENOENT);
            }
            current = Some(name.clone());
            continue;
        }

        match directive {
            Directive::PoolIpv4(pool) => settings.address_pool_ipv4 = Some(pool.trunc()),
            Directive::PoolIpv6(pool) => settings.address_pool_ipv6 = Some(pool.trunc()),
            Directive::VxlanId(id) => settings.set_vxlan_id(id)?,
            Directive::VxlanMtu(mtu) => settings.set_vxlan_mtu(mtu)?,
            Directive::VxlanPort(port) => settings.set_vxlan_port(port)?,
            node_directive => {
                let node = current
                    .as_ref()
                    .and_then(|name| nodes.get_mut(name))
                    .ok_or(StoreError::NotLoaded)?;
                match node_directive {
                    Directive::Address(list) => node.address = list,
                    Directive::AllowedIps(list) => node.allowed_ips = list,
                    Directive::Endpoint(endpoint) => node.set_endpoint(&endpoint),
                    Directive::FwMark(mark) => node.fw_mark = mark,
                    Directive::LinkLayerAddress(list) => node.link_layer_address = list,
                    Directive::ListenPort(port) => node.listen_port = port,
                    Directive::PersistentKeepalive(secs) => node.persistent_keepalive = secs,
                    Directive::PrivateKey(key) => node.set_private_key(&key)?,
                    Directive::SaveConfig(on) => node.save_config = on,
                    Directive::Upnp(on) => node.upnp = on,
                    _ => {}
                }
            }
        }
    }

    *store.network() = settings;
    *store.nodes() = nodes;
    store.save()?;
    store.close();
    Ok(Status::OK)
}
