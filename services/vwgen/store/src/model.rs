//! Typed view of a network configuration document.
//!
//! Keys the model does not know about are carried in a flattened `extra` map
//! on every table and written back untouched. Canonical output goes through a
//! `toml::Value` tree, so known and unknown keys are sorted together.

use crate::blacklist::PeerBlacklist;
use crate::error::StoreError;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use tracing::{debug, warn};
use vwgen_alloc::{allocate_link_local, allocate_overlay_ipv4, collect_assigned};
use vwgen_crypto::{
    decode_key, derive_hardware_address, derive_overlay_ipv6, derive_public_key, encode_key,
    generate_private_key, KEY_LEN,
};

/// Default VXLAN MTU, sized so the encapsulated UDP packet is 2048 bytes
pub const DEFAULT_VXLAN_MTU: u16 = 1966;

/// IANA-assigned VXLAN UDP port
pub const DEFAULT_VXLAN_PORT: u16 = 4789;

/// Largest VXLAN network identifier (24 bits)
pub const MAX_VXLAN_ID: u32 = 0xff_ffff;

/// Range new nodes draw their listen port from
pub const LISTEN_PORT_RANGE: std::ops::RangeInclusive<u16> = 32768..=60999;

fn default_vxlan_mtu() -> u16 {
    DEFAULT_VXLAN_MTU
}

fn default_vxlan_port() -> u16 {
    DEFAULT_VXLAN_PORT
}

/// Network-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    /// Pool overlay IPv4 addresses are drawn from
    #[serde(rename = "AddressPoolIPv4", default, skip_serializing_if = "Option::is_none")]
    pub address_pool_ipv4: Option<Ipv4Net>,
    /// Pool key-derived IPv6 addresses live in
    #[serde(rename = "AddressPoolIPv6", default, skip_serializing_if = "Option::is_none")]
    pub address_pool_ipv6: Option<Ipv6Net>,
    /// VXLAN multicast group address
    #[serde(rename = "VxlanAddress")]
    pub vxlan_address: Ipv4Addr,
    /// VXLAN network identifier
    #[serde(rename = "VxlanID")]
    pub vxlan_id: u32,
    /// MTU of the VXLAN interface
    #[serde(rename = "VxlanMTU", default = "default_vxlan_mtu")]
    pub vxlan_mtu: u16,
    /// VXLAN UDP port
    #[serde(rename = "VxlanPort", default = "default_vxlan_port")]
    pub vxlan_port: u16,
    /// Keys not modeled above
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl Network {
    /// Random defaults for a brand new network.
    ///
    /// Not cryptographically meaningful; the randomness only makes two
    /// independently created networks unlikely to collide.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let pool_ipv4 = Ipv4Net::new(Ipv4Addr::new(192, 168, rng.gen_range(2..=255), 0), 24).ok();
        let pool_ipv6 = format!(
            "{:x}:{:x}:{:x}::/80",
            rng.gen_range(0xfd00u16..=0xfdff),
            rng.gen_range(0x1000u16..=0xffff),
            rng.gen_range(0x1000u16..=0xffff)
        )
        .parse::<Ipv6Net>()
        .ok();

        Self {
            address_pool_ipv4: pool_ipv4,
            address_pool_ipv6: pool_ipv6,
            vxlan_address: Ipv4Addr::from(rng.gen_range(0xe000_0100u32..=0xefff_ffff)),
            vxlan_id: rng.gen_range(1..=MAX_VXLAN_ID),
            vxlan_mtu: DEFAULT_VXLAN_MTU,
            vxlan_port: DEFAULT_VXLAN_PORT,
            extra: BTreeMap::new(),
        }
    }

    /// Set the IPv4 pool; host bits in `cidr` are cleared.
    pub fn set_pool_ipv4(&mut self, cidr: &str) -> Result<(), StoreError> {
        let pool: Ipv4Net = cidr
            .trim()
            .parse()
            .map_err(|e| StoreError::Invalid(format!("IPv4 pool '{}': {}", cidr, e)))?;
        self.address_pool_ipv4 = Some(pool.trunc());
        Ok(())
    }

    /// Set the IPv6 pool; host bits in `cidr` are cleared.
    pub fn set_pool_ipv6(&mut self, cidr: &str) -> Result<(), StoreError> {
        let pool: Ipv6Net = cidr
            .trim()
            .parse()
            .map_err(|e| StoreError::Invalid(format!("IPv6 pool '{}': {}", cidr, e)))?;
        self.address_pool_ipv6 = Some(pool.trunc());
        Ok(())
    }

    /// Set the VXLAN network identifier
    pub fn set_vxlan_id(&mut self, id: u32) -> Result<(), StoreError> {
        check_vxlan_id(id)?;
        self.vxlan_id = id;
        Ok(())
    }

    /// Set the VXLAN MTU
    pub fn set_vxlan_mtu(&mut self, mtu: u16) -> Result<(), StoreError> {
        if mtu == 0 {
            return Err(StoreError::Invalid("VXLAN MTU must be positive".to_string()));
        }
        self.vxlan_mtu = mtu;
        Ok(())
    }

    /// Set the VXLAN UDP port
    pub fn set_vxlan_port(&mut self, port: u16) -> Result<(), StoreError> {
        check_port("VXLAN port", port)?;
        self.vxlan_port = port;
        Ok(())
    }

    /// Check every field before the network is written back
    pub fn validate(&self) -> Result<(), StoreError> {
        check_vxlan_id(self.vxlan_id)?;
        check_port("VXLAN port", self.vxlan_port)?;
        if self.vxlan_mtu == 0 {
            return Err(StoreError::Invalid("VXLAN MTU must be positive".to_string()));
        }
        Ok(())
    }
}

fn check_vxlan_id(id: u32) -> Result<(), StoreError> {
    if !(1..=MAX_VXLAN_ID).contains(&id) {
        return Err(StoreError::Invalid(format!(
            "VXLAN ID {} is outside 1..={}",
            id, MAX_VXLAN_ID
        )));
    }
    Ok(())
}

fn check_port(what: &str, port: u16) -> Result<(), StoreError> {
    if port == 0 {
        return Err(StoreError::Invalid(format!("{} must be nonzero", what)));
    }
    Ok(())
}

/// Parse a comma separated CIDR list, e.g. `10.0.0.1/24, fd00::1/64`.
pub fn parse_cidr_list(list: &str) -> Result<Vec<String>, StoreError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<IpNet>()
                .map(|net| net.to_string())
                .map_err(|e| StoreError::Invalid(format!("address '{}': {}", entry, e)))
        })
        .collect()
}

/// One mesh member
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    /// Overlay addresses with prefix length
    #[serde(rename = "Address")]
    pub address: Vec<String>,
    /// Tunnel allowed IPs
    #[serde(rename = "AllowedIPs")]
    pub allowed_ips: Vec<String>,
    /// Public `host:port` other nodes connect to
    #[serde(rename = "Endpoint", skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Firewall mark, 0 when unset
    #[serde(rename = "FwMark")]
    pub fw_mark: u32,
    /// Link-local tunnel addresses with prefix length
    #[serde(rename = "LinkLayerAddress")]
    pub link_layer_address: Vec<String>,
    /// Tunnel listen port
    #[serde(rename = "ListenPort")]
    pub listen_port: u16,
    /// Keepalive interval in seconds, 0 when disabled
    #[serde(rename = "PersistentKeepalive")]
    pub persistent_keepalive: u16,
    /// Commands run after the interface goes down
    #[serde(rename = "PostDown")]
    pub post_down: Vec<String>,
    /// Commands run after the interface comes up
    #[serde(rename = "PostUp")]
    pub post_up: Vec<String>,
    /// Commands run before the interface goes down
    #[serde(rename = "PreDown")]
    pub pre_down: Vec<String>,
    /// Commands run before the interface comes up
    #[serde(rename = "PreUp")]
    pub pre_up: Vec<String>,
    /// Base64 private key
    #[serde(rename = "PrivateKey")]
    pub private_key: String,
    /// Whether the running interface state is saved back on shutdown
    #[serde(rename = "SaveConfig")]
    pub save_config: bool,
    /// Whether the listen port is mapped through UPnP
    #[serde(rename = "UPnP")]
    pub upnp: bool,
    /// Keys not modeled above, such as hand-written notes
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl Node {
    /// Decoded private key, if it is valid base64 of exactly 32 bytes
    pub fn secret(&self) -> Option<[u8; KEY_LEN]> {
        decode_key(&self.private_key)
    }

    /// Public key, if the private key is valid
    pub fn public_key(&self) -> Option<[u8; KEY_LEN]> {
        derive_public_key(&self.secret()?).ok()
    }

    /// Base64 public key, if the private key is valid
    pub fn public_key_base64(&self) -> Option<String> {
        self.public_key().map(|key| encode_key(&key))
    }

    /// Key-derived VXLAN hardware address
    pub fn hardware_address(&self) -> Option<String> {
        derive_hardware_address(&self.secret()?)
    }

    /// Key-derived IPv6 overlay address inside the network's IPv6 pool
    pub fn overlay_ipv6(&self, network: &Network) -> Option<String> {
        derive_overlay_ipv6(network.address_pool_ipv6.as_ref(), &self.secret()?)
    }

    /// Set the private key from base64, rejecting anything but 32 bytes
    pub fn set_private_key(&mut self, text: &str) -> Result<(), StoreError> {
        let key = vwgen_crypto::parse_key(text)?;
        self.private_key = encode_key(&key);
        Ok(())
    }

    /// Set the endpoint, filling in the listen port when `endpoint` has none.
    ///
    /// An empty string clears the endpoint. Bare IPv6 hosts are bracketed.
    pub fn set_endpoint(&mut self, endpoint: &str) {
        let endpoint = endpoint.trim();
        self.endpoint = if endpoint.is_empty() {
            None
        } else if endpoint.starts_with('[') && endpoint.ends_with(']') {
            Some(format!("{}:{}", endpoint, self.listen_port))
        } else if !endpoint.contains(':') {
            Some(format!("{}:{}", endpoint, self.listen_port))
        } else if endpoint.matches(':').count() > 1 && !endpoint.starts_with('[') {
            Some(format!("[{}]:{}", endpoint, self.listen_port))
        } else {
            Some(endpoint.to_string())
        };
    }

    fn with_addresses<R: Rng + CryptoRng + ?Sized>(
        overlay: Option<Ipv4Net>,
        link_local: Ipv4Addr,
        rng: &mut R,
    ) -> Self {
        Self {
            address: overlay.iter().map(ToString::to_string).collect(),
            allowed_ips: vec![format!("{}/32", link_local)],
            link_layer_address: vec![format!("{}/16", link_local)],
            listen_port: rng.gen_range(LISTEN_PORT_RANGE),
            private_key: encode_key(&generate_private_key(rng)),
            ..Self::default()
        }
    }
}

/// `[PeerBlacklist]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct BlacklistTable {
    #[serde(rename = "Blacklist", default)]
    blacklist: PeerBlacklist,
    #[serde(flatten)]
    extra: BTreeMap<String, toml::Value>,
}

/// Whole network configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "Network", default, skip_serializing_if = "Option::is_none")]
    network: Option<Network>,
    #[serde(rename = "Node", default)]
    nodes: BTreeMap<String, Node>,
    #[serde(rename = "PeerBlacklist", default)]
    peer_blacklist: BlacklistTable,
    #[serde(flatten)]
    extra: BTreeMap<String, toml::Value>,
}

impl Document {
    /// Parse a document from its TOML text
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let document: Document = toml::from_str(text)?;
        if let Some(network) = &document.network {
            network.validate()?;
        }
        for pair in document.peer_blacklist.blacklist.iter() {
            let (a, b) = pair.names();
            if !document.nodes.contains_key(a) || !document.nodes.contains_key(b) {
                warn!("Blacklist entry {} names an unknown node", pair);
            }
        }
        Ok(document)
    }

    /// Serialize to the canonical TOML form.
    ///
    /// Identical documents always produce identical text.
    pub fn to_canonical_string(&self) -> Result<String, StoreError> {
        if let Some(network) = &self.network {
            network.validate()?;
        }
        let tree = toml::Value::try_from(self)?;
        Ok(toml::to_string(&tree)?)
    }

    /// Network settings, if initialized
    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    /// Network settings, initialized with random defaults on first access
    pub fn network_or_init<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &mut Network {
        self.network.get_or_insert_with(|| {
            debug!("Initializing network settings with random defaults");
            Network::random(rng)
        })
    }

    /// Node table
    pub fn nodes(&self) -> &BTreeMap<String, Node> {
        &self.nodes
    }

    /// Mutable node table
    pub fn nodes_mut(&mut self) -> &mut BTreeMap<String, Node> {
        &mut self.nodes
    }

    /// Peering blacklist
    pub fn blacklist(&self) -> &PeerBlacklist {
        &self.peer_blacklist.blacklist
    }

    /// Mutable peering blacklist
    pub fn blacklist_mut(&mut self) -> &mut PeerBlacklist {
        &mut self.peer_blacklist.blacklist
    }

    /// IPv4 addresses currently assigned as overlay addresses
    pub fn assigned_overlay_ipv4(&self) -> HashSet<Ipv4Addr> {
        collect_assigned(
            self.nodes
                .values()
                .flat_map(|node| node.address.iter().map(String::as_str)),
        )
    }

    /// Link-local addresses currently assigned
    pub fn assigned_link_local(&self) -> HashSet<Ipv4Addr> {
        collect_assigned(
            self.nodes
                .values()
                .flat_map(|node| node.link_layer_address.iter().map(String::as_str)),
        )
    }

    /// Add a node with freshly allocated addresses and a new private key.
    ///
    /// Fails with [`StoreError::NodeExists`] for a taken name and with
    /// [`StoreError::Alloc`] when a pool is full; the document is unchanged in
    /// both cases.
    pub fn add_node<R: Rng + CryptoRng + ?Sized>(
        &mut self,
        name: &str,
        rng: &mut R,
    ) -> Result<&Node, StoreError> {
        if name.is_empty() {
            return Err(StoreError::Invalid("node name must not be empty".to_string()));
        }
        if self.nodes.contains_key(name) {
            return Err(StoreError::NodeExists(name.to_string()));
        }

        let pool = self.network_or_init(rng).address_pool_ipv4;
        let overlay = match pool {
            Some(pool) => Some(allocate_overlay_ipv4(
                &pool,
                &self.assigned_overlay_ipv4(),
                rng,
            )?),
            None => None,
        };
        let link_local = allocate_link_local(&self.assigned_link_local(), rng)?;

        let node = Node::with_addresses(overlay, link_local, rng);
        debug!(
            "Adding node {} with address {:?} and link-local {}",
            name, node.address, link_local
        );
        Ok(self.nodes.entry(name.to_string()).or_insert(node))
    }

    /// Remove a node and every blacklist entry mentioning it
    pub fn remove_node(&mut self, name: &str) -> Result<Node, StoreError> {
        let node = self
            .nodes
            .remove(name)
            .ok_or_else(|| StoreError::NodeNotFound(name.to_string()))?;
        let pruned = self.peer_blacklist.blacklist.remove_node(name);
        debug!("Removed node {} and {} blacklist entries", name, pruned);
        Ok(node)
    }

    /// Names of the nodes `name` may peer with, sorted
    pub fn whitelist_of(&self, name: &str) -> Vec<&str> {
        self.nodes
            .keys()
            .map(String::as_str)
            .filter(|other| *other != name && !self.blacklist().contains(name, other))
            .collect()
    }
}
