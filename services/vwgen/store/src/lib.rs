//! Locked, canonical configuration store for vwgen mesh networks.
//!
//! One TOML file per network holds the network settings, the node table and
//! the peering blacklist:
//!
//! ```toml
//! [Network]
//! AddressPoolIPv4 = "192.168.42.0/24"
//! AddressPoolIPv6 = "fd3c:1a2b:3c4d::/80"
//! VxlanAddress = "239.18.7.1"
//! VxlanID = 1234567
//! VxlanMTU = 1966
//! VxlanPort = 4789
//!
//! [Node.alice]
//! Address = ["192.168.42.17/24"]
//! AllowedIPs = ["169.254.12.34/32"]
//! ...
//!
//! [PeerBlacklist]
//! Blacklist = [["alice", "bob"]]
//! ```
//!
//! Keys are emitted in sorted order and sets sorted, so saving the same data
//! twice yields the same bytes. Concurrent invocations are serialized by an
//! advisory lock on the file.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blacklist;
pub mod error;
pub mod lock;
pub mod model;
pub mod store;

pub use blacklist::{PeerBlacklist, PeerPair};
pub use error::StoreError;
pub use lock::{LockMode, LockedFile, WAIT_NOTICE};
pub use model::{
    parse_cidr_list, Document, Network, Node, DEFAULT_VXLAN_MTU, DEFAULT_VXLAN_PORT,
    LISTEN_PORT_RANGE, MAX_VXLAN_ID,
};
pub use store::{ConfigStore, Intent, CONF_EXTENSION};
