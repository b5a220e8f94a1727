//! Curve25519 key material and key-derived identifiers for vwgen.
//!
//! Every node in a mesh owns one X25519 private key. Its public key, its VXLAN
//! hardware address and its IPv6 overlay address are all pure functions of that
//! key, so they are recomputed on demand instead of being stored.
//!
//! ## Derived identifiers
//!
//! ```text
//! private key --X25519(base point)--> public key (32 bytes)
//!                                      |
//!                  last 6 bytes -------+------- last 16 bytes
//!                        |                            |
//!          (b0 & 0xfe) | 0x02 (local, unicast)    & pool hostmask
//!                        |                            | pool network
//!                  hardware address             IPv6 overlay address
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod derive;
pub mod error;
pub mod keys;

pub use derive::{derive_hardware_address, derive_overlay_ipv6};
pub use error::KeyError;
pub use keys::{
    decode_key, derive_public_key, encode_key, generate_preshared_key, generate_private_key,
    parse_key, KEY_LEN,
};
