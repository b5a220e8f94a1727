//! Identifiers derived from a node's private key.
//!
//! Both derivations return `None` instead of failing when the key is missing
//! or malformed, so listing a half-configured network never aborts.

use crate::keys::derive_public_key;
use ipnet::Ipv6Net;
use std::net::Ipv6Addr;
use tracing::trace;

/// Derive the VXLAN hardware address for `secret`.
///
/// Uses the last 6 bytes of the public key with the locally administered bit
/// set and the multicast bit cleared.
pub fn derive_hardware_address(secret: &[u8]) -> Option<String> {
    let public = derive_public_key(secret).ok()?;
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&public[public.len() - 6..]);
    mac[0] = (mac[0] & 0xfe) | 0x02;

    trace!("Derived hardware address from public key");
    Some(
        mac.iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":"),
    )
}

/// Derive the IPv6 overlay address for `secret` inside `pool`.
///
/// The host part is the low bits of the public key's last 16 bytes; the result
/// keeps the pool's prefix length, e.g. `fd00:1234:5678::a98e:aa9b:4e6a/80`.
pub fn derive_overlay_ipv6(pool: Option<&Ipv6Net>, secret: &[u8]) -> Option<String> {
    let pool = pool?;
    let public = derive_public_key(secret).ok()?;

    let mut host = [0u8; 16];
    host.copy_from_slice(&public[public.len() - 16..]);
    let host = u128::from_be_bytes(host);

    let network = u128::from(pool.network());
    let hostmask = u128::from(pool.hostmask());
    let address = Ipv6Addr::from(network | (host & hostmask));

    Some(format!("{}/{}", address, pool.prefix_len()))
}
