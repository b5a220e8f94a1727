//! Collision-free address allocation for vwgen.
//!
//! Addresses are drawn uniformly at random from a bounded host range and
//! re-drawn until they miss every address already assigned in the network.
//! There is no allocation ledger: the caller passes the assigned set, built by
//! scanning the current node records, on every call. Once the assigned set
//! covers the whole range the allocators return [`AllocError::PoolExhausted`]
//! instead of sampling forever.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod link_local;
pub mod overlay;
pub mod range;

pub use error::AllocError;
pub use link_local::{allocate_link_local, LINK_LOCAL_FIRST, LINK_LOCAL_LAST};
pub use overlay::{allocate_overlay_ipv4, usable_hosts};
pub use range::HostRange;

use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Collect the IPv4 addresses named by a list of `addr` or `addr/prefix` strings.
///
/// Entries that are not IPv4 (IPv6 overlay addresses, garbage from hand edits)
/// are skipped.
pub fn collect_assigned<'a, I>(addresses: I) -> HashSet<Ipv4Addr>
where
    I: IntoIterator<Item = &'a str>,
{
    addresses
        .into_iter()
        .filter_map(|entry| {
            let host = entry.split_once('/').map_or(entry, |(host, _)| host);
            host.trim().parse::<Ipv4Addr>().ok()
        })
        .collect()
}
